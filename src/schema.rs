// 📐 Shape Layer - invoice form validation
// Raw form fields in, typed invoice fields (or field-level messages) out

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::db::InvoiceStatus;

pub const FIELD_CUSTOMER_ID: &str = "customerId";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_STATUS: &str = "status";

pub const MSG_CUSTOMER: &str = "Please select a customer.";
pub const MSG_AMOUNT: &str = "Please enter an amount greater than $0.";
pub const MSG_STATUS: &str = "Please select an invoice status.";

/// Untyped form body as submitted
pub type RawForm = HashMap<String, String>;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// What a form gets back when validation fails
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormState {
    pub errors: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FormState {
    pub fn from_errors(errors: &[ValidationError], message: &str) -> Self {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in errors {
            grouped
                .entry(error.field.to_string())
                .or_default()
                .push(error.message.to_string());
        }

        FormState {
            errors: grouped,
            message: Some(message.to_string()),
        }
    }

    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// INVOICE SCHEMA
// ============================================================================

/// Validated create/update input; `amount` already in cents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceInput {
    pub customer_id: String,
    pub amount: i64,
    pub status: InvoiceStatus,
}

/// Validate and coerce an invoice form. All failing fields are reported.
pub fn validate_invoice_form(form: &RawForm) -> Result<InvoiceInput, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let customer_id = form
        .get(FIELD_CUSTOMER_ID)
        .map(|raw| raw.trim())
        .filter(|id| !id.is_empty());
    if customer_id.is_none() {
        errors.push(ValidationError {
            field: FIELD_CUSTOMER_ID,
            message: MSG_CUSTOMER,
        });
    }

    let amount = form.get(FIELD_AMOUNT).and_then(|raw| amount_to_cents(raw));
    if amount.is_none() {
        errors.push(ValidationError {
            field: FIELD_AMOUNT,
            message: MSG_AMOUNT,
        });
    }

    let status = form
        .get(FIELD_STATUS)
        .and_then(|raw| raw.parse::<InvoiceStatus>().ok());
    if status.is_none() {
        errors.push(ValidationError {
            field: FIELD_STATUS,
            message: MSG_STATUS,
        });
    }

    match (customer_id, amount, status) {
        (Some(customer_id), Some(amount), Some(status)) => Ok(InvoiceInput {
            customer_id: customer_id.to_string(),
            amount,
            status,
        }),
        _ => Err(errors),
    }
}

/// Coerce a dollar amount typed into a form to cents.
///
/// `None` unless the text is a number greater than zero whose cent value
/// fits in an `i64`. Plain decimals ("1.005", ".5", "+12") are rounded half
/// up from their digits, so "1.005" is 101 cents. Anything else `f64`
/// accepts ("1e2") goes through float rounding.
pub fn amount_to_cents(raw: &str) -> Option<i64> {
    let text = raw.trim();
    let unsigned = text.strip_prefix('+').unwrap_or(text);

    if is_plain_decimal(unsigned) {
        if !unsigned.bytes().any(|b| matches!(b, b'1'..=b'9')) {
            return None;
        }
        return plain_decimal_to_cents(unsigned);
    }

    let dollars: f64 = text.parse().ok()?;
    if !dollars.is_finite() || dollars <= 0.0 {
        return None;
    }

    let cents = (dollars * 100.0).round();
    if cents >= i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

/// Digits with at most one '.', and at least one digit
fn is_plain_decimal(text: &str) -> bool {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    !(whole.is_empty() && fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn plain_decimal_to_cents(text: &str) -> Option<i64> {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));

    let mut cents: i64 = 0;
    for digit in whole.bytes() {
        cents = cents.checked_mul(10)?.checked_add(i64::from(digit - b'0'))?;
    }

    let mut fraction = fraction.bytes().map(|digit| i64::from(digit - b'0'));
    let tenths = fraction.next().unwrap_or(0);
    let hundredths = fraction.next().unwrap_or(0);
    let round_up = i64::from(fraction.next().unwrap_or(0) >= 5);

    cents
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + round_up)
}
