// Mutation Layer - create / update / delete invoices from raw form input
//
// Storage failures are logged and the flow carries on to the same
// revalidation + redirect as a success.

use chrono::Utc;
use rusqlite::Connection;

use crate::cache::INVOICES_PATH;
use crate::db::{self, Invoice};
use crate::schema::{validate_invoice_form, FormState, RawForm};

pub const CREATE_FAILED: &str = "Missing Fields. Failed to Create Invoice.";
pub const UPDATE_FAILED: &str = "Missing Fields. Failed to Update Invoice.";

/// What the presentation layer must do after a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Form did not validate; nothing was written
    Invalid(FormState),
    /// Write attempted; cached views of `revalidate` are stale
    Completed {
        revalidate: &'static str,
        redirect: Option<&'static str>,
    },
}

impl ActionOutcome {
    fn completed(redirect: bool) -> Self {
        ActionOutcome::Completed {
            revalidate: INVOICES_PATH,
            redirect: redirect.then_some(INVOICES_PATH),
        }
    }
}

pub fn create_invoice(conn: &Connection, form: &RawForm) -> ActionOutcome {
    let input = match validate_invoice_form(form) {
        Ok(input) => input,
        Err(errors) => return ActionOutcome::Invalid(FormState::from_errors(&errors, CREATE_FAILED)),
    };

    let invoice = Invoice {
        id: uuid::Uuid::new_v4().to_string(),
        customer_id: input.customer_id,
        amount: input.amount,
        status: input.status,
        date: Utc::now().format("%Y-%m-%d").to_string(),
    };

    match db::insert_invoice(conn, &invoice) {
        Ok(()) => tracing::info!(invoice_id = %invoice.id, amount = invoice.amount, "created invoice"),
        Err(e) => tracing::error!(error = %e, "Database Error: Failed to Create Invoice."),
    }

    ActionOutcome::completed(true)
}

pub fn update_invoice(conn: &Connection, id: &str, form: &RawForm) -> ActionOutcome {
    let input = match validate_invoice_form(form) {
        Ok(input) => input,
        Err(errors) => return ActionOutcome::Invalid(FormState::from_errors(&errors, UPDATE_FAILED)),
    };

    match db::update_invoice(conn, id, &input.customer_id, input.amount, input.status) {
        Ok(changed) => tracing::info!(invoice_id = id, changed, "updated invoice"),
        Err(e) => tracing::error!(invoice_id = id, error = %e, "Database Error: Failed to Update Invoice."),
    }

    ActionOutcome::completed(true)
}

/// Delete by id. Unknown ids are not an error.
pub fn delete_invoice(conn: &Connection, id: &str) -> ActionOutcome {
    match db::delete_invoice(conn, id) {
        Ok(removed) => tracing::info!(invoice_id = id, removed, "deleted invoice"),
        Err(e) => tracing::error!(invoice_id = id, error = %e, "Database Error: Failed to Delete Invoice."),
    }

    ActionOutcome::completed(false)
}
