use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::DashboardError;

const SEED_CUSTOMERS: &str = include_str!("../seed/customers.csv");
const SEED_INVOICES: &str = include_str!("../seed/invoices.csv");
const SEED_REVENUE: &str = include_str!("../seed/revenue.csv");

// ============================================================================
// STORED ROWS
// ============================================================================

/// Customer record. Seeded once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

/// Invoice status. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            _ => Err(()),
        }
    }
}

/// Invoice record. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub amount: i64,
    pub status: InvoiceStatus,
    pub date: String,
}

/// Monthly revenue aggregate (whole dollars).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    pub month: String,
    pub revenue: i64,
}

/// Row of `seed/invoices.csv`; ids are assigned on insert.
#[derive(Debug, Deserialize)]
struct SeedInvoice {
    customer_id: String,
    amount: i64,
    status: InvoiceStatus,
    date: String,
}

/// Result of a seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub customers: usize,
    pub invoices: usize,
    pub revenue: usize,
}

// ============================================================================
// CONNECTION + SCHEMA
// ============================================================================

/// Open (or create) the dashboard database and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<(), DashboardError> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            image_url TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES customers(id),
            amount INTEGER NOT NULL CHECK (amount >= 0),
            status TEXT NOT NULL CHECK (status IN ('pending', 'paid')),
            date TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS revenue (
            month TEXT PRIMARY KEY,
            revenue INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_invoices_date ON invoices(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_invoices_customer ON invoices(customer_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SEEDING
// ============================================================================

/// Load the placeholder customers, invoices and revenue.
///
/// Idempotent: customers and revenue are keyed by their natural ids, and
/// invoices are only seeded into an empty table.
pub fn seed_database(conn: &Connection) -> Result<SeedStats, DashboardError> {
    let mut stats = SeedStats::default();

    let mut rdr = csv::Reader::from_reader(SEED_CUSTOMERS.as_bytes());
    for result in rdr.deserialize() {
        let customer: Customer = result?;
        stats.customers += insert_customer(conn, &customer)?;
    }

    let mut rdr = csv::Reader::from_reader(SEED_REVENUE.as_bytes());
    for result in rdr.deserialize() {
        let revenue: Revenue = result?;
        stats.revenue += conn.execute(
            "INSERT OR IGNORE INTO revenue (month, revenue) VALUES (?1, ?2)",
            params![revenue.month, revenue.revenue],
        )?;
    }

    if count_invoices(conn)? == 0 {
        let mut rdr = csv::Reader::from_reader(SEED_INVOICES.as_bytes());
        for result in rdr.deserialize() {
            let seed: SeedInvoice = result?;
            let invoice = Invoice {
                id: uuid::Uuid::new_v4().to_string(),
                customer_id: seed.customer_id,
                amount: seed.amount,
                status: seed.status,
                date: seed.date,
            };
            insert_invoice(conn, &invoice)?;
            stats.invoices += 1;
        }
    }

    tracing::info!(
        customers = stats.customers,
        invoices = stats.invoices,
        revenue = stats.revenue,
        "seeded database"
    );

    Ok(stats)
}

/// Insert a customer unless one with the same id exists. Returns rows written.
pub fn insert_customer(conn: &Connection, customer: &Customer) -> Result<usize, DashboardError> {
    let written = conn.execute(
        "INSERT OR IGNORE INTO customers (id, name, email, image_url) VALUES (?1, ?2, ?3, ?4)",
        params![customer.id, customer.name, customer.email, customer.image_url],
    )?;
    Ok(written)
}

// ============================================================================
// INVOICE WRITES
// ============================================================================

pub fn insert_invoice(conn: &Connection, invoice: &Invoice) -> Result<(), DashboardError> {
    conn.execute(
        "INSERT INTO invoices (id, customer_id, amount, status, date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            invoice.id,
            invoice.customer_id,
            invoice.amount,
            invoice.status.as_str(),
            invoice.date,
        ],
    )?;
    Ok(())
}

/// Update customer, amount and status of one invoice. Returns rows changed.
pub fn update_invoice(
    conn: &Connection,
    id: &str,
    customer_id: &str,
    amount: i64,
    status: InvoiceStatus,
) -> Result<usize, DashboardError> {
    let changed = conn.execute(
        "UPDATE invoices
         SET customer_id = ?1, amount = ?2, status = ?3
         WHERE id = ?4",
        params![customer_id, amount, status.as_str(), id],
    )?;
    Ok(changed)
}

/// Delete one invoice. Returns rows removed (0 when the id is unknown).
pub fn delete_invoice(conn: &Connection, id: &str) -> Result<usize, DashboardError> {
    let removed = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id])?;
    Ok(removed)
}

pub fn count_invoices(conn: &Connection) -> Result<i64, DashboardError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_customers(conn: &Connection) -> Result<i64, DashboardError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM customers", [], |row| row.get(0))?;
    Ok(count)
}

/// Map a status column back to the enum
pub(crate) fn status_from_sql(raw: String, column: usize) -> rusqlite::Result<InvoiceStatus> {
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown invoice status {raw:?}").into(),
        )
    })
}

#[cfg(test)]
pub(crate) fn test_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    setup_database(&conn).unwrap();
    seed_database(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_loads_placeholder_data() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let stats = seed_database(&conn).unwrap();

        assert_eq!(stats.customers, 6);
        assert_eq!(stats.invoices, 13);
        assert_eq!(stats.revenue, 12);
        assert_eq!(count_customers(&conn).unwrap(), 6);
        assert_eq!(count_invoices(&conn).unwrap(), 13);
    }

    #[test]
    fn test_seed_twice_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        seed_database(&conn).unwrap();
        let second = seed_database(&conn).unwrap();

        assert_eq!(second, SeedStats::default(), "Second seed should write nothing");
        assert_eq!(count_invoices(&conn).unwrap(), 13);
        assert_eq!(count_customers(&conn).unwrap(), 6);
    }

    #[test]
    fn test_schema_rejects_negative_amount() {
        let conn = test_connection();
        let invoice = Invoice {
            id: "neg".to_string(),
            customer_id: "d6e15727-9fe1-4961-8c5b-ea44a9bd81aa".to_string(),
            amount: -1,
            status: InvoiceStatus::Paid,
            date: "2024-01-01".to_string(),
        };

        assert!(insert_invoice(&conn, &invoice).is_err());
    }

    #[test]
    fn test_schema_rejects_unknown_customer() {
        let conn = test_connection();
        let invoice = Invoice {
            id: "orphan".to_string(),
            customer_id: "no-such-customer".to_string(),
            amount: 100,
            status: InvoiceStatus::Pending,
            date: "2024-01-01".to_string(),
        };

        assert!(insert_invoice(&conn, &invoice).is_err());
    }

    #[test]
    fn test_update_and_delete_report_affected_rows() {
        let conn = test_connection();
        let invoice = Invoice {
            id: "inv-1".to_string(),
            customer_id: "d6e15727-9fe1-4961-8c5b-ea44a9bd81aa".to_string(),
            amount: 100,
            status: InvoiceStatus::Pending,
            date: "2024-01-01".to_string(),
        };
        insert_invoice(&conn, &invoice).unwrap();

        let changed = update_invoice(
            &conn,
            "inv-1",
            "76d65c26-f784-44a2-ac19-586678f7c2f2",
            250,
            InvoiceStatus::Paid,
        )
        .unwrap();
        assert_eq!(changed, 1);

        assert_eq!(delete_invoice(&conn, "inv-1").unwrap(), 1);
        assert_eq!(delete_invoice(&conn, "inv-1").unwrap(), 0);
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!("paid".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Paid));
        assert_eq!("pending".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Pending));
        assert!("Paid".parse::<InvoiceStatus>().is_err());
        assert_eq!(InvoiceStatus::Pending.to_string(), "pending");
    }
}
