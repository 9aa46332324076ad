// Query Layer - read-only SQL against customers, invoices and revenue

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::{count_customers, count_invoices, status_from_sql, InvoiceStatus, Revenue};
use crate::error::DashboardResult;
use crate::utils::format_currency;

/// Rows per page of the invoices table
pub const ITEMS_PER_PAGE: u32 = 6;

/// Rows shown in the "latest invoices" card
pub const LATEST_INVOICES: u32 = 5;

// ============================================================================
// VIEW ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoicesTableRow {
    pub id: String,
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub date: String,
    pub amount: i64,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestInvoice {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardData {
    pub number_of_invoices: i64,
    pub number_of_customers: i64,
    pub total_paid_invoices: String,
    pub total_pending_invoices: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerField {
    pub id: String,
    pub name: String,
}

/// Invoice as the edit form sees it: amount in dollars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceForm {
    pub id: String,
    pub customer_id: String,
    pub amount: f64,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomersTableRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub total_invoices: i64,
    pub total_pending: String,
    pub total_paid: String,
}

// ============================================================================
// SEARCH
// ============================================================================

/// `%term%` pattern for `LIKE ... ESCAPE '\'`, with wildcards in the term
/// matched literally
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

// SQLite's LIKE folds case for ASCII letters only: "ÉLODIE" will not match
// "élodie". Same for the customers search below.
const INVOICE_SEARCH: &str = "customers.name LIKE ?1 ESCAPE '\\'
        OR customers.email LIKE ?1 ESCAPE '\\'
        OR CAST(invoices.amount AS TEXT) LIKE ?1 ESCAPE '\\'
        OR invoices.date LIKE ?1 ESCAPE '\\'
        OR invoices.status LIKE ?1 ESCAPE '\\'";

/// One page of invoices matching `query`, newest first
pub fn fetch_filtered_invoices(
    conn: &Connection,
    query: &str,
    current_page: u32,
) -> DashboardResult<Vec<InvoicesTableRow>> {
    let offset = i64::from(current_page.max(1) - 1) * i64::from(ITEMS_PER_PAGE);

    let sql = format!(
        "SELECT invoices.id, invoices.customer_id, customers.name, customers.email,
                customers.image_url, invoices.date, invoices.amount, invoices.status
         FROM invoices
         JOIN customers ON invoices.customer_id = customers.id
         WHERE {INVOICE_SEARCH}
         ORDER BY invoices.date DESC, invoices.id
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params![like_pattern(query), ITEMS_PER_PAGE, offset], |row| {
            Ok(InvoicesTableRow {
                id: row.get(0)?,
                customer_id: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
                image_url: row.get(4)?,
                date: row.get(5)?,
                amount: row.get(6)?,
                status: status_from_sql(row.get(7)?, 7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Number of invoices matching `query`
pub fn count_filtered_invoices(conn: &Connection, query: &str) -> DashboardResult<i64> {
    let sql = format!(
        "SELECT COUNT(*)
         FROM invoices
         JOIN customers ON invoices.customer_id = customers.id
         WHERE {INVOICE_SEARCH}"
    );
    let count: i64 = conn.query_row(&sql, params![like_pattern(query)], |row| row.get(0))?;
    Ok(count)
}

/// Total pages for `query`: ceil(matches / ITEMS_PER_PAGE)
pub fn fetch_invoices_pages(conn: &Connection, query: &str) -> DashboardResult<u32> {
    let count = count_filtered_invoices(conn, query)?;
    Ok(total_pages(count))
}

pub fn total_pages(matches: i64) -> u32 {
    let per_page = i64::from(ITEMS_PER_PAGE);
    let pages = (matches.max(0) + per_page - 1) / per_page;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

// ============================================================================
// DASHBOARD OVERVIEW
// ============================================================================

/// Monthly revenue in calendar (insertion) order
pub fn fetch_revenue(conn: &Connection) -> DashboardResult<Vec<Revenue>> {
    let mut stmt = conn.prepare("SELECT month, revenue FROM revenue ORDER BY rowid")?;

    let revenue = stmt
        .query_map([], |row| {
            Ok(Revenue {
                month: row.get(0)?,
                revenue: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(revenue)
}

pub fn fetch_latest_invoices(conn: &Connection) -> DashboardResult<Vec<LatestInvoice>> {
    let mut stmt = conn.prepare(
        "SELECT invoices.id, customers.name, customers.email, customers.image_url, invoices.amount
         FROM invoices
         JOIN customers ON invoices.customer_id = customers.id
         ORDER BY invoices.date DESC, invoices.id
         LIMIT ?1",
    )?;

    let latest = stmt
        .query_map(params![LATEST_INVOICES], |row| {
            let amount: i64 = row.get(4)?;
            Ok(LatestInvoice {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                image_url: row.get(3)?,
                amount: format_currency(amount),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(latest)
}

pub fn fetch_card_data(conn: &Connection) -> DashboardResult<CardData> {
    let number_of_invoices = count_invoices(conn)?;
    let number_of_customers = count_customers(conn)?;

    let (paid, pending): (i64, i64) = conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0)
         FROM invoices",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(CardData {
        number_of_invoices,
        number_of_customers,
        total_paid_invoices: format_currency(paid),
        total_pending_invoices: format_currency(pending),
    })
}

// ============================================================================
// FORMS + CUSTOMERS
// ============================================================================

/// Invoice for the edit form; `None` when no invoice has this id
pub fn fetch_invoice_by_id(conn: &Connection, id: &str) -> DashboardResult<Option<InvoiceForm>> {
    let invoice = conn
        .query_row(
            "SELECT id, customer_id, amount, status FROM invoices WHERE id = ?1",
            params![id],
            |row| {
                let cents: i64 = row.get(2)?;
                Ok(InvoiceForm {
                    id: row.get(0)?,
                    customer_id: row.get(1)?,
                    amount: cents as f64 / 100.0,
                    status: status_from_sql(row.get(3)?, 3)?,
                })
            },
        )
        .optional()?;

    Ok(invoice)
}

/// Customer options for the invoice forms, by name
pub fn fetch_customers(conn: &Connection) -> DashboardResult<Vec<CustomerField>> {
    let mut stmt = conn.prepare("SELECT id, name FROM customers ORDER BY name ASC")?;

    let customers = stmt
        .query_map([], |row| {
            Ok(CustomerField {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(customers)
}

/// Customers whose name or email contains `query`, with invoice totals
pub fn fetch_filtered_customers(
    conn: &Connection,
    query: &str,
) -> DashboardResult<Vec<CustomersTableRow>> {
    let mut stmt = conn.prepare(
        "SELECT
            customers.id,
            customers.name,
            customers.email,
            customers.image_url,
            COUNT(invoices.id),
            COALESCE(SUM(CASE WHEN invoices.status = 'pending' THEN invoices.amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN invoices.status = 'paid' THEN invoices.amount ELSE 0 END), 0)
         FROM customers
         LEFT JOIN invoices ON customers.id = invoices.customer_id
         WHERE customers.name LIKE ?1 ESCAPE '\\'
            OR customers.email LIKE ?1 ESCAPE '\\'
         GROUP BY customers.id, customers.name, customers.email, customers.image_url
         ORDER BY customers.name ASC",
    )?;

    let customers = stmt
        .query_map(params![like_pattern(query)], |row| {
            let pending: i64 = row.get(5)?;
            let paid: i64 = row.get(6)?;
            Ok(CustomersTableRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                image_url: row.get(3)?,
                total_invoices: row.get(4)?,
                total_pending: format_currency(pending),
                total_paid: format_currency(paid),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(customers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        delete_invoice, insert_customer, insert_invoice, test_connection, Customer, Invoice,
    };

    #[test]
    fn test_unfiltered_first_page_is_newest_six() {
        let conn = test_connection();

        let rows = fetch_filtered_invoices(&conn, "", 1).unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].date, "2023-09-10");
        assert_eq!(rows[0].name, "Michael Novotny");
        assert!(rows.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_pages_partition_all_invoices() {
        let conn = test_connection();

        let pages = fetch_invoices_pages(&conn, "").unwrap();
        assert_eq!(pages, 3);

        let mut seen = Vec::new();
        for page in 1..=pages {
            let rows = fetch_filtered_invoices(&conn, "", page).unwrap();
            assert!(rows.len() <= ITEMS_PER_PAGE as usize);
            seen.extend(rows.into_iter().map(|r| r.id));
        }
        assert_eq!(seen.len(), 13);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 13, "Pages should not overlap");

        assert!(fetch_filtered_invoices(&conn, "", 4).unwrap().is_empty());
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let conn = test_connection();

        assert_eq!(
            fetch_filtered_invoices(&conn, "", 0).unwrap(),
            fetch_filtered_invoices(&conn, "", 1).unwrap()
        );
    }

    #[test]
    fn test_search_is_case_insensitive_on_name_and_email() {
        let conn = test_connection();

        let rows = fetch_filtered_invoices(&conn, "RABBIT", 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.name == "Evil Rabbit"));

        let rows = fetch_filtered_invoices(&conn, "oliveira.com", 1).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_search_matches_status_amount_and_date() {
        let conn = test_connection();

        assert_eq!(count_filtered_invoices(&conn, "Pending").unwrap(), 5);
        assert_eq!(count_filtered_invoices(&conn, "paid").unwrap(), 8);
        assert_eq!(fetch_invoices_pages(&conn, "paid").unwrap(), 2);

        let rows = fetch_filtered_invoices(&conn, "54246", 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Lee Robinson");

        assert_eq!(count_filtered_invoices(&conn, "2023-06").unwrap(), 5);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let conn = test_connection();

        assert_eq!(count_filtered_invoices(&conn, "%").unwrap(), 0);
        assert_eq!(count_filtered_invoices(&conn, "_").unwrap(), 0);
        assert_eq!(fetch_invoices_pages(&conn, "%").unwrap(), 0);
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(6), 1);
        assert_eq!(total_pages(7), 2);
        assert_eq!(total_pages(13), 3);
    }

    #[test]
    fn test_revenue_in_calendar_order() {
        let conn = test_connection();

        let revenue = fetch_revenue(&conn).unwrap();

        assert_eq!(revenue.len(), 12);
        assert_eq!(revenue[0].month, "Jan");
        assert_eq!(revenue[11].month, "Dec");
        assert_eq!(revenue[11].revenue, 4800);
    }

    #[test]
    fn test_latest_invoices() {
        let conn = test_connection();

        let latest = fetch_latest_invoices(&conn).unwrap();

        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].name, "Michael Novotny");
        assert_eq!(latest[0].amount, "$448.00");
        assert_eq!(latest[4].name, "Evil Rabbit");
        assert_eq!(latest[4].amount, "$6.66");
    }

    #[test]
    fn test_card_data() {
        let conn = test_connection();

        let cards = fetch_card_data(&conn).unwrap();

        assert_eq!(cards.number_of_invoices, 13);
        assert_eq!(cards.number_of_customers, 6);
        assert_eq!(cards.total_paid_invoices, "$1,006.26");
        assert_eq!(cards.total_pending_invoices, "$1,256.32");
    }

    #[test]
    fn test_card_counts_follow_stored_rows() {
        let conn = test_connection();
        let rows = fetch_filtered_invoices(&conn, "", 1).unwrap();
        delete_invoice(&conn, &rows[0].id).unwrap();

        let cards = fetch_card_data(&conn).unwrap();

        assert_eq!(cards.number_of_invoices, count_invoices(&conn).unwrap());
        assert_eq!(cards.number_of_invoices, 12);
        assert_eq!(cards.number_of_customers, count_customers(&conn).unwrap());
    }

    #[test]
    fn test_search_folds_ascii_case_only() {
        let conn = test_connection();
        insert_customer(
            &conn,
            &Customer {
                id: "elodie".to_string(),
                name: "Élodie Martin".to_string(),
                email: "elodie@example.com".to_string(),
                image_url: "/customers/elodie.png".to_string(),
            },
        )
        .unwrap();
        insert_invoice(
            &conn,
            &Invoice {
                id: "inv-elodie".to_string(),
                customer_id: "elodie".to_string(),
                amount: 4321,
                status: InvoiceStatus::Pending,
                date: "2024-02-01".to_string(),
            },
        )
        .unwrap();

        assert_eq!(fetch_filtered_invoices(&conn, "MARTIN", 1).unwrap().len(), 1);
        assert_eq!(fetch_filtered_invoices(&conn, "Élodie", 1).unwrap().len(), 1);
        // Non-ASCII letters are compared exactly
        assert!(fetch_filtered_invoices(&conn, "élodie m", 1).unwrap().is_empty());
        assert!(fetch_filtered_customers(&conn, "élodie m").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_invoice_by_id() {
        let conn = test_connection();
        let rows = fetch_filtered_invoices(&conn, "", 1).unwrap();
        let first = &rows[0];

        let form = fetch_invoice_by_id(&conn, &first.id).unwrap().unwrap();
        assert_eq!(form.customer_id, first.customer_id);
        assert_eq!(form.amount, 448.0);
        assert_eq!(form.status, InvoiceStatus::Paid);

        assert!(fetch_invoice_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_fetch_customers_sorted_by_name() {
        let conn = test_connection();

        let customers = fetch_customers(&conn).unwrap();

        let names: Vec<&str> = customers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Amy Burns",
                "Balazs Orban",
                "Delba de Oliveira",
                "Evil Rabbit",
                "Lee Robinson",
                "Michael Novotny",
            ]
        );
    }

    #[test]
    fn test_filtered_customers_totals() {
        let conn = test_connection();

        let rows = fetch_filtered_customers(&conn, "evil").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_invoices, 2);
        assert_eq!(rows[0].total_pending, "$164.61");
        assert_eq!(rows[0].total_paid, "$0.00");

        assert_eq!(fetch_filtered_customers(&conn, "").unwrap().len(), 6);
        assert!(fetch_filtered_customers(&conn, "nobody").unwrap().is_empty());
    }
}
