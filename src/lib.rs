// Invoice Dashboard - Core Library
// Exposes the storage, query, mutation and presentation layers to the CLI,
// the HTTP server and tests

pub mod actions;        // Mutation Layer
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod queries;        // Query Layer
pub mod schema;         // Form validation
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use actions::{create_invoice, delete_invoice, update_invoice, ActionOutcome};
pub use cache::{PageCache, INVOICES_PATH};
pub use db::{
    Customer, Invoice, InvoiceStatus, Revenue, SeedStats,
    open_database, setup_database, seed_database,
};
pub use error::{DashboardError, DashboardResult};
pub use queries::{
    CardData, CustomerField, CustomersTableRow, InvoiceForm, InvoicesTableRow, LatestInvoice,
    ITEMS_PER_PAGE,
    fetch_card_data, fetch_customers, fetch_filtered_customers, fetch_filtered_invoices,
    fetch_invoice_by_id, fetch_invoices_pages, fetch_latest_invoices, fetch_revenue,
};
pub use schema::{FormState, InvoiceInput, RawForm, ValidationError, validate_invoice_form};
