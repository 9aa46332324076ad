use anyhow::Result;
use clap::{Parser, Subcommand};

use invoice_dashboard::config::DatabaseArgs;
use invoice_dashboard::utils::{format_currency, format_date_to_local};
use invoice_dashboard::{
    fetch_filtered_customers, fetch_filtered_invoices, fetch_invoices_pages, logging,
    open_database, seed_database,
};

#[derive(Parser, Debug)]
#[command(name = "invoice-dashboard")]
#[command(version, about = "Seed and inspect the invoice dashboard database", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and load placeholder customers, invoices and revenue
    Seed,
    /// Print one page of the invoices table
    Invoices {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print the customers table
    Customers {
        #[arg(long, default_value = "")]
        query: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.database.log_json);

    let conn = open_database(&cli.database.db_path)?;

    match cli.command {
        Command::Seed => {
            let stats = seed_database(&conn)?;
            println!("✓ Customers inserted: {}", stats.customers);
            println!("✓ Invoices inserted:  {}", stats.invoices);
            println!("✓ Revenue rows:       {}", stats.revenue);
        }
        Command::Invoices { query, page } => {
            let page = page.max(1);
            let rows = fetch_filtered_invoices(&conn, &query, page)?;
            let total_pages = fetch_invoices_pages(&conn, &query)?;

            println!(
                "{:<20} {:<22} {:>12} {:<14} {:<8}",
                "Customer", "Email", "Amount", "Date", "Status"
            );
            for row in &rows {
                println!(
                    "{:<20} {:<22} {:>12} {:<14} {:<8}",
                    row.name,
                    row.email,
                    format_currency(row.amount),
                    format_date_to_local(&row.date),
                    row.status.as_str()
                );
            }
            println!("\nPage {} of {}", page, total_pages);
        }
        Command::Customers { query } => {
            let rows = fetch_filtered_customers(&conn, &query)?;

            println!(
                "{:<20} {:<22} {:>8} {:>12} {:>12}",
                "Name", "Email", "Invoices", "Pending", "Paid"
            );
            for row in &rows {
                println!(
                    "{:<20} {:<22} {:>8} {:>12} {:>12}",
                    row.name, row.email, row.total_invoices, row.total_pending, row.total_paid
                );
            }
        }
    }

    Ok(())
}
