// Invoice Dashboard - Web Server

use anyhow::{Context, Result};
use clap::Parser;

use invoice_dashboard::config::ServerArgs;
use invoice_dashboard::server::{build_app, AppState};
use invoice_dashboard::{logging, open_database, seed_database};

#[derive(Parser, Debug)]
#[command(name = "invoice-dashboard-server")]
#[command(version, about = "Serve the invoice dashboard over HTTP", long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { server: args } = Cli::parse();
    logging::init(args.database.log_json);

    let conn = open_database(&args.database.db_path)?;
    tracing::info!(path = %args.database.db_path.display(), "database opened");

    if args.seed {
        seed_database(&conn).context("Failed to seed database")?;
    }

    let app = build_app(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;

    tracing::info!(addr = %args.bind, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("shutting down");
}
