use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "dashboard.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Settings shared by the CLI and the server, from flags or environment
#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    #[arg(
        long = "db",
        env = "DASHBOARD_DB",
        value_name = "FILE",
        default_value = DEFAULT_DB_PATH,
        help = "SQLite database file",
        global = true
    )]
    pub db_path: PathBuf,

    #[arg(
        long,
        env = "DASHBOARD_LOG_JSON",
        help = "Emit logs as JSON lines",
        global = true
    )]
    pub log_json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[arg(
        long,
        env = "DASHBOARD_BIND",
        value_name = "ADDR",
        default_value = DEFAULT_BIND,
        help = "Address the HTTP server listens on"
    )]
    pub bind: SocketAddr,

    #[arg(
        long,
        env = "DASHBOARD_SEED",
        help = "Load placeholder data before serving"
    )]
    pub seed: bool,
}
