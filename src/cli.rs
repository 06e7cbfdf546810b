//! CLI argument parsing, validation, and startup helpers.

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::store::Store;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rookery",
    about = "Reservation system with delegated token authentication"
)]
pub struct Args {
    /// Log output format
    #[arg(short, long, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the auth service: HTTP API plus the RPC authenticate endpoint
    Auth(AuthArgs),
    /// Run the reservations service
    Reservations(ReservationsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AuthArgs {
    /// Port for the HTTP API
    #[arg(short, long, default_value = "7301")]
    pub port: u16,

    /// Port for the RPC endpoint
    #[arg(long, default_value = "7302")]
    pub rpc_port: u16,

    /// Path to the SQLite store file
    #[arg(short, long, default_value = "rookery-auth.db")]
    pub database: String,

    /// Path to file containing the signing secret. Prefer the JWT_SECRET env var
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, default_value = "3600")]
    pub token_lifetime: u64,

    /// Set the Secure flag on the Authentication cookie (HTTPS deployments)
    #[arg(long)]
    pub secure_cookies: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReservationsArgs {
    /// Port for the HTTP API
    #[arg(short, long, default_value = "7300")]
    pub port: u16,

    /// Path to the SQLite store file
    #[arg(short, long, default_value = "rookery-reservations.db")]
    pub database: String,

    /// Address of the auth service's RPC endpoint
    #[arg(long, default_value = "127.0.0.1:7302")]
    pub auth_addr: String,

    /// Timeout in seconds for each authority call
    #[arg(long, default_value = "5")]
    pub auth_timeout: u64,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the signing secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_signing_secret(secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read signing secret file");
                return None;
            }
        }
    } else {
        error!(
            "Signing secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_SIGNING_SECRET_LENGTH {
        error!(
            "Signing secret is shorter than {} characters. Use a longer secret",
            MIN_SIGNING_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Open the store, logging errors if it fails.
pub async fn open_store(path: &str) -> Option<Store> {
    match Store::open(path).await {
        Ok(store) => {
            info!(path = %path, "Store opened");
            Some(store)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open store");
            None
        }
    }
}
