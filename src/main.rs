use clap::Parser;
use rookery::cli::{Args, AuthArgs, Command, ReservationsArgs, init_logging, load_signing_secret, open_store};
use rookery::{AuthConfig, ReservationsConfig, run_auth_service, run_reservations_service};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    match args.command {
        Command::Auth(auth_args) => run_auth(auth_args).await,
        Command::Reservations(reservations_args) => run_reservations(reservations_args).await,
    }
}

async fn bind(port: u16) -> TcpListener {
    let addr = format!("0.0.0.0:{}", port);
    TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        error!(address = %addr, error = %e, "Failed to bind");
        std::process::exit(1);
    })
}

async fn run_auth(args: AuthArgs) {
    let Some(secret) = load_signing_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(store) = open_store(&args.database).await else {
        std::process::exit(1);
    };

    let config = AuthConfig {
        store,
        signing_secret: secret.into_bytes(),
        token_lifetime_secs: args.token_lifetime,
        secure_cookies: args.secure_cookies,
    };

    let http_listener = bind(args.port).await;
    let rpc_listener = bind(args.rpc_port).await;

    info!(
        http = %http_listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
        rpc = %rpc_listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
        "Auth service listening"
    );

    if let Err(e) = run_auth_service(config, http_listener, rpc_listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn run_reservations(args: ReservationsArgs) {
    let Some(store) = open_store(&args.database).await else {
        std::process::exit(1);
    };

    let config = ReservationsConfig {
        store,
        authority_addr: args.auth_addr,
        authority_timeout_secs: args.auth_timeout,
    };

    let listener = bind(args.port).await;

    info!(
        address = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
        authority = %config.authority_addr,
        "Reservations service listening"
    );

    if let Err(e) = run_reservations_service(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
