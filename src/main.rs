// Main entry point: `finplan identity` or `finplan gateway`

use finplan_identity::api::{create_gateway_router, AppState};
use finplan_identity::auth::audit_logger::AuditLogger;
use finplan_identity::auth::{EdgeAuthState, LocalTokenVerifier, TokenVerifier};
use finplan_identity::config::{Config, ServiceRole, VerifyMode};
use finplan_identity::core::crypto::{TokenSigner, RECOMMENDED_SECRET_LEN};
use finplan_identity::identity::{create_identity_router, IdentityService};
use finplan_identity::proxy::{HttpDownstreamClient, HttpIdentityClient};
use finplan_identity::store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};

use anyhow::Context;
use axum::Router;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "finplan", version, about = "Finplan identity service and edge gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the identity service (register, login, verify)
    Identity,
    /// Run the edge gateway
    Gateway,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let role = match cli.command {
        Command::Identity => ServiceRole::Identity,
        Command::Gateway => ServiceRole::Gateway,
    };

    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env(role) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!(role = %role, "Starting finplan");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        "Configuration loaded"
    );

    if config.jwt_secret.is_weak() {
        warn!(
            length = config.jwt_secret.len(),
            recommended = RECOMMENDED_SECRET_LEN,
            "JWT_SECRET is shorter than recommended"
        );
    }

    let signer = Arc::new(TokenSigner::new(&config.jwt_secret, config.token_ttl()));

    // 3. Build the role's router
    let router = match role {
        ServiceRole::Identity => build_identity(&config, signer).await?,
        ServiceRole::Gateway => build_gateway(&config, signer)?,
    };

    // 4. Start HTTP server
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %addr, "Failed to bind to address");
            e
        })
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Credential store, identity service and its RPC router
async fn build_identity(config: &Config, signer: Arc<TokenSigner>) -> anyhow::Result<Router> {
    let store_timeout = Duration::from_secs(config.store_timeout_secs);

    let store: Arc<dyn CredentialStore> = match config.database_url {
        Some(ref database_url) => {
            let db_pool = PgPoolOptions::new()
                .acquire_timeout(store_timeout)
                .connect(database_url.expose_secret())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to database");
                    e
                })
                .context("failed to connect to DATABASE_URL")?;
            info!("Database pool initialized");

            let store = PgCredentialStore::new(db_pool);
            store.run_migrations().await?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set - using in-memory credential store; accounts are lost on restart");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let service = IdentityService::new(store, signer, config.bcrypt_cost, store_timeout);
    info!(
        bcrypt_cost = config.bcrypt_cost,
        token_ttl_hours = config.token_ttl_hours,
        "Identity service initialized"
    );

    Ok(create_identity_router(
        service,
        config.body_size_limit_bytes,
        Duration::from_secs(config.request_timeout_secs),
    ))
}

/// Verifier, remote clients and the gateway router
fn build_gateway(config: &Config, signer: Arc<TokenSigner>) -> anyhow::Result<Router> {
    let rpc_timeout = Duration::from_secs(config.rpc_timeout_secs);

    let identity = Arc::new(HttpIdentityClient::new(&config.identity_service_url, rpc_timeout)?);
    info!(url = %config.identity_service_url, "Identity client initialized");

    let verifier: Arc<dyn TokenVerifier> = match config.verify_mode {
        VerifyMode::Local => Arc::new(LocalTokenVerifier::new(signer)),
        VerifyMode::Remote => identity.clone(),
    };
    info!(verify_mode = ?config.verify_mode, "Token verifier initialized");

    let downstream = Arc::new(HttpDownstreamClient::new(
        &config.user_service_url,
        &config.transaction_service_url,
        rpc_timeout,
    )?);
    info!("Downstream client initialized");

    let edge_state = Arc::new(EdgeAuthState {
        verifier,
        audit_logger: Arc::new(AuditLogger::new()),
        verify_timeout: rpc_timeout,
    });

    let app_state = AppState {
        identity,
        downstream,
        config: Arc::new(config.clone()),
    };

    Ok(create_gateway_router(app_state, edge_state))
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // Create filter from RUST_LOG env var or config
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    let result = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
