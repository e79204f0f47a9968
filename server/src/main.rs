//! `todos-server` binary.
//!
//! Serves every visitor's to-do lists from memory. Lists belong to the
//! session named by the `todos.session` cookie and disappear when that
//! session idles out or the process stops; there is no database.
//!
//! Startup reads [`todos_server::config::Config`] from the environment,
//! starts a sweeper for idle sessions, and serves HTTP until SIGINT or
//! SIGTERM. Logs are JSON lines filtered by `RUST_LOG`.
//!
//! ```bash
//! # Local run on port 4567
//! cargo run --bin todos-server
//!
//! # Behind TLS, with one-hour sessions and a smaller store
//! TODOS_SECURE_COOKIE=true TODOS_SESSION_TTL_SECS=3600 TODOS_MAX_SESSIONS=2000 \
//!     cargo run --release --bin todos-server
//! ```

use std::process::ExitCode;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use todos_server::config::Config;
use todos_server::routes::{create_router, AppState};

/// How often idle sessions are swept from the store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            print_usage(&err);
            return ExitCode::from(1);
        }
    };

    match serve(config).await {
        Ok(()) => {
            info!("Todos server stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Todos server failed");
            ExitCode::from(1)
        }
    }
}

/// Binds the listener and serves until a shutdown signal arrives.
///
/// The session sweeper lives exactly as long as this call.
async fn serve(config: Config) -> std::io::Result<()> {
    info!(
        port = config.port,
        session_ttl_secs = config.session_ttl.as_secs(),
        max_sessions = config.max_sessions,
        secure_cookie = config.secure_cookie,
        "Todos server starting"
    );
    if !config.secure_cookie {
        warn!("Session cookie is not marked Secure; serve over HTTPS in production");
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await.inspect_err(|err| {
        error!(error = %err, address = %bind_addr, "Failed to bind to address");
    })?;
    info!(address = %bind_addr, "Listening");

    let state = AppState::new(config);
    let sweeper = state.sessions.spawn_cleanup_task(SESSION_SWEEP_INTERVAL);

    let result = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    result
}

/// Explains the accepted environment after a configuration error.
fn print_usage(err: &todos_server::config::ConfigError) {
    eprintln!("Error: {err}");
    eprintln!();
    eprintln!("Environment (all optional):");
    eprintln!("  PORT                    HTTP port (default 4567)");
    eprintln!("  TODOS_SESSION_TTL_SECS  idle session lifetime, 1..=31536000 (default 86400)");
    eprintln!("  TODOS_MAX_SESSIONS      sessions held at once, > 0 (default 10000)");
    eprintln!("  TODOS_SECURE_COOKIE     'true' to mark the cookie Secure");
    eprintln!("  RUST_LOG                log filter (default info,tower_http=debug)");
}

/// Installs the JSON log subscriber; `RUST_LOG` overrides the default filter.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_target(true).with_file(false).with_line_number(false))
        .init();
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "SIGINT", "Shutting down"),
        _ = terminate => info!(signal = "SIGTERM", "Shutting down"),
    }
}
