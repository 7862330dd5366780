//! Fleet-control daemon entry point (spec.md §2, §6). Instead of driving one
//! callsign to completion, this boots the persistence layer, recovers any
//! containers left RUNNING/STARTING from a previous run, and serves the
//! control socket until SIGINT/SIGTERM.

use std::sync::Arc;

use log::*;
use tokio_util::sync::CancellationToken;

use st::api_client::ApiClient;
use st::config::CONFIG;
use st::container_runtime::Runtime;
use st::control_protocol;
use st::persistence::Db;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    info!("starting fleet-control daemon");
    info!("database: {}", redact_database_url(&CONFIG.database_url));
    info!("control socket: {}", CONFIG.daemon_socket_path);

    let db = match Db::connect(&CONFIG.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db.apply_schema().await {
        error!("failed to apply schema: {}", e);
        std::process::exit(1);
    }

    let api = ApiClient::new();
    let runtime = Arc::new(Runtime::new(db, api));

    // Crash-safe recovery (spec.md §4.6): every container persisted as
    // RUNNING/STARTING before this boot is rescheduled now, before the
    // control socket starts accepting new work.
    match runtime.recover().await {
        Ok(count) => info!("recovered {} container(s) from a previous run", count),
        Err(e) => error!("container recovery failed: {}", e),
    }

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received, stopping accept loop and containers");
        signal_shutdown.cancel();
    });

    let serve_result = control_protocol::serve(runtime.clone(), &CONFIG.daemon_socket_path, shutdown.clone()).await;

    // Accept loop has stopped (either the signal fired or bind/accept
    // failed outright); either way, give running containers their grace
    // period before the process exits (spec.md §6 "cancel containers with
    // grace, close storage").
    runtime.shutdown_all().await;
    runtime.db().close().await;

    match serve_result {
        Ok(()) => {
            info!("daemon shut down cleanly");
            std::process::exit(0);
        }
        Err(e) => {
            error!("control socket error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Resolves on either SIGINT or SIGTERM (spec.md §6). `ctrl_c` alone misses
/// the TERM a process supervisor sends, so both are raced explicitly.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Never logs a connection string's credentials (spec.md §7 "MUST NOT leak
/// secrets") — only the scheme survives.
fn redact_database_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, _rest)) => format!("{}://<redacted>", scheme),
        None => "<redacted>".to_string(),
    }
}
