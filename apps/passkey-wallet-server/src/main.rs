// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{error, info};

use passkey_wallet_server::{
    api::router,
    config::{ConfigurationGate, ServerSettings, DEFAULT_LOG_FILTER},
    logging::init_logging,
    network::Backend,
    state::AppState,
    storage::{RedbWalletRegistry, REGISTRY_FILE},
    wallet::ServiceSettings,
};

/// Grace period for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[tokio::main]
async fn main() {
    let settings = match ServerSettings::from_lookup(&env_lookup) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid server configuration: {e}");
            process::exit(1);
        }
    };

    init_logging(settings.log_format, DEFAULT_LOG_FILTER);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let selection = ConfigurationGate::select(env_lookup);
    let backend =
        Backend::connect(&selection, settings.mock_latency).expect("Failed to build network client");

    std::fs::create_dir_all(&settings.data_dir).expect("Failed to create data directory");
    let registry = RedbWalletRegistry::open(&settings.data_dir.join(REGISTRY_FILE))
        .expect("Failed to open wallet registry");

    let state = AppState::new(
        backend,
        Arc::new(registry),
        selection.chain(),
        ServiceSettings {
            relying_party: settings.relying_party.clone(),
            ceremony_timeout: settings.ceremony_timeout,
            poll: settings.poll,
        },
    )
    .expect("Failed to initialize wallet services");
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .expect("Failed to parse bind address");

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("shutdown signal received");
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    match &settings.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate and key");
            info!(%addr, "passkey wallet server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            info!(%addr, "passkey wallet server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }
}
