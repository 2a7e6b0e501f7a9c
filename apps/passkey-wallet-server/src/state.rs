// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::ceremony::CeremonyBridge;
use crate::config::ChainParams;
use crate::error::WalletError;
use crate::network::Backend;
use crate::storage::WalletRegistry;
use crate::wallet::{ServiceSettings, WalletInfo, WalletServices};

/// What a bridged ceremony task reports back to `finish`/`cancel`.
pub type CeremonyOutcome = Result<WalletInfo, WalletError>;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<WalletServices<Backend>>,
    pub bridge: Arc<CeremonyBridge<CeremonyOutcome>>,
    pub registry: Arc<dyn WalletRegistry>,
    /// `real` or `mock`
    pub backend: &'static str,
    /// Cancelled on shutdown; parent of every ceremony token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        backend: Backend,
        registry: Arc<dyn WalletRegistry>,
        chain: ChainParams,
        settings: ServiceSettings,
    ) -> Result<Self, WalletError> {
        let kind = backend.kind();
        let services = WalletServices::new(Arc::new(backend), registry.clone(), chain, settings)?;

        Ok(Self {
            services: Arc::new(services),
            bridge: Arc::new(CeremonyBridge::new()),
            registry,
            backend: kind,
            shutdown: CancellationToken::new(),
        })
    }
}
