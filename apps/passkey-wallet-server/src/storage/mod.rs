// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   wallets.redb    # credential → wallet records, contract → signers
//! ```

pub mod registry;

pub use registry::{
    RedbWalletRegistry, RegistryError, RegistryResult, WalletRecord, WalletRegistry, WalletSigner,
};

/// File name of the registry database under the data directory.
pub const REGISTRY_FILE: &str = "wallets.redb";
