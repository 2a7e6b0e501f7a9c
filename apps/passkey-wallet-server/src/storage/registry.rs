// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet registry backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `wallets`: credential_id → serialized WalletRecord
//! - `signers`: contract address → serialized signer list
//!
//! A credential maps to exactly one contract. `register` checks and
//! inserts inside one write transaction, so a second record for the same
//! credential is refused rather than overwritten.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

// =============================================================================
// Table Definitions
// =============================================================================

/// credential_id → WalletRecord (JSON bytes).
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// contract address → Vec<WalletSigner> (JSON bytes).
const SIGNERS: TableDefinition<&str, &[u8]> = TableDefinition::new("signers");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("credential {0} already has a wallet")]
    AlreadyRegistered(String),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// =============================================================================
// Records
// =============================================================================

/// Binding of a passkey credential to its contract wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    /// base64url credential id
    pub credential_id: String,
    /// `C…` contract strkey
    pub contract_address: String,
    /// base64url uncompressed P-256 key, the wallet's signer
    pub public_key: String,
    pub created_at: DateTime<Utc>,
    /// Hash of the deployment transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_tx_hash: Option<String>,
}

/// A key authorized on a contract wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletSigner {
    pub credential_id: String,
    pub public_key: String,
    pub added_at: DateTime<Utc>,
}

/// Credential → wallet mapping.
pub trait WalletRegistry: Send + Sync {
    /// Insert a new record. Fails with [`RegistryError::AlreadyRegistered`]
    /// when the credential already has one.
    fn register(&self, record: &WalletRecord) -> RegistryResult<()>;

    fn lookup(&self, credential_id: &str) -> RegistryResult<Option<WalletRecord>>;

    /// Signers known for a contract; empty when the contract is unknown.
    fn signers(&self, contract_address: &str) -> RegistryResult<Vec<WalletSigner>>;

    /// Cheap read used by health checks.
    fn check(&self) -> RegistryResult<()>;
}

// =============================================================================
// RedbWalletRegistry
// =============================================================================

pub struct RedbWalletRegistry {
    db: Database,
}

impl RedbWalletRegistry {
    /// Open (or create) the registry at the given path.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create tables so read transactions never miss them
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(SIGNERS)?;
        }
        write_txn.commit()?;

        info!(path = %path.display(), "wallet registry opened");
        Ok(Self { db })
    }
}

impl WalletRegistry for RedbWalletRegistry {
    fn register(&self, record: &WalletRecord) -> RegistryResult<()> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut wallets = write_txn.open_table(WALLETS)?;
            let exists = wallets.get(record.credential_id.as_str())?.is_some();
            if exists {
                // Dropping the write transaction aborts it
                return Err(RegistryError::AlreadyRegistered(
                    record.credential_id.clone(),
                ));
            }
            wallets.insert(record.credential_id.as_str(), json.as_slice())?;

            let mut signers_table = write_txn.open_table(SIGNERS)?;
            let mut signers: Vec<WalletSigner> =
                match signers_table.get(record.contract_address.as_str())? {
                    Some(value) => serde_json::from_slice(value.value())?,
                    None => Vec::new(),
                };
            signers.push(WalletSigner {
                credential_id: record.credential_id.clone(),
                public_key: record.public_key.clone(),
                added_at: record.created_at,
            });
            let signers_json = serde_json::to_vec(&signers)?;
            signers_table.insert(record.contract_address.as_str(), signers_json.as_slice())?;
        }
        write_txn.commit()?;

        info!(
            credential_id = %record.credential_id,
            contract_address = %record.contract_address,
            "wallet registered"
        );
        Ok(())
    }

    fn lookup(&self, credential_id: &str) -> RegistryResult<Option<WalletRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        match table.get(credential_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn signers(&self, contract_address: &str) -> RegistryResult<Vec<WalletSigner>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SIGNERS)?;
        match table.get(contract_address)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(Vec::new()),
        }
    }

    fn check(&self) -> RegistryResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(WALLETS)?;
        Ok(())
    }
}
