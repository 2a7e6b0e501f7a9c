// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once at startup through a lookup function
//! (`std::env::var` in `main`, a map in tests) and never re-read.
//!
//! ## Network (all required, otherwise the Mock backend is selected)
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `RPC_URL` | Soroban RPC endpoint (http/https) |
//! | `NETWORK_PASSPHRASE` | Network passphrase, e.g. `Test SDF Network ; September 2015` |
//! | `WALLET_WASM_HASH` | Hash of the uploaded wallet contract code (64 hex chars) |
//! | `FACTORY_CONTRACT_ID` | Wallet factory contract (`C…` strkey) |
//! | `ADMIN_SECRET_SEED` | Ed25519 seed of the deploying account (64 hex chars) |
//!
//! ## Server
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory of the wallet registry | `./data` |
//! | `RP_NAME` | Relying party display name | `Stellar Passkey Wallet` |
//! | `RP_ID` | Relying party id | `localhost` |
//! | `RP_ORIGIN` | Origin expected in client data | `http://localhost:3000` |
//! | `CEREMONY_TIMEOUT_MS` | Passkey ceremony timeout | `60000` |
//! | `POLL_INTERVAL_MS` | Transaction status poll interval | `1000` |
//! | `POLL_MAX_ATTEMPTS` | Status checks before timing out | `30` |
//! | `MOCK_LATENCY_MS` | Artificial latency of the Mock backend | `1000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate and key; both or neither | unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::ceremony::RelyingPartyConfig;
use crate::encoding::{contract_strkey, is_contract_address, sha256};
use crate::logging::LogFormat;
use crate::transaction::PollPolicy;

pub const RPC_URL_ENV: &str = "RPC_URL";
pub const NETWORK_PASSPHRASE_ENV: &str = "NETWORK_PASSPHRASE";
pub const WALLET_WASM_HASH_ENV: &str = "WALLET_WASM_HASH";
pub const FACTORY_CONTRACT_ID_ENV: &str = "FACTORY_CONTRACT_ID";
pub const ADMIN_SECRET_SEED_ENV: &str = "ADMIN_SECRET_SEED";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const RP_NAME_ENV: &str = "RP_NAME";
pub const RP_ID_ENV: &str = "RP_ID";
pub const RP_ORIGIN_ENV: &str = "RP_ORIGIN";
pub const CEREMONY_TIMEOUT_MS_ENV: &str = "CEREMONY_TIMEOUT_MS";
pub const POLL_INTERVAL_MS_ENV: &str = "POLL_INTERVAL_MS";
pub const POLL_MAX_ATTEMPTS_ENV: &str = "POLL_MAX_ATTEMPTS";
pub const MOCK_LATENCY_MS_ENV: &str = "MOCK_LATENCY_MS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_RP_NAME: &str = "Stellar Passkey Wallet";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// One problem with one variable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Every issue found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration: {}", join_issues(.issues))]
pub struct ConfigurationError {
    pub issues: Vec<ConfigIssue>,
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reads variables and accumulates issues.
struct Reader<'a, F> {
    lookup: &'a F,
    issues: Vec<ConfigIssue>,
}

impl<'a, F: Fn(&str) -> Option<String>> Reader<'a, F> {
    fn new(lookup: &'a F) -> Self {
        Self {
            lookup,
            issues: Vec::new(),
        }
    }

    fn optional(&self, var: &'static str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, var: &'static str) -> Option<String> {
        let value = self.optional(var);
        if value.is_none() {
            self.issues.push(ConfigIssue::Missing(var));
        }
        value
    }

    fn invalid(&mut self, var: &'static str, reason: impl Into<String>) {
        self.issues.push(ConfigIssue::Invalid {
            var,
            reason: reason.into(),
        });
    }

    fn hex32(&mut self, var: &'static str) -> Option<[u8; 32]> {
        let value = self.required(var)?;
        let parsed = hex::decode(&value)
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok());
        if parsed.is_none() {
            self.invalid(var, "expected 64 hex characters");
        }
        parsed
    }

    fn parse_or<T: std::str::FromStr>(&mut self, var: &'static str, default: T) -> T {
        match self.optional(var) {
            None => default,
            Some(raw) => match raw.parse() {
                Ok(value) => value,
                Err(_) => {
                    self.invalid(var, format!("cannot parse {raw:?}"));
                    default
                }
            },
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ConfigurationError> {
        match value {
            Some(value) if self.issues.is_empty() => Ok(value),
            _ => Err(ConfigurationError {
                issues: self.issues,
            }),
        }
    }
}

/// Chain-side values every backend needs.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainParams {
    pub network_passphrase: String,
    pub wallet_wasm_hash: [u8; 32],
    pub factory_address: String,
    pub admin_seed: [u8; 32],
}

impl ChainParams {
    /// Fabricated values for the Mock backend.
    pub fn mock() -> Self {
        Self {
            network_passphrase: "Mock Network ; passkey wallet".to_string(),
            wallet_wasm_hash: sha256(b"mock wallet wasm"),
            factory_address: contract_strkey(sha256(b"mock wallet factory")),
            admin_seed: sha256(b"mock admin seed"),
        }
    }
}

impl fmt::Debug for ChainParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainParams")
            .field("network_passphrase", &self.network_passphrase)
            .field("wallet_wasm_hash", &hex::encode(self.wallet_wasm_hash))
            .field("factory_address", &self.factory_address)
            .finish_non_exhaustive()
    }
}

/// Validated configuration of the Real network backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfiguration {
    pub endpoint: Url,
    pub chain: ChainParams,
}

impl NetworkConfiguration {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader::new(lookup);

        let endpoint = reader.required(RPC_URL_ENV).and_then(|raw| {
            match Url::parse(&raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    reader.invalid(RPC_URL_ENV, format!("unsupported scheme {}", url.scheme()));
                    None
                }
                Err(e) => {
                    reader.invalid(RPC_URL_ENV, e.to_string());
                    None
                }
            }
        });
        let passphrase = reader.required(NETWORK_PASSPHRASE_ENV);
        let wasm_hash = reader.hex32(WALLET_WASM_HASH_ENV);
        let factory = reader.required(FACTORY_CONTRACT_ID_ENV).and_then(|raw| {
            if is_contract_address(&raw) {
                Some(raw)
            } else {
                reader.invalid(FACTORY_CONTRACT_ID_ENV, "expected a C… contract strkey");
                None
            }
        });
        let admin_seed = reader.hex32(ADMIN_SECRET_SEED_ENV);

        let config = match (endpoint, passphrase, wasm_hash, factory, admin_seed) {
            (
                Some(endpoint),
                Some(network_passphrase),
                Some(wallet_wasm_hash),
                Some(factory_address),
                Some(admin_seed),
            ) => Some(NetworkConfiguration {
                endpoint,
                chain: ChainParams {
                    network_passphrase,
                    wallet_wasm_hash,
                    factory_address,
                    admin_seed,
                },
            }),
            _ => None,
        };
        reader.finish(config)
    }
}

/// Outcome of the startup configuration check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Real(NetworkConfiguration),
    /// Carries the reasons the Real backend was not selected
    Mock(ConfigurationError),
}

impl Selection {
    pub fn chain(&self) -> ChainParams {
        match self {
            Selection::Real(config) => config.chain.clone(),
            Selection::Mock(_) => ChainParams::mock(),
        }
    }
}

/// Chooses the network backend once per process.
pub struct ConfigurationGate;

impl ConfigurationGate {
    pub fn select<F>(lookup: F) -> Selection
    where
        F: Fn(&str) -> Option<String>,
    {
        match NetworkConfiguration::from_lookup(&lookup) {
            Ok(config) => Selection::Real(config),
            Err(error) => {
                for issue in &error.issues {
                    warn!(issue = %issue, "network configuration issue");
                }
                warn!(
                    issues = error.issues.len(),
                    "network configuration incomplete; using the MOCK backend (local development only)"
                );
                Selection::Mock(error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Server settings. Invalid values are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub relying_party: RelyingPartyConfig,
    pub ceremony_timeout: Duration,
    pub poll: PollPolicy,
    pub mock_latency: Duration,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl ServerSettings {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = Reader::new(lookup);

        let host = reader
            .optional(HOST_ENV)
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = reader.parse_or(PORT_ENV, 8080u16);
        let data_dir = PathBuf::from(
            reader
                .optional(DATA_DIR_ENV)
                .unwrap_or_else(|| "./data".to_string()),
        );

        let relying_party = RelyingPartyConfig {
            name: reader
                .optional(RP_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_RP_NAME.to_string()),
            id: reader
                .optional(RP_ID_ENV)
                .unwrap_or_else(|| "localhost".to_string()),
            origin: reader
                .optional(RP_ORIGIN_ENV)
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
        };
        if Url::parse(&relying_party.origin).is_err() {
            reader.invalid(RP_ORIGIN_ENV, "expected an origin URL");
        }

        let ceremony_timeout =
            Duration::from_millis(reader.parse_or(CEREMONY_TIMEOUT_MS_ENV, 60_000u64));
        let poll = PollPolicy {
            interval: Duration::from_millis(reader.parse_or(POLL_INTERVAL_MS_ENV, 1_000u64)),
            max_attempts: reader.parse_or(POLL_MAX_ATTEMPTS_ENV, 30u32),
        };
        if poll.max_attempts == 0 {
            reader.invalid(POLL_MAX_ATTEMPTS_ENV, "must be at least 1");
        }
        let mock_latency = Duration::from_millis(reader.parse_or(MOCK_LATENCY_MS_ENV, 1_000u64));

        let tls = match (
            reader.optional(TLS_CERT_PATH_ENV),
            reader.optional(TLS_KEY_PATH_ENV),
        ) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => {
                reader.issues.push(ConfigIssue::Missing(TLS_KEY_PATH_ENV));
                None
            }
            (None, Some(_)) => {
                reader.issues.push(ConfigIssue::Missing(TLS_CERT_PATH_ENV));
                None
            }
        };

        let log_format = reader.parse_or(LOG_FORMAT_ENV, LogFormat::Pretty);

        reader.finish(Some(ServerSettings {
            host,
            port,
            data_dir,
            relying_party,
            ceremony_timeout,
            poll,
            mock_latency,
            tls,
            log_format,
        }))
    }
}
