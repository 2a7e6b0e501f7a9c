// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 client for a Soroban RPC endpoint.
//!
//! Envelopes, ledger keys and simulation output travel as base64 XDR.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::{
    AccountState, NetworkClient, NetworkError, SendResult, SendStatus, SimulationResult,
    TransactionResult, TransactionStatus,
};
use crate::encoding::parse_account_strkey;
use crate::transaction::envelope::{account_ledger_key, account_sequence};
use crate::transaction::{Envelope, TransactionDraft};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Ledgers a simulated authorization stays signable.
const AUTH_VALIDITY_LEDGERS: u32 = 100;

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct LedgerEntriesBody {
    #[serde(default)]
    entries: Option<Vec<LedgerEntryBody>>,
}

#[derive(Deserialize)]
struct LedgerEntryBody {
    /// base64 `LedgerEntryData`
    xdr: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateBody {
    #[serde(default)]
    transaction_data: Option<String>,
    /// Fees are 64-bit and sent as strings
    #[serde(default)]
    min_resource_fee: Option<String>,
    #[serde(default)]
    results: Vec<SimulateHostFunction>,
    #[serde(default)]
    latest_ledger: u32,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SimulateHostFunction {
    #[serde(default)]
    auth: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBody {
    status: SendStatus,
    hash: String,
    #[serde(default)]
    error_result_xdr: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetTransactionBody {
    status: TransactionStatus,
    #[serde(default)]
    ledger: Option<u32>,
    #[serde(default)]
    result_xdr: Option<String>,
}

/// Soroban RPC client.
pub struct RpcClient {
    endpoint: Url,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: Url) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NetworkError::Unreachable(format!("http client: {e}")))?;

        Ok(Self {
            endpoint,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, NetworkError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "rpc call");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            warn!(method, status = %response.status(), "rpc endpoint returned HTTP error");
            return Err(NetworkError::Unreachable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(NetworkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| NetworkError::InvalidResponse(format!("{method}: missing result")))
    }
}

impl NetworkClient for RpcClient {
    async fn get_account(&self, public_key: &str) -> Result<AccountState, NetworkError> {
        let key = parse_account_strkey(public_key)
            .ok_or_else(|| NetworkError::AccountNotFound(public_key.to_string()))?;
        let ledger_key =
            account_ledger_key(&key).map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;
        let body: LedgerEntriesBody = self
            .call("getLedgerEntries", json!({ "keys": [ledger_key] }))
            .await?;

        let entry = body
            .entries
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| NetworkError::AccountNotFound(public_key.to_string()))?;
        let sequence = account_sequence(&entry.xdr)
            .map_err(|e| NetworkError::InvalidResponse(format!("account entry: {e}")))?;

        Ok(AccountState {
            account_id: public_key.to_string(),
            sequence,
        })
    }

    async fn prepare_transaction(&self, envelope: &Envelope) -> Result<Envelope, NetworkError> {
        let simulation = self.simulate_transaction(envelope).await?;
        if let Some(error) = simulation.error {
            return Err(NetworkError::Rejected(error));
        }
        let transaction_data = simulation.transaction_data.ok_or_else(|| {
            NetworkError::InvalidResponse("simulateTransaction: missing transactionData".into())
        })?;

        let mut draft = TransactionDraft::from_envelope(envelope)
            .map_err(|e| NetworkError::Rejected(e.to_string()))?;
        draft
            .apply_simulation(
                &transaction_data,
                &simulation.auth,
                simulation.latest_ledger.saturating_add(AUTH_VALIDITY_LEDGERS),
            )
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;
        debug!(
            resource_fee = simulation.min_resource_fee,
            auth_entries = simulation.auth.len(),
            "transaction prepared"
        );
        draft
            .to_envelope()
            .map_err(|e| NetworkError::Rejected(e.to_string()))
    }

    async fn simulate_transaction(
        &self,
        envelope: &Envelope,
    ) -> Result<SimulationResult, NetworkError> {
        let body: SimulateBody = self
            .call(
                "simulateTransaction",
                json!({ "transaction": envelope.as_str() }),
            )
            .await?;
        simulation_result(body)
    }

    async fn send_transaction(&self, envelope: &Envelope) -> Result<SendResult, NetworkError> {
        let body: SendBody = self
            .call("sendTransaction", json!({ "transaction": envelope.as_str() }))
            .await?;

        Ok(SendResult {
            status: body.status,
            hash: body.hash,
            error: body.error_result_xdr,
        })
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionResult, NetworkError> {
        let body: GetTransactionBody = self
            .call("getTransaction", json!({ "hash": hash }))
            .await?;

        Ok(TransactionResult {
            status: body.status,
            ledger: body.ledger,
            result: body.result_xdr,
        })
    }
}

fn simulation_result(body: SimulateBody) -> Result<SimulationResult, NetworkError> {
    let min_resource_fee = match body.min_resource_fee {
        Some(fee) => fee
            .parse()
            .map_err(|_| NetworkError::InvalidResponse(format!("minResourceFee {fee}")))?,
        None => 0,
    };
    Ok(SimulationResult {
        min_resource_fee,
        transaction_data: body.transaction_data,
        auth: body
            .results
            .into_iter()
            .flat_map(|result| result.auth)
            .collect(),
        latest_ledger: body.latest_ledger,
        error: body.error,
    })
}
