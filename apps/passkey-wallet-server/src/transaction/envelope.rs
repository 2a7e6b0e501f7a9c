// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction drafts and their XDR envelope encoding.
//!
//! An [`Envelope`] is the base64 XDR `TransactionEnvelope` handed to the
//! network. [`TransactionDraft`] is the editable form a transaction takes
//! while it is built, simulated and signed.
//!
//! Two kinds of signature end up in a draft:
//!
//! - the source account's Ed25519 signature over the transaction hash,
//!   stored as a `DecoratedSignature` on the envelope;
//! - a passkey signature for each Soroban authorization entry naming the
//!   wallet contract, stored inside the entry's address credentials.

use serde::{Deserialize, Serialize};
use stellar_xdr::curr::{
    AccountId, ContractExecutable, ContractIdPreimage, ContractIdPreimageFromAddress,
    CreateContractArgsV2, DecoratedSignature, Hash, HashIdPreimage, HashIdPreimageContractId,
    HashIdPreimageSorobanAuthorization, HostFunction, InvokeContractArgs, InvokeHostFunctionOp,
    Limits, Memo, MuxedAccount, Operation as XdrOperation, OperationBody, Preconditions,
    PublicKey, ReadXdr, ScAddress, ScBytes, ScMap, ScMapEntry, ScSymbol, ScVal, SequenceNumber,
    Signature, SignatureHint, SorobanAddressCredentials, SorobanAuthorizationEntry,
    SorobanAuthorizedFunction, SorobanAuthorizedInvocation, SorobanCredentials,
    SorobanTransactionData, Transaction, TransactionEnvelope, TransactionExt,
    TransactionSignaturePayload, TransactionSignaturePayloadTaggedTransaction,
    TransactionV1Envelope, Uint256, VecM, WriteXdr,
};

use crate::encoding::{parse_account_strkey, parse_contract_strkey, sha256};

/// Base fee per operation, in stroops.
pub const BASE_FEE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid transaction XDR: {0}")]
    Xdr(String),
    #[error("{0} is not a G or C strkey")]
    Address(String),
    #[error("unsupported transaction: {0}")]
    Unsupported(&'static str),
}

impl From<stellar_xdr::curr::Error> for EnvelopeError {
    fn from(e: stellar_xdr::curr::Error) -> Self {
        EnvelopeError::Xdr(e.to_string())
    }
}

/// Serialized, signable transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(String);

impl Envelope {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contract call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScArg {
    Bytes(Vec<u8>),
    /// `G…` or `C…` strkey
    Address(String),
}

impl ScArg {
    fn to_sc_val(&self) -> Result<ScVal, EnvelopeError> {
        match self {
            ScArg::Bytes(bytes) => bytes_val(bytes),
            ScArg::Address(address) => Ok(ScVal::Address(sc_address(address)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Instantiate a contract from uploaded code. The transaction source
    /// account is the deployer.
    CreateContract {
        wasm_hash: [u8; 32],
        salt: [u8; 32],
        constructor_args: Vec<ScArg>,
    },
    /// Call a function on a deployed contract.
    InvokeContract {
        contract: String,
        function: String,
        args: Vec<ScArg>,
    },
}

impl Operation {
    fn to_xdr(&self, source: &AccountId) -> Result<XdrOperation, EnvelopeError> {
        let host_function = match self {
            Operation::CreateContract {
                wasm_hash,
                salt,
                constructor_args,
            } => HostFunction::CreateContractV2(CreateContractArgsV2 {
                contract_id_preimage: address_preimage(ScAddress::Account(source.clone()), salt),
                executable: ContractExecutable::Wasm(Hash(*wasm_hash)),
                constructor_args: sc_vals(constructor_args)?,
            }),
            Operation::InvokeContract {
                contract,
                function,
                args,
            } => HostFunction::InvokeContract(InvokeContractArgs {
                contract_address: sc_address(contract)?,
                function_name: symbol(function)?,
                args: sc_vals(args)?,
            }),
        };

        Ok(XdrOperation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function,
                auth: VecM::default(),
            }),
        })
    }
}

/// A signature produced by a [`TransactionSigner`](super::TransactionSigner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureEntry {
    /// Source account signature over the transaction hash.
    Ed25519 {
        public_key: [u8; 32],
        signature: Vec<u8>,
    },
    /// WebAuthn assertion over an authorization payload.
    Passkey {
        /// Raw credential id
        key_id: Vec<u8>,
        authenticator_data: Vec<u8>,
        client_data_json: Vec<u8>,
        /// Compact `r || s`, low-S
        signature: Vec<u8>,
    },
}

impl SignatureEntry {
    /// Argument handed to the wallet contract's `__check_auth`. Map keys
    /// are in XDR order.
    fn to_sc_val(&self) -> Result<ScVal, EnvelopeError> {
        let SignatureEntry::Passkey {
            key_id,
            authenticator_data,
            client_data_json,
            signature,
        } = self
        else {
            return Err(EnvelopeError::Unsupported(
                "contract authorization requires a passkey signature",
            ));
        };

        let fields = [
            ("authenticator_data", authenticator_data),
            ("client_data_json", client_data_json),
            ("id", key_id),
            ("signature", signature),
        ];
        let entries = fields
            .into_iter()
            .map(|(key, value)| {
                Ok(ScMapEntry {
                    key: ScVal::Symbol(symbol(key)?),
                    val: bytes_val(value)?,
                })
            })
            .collect::<Result<Vec<_>, EnvelopeError>>()?;
        Ok(ScVal::Map(Some(ScMap(entries.try_into()?))))
    }
}

/// One authorization entry awaiting a signature, and the payload to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSlot {
    pub operation: usize,
    pub entry: usize,
    pub payload: [u8; 32],
}

/// `SHA-256(passphrase)`.
pub fn network_id(passphrase: &str) -> [u8; 32] {
    sha256(passphrase.as_bytes())
}

/// Id of the contract `deployer` creates with `salt`: the hash of the
/// `HashIdPreimage::ContractId` preimage.
pub fn contract_id(
    network_id: &[u8; 32],
    deployer: &[u8; 32],
    salt: &[u8; 32],
) -> Result<[u8; 32], EnvelopeError> {
    let preimage = HashIdPreimage::ContractId(HashIdPreimageContractId {
        network_id: Hash(*network_id),
        contract_id_preimage: address_preimage(ScAddress::Account(account_id(*deployer)), salt),
    });
    Ok(sha256(&preimage.to_xdr(Limits::none())?))
}

/// Ledger key of an account, as `getLedgerEntries` expects it.
pub fn account_ledger_key(public_key: &[u8; 32]) -> Result<String, EnvelopeError> {
    use stellar_xdr::curr::{LedgerKey, LedgerKeyAccount};

    Ok(LedgerKey::Account(LedgerKeyAccount {
        account_id: account_id(*public_key),
    })
    .to_xdr_base64(Limits::none())?)
}

/// Sequence number stored in an account `LedgerEntryData`.
pub fn account_sequence(entry_xdr: &str) -> Result<i64, EnvelopeError> {
    use stellar_xdr::curr::LedgerEntryData;

    match LedgerEntryData::from_xdr_base64(entry_xdr, Limits::none())? {
        LedgerEntryData::Account(account) => Ok(account.seq_num.0),
        _ => Err(EnvelopeError::Unsupported("ledger entry is not an account")),
    }
}

fn account_id(public_key: [u8; 32]) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(public_key)))
}

fn address_preimage(address: ScAddress, salt: &[u8; 32]) -> ContractIdPreimage {
    ContractIdPreimage::Address(ContractIdPreimageFromAddress {
        address,
        salt: Uint256(*salt),
    })
}

fn sc_address(value: &str) -> Result<ScAddress, EnvelopeError> {
    if let Some(key) = parse_account_strkey(value) {
        return Ok(ScAddress::Account(account_id(key)));
    }
    parse_contract_strkey(value)
        .map(|id| ScAddress::Contract(Hash(id)))
        .ok_or_else(|| EnvelopeError::Address(value.to_string()))
}

fn symbol(name: &str) -> Result<ScSymbol, EnvelopeError> {
    Ok(ScSymbol(name.as_bytes().to_vec().try_into()?))
}

fn bytes_val(bytes: &[u8]) -> Result<ScVal, EnvelopeError> {
    Ok(ScVal::Bytes(ScBytes(bytes.to_vec().try_into()?)))
}

fn sc_vals(args: &[ScArg]) -> Result<VecM<ScVal>, EnvelopeError> {
    let values = args
        .iter()
        .map(ScArg::to_sc_val)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values.try_into()?)
}

fn base_fee(operations: usize) -> u32 {
    BASE_FEE.saturating_mul(operations.max(1).try_into().unwrap_or(u32::MAX))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    envelope: TransactionV1Envelope,
}

impl TransactionDraft {
    /// Unsigned transaction from `source` (`G…`) at `sequence`.
    pub fn new(
        source: &str,
        sequence: i64,
        operations: &[Operation],
    ) -> Result<Self, EnvelopeError> {
        let key =
            parse_account_strkey(source).ok_or_else(|| EnvelopeError::Address(source.into()))?;
        let source_id = account_id(key);
        let operations = operations
            .iter()
            .map(|op| op.to_xdr(&source_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            envelope: TransactionV1Envelope {
                tx: Transaction {
                    source_account: MuxedAccount::Ed25519(Uint256(key)),
                    fee: base_fee(operations.len()),
                    seq_num: SequenceNumber(sequence),
                    cond: Preconditions::None,
                    memo: Memo::None,
                    operations: operations.try_into()?,
                    ext: TransactionExt::V0,
                },
                signatures: VecM::default(),
            },
        })
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self, EnvelopeError> {
        match TransactionEnvelope::from_xdr_base64(envelope.as_str().trim(), Limits::none())? {
            TransactionEnvelope::Tx(envelope) => Ok(Self { envelope }),
            _ => Err(EnvelopeError::Unsupported(
                "only v1 transaction envelopes are supported",
            )),
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, EnvelopeError> {
        let xdr = TransactionEnvelope::Tx(self.envelope.clone()).to_xdr_base64(Limits::none())?;
        Ok(Envelope(xdr))
    }

    pub fn sequence(&self) -> i64 {
        self.envelope.tx.seq_num.0
    }

    pub fn fee(&self) -> u32 {
        self.envelope.tx.fee
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        self.envelope.signatures.as_slice()
    }

    /// Transaction hash the source account signs. Binds the network.
    pub fn signature_payload(&self, network_id: &[u8; 32]) -> Result<[u8; 32], EnvelopeError> {
        let payload = TransactionSignaturePayload {
            network_id: Hash(*network_id),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(
                self.envelope.tx.clone(),
            ),
        };
        Ok(sha256(&payload.to_xdr(Limits::none())?))
    }

    /// Attach an Ed25519 signature. The hint is the key's last four bytes.
    pub fn add_signature(&mut self, entry: &SignatureEntry) -> Result<(), EnvelopeError> {
        let SignatureEntry::Ed25519 {
            public_key,
            signature,
        } = entry
        else {
            return Err(EnvelopeError::Unsupported(
                "envelope signatures must be ed25519",
            ));
        };

        let mut hint = [0u8; 4];
        hint.copy_from_slice(&public_key[28..]);
        let mut signatures = self.envelope.signatures.to_vec();
        signatures.push(DecoratedSignature {
            hint: SignatureHint(hint),
            signature: Signature(signature.clone().try_into()?),
        });
        self.envelope.signatures = signatures.try_into()?;
        Ok(())
    }

    /// Require `signer` (a `C…` wallet) to authorize the first contract
    /// call, the way simulation reports it.
    pub fn require_contract_auth(
        &mut self,
        signer: &str,
        nonce: i64,
        expiration_ledger: u32,
    ) -> Result<(), EnvelopeError> {
        let address = sc_address(signer)?;
        let mut operations = self.envelope.tx.operations.to_vec();
        let invoke = operations
            .iter_mut()
            .find_map(|op| match &mut op.body {
                OperationBody::InvokeHostFunction(invoke)
                    if matches!(invoke.host_function, HostFunction::InvokeContract(_)) =>
                {
                    Some(invoke)
                }
                _ => None,
            })
            .ok_or(EnvelopeError::Unsupported("no contract call to authorize"))?;
        let HostFunction::InvokeContract(call) = &invoke.host_function else {
            return Err(EnvelopeError::Unsupported("no contract call to authorize"));
        };

        let entry = SorobanAuthorizationEntry {
            credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                address,
                nonce,
                signature_expiration_ledger: expiration_ledger,
                signature: ScVal::Void,
            }),
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(call.clone()),
                sub_invocations: VecM::default(),
            },
        };
        let mut auth = invoke.auth.to_vec();
        auth.push(entry);
        invoke.auth = auth.try_into()?;
        self.envelope.tx.operations = operations.try_into()?;
        Ok(())
    }

    /// Attach simulation results: resource data and fee, the authorization
    /// entries when the caller supplied none, and an expiration ledger for
    /// address credentials that lack one.
    pub fn apply_simulation(
        &mut self,
        transaction_data: &str,
        auth: &[String],
        expiration_ledger: u32,
    ) -> Result<(), EnvelopeError> {
        let data = SorobanTransactionData::from_xdr_base64(transaction_data, Limits::none())?;
        let resource_fee = u32::try_from(data.resource_fee.max(0)).unwrap_or(u32::MAX);
        let simulated = auth
            .iter()
            .map(|entry| SorobanAuthorizationEntry::from_xdr_base64(entry, Limits::none()))
            .collect::<Result<Vec<_>, _>>()?;

        let tx = &mut self.envelope.tx;
        tx.fee = base_fee(tx.operations.len()).saturating_add(resource_fee);
        tx.ext = TransactionExt::V1(data);

        let mut operations = tx.operations.to_vec();
        for op in operations.iter_mut() {
            let OperationBody::InvokeHostFunction(invoke) = &mut op.body else {
                continue;
            };
            let mut entries = invoke.auth.to_vec();
            if entries.is_empty() {
                entries = simulated.clone();
            }
            for entry in entries.iter_mut() {
                if let SorobanCredentials::Address(credentials) = &mut entry.credentials {
                    if credentials.signature_expiration_ledger == 0 {
                        credentials.signature_expiration_ledger = expiration_ledger;
                    }
                }
            }
            invoke.auth = entries.try_into()?;
            // One host function per transaction.
            break;
        }
        tx.operations = operations.try_into()?;
        Ok(())
    }

    /// Authorization entries `contract` must sign, with their payloads.
    pub fn auth_payloads(
        &self,
        network_id: &[u8; 32],
        contract: &[u8; 32],
    ) -> Result<Vec<AuthSlot>, EnvelopeError> {
        let wanted = ScAddress::Contract(Hash(*contract));
        let mut slots = Vec::new();

        for (operation, op) in self.envelope.tx.operations.iter().enumerate() {
            let OperationBody::InvokeHostFunction(invoke) = &op.body else {
                continue;
            };
            for (entry, auth) in invoke.auth.iter().enumerate() {
                let SorobanCredentials::Address(credentials) = &auth.credentials else {
                    continue;
                };
                if credentials.address != wanted {
                    continue;
                }
                let preimage =
                    HashIdPreimage::SorobanAuthorization(HashIdPreimageSorobanAuthorization {
                        network_id: Hash(*network_id),
                        nonce: credentials.nonce,
                        signature_expiration_ledger: credentials.signature_expiration_ledger,
                        invocation: auth.root_invocation.clone(),
                    });
                slots.push(AuthSlot {
                    operation,
                    entry,
                    payload: sha256(&preimage.to_xdr(Limits::none())?),
                });
            }
        }
        Ok(slots)
    }

    /// Store a passkey signature in the entry `slot` points at.
    pub fn set_auth_signature(
        &mut self,
        slot: &AuthSlot,
        entry: &SignatureEntry,
    ) -> Result<(), EnvelopeError> {
        let signature = entry.to_sc_val()?;
        let mut operations = self.envelope.tx.operations.to_vec();
        let Some(OperationBody::InvokeHostFunction(invoke)) =
            operations.get_mut(slot.operation).map(|op| &mut op.body)
        else {
            return Err(EnvelopeError::Unsupported("authorization slot out of range"));
        };

        let mut auth = invoke.auth.to_vec();
        match auth.get_mut(slot.entry).map(|a| &mut a.credentials) {
            Some(SorobanCredentials::Address(credentials)) => credentials.signature = signature,
            _ => {
                return Err(EnvelopeError::Unsupported(
                    "authorization slot has no address credentials",
                ))
            }
        }
        invoke.auth = auth.try_into()?;
        self.envelope.tx.operations = operations.try_into()?;
        Ok(())
    }

    /// Signature stored in an authorization slot, if any.
    pub fn auth_signature(&self, slot: &AuthSlot) -> Option<&ScVal> {
        let op = self.envelope.tx.operations.get(slot.operation)?;
        let OperationBody::InvokeHostFunction(invoke) = &op.body else {
            return None;
        };
        match &invoke.auth.get(slot.entry)?.credentials {
            SorobanCredentials::Address(credentials) => Some(&credentials.signature),
            SorobanCredentials::SourceAccount => None,
        }
    }
}
