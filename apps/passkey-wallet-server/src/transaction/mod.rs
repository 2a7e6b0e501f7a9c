// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transactions: XDR drafts and envelopes, signers, and the submission
//! pipeline that drives them to finality.

pub mod envelope;
pub mod pipeline;
pub mod signer;

pub use envelope::{
    contract_id, network_id, AuthSlot, Envelope, EnvelopeError, Operation, ScArg, SignatureEntry,
    TransactionDraft,
};
pub use pipeline::{
    PendingTransaction, PollPolicy, SubmissionError, SubmissionPipeline, TransactionError,
    TxOutcome, TxStatus,
};
pub use signer::{AdminSigner, InvalidSeed, PasskeySigner, SignatureScope, TransactionSigner};
