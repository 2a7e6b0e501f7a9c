// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

mod common;

use std::sync::Arc;
use std::time::Duration;

use p256::ecdsa::{signature::Verifier, Signature};
use serde_json::Value as Json;
use stellar_xdr::curr::ScVal;

use passkey_wallet_server::ceremony::CeremonyFailure;
use passkey_wallet_server::encoding::{
    account_strkey, b64url_decode, b64url_encode, contract_strkey, is_contract_address,
    parse_contract_strkey, sha256,
};
use passkey_wallet_server::error::WalletError;
use passkey_wallet_server::transaction::{
    network_id, Operation, ScArg, TransactionDraft, TransactionError, TxStatus,
};
use passkey_wallet_server::wallet::{MockWallet, PasskeyWallet, WalletClient, WalletInfo};

use common::{services, temp_registry, ScriptedNetwork, SoftwarePasskey};

/// Behaviour every wallet client must share, whichever backend is behind it.
async fn create_then_connect<C: WalletClient>(client: &C, username: &str) -> WalletInfo {
    let created = client.create_wallet(username).await.unwrap();
    assert!(is_contract_address(&created.contract_address));
    assert_eq!(created.contract_address.len(), 56);
    assert!(!created.key_id.is_empty());

    let connected = client.connect_wallet().await.unwrap();
    assert_eq!(connected, created);
    created
}

#[tokio::test]
async fn alice_gets_one_contract_wallet() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    let services = Arc::new(services(network.clone(), registry.clone()));
    let wallet = PasskeyWallet::new(services, SoftwarePasskey::new(1, b"alice-passkey"));

    let info = create_then_connect(&wallet, "alice").await;

    assert!(info.contract_address.starts_with('C'));
    assert_eq!(info.key_id, b64url_encode(b"alice-passkey"));
    // Contract creation, then factory registration.
    assert_eq!(network.sends(), 2);

    let record = registry.lookup(&info.key_id).unwrap().unwrap();
    assert_eq!(record.contract_address, info.contract_address);
    assert!(record.deploy_tx_hash.is_some());
    assert_eq!(registry.signers(&info.contract_address).unwrap().len(), 1);
}

#[tokio::test]
async fn mock_and_passkey_clients_are_interchangeable() {
    let mock = MockWallet::new(Duration::ZERO);
    let mocked = create_then_connect(&mock, "alice").await;
    assert_eq!(mocked, MockWallet::wallet_for("alice"));

    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    let passkey = PasskeyWallet::new(
        Arc::new(services(network, registry)),
        SoftwarePasskey::new(2, b"bob-passkey"),
    );
    create_then_connect(&passkey, "bob").await;
}

#[tokio::test]
async fn second_registration_of_a_credential_is_refused() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    let wallet = PasskeyWallet::new(
        Arc::new(services(network.clone(), registry)),
        SoftwarePasskey::new(3, b"dup-passkey"),
    );

    let first = wallet.create_wallet("carol").await.unwrap();
    let err = wallet.create_wallet("carol").await.unwrap_err();

    assert!(matches!(&err, WalletError::DuplicateWallet(id) if *id == first.key_id));
    assert_eq!(network.sends(), 2);
}

#[tokio::test]
async fn concurrent_registrations_deploy_once() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(
        ScriptedNetwork::succeeding().with_send_delay(Duration::from_millis(50)),
    );
    let services = Arc::new(services(network.clone(), registry.clone()));
    let first = PasskeyWallet::new(services.clone(), SoftwarePasskey::new(4, b"race"));
    let second = PasskeyWallet::new(services, SoftwarePasskey::new(4, b"race"));

    let (a, b) = tokio::join!(first.create_wallet("dave"), second.create_wallet("dave"));

    let outcomes = [a, b];
    let created: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let duplicates = outcomes
        .iter()
        .filter(|r| matches!(r, Err(WalletError::DuplicateWallet(_))))
        .count();
    assert_eq!(created.len(), 1);
    assert_eq!(duplicates, 1);
    assert_eq!(network.sends(), 2);
    assert!(registry.lookup(&created[0].key_id).unwrap().is_some());
}

#[tokio::test]
async fn dismissed_ceremony_leaves_no_wallet() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    let passkey = SoftwarePasskey::new(5, b"shy").dismissing();
    let credential_id = passkey.credential_id();
    let wallet = PasskeyWallet::new(Arc::new(services(network.clone(), registry.clone())), passkey);

    let err = wallet.create_wallet("erin").await.unwrap_err();

    assert!(matches!(&err, WalletError::Ceremony(e) if e.reason == CeremonyFailure::Cancelled));
    assert!(registry.lookup(&credential_id).unwrap().is_none());
    assert_eq!(network.sends(), 0);
}

#[tokio::test]
async fn cancelled_client_stops_the_ceremony() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    let wallet = PasskeyWallet::new(
        Arc::new(services(network.clone(), registry)),
        SoftwarePasskey::new(6, b"cancelled"),
    );
    wallet.cancellation().cancel();

    let err = wallet.create_wallet("frank").await.unwrap_err();
    assert!(matches!(&err, WalletError::Ceremony(e) if e.reason == CeremonyFailure::Cancelled));
    assert_eq!(network.sends(), 0);
}

#[tokio::test]
async fn login_without_wallet_is_not_found() {
    let (_dir, registry) = temp_registry();
    let wallet = PasskeyWallet::new(
        Arc::new(services(Arc::new(ScriptedNetwork::succeeding()), registry)),
        SoftwarePasskey::new(7, b"stranger"),
    );

    let err = wallet.connect_wallet().await.unwrap_err();
    assert!(matches!(err, WalletError::WalletNotFound(_)));
}

#[tokio::test]
async fn login_with_a_different_key_is_rejected() {
    let (_dir, registry) = temp_registry();
    let services = Arc::new(services(Arc::new(ScriptedNetwork::succeeding()), registry));

    let owner = PasskeyWallet::new(services.clone(), SoftwarePasskey::new(8, b"shared-id"));
    owner.create_wallet("grace").await.unwrap();

    let impostor = PasskeyWallet::new(services, SoftwarePasskey::new(9, b"shared-id"));
    let err = impostor.connect_wallet().await.unwrap_err();
    assert!(matches!(&err, WalletError::Ceremony(e) if e.reason == CeremonyFailure::InvalidResponse));
}

#[tokio::test]
async fn deploy_fails_cleanly_when_network_is_down() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    network.go_offline();
    let passkey = SoftwarePasskey::new(10, b"offline");
    let credential_id = passkey.credential_id();
    let wallet = PasskeyWallet::new(Arc::new(services(network, registry.clone())), passkey);

    let err = wallet.create_wallet("heidi").await.unwrap_err();
    assert!(matches!(err, WalletError::Network(_)));
    assert!(registry.lookup(&credential_id).unwrap().is_none());
}

/// Field of the passkey signature map stored in an authorization entry.
fn signature_field<'a>(signature: &'a ScVal, name: &str) -> &'a [u8] {
    let ScVal::Map(Some(map)) = signature else {
        panic!("expected a signature map, got {signature:?}");
    };
    map.iter()
        .find_map(|entry| match (&entry.key, &entry.val) {
            (ScVal::Symbol(key), ScVal::Bytes(value)) if key.0.as_slice() == name.as_bytes() => {
                Some(value.0.as_slice())
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("signature has no {name}"))
}

fn wallet_call(contract: &str) -> TransactionDraft {
    let mut draft = TransactionDraft::new(
        &account_strkey([7u8; 32]),
        7,
        &[Operation::InvokeContract {
            contract: contract_strkey([8u8; 32]),
            function: "transfer".into(),
            args: vec![ScArg::Address(contract.to_string())],
        }],
    )
    .unwrap();
    draft.require_contract_auth(contract, 42, 10_000).unwrap();
    draft
}

#[tokio::test]
async fn passkey_signs_wallet_authorization() {
    let (_dir, registry) = temp_registry();
    let network = Arc::new(ScriptedNetwork::succeeding());
    let services = Arc::new(services(network, registry));
    let passkey = SoftwarePasskey::new(11, b"signer");
    let verifying_key = passkey.verifying_key();
    let wallet = PasskeyWallet::new(services.clone(), passkey);
    let info = wallet.create_wallet("ivan").await.unwrap();

    let draft = wallet_call(&info.contract_address);
    let unsigned = draft.to_envelope().unwrap();
    let signed = wallet.sign(&unsigned, &info.key_id).await.unwrap();

    let network_id = network_id(&services.chain().network_passphrase);
    let contract = parse_contract_strkey(&info.contract_address).unwrap();
    let signed_draft = TransactionDraft::from_envelope(&signed).unwrap();
    let slots = signed_draft.auth_payloads(&network_id, &contract).unwrap();
    assert_eq!(slots, draft.auth_payloads(&network_id, &contract).unwrap());
    let signature = signed_draft.auth_signature(&slots[0]).unwrap();

    assert_eq!(
        signature_field(signature, "id"),
        b64url_decode(&info.key_id).unwrap().as_slice()
    );
    let client_data_json = signature_field(signature, "client_data_json");
    let client_data: Json = serde_json::from_slice(client_data_json).unwrap();
    assert_eq!(client_data["challenge"], b64url_encode(&slots[0].payload));

    // Compact low-S signature over authenticatorData || SHA-256(clientData).
    let compact = Signature::from_slice(signature_field(signature, "signature")).unwrap();
    assert!(compact.normalize_s().is_none());
    let mut message = signature_field(signature, "authenticator_data").to_vec();
    message.extend_from_slice(&sha256(client_data_json));
    verifying_key.verify(&message, &compact).unwrap();

    let outcome = services.submit_envelope(signed).await.unwrap();
    assert_eq!(outcome.status, TxStatus::Success);
}

#[tokio::test]
async fn signing_without_a_wallet_entry_is_malformed() {
    let (_dir, registry) = temp_registry();
    let services = Arc::new(services(Arc::new(ScriptedNetwork::succeeding()), registry));
    let wallet = PasskeyWallet::new(services, SoftwarePasskey::new(13, b"no-auth"));
    let info = wallet.create_wallet("kate").await.unwrap();

    let unsigned = wallet_call(&contract_strkey([9u8; 32])).to_envelope().unwrap();
    let err = wallet.sign(&unsigned, &info.key_id).await.unwrap_err();
    assert!(matches!(err, WalletError::Transaction(TransactionError::Malformed(_))));
}

#[tokio::test]
async fn signing_for_an_unknown_key_id_is_not_found() {
    let (_dir, registry) = temp_registry();
    let services = Arc::new(services(Arc::new(ScriptedNetwork::succeeding()), registry));
    let wallet = PasskeyWallet::new(services, SoftwarePasskey::new(12, b"mine"));
    let info = wallet.create_wallet("judy").await.unwrap();

    let unsigned = wallet_call(&info.contract_address).to_envelope().unwrap();
    let err = wallet
        .sign(&unsigned, &b64url_encode(b"someone-else"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::WalletNotFound(_)));
}

#[tokio::test]
async fn signing_with_another_device_is_rejected() {
    let (_dir, registry) = temp_registry();
    let services = Arc::new(services(Arc::new(ScriptedNetwork::succeeding()), registry));
    let owner = PasskeyWallet::new(services.clone(), SoftwarePasskey::new(14, b"owner"));
    let other = PasskeyWallet::new(services, SoftwarePasskey::new(15, b"other"));
    let owned = owner.create_wallet("leo").await.unwrap();
    other.create_wallet("mia").await.unwrap();

    let unsigned = wallet_call(&owned.contract_address).to_envelope().unwrap();
    let err = other.sign(&unsigned, &owned.key_id).await.unwrap_err();
    assert!(matches!(&err, WalletError::Ceremony(e) if e.reason == CeremonyFailure::InvalidResponse));
}
