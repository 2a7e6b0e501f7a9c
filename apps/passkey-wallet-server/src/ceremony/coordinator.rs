// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Builds ceremony options and drives ceremonies to a verified credential.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::authenticator::PlatformAuthenticator;
use super::credential::Credential;
use super::error::CeremonyError;
use super::options::{
    allowed_params, user_handle, AuthenticationOptions, AuthenticatorSelection, CeremonyOptions,
    RegistrationOptions, RelyingParty, UserEntity,
};
use super::verify::{verify_authentication, verify_registration, ExpectedCeremony};
use crate::challenge::Challenge;
use crate::encoding::b64url_decode;

/// Relying party as seen by browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingPartyConfig {
    pub name: String,
    /// Effective domain of the origin
    pub id: String,
    /// Exact origin expected in client data
    pub origin: String,
}

pub struct CeremonyCoordinator {
    rp: RelyingPartyConfig,
    timeout: Duration,
}

impl CeremonyCoordinator {
    pub fn new(rp: RelyingPartyConfig, timeout: Duration) -> Self {
        Self { rp, timeout }
    }

    pub fn relying_party(&self) -> &RelyingPartyConfig {
        &self.rp
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registration options. Consumes the challenge.
    pub fn begin_registration(&self, username: &str, challenge: Challenge) -> RegistrationOptions {
        RegistrationOptions {
            challenge: challenge.to_base64url(),
            rp: RelyingParty {
                name: self.rp.name.clone(),
                id: self.rp.id.clone(),
            },
            user: UserEntity {
                id: user_handle(username),
                name: username.to_string(),
                display_name: username.to_string(),
            },
            pub_key_cred_params: allowed_params(),
            timeout: self.timeout_ms(),
            attestation: "direct".to_string(),
            authenticator_selection: AuthenticatorSelection::platform_resident_verified(),
        }
    }

    /// Authentication options. Consumes the challenge.
    pub fn begin_authentication(&self, challenge: Challenge) -> AuthenticationOptions {
        AuthenticationOptions {
            challenge: challenge.to_base64url(),
            timeout: self.timeout_ms(),
            rp_id: self.rp.id.clone(),
            user_verification: "required".to_string(),
            allow_credentials: Vec::new(),
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn expected<'a>(&'a self, challenge: &'a str) -> ExpectedCeremony<'a> {
        ExpectedCeremony {
            challenge,
            origin: &self.rp.origin,
            rp_id: &self.rp.id,
        }
    }

    /// Run a registration ceremony and verify the attestation.
    pub async fn register<A: PlatformAuthenticator>(
        &self,
        authenticator: &A,
        options: &RegistrationOptions,
        cancel: &CancellationToken,
    ) -> Result<Credential, CeremonyError> {
        let response = run(
            options,
            cancel,
            authenticator.create_credential(options),
        )
        .await?;

        let credential = verify_registration(&response, &self.expected(&options.challenge))
            .inspect_err(|e| warn!(error = %e, "registration response rejected"))?;
        info!(credential_id = %credential.id(), "registration ceremony verified");
        Ok(credential)
    }

    /// Run an authentication ceremony and verify the client and
    /// authenticator data. The assertion signature is checked against the
    /// stored key by the caller.
    pub async fn authenticate<A: PlatformAuthenticator>(
        &self,
        authenticator: &A,
        options: &AuthenticationOptions,
        cancel: &CancellationToken,
    ) -> Result<Credential, CeremonyError> {
        let response = run(options, cancel, authenticator.get_assertion(options)).await?;

        if !options.allow_credentials.is_empty() {
            let answered = b64url_decode(&response.id)
                .map_err(|_| CeremonyError::invalid("credential id is not base64url"))?;
            let allowed = options
                .allow_credentials
                .iter()
                .any(|c| b64url_decode(&c.id).is_ok_and(|id| id == answered));
            if !allowed {
                return Err(CeremonyError::invalid(
                    "assertion from a credential outside the allow list",
                ));
            }
        }

        let credential = verify_authentication(&response, &self.expected(&options.challenge))
            .inspect_err(|e| warn!(error = %e, "authentication response rejected"))?;
        debug!(credential_id = %credential.id(), "authentication ceremony verified");
        Ok(credential)
    }
}

/// Await an authenticator call, bounded by the ceremony timeout and the
/// caller's cancellation token.
async fn run<O, T, F>(options: &O, cancel: &CancellationToken, call: F) -> Result<T, CeremonyError>
where
    O: CeremonyOptions,
    F: Future<Output = Result<T, CeremonyError>>,
{
    let timeout = options.timeout();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CeremonyError::cancelled("ceremony cancelled")),
        result = tokio::time::timeout(timeout, call) => match result {
            Ok(response) => response,
            Err(_) => Err(CeremonyError::timed_out(format!(
                "no authenticator response within {}ms",
                timeout.as_millis()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ceremony::authenticator::{BridgeError, CeremonyBridge};
    use crate::ceremony::credential::{
        AttestationPayload, AuthenticationResponse, CeremonyResponse, RegistrationResponse,
    };
    use crate::ceremony::error::CeremonyFailure;

    fn coordinator() -> CeremonyCoordinator {
        CeremonyCoordinator::new(
            RelyingPartyConfig {
                name: "Stellar Passkey Wallet".into(),
                id: "localhost".into(),
                origin: "http://localhost:3000".into(),
            },
            Duration::from_millis(60_000),
        )
    }

    /// Never answers.
    struct SilentAuthenticator;

    impl PlatformAuthenticator for SilentAuthenticator {
        async fn create_credential(
            &self,
            _options: &RegistrationOptions,
        ) -> Result<RegistrationResponse, CeremonyError> {
            std::future::pending().await
        }

        async fn get_assertion(
            &self,
            _options: &AuthenticationOptions,
        ) -> Result<AuthenticationResponse, CeremonyError> {
            std::future::pending().await
        }
    }

    /// Reports that no platform authenticator exists.
    struct NoAuthenticator;

    impl PlatformAuthenticator for NoAuthenticator {
        async fn create_credential(
            &self,
            _options: &RegistrationOptions,
        ) -> Result<RegistrationResponse, CeremonyError> {
            Err(CeremonyError::unsupported("no platform authenticator"))
        }

        async fn get_assertion(
            &self,
            _options: &AuthenticationOptions,
        ) -> Result<AuthenticationResponse, CeremonyError> {
            Err(CeremonyError::unsupported("no platform authenticator"))
        }
    }

    #[test]
    fn registration_options_carry_policy() {
        let options = coordinator().begin_registration("alice", Challenge::from_bytes([1; 32]));
        assert_eq!(options.rp.name, "Stellar Passkey Wallet");
        assert_eq!(options.rp.id, "localhost");
        assert_eq!(options.user.name, "alice");
        assert_eq!(options.pub_key_cred_params.len(), 1);
        assert_eq!(options.pub_key_cred_params[0].alg, -7);
        assert_eq!(options.timeout, 60_000);
        assert_eq!(options.attestation, "direct");
        assert_eq!(
            options.authenticator_selection.authenticator_attachment,
            "platform"
        );
        assert_eq!(options.challenge.len(), 43);
    }

    #[test]
    fn authentication_options_have_no_user() {
        let options = coordinator().begin_authentication(Challenge::from_bytes([2; 32]));
        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("user").is_none());
        assert_eq!(json["rpId"], "localhost");
        assert_eq!(json["userVerification"], "required");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_authenticator_times_out() {
        let coordinator = coordinator();
        let options = coordinator.begin_registration("alice", Challenge::from_bytes([3; 32]));
        let err = coordinator
            .register(&SilentAuthenticator, &options, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.reason, CeremonyFailure::TimedOut);
    }

    #[tokio::test]
    async fn cancellation_token_cancels_ceremony() {
        let coordinator = coordinator();
        let options = coordinator.begin_authentication(Challenge::from_bytes([4; 32]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = coordinator
            .authenticate(&SilentAuthenticator, &options, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.reason, CeremonyFailure::Cancelled);
    }

    #[tokio::test]
    async fn unsupported_authenticator_is_reported() {
        let coordinator = coordinator();
        let options = coordinator.begin_registration("bob", Challenge::from_bytes([5; 32]));
        let err = coordinator
            .register(&NoAuthenticator, &options, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.reason, CeremonyFailure::Unsupported);
    }

    #[tokio::test(start_paused = true)]
    async fn late_finish_after_timeout_is_unknown() {
        let coordinator = Arc::new(CeremonyCoordinator::new(
            coordinator().relying_party().clone(),
            Duration::from_millis(100),
        ));
        let bridge: Arc<CeremonyBridge<Option<CeremonyFailure>>> = Arc::new(CeremonyBridge::new());
        let options = coordinator.begin_registration("erin", Challenge::from_bytes([6; 32]));
        let ticket = bridge.open();
        let id = ticket.id;

        let task = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                let result = coordinator
                    .register(&ticket.authenticator, &options, &CancellationToken::new())
                    .await;
                let _ = ticket.outcome.send(result.err().map(|e| e.reason));
                bridge.close(id);
            })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;
        task.await.unwrap();
        assert_eq!(bridge.pending(), 0);

        let late = RegistrationResponse {
            id: "a2V5".into(),
            raw_id: "a2V5".into(),
            response: AttestationPayload {
                client_data_json: "e30".into(),
                attestation_object: "oA".into(),
                transports: Vec::new(),
            },
            kind: "public-key".into(),
        };
        assert_eq!(
            bridge
                .finish(id, CeremonyResponse::Registration(late))
                .await
                .unwrap_err(),
            BridgeError::UnknownCeremony(id)
        );
    }
}
