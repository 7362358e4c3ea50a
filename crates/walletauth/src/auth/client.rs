/*
[INPUT]:  Connected wallet session and a challenge transport
[OUTPUT]: Address authenticated by the remote verifier
[POS]:    Auth layer - client side, orchestrates challenge / sign / submit
[UPDATE]: When auth flow steps change
*/

use async_trait::async_trait;
use tracing::info;

use crate::error::{Result, TransportError, WalletError};
use crate::types::AuthEnvelope;
use crate::wallet::WalletSession;

/// Carries challenges between the wallet client and a verifier
#[async_trait]
pub trait ChallengeTransport: Send + Sync {
    /// Ask the verifier for a challenge bound to `address`
    async fn request_challenge(
        &self,
        address: &str,
    ) -> std::result::Result<AuthEnvelope, TransportError>;

    /// Submit the signed envelope; returns the authenticated address
    async fn submit(
        &self,
        envelope: &AuthEnvelope,
        signature: &str,
    ) -> std::result::Result<String, TransportError>;
}

/// Runs the complete challenge flow for a connected wallet
#[derive(Debug, Clone)]
pub struct AuthClient<T> {
    transport: T,
}

impl<T: ChallengeTransport> AuthClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Complete authentication flow
    ///
    /// 1. Request a challenge for the session address
    /// 2. Sign the envelope with the session's provider
    /// 3. Submit envelope and signature
    pub async fn authenticate(&self, session: &WalletSession) -> Result<String> {
        let address = session.address().ok_or(WalletError::NoActiveSession)?;

        // Step 1: Challenge
        let envelope = self.transport.request_challenge(&address).await?;

        // Step 2: Sign
        let signature = session.sign_typed_data(&envelope).await?;

        // Step 3: Submit
        let authenticated = self.transport.submit(&envelope, &signature).await?;

        info!(address = %authenticated, "wallet authenticated");
        Ok(authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::auth::issuer::ChallengeIssuer;
    use crate::auth::recovery::Eip712Recovery;
    use crate::auth::token::JwtTokenService;
    use crate::auth::verifier::ChallengeVerifier;
    use crate::types::Domain;
    use crate::wallet::{
        InProcessChannel, LocalWalletProvider, MemoryStore, ProviderInfo, ProviderRecord,
        ProviderRegistry,
    };

    /// Verifier running in process; records what it was asked
    struct LoopbackTransport {
        issuer: ChallengeIssuer,
        verifier: ChallengeVerifier,
        domain: Domain,
        requested: Mutex<Vec<String>>,
    }

    impl LoopbackTransport {
        fn new() -> Self {
            let tokens = Arc::new(JwtTokenService::new("loopback"));
            Self {
                issuer: ChallengeIssuer::new(tokens.clone()),
                verifier: ChallengeVerifier::new(tokens, Arc::new(Eip712Recovery)),
                domain: Domain::new("Loopback", "1", 1),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChallengeTransport for LoopbackTransport {
        async fn request_challenge(
            &self,
            address: &str,
        ) -> std::result::Result<AuthEnvelope, TransportError> {
            self.requested.lock().unwrap().push(address.to_string());
            self.issuer
                .issue_default(address, &self.domain)
                .map_err(|e| TransportError::Api {
                    status: 400,
                    message: e.to_string(),
                })
        }

        async fn submit(
            &self,
            envelope: &AuthEnvelope,
            signature: &str,
        ) -> std::result::Result<String, TransportError> {
            self.verifier
                .verify_envelope(envelope, signature)
                .map_err(|e| TransportError::Api {
                    status: 401,
                    message: e.kind().to_string(),
                })
        }
    }

    async fn connected_session(wallet: Arc<LocalWalletProvider>) -> WalletSession {
        let channel = InProcessChannel::new();
        let registry = Arc::new(ProviderRegistry::start(&channel));
        let session = WalletSession::new(registry, Arc::new(MemoryStore::new()));
        let record = ProviderRecord::new(ProviderInfo::new("Local", "data:,", "io.local"), wallet);
        session.connect(&record).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_authenticate_round_trip() {
        let wallet = Arc::new(LocalWalletProvider::random(1, 1));
        let session = connected_session(wallet.clone()).await;
        let client = AuthClient::new(LoopbackTransport::new());

        let address = client.authenticate(&session).await.unwrap();

        assert_eq!(address, wallet.addresses()[0].to_ascii_lowercase());
        assert_eq!(
            *client.transport().requested.lock().unwrap(),
            vec![wallet.addresses()[0].clone()]
        );
    }

    #[tokio::test]
    async fn test_authenticate_requires_connection() {
        let channel = InProcessChannel::new();
        let registry = Arc::new(ProviderRegistry::start(&channel));
        let session = WalletSession::new(registry, Arc::new(MemoryStore::new()));
        let client = AuthClient::new(LoopbackTransport::new());

        let err = client.authenticate(&session).await.unwrap_err();

        assert!(matches!(err, WalletError::NoActiveSession));
        assert!(client.transport().requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verifier_rejection_surfaces_as_transport_error() {
        struct Rejecting(LoopbackTransport);

        #[async_trait]
        impl ChallengeTransport for Rejecting {
            async fn request_challenge(
                &self,
                address: &str,
            ) -> std::result::Result<AuthEnvelope, TransportError> {
                self.0.request_challenge(address).await
            }

            async fn submit(
                &self,
                envelope: &AuthEnvelope,
                _signature: &str,
            ) -> std::result::Result<String, TransportError> {
                // signature from a different key
                self.0.submit(envelope, &format!("0x{}", "11".repeat(65))).await
            }
        }

        let wallet = Arc::new(LocalWalletProvider::random(1, 1));
        let session = connected_session(wallet).await;
        let client = AuthClient::new(Rejecting(LoopbackTransport::new()));

        let err = client.authenticate(&session).await.unwrap_err();

        assert!(matches!(
            err,
            WalletError::Transport(TransportError::Api { status: 401, .. })
        ));
    }
}
