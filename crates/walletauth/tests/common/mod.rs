/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for walletauth tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use walletauth::{
    AnnouncementChannel, ChallengeIssuer, ChallengeVerifier, Domain, Eip712Recovery,
    InProcessChannel, JwtTokenService, LocalWalletProvider, ProviderInfo, ProviderRecord,
    ProviderRegistry, SessionStore, WalletSession, wallet::SessionConfig,
};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// Well-known development key (first Anvil/Hardhat account)
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

pub const TEST_SECRET: &str = "integration-secret";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_domain() -> Domain {
    Domain::new("App", "1", 1)
}

/// Issuer and verifier sharing one token secret
pub fn challenge_services() -> (ChallengeIssuer, ChallengeVerifier) {
    let tokens = Arc::new(JwtTokenService::new(TEST_SECRET));
    (
        ChallengeIssuer::new(tokens.clone()),
        ChallengeVerifier::new(tokens, Arc::new(Eip712Recovery)),
    )
}

pub fn local_record(uuid: &str, wallet: &Arc<LocalWalletProvider>) -> ProviderRecord {
    ProviderRecord::new(
        ProviderInfo::new("Local Wallet", "data:image/svg+xml,", "io.walletauth.local")
            .with_uuid(uuid),
        wallet.clone(),
    )
}

/// Discovery bus, registry and session wired together
pub struct Harness {
    pub channel: Arc<dyn AnnouncementChannel>,
    pub registry: Arc<ProviderRegistry>,
    pub session: WalletSession,
}

pub fn harness(store: Arc<dyn SessionStore>) -> Harness {
    let channel: Arc<dyn AnnouncementChannel> = Arc::new(InProcessChannel::new());
    let registry = Arc::new(ProviderRegistry::start(channel.as_ref()));
    let session = WalletSession::with_config(
        registry.clone(),
        store,
        SessionConfig {
            reconnect_grace: Duration::from_millis(50),
        },
    );
    Harness {
        channel,
        registry,
        session,
    }
}

/// Mock server endpoint backed by a real issuer
pub struct IssueResponder(pub ChallengeIssuer);

impl Respond for IssueResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let address = request
            .body_json::<Value>()
            .ok()
            .and_then(|body| body.get("address").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        match self.0.issue(&address, &test_domain(), 30) {
            Ok(envelope) => ResponseTemplate::new(200).set_body_json(envelope),
            Err(err) => ResponseTemplate::new(400).set_body_json(json!({"error": err.to_string()})),
        }
    }
}

/// Mock server endpoint backed by a real verifier
pub struct VerifyResponder(pub ChallengeVerifier);

impl Respond for VerifyResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = request.body_json::<Value>() else {
            return ResponseTemplate::new(400).set_body_json(json!({"error": "invalid body"}));
        };
        let envelope = body.get("typedData").cloned().unwrap_or(Value::Null);
        let signature = body.get("signature").and_then(Value::as_str).unwrap_or_default();
        match self.0.verify(&envelope, signature) {
            Ok(address) => ResponseTemplate::new(200).set_body_json(json!({"address": address})),
            Err(err) => ResponseTemplate::new(401).set_body_json(json!({"error": err.kind()})),
        }
    }
}
