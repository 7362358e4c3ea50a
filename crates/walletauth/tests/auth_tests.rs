/*
[INPUT]:  Issued challenges, local wallet signatures and mock verifier endpoints
[OUTPUT]: Test results for the challenge/response flow
[POS]:    Integration tests - authentication
[UPDATE]: When auth endpoints or flow changes
*/

mod common;

use std::sync::Arc;

use common::{
    IssueResponder, TEST_ADDRESS, TEST_PRIVATE_KEY, VerifyResponder, challenge_services, harness,
    local_record, setup_mock_server, test_domain,
};
use serde_json::json;
use tokio_test::assert_ok;
use walletauth::{
    AuthClient, AuthEnvelope, ChallengeVerifier, Eip712Recovery, HttpChallengeTransport,
    JwtTokenService, LocalWalletProvider, MemoryStore, TransportError, VerifyError, WalletError,
};
use wiremock::matchers::{method, path};
use wiremock::Mock;

async fn sign_with(wallet: &Arc<LocalWalletProvider>, envelope: &AuthEnvelope) -> String {
    let h = harness(Arc::new(MemoryStore::new()));
    assert_ok!(h.session.connect(&local_record("signer", wallet)).await);
    assert_ok!(h.session.sign_typed_data(envelope).await)
}

#[tokio::test]
async fn test_issue_sign_verify_round_trip() {
    let (issuer, verifier) = challenge_services();
    let wallet = Arc::new(assert_ok!(LocalWalletProvider::from_private_keys(
        &[TEST_PRIVATE_KEY],
        1
    )));

    let envelope = assert_ok!(issuer.issue(&wallet.addresses()[0], &test_domain(), 30));
    assert!(!envelope.challenge().is_empty());
    let signature = sign_with(&wallet, &envelope).await;

    let authenticated = assert_ok!(verifier.verify_envelope(&envelope, &signature));
    assert_eq!(authenticated, TEST_ADDRESS);
}

#[test]
fn test_every_issue_is_fresh() {
    let (issuer, _) = challenge_services();
    let first = assert_ok!(issuer.issue(TEST_ADDRESS, &test_domain(), 30));
    let second = assert_ok!(issuer.issue(TEST_ADDRESS, &test_domain(), 30));

    assert_ne!(first.challenge(), second.challenge());
}

#[tokio::test]
async fn test_signature_from_other_wallet_is_mismatch() {
    let (issuer, verifier) = challenge_services();
    let intruder = Arc::new(LocalWalletProvider::random(1, 1));

    let envelope = assert_ok!(issuer.issue(TEST_ADDRESS, &test_domain(), 30));
    let signature = sign_with(&intruder, &envelope).await;

    let err = verifier.verify_envelope(&envelope, &signature).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::SignatureMismatch { ref expected, .. } if expected == TEST_ADDRESS
    ));
}

#[tokio::test]
async fn test_expired_challenge_is_invalid_token() {
    let (issuer, verifier) = challenge_services();
    let wallet = Arc::new(assert_ok!(LocalWalletProvider::from_private_keys(
        &[TEST_PRIVATE_KEY],
        1
    )));

    let envelope = assert_ok!(issuer.issue(TEST_ADDRESS, &test_domain(), 1));
    let signature = sign_with(&wallet, &envelope).await;
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let err = verifier.verify_envelope(&envelope, &signature).unwrap_err();
    assert_eq!(err.kind(), "invalid_token");
}

#[test]
fn test_empty_envelope_is_invalid_message() {
    let (_, verifier) = challenge_services();
    let err = verifier.verify(&json!({}), "0x00").unwrap_err();
    assert!(matches!(err, VerifyError::InvalidMessage(_)));
}

#[tokio::test]
async fn test_login_against_http_verifier() {
    let server = setup_mock_server().await;
    let (issuer, verifier) = challenge_services();

    Mock::given(method("POST"))
        .and(path("/auth/challenge"))
        .respond_with(IssueResponder(issuer))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .respond_with(VerifyResponder(verifier))
        .expect(1)
        .mount(&server)
        .await;

    let wallet = Arc::new(assert_ok!(LocalWalletProvider::from_private_keys(
        &[TEST_PRIVATE_KEY],
        1
    )));
    let h = harness(Arc::new(MemoryStore::new()));
    assert_ok!(h.session.connect(&local_record("p1", &wallet)).await);

    let client = AuthClient::new(assert_ok!(HttpChallengeTransport::new(&server.uri())));
    let address = assert_ok!(client.authenticate(&h.session).await);

    assert_eq!(address, TEST_ADDRESS);
}

#[tokio::test]
async fn test_login_rejected_by_verifier() {
    let server = setup_mock_server().await;
    let (issuer, _) = challenge_services();
    // verifier holding a different secret rejects every token
    let foreign_verifier = ChallengeVerifier::new(
        Arc::new(JwtTokenService::new("other-secret")),
        Arc::new(Eip712Recovery),
    );

    Mock::given(method("POST"))
        .and(path("/auth/challenge"))
        .respond_with(IssueResponder(issuer))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify"))
        .respond_with(VerifyResponder(foreign_verifier))
        .mount(&server)
        .await;

    let wallet = Arc::new(LocalWalletProvider::random(1, 1));
    let h = harness(Arc::new(MemoryStore::new()));
    assert_ok!(h.session.connect(&local_record("p1", &wallet)).await);

    let client = AuthClient::new(assert_ok!(HttpChallengeTransport::new(&server.uri())));
    let err = client.authenticate(&h.session).await.unwrap_err();

    match err {
        WalletError::Transport(TransportError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid_token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
