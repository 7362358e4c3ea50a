/*
[INPUT]:  Parsed configuration, private keys and envelope documents
[OUTPUT]: Issued envelopes, signatures, verification outcomes, login results
[POS]:    Command layer - one function per CLI subcommand
[UPDATE]: When adding subcommands or changing their output
*/

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::info;
use walletauth::{
    AuthClient, AuthEnvelope, ChallengeIssuer, ChallengeVerifier, Eip712Recovery,
    HttpChallengeTransport, InProcessChannel, JwtTokenService, LocalWalletProvider, MemoryStore,
    ProviderInfo, ProviderRecord, ProviderRegistry, VerifyError, WalletSession,
};

use crate::config::CliConfig;

const LOCAL_PROVIDER_NAME: &str = "walletauth-cli";
const LOCAL_PROVIDER_RDNS: &str = "io.walletauth.cli";

fn token_service(config: &CliConfig) -> Arc<JwtTokenService> {
    Arc::new(JwtTokenService::new(&config.token.secret))
}

/// Issue a challenge envelope for `address`
pub fn issue(config: &CliConfig, address: &str, ttl_seconds: Option<u64>) -> Result<AuthEnvelope> {
    let issuer = ChallengeIssuer::new(token_service(config));
    let ttl = ttl_seconds.unwrap_or(config.token.ttl_seconds);
    let envelope = issuer
        .issue(address, &config.domain.to_domain(), ttl)
        .context("issue challenge")?;
    info!(address = %address, ttl_seconds = ttl, "challenge issued");
    Ok(envelope)
}

/// Session connected to an in-process wallet holding `private_key`
pub async fn local_session(private_key: &str, chain_id: u64) -> Result<WalletSession> {
    let wallet = Arc::new(
        LocalWalletProvider::from_private_keys(&[private_key], chain_id)
            .context("load private key")?,
    );
    let channel = InProcessChannel::new();
    let registry = Arc::new(ProviderRegistry::start(&channel));
    let session = WalletSession::new(registry, Arc::new(MemoryStore::new()));

    let record = ProviderRecord::new(
        ProviderInfo::new(LOCAL_PROVIDER_NAME, "", LOCAL_PROVIDER_RDNS),
        wallet,
    );
    let address = session.connect(&record).await.context("connect local wallet")?;
    info!(address = %address, "local wallet connected");
    Ok(session)
}

/// Sign an arbitrary typed-data document with a local key
pub async fn sign(private_key: &str, chain_id: u64, envelope: &Value) -> Result<String> {
    let session = local_session(private_key, chain_id).await?;
    let signature = session
        .sign_typed_data(envelope)
        .await
        .context("sign typed data")?;
    session.disconnect();
    Ok(signature)
}

/// Verify a signed envelope
///
/// The inner result carries the verification outcome; the outer one only
/// fails on setup errors.
pub fn verify(
    config: &CliConfig,
    envelope: &Value,
    signature: &str,
) -> std::result::Result<String, VerifyError> {
    let verifier = ChallengeVerifier::new(token_service(config), Arc::new(Eip712Recovery));
    verifier.verify(envelope, signature)
}

/// Authenticate a local key against the configured verifier
pub async fn login(config: &CliConfig, private_key: &str) -> Result<String> {
    let base_url = config
        .server
        .base_url
        .as_deref()
        .ok_or_else(|| anyhow!("server.base_url is required for login"))?;
    let transport = HttpChallengeTransport::with_config(base_url, config.server.client_config())
        .context("build HTTP transport")?;

    let session = local_session(private_key, config.domain.chain_id).await?;
    let address = AuthClient::new(transport)
        .authenticate(&session)
        .await
        .context("authenticate")?;
    session.disconnect();
    Ok(address)
}

/// Read a JSON document from disk
pub fn read_json(path: &std::path::Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}
