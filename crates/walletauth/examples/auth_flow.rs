/*
[INPUT]:  A locally generated wallet and an in-process verifier
[OUTPUT]: Authenticated address printed to stdout
[POS]:    Examples - challenge/response flow demonstration
[UPDATE]: When auth flow changes
*/

use std::sync::Arc;

use walletauth::wallet::announce_on;
use walletauth::*;

/// Example: Authentication flow
///
/// 1. Announce a local wallet on the discovery bus
/// 2. Connect the session to the first discovered provider
/// 3. Issue a challenge for the connected address
/// 4. Sign the envelope through the session
/// 5. Verify the signature and print the authenticated address
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== walletauth Authentication Example ===\n");

    // Step 1: Discovery
    let channel: Arc<dyn AnnouncementChannel> = Arc::new(InProcessChannel::new());
    let registry = Arc::new(ProviderRegistry::start(channel.as_ref()));
    let wallet = Arc::new(LocalWalletProvider::random(1, 1));
    let _announcer = announce_on(
        &channel,
        ProviderRecord::new(
            ProviderInfo::new("Local Wallet", "data:image/svg+xml,", "io.walletauth.local"),
            wallet,
        ),
    );
    println!("✓ {} provider(s) discovered", registry.len());

    // Step 2: Connect
    let session = WalletSession::new(registry.clone(), Arc::new(MemoryStore::new()));
    let provider = registry
        .get_providers()
        .into_iter()
        .next()
        .ok_or("no wallet provider announced")?;
    let address = session.connect(&provider).await?;
    println!("✓ Connected {} via {}", address, provider.info.name);

    // Step 3: Issue
    let tokens = Arc::new(JwtTokenService::new("example-secret"));
    let issuer = ChallengeIssuer::new(tokens.clone());
    let verifier = ChallengeVerifier::new(tokens, Arc::new(Eip712Recovery));
    let envelope = issuer.issue_default(&address, &Domain::new("Example", "1", 1))?;
    println!("✓ Challenge issued");

    // Step 4: Sign
    let signature = session.sign_typed_data(&envelope).await?;
    println!("✓ Envelope signed: {}...", &signature[..18]);

    // Step 5: Verify
    let authenticated = verifier.verify_envelope(&envelope, &signature)?;
    println!("✓ Authenticated as {authenticated}");

    session.disconnect();
    println!("\n✓ Authentication example complete");
    Ok(())
}
