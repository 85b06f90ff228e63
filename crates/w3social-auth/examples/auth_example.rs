/*
[INPUT]:  A freshly generated local wallet
[OUTPUT]: Session token and public identity printed to stdout
[POS]:    Examples - authentication flow demonstration
[UPDATE]: When auth flow changes
*/

use std::sync::Arc;

use w3social_auth::*;

/// Example: Authentication flow
///
/// This example walks the complete challenge/response exchange:
/// 1. Build a coordinator over in-memory stores
/// 2. Request a challenge for the wallet address
/// 3. Sign the challenge with the wallet
/// 4. Authenticate to receive a session token
/// 5. Verify the token as a downstream service would
#[tokio::main]
async fn main() {
    println!("=== Wallet Authentication Example ===\n");

    // Step 1: Coordinator with a random token secret
    let coordinator = match AuthCoordinator::new(
        &AuthConfig::generate(),
        Arc::new(MemoryNonceStore::new()),
        Arc::new(MemoryIdentityRepository::new()),
        Arc::new(SystemClock),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to build coordinator: {}", e);
            return;
        }
    };
    println!("✓ Coordinator created");

    let wallet = EvmWalletSigner::random();
    let address = wallet.address();
    println!("  Wallet address: {}", address.to_checksum());

    // Step 2: Challenge
    let nonce = match coordinator.request_challenge(&address).await {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Challenge failed: {}", e);
            return;
        }
    };
    println!("✓ Challenge issued: {:?}", nonce.message);

    // Step 3-4: Sign and authenticate
    let outcome = match wallet.sign_message(&nonce.message).await {
        Ok(signature) => {
            coordinator
                .authenticate(&address, &nonce.message, &signature)
                .await
        }
        Err(e) => Err(e),
    };
    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Authentication failed ({}): {}", e.kind(), e);
            return;
        }
    };
    println!("✓ Authenticated, identity {}", outcome.identity.id);
    println!("  Token expires at {}", outcome.token.expires_at());

    // Step 5: Verify
    match coordinator.verify_session(outcome.token.as_str()) {
        Ok(claims) => println!("✓ Token verified for {} ({})", claims.address, claims.role),
        Err(e) => eprintln!("Verification failed: {}", e),
    }

    println!("\n✓ Authentication example complete");
}
