/*
[INPUT]:  Message to sign and wallet key material
[OUTPUT]: Personal-sign signature for the challenge message
[POS]:    Auth layer - client-side wallet abstraction
[UPDATE]: When adding new wallet types or changing signature format
*/

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Address, WalletSignature};

/// Trait for wallet signing operations
///
/// The trait is async to support hardware wallets and external signers.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Get the wallet address
    fn address(&self) -> Address;

    /// Sign a message with the personal-sign prefix applied
    async fn sign_message(&self, message: &str) -> Result<WalletSignature>;
}

/// Mock wallet signer for testing
#[derive(Debug, Clone)]
pub struct MockWalletSigner {
    address: Address,
    signature: String,
}

impl MockWalletSigner {
    /// Create a new mock signer with a predetermined hex signature
    pub fn new(address: Address, signature: &str) -> Self {
        Self {
            address,
            signature: signature.to_string(),
        }
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, _message: &str) -> Result<WalletSignature> {
        WalletSignature::from_hex(&self.signature)
    }
}
