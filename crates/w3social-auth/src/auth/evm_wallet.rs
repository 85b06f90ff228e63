/*
[INPUT]:  EVM private key (hex string)
[OUTPUT]: Signed messages and wallet address for EVM chains
[POS]:    Auth layer - EVM wallet implementation
[UPDATE]: When signing logic or key parsing changes
*/

use std::fmt;
use std::str::FromStr;

use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::warn;

use crate::auth::WalletSigner;
use crate::config::ConfigError;
use crate::error::{AuthError, Result};
use crate::types::{Address, WalletSignature};

/// Signer backed by a local secp256k1 private key
pub struct EvmWalletSigner {
    signer: PrivateKeySigner,
    address: Address,
}

impl EvmWalletSigner {
    /// Create a new EVM wallet signer from a hex-encoded private key
    ///
    /// Supports both "0x"-prefixed and non-prefixed hex strings.
    pub fn new(private_key_hex: &str) -> std::result::Result<Self, ConfigError> {
        let private_key_hex = private_key_hex.trim();
        let private_key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer = PrivateKeySigner::from_str(private_key_hex)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_signer(signer))
    }

    /// Fresh random key
    pub fn random() -> Self {
        Self::from_signer(PrivateKeySigner::random())
    }

    fn from_signer(signer: PrivateKeySigner) -> Self {
        let address = Address::from_bytes(signer.address().0.0);
        Self { signer, address }
    }
}

impl fmt::Debug for EvmWalletSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmWalletSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletSigner for EvmWalletSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_message(&self, message: &str) -> Result<WalletSignature> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| {
                warn!(error = %e, "local wallet failed to sign");
                AuthError::InvalidSignature
            })?;

        // alloy's Signature as_bytes() returns [r, s, v] with v in {27, 28}
        WalletSignature::from_bytes(&signature.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{SignatureRecoverer, personal_digest};

    const HARDHAT_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_evm_wallet_signer() {
        let signer = EvmWalletSigner::new(HARDHAT_KEY_0).unwrap();
        assert_eq!(
            signer.address().to_checksum(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let signature = signer.sign_message("hello").await.unwrap();
        assert_eq!(signature.to_hex().len(), 132);

        let recovered = SignatureRecoverer::default()
            .recover(&personal_digest("hello"), &signature)
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_evm_wallet_signer_no_prefix() {
        let signer = EvmWalletSigner::new(&HARDHAT_KEY_0[2..]).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_evm_wallet_signer_rejects_garbage() {
        assert!(matches!(
            EvmWalletSigner::new("0xnot-a-key"),
            Err(ConfigError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = EvmWalletSigner::new(HARDHAT_KEY_0).unwrap();
        let rendered = format!("{signer:?}");
        assert!(!rendered.contains(&HARDHAT_KEY_0[2..]));
    }
}
