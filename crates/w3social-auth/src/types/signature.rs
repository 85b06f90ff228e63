/*
[INPUT]:  65-byte wallet signatures as raw bytes or hex strings
[OUTPUT]: Decoded (r, s, v) components with a normalized recovery id
[POS]:    Data layer - signed message representation
[UPDATE]: When accepted signature encodings change
*/

use std::fmt;

use crate::error::{AuthError, Result};

/// Byte length of an `r || s || v` signature
pub const SIGNATURE_LENGTH: usize = 65;

/// Decoded wallet signature with `v` normalized to 27 or 28
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WalletSignature {
    r: [u8; 32],
    s: [u8; 32],
    v: u8,
}

impl WalletSignature {
    /// Decode `r || s || v`, accepting a raw recovery id of 0/1
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(AuthError::InvalidSignature);
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);

        let mut v = bytes[64];
        if v < 27 {
            v += 27;
        }
        if v != 27 && v != 28 {
            return Err(AuthError::InvalidSignature);
        }

        Ok(Self { r, s, v })
    }

    /// Decode a `0x` + 130 hex char signature (prefix optional)
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        let digits = encoded
            .strip_prefix("0x")
            .or_else(|| encoded.strip_prefix("0X"))
            .unwrap_or(encoded);

        if digits.len() != SIGNATURE_LENGTH * 2 {
            return Err(AuthError::InvalidSignature);
        }

        let bytes = hex::decode(digits).map_err(|_| AuthError::InvalidSignature)?;
        Self::from_bytes(&bytes)
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Normalized recovery id, always 27 or 28
    pub fn v(&self) -> u8 {
        self.v
    }

    /// Parity of the nonce point's y coordinate
    pub fn y_is_odd(&self) -> bool {
        self.v == 28
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for WalletSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WalletSignature").field(&self.to_hex()).finish()
    }
}

/// Raw message text paired with the signature the wallet produced over it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub message: String,
    pub signature: WalletSignature,
}

impl SignedMessage {
    pub fn new(message: impl Into<String>, signature: WalletSignature) -> Self {
        Self {
            message: message.into(),
            signature,
        }
    }

    /// Decode the signature from its hex transport form
    pub fn from_hex(message: impl Into<String>, signature_hex: &str) -> Result<Self> {
        Ok(Self::new(message, WalletSignature::from_hex(signature_hex)?))
    }
}
