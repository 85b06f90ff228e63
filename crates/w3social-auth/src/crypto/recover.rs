/*
[INPUT]:  32-byte digest and decoded (r, s, v) wallet signature
[OUTPUT]: Address of the key that produced the signature
[POS]:    Crypto layer - secp256k1 public-key recovery
[UPDATE]: When signature acceptance policy or recovery math changes
*/

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::PrimeField;
use k256::elliptic_curve::point::DecompressPoint;
use k256::elliptic_curve::scalar::IsHigh;
use k256::elliptic_curve::subtle::Choice;
use k256::{AffinePoint, FieldBytes, ProjectivePoint, PublicKey, Scalar, U256};

use crate::crypto::Digest;
use crate::error::{AuthError, Result};
use crate::types::{Address, SignaturePolicy, WalletSignature};

/// Recovers signer addresses from personal-sign signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureRecoverer {
    policy: SignaturePolicy,
}

impl SignatureRecoverer {
    pub fn new(policy: SignaturePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SignaturePolicy {
        self.policy
    }

    /// Recover the address whose key signed `digest`
    ///
    /// With `R` the curve point whose x coordinate is `r` and whose y parity
    /// is selected by `v`, the public key is `Q = r⁻¹·(s·R − z·G)`.
    pub fn recover(&self, digest: &Digest, signature: &WalletSignature) -> Result<Address> {
        let r = nonzero_scalar(signature.r())?;
        let s = nonzero_scalar(signature.s())?;

        if self.policy == SignaturePolicy::Strict && bool::from(s.is_high()) {
            return Err(AuthError::InvalidSignature);
        }

        let y_is_odd = Choice::from(u8::from(signature.y_is_odd()));
        let big_r = Option::<AffinePoint>::from(AffinePoint::decompress(
            FieldBytes::from_slice(signature.r()),
            y_is_odd,
        ))
        .ok_or(AuthError::InvalidSignature)?;

        let z = <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(digest));
        let r_inv = Option::<Scalar>::from(r.invert()).ok_or(AuthError::InvalidSignature)?;
        let u1 = -(r_inv * z);
        let u2 = r_inv * s;

        let q = ProjectivePoint::GENERATOR * u1 + ProjectivePoint::from(big_r) * u2;

        // Identity point is not a valid public key
        let public_key =
            PublicKey::from_affine(q.to_affine()).map_err(|_| AuthError::InvalidSignature)?;

        Ok(Address::from_public_key(&public_key))
    }
}

/// Parse a big-endian scalar in `[1, n)`
fn nonzero_scalar(bytes: &[u8; 32]) -> Result<Scalar> {
    let scalar = Option::<Scalar>::from(Scalar::from_repr(*FieldBytes::from_slice(bytes)))
        .ok_or(AuthError::InvalidSignature)?;
    if bool::from(scalar.is_zero()) {
        return Err(AuthError::InvalidSignature);
    }
    Ok(scalar)
}
