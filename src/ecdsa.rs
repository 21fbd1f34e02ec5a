// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Textbook ECDSA over any [`CurveTrait`].
//!
//! Signing takes the nonce as an argument instead of drawing one, since the
//! nonce is produced jointly by the signer and the firewalls. Verification
//! accepts both `(r, s)` and `(r, n - s)`: the firewalls choose
//! between those two forms, so no low-s normalization is applied here.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{InternalError, Result},
    parameters::HashFunction,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// ECDSA signature `(r, s)`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Signature<C: CurveTrait> {
    r: C::Scalar,
    s: C::Scalar,
}

impl<C: CurveTrait> Debug for Signature<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature")
            .field("r", &hex::encode(self.r.to_bytes()))
            .field("s", &hex::encode(self.s.to_bytes()))
            .finish()
    }
}

impl<C: CurveTrait> Signature<C> {
    /// Assemble a signature from its scalars.
    pub fn new(r: C::Scalar, s: C::Scalar) -> Self {
        Self { r, s }
    }

    /// The `r` component.
    pub fn r(&self) -> C::Scalar {
        self.r
    }

    /// The `s` component.
    pub fn s(&self) -> C::Scalar {
        self.s
    }

    /// The other valid form of this signature, `(r, n - s)`.
    pub fn complement(&self) -> Self {
        Self {
            r: self.r,
            s: -self.s,
        }
    }

    /// Fixed-width `r || s` encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.r.to_bytes();
        bytes.extend_from_slice(&self.s.to_bytes());
        bytes
    }
}

/// Folds `message` into a scalar: the leftmost 256 bits of its digest,
/// reduced modulo the group order.
pub fn hash_message<C: CurveTrait>(hash: HashFunction, message: &[u8]) -> C::Scalar {
    C::Scalar::reduce_bytes(&hash.digest(message))
}

/// Generates an ECDSA keypair `(k, Q = kG)`.
pub fn generate_key<C: CurveTrait, R: RngCore + CryptoRng>(rng: &mut R) -> (C::Scalar, C) {
    let private_key = C::Scalar::random_nonzero(rng);
    (private_key, C::scale_generator(&private_key))
}

/// Signs `message` with `private_key`, using the caller-provided nonce `k`
/// and its public point `kG`.
pub fn sign_with_nonce<C: CurveTrait>(
    hash: HashFunction,
    private_key: &C::Scalar,
    message: &[u8],
    nonce: &C::Scalar,
    nonce_point: &C,
) -> Result<Signature<C>> {
    let r = nonce_point.x_projection();
    if r.is_zero() {
        return Err(InternalError::DegenerateSignature);
    }
    let nonce_inv = nonce
        .invert()
        .ok_or(InternalError::CouldNotInvertScalar)?;
    let z = hash_message::<C>(hash, message);
    let s = nonce_inv * (z + r * *private_key);
    if s.is_zero() {
        return Err(InternalError::DegenerateSignature);
    }
    Ok(Signature { r, s })
}

/// Verifies `signature` on `message` against `public_key`.
pub fn verify<C: CurveTrait>(
    hash: HashFunction,
    public_key: &C,
    message: &[u8],
    signature: &Signature<C>,
) -> Result<()> {
    if signature.r.is_zero() {
        debug!("Rejecting signature with r = 0");
        return Err(InternalError::InvalidSignature);
    }
    let w = signature.s.invert().ok_or_else(|| {
        debug!("Rejecting signature with s = 0");
        InternalError::InvalidSignature
    })?;
    let z = hash_message::<C>(hash, message);
    let point = C::scale_generator(&(z * w)) + public_key.multiply_by_scalar(&(signature.r * w));
    if point.is_identity() || point.x_projection() != signature.r {
        debug!("Signature verification equation does not hold");
        return Err(InternalError::InvalidSignature);
    }
    Ok(())
}

/// Recovers the nonce point `s⁻¹(zG + rQ)` implied by a signature.
///
/// For a signature made with nonce `k` this is `kG`; for its complement it
/// is `-kG`.
pub fn recover_nonce_point<C: CurveTrait>(
    hash: HashFunction,
    public_key: &C,
    message: &[u8],
    signature: &Signature<C>,
) -> Result<C> {
    let s_inv = signature
        .s
        .invert()
        .ok_or(InternalError::InvalidSignature)?;
    let z = hash_message::<C>(hash, message);
    let point = C::scale_generator(&z) + public_key.multiply_by_scalar(&signature.r);
    Ok(point.multiply_by_scalar(&s_inv))
}
