// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Elliptic curve abstraction
//!
//! The protocol only needs a handful of group operations: scalar
//! multiplication of the base point, point addition and negation, point
//! scalar multiplication, decoding with on-curve validation, and arithmetic
//! modulo the group order. [`CurveTrait`] and [`ScalarTrait`] collect exactly
//! those, so the signer and firewall roles can be written once and run over
//! any supported curve.

use crate::{errors::Result, k256::K256, p256::P256};
use rand::{CryptoRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::Debug,
    ops::{Add, Mul, Neg, Sub},
};
use zeroize::Zeroize;

/// Generic elliptic curve point.
pub trait CurveTrait:
    'static
    + Clone
    + Copy
    + Debug
    + Send
    + Sync
    + Eq
    + PartialEq
    + Add<Output = Self>
    + Neg<Output = Self>
{
    /// A generator point.
    const GENERATOR: Self;

    /// The identity point, used to initialize aggregations.
    const IDENTITY: Self;

    /// Human-readable curve name, bound into every commitment.
    const NAME: &'static str;

    /// The type of scalars modulo the group order.
    type Scalar: ScalarTrait;

    /// Multiply `self` by a [`Self::Scalar`].
    fn multiply_by_scalar(&self, scalar: &Self::Scalar) -> Self;

    /// Multiply the generator by a [`Self::Scalar`].
    fn scale_generator(scalar: &Self::Scalar) -> Self {
        Self::GENERATOR.multiply_by_scalar(scalar)
    }

    /// Returns `true` if this is the point at infinity.
    fn is_identity(&self) -> bool;

    /// Compute the affine x-coordinate of the point, reduced modulo the group
    /// order. This is the `r` component of an ECDSA signature.
    fn x_projection(&self) -> Self::Scalar;

    /// Serialize the point as a compressed SEC1 byte array.
    fn to_bytes(self) -> Vec<u8>;

    /// Deserialize a point from a SEC1 byte array.
    ///
    /// Fails with [`InvalidPoint`](crate::errors::InternalError::InvalidPoint)
    /// if the bytes do not encode a point on the curve, or encode the
    /// identity.
    fn try_from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Scalar trait.
pub trait ScalarTrait:
    'static
    + Clone
    + Copy
    + Debug
    + Send
    + Sync
    + Eq
    + PartialEq
    + Zeroize
    + Serialize
    + DeserializeOwned
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    /// The additive identity.
    const ZERO: Self;

    /// The multiplicative identity.
    const ONE: Self;

    /// Sample a scalar uniformly from `[0, n)`.
    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self;

    /// Sample a scalar uniformly from `[1, n)`.
    fn random_nonzero<R: RngCore + CryptoRng>(rng: &mut R) -> Self;

    /// Invert the scalar, returning `None` for zero.
    fn invert(&self) -> Option<Self>;

    /// Returns `true` if the scalar is zero.
    fn is_zero(&self) -> bool;

    /// Returns `true` if the canonical representative in `[0, n)` is odd.
    fn is_odd(&self) -> bool;

    /// Big-endian canonical encoding.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decode a big-endian canonical encoding, rejecting values `>= n`.
    fn try_from_bytes(bytes: &[u8]) -> Result<Self>;

    /// Interpret 32 big-endian bytes as an integer and reduce it modulo `n`.
    fn reduce_bytes(bytes: &[u8; 32]) -> Self;
}

/// Default curve type.
pub type TestCurve = K256;

/// K256 curve type.
pub type Secp256k1 = K256;

/// P256 curve type.
pub type Secp256r1 = P256;
