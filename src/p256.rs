// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! P256 functions

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{InternalError, Result},
};
use p256::{
    elliptic_curve::{
        bigint::U256,
        ops::Reduce,
        point::AffineCoordinates,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, Group, PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, ProjectivePoint, Scalar,
};
use rand::{CryptoRng, RngCore};
use std::ops::{Add, Neg};
use tracing::error;

/// Wrapper around p256::ProjectivePoint so that the NIST P-256 group can be
/// plugged into [`CurveTrait`].
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct P256(pub ProjectivePoint);

impl From<ProjectivePoint> for P256 {
    fn from(p: ProjectivePoint) -> Self {
        Self(p)
    }
}

impl Add for P256 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Neg for P256 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl CurveTrait for P256 {
    const GENERATOR: Self = P256(ProjectivePoint::GENERATOR);
    const IDENTITY: Self = P256(ProjectivePoint::IDENTITY);
    const NAME: &'static str = "nistp256";
    type Scalar = Scalar;

    fn multiply_by_scalar(&self, scalar: &Scalar) -> Self {
        Self(self.0 * *scalar)
    }

    fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }

    fn x_projection(&self) -> Scalar {
        let x: FieldBytes = self.0.to_affine().x();
        <Scalar as Reduce<U256>>::reduce_bytes(&x)
    }

    fn to_bytes(self) -> Vec<u8> {
        self.0.to_affine().to_encoded_point(true).as_bytes().to_vec()
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        // Only the compressed and uncompressed SEC1 forms are accepted
        if !matches!(bytes.first(), Some(0x02..=0x04)) {
            error!("Unsupported SEC1 tag for a P-256 point");
            return Err(InternalError::InvalidPoint);
        }
        let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| {
            error!("Failed to parse bytes as a SEC1 encoded P-256 point");
            InternalError::InvalidPoint
        })?;
        let point: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        match point.map(ProjectivePoint::from) {
            Some(point) if !bool::from(point.is_identity()) => Ok(Self(point)),
            _ => {
                error!("Encoded P-256 point is not on the curve or is the identity");
                Err(InternalError::InvalidPoint)
            }
        }
    }
}

impl ScalarTrait for Scalar {
    const ZERO: Self = <Scalar as Field>::ZERO;
    const ONE: Self = <Scalar as Field>::ONE;

    fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        <Scalar as Field>::random(&mut *rng)
    }

    fn random_nonzero<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        *NonZeroScalar::random(&mut *rng)
    }

    fn invert(&self) -> Option<Self> {
        Option::from(<Scalar as Field>::invert(self))
    }

    fn is_zero(&self) -> bool {
        <Scalar as Field>::is_zero(self).into()
    }

    fn is_odd(&self) -> bool {
        <Scalar as PrimeField>::is_odd(self).into()
    }

    fn to_bytes(&self) -> Vec<u8> {
        <Scalar as PrimeField>::to_repr(self).to_vec()
    }

    fn try_from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            error!("Expected 32 bytes for a P-256 scalar, got {}", bytes.len());
            return Err(InternalError::Serialization);
        }
        let repr = *FieldBytes::from_slice(bytes);
        Option::from(<Scalar as PrimeField>::from_repr(repr)).ok_or_else(|| {
            error!("Scalar encoding is not reduced modulo the P-256 order");
            InternalError::Serialization
        })
    }

    fn reduce_bytes(bytes: &[u8; 32]) -> Self {
        <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(bytes))
    }
}
