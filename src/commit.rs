// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Commit-reveal scheme for nonce contributions.
//!
//! A firewall first publishes a [`Commitment`] to its [`Opening`] `(v, r)`,
//! and only reveals the opening once it holds a commitment from every peer.
//! `v` is the firewall's contribution to the joint nonce; `r` only
//! randomizes the digest so that the commitment hides `v`.

use crate::{
    curve::{CurveTrait, ScalarTrait},
    errors::{InternalError, Result},
    protocol::{Identifier, PartyIndex},
    storage::PeerStore,
};
use merlin::Transcript;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::error;
use zeroize::Zeroize;

/// Digest binding a party to its opening.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    hash: [u8; 32],
}

impl Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Commitment")
            .field(&hex::encode(self.hash))
            .finish()
    }
}

/// A revealed `(v, r)` pair.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(bound = "")]
pub struct Opening<C: CurveTrait> {
    v: C::Scalar,
    r: C::Scalar,
}

impl<C: CurveTrait> Debug for Opening<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // An opening is secret until its owner reveals it.
        f.debug_struct("Opening")
            .field("v", &"[redacted]")
            .field("r", &"[redacted]")
            .finish()
    }
}

impl<C: CurveTrait> Zeroize for Opening<C> {
    fn zeroize(&mut self) {
        self.v.zeroize();
        self.r.zeroize();
    }
}

/// Everything a commitment digest is bound to.
#[derive(Serialize)]
#[serde(bound = "")]
struct CommitmentInput<'a, C: CurveTrait> {
    curve: &'static str,
    version: &'a str,
    sid: Identifier,
    sender: PartyIndex,
    v: &'a C::Scalar,
    r: &'a C::Scalar,
}

impl<C: CurveTrait> Opening<C> {
    /// Draws `v` and `r` uniformly from `[0, n)`.
    pub(crate) fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            v: C::Scalar::random(rng),
            r: C::Scalar::random(rng),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(v: C::Scalar, r: C::Scalar) -> Self {
        Self { v, r }
    }

    /// The nonce contribution.
    pub fn v(&self) -> C::Scalar {
        self.v
    }

    /// The blinding factor.
    pub fn r(&self) -> C::Scalar {
        self.r
    }

    /// Computes the commitment to this opening on behalf of `sender` in
    /// session `sid`.
    pub(crate) fn commit(
        &self,
        version: &str,
        sid: Identifier,
        sender: PartyIndex,
    ) -> Result<Commitment> {
        let input = CommitmentInput::<C> {
            curve: C::NAME,
            version,
            sid,
            sender,
            v: &self.v,
            r: &self.r,
        };
        let mut transcript = Transcript::new(b"fecdsa commitment");
        transcript.append_message(b"decom", &serialize!(&input)?);
        let mut hash = [0u8; 32];
        transcript.challenge_bytes(b"hashing commitment", &mut hash);
        Ok(Commitment { hash })
    }

    /// Checks that this opening matches the commitment `com` previously
    /// received from `sender`.
    pub(crate) fn verify(
        &self,
        version: &str,
        sid: Identifier,
        sender: PartyIndex,
        com: &Commitment,
    ) -> Result<()> {
        let rebuilt_com = self.commit(version, sid, sender)?;
        if rebuilt_com != *com {
            error!(
                "Opening from party {} does not match its commitment {:?}",
                sender, com
            );
            return Err(InternalError::CommitmentMismatch(sender));
        }
        Ok(())
    }
}

/// Verifies the opening of every party except `self_index` against its
/// commitment.
///
/// The caller's own opening is skipped since it was never received. A missing
/// entry is a [`ProtocolViolation`](InternalError::ProtocolViolation); any
/// mismatch aborts with [`CommitmentMismatch`](InternalError::CommitmentMismatch).
pub(crate) fn check_all_openings<C: CurveTrait>(
    version: &str,
    sid: Identifier,
    openings: &PeerStore<Opening<C>>,
    commitments: &PeerStore<Commitment>,
    self_index: Option<PartyIndex>,
) -> Result<()> {
    for index in 0..commitments.capacity() {
        if Some(index) == self_index {
            continue;
        }
        let (opening, com) = match (openings.get(index), commitments.get(index)) {
            (Some(opening), Some(com)) => (opening, com),
            _ => {
                error!("Missing commitment or opening for party {}", index);
                return bail!("No commitment and opening on file for party {}", index);
            }
        };
        opening.verify(version, sid, index, com)?;
    }
    Ok(())
}

/// Sums `field` over every stored opening.
///
/// Addition in the scalar field is commutative, so the result does not depend
/// on the order in which openings arrived.
pub(crate) fn sum_field<C, F>(openings: &PeerStore<Opening<C>>, field: F) -> C::Scalar
where
    C: CurveTrait,
    F: Fn(&Opening<C>) -> C::Scalar,
{
    openings
        .iter()
        .fold(C::Scalar::ZERO, |acc, (_, opening)| acc + field(opening))
}

/// Parity of the integer sum of `values`, each taken as its canonical
/// representative in `[0, n)`.
///
/// `n` is odd, so every time the running sum wraps past `n` the parity of the
/// reduced sum flips. A wrap shows up as the reduced sum dropping below the
/// previous one.
pub(crate) fn integer_sum_is_odd<S: ScalarTrait>(values: impl IntoIterator<Item = S>) -> bool {
    let (reduced, odd_wraps) = values
        .into_iter()
        .fold((S::ZERO, false), |(acc, odd_wraps), value| {
            let next = acc + value;
            let wrapped = next.to_bytes() < acc.to_bytes();
            (next, odd_wraps ^ wrapped)
        });
    reduced.is_odd() ^ odd_wraps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        curve::{Secp256k1, Secp256r1},
        parameters::DEFAULT_VERSION,
        utils::testing::init_testing,
    };

    type Scalar = <Secp256k1 as CurveTrait>::Scalar;

    #[test]
    fn opening_verifies_against_its_commitment() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let opening = Opening::<Secp256k1>::random(&mut rng);
        let com = opening.commit(DEFAULT_VERSION, sid, 2)?;
        opening.verify(DEFAULT_VERSION, sid, 2, &com)?;
        // commitments are deterministic
        assert_eq!(com, opening.commit(DEFAULT_VERSION, sid, 2)?);
        Ok(())
    }

    #[test]
    fn commitment_binds_every_input() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let opening = Opening::<Secp256k1>::random(&mut rng);
        let com = opening.commit(DEFAULT_VERSION, sid, 0)?;

        let tweaked_v = Opening::<Secp256k1>::from_parts(opening.v() + Scalar::ONE, opening.r());
        let tweaked_r = Opening::<Secp256k1>::from_parts(opening.v(), opening.r() + Scalar::ONE);
        for bad in [&tweaked_v, &tweaked_r] {
            assert_eq!(
                bad.verify(DEFAULT_VERSION, sid, 0, &com),
                Err(InternalError::CommitmentMismatch(0))
            );
        }

        // replayed into another session, from another sender, or under another version
        let other_sid = Identifier::random(&mut rng);
        assert!(opening.verify(DEFAULT_VERSION, other_sid, 0, &com).is_err());
        assert!(opening.verify(DEFAULT_VERSION, sid, 1, &com).is_err());
        assert!(opening.verify("2020-05-01/002", sid, 0, &com).is_err());
        Ok(())
    }

    #[test]
    fn commitment_is_bound_to_the_curve() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let k1 = Opening::<Secp256k1>::from_parts(Scalar::ONE, Scalar::ONE);
        let r1 = Opening::<Secp256r1>::from_parts(
            <Secp256r1 as CurveTrait>::Scalar::ONE,
            <Secp256r1 as CurveTrait>::Scalar::ONE,
        );
        assert_ne!(
            k1.commit(DEFAULT_VERSION, sid, 0)?,
            r1.commit(DEFAULT_VERSION, sid, 0)?
        );
        Ok(())
    }

    fn populated(
        rng: &mut (impl RngCore + CryptoRng),
        sid: Identifier,
        parties: usize,
    ) -> Result<(PeerStore<Opening<Secp256k1>>, PeerStore<Commitment>)> {
        let mut openings = PeerStore::new(parties);
        let mut commitments = PeerStore::new(parties);
        for index in 0..parties {
            let opening = Opening::random(rng);
            let _ = commitments.insert(index, opening.commit(DEFAULT_VERSION, sid, index)?)?;
            let _ = openings.insert(index, opening)?;
        }
        Ok((openings, commitments))
    }

    #[test]
    fn check_all_openings_accepts_honest_parties() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let (openings, commitments) = populated(&mut rng, sid, 4)?;
        check_all_openings(DEFAULT_VERSION, sid, &openings, &commitments, None)
    }

    #[test]
    fn check_all_openings_skips_own_index() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let (full, commitments) = populated(&mut rng, sid, 3)?;

        // party 1's view: it never receives its own opening
        let mut openings = PeerStore::new(3);
        for (index, opening) in full.iter() {
            if index != 1 {
                let _ = openings.insert(index, opening.clone())?;
            }
        }
        check_all_openings(DEFAULT_VERSION, sid, &openings, &commitments, Some(1))?;
        assert!(matches!(
            check_all_openings(DEFAULT_VERSION, sid, &openings, &commitments, None),
            Err(InternalError::ProtocolViolation(_))
        ));
        Ok(())
    }

    #[test]
    fn check_all_openings_names_the_cheater() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let (honest, commitments) = populated(&mut rng, sid, 3)?;

        let mut openings = PeerStore::new(3);
        for (index, opening) in honest.iter() {
            let opening = if index == 2 {
                Opening::from_parts(Scalar::random(&mut rng), opening.r())
            } else {
                opening.clone()
            };
            let _ = openings.insert(index, opening)?;
        }
        assert_eq!(
            check_all_openings(DEFAULT_VERSION, sid, &openings, &commitments, None),
            Err(InternalError::CommitmentMismatch(2))
        );
        Ok(())
    }

    #[test]
    fn sum_field_adds_every_contribution() -> Result<()> {
        let mut rng = init_testing();
        let values: Vec<Scalar> = (0..4).map(|_| Scalar::random(&mut rng)).collect();
        let expected = values.iter().fold(Scalar::ZERO, |acc, v| acc + *v);

        // insert out of order
        let mut openings = PeerStore::new(4);
        for index in [3, 0, 2, 1] {
            let opening = Opening::<Secp256k1>::from_parts(values[index], Scalar::ONE);
            let _ = openings.insert(index, opening)?;
        }
        assert_eq!(sum_field(&openings, Opening::v), expected);
        assert_eq!(
            sum_field(&PeerStore::<Opening<Secp256k1>>::new(2), Opening::v),
            Scalar::ZERO
        );
        Ok(())
    }

    #[test]
    fn parity_is_taken_over_the_integer_sum() {
        let minus_one = -Scalar::ONE;
        let two = Scalar::ONE + Scalar::ONE;
        // (n - 1) + 2 = n + 1 is even, although it reduces to 1
        assert!(ScalarTrait::is_odd(&(minus_one + two)));
        assert!(!integer_sum_is_odd([minus_one, two]));
        assert!(!integer_sum_is_odd([two, minus_one]));

        // no wrap: 1 + 2 = 3
        assert!(integer_sum_is_odd([Scalar::ONE, two]));
        // two wraps: 3(n - 1) = 3n - 3 is even
        assert!(!integer_sum_is_odd([minus_one, minus_one, minus_one]));
        // zero contributions never wrap
        assert!(!integer_sum_is_odd([Scalar::ZERO, minus_one, Scalar::ZERO]));
        assert!(!integer_sum_is_odd(Vec::<Scalar>::new()));
    }

    #[test]
    fn parity_does_not_depend_on_order() {
        let mut rng = init_testing();
        let mut values: Vec<Scalar> = (0..5).map(|_| Scalar::random(&mut rng)).collect();
        let forward = integer_sum_is_odd(values.iter().copied());
        values.reverse();
        assert_eq!(integer_sum_is_odd(values.iter().copied()), forward);
        values.swap(0, 3);
        assert_eq!(integer_sum_is_odd(values), forward);
    }
}
