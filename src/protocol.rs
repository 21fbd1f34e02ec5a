// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Session identifiers and party indexing.
//!
//! A session consists of one signer and `N` firewalls. Firewalls are
//! addressed by their index in `0..N`; the signer has no index, since no
//! other party ever stores an artifact on its behalf in an indexed slot.

use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Index of a firewall within a session, in `0..firewall_count`.
pub type PartyIndex = usize;

/// A session identifier.
///
/// Every message carries the identifier of the session it belongs to, and
/// commitments are bound to it, so artifacts from unrelated sessions cannot
/// be mixed.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(u128);

impl Identifier {
    /// Produces a random [`Identifier`]
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(rng.gen())
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Id({})", hex::encode(&self.0.to_be_bytes()[..4]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::init_testing;

    #[test]
    fn random_identifiers_differ() {
        let mut rng = init_testing();
        let a = Identifier::random(&mut rng);
        let b = Identifier::random(&mut rng);
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("Id("));
    }
}
