// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Protocol parameter definitions.
//!
//! Every role is constructed from a [`ProtocolConfig`], which fixes the
//! protocol version bound into commitments, the hash function used to fold a
//! message into the ECDSA equation, and the number of firewalls taking part
//! in a session. The curve is chosen separately, as the generic parameter of
//! each role.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Protocol version tag bound into every commitment.
pub const DEFAULT_VERSION: &str = "2020-05-01/001";

/// Hash function used to map a message to a scalar.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashFunction {
    /// SHA-256
    Sha256,
    /// SHA-512, truncated to its leftmost 256 bits
    Sha512,
}

impl HashFunction {
    /// Hash `message`, keeping the leftmost 32 bytes of the digest.
    pub(crate) fn digest(&self, message: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            HashFunction::Sha256 => out.copy_from_slice(&Sha256::digest(message)),
            HashFunction::Sha512 => out.copy_from_slice(&Sha512::digest(message)[..32]),
        }
        out
    }
}

/// Parameters shared by every party of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    version: String,
    hash: HashFunction,
    firewall_count: usize,
}

impl ProtocolConfig {
    /// Build a configuration for a session with `firewall_count` firewalls.
    pub fn new(version: &str, hash: HashFunction, firewall_count: usize) -> Result<Self> {
        if version.is_empty() {
            return arg_err!("The protocol version must not be empty");
        }
        if firewall_count == 0 {
            return arg_err!("A session needs at least one firewall");
        }
        Ok(Self {
            version: version.to_string(),
            hash,
            firewall_count,
        })
    }

    /// Default version and hash function, with `firewall_count` firewalls.
    pub fn with_firewalls(firewall_count: usize) -> Result<Self> {
        Self::new(DEFAULT_VERSION, HashFunction::Sha256, firewall_count)
    }

    /// The protocol version tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The message hash function.
    pub fn hash(&self) -> HashFunction {
        self.hash
    }

    /// Number of firewalls in the session.
    pub fn firewall_count(&self) -> usize {
        self.firewall_count
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            hash: HashFunction::Sha256,
            firewall_count: 1,
        }
    }
}
