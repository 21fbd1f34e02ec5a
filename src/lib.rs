// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Implementation of firewalled ECDSA signing
//!
//! An ECDSA signer chooses a fresh nonce for every signature, and the choice
//! is invisible to anyone checking the result. A compromised signing device
//! can abuse this freedom to leak its key, or any other data, through a
//! subliminal channel: every nonce it picks, and the choice between the two
//! valid forms `(r, s)` and `(r, n - s)` of each signature, can carry bits
//! to an observer.
//!
//! This library closes the channel by placing one or more [`Firewall`]s
//! between the [`Signer`] and the outside world:
//!
//! 1. Every firewall commits to a random nonce contribution `v`, and opens it
//!    only after seeing a commitment from every other firewall.
//! 2. Once every contribution is revealed, the signer adds its own share
//!    `Vp = vp·G`. The signing nonce is `x = vp + Σv`, and every firewall
//!    derives its public point `X = Vp + G·Σv` on its own.
//! 3. The signer signs with `x`. Each firewall checks that the presignature
//!    verifies and was made with `X`, then picks between `(r, s)` and
//!    `(r, n - s)` with a coin derived from `Σv`.
//!
//! As long as one firewall is honest, the published signature is
//! distributed independently of anything the signer can choose, and every
//! honest firewall outputs the same one.
//!
//! Roles work over any curve implementing [`CurveTrait`]; secp256k1
//! ([`Secp256k1`]) and NIST P-256 ([`Secp256r1`]) are provided.
//!
//! Note that this library only provides the low-level interfaces for each
//! role, notably without handling communication between devices. The
//! payload types in [`messages`] can be wrapped in a serialized
//! [`Message`] for transport, and [`run_session`] drives a whole session
//! inside one process.

#![warn(missing_docs)]
#![cfg_attr(feature = "flame_it", feature(proc_macro_hygiene))]
#[cfg(feature = "flame_it")]
extern crate flame;
#[cfg(feature = "flame_it")]
#[macro_use]
extern crate flamer;

#[macro_use]
pub mod errors;

mod commit;
pub mod curve;
pub mod ecdsa;
mod firewall;
mod k256;
pub mod messages;
mod p256;
mod parameters;
mod protocol;
mod session;
mod signer;
mod storage;
mod utils;

pub use commit::{Commitment, Opening};
pub use curve::{CurveTrait, ScalarTrait, Secp256k1, Secp256r1};
pub use ecdsa::Signature;
pub use firewall::{Firewall, FirewallStatus};
pub use messages::Message;
pub use parameters::{HashFunction, ProtocolConfig, DEFAULT_VERSION};
pub use protocol::{Identifier, PartyIndex};
pub use session::{run_session, SessionOutput};
pub use signer::{Signer, SignerStatus};
