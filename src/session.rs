// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Runs a whole session inside one process.
//!
//! Real deployments put every role on its own device and move the messages
//! over a network. This driver plays every part itself, delivering each
//! message to every recipient in phase order.

use crate::{
    curve::CurveTrait,
    ecdsa::Signature,
    errors::{InternalError, Result},
    firewall::Firewall,
    parameters::ProtocolConfig,
    protocol::Identifier,
    signer::Signer,
};
use rand::{CryptoRng, RngCore};
use tracing::{error, info, instrument};

/// What a completed session produced.
#[derive(Debug, Clone)]
pub struct SessionOutput<C: CurveTrait> {
    /// The signer's presignature
    pub presignature: Signature<C>,
    /// The signature every firewall agreed on
    pub signature: Signature<C>,
}

/// Run one signer and `config.firewall_count()` firewalls through a full
/// session on `message`.
///
/// Fails if any role fails, or if the firewalls do not all return the same
/// sanitized signature.
#[cfg_attr(feature = "flame_it", flame)]
#[instrument(skip_all)]
pub fn run_session<C: CurveTrait, R: RngCore + CryptoRng>(
    rng: &mut R,
    config: &ProtocolConfig,
    private_key: C::Scalar,
    message: &[u8],
) -> Result<SessionOutput<C>> {
    let sid = Identifier::random(rng);
    let mut signer = Signer::<C>::new(config.clone(), sid, private_key)?;
    let public_key = signer.public_key();
    let mut firewalls = (0..config.firewall_count())
        .map(|index| Firewall::new(config.clone(), sid, index, public_key))
        .collect::<Result<Vec<_>>>()?;

    // Commit
    let commitments = firewalls
        .iter_mut()
        .map(|firewall| firewall.prepare_commitment(rng))
        .collect::<Result<Vec<_>>>()?;
    for commitment in &commitments {
        signer.receive_commitment(commitment)?;
        for firewall in firewalls.iter_mut() {
            if firewall.index() != commitment.sender() {
                firewall.receive_commitment(commitment)?;
            }
        }
    }

    // Open
    let openings = firewalls
        .iter_mut()
        .map(Firewall::open_commitment)
        .collect::<Result<Vec<_>>>()?;
    for opening in &openings {
        signer.receive_opening(opening)?;
        for firewall in firewalls.iter_mut() {
            if firewall.index() != opening.sender() {
                firewall.receive_opening(opening)?;
            }
        }
    }

    // Joint nonce
    let share = signer.generate_nonce_share(rng)?;
    signer.compute_private_nonce()?;
    for firewall in firewalls.iter_mut() {
        let _ = firewall.compute_public_nonce(&share)?;
    }

    // Sign and sanitize
    let presignature = signer.sign(message)?;
    let signatures = firewalls
        .iter_mut()
        .map(|firewall| firewall.sanitize(&presignature, message))
        .collect::<Result<Vec<_>>>()?;
    let signature = *signatures
        .first()
        .ok_or(InternalError::InternalInvariantFailed)?;
    if signatures.iter().any(|other| *other != signature) {
        error!("Firewalls of session {} disagree on the signature", sid);
        return Err(InternalError::InternalInvariantFailed);
    }
    info!("Session {} completed", sid);
    Ok(SessionOutput {
        presignature: presignature.signature(),
        signature,
    })
}
