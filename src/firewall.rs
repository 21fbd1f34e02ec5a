// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The firewall role.
//!
//! Each firewall commits to a random contribution `v`, opens it once every
//! peer has committed, and derives the joint nonce point
//! `X = Vp + G·(Σv)` without ever learning the joint private nonce. When the
//! signer's presignature arrives, the firewall checks that it was made with
//! `X` and then re-randomizes its malleable form with a coin drawn from all
//! revealed contributions. Every honest firewall ends up with the same
//! signature, and the signer has no say in which one it is.

use crate::{
    commit::{check_all_openings, integer_sum_is_odd, sum_field, Commitment, Opening},
    curve::{CurveTrait, ScalarTrait},
    ecdsa::{recover_nonce_point, verify, Signature},
    errors::{InternalError, Result},
    messages::{CommitmentMessage, NonceShareMessage, OpeningMessage, PresignatureMessage},
    parameters::ProtocolConfig,
    protocol::{Identifier, PartyIndex},
    storage::{Insertion, PeerStore},
    utils::point_hex,
};
use rand::{CryptoRng, RngCore};
use tracing::{debug, error, info, instrument};
use zeroize::Zeroize;

/// Progress of a [`Firewall`] through a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FirewallStatus {
    /// Nothing sent yet
    Init,
    /// Own commitment sent
    CommitSent,
    /// Holding a commitment from every party
    AllCommitsReceived,
    /// Own opening sent
    Opened,
    /// Holding an opening from every peer
    AllOpeningsReceived,
    /// The joint nonce point `X` is known
    PublicNonceComputed,
    /// The sanitized signature was produced
    Sanitized,
    /// A check failed; the session must be discarded
    Aborted,
}

/// An auditing party that shapes the nonce and sanitizes the signature.
pub struct Firewall<C: CurveTrait> {
    config: ProtocolConfig,
    sid: Identifier,
    index: PartyIndex,
    /// The signer's public key `Q`
    public_key: C,
    /// Own `(v, r)`
    opening: Option<Opening<C>>,
    /// Commitments of every party, own included
    commitments: PeerStore<Commitment>,
    /// Openings of every peer; own slot stays empty
    openings: PeerStore<Opening<C>>,
    joint_nonce_point: Option<C>,
    /// Parity of `own_v + Σ peer_v` taken over the integers
    coin: Option<bool>,
    status: FirewallStatus,
}

impl<C: CurveTrait> std::fmt::Debug for Firewall<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firewall")
            .field("sid", &self.sid)
            .field("index", &self.index)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<C: CurveTrait> Firewall<C> {
    /// Create firewall `index` of session `sid`, auditing the signer whose
    /// public key is `public_key`.
    pub fn new(
        config: ProtocolConfig,
        sid: Identifier,
        index: PartyIndex,
        public_key: C,
    ) -> Result<Self> {
        let firewall_count = config.firewall_count();
        if index >= firewall_count {
            return arg_err!(format!(
                "Firewall index {index} is out of range for {firewall_count} firewalls"
            ));
        }
        if public_key.is_identity() {
            error!("The signer's public key is the identity point");
            return Err(InternalError::InvalidPoint);
        }
        Ok(Self {
            config,
            sid,
            index,
            public_key,
            opening: None,
            commitments: PeerStore::new(firewall_count),
            openings: PeerStore::new(firewall_count),
            joint_nonce_point: None,
            coin: None,
            status: FirewallStatus::Init,
        })
    }

    /// Like [`Firewall::new`], with the public key given as a SEC1 encoding.
    pub fn from_encoded_key(
        config: ProtocolConfig,
        sid: Identifier,
        index: PartyIndex,
        public_key: &[u8],
    ) -> Result<Self> {
        Self::new(config, sid, index, C::try_from_bytes(public_key)?)
    }

    /// The session this firewall takes part in.
    pub fn id(&self) -> Identifier {
        self.sid
    }

    /// This firewall's index.
    pub fn index(&self) -> PartyIndex {
        self.index
    }

    /// Current position in the session.
    pub fn status(&self) -> FirewallStatus {
        self.status
    }

    /// The joint nonce point `X`, once it has been computed.
    pub fn joint_nonce_point(&self) -> Option<C> {
        self.joint_nonce_point
    }

    /// Draw `(v, r)` and publish the commitment to it.
    #[cfg_attr(feature = "flame_it", flame("firewall"))]
    #[instrument(skip_all)]
    pub fn prepare_commitment<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<CommitmentMessage> {
        self.guarded(|firewall| {
            firewall.require_status(&[FirewallStatus::Init], "commit")?;
            let opening = Opening::random(rng);
            let commitment =
                opening.commit(firewall.config.version(), firewall.sid, firewall.index)?;
            let _ = firewall.commitments.insert(firewall.index, commitment)?;
            firewall.opening = Some(opening);
            firewall.status = FirewallStatus::CommitSent;
            info!("Firewall {} committed: {:?}", firewall.index, commitment);
            firewall.update_collection_status();
            Ok(CommitmentMessage {
                sid: firewall.sid,
                sender: firewall.index,
                commitment,
            })
        })
    }

    /// Store a peer's commitment. These may arrive before this firewall has
    /// committed itself.
    #[instrument(skip_all)]
    pub fn receive_commitment(&mut self, message: &CommitmentMessage) -> Result<()> {
        self.guarded(|firewall| {
            firewall.require_status(
                &[
                    FirewallStatus::Init,
                    FirewallStatus::CommitSent,
                    FirewallStatus::AllCommitsReceived,
                    FirewallStatus::Opened,
                    FirewallStatus::AllOpeningsReceived,
                ],
                "receive a commitment",
            )?;
            firewall.check_session(message.sid)?;
            firewall.check_peer(message.sender)?;
            if firewall.commitments.insert(message.sender, message.commitment)?
                == Insertion::Stored
            {
                debug!(
                    "Firewall {} stored commitment from firewall {}",
                    firewall.index, message.sender
                );
            }
            firewall.update_collection_status();
            Ok(())
        })
    }

    /// Reveal own `(v, r)`. Only allowed once every peer has committed.
    #[instrument(skip_all)]
    pub fn open_commitment(&mut self) -> Result<OpeningMessage<C>> {
        self.guarded(|firewall| {
            firewall.require_status(&[FirewallStatus::AllCommitsReceived], "open")?;
            let message = firewall.own_opening_message()?;
            firewall.status = FirewallStatus::Opened;
            info!("Firewall {} opened its commitment", firewall.index);
            firewall.update_collection_status();
            Ok(message)
        })
    }

    /// Store a peer's opening. The sender's commitment must already be on
    /// file, and this firewall must have committed.
    #[instrument(skip_all)]
    pub fn receive_opening(&mut self, message: &OpeningMessage<C>) -> Result<()> {
        self.guarded(|firewall| {
            firewall.require_status(
                &[
                    FirewallStatus::CommitSent,
                    FirewallStatus::AllCommitsReceived,
                    FirewallStatus::Opened,
                    FirewallStatus::AllOpeningsReceived,
                ],
                "receive an opening",
            )?;
            firewall.check_session(message.sid)?;
            let sender = message.sender;
            firewall.check_peer(sender)?;
            if !firewall.commitments.contains(sender) {
                error!(
                    "Firewall {} got an opening from {} before its commitment",
                    firewall.index, sender
                );
                return bail!("No commitment on file for firewall {}", sender);
            }
            if firewall.openings.insert(sender, message.opening.clone())? == Insertion::Stored {
                debug!(
                    "Firewall {} stored opening from firewall {}",
                    firewall.index, sender
                );
            }
            firewall.update_collection_status();
            Ok(())
        })
    }

    /// Validate the signer's nonce share, check every peer opening and
    /// derive `X = Vp + G·(own_v + Σ peer_v)`.
    ///
    /// Returns this firewall's own opening again, so the caller can relay it
    /// alongside the nonce share.
    #[cfg_attr(feature = "flame_it", flame("firewall"))]
    #[instrument(skip_all)]
    pub fn compute_public_nonce(&mut self, share: &NonceShareMessage) -> Result<OpeningMessage<C>> {
        self.guarded(|firewall| {
            firewall.require_status(
                &[FirewallStatus::AllOpeningsReceived],
                "compute the public nonce",
            )?;
            firewall.check_session(share.sid)?;
            let vp_point = C::try_from_bytes(&share.point).map_err(|e| {
                error!("Firewall {} got a nonce share off the curve", firewall.index);
                e
            })?;
            check_all_openings(
                firewall.config.version(),
                firewall.sid,
                &firewall.openings,
                &firewall.commitments,
                Some(firewall.index),
            )?;
            let own_v = firewall
                .opening
                .as_ref()
                .ok_or(InternalError::InternalInvariantFailed)?
                .v();
            let total = own_v + sum_field(&firewall.openings, Opening::v);
            let point = vp_point + C::scale_generator(&total);
            let peer_vs = firewall.openings.iter().map(|(_, opening)| opening.v());
            firewall.joint_nonce_point = Some(point);
            firewall.coin = Some(integer_sum_is_odd(std::iter::once(own_v).chain(peer_vs)));
            firewall.status = FirewallStatus::PublicNonceComputed;
            info!(
                "Firewall {} derived joint nonce point {}",
                firewall.index,
                point_hex(&point)
            );
            firewall.own_opening_message()
        })
    }

    /// Check the presignature and emit its sanitized form.
    ///
    /// The presignature must verify under `Q`, and the nonce point it
    /// implies must be `±X`. Of the two forms `(r, s)` and `(r, n - s)`, the
    /// one whose implied point is `+X` is the base form; the coin keeps it
    /// when odd and swaps in the other form when even.
    #[cfg_attr(feature = "flame_it", flame("firewall"))]
    #[instrument(skip_all)]
    pub fn sanitize(
        &mut self,
        presignature: &PresignatureMessage<C>,
        message: &[u8],
    ) -> Result<Signature<C>> {
        self.guarded(|firewall| {
            firewall.require_status(&[FirewallStatus::PublicNonceComputed], "sanitize")?;
            firewall.check_session(presignature.sid)?;
            let hash = firewall.config.hash();
            let public_key = firewall.public_key;
            let signature = presignature.signature;

            verify(hash, &public_key, message, &signature).map_err(|e| {
                error!(
                    "Firewall {} got a presignature that does not verify",
                    firewall.index
                );
                e
            })?;

            let joint_nonce_point = firewall
                .joint_nonce_point
                .ok_or(InternalError::InternalInvariantFailed)?;
            let implied = recover_nonce_point(hash, &public_key, message, &signature)?;
            let base = if implied == joint_nonce_point {
                signature
            } else if implied == -joint_nonce_point {
                signature.complement()
            } else {
                error!(
                    "Firewall {}: presignature nonce {} is not the joint nonce {}",
                    firewall.index,
                    point_hex(&implied),
                    point_hex(&joint_nonce_point)
                );
                return Err(InternalError::NonceMismatch);
            };

            let other = base.complement();
            verify(hash, &public_key, message, &other)?;
            let coin = firewall.coin.ok_or(InternalError::InternalInvariantFailed)?;
            let chosen = if coin { base } else { other };
            verify(hash, &public_key, message, &chosen)?;

            firewall.status = FirewallStatus::Sanitized;
            info!("Firewall {} sanitized signature {:?}", firewall.index, chosen);
            Ok(chosen)
        })
    }

    fn own_opening_message(&self) -> Result<OpeningMessage<C>> {
        let opening = self
            .opening
            .clone()
            .ok_or(InternalError::InternalInvariantFailed)?;
        Ok(OpeningMessage {
            sid: self.sid,
            sender: self.index,
            opening,
        })
    }

    /// Runs `operation`, aborting the session if it fails.
    fn guarded<T>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.status == FirewallStatus::Aborted {
            error!("Firewall {} was already aborted", self.index);
            return bail!("Session {} was aborted", self.sid);
        }
        let result = operation(self);
        if let Err(e) = &result {
            error!("Firewall {} aborting session {}: {}", self.index, self.sid, e);
            self.abort();
        }
        result
    }

    fn require_status(&self, allowed: &[FirewallStatus], operation: &str) -> Result<()> {
        if !allowed.contains(&self.status) {
            error!(
                "Firewall {} cannot {} while {:?}",
                self.index, operation, self.status
            );
            return bail!("Cannot {} while {:?}", operation, self.status);
        }
        Ok(())
    }

    fn check_session(&self, sid: Identifier) -> Result<()> {
        if sid != self.sid {
            error!(
                "Firewall {} of session {} got a message for {}",
                self.index, self.sid, sid
            );
            return Err(InternalError::WrongSession);
        }
        Ok(())
    }

    fn check_peer(&self, sender: PartyIndex) -> Result<()> {
        if sender == self.index {
            error!("Firewall {} got a message under its own index", self.index);
            return bail!("Peer message claims this firewall's own index {}", sender);
        }
        if sender >= self.commitments.capacity() {
            error!("Firewall {} got a message from unknown party {}", self.index, sender);
            return Err(InternalError::UnknownParty(sender));
        }
        Ok(())
    }

    fn update_collection_status(&mut self) {
        match self.status {
            FirewallStatus::CommitSent if self.commitments.is_complete_except(None) => {
                info!("Firewall {} received every commitment", self.index);
                self.status = FirewallStatus::AllCommitsReceived;
            }
            FirewallStatus::Opened if self.openings.is_complete_except(Some(self.index)) => {
                info!("Firewall {} received every opening", self.index);
                self.status = FirewallStatus::AllOpeningsReceived;
            }
            _ => {}
        }
    }

    fn abort(&mut self) {
        self.status = FirewallStatus::Aborted;
        self.opening.zeroize();
    }
}

impl<C: CurveTrait> Drop for Firewall<C> {
    fn drop(&mut self) {
        self.opening.zeroize();
    }
}
