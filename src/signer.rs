// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! The signer role.
//!
//! The signer holds the ECDSA private key but is not trusted to pick its
//! nonce. It collects a commitment and then an opening from every firewall,
//! contributes its own nonce share `Vp = vp·G`, and signs with the joint
//! nonce `x = vp + Σv`. The firewalls check that `x` was really used before
//! releasing the signature.

use crate::{
    commit::{check_all_openings, sum_field, Commitment, Opening},
    curve::{CurveTrait, ScalarTrait},
    ecdsa::sign_with_nonce,
    errors::{InternalError, Result},
    messages::{CommitmentMessage, NonceShareMessage, OpeningMessage, PresignatureMessage},
    parameters::ProtocolConfig,
    protocol::Identifier,
    storage::{Insertion, PeerStore},
    utils::point_hex,
};
use rand::{CryptoRng, RngCore};
use tracing::{debug, error, info, instrument};
use zeroize::Zeroize;

/// Progress of a [`Signer`] through a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignerStatus {
    /// Waiting for a commitment from every firewall
    AwaitingCommitments,
    /// Every commitment is on file; waiting for the openings
    AwaitingOpenings,
    /// Every commitment and opening is on file
    AllOpeningsReceived,
    /// The nonce share `Vp` was produced
    NonceGenerated,
    /// The joint nonce `x` is known
    PrivateNonceComputed,
    /// The presignature was produced
    Signed,
    /// A check failed; the session must be discarded
    Aborted,
}

/// The party holding the private key.
pub struct Signer<C: CurveTrait> {
    config: ProtocolConfig,
    sid: Identifier,
    private_key: C::Scalar,
    public_key: C,
    commitments: PeerStore<Commitment>,
    openings: PeerStore<Opening<C>>,
    /// `vp`
    nonce_share: Option<C::Scalar>,
    /// `x`
    joint_nonce: Option<C::Scalar>,
    /// `bX = xG`
    joint_nonce_point: Option<C>,
    status: SignerStatus,
}

impl<C: CurveTrait> std::fmt::Debug for Signer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("sid", &self.sid)
            .field("public_key", &point_hex(&self.public_key))
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<C: CurveTrait> Signer<C> {
    /// Create a signer for session `sid`.
    pub fn new(config: ProtocolConfig, sid: Identifier, private_key: C::Scalar) -> Result<Self> {
        if private_key.is_zero() {
            return arg_err!("The private key must be non-zero");
        }
        let firewall_count = config.firewall_count();
        Ok(Self {
            config,
            sid,
            private_key,
            public_key: C::scale_generator(&private_key),
            commitments: PeerStore::new(firewall_count),
            openings: PeerStore::new(firewall_count),
            nonce_share: None,
            joint_nonce: None,
            joint_nonce_point: None,
            status: SignerStatus::AwaitingCommitments,
        })
    }

    /// The session this signer takes part in.
    pub fn id(&self) -> Identifier {
        self.sid
    }

    /// The public key `Q` the firewalls verify against.
    pub fn public_key(&self) -> C {
        self.public_key
    }

    /// Current position in the session.
    pub fn status(&self) -> SignerStatus {
        self.status
    }

    /// The joint nonce point `bX`, once it has been computed.
    pub fn joint_nonce_point(&self) -> Option<C> {
        self.joint_nonce_point
    }

    /// Store a firewall's commitment.
    ///
    /// Re-delivering an identical commitment is a no-op.
    #[instrument(skip_all)]
    pub fn receive_commitment(&mut self, message: &CommitmentMessage) -> Result<()> {
        self.guarded(|signer| {
            signer.require_status(
                &[
                    SignerStatus::AwaitingCommitments,
                    SignerStatus::AwaitingOpenings,
                    SignerStatus::AllOpeningsReceived,
                ],
                "receive a commitment",
            )?;
            signer.check_session(message.sid)?;
            if signer.commitments.insert(message.sender, message.commitment)?
                == Insertion::Stored
            {
                debug!("Signer stored commitment from firewall {}", message.sender);
            }
            signer.update_collection_status();
            Ok(())
        })
    }

    /// Store a firewall's opening.
    ///
    /// Openings are checked against their commitments in
    /// [`Signer::compute_private_nonce`], not here.
    #[instrument(skip_all)]
    pub fn receive_opening(&mut self, message: &OpeningMessage<C>) -> Result<()> {
        self.guarded(|signer| {
            signer.require_status(
                &[
                    SignerStatus::AwaitingCommitments,
                    SignerStatus::AwaitingOpenings,
                    SignerStatus::AllOpeningsReceived,
                ],
                "receive an opening",
            )?;
            signer.check_session(message.sid)?;
            let sender = message.sender;
            if sender >= signer.commitments.capacity() {
                error!("Opening from unknown firewall {}", sender);
                return Err(InternalError::UnknownParty(sender));
            }
            if !signer.commitments.contains(sender) {
                error!("Firewall {} opened before its commitment arrived", sender);
                return bail!("No commitment on file for firewall {}", sender);
            }
            if signer.openings.insert(sender, message.opening.clone())? == Insertion::Stored {
                debug!("Signer stored opening from firewall {}", sender);
            }
            signer.update_collection_status();
            Ok(())
        })
    }

    /// Draw `vp` and publish `Vp = vp·G`.
    ///
    /// Only allowed once every firewall has opened, so `vp` cannot depend
    /// on anything the firewalls have yet to reveal.
    ///
    /// `vp` is drawn from `[1, n)` rather than `[0, n)`, so `Vp` is never
    /// the identity and always has a SEC1 encoding.
    #[cfg_attr(feature = "flame_it", flame("signer"))]
    #[instrument(skip_all)]
    pub fn generate_nonce_share<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Result<NonceShareMessage> {
        self.guarded(|signer| {
            signer.require_status(
                &[SignerStatus::AllOpeningsReceived],
                "generate a nonce share",
            )?;
            let vp = C::Scalar::random_nonzero(rng);
            let share = C::scale_generator(&vp);
            signer.nonce_share = Some(vp);
            signer.status = SignerStatus::NonceGenerated;
            info!("Signer published nonce share {}", point_hex(&share));
            Ok(NonceShareMessage {
                sid: signer.sid,
                point: share.to_bytes(),
            })
        })
    }

    /// Check every opening and derive the joint nonce `x = vp + Σv`.
    #[cfg_attr(feature = "flame_it", flame("signer"))]
    #[instrument(skip_all)]
    pub fn compute_private_nonce(&mut self) -> Result<()> {
        self.guarded(|signer| {
            signer.require_status(&[SignerStatus::NonceGenerated], "compute the private nonce")?;
            check_all_openings(
                signer.config.version(),
                signer.sid,
                &signer.openings,
                &signer.commitments,
                None,
            )?;
            let mut vp = signer
                .nonce_share
                .take()
                .ok_or(InternalError::InternalInvariantFailed)?;
            let x = vp + sum_field(&signer.openings, Opening::v);
            vp.zeroize();
            let point = C::scale_generator(&x);
            signer.joint_nonce = Some(x);
            signer.joint_nonce_point = Some(point);
            signer.status = SignerStatus::PrivateNonceComputed;
            info!("Signer derived joint nonce point {}", point_hex(&point));
            Ok(())
        })
    }

    /// Produce the presignature on `message` under the joint nonce.
    ///
    /// Can only succeed once: a second signature under the same nonce would
    /// reveal the private key.
    #[cfg_attr(feature = "flame_it", flame("signer"))]
    #[instrument(skip_all)]
    pub fn sign(&mut self, message: &[u8]) -> Result<PresignatureMessage<C>> {
        self.guarded(|signer| {
            signer.require_status(&[SignerStatus::PrivateNonceComputed], "sign")?;
            let mut x = signer
                .joint_nonce
                .take()
                .ok_or(InternalError::InternalInvariantFailed)?;
            let point = signer
                .joint_nonce_point
                .ok_or(InternalError::InternalInvariantFailed)?;
            let signature = sign_with_nonce(
                signer.config.hash(),
                &signer.private_key,
                message,
                &x,
                &point,
            );
            x.zeroize();
            let signature = signature?;
            signer.status = SignerStatus::Signed;
            info!("Signer produced presignature {:?}", signature);
            Ok(PresignatureMessage {
                sid: signer.sid,
                signature,
            })
        })
    }

    /// Runs `operation`, aborting the session if it fails.
    fn guarded<T>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.status == SignerStatus::Aborted {
            error!("Signer for session {} was already aborted", self.sid);
            return bail!("Session {} was aborted", self.sid);
        }
        let result = operation(self);
        if let Err(e) = &result {
            error!("Signer aborting session {}: {}", self.sid, e);
            self.abort();
        }
        result
    }

    fn require_status(&self, allowed: &[SignerStatus], operation: &str) -> Result<()> {
        if !allowed.contains(&self.status) {
            error!("Signer cannot {} while {:?}", operation, self.status);
            return bail!("Cannot {} while {:?}", operation, self.status);
        }
        Ok(())
    }

    fn check_session(&self, sid: Identifier) -> Result<()> {
        if sid != self.sid {
            error!("Signer for session {} got a message for {}", self.sid, sid);
            return Err(InternalError::WrongSession);
        }
        Ok(())
    }

    fn update_collection_status(&mut self) {
        if !matches!(
            self.status,
            SignerStatus::AwaitingCommitments | SignerStatus::AwaitingOpenings
        ) || !self.commitments.is_complete_except(None)
        {
            return;
        }
        if self.openings.is_complete_except(None) {
            info!("Signer received every opening");
            self.status = SignerStatus::AllOpeningsReceived;
        } else if self.status == SignerStatus::AwaitingCommitments {
            info!("Signer received every commitment");
            self.status = SignerStatus::AwaitingOpenings;
        }
    }

    fn abort(&mut self) {
        self.status = SignerStatus::Aborted;
        self.wipe();
    }

    fn wipe(&mut self) {
        self.private_key.zeroize();
        self.nonce_share.zeroize();
        self.joint_nonce.zeroize();
    }
}

impl<C: CurveTrait> Drop for Signer<C> {
    fn drop(&mut self) {
        self.wipe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{curve::TestCurve, ecdsa::generate_key, utils::testing::init_testing};
    use rand::rngs::StdRng;

    type Scalar = <TestCurve as CurveTrait>::Scalar;
    type FirewallMessages = Vec<(CommitmentMessage, OpeningMessage<TestCurve>)>;

    /// Commitment and opening messages as an honest firewall would produce.
    fn firewall_messages(
        rng: &mut StdRng,
        config: &ProtocolConfig,
        sid: Identifier,
    ) -> Result<FirewallMessages> {
        (0..config.firewall_count())
            .map(|sender| {
                let opening = Opening::<TestCurve>::random(rng);
                let commitment = opening.commit(config.version(), sid, sender)?;
                Ok((
                    CommitmentMessage {
                        sid,
                        sender,
                        commitment,
                    },
                    OpeningMessage {
                        sid,
                        sender,
                        opening,
                    },
                ))
            })
            .collect()
    }

    fn setup(firewalls: usize) -> Result<(StdRng, Signer<TestCurve>, FirewallMessages)> {
        let mut rng = init_testing();
        let config = ProtocolConfig::with_firewalls(firewalls)?;
        let sid = Identifier::random(&mut rng);
        let (private_key, _) = generate_key::<TestCurve, _>(&mut rng);
        let messages = firewall_messages(&mut rng, &config, sid)?;
        Ok((rng, Signer::new(config, sid, private_key)?, messages))
    }

    #[test]
    fn walks_through_every_status() -> Result<()> {
        let (mut rng, mut signer, messages) = setup(2)?;
        assert_eq!(signer.status(), SignerStatus::AwaitingCommitments);
        for (com, _) in &messages {
            signer.receive_commitment(com)?;
        }
        assert_eq!(signer.status(), SignerStatus::AwaitingOpenings);
        for (_, opening) in &messages {
            signer.receive_opening(opening)?;
        }
        assert_eq!(signer.status(), SignerStatus::AllOpeningsReceived);
        let share = signer.generate_nonce_share(&mut rng)?;
        assert_eq!(signer.status(), SignerStatus::NonceGenerated);
        signer.compute_private_nonce()?;
        assert_eq!(signer.status(), SignerStatus::PrivateNonceComputed);

        // bX = Vp + G·Σv
        let vp_point = TestCurve::try_from_bytes(share.point_bytes())?;
        let sum = messages
            .iter()
            .fold(Scalar::ZERO, |acc, (_, o)| acc + o.opening().v());
        assert_eq!(
            signer.joint_nonce_point(),
            Some(vp_point + TestCurve::scale_generator(&sum))
        );

        let presignature = signer.sign(b"hello world 123")?;
        assert_eq!(signer.status(), SignerStatus::Signed);
        crate::ecdsa::verify(
            signer.config.hash(),
            &signer.public_key(),
            b"hello world 123",
            &presignature.signature(),
        )
    }

    #[test]
    fn openings_may_interleave_with_commitments() -> Result<()> {
        let (_, mut signer, messages) = setup(2)?;
        signer.receive_commitment(&messages[1].0)?;
        signer.receive_opening(&messages[1].1)?;
        assert_eq!(signer.status(), SignerStatus::AwaitingCommitments);
        signer.receive_commitment(&messages[0].0)?;
        assert_eq!(signer.status(), SignerStatus::AwaitingOpenings);
        signer.receive_opening(&messages[0].1)?;
        assert_eq!(signer.status(), SignerStatus::AllOpeningsReceived);
        Ok(())
    }

    #[test]
    fn opening_without_commitment_is_rejected() -> Result<()> {
        let (_, mut signer, messages) = setup(2)?;
        assert!(matches!(
            signer.receive_opening(&messages[0].1),
            Err(InternalError::ProtocolViolation(_))
        ));
        assert_eq!(signer.status(), SignerStatus::Aborted);
        Ok(())
    }

    #[test]
    fn nonce_share_waits_for_every_opening() -> Result<()> {
        let (mut rng, mut signer, messages) = setup(3)?;
        for (com, _) in &messages {
            signer.receive_commitment(com)?;
        }
        signer.receive_opening(&messages[0].1)?;
        assert!(matches!(
            signer.generate_nonce_share(&mut rng),
            Err(InternalError::ProtocolViolation(_))
        ));
        Ok(())
    }

    #[test]
    fn duplicate_commitment_is_idempotent_but_equivocation_is_fatal() -> Result<()> {
        let (mut rng, mut signer, messages) = setup(2)?;
        signer.receive_commitment(&messages[0].0)?;
        signer.receive_commitment(&messages[0].0)?;
        assert_eq!(signer.status(), SignerStatus::AwaitingCommitments);

        let other = Opening::<TestCurve>::random(&mut rng).commit(
            signer.config.version(),
            signer.id(),
            0,
        )?;
        let equivocation = CommitmentMessage {
            commitment: other,
            ..messages[0].0
        };
        assert_eq!(
            signer.receive_commitment(&equivocation),
            Err(InternalError::EquivocationDetected(0))
        );
        assert_eq!(signer.status(), SignerStatus::Aborted);
        // Poisoned for good
        assert!(matches!(
            signer.receive_commitment(&messages[1].0),
            Err(InternalError::ProtocolViolation(_))
        ));
        Ok(())
    }

    #[test]
    fn tampered_opening_fails_before_signing() -> Result<()> {
        let (mut rng, mut signer, mut messages) = setup(2)?;
        let original = messages[1].1.opening().clone();
        messages[1].1.opening = Opening::from_parts(original.v() + Scalar::ONE, original.r());
        for (com, opening) in &messages {
            signer.receive_commitment(com)?;
            signer.receive_opening(opening)?;
        }
        let _ = signer.generate_nonce_share(&mut rng)?;
        assert_eq!(
            signer.compute_private_nonce(),
            Err(InternalError::CommitmentMismatch(1))
        );
        assert!(matches!(
            signer.sign(b"m"),
            Err(InternalError::ProtocolViolation(_))
        ));
        Ok(())
    }

    #[test]
    fn signs_at_most_once() -> Result<()> {
        let (mut rng, mut signer, messages) = setup(1)?;
        signer.receive_commitment(&messages[0].0)?;
        signer.receive_opening(&messages[0].1)?;
        let _ = signer.generate_nonce_share(&mut rng)?;
        signer.compute_private_nonce()?;
        let _ = signer.sign(b"first")?;
        assert!(matches!(
            signer.sign(b"second"),
            Err(InternalError::ProtocolViolation(_))
        ));
        Ok(())
    }

    #[test]
    fn foreign_session_is_rejected() -> Result<()> {
        let (mut rng, mut signer, messages) = setup(1)?;
        let stray = CommitmentMessage {
            sid: Identifier::random(&mut rng),
            ..messages[0].0
        };
        assert_eq!(
            signer.receive_commitment(&stray),
            Err(InternalError::WrongSession)
        );
        Ok(())
    }

    #[test]
    fn zero_private_key_is_rejected() -> Result<()> {
        let config = ProtocolConfig::with_firewalls(1)?;
        let sid = Identifier::random(&mut init_testing());
        assert!(matches!(
            Signer::<TestCurve>::new(config, sid, Scalar::ZERO),
            Err(InternalError::InvalidArgument(_))
        ));
        Ok(())
    }
}
