// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Contains the payloads exchanged between the signer and the firewalls, and
//! a serialized [`Message`] envelope for carrying them over a transport.
//!
//! Every payload carries the [`Identifier`] of the session it belongs to.

use crate::{
    commit::{Commitment, Opening},
    curve::CurveTrait,
    ecdsa::Signature,
    errors::{InternalError, Result},
    protocol::{Identifier, PartyIndex},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, instrument, trace};

/// `{H}`: a firewall's commitment to its nonce contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentMessage {
    pub(crate) sid: Identifier,
    pub(crate) sender: PartyIndex,
    pub(crate) commitment: Commitment,
}

/// `{v, r}`: a firewall's opening of its earlier commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct OpeningMessage<C: CurveTrait> {
    pub(crate) sid: Identifier,
    pub(crate) sender: PartyIndex,
    pub(crate) opening: Opening<C>,
}

/// `{Vp}`: the signer's public nonce share, SEC1 encoded.
///
/// The point is kept encoded so that every firewall validates curve
/// membership itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceShareMessage {
    pub(crate) sid: Identifier,
    pub(crate) point: Vec<u8>,
}

/// `{r, s}`: the signer's presignature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PresignatureMessage<C: CurveTrait> {
    pub(crate) sid: Identifier,
    pub(crate) signature: Signature<C>,
}

impl CommitmentMessage {
    /// The session this commitment belongs to.
    pub fn id(&self) -> Identifier {
        self.sid
    }

    /// The firewall that produced this commitment.
    pub fn sender(&self) -> PartyIndex {
        self.sender
    }

    /// The commitment digest.
    pub fn commitment(&self) -> Commitment {
        self.commitment
    }
}

impl<C: CurveTrait> OpeningMessage<C> {
    /// The session this opening belongs to.
    pub fn id(&self) -> Identifier {
        self.sid
    }

    /// The firewall that revealed this opening.
    pub fn sender(&self) -> PartyIndex {
        self.sender
    }

    /// The revealed `(v, r)` pair.
    pub fn opening(&self) -> &Opening<C> {
        &self.opening
    }
}

impl NonceShareMessage {
    /// The session this nonce share belongs to.
    pub fn id(&self) -> Identifier {
        self.sid
    }

    /// The encoded nonce share `Vp`.
    pub fn point_bytes(&self) -> &[u8] {
        &self.point
    }
}

impl<C: CurveTrait> PresignatureMessage<C> {
    /// The session this presignature belongs to.
    pub fn id(&self) -> Identifier {
        self.sid
    }

    /// The presignature.
    pub fn signature(&self) -> Signature<C> {
        self.signature
    }
}

/////////////////
// Message API //
/////////////////

/// An enum consisting of all message types
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// A firewall's commitment
    Commitment,
    /// A firewall's opening
    Opening,
    /// The signer's nonce share
    NonceShare,
    /// The signer's presignature
    Presignature,
}

/// The party a [`Message`] originates from.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// The signer
    Signer,
    /// The firewall with the given index
    Firewall(PartyIndex),
}

/// A serialized payload that can be posted to (and read from) a
/// communication channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The type of the message
    message_type: MessageType,
    /// The session identifier that this message belongs to.
    identifier: Identifier,
    /// Which party this message is coming from.
    from: Sender,
    /// The raw bytes for the message, which need to be verified.
    unverified_bytes: Vec<u8>,
}

impl Message {
    /// Creates a new instance of [`Message`].
    #[instrument(skip_all)]
    fn new<T: Serialize>(
        message_type: MessageType,
        identifier: Identifier,
        from: Sender,
        payload: &T,
    ) -> Result<Self> {
        trace!("New message created.");
        Ok(Self {
            message_type,
            identifier,
            from,
            unverified_bytes: serialize!(payload)?,
        })
    }

    /// The message type associated with the message.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The session identifier associated with the message.
    pub fn id(&self) -> Identifier {
        self.identifier
    }

    /// The party that sent this message.
    pub fn from(&self) -> Sender {
        self.from
    }

    /// Serialize the whole envelope for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize!(self)
    }

    /// Parse an envelope received from a transport.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        deserialize!(bytes)
    }

    /// Check if the message type is correct.
    fn check_type(&self, expected_type: MessageType) -> Result<()> {
        if self.message_type() != expected_type {
            error!(
                "A message was misrouted. Expected {:?}, Got {:?}",
                expected_type,
                self.message_type()
            );
            return bail!(
                "Expected a {:?} message, got {:?}",
                expected_type,
                self.message_type()
            );
        }
        Ok(())
    }

    /// Deserialize the payload after checking its type, session and sender
    /// against the envelope.
    fn payload<T: DeserializeOwned>(
        &self,
        expected_type: MessageType,
        sid: impl Fn(&T) -> Identifier,
        sender: impl Fn(&T) -> Sender,
    ) -> Result<T> {
        self.check_type(expected_type)?;
        let payload: T = deserialize!(&self.unverified_bytes)?;
        if sid(&payload) != self.identifier {
            error!("Payload session does not match the envelope");
            return Err(InternalError::WrongSession);
        }
        if sender(&payload) != self.from {
            error!("Payload sender does not match the envelope");
            return bail!("Payload sender does not match the envelope");
        }
        Ok(payload)
    }
}

impl CommitmentMessage {
    /// Wrap this payload in a [`Message`].
    pub fn to_message(&self) -> Result<Message> {
        Message::new(
            MessageType::Commitment,
            self.sid,
            Sender::Firewall(self.sender),
            self,
        )
    }

    /// Extract a commitment payload from a [`Message`].
    pub fn from_message(message: &Message) -> Result<Self> {
        message.payload(
            MessageType::Commitment,
            |p: &Self| p.sid,
            |p: &Self| Sender::Firewall(p.sender),
        )
    }
}

impl<C: CurveTrait> OpeningMessage<C> {
    /// Wrap this payload in a [`Message`].
    pub fn to_message(&self) -> Result<Message> {
        Message::new(
            MessageType::Opening,
            self.sid,
            Sender::Firewall(self.sender),
            self,
        )
    }

    /// Extract an opening payload from a [`Message`].
    pub fn from_message(message: &Message) -> Result<Self> {
        message.payload(
            MessageType::Opening,
            |p: &Self| p.sid,
            |p: &Self| Sender::Firewall(p.sender),
        )
    }
}

impl NonceShareMessage {
    /// Wrap this payload in a [`Message`].
    pub fn to_message(&self) -> Result<Message> {
        Message::new(MessageType::NonceShare, self.sid, Sender::Signer, self)
    }

    /// Extract a nonce share payload from a [`Message`].
    pub fn from_message(message: &Message) -> Result<Self> {
        message.payload(MessageType::NonceShare, |p: &Self| p.sid, |_| Sender::Signer)
    }
}

impl<C: CurveTrait> PresignatureMessage<C> {
    /// Wrap this payload in a [`Message`].
    pub fn to_message(&self) -> Result<Message> {
        Message::new(MessageType::Presignature, self.sid, Sender::Signer, self)
    }

    /// Extract a presignature payload from a [`Message`].
    pub fn from_message(message: &Message) -> Result<Self> {
        message.payload(
            MessageType::Presignature,
            |p: &Self| p.sid,
            |_| Sender::Signer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{curve::Secp256r1, utils::testing::init_testing};

    #[test]
    fn opening_survives_the_wire() -> Result<()> {
        let mut rng = init_testing();
        let sid = Identifier::random(&mut rng);
        let payload = OpeningMessage::<Secp256r1> {
            sid,
            sender: 3,
            opening: Opening::random(&mut rng),
        };
        let bytes = payload.to_message()?.to_bytes()?;
        let message = Message::from_bytes(&bytes)?;
        assert_eq!(message.message_type(), MessageType::Opening);
        assert_eq!(message.from(), Sender::Firewall(3));
        assert_eq!(message.id(), sid);
        assert_eq!(OpeningMessage::<Secp256r1>::from_message(&message)?, payload);
        Ok(())
    }

    #[test]
    fn misrouted_message_is_rejected() -> Result<()> {
        let mut rng = init_testing();
        let share = NonceShareMessage {
            sid: Identifier::random(&mut rng),
            point: vec![2; 33],
        };
        let message = share.to_message()?;
        assert!(matches!(
            CommitmentMessage::from_message(&message),
            Err(InternalError::ProtocolViolation(_))
        ));
        assert_eq!(NonceShareMessage::from_message(&message)?, share);
        Ok(())
    }

    #[test]
    fn envelope_must_agree_with_payload() -> Result<()> {
        let mut rng = init_testing();
        let share = NonceShareMessage {
            sid: Identifier::random(&mut rng),
            point: vec![2; 33],
        };
        let mut message = share.to_message()?;
        message.identifier = Identifier::random(&mut rng);
        assert_eq!(
            NonceShareMessage::from_message(&message),
            Err(InternalError::WrongSession)
        );
        Ok(())
    }

    #[test]
    fn garbage_bytes_do_not_parse() {
        assert_eq!(
            Message::from_bytes(&[0xde, 0xad]).map(|_| ()),
            Err(InternalError::Serialization)
        );
    }
}
