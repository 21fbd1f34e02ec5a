// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! A list of error types which are produced during an execution of the protocol
use core::fmt::Debug;
use thiserror::Error;

/// The default Result type used in this crate
pub type Result<T> = std::result::Result<T, InternalError>;

/// Represents an error in the execution of a firewalled signing session.
///
/// Every variant except [`InternalError::InvalidArgument`] is fatal for the
/// session in which it occurs: the caller must discard all state and start a
/// fresh session with fresh commitments.
#[derive(Clone, Eq, PartialEq, Error, Debug)]
#[allow(missing_docs)]
pub enum InternalError {
    #[error("Opening from party {0} does not match its commitment")]
    CommitmentMismatch(usize),
    #[error("Party {0} sent two different values for the same round")]
    EquivocationDetected(usize),
    #[error("Received an encoding that is not a valid point on the curve")]
    InvalidPoint,
    #[error("Signature failed to verify against the signer's public key")]
    InvalidSignature,
    #[error("Reconstructed nonce point does not match the jointly derived nonce")]
    NonceMismatch,
    #[error("Operation not allowed in the current protocol state: `{0}`")]
    ProtocolViolation(String),
    #[error("Received a message belonging to a different session")]
    WrongSession,
    #[error("Party index {0} is not part of this session")]
    UnknownParty(usize),
    #[error("Function call contained invalid arguments: `{0}`")]
    InvalidArgument(String),
    #[error("ECDSA signing produced a zero r or s component")]
    DegenerateSignature,
    #[error("Could not invert a Scalar")]
    CouldNotInvertScalar,
    #[error("Serialization Error")]
    Serialization,
    #[error("Represents some code assumption that was checked at runtime but failed to be true")]
    InternalInvariantFailed,
}

macro_rules! serialize {
    ($x:expr) => {{
        bincode::serialize($x).or(Err(crate::errors::InternalError::Serialization))
    }};
}

macro_rules! deserialize {
    ($x:expr) => {{
        bincode::deserialize($x).or(Err(crate::errors::InternalError::Serialization))
    }};
}

macro_rules! bail {
    ($($arg:tt)*) => {{
        Err(crate::errors::InternalError::ProtocolViolation(format!($($arg)*)))
    }};
}

macro_rules! arg_err {
    ($x:expr) => {{
        Err(crate::errors::InternalError::InvalidArgument(String::from(
            $x,
        )))
    }};
}
