// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! Per-peer storage for values received during a session.
//!
//! The set of parties is closed and known when a session starts, so values
//! are kept in a fixed-size slot array indexed by [`PartyIndex`] rather than
//! in an open-ended map.

use crate::{
    errors::{InternalError, Result},
    protocol::PartyIndex,
};
use tracing::{debug, error};

/// Outcome of a successful [`PeerStore::insert`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Insertion {
    /// The slot was empty and now holds the value.
    Stored,
    /// The slot already held an identical value.
    Duplicate,
}

#[derive(Clone)]
pub(crate) struct PeerStore<T> {
    slots: Vec<Option<T>>,
}

impl<T: PartialEq> PeerStore<T> {
    pub(crate) fn new(party_count: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(party_count).collect(),
        }
    }

    /// Number of slots, occupied or not.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stores `value` in the slot for `party`.
    ///
    /// Storing the same value twice is a no-op; storing a different value in
    /// an occupied slot fails with
    /// [`EquivocationDetected`](InternalError::EquivocationDetected).
    pub(crate) fn insert(&mut self, party: PartyIndex, value: T) -> Result<Insertion> {
        let slot = self.slots.get_mut(party).ok_or_else(|| {
            error!("Tried to store a value for unknown party {}", party);
            InternalError::UnknownParty(party)
        })?;
        if let Some(existing) = slot.as_ref() {
            if *existing == value {
                debug!("Ignoring duplicate value from party {}", party);
                return Ok(Insertion::Duplicate);
            }
            error!("Party {} sent two different values for the same slot", party);
            return Err(InternalError::EquivocationDetected(party));
        }
        *slot = Some(value);
        Ok(Insertion::Stored)
    }

    pub(crate) fn get(&self, party: PartyIndex) -> Option<&T> {
        self.slots.get(party).and_then(Option::as_ref)
    }

    pub(crate) fn contains(&self, party: PartyIndex) -> bool {
        self.get(party).is_some()
    }

    /// Returns `true` if every slot except `skip` is occupied.
    pub(crate) fn is_complete_except(&self, skip: Option<PartyIndex>) -> bool {
        self.slots
            .iter()
            .enumerate()
            .all(|(index, slot)| Some(index) == skip || slot.is_some())
    }

    /// Iterates over occupied slots in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (PartyIndex, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }
}
