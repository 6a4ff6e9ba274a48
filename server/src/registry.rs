//! Connection registry for the presence server
//!
//! This module holds the single mutable structure of the server: the mapping
//! from a connection handle to the participant it controls. It provides:
//! - Insertion on join and deletion on leave (no tombstones)
//! - In-place mutation of a participant through a closure
//! - Occupancy queries used by spawn allocation and the health probe
//!
//! The registry does no locking of its own. It is owned by the session actor,
//! which processes one command at a time, so every read-modify-write sequence
//! is serialized with respect to every other connection.

use pixel_shared::Participant;
use std::collections::HashMap;
use std::fmt;

/// Opaque handle identifying one transport connection
///
/// Handles are issued from a monotonic counter and never reused, so a stale
/// handle can never alias a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Tracks the participant owned by every open connection
///
/// A participant exists here exactly while its connection is joined. Lookups
/// for unknown handles return `None` rather than an error, because events for
/// connections that already left are an expected part of the protocol.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    participants: HashMap<ConnectionId, Participant>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            participants: HashMap::new(),
        }
    }

    /// Registers the participant for a connection
    ///
    /// Returns the participant previously stored under the same handle, which
    /// only happens if the caller reuses a handle.
    pub fn insert(&mut self, id: ConnectionId, participant: Participant) -> Option<Participant> {
        self.participants.insert(id, participant)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Applies a mutation to the participant of a connection
    ///
    /// The closure runs against the stored record, so the mutation and any
    /// value it returns are consistent with the latest committed state.
    /// Returns `None` when the connection is not registered.
    pub fn update<F, R>(&mut self, id: ConnectionId, mutator: F) -> Option<R>
    where
        F: FnOnce(&mut Participant) -> R,
    {
        self.participants.get_mut(&id).map(mutator)
    }

    /// Deletes the participant of a connection and hands it back
    pub fn remove(&mut self, id: ConnectionId) -> Option<Participant> {
        self.participants.remove(&id)
    }

    /// Snapshot of every participant, in no particular order
    pub fn all(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    /// Number of joined connections
    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.participants.contains_key(&id)
    }

    /// Checks whether a public identifier is held by any live participant
    pub fn contains_public_id(&self, public_id: &str) -> bool {
        self.participants
            .values()
            .any(|participant| participant.public_id == public_id)
    }
}
