//! Event fan-out to connected sockets
//!
//! The router owns room membership as a set of outbound queues, one per
//! connection. Every queue is drained by that connection's writer task, so
//! enqueueing never waits on the network: a slow or dead recipient only loses
//! its own messages.

use crate::registry::ConnectionId;
use log::{debug, error, warn};
use pixel_shared::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Delivers serialized events to one connection or to the whole room
#[derive(Debug, Default)]
pub struct BroadcastRouter {
    members: HashMap<ConnectionId, mpsc::Sender<String>>,
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
        }
    }

    /// Adds a connection's outbound queue to the room
    pub fn join(&mut self, id: ConnectionId, outbox: mpsc::Sender<String>) {
        self.members.insert(id, outbox);
    }

    /// Removes a connection from the room
    ///
    /// Dropping the queue sender lets the writer task finish once it has
    /// flushed what is already queued.
    pub fn leave(&mut self, id: ConnectionId) -> bool {
        self.members.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sends an event to a single connection
    ///
    /// Returns false if the connection is gone or its queue rejected the
    /// message. Never an error: delivery is best effort.
    pub fn send_to(&self, id: ConnectionId, event: &ServerEvent) -> bool {
        let Some(outbox) = self.members.get(&id) else {
            debug!("Dropping {} for departed connection {}", event.name(), id);
            return false;
        };

        match encode(event) {
            Some(text) => Self::deliver(id, outbox, text, event.name()),
            None => false,
        }
    }

    /// Sends an event to every member except `exclude`
    ///
    /// The event is serialized once. Returns how many recipients accepted it.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<ConnectionId>) -> usize {
        let Some(text) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, outbox) in &self.members {
            if Some(*id) == exclude {
                continue;
            }
            if Self::deliver(*id, outbox, text.clone(), event.name()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(id: ConnectionId, outbox: &mpsc::Sender<String>, text: String, name: &str) -> bool {
        match outbox.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Send queue full for {}, dropping {}", id, name);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Connection {} closed before {} could be delivered", id, name);
                false
            }
        }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match event.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to serialize {}: {}", event.name(), e);
            None
        }
    }
}
