//! Session lifecycle: join, leave, move, rename and list
//!
//! The [`SessionController`] owns the connection registry and the broadcast
//! router. It runs inside a single actor task that applies one
//! [`SessionCommand`] at a time, which serializes every registry mutation:
//! two events for the same connection never interleave, and the occupancy
//! count read during spawn always precedes its own insertion.
//!
//! Transports talk to the actor through a [`SessionHandle`] and drive a
//! [`Connection`] state machine per socket, so the protocol logic never sees
//! how frames arrive.

use crate::broadcast::BroadcastRouter;
use crate::mirror::{MirrorHandle, MirrorOp};
use crate::movement;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::spawn;
use crate::utils::get_timestamp;
use log::{debug, info, warn};
use pixel_shared::{ClientEvent, GameConfig, Participant, ServerEvent, MAX_NAME_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Messages sent from connection tasks to the session actor
#[derive(Debug)]
pub enum SessionCommand {
    Connect {
        id: ConnectionId,
        outbox: mpsc::Sender<String>,
    },
    Event {
        id: ConnectionId,
        event: ClientEvent,
    },
    Disconnect {
        id: ConnectionId,
    },
    PlayerCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Authoritative session state and the handlers that mutate it
pub struct SessionController<R = StdRng> {
    config: GameConfig,
    registry: ConnectionRegistry,
    router: BroadcastRouter,
    mirror: MirrorHandle,
    rng: R,
}

impl SessionController<StdRng> {
    pub fn new(config: GameConfig, mirror: MirrorHandle) -> Self {
        Self::with_rng(config, mirror, StdRng::from_entropy())
    }
}

impl<R: Rng> SessionController<R> {
    pub fn with_rng(config: GameConfig, mirror: MirrorHandle, rng: R) -> Self {
        Self {
            config,
            registry: ConnectionRegistry::new(),
            router: BroadcastRouter::new(),
            mirror,
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Applies one command to the session state
    pub fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect { id, outbox } => {
                self.connect(id, outbox);
            }
            SessionCommand::Event { id, event } => self.handle_event(id, event),
            SessionCommand::Disconnect { id } => {
                self.disconnect(id);
            }
            SessionCommand::PlayerCount { reply } => {
                let _ = reply.send(self.registry.count());
            }
        }
    }

    /// Dispatches a decoded client event
    pub fn handle_event(&mut self, id: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::MovePlayer { direction } => {
                self.move_player(id, &direction);
            }
            ClientEvent::UpdatePlayerName { name } => {
                self.rename(id, &name);
            }
            ClientEvent::GetPlayersList => self.list_participants(id),
        }
    }

    /// Spawns a participant for a new connection and announces it
    ///
    /// The joiner receives the full game state; everyone else receives the
    /// new participant record. Returns the public id, or `None` when the
    /// connection had already joined.
    pub fn connect(&mut self, id: ConnectionId, outbox: mpsc::Sender<String>) -> Option<String> {
        if self.registry.contains(id) {
            debug!("Ignoring repeated connect from {}", id);
            return None;
        }

        let occupancy = self.registry.count();
        let public_id = self.fresh_public_id();
        let participant =
            spawn::allocate(&mut self.rng, occupancy, public_id, &self.config, get_timestamp());

        self.registry.insert(id, participant.clone());
        self.router.join(id, outbox);

        self.router.send_to(
            id,
            &ServerEvent::GameState {
                players: self.registry.all(),
                your_player_id: participant.public_id.clone(),
                game_config: self.config,
            },
        );
        self.router
            .broadcast(&ServerEvent::PlayerJoined(participant.clone()), Some(id));

        info!(
            "{} joined as {} ({}) at ({}, {})",
            id, participant.display_name, participant.public_id, participant.x, participant.y
        );

        let public_id = participant.public_id.clone();
        self.mirror.record(MirrorOp::Insert(participant));
        Some(public_id)
    }

    /// Removes a connection's participant and tells the rest of the room
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Participant> {
        self.router.leave(id);

        let Some(participant) = self.registry.remove(id) else {
            debug!("Disconnect from {} without a participant", id);
            return None;
        };

        self.router.broadcast(
            &ServerEvent::PlayerLeft {
                player_id: participant.public_id.clone(),
                player_name: participant.display_name.clone(),
            },
            None,
        );

        info!("{} ({}) left the game", participant.display_name, id);
        self.mirror.record(MirrorOp::Remove {
            public_id: participant.public_id.clone(),
        });
        Some(participant)
    }

    /// Moves a participant one unit and broadcasts the result to everyone
    ///
    /// Unknown directions, absent participants and steps absorbed by a
    /// boundary are dropped without touching state.
    pub fn move_player(&mut self, id: ConnectionId, direction: &str) -> bool {
        let Some(current) = self.registry.get(id) else {
            debug!("Move from {} without a participant", id);
            return false;
        };

        let Some((x, y)) = movement::step_token(current.x, current.y, direction, &self.config)
        else {
            debug!("Move '{}' from {} produced no change", direction, id);
            return false;
        };

        let now = get_timestamp();
        let Some(public_id) = self.registry.update(id, |participant| {
            participant.x = x;
            participant.y = y;
            participant.last_update_millis = now;
            participant.public_id.clone()
        }) else {
            return false;
        };

        self.router.broadcast(
            &ServerEvent::PlayerMoved {
                player_id: public_id.clone(),
                x,
                y,
                timestamp: now,
            },
            None,
        );
        self.mirror
            .record(MirrorOp::UpdatePosition { public_id, x, y });
        true
    }

    /// Renames a participant and broadcasts the change to everyone
    ///
    /// The name is trimmed first; empty or over-long names are dropped.
    /// Duplicate names are allowed.
    pub fn rename(&mut self, id: ConnectionId, name: &str) -> bool {
        if !self.registry.contains(id) {
            debug!("Rename from {} without a participant", id);
            return false;
        }

        let new_name = name.trim();
        if new_name.is_empty() || new_name.chars().count() > MAX_NAME_LEN {
            debug!("Rejected name of {} characters from {}", new_name.chars().count(), id);
            return false;
        }

        let now = get_timestamp();
        let Some((public_id, old_name)) = self.registry.update(id, |participant| {
            participant.last_update_millis = now;
            let old_name = std::mem::replace(&mut participant.display_name, new_name.to_string());
            (participant.public_id.clone(), old_name)
        }) else {
            return false;
        };

        info!("{} renamed {} to {}", id, old_name, new_name);
        self.router.broadcast(
            &ServerEvent::PlayerNameChanged {
                player_id: public_id.clone(),
                old_name,
                new_name: new_name.to_string(),
            },
            None,
        );
        self.mirror.record(MirrorOp::UpdateName {
            public_id,
            name: new_name.to_string(),
        });
        true
    }

    /// Sends the current roster to the requesting connection only
    pub fn list_participants(&mut self, id: ConnectionId) {
        let players = self.registry.all();
        let count = players.len();
        self.router
            .send_to(id, &ServerEvent::PlayersList { players, count });
    }

    /// Draws public ids until one is not held by a live participant
    fn fresh_public_id(&mut self) -> String {
        loop {
            let candidate = spawn::generate_public_id(&mut self.rng);
            if !self.registry.contains_public_id(&candidate) {
                return candidate;
            }
            debug!("Public id {} already live, drawing again", candidate);
        }
    }
}

impl<R: Rng + Send + 'static> SessionController<R> {
    /// Processes commands until every handle has been dropped
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        info!("Session actor shutting down");
    }

    /// Moves the controller into its own task and returns a handle to it
    pub fn spawn(self) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(rx));
        SessionHandle::new(tx)
    }
}

/// Cloneable front door to the session actor
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    next_id: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn new(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Issues a connection handle that has never been used before
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn send(&self, command: SessionCommand) -> bool {
        if let Err(e) = self.tx.send(command) {
            warn!("Session actor unavailable, dropping {:?}", e.0);
            return false;
        }
        true
    }

    /// Current number of joined participants
    pub async fn player_count(&self) -> Option<usize> {
        let (reply, rx) = oneshot::channel();
        if !self.send(SessionCommand::PlayerCount { reply }) {
            return None;
        }
        rx.await.ok()
    }
}

/// Lifecycle stage of one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Joined,
    Disconnected,
}

/// Per-socket state machine: `Connecting -> Joined -> Disconnected`
///
/// Frames are forwarded to the actor only while joined. Leaving is terminal
/// and also happens when the connection is dropped.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: ConnectionState,
    session: SessionHandle,
}

impl Connection {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            id: session.next_connection_id(),
            state: ConnectionState::Connecting,
            session,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Registers the connection's outbound queue and joins the room
    pub fn join(&mut self, outbox: mpsc::Sender<String>) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        if self.session.send(SessionCommand::Connect {
            id: self.id,
            outbox,
        }) {
            self.state = ConnectionState::Joined;
            true
        } else {
            self.state = ConnectionState::Disconnected;
            false
        }
    }

    /// Decodes a text frame and forwards it to the actor
    ///
    /// Malformed frames and frames outside the joined state are dropped.
    pub fn handle_frame(&mut self, text: &str) {
        if self.state != ConnectionState::Joined {
            debug!("Dropping frame from {} in state {:?}", self.id, self.state);
            return;
        }

        match ClientEvent::from_json(text) {
            Ok(event) => {
                self.session.send(SessionCommand::Event { id: self.id, event });
            }
            Err(e) => debug!("Dropping malformed frame from {}: {}", self.id, e),
        }
    }

    /// Leaves the room; later calls do nothing
    pub fn leave(&mut self) {
        if self.state == ConnectionState::Joined {
            self.session.send(SessionCommand::Disconnect { id: self.id });
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.leave();
    }
}
