//! # Presence Server Library
//!
//! This library provides the authoritative server for a shared pixel canvas.
//! Clients connect over WebSockets, are given a position and a color, and
//! move one unit at a time while every other client watches.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The server holds the only copy of who is connected and where they are.
//! Clients never move themselves: they ask to move, and every client
//! (the mover included) renders the position the server broadcasts back.
//!
//! ### Session Lifecycle
//! Handles the complete lifecycle of a connection:
//! - Spawn placement, name and color assignment on join
//! - Bounded single-step movement and renaming
//! - Roster queries
//! - Cleanup and announcement on leave
//!
//! ### Fan-out
//! Every state change is announced to the room. Delivery is best effort and
//! never blocks: a slow or dead socket only loses its own messages.
//!
//! ## Architecture Design
//!
//! ### Single Session Actor
//! All session state lives in one task that applies commands sequentially.
//! This removes races between connections (two joins can never observe the
//! same occupancy count) without any locking in the data structures.
//!
//! ### Per-Connection Tasks
//! Each socket gets a reader that forwards frames to the actor in order and a
//! writer that drains a bounded outbound queue.
//!
//! ### Silent Failure Policy
//! The protocol has no error replies. Malformed frames, invalid moves, bad
//! names and events for departed connections are dropped and logged at
//! `debug` level.
//!
//! ## Module Organization
//!
//! - `registry`: connection handle to participant mapping
//! - `spawn`: identity, color and spawn position allocation
//! - `movement`: single-step clamped moves
//! - `broadcast`: room membership and event fan-out
//! - `session`: lifecycle controller, actor and connection state machine
//! - `mirror`: optional write-only Supabase mirror
//! - `network`: WebSocket, health and static file endpoints
//! - `config`: command line and environment settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pixel_server::config::ServerConfig;
//! use pixel_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         address: "127.0.0.1:5000".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Binds the listener and starts the session actor, then serves
//!     // `/ws` and `/health` until the process stops
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod mirror;
pub mod movement;
pub mod network;
pub mod registry;
pub mod session;
pub mod spawn;
pub mod utils;
