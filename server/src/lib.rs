//! # Tile World Server Library
//!
//! This library provides the authoritative server for the tile world. It owns
//! the single copy of every actor, advances it on a fixed tick, and streams
//! only the relevant subset of changes to each connected viewer.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Characters and npcs live in one `GameState`. Every tick runs the same
//! systems in the same order: crowd weights, movement, combat, npc behavior
//! and spawning. Viewers never change the world directly, they send requests
//! which are validated and applied between ticks.
//!
//! ### Interest Management
//! A viewer only hears about actors inside the view square around its
//! character. Actors walking into view arrive whole, actors walking out are
//! removed from the viewer's mirror, and events are forwarded only when the
//! viewer can see one of the actors involved.
//!
//! ### Diff Replication
//! After each tick the actor collection is diffed against the previous
//! flush. The optimizer stage leaves out what clients predict on their own,
//! such as sub-tile progress along a path.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One task owns the simulation and processes packets, ticks and periodic
//! saves sequentially through `tokio::select!`. Request handlers and ticks
//! therefore never interleave.
//!
//! ### UDP-Based Communication
//! Datagrams carry bincode encoded `shared::Packet`s. Outgoing packets go
//! through a bounded queue that drops rather than blocks, so one slow
//! socket never holds up the tick.
//!
//! ## Module Organization
//!
//! ### Simulation
//! - `game`: the world state and event buffer
//! - `tick`: the fixed-step scheduler owning every system
//! - `movement`, `combat`, `npc`: the per-tick behaviors
//! - `area`, `pathfinding`, `content`: the static world and its loading
//!
//! ### Replication
//! - `diff`: snapshot diffing and the patch optimizer
//! - `visibility`: the per-viewer view square
//! - `replication`: per-viewer message assembly
//!
//! ### Serving
//! - `auth`: tokens, identities and permissions
//! - `rpc`: request handling
//! - `persistence`: character storage
//! - `client_manager`: connected viewers
//! - `network`: the UDP transport and main loop
//! - `config`: command line and environment configuration
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::content::WorldContent;
//! use server::network::Server;
//! use server::persistence::MemoryCharacterStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         allow_guests: true,
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(
//!         config,
//!         WorldContent::demo(),
//!         Box::new(MemoryCharacterStore::new()),
//!     )
//!     .await?;
//!
//!     // Runs until Ctrl+C:
//!     // - Receives connects, requests and heartbeats from viewers
//!     // - Ticks the world at the configured rate
//!     // - Sends each viewer the changes it can see
//!     // - Drops silent viewers and saves their characters
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The server spawns internal async tasks for:
//! - **Network Receiver**: decodes incoming datagrams
//! - **Network Sender**: drains the outgoing packet queue
//! - **Timeout Checker**: reports viewers that went silent
//!
//! ## Security Considerations
//!
//! ### Authorization
//! Every request is checked against the permissions of the identity the
//! viewer's token resolved to. Rejected requests leave the world untouched.
//!
//! ### State Authority
//! Viewers can only ask for moves and attacks. Positions, health and
//! cooldowns are computed on the server alone.

pub mod area;
pub mod auth;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod content;
pub mod diff;
pub mod error;
pub mod game;
pub mod movement;
pub mod network;
pub mod npc;
pub mod pathfinding;
pub mod persistence;
pub mod replication;
pub mod rpc;
pub mod tick;
pub mod visibility;
