//! # Tile World Client Library
//!
//! This library provides a viewer for the tile world server. It keeps a
//! mirror of every actor the server lets it see, predicts movement between
//! updates, and can play its character headlessly through a simple bot.
//!
//! ## Architecture Overview
//!
//! The server sends sparse patches: when an actor starts walking it receives
//! the path once, not a stream of positions. The client is responsible for
//! turning that into smooth motion and for deciding which authoritative
//! values to accept while its own prediction is still in flight.
//!
//! ### Local Interpolation
//! Every frame each live actor with a path is advanced with the same
//! `shared::move_along_path` the server ticks with, and turned to face its
//! next waypoint. Given the same inputs both sides land on the same tile.
//!
//! ### Reconciliation
//! Updates for known actors pass through a per-field trust table. Small
//! position corrections are ignored because the interpolator is already
//! producing them, while teleports, area changes, new paths and real stops
//! are taken as is. Facing is always derived locally.
//!
//! ### Staleness Recovery
//! Sync messages carry the server's clock. A message that arrives more than
//! 1.5 seconds late means the mirror may have missed datagrams, so a full
//! state is requested, at most once every 5 seconds.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The `OptimisticGameState` mirror, patch application and per-frame
//! interpolation.
//!
//! ### Reconcile Module (`reconcile`)
//! The trust table deciding which authoritative fields overwrite the mirror.
//!
//! ### Staleness Module (`staleness`)
//! Lag detection and the throttled full state request.
//!
//! ### Bot Module (`bot`)
//! Turns the mirror into requests: respawn when dead, attack nearby npcs,
//! otherwise wander.
//!
//! ### Network Module (`network`)
//! The UDP connection and the single loop that owns the mirror:
//! - Receives and decodes packets from the server
//! - Advances interpolation on a fixed frame interval
//! - Runs the bot and heartbeats on their own intervals
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::OptimisticSettings;
//! use client::network::{Client, ClientOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ClientOptions {
//!         server_addr: "127.0.0.1:8080".to_string(),
//!         token: "guest:alice".to_string(),
//!         fake_ping_ms: 0,
//!         settings: OptimisticSettings::default(),
//!         bot: true,
//!         bot_interval: Duration::from_secs(1),
//!         seed: None,
//!         run_for: Some(Duration::from_secs(30)),
//!     })
//!     .await?;
//!
//!     client.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Philosophy
//!
//! ### Single Owner
//! Network application and frame advancement run in one task, so a patch
//! never lands halfway through a frame. Once the loop exits nothing touches
//! the mirror again.
//!
//! ### Server Authority
//! The client never changes health, positions or targets on its own behalf.
//! It only smooths what the server already decided and asks for changes
//! through requests.

pub mod bot;
pub mod game;
pub mod network;
pub mod reconcile;
pub mod staleness;
