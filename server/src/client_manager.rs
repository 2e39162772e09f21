//! Viewer connection management for the world server
//!
//! This module tracks every connected viewer:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - The identity resolved from the viewer's token at connect time
//! - Which character, if any, the viewer has joined with
//! - Client capacity and address lookup for routing datagrams
//!
//! The joined character doubles as the viewer's observer for replication,
//! so a viewer that has not joined receives no world state.

use crate::auth::UserIdentity;
use log::info;
use shared::ActorId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected viewer
///
/// Each viewer keeps:
/// - Connection metadata (ID, address, last activity)
/// - The identity its requests are authorized against
/// - The character it controls and observes the world through
#[derive(Debug)]
pub struct Viewer {
    /// Unique viewer identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses and sync messages
    pub addr: SocketAddr,
    /// Last time we received any packet from this viewer
    pub last_seen: Instant,
    /// `None` for connections without a valid token
    pub identity: Option<UserIdentity>,
    /// Set by a successful join, cleared by leave
    pub character_id: Option<ActorId>,
}

impl Viewer {
    /// Creates a viewer that has not joined the world yet and marks it as
    /// recently active
    pub fn new(id: u32, addr: SocketAddr, identity: Option<UserIdentity>) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            identity,
            character_id: None,
        }
    }

    /// Returns true if nothing was heard from this viewer within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected viewers
///
/// The ClientManager enforces the server capacity and hands out viewer IDs.
/// It never touches the world itself: callers decide what happens to a
/// viewer's character when the viewer goes away.
pub struct ClientManager {
    /// Connected viewers indexed by their unique ID
    viewers: HashMap<u32, Viewer>,
    /// Next available viewer ID for new connections
    next_viewer_id: u32,
    /// Maximum number of concurrent viewers allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Viewer IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            viewers: HashMap::new(),
            next_viewer_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new viewer connection
    ///
    /// Returns Some(viewer_id) if successful, None if the server is at
    /// capacity.
    pub fn add_client(&mut self, addr: SocketAddr, identity: Option<UserIdentity>) -> Option<u32> {
        if self.viewers.len() >= self.max_clients {
            return None;
        }

        let viewer_id = self.next_viewer_id;
        self.next_viewer_id += 1;

        match &identity {
            Some(user) => info!("Viewer {} connected from {} as {}", viewer_id, addr, user.id),
            None => info!("Viewer {} connected from {} without identity", viewer_id, addr),
        }
        self.viewers
            .insert(viewer_id, Viewer::new(viewer_id, addr, identity));

        Some(viewer_id)
    }

    /// Removes a viewer and returns it so its character can be cleaned up
    pub fn remove_client(&mut self, viewer_id: &u32) -> Option<Viewer> {
        let viewer = self.viewers.remove(viewer_id)?;
        info!("Viewer {} disconnected", viewer.id);
        Some(viewer)
    }

    /// Finds a viewer ID by its network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.viewers
            .iter()
            .find(|(_, viewer)| viewer.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get_mut(&mut self, viewer_id: u32) -> Option<&mut Viewer> {
        self.viewers.get_mut(&viewer_id)
    }

    /// Records activity from a viewer. Returns false for unknown IDs.
    pub fn touch(&mut self, viewer_id: u32) -> bool {
        match self.viewers.get_mut(&viewer_id) {
            Some(viewer) => {
                viewer.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Viewers silent for longer than `timeout`
    ///
    /// They are only reported, removal goes through the same path as an
    /// explicit disconnect so their character is saved.
    pub fn find_timeouts(&self, timeout: Duration) -> Vec<u32> {
        self.viewers
            .iter()
            .filter(|(_, viewer)| viewer.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every viewer paired with the character it observes through, in ID
    /// order
    pub fn observers(&self) -> Vec<(u32, Option<ActorId>)> {
        let mut observers: Vec<(u32, Option<ActorId>)> = self
            .viewers
            .values()
            .map(|viewer| (viewer.id, viewer.character_id))
            .collect();
        observers.sort_by_key(|(id, _)| *id);
        observers
    }

    /// Gets all viewer IDs and their network addresses
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.viewers
            .iter()
            .map(|(id, viewer)| (*id, viewer.addr))
            .collect()
    }

    pub fn addr_of(&self, viewer_id: u32) -> Option<SocketAddr> {
        self.viewers.get(&viewer_id).map(|viewer| viewer.addr)
    }

    /// Returns the number of currently connected viewers
    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    /// Returns true if no viewers are currently connected
    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }
}
