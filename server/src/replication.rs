//! Turns world changes into per-viewer sync messages
//!
//! Every flush diffs the actor collection against the previous flush once,
//! then tailors the result to each viewer: actors entering its view are sent
//! whole, actors leaving it are removed, and the shared operations are
//! filtered to what it can currently see.

use crate::diff::{diff_actors, full_state_patch, PatchOptimizer};
use crate::game::GameState;
use crate::visibility::visible_actor_ids;
use log::debug;
use shared::{Actor, ActorId, Operation, SyncMessage};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug)]
struct ViewerSync {
    visible: BTreeSet<ActorId>,
    needs_full_state: bool,
}

impl ViewerSync {
    fn new() -> Self {
        Self {
            visible: BTreeSet::new(),
            needs_full_state: true,
        }
    }
}

#[derive(Debug)]
pub struct Replicator {
    /// Actors as of the last flush
    previous: BTreeMap<ActorId, Actor>,
    viewers: HashMap<u32, ViewerSync>,
    optimizer: PatchOptimizer,
    view_distance: f32,
}

impl Replicator {
    pub fn new(optimizer: PatchOptimizer, view_distance: f32) -> Self {
        Self {
            previous: BTreeMap::new(),
            viewers: HashMap::new(),
            optimizer,
            view_distance,
        }
    }

    /// The viewer gets a complete picture with its next message
    pub fn request_full_state(&mut self, viewer_id: u32) {
        self.viewers
            .entry(viewer_id)
            .or_insert_with(ViewerSync::new)
            .needs_full_state = true;
    }

    pub fn remove_viewer(&mut self, viewer_id: u32) {
        self.viewers.remove(&viewer_id);
    }

    /// Drains the pending events and produces the messages for every viewer
    /// that has something to receive. `observers` pairs each viewer with the
    /// character it sees through.
    pub fn flush(
        &mut self,
        state: &mut GameState,
        observers: &[(u32, Option<ActorId>)],
        server_time: u64,
    ) -> Vec<(u32, SyncMessage)> {
        let global = diff_actors(&self.previous, &state.actors, &self.optimizer);
        let events = state.take_events();
        self.previous = state.actors.clone();

        let connected: BTreeSet<u32> = observers.iter().map(|(id, _)| *id).collect();
        self.viewers.retain(|id, _| connected.contains(id));

        let mut messages = Vec::new();
        for &(viewer_id, observer) in observers {
            let sync = self.viewers.entry(viewer_id).or_insert_with(ViewerSync::new);
            let visible = visible_actor_ids(&state.actors, observer, self.view_distance);
            let mut message = SyncMessage {
                server_time,
                ..SyncMessage::default()
            };

            if sync.needs_full_state && !visible.is_empty() {
                message.full_state = true;
                message.patch = full_state_patch(
                    visible.iter().filter_map(|id| state.actors.get(id)),
                    &self.optimizer,
                );
                sync.needs_full_state = false;
            } else {
                let added: BTreeSet<ActorId> = visible.difference(&sync.visible).copied().collect();
                message.patch.extend(
                    added
                        .iter()
                        .filter_map(|id| state.actors.get(id))
                        .map(|actor| {
                            Operation::Set(actor.id, Box::new(self.optimizer.transform_actor(actor)))
                        }),
                );
                message
                    .patch
                    .extend(sync.visible.difference(&visible).map(|id| Operation::Remove(*id)));
                message.patch.extend(
                    global
                        .iter()
                        .filter(|op| {
                            let id = op.actor_id();
                            visible.contains(&id) && !added.contains(&id)
                        })
                        .cloned(),
                );
            }

            message.events = events
                .iter()
                .filter(|event| event.actors().iter().any(|id| visible.contains(id)))
                .copied()
                .collect();
            sync.visible = visible;

            if !message.is_empty() {
                debug!(
                    "Viewer {} gets {} operations and {} events{}",
                    viewer_id,
                    message.patch.len(),
                    message.events.len(),
                    if message.full_state { " (full state)" } else { "" }
                );
                messages.push((viewer_id, message));
            }
        }
        messages
    }
}
