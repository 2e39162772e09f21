use log::info;
use shared::{Actor, ActorId, GameEvent, UserId};
use std::collections::BTreeMap;
use std::time::Duration;

/// The authoritative world: every actor plus the events produced since the
/// last replication flush
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub tick: u64,
    /// Simulated time, advanced by a fixed step every tick
    pub time: Duration,
    pub actors: BTreeMap<ActorId, Actor>,
    pub events: Vec<GameEvent>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, actor: Actor) {
        info!(
            "Added {} ({}) in {} at {}",
            actor.id,
            actor.name(),
            actor.movement.area_id,
            actor.movement.coords
        );
        self.actors.insert(actor.id, actor);
    }

    pub fn remove_actor(&mut self, id: &ActorId) -> Option<Actor> {
        let removed = self.actors.remove(id);
        if removed.is_some() {
            info!("Removed {}", id);
        }
        removed
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: &ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    pub fn character_of_user(&self, user_id: &UserId) -> Option<&Actor> {
        self.actors
            .values()
            .find(|actor| actor.as_character().is_some_and(|c| &c.user_id == user_id))
    }

    pub fn characters(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values().filter(|actor| actor.is_character())
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hands the pending events to replication
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ids in deterministic order, for passes that mutate actors one by one
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }
}
