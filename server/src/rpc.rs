//! Request handling
//!
//! Every call is authorized before it looks at the world, and every check
//! runs before the first mutation, so a rejected call leaves the world as
//! it was. Handlers run on the server loop between ticks.

use crate::auth::{
    require, UserIdentity, CHARACTER_ATTACK, CHARACTER_JOIN, CHARACTER_KILL, CHARACTER_MOVE,
    CHARACTER_RESPAWN, NPC_SPAWN_RANDOM,
};
use crate::client_manager::Viewer;
use crate::persistence::{CharacterStore, SavedCharacter};
use crate::replication::Replicator;
use crate::tick::Simulation;
use log::{error, info, warn};
use shared::{
    Actor, ActorId, Call, CallOutput, CallResult, CharacterInfo, GameEvent, RequestError, Vector,
};

pub struct RequestContext<'a> {
    pub simulation: &'a mut Simulation,
    pub store: &'a mut dyn CharacterStore,
    pub replicator: &'a mut Replicator,
    pub viewer: &'a mut Viewer,
}

impl RequestContext<'_> {
    pub fn handle(&mut self, call: Call) -> CallResult {
        let name = call.name();
        let result = match call {
            Call::Join => self.join(),
            Call::Leave => self.leave(),
            Call::Move { character_id, to } => self.move_to(character_id, to),
            Call::Attack {
                character_id,
                target_id,
            } => self.attack(character_id, target_id),
            Call::Respawn { character_id } => self.respawn(character_id),
            Call::Kill { target_id } => self.kill(target_id),
            Call::SpawnRandomNpc => self.spawn_random_npc(),
            Call::RequestFullState => {
                self.replicator.request_full_state(self.viewer.id);
                Ok(CallOutput::Ok)
            }
        };
        if let Err(e) = &result {
            warn!("Viewer {} {} rejected: {}", self.viewer.id, name, e);
        }
        result
    }

    fn identity(&self, permission: &str) -> Result<UserIdentity, RequestError> {
        require(self.viewer.identity.as_ref(), permission).cloned()
    }

    fn join(&mut self) -> CallResult {
        let user = self.identity(CHARACTER_JOIN)?;
        let sim = &mut *self.simulation;

        let existing = sim.state.character_of_user(&user.id).map(|actor| actor.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let (area, start) = sim.spawn_point().map_err(internal)?;
                let template = &sim.content.character;
                let mut saved = self
                    .store
                    .load_or_create(&user, &area, start, template.max_health)
                    .map_err(internal)?;
                if !sim.areas.contains(&saved.area_id) {
                    warn!(
                        "Character {} was saved in unknown area {}, moving to {}",
                        saved.id, saved.area_id, area
                    );
                    saved.area_id = area;
                    saved.coords = start;
                }
                let actor = template.instantiate(
                    ActorId::Character(saved.id),
                    CharacterInfo {
                        user_id: saved.user_id,
                        name: saved.name,
                        xp: saved.xp,
                    },
                    saved.area_id,
                    saved.coords,
                    saved.health,
                );
                let id = actor.id;
                sim.state.add_actor(actor);
                id
            }
        };

        info!("Viewer {} joined as {}", self.viewer.id, id);
        self.viewer.character_id = Some(id);
        self.replicator.request_full_state(self.viewer.id);
        Ok(CallOutput::Joined(id))
    }

    fn leave(&mut self) -> CallResult {
        if self.viewer.identity.is_none() {
            return Err(RequestError::Unauthenticated);
        }
        let id = self.viewer.character_id.ok_or(RequestError::NotJoined)?;
        release_character(self.simulation, self.store, id).map_err(internal)?;
        self.viewer.character_id = None;
        Ok(CallOutput::Ok)
    }

    fn move_to(&mut self, character_id: ActorId, to: Vector) -> CallResult {
        let user = self.identity(CHARACTER_MOVE)?;
        let character = owned_character(self.simulation, &user, character_id)?;
        if !character.is_alive() {
            return Err(RequestError::CharacterDead);
        }
        character.combat.attack_target_id = None;
        character.movement.move_target = Some(to);
        Ok(CallOutput::Ok)
    }

    fn attack(&mut self, character_id: ActorId, target_id: ActorId) -> CallResult {
        let user = self.identity(CHARACTER_ATTACK)?;
        if !owned_character(self.simulation, &user, character_id)?.is_alive() {
            return Err(RequestError::CharacterDead);
        }
        if target_id == character_id {
            return Err(RequestError::SelfTarget);
        }
        let state = &mut self.simulation.state;
        if state.actor(&target_id).is_none() {
            return Err(RequestError::TargetNotFound(target_id));
        }
        if let Some(character) = state.actor_mut(&character_id) {
            character.combat.attack_target_id = Some(target_id);
        }
        Ok(CallOutput::Ok)
    }

    fn respawn(&mut self, character_id: ActorId) -> CallResult {
        let user = self.identity(CHARACTER_RESPAWN)?;
        let (area, start) = self.simulation.spawn_point().map_err(internal)?;
        let character = owned_character(self.simulation, &user, character_id)?;
        if character.is_alive() {
            return Err(RequestError::CharacterNotDead);
        }
        character.clear_actions();
        character.combat.health = character.combat.max_health;
        character.movement.area_id = area;
        character.movement.coords = start;
        info!("{} respawned", character_id);
        Ok(CallOutput::Ok)
    }

    fn kill(&mut self, target_id: ActorId) -> CallResult {
        self.identity(CHARACTER_KILL)?;
        let state = &mut self.simulation.state;
        let target = state
            .actor_mut(&target_id)
            .ok_or(RequestError::TargetNotFound(target_id))?;
        let was_alive = target.is_alive();
        target.combat.health = 0.0;
        target.clear_actions();
        if was_alive {
            info!("{} was killed by viewer {}", target_id, self.viewer.id);
            state.emit(GameEvent::ActorDied {
                actor_id: target_id,
            });
        }
        Ok(CallOutput::Ok)
    }

    fn spawn_random_npc(&mut self) -> CallResult {
        self.identity(NPC_SPAWN_RANDOM)?;
        let sim = &mut *self.simulation;
        match sim
            .spawner
            .spawn_random_npc(&mut sim.state, &sim.areas, &sim.content, &mut sim.rng)
            .map_err(internal)?
        {
            Some(id) => Ok(CallOutput::Spawned(id)),
            None => Err(RequestError::NoNpcTemplates),
        }
    }
}

/// The caller's character, checking existence before ownership
fn owned_character<'s>(
    simulation: &'s mut Simulation,
    user: &UserIdentity,
    character_id: ActorId,
) -> Result<&'s mut Actor, RequestError> {
    let character = simulation
        .state
        .actor_mut(&character_id)
        .filter(|actor| actor.is_character())
        .ok_or(RequestError::CharacterNotFound(character_id))?;
    let owned = character
        .as_character()
        .is_some_and(|info| info.user_id == user.id);
    if !owned {
        return Err(RequestError::NotOwner(character_id));
    }
    Ok(character)
}

/// Saves the character and takes it out of the world
pub fn release_character(
    simulation: &mut Simulation,
    store: &mut dyn CharacterStore,
    character_id: ActorId,
) -> Result<(), crate::persistence::PersistenceError> {
    if let Some(snapshot) = simulation
        .state
        .actor(&character_id)
        .and_then(SavedCharacter::from_actor)
    {
        store.save(&[snapshot])?;
    }
    simulation.state.remove_actor(&character_id);
    Ok(())
}

/// Writes every character in the world to the store
pub fn persist_characters(simulation: &Simulation, store: &mut dyn CharacterStore) {
    let snapshots: Vec<SavedCharacter> = simulation
        .state
        .characters()
        .filter_map(SavedCharacter::from_actor)
        .collect();
    if snapshots.is_empty() {
        return;
    }
    match store.save(&snapshots) {
        Ok(()) => info!("Persisted {} characters", snapshots.len()),
        Err(e) => error!("Failed to persist characters: {}", e),
    }
}

fn internal(error: impl std::fmt::Display) -> RequestError {
    error!("Request failed internally: {}", error);
    RequestError::Internal(error.to_string())
}
