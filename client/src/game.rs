use crate::reconcile::filter_update;
use log::debug;
use shared::{
    apply_operation, move_along_path, nearest_cardinal_direction, Actor, ActorId, GameEvent,
    Operation, SyncMessage,
};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimisticSettings {
    /// Advance paths locally every frame
    pub use_interpolator: bool,
    /// Run updates through the trust table instead of overwriting blindly.
    /// Should match the server's patch optimizer setting.
    pub use_patch_optimizer: bool,
}

impl Default for OptimisticSettings {
    fn default() -> Self {
        Self {
            use_interpolator: true,
            use_patch_optimizer: true,
        }
    }
}

/// The client's mirror of every actor it can see.
///
/// Values are the locally predicted layer. Authoritative updates are
/// collapsed onto it per field, so an actor walking a path keeps gliding
/// smoothly between the sparse updates the server sends.
#[derive(Debug, Clone, Default)]
pub struct OptimisticGameState {
    pub actors: BTreeMap<ActorId, Actor>,
    pub settings: OptimisticSettings,
    /// The character this viewer controls, once joined
    pub character_id: Option<ActorId>,
    pub last_server_time: Option<u64>,
}

impl OptimisticGameState {
    pub fn new(settings: OptimisticSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn character(&self) -> Option<&Actor> {
        self.character_id.and_then(|id| self.actors.get(&id))
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn apply_sync(&mut self, message: SyncMessage) {
        if message.full_state {
            debug!(
                "Full state received, replacing {} mirrored actors",
                self.actors.len()
            );
            self.actors.clear();
        }
        self.last_server_time = Some(message.server_time);

        let stopped: HashSet<ActorId> = message
            .events
            .iter()
            .filter_map(|event| match event {
                GameEvent::MovementStop { actor_id } => Some(*actor_id),
                _ => None,
            })
            .collect();

        for operation in message.patch {
            let operation = match operation {
                Operation::Update(id, fields) if self.settings.use_patch_optimizer => {
                    match self.actors.get(&id) {
                        Some(local) => {
                            Operation::Update(id, filter_update(local, fields, stopped.contains(&id)))
                        }
                        None => continue,
                    }
                }
                other => other,
            };
            apply_operation(&mut self.actors, operation);
        }

        for event in &message.events {
            if let GameEvent::CombatAttack {
                actor_id,
                target_id,
            } = *event
            {
                self.face_target(actor_id, target_id);
            }
        }
    }

    /// Advances every live actor along its path by `dt`
    pub fn frame_callback(&mut self, dt: Duration) {
        if !self.settings.use_interpolator {
            return;
        }

        for actor in self.actors.values_mut() {
            if !actor.is_alive() {
                continue;
            }
            let Some(path) = actor.movement.path.take() else {
                continue;
            };

            let (coords, remaining) =
                move_along_path(actor.movement.coords, &path, actor.movement.speed, dt);
            actor.movement.coords = coords;
            actor.movement.path = remaining;

            if let Some(next) = actor.movement.path.as_ref().and_then(|p| p.first()) {
                actor.movement.dir = nearest_cardinal_direction(coords.angle(*next));
            }
        }
    }

    fn face_target(&mut self, actor_id: ActorId, target_id: ActorId) {
        let Some(target_coords) = self.actors.get(&target_id).map(|t| t.movement.coords) else {
            return;
        };
        if let Some(actor) = self.actors.get_mut(&actor_id) {
            actor.movement.dir =
                nearest_cardinal_direction(actor.movement.coords.angle(target_coords));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::walker;
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{ActorField, CardinalDirection, Vector};

    fn message(full_state: bool, patch: Vec<Operation>, events: Vec<GameEvent>) -> SyncMessage {
        SyncMessage {
            full_state,
            patch,
            server_time: 1_000,
            events,
        }
    }

    fn set(actor: Actor) -> Operation {
        Operation::Set(actor.id, Box::new(actor))
    }

    fn mirror_with(actors: Vec<Actor>) -> OptimisticGameState {
        let mut state = OptimisticGameState::new(OptimisticSettings::default());
        state.apply_sync(message(true, actors.into_iter().map(set).collect(), vec![]));
        state
    }

    #[test]
    fn test_full_state_replaces_mirror() {
        let mut state = mirror_with(vec![walker(1, Vector::ZERO), walker(2, Vector::ZERO)]);
        assert_eq!(state.actors.len(), 2);

        state.apply_sync(message(true, vec![set(walker(3, Vector::ZERO))], vec![]));
        assert_eq!(state.actors.len(), 1);
        assert!(state.actor(&ActorId::Character(3)).is_some());
        assert_eq!(state.last_server_time, Some(1_000));
    }

    #[test]
    fn test_remove_and_unknown_update() {
        let mut state = mirror_with(vec![walker(1, Vector::ZERO)]);
        state.apply_sync(message(
            false,
            vec![
                Operation::Update(ActorId::Character(9), vec![ActorField::Health(1.0)]),
                Operation::Remove(ActorId::Character(1)),
            ],
            vec![],
        ));
        assert!(state.actors.is_empty());
    }

    #[test]
    fn test_small_coords_correction_is_ignored() {
        let mut state = mirror_with(vec![walker(1, Vector::new(5.0, 5.0))]);
        state.apply_sync(message(
            false,
            vec![Operation::Update(
                ActorId::Character(1),
                vec![
                    ActorField::Coords(Vector::new(6.0, 5.0)),
                    ActorField::Health(20.0),
                ],
            )],
            vec![],
        ));
        let actor = &state.actors[&ActorId::Character(1)];
        assert_eq!(actor.movement.coords, Vector::new(5.0, 5.0));
        assert_eq!(actor.combat.health, 20.0);
    }

    #[test]
    fn test_blind_overwrite_without_optimizer() {
        let mut state = mirror_with(vec![walker(1, Vector::new(5.0, 5.0))]);
        state.settings.use_patch_optimizer = false;
        state.apply_sync(message(
            false,
            vec![Operation::Update(
                ActorId::Character(1),
                vec![
                    ActorField::Coords(Vector::new(6.0, 5.0)),
                    ActorField::Dir(CardinalDirection::North),
                ],
            )],
            vec![],
        ));
        let actor = &state.actors[&ActorId::Character(1)];
        assert_eq!(actor.movement.coords, Vector::new(6.0, 5.0));
        assert_eq!(actor.movement.dir, CardinalDirection::North);
    }

    #[test]
    fn test_movement_stop_event_is_trusted() {
        let mut moving = walker(1, Vector::new(0.0, 0.0));
        moving.movement.path = Some(vec![Vector::new(1.0, 0.0)]);
        let mut state = mirror_with(vec![moving]);

        state.apply_sync(message(
            false,
            vec![Operation::Update(
                ActorId::Character(1),
                vec![ActorField::Path(None)],
            )],
            vec![GameEvent::MovementStop {
                actor_id: ActorId::Character(1),
            }],
        ));
        assert_eq!(state.actors[&ActorId::Character(1)].movement.path, None);
    }

    #[test]
    fn test_attack_event_faces_target() {
        let attacker = walker(1, Vector::new(5.0, 5.0));
        let target = walker(2, Vector::new(5.0, 2.0));
        let mut state = mirror_with(vec![attacker, target]);

        state.apply_sync(message(
            false,
            vec![],
            vec![GameEvent::CombatAttack {
                actor_id: ActorId::Character(1),
                target_id: ActorId::Character(2),
            }],
        ));
        assert_eq!(
            state.actors[&ActorId::Character(1)].movement.dir,
            CardinalDirection::North
        );
    }

    #[test]
    fn test_frame_callback_interpolates() {
        let mut moving = walker(1, Vector::new(0.0, 0.0));
        moving.movement.path = Some(vec![Vector::new(4.0, 0.0)]);
        let mut state = mirror_with(vec![moving]);

        state.frame_callback(Duration::from_millis(500));
        let actor = &state.actors[&ActorId::Character(1)];
        assert_approx_eq!(actor.movement.coords.x, 1.0, 1e-5);
        assert_eq!(actor.movement.dir, CardinalDirection::East);
        assert!(actor.movement.path.is_some());

        state.frame_callback(Duration::from_secs(5));
        let actor = &state.actors[&ActorId::Character(1)];
        assert_eq!(actor.movement.coords, Vector::new(4.0, 0.0));
        assert_eq!(actor.movement.path, None);
    }

    #[test]
    fn test_frame_callback_skips_dead_and_disabled() {
        let mut dead = walker(1, Vector::new(0.0, 0.0));
        dead.movement.path = Some(vec![Vector::new(4.0, 0.0)]);
        dead.combat.health = 0.0;
        let mut state = mirror_with(vec![dead]);
        state.frame_callback(Duration::from_secs(1));
        assert_eq!(
            state.actors[&ActorId::Character(1)].movement.coords,
            Vector::ZERO
        );

        let mut moving = walker(2, Vector::new(0.0, 0.0));
        moving.movement.path = Some(vec![Vector::new(4.0, 0.0)]);
        let mut state = mirror_with(vec![moving]);
        state.settings.use_interpolator = false;
        state.frame_callback(Duration::from_secs(1));
        assert_eq!(
            state.actors[&ActorId::Character(2)].movement.coords,
            Vector::ZERO
        );
    }

    #[test]
    fn test_character_lookup() {
        let mut state = mirror_with(vec![walker(7, Vector::ZERO)]);
        assert!(state.character().is_none());
        state.character_id = Some(ActorId::Character(7));
        assert_eq!(state.character().map(|c| c.name()), Some("Walker 7"));
    }
}
