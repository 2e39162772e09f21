//! Headless input source that plays a character from the mirror it sees

use crate::game::OptimisticGameState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Actor, Call, Vector};

/// Picks the next request for the viewer's character.
///
/// A dead character asks to respawn, an idle one attacks the nearest live
/// npc within `hunt_radius` and otherwise wanders to a random tile near
/// where it stands.
pub struct Bot {
    rng: StdRng,
    pub wander_radius: i32,
    pub hunt_radius: f32,
}

impl Bot {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            wander_radius: 5,
            hunt_radius: 8.0,
        }
    }

    pub fn next_call(&mut self, state: &OptimisticGameState) -> Option<Call> {
        let character = state.character()?;
        let character_id = character.id;

        if !character.is_alive() {
            return Some(Call::Respawn { character_id });
        }

        if let Some(target_id) = character.combat.attack_target_id {
            if state.actor(&target_id).is_some_and(|t| t.is_alive()) {
                return None;
            }
        }

        if let Some(target) = self.nearest_prey(state, character) {
            return Some(Call::Attack {
                character_id,
                target_id: target.id,
            });
        }

        if character.movement.is_moving() {
            return None;
        }

        let origin = character.movement.coords.round();
        let dx = self.rng.gen_range(-self.wander_radius..=self.wander_radius);
        let dy = self.rng.gen_range(-self.wander_radius..=self.wander_radius);
        Some(Call::Move {
            character_id,
            to: Vector::new(
                (origin.x + dx as f32).max(0.0),
                (origin.y + dy as f32).max(0.0),
            ),
        })
    }

    fn nearest_prey<'a>(
        &self,
        state: &'a OptimisticGameState,
        character: &Actor,
    ) -> Option<&'a Actor> {
        let from = character.movement.coords;
        state
            .actors
            .values()
            .filter(|actor| actor.as_npc().is_some() && character.can_target(actor))
            .filter(|actor| from.is_within_distance(actor.movement.coords, self.hunt_radius))
            .min_by(|a, b| {
                from.squared_distance(a.movement.coords)
                    .total_cmp(&from.squared_distance(b.movement.coords))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::walker;
    use crate::game::OptimisticSettings;
    use shared::{ActorId, ActorKind, NpcInfo, NpcType};

    fn npc(id: u32, coords: Vector) -> Actor {
        let mut actor = walker(100 + id, coords);
        actor.id = ActorId::Npc(id);
        actor.kind = ActorKind::Npc(NpcInfo {
            npc_id: "rat".to_string(),
            spawn_id: "rats".to_string(),
            name: "Rat".to_string(),
            npc_type: NpcType::Pacifist,
            aggro_range: 0.0,
            xp_reward: 1,
            patrol: None,
        });
        actor
    }

    fn state_with(actors: Vec<Actor>) -> OptimisticGameState {
        let mut state = OptimisticGameState::new(OptimisticSettings::default());
        for actor in actors {
            state.actors.insert(actor.id, actor);
        }
        state.character_id = Some(ActorId::Character(1));
        state
    }

    #[test]
    fn test_no_character_no_call() {
        let mut bot = Bot::new(Some(1));
        let mut state = state_with(vec![]);
        assert_eq!(bot.next_call(&state), None);
        state.character_id = None;
        assert_eq!(bot.next_call(&state), None);
    }

    #[test]
    fn test_dead_character_respawns() {
        let mut me = walker(1, Vector::new(3.0, 3.0));
        me.combat.health = 0.0;
        let mut bot = Bot::new(Some(1));
        assert_eq!(
            bot.next_call(&state_with(vec![me])),
            Some(Call::Respawn {
                character_id: ActorId::Character(1)
            })
        );
    }

    #[test]
    fn test_attacks_nearest_npc() {
        let me = walker(1, Vector::new(3.0, 3.0));
        let far = npc(1, Vector::new(9.0, 3.0));
        let near = npc(2, Vector::new(5.0, 3.0));
        let mut bot = Bot::new(Some(1));
        assert_eq!(
            bot.next_call(&state_with(vec![me, far, near])),
            Some(Call::Attack {
                character_id: ActorId::Character(1),
                target_id: ActorId::Npc(2)
            })
        );
    }

    #[test]
    fn test_keeps_fighting_live_target() {
        let mut me = walker(1, Vector::new(3.0, 3.0));
        me.combat.attack_target_id = Some(ActorId::Npc(2));
        let mut bot = Bot::new(Some(1));
        let state = state_with(vec![me, npc(2, Vector::new(4.0, 3.0))]);
        assert_eq!(bot.next_call(&state), None);
    }

    #[test]
    fn test_wanders_within_radius() {
        let me = walker(1, Vector::new(10.0, 10.0));
        let mut bot = Bot::new(Some(42));
        let state = state_with(vec![me]);
        for _ in 0..20 {
            match bot.next_call(&state) {
                Some(Call::Move { to, .. }) => {
                    assert!((to.x - 10.0).abs() <= 5.0);
                    assert!((to.y - 10.0).abs() <= 5.0);
                    assert!(to.is_whole());
                }
                other => panic!("expected a move, got {:?}", other),
            }
        }
    }
}
