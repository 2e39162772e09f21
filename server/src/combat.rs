//! Auto-attack resolution, run once per tick after movement

use crate::game::GameState;
use log::{debug, info};
use shared::{nearest_cardinal_direction, ActorId, GameEvent, TILE_DIAGONAL};

/// Slack added to the attack range so diagonal neighbours count as adjacent
pub const TILE_MARGIN: f32 = TILE_DIAGONAL - 1.0;

enum Decision {
    Idle,
    ClearTarget,
    Approach(shared::Vector),
    Strike(ActorId),
}

pub fn update_combat(state: &mut GameState) {
    for id in state.actor_ids() {
        let decision = {
            let Some(actor) = state.actor(&id) else {
                continue;
            };
            decide(state, actor)
        };

        match decision {
            Decision::Idle => {}
            Decision::ClearTarget => {
                if let Some(actor) = state.actor_mut(&id) {
                    actor.combat.attack_target_id = None;
                }
            }
            Decision::Approach(target_coords) => {
                if let Some(actor) = state.actor_mut(&id) {
                    actor.movement.move_target = Some(target_coords);
                }
            }
            Decision::Strike(target_id) => strike(state, id, target_id),
        }
    }

    clamp_dead(state);
}

fn decide(state: &GameState, actor: &shared::Actor) -> Decision {
    if !actor.is_alive() {
        return Decision::Idle;
    }
    let Some(target_id) = actor.combat.attack_target_id else {
        return Decision::Idle;
    };
    let Some(target) = state.actor(&target_id) else {
        return Decision::ClearTarget;
    };
    if !actor.can_target(target) {
        return Decision::ClearTarget;
    }

    let reach = actor.combat.attack_range + TILE_MARGIN;
    let target_coords = target.movement.coords;
    // plain distance, the squared form loses the diagonal to rounding
    if actor.movement.coords.distance(target_coords) > reach {
        let already_heading_there = actor
            .movement
            .path
            .as_ref()
            .and_then(|path| path.last())
            .is_some_and(|end| end.distance(target_coords) <= reach);
        if already_heading_there {
            return Decision::Idle;
        }
        return Decision::Approach(target_coords);
    }

    Decision::Strike(target_id)
}

fn strike(state: &mut GameState, id: ActorId, target_id: ActorId) {
    let now = state.time;
    let Some(target_coords) = state.actor(&target_id).map(|t| t.movement.coords) else {
        return;
    };
    let Some(actor) = state.actor_mut(&id) else {
        return;
    };

    actor.movement.dir =
        nearest_cardinal_direction(actor.movement.coords.angle(target_coords));

    let ready = match actor.combat.last_attack {
        Some(last) => now.saturating_sub(last) >= actor.combat.attack_cooldown(),
        None => true,
    };
    if !ready {
        return;
    }

    let was_moving = actor.movement.is_moving();
    actor.movement.path = None;
    actor.combat.last_attack = Some(now);
    let damage = actor.combat.attack_damage;

    if was_moving {
        state.emit(GameEvent::MovementStop { actor_id: id });
    }
    state.emit(GameEvent::CombatAttack {
        actor_id: id,
        target_id,
    });

    let Some(target) = state.actor_mut(&target_id) else {
        return;
    };
    target.combat.health = (target.combat.health - damage).max(0.0);
    debug!(
        "{} hit {} for {} ({} left)",
        id, target_id, damage, target.combat.health
    );
    if !target.is_alive() {
        target.clear_actions();
        info!("{} was killed by {}", target_id, id);
        state.emit(GameEvent::ActorDied {
            actor_id: target_id,
        });
    }
}

/// Dead actors keep zero health and do nothing
fn clamp_dead(state: &mut GameState) {
    for actor in state.actors.values_mut() {
        if actor.combat.health <= 0.0 {
            actor.combat.health = 0.0;
            actor.clear_actions();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::{character, npc};
    use shared::{CardinalDirection, NpcType, Vector};
    use std::time::Duration;

    const DT: Duration = Duration::from_millis(50);

    fn state_with(attacker: shared::Actor, target: shared::Actor) -> GameState {
        let mut state = GameState::new();
        state.add_actor(attacker);
        state.add_actor(target);
        state
    }

    fn advance(state: &mut GameState) {
        state.tick += 1;
        state.time += DT;
        update_combat(state);
    }

    #[test]
    fn test_no_target_is_idle() {
        let mut state = state_with(character(1, 0.0, 0.0), npc(1, NpcType::Static, 1.0, 0.0));
        advance(&mut state);
        assert!(state.events.is_empty());
        assert_eq!(state.actors[&ActorId::Npc(1)].combat.health, 50.0);
    }

    #[test]
    fn test_target_in_range_is_hit_and_faced() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        let mut state = state_with(attacker, npc(1, NpcType::Static, 0.0, 1.0));

        advance(&mut state);

        assert_eq!(state.actors[&ActorId::Npc(1)].combat.health, 40.0);
        let attacker = &state.actors[&ActorId::Character(1)];
        assert_eq!(attacker.movement.dir, CardinalDirection::South);
        assert_eq!(attacker.combat.last_attack, Some(DT));
        assert_eq!(
            state.events,
            vec![GameEvent::CombatAttack {
                actor_id: ActorId::Character(1),
                target_id: ActorId::Npc(1),
            }]
        );
    }

    #[test]
    fn test_diagonal_neighbour_is_in_range() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        let mut state = state_with(attacker, npc(1, NpcType::Static, 1.0, 1.0));
        advance(&mut state);
        assert_eq!(state.actors[&ActorId::Npc(1)].combat.health, 40.0);
    }

    #[test]
    fn test_far_target_is_approached() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        let mut state = state_with(attacker, npc(1, NpcType::Static, 5.0, 0.0));

        advance(&mut state);

        let attacker = &state.actors[&ActorId::Character(1)];
        assert_eq!(attacker.movement.move_target, Some(Vector::new(5.0, 0.0)));
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_no_new_move_target_when_path_already_ends_near_target() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        attacker.movement.path = Some(vec![Vector::new(1.0, 0.0), Vector::new(4.0, 0.0)]);
        let mut state = state_with(attacker, npc(1, NpcType::Static, 5.0, 0.0));

        advance(&mut state);

        assert!(state.actors[&ActorId::Character(1)]
            .movement
            .move_target
            .is_none());
    }

    #[test]
    fn test_hits_respect_attack_speed() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        attacker.combat.attack_speed = 2.0;
        attacker.combat.attack_damage = 1.0;
        let mut state = state_with(attacker, npc(1, NpcType::Static, 1.0, 0.0));

        let mut hit_times = Vec::new();
        for _ in 0..40 {
            advance(&mut state);
            for event in state.take_events() {
                if let GameEvent::CombatAttack { .. } = event {
                    hit_times.push(state.time);
                }
            }
        }

        // 2s at 2 attacks/s
        assert_eq!(hit_times.len(), 4);
        for pair in hit_times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_attacking_halts_movement() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        attacker.movement.path = Some(vec![Vector::new(0.0, 1.0)]);
        let mut state = state_with(attacker, npc(1, NpcType::Static, 1.0, 0.0));

        advance(&mut state);

        assert!(state.actors[&ActorId::Character(1)].movement.path.is_none());
        assert!(state.events.contains(&GameEvent::MovementStop {
            actor_id: ActorId::Character(1)
        }));
    }

    #[test]
    fn test_lethal_hit_kills_and_clears_target() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        attacker.combat.attack_damage = 80.0;
        let mut target = npc(1, NpcType::Static, 1.0, 0.0);
        target.combat.attack_target_id = Some(ActorId::Character(1));
        target.movement.path = Some(vec![Vector::new(2.0, 0.0)]);
        let mut state = state_with(attacker, target);

        advance(&mut state);

        let target = &state.actors[&ActorId::Npc(1)];
        assert_eq!(target.combat.health, 0.0);
        assert!(target.combat.attack_target_id.is_none());
        assert!(target.movement.path.is_none());
        assert!(state.events.contains(&GameEvent::ActorDied {
            actor_id: ActorId::Npc(1)
        }));

        advance(&mut state);
        assert!(state.actors[&ActorId::Character(1)]
            .combat
            .attack_target_id
            .is_none());
    }

    #[test]
    fn test_target_in_other_area_is_dropped() {
        let mut attacker = character(1, 0.0, 0.0);
        attacker.combat.attack_target_id = Some(ActorId::Npc(1));
        let mut target = npc(1, NpcType::Static, 1.0, 0.0);
        target.movement.area_id = shared::AreaId::new("cave");
        let mut state = state_with(attacker, target);

        advance(&mut state);

        assert!(state.actors[&ActorId::Character(1)]
            .combat
            .attack_target_id
            .is_none());
        assert_eq!(state.actors[&ActorId::Npc(1)].combat.health, 50.0);
    }

    #[test]
    fn test_negative_health_is_clamped() {
        let mut state = GameState::new();
        let mut victim = character(1, 0.0, 0.0);
        victim.combat.health = -5.0;
        victim.movement.move_target = Some(Vector::new(3.0, 3.0));
        state.add_actor(victim);

        advance(&mut state);

        let victim = &state.actors[&ActorId::Character(1)];
        assert_eq!(victim.combat.health, 0.0);
        assert!(victim.movement.move_target.is_none());
    }
}
