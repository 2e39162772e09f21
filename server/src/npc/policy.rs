//! Temperament policies deciding whom a hunting npc picks a fight with

use super::memory::CombatMemory;
use crate::game::GameState;
use shared::{Actor, ActorId};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntPolicy {
    /// Any character in range
    Aggressive,
    /// Only actors it has exchanged attacks with
    Defensive,
    /// Defensive, plus anyone fighting a same-spawn ally
    Protective,
}

impl HuntPolicy {
    /// Nearest eligible candidate within aggro range, lowest id on ties
    pub fn find_target(
        &self,
        npc: &Actor,
        memory: Option<&CombatMemory>,
        state: &GameState,
    ) -> Option<ActorId> {
        let info = npc.as_npc()?;
        let enemies = match self {
            HuntPolicy::Protective => ally_enemies(npc, memory, state),
            _ => BTreeSet::new(),
        };

        let eligible = |candidate: &Actor| match self {
            HuntPolicy::Aggressive => candidate.is_character(),
            HuntPolicy::Defensive => {
                memory.is_some_and(|m| m.has_attacked_each_other(candidate.id, npc.id))
            }
            HuntPolicy::Protective => {
                memory.is_some_and(|m| m.has_attacked_each_other(candidate.id, npc.id))
                    || enemies.contains(&candidate.id)
            }
        };

        let mut best: Option<(f32, ActorId)> = None;
        for candidate in state.actors.values() {
            if !npc.can_target(candidate) || !eligible(candidate) {
                continue;
            }
            let distance = npc.movement.coords.distance(candidate.movement.coords);
            if distance > info.aggro_range {
                continue;
            }
            // ids iterate in order, so strict comparison keeps the lowest on ties
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, candidate.id));
            }
        }
        best.map(|(_, id)| id)
    }
}

/// Actors the npc has seen fighting other members of its spawn
fn ally_enemies(npc: &Actor, memory: Option<&CombatMemory>, state: &GameState) -> BTreeSet<ActorId> {
    let (Some(memory), Some(info)) = (memory, npc.as_npc()) else {
        return BTreeSet::new();
    };
    let allies: BTreeSet<ActorId> = state
        .actors
        .values()
        .filter(|actor| {
            actor.id != npc.id
                && actor
                    .as_npc()
                    .is_some_and(|other| other.spawn_id == info.spawn_id)
        })
        .map(|actor| actor.id)
        .collect();

    memory
        .combats()
        .filter_map(|(a, b)| {
            if allies.contains(&a) && !allies.contains(&b) {
                Some(b)
            } else if allies.contains(&b) && !allies.contains(&a) {
                Some(a)
            } else {
                None
            }
        })
        .filter(|id| *id != npc.id)
        .collect()
}
