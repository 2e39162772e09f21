//! Npc behavior: per-npc task state machine, witnessed combat memory and
//! the spawner that keeps spawns populated

pub mod memory;
pub mod policy;
pub mod spawner;
pub mod task;

use crate::area::AreaMap;
use crate::error::SimulationError;
use crate::game::GameState;
use log::debug;
use memory::CombatMemory;
use rand::Rng;
use shared::{ActorId, GameEvent};
use std::collections::HashMap;
use task::{NpcAction, NpcTask, TaskContext};

/// Owns the AI state of every npc. Nothing here lives on the actors
/// themselves, so removing an npc only requires dropping its entries.
#[derive(Debug, Default)]
pub struct NpcEngine {
    tasks: HashMap<ActorId, NpcTask>,
    memories: HashMap<ActorId, CombatMemory>,
}

impl NpcEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self, id: &ActorId) -> Option<&NpcTask> {
        self.tasks.get(id)
    }

    pub fn memory(&self, id: &ActorId) -> Option<&CombatMemory> {
        self.memories.get(id)
    }

    /// Runs one tick for every live npc. `events_from` is the index of the
    /// first event produced during this tick.
    pub fn update<R: Rng>(
        &mut self,
        state: &mut GameState,
        areas: &AreaMap,
        events_from: usize,
        rng: &mut R,
    ) -> Result<(), SimulationError> {
        self.forget_removed(state);

        let attacks: Vec<(ActorId, ActorId)> = state.events[events_from.min(state.events.len())..]
            .iter()
            .filter_map(|event| match *event {
                GameEvent::CombatAttack {
                    actor_id,
                    target_id,
                } => Some((actor_id, target_id)),
                _ => None,
            })
            .collect();

        for id in state.actor_ids() {
            let (action, next_task) = {
                let Some(npc) = state.actor(&id) else {
                    continue;
                };
                let Some(info) = npc.as_npc() else {
                    continue;
                };
                if !npc.is_alive() {
                    continue;
                }

                self.observe_attacks(state, id, &attacks);

                let task = match self.tasks.remove(&id) {
                    Some(task) => task,
                    None => NpcTask::initial(info.npc_type, info.patrol.is_some(), state.time, rng),
                };
                let area = areas.get(&npc.movement.area_id)?;
                let mut ctx = TaskContext {
                    npc,
                    state,
                    area,
                    memory: self.memories.get(&id),
                    rng: &mut *rng,
                };
                task.run(&mut ctx)?
            };

            self.tasks.insert(id, next_task);
            apply(state, id, action);
        }

        Ok(())
    }

    /// Records attacks where either combatant is within the observer's aggro
    /// range
    fn observe_attacks(&mut self, state: &GameState, observer_id: ActorId, attacks: &[(ActorId, ActorId)]) {
        let Some(observer) = state.actor(&observer_id) else {
            return;
        };
        let Some(info) = observer.as_npc() else {
            return;
        };
        for &(attacker, target) in attacks {
            let both_alive = [attacker, target]
                .iter()
                .all(|combatant| state.actor(combatant).is_some_and(|c| c.is_alive()));
            if !both_alive {
                continue;
            }
            let witnessed = [attacker, target].iter().any(|combatant| {
                state.actor(combatant).is_some_and(|c| {
                    observer.shares_area_with(c)
                        && observer.movement.coords.distance(c.movement.coords) <= info.aggro_range
                })
            });
            if witnessed {
                self.memories
                    .entry(observer_id)
                    .or_default()
                    .observe_attack(attacker, target);
            }
        }
    }

    /// Drops tasks of npcs that no longer exist. Memory only holds live
    /// npcs and pairs between live actors.
    fn forget_removed(&mut self, state: &GameState) {
        let is_live = |id: &ActorId| state.actor(id).is_some_and(|actor| actor.is_alive());
        self.tasks.retain(|id, _| state.actors.contains_key(id));
        self.memories.retain(|id, _| is_live(id));
        for memory in self.memories.values_mut() {
            memory.retain_actors(|id| is_live(&id));
        }
        self.memories.retain(|_, memory| !memory.is_empty());
    }
}

fn apply(state: &mut GameState, id: ActorId, action: NpcAction) {
    let Some(npc) = state.actor_mut(&id) else {
        return;
    };
    match action {
        NpcAction::Nothing => {}
        NpcAction::MoveTo(destination) => {
            npc.movement.move_target = Some(destination);
        }
        NpcAction::Attack(target_id) => {
            debug!("{} aggroed on {}", id, target_id);
            npc.combat.attack_target_id = Some(target_id);
        }
        NpcAction::DropAggro => {
            debug!("{} lost aggro", id);
            npc.clear_actions();
        }
    }
}
