//! Keeps every spawn at its configured population and removes corpses

use crate::area::AreaMap;
use crate::content::{NpcSpawn, NpcTemplate, WorldContent};
use crate::error::SimulationError;
use crate::game::GameState;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    Actor, ActorId, ActorKind, AppearanceTrait, CardinalDirection, CombatTrait, MovementTrait,
    NpcInfo, NpcType, Rect, Vector,
};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_CORPSE_DURATION: Duration = Duration::from_secs(5);

/// Tint hinting at an npc's temperament when its template sets no color
fn type_color(npc_type: NpcType) -> u32 {
    match npc_type {
        NpcType::Aggressive => 0xff_00_00,
        NpcType::Defensive => 0x00_ff_00,
        NpcType::Protective => 0x00_00_ff,
        NpcType::Pacifist => 0xff_ff_ff,
        NpcType::Static | NpcType::Patrol => 0x22_22_22,
    }
}

#[derive(Debug)]
pub struct Spawner {
    /// When each dead npc was first seen dead
    corpses: HashMap<ActorId, Duration>,
    corpse_duration: Duration,
    next_npc_id: u32,
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new(DEFAULT_CORPSE_DURATION)
    }
}

impl Spawner {
    pub fn new(corpse_duration: Duration) -> Self {
        Self {
            corpses: HashMap::new(),
            corpse_duration,
            next_npc_id: 1,
        }
    }

    pub fn update<R: Rng>(
        &mut self,
        state: &mut GameState,
        areas: &AreaMap,
        content: &WorldContent,
        rng: &mut R,
    ) -> Result<(), SimulationError> {
        self.remove_corpses(state);

        for spawn in &content.spawns {
            let present = state
                .actors
                .values()
                .filter(|actor| actor.as_npc().is_some_and(|info| info.spawn_id == spawn.id))
                .count();
            if present >= spawn.count {
                continue;
            }
            let Some(template) = content.npc_template(&spawn.npc_id) else {
                warn!("Spawn {} references unknown npc {}", spawn.id, spawn.npc_id);
                continue;
            };
            for _ in present..spawn.count {
                let npc = self.spawn_npc(template, spawn, areas, rng)?;
                state.add_actor(npc);
            }
        }
        Ok(())
    }

    /// Spawns one npc of a random template anywhere in the default area.
    /// Returns `None` when the content has no templates.
    pub fn spawn_random_npc<R: Rng>(
        &mut self,
        state: &mut GameState,
        areas: &AreaMap,
        content: &WorldContent,
        rng: &mut R,
    ) -> Result<Option<ActorId>, SimulationError> {
        let Some(template) = content.npcs.choose(rng) else {
            return Ok(None);
        };
        let spawn = NpcSpawn {
            id: format!("random-{}", template.id),
            npc_id: template.id.clone(),
            area_id: content.default_area.clone(),
            count: 1,
            coords: None,
            random_radius: None,
            npc_type: None,
            patrol: None,
        };
        let npc = self.spawn_npc(template, &spawn, areas, rng)?;
        let id = npc.id;
        state.add_actor(npc);
        Ok(Some(id))
    }

    fn remove_corpses(&mut self, state: &mut GameState) {
        let now = state.time;
        self.corpses.retain(|id, _| state.actors.contains_key(id));

        let dead: Vec<ActorId> = state
            .actors
            .values()
            .filter(|actor| actor.as_npc().is_some() && !actor.is_alive())
            .map(|actor| actor.id)
            .collect();
        for id in dead {
            let died_at = *self.corpses.entry(id).or_insert(now);
            if now.saturating_sub(died_at) >= self.corpse_duration {
                debug!("Cleaning up corpse of {}", id);
                state.remove_actor(&id);
                self.corpses.remove(&id);
            }
        }
    }

    fn spawn_npc<R: Rng>(
        &mut self,
        template: &NpcTemplate,
        spawn: &NpcSpawn,
        areas: &AreaMap,
        rng: &mut R,
    ) -> Result<Actor, SimulationError> {
        let area = areas.get(&spawn.area_id)?;
        let coords = match (spawn.coords, spawn.random_radius) {
            (Some(coords), _) => coords,
            (None, Some(radius)) => area.random_position(rng, Some((area.start, radius)))?,
            (None, None) => area.random_position(rng, None)?,
        };

        let id = ActorId::Npc(self.next_npc_id);
        self.next_npc_id += 1;

        let npc_type = spawn.npc_type.unwrap_or(template.npc_type);
        let mut movement = MovementTrait::new(spawn.area_id.clone(), coords, template.speed);
        movement.dir = CardinalDirection::ALL
            .choose(rng)
            .copied()
            .unwrap_or_default();

        Ok(Actor {
            id,
            kind: ActorKind::Npc(NpcInfo {
                npc_id: template.id.clone(),
                spawn_id: spawn.id.clone(),
                name: template.name.clone(),
                npc_type,
                aggro_range: template.aggro_range,
                xp_reward: template.xp_reward,
                patrol: spawn.patrol.clone(),
            }),
            movement,
            combat: CombatTrait {
                hit_box: Rect::from_diameter(Vector::ZERO, 1.0),
                health: template.max_health,
                max_health: template.max_health,
                attack_damage: template.attack_damage,
                attack_speed: template.attack_speed,
                attack_range: template.attack_range,
                attack_target_id: None,
                last_attack: None,
            },
            appearance: AppearanceTrait {
                model_id: template.model_id.clone(),
                color: Some(template.color.unwrap_or_else(|| type_color(npc_type))),
                opacity: None,
            },
        })
    }
}
