//! The fixed-step simulation: world state plus every system that advances it

use crate::area::AreaMap;
use crate::combat::update_combat;
use crate::content::WorldContent;
use crate::error::SimulationError;
use crate::game::GameState;
use crate::movement::{MovementSystem, DEFAULT_CROWD_WEIGHT};
use crate::npc::spawner::{Spawner, DEFAULT_CORPSE_DURATION};
use crate::npc::NpcEngine;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{AreaId, Vector};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    pub crowd_weight: f32,
    pub corpse_duration: Duration,
    /// Seed for every random decision, `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            crowd_weight: DEFAULT_CROWD_WEIGHT,
            corpse_duration: DEFAULT_CORPSE_DURATION,
            seed: None,
        }
    }
}

pub struct Simulation {
    pub state: GameState,
    pub areas: AreaMap,
    pub content: WorldContent,
    pub movement: MovementSystem,
    pub npcs: NpcEngine,
    pub spawner: Spawner,
    pub rng: StdRng,
}

impl Simulation {
    pub fn new(content: WorldContent, settings: SimulationSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: GameState::new(),
            areas: content.build_areas(),
            content,
            movement: MovementSystem::new(settings.crowd_weight),
            npcs: NpcEngine::new(),
            spawner: Spawner::new(settings.corpse_duration),
            rng,
        }
    }

    /// Where new and respawning characters appear
    pub fn spawn_point(&self) -> Result<(AreaId, Vector), SimulationError> {
        let area = self.areas.get(&self.content.default_area)?;
        Ok((area.id.clone(), area.start))
    }

    /// Advances the world by one fixed step.
    ///
    /// Systems run in a fixed order: crowd weights, movement, combat, npc
    /// behavior, spawning. Move targets set by combat are picked up by the
    /// next tick's movement. An error leaves the remaining systems of this
    /// tick unrun.
    pub fn tick(&mut self, dt: Duration) -> Result<(), SimulationError> {
        self.state.tick += 1;
        self.state.time += dt;
        let events_from = self.state.events.len();

        self.movement
            .update_crowd_weights(&self.state, &mut self.areas);
        self.movement.update(&mut self.state, &self.areas, dt)?;
        update_combat(&mut self.state);
        self.npcs
            .update(&mut self.state, &self.areas, events_from, &mut self.rng)?;
        self.spawner
            .update(&mut self.state, &self.areas, &self.content, &mut self.rng)?;

        if self.state.events.len() > events_from {
            debug!(
                "Tick {} produced {} events",
                self.state.tick,
                self.state.events.len() - events_from
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActorId, GameEvent};

    const DT: Duration = Duration::from_millis(50);

    fn simulation() -> Simulation {
        Simulation::new(
            WorldContent::demo(),
            SimulationSettings {
                seed: Some(5),
                ..SimulationSettings::default()
            },
        )
    }

    #[test]
    fn test_tick_advances_clock_and_populates_world() {
        let mut sim = simulation();
        sim.tick(DT).unwrap();
        assert_eq!(sim.state.tick, 1);
        assert_eq!(sim.state.time, DT);

        let expected: usize = sim.content.spawns.iter().map(|s| s.count).sum();
        assert_eq!(sim.state.actors.len(), expected);
    }

    #[test]
    fn test_events_accumulate_until_taken() {
        let mut sim = simulation();
        sim.state.emit(GameEvent::ActorDied {
            actor_id: ActorId::Npc(99),
        });
        sim.tick(DT).unwrap();
        sim.tick(DT).unwrap();
        assert!(sim.state.events.contains(&GameEvent::ActorDied {
            actor_id: ActorId::Npc(99)
        }));
        sim.state.take_events();
        assert!(sim.state.events.is_empty());
    }

    #[test]
    fn test_same_seed_same_world() {
        let mut a = simulation();
        let mut b = simulation();
        for _ in 0..40 {
            a.tick(DT).unwrap();
            b.tick(DT).unwrap();
        }
        assert_eq!(a.state.actors, b.state.actors);
    }

    #[test]
    fn test_missing_area_aborts_tick() {
        let mut content = WorldContent::demo();
        content.spawns[0].area_id = shared::AreaId::new("atlantis");
        let mut sim = Simulation::new(content, SimulationSettings::default());
        assert!(sim.tick(DT).is_err());
        // the clock still moved
        assert_eq!(sim.state.tick, 1);
    }
}
