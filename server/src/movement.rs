//! Server side movement behavior
//!
//! Turns move targets into paths, re-paths long walks periodically so they
//! adapt to crowds, advances actors with the shared path follower and moves
//! actors through portals.

use crate::area::{Area, AreaMap};
use crate::error::SimulationError;
use crate::game::GameState;
use crate::pathfinding::{NodeId, PathFinder};
use log::{debug, info};
use shared::{move_along_path, nearest_cardinal_direction, ActorId, MovementTrait, Path, Vector};
use std::collections::HashMap;
use std::time::Duration;

/// How long an actor follows the same path before it is recomputed
pub const REPATH_INTERVAL: Duration = Duration::from_nanos(333_333_333);

/// Extra traversal cost of a tile occupied by a live actor
pub const DEFAULT_CROWD_WEIGHT: f32 = 3.0;

/// Path from the actor towards `destination`.
///
/// An actor already walking keeps its next waypoint so a redirect never
/// makes it turn on the spot; when the destination lies on the current
/// path that path is simply cut short. `None` means unreachable or already
/// there.
pub fn find_path_for_subject(
    graph: &dyn PathFinder,
    subject: &MovementTrait,
    destination: Vector,
) -> Option<Path> {
    let target_node = graph.nearest_node(destination)?;
    let target = graph.node_position(target_node);

    if let Some(current) = subject.path.as_ref().filter(|path| !path.is_empty()) {
        if let Some(index) = current.iter().position(|waypoint| *waypoint == target) {
            return Some(current[..=index].to_vec());
        }
        let from = graph.nearest_node(current[0])?;
        return graph.find_path(from, target_node);
    }

    let from = graph.nearest_node(subject.coords)?;
    let path = graph.find_path(from, target_node)?;
    if path.len() == 1 && path[0] == subject.coords {
        return None;
    }
    Some(path)
}

/// Recomputes the remaining walk towards the final waypoint, keeping the
/// next waypoint. The old path stays when no better one exists.
fn repath(graph: &dyn PathFinder, path: &[Vector]) -> Option<Path> {
    let (next, last) = (*path.first()?, *path.last()?);
    let from = graph.nearest_node(next)?;
    let to = graph.nearest_node(last)?;
    graph.find_path(from, to)
}

#[derive(Debug, Default)]
pub struct MovementSystem {
    /// Simulated time at which each actor started its current path
    path_started: HashMap<ActorId, Duration>,
    crowd_weight: f32,
}

impl MovementSystem {
    pub fn new(crowd_weight: f32) -> Self {
        Self {
            path_started: HashMap::new(),
            crowd_weight,
        }
    }

    /// Gives every tile occupied by a live actor extra weight in its area's
    /// graph, so paths prefer walking around others
    pub fn update_crowd_weights(&self, state: &GameState, areas: &mut AreaMap) {
        for area in areas.iter_mut() {
            let mut weights: HashMap<NodeId, f32> = HashMap::new();
            if self.crowd_weight > 0.0 {
                for actor in state.actors.values() {
                    if actor.movement.area_id != area.id || !actor.is_alive() {
                        continue;
                    }
                    if let Some(node) = area.graph.nearest_node(actor.movement.coords.round()) {
                        *weights.entry(node).or_default() += self.crowd_weight;
                    }
                }
            }
            area.graph.set_node_weights(weights);
        }
    }

    pub fn update(
        &mut self,
        state: &mut GameState,
        areas: &AreaMap,
        dt: Duration,
    ) -> Result<(), SimulationError> {
        let now = state.time;
        self.path_started.retain(|id, _| state.actors.contains_key(id));

        for id in state.actor_ids() {
            let Some(actor) = state.actors.get_mut(&id) else {
                continue;
            };

            if !actor.is_alive() {
                actor.movement.path = None;
                actor.movement.move_target = None;
                self.path_started.remove(&id);
                continue;
            }

            let area = areas.get(&actor.movement.area_id)?;
            let movement = &mut actor.movement;

            if let Some(destination) = movement.move_target.take() {
                movement.path = find_path_for_subject(area.graph.as_ref(), movement, destination);
                self.path_started.insert(id, now);
            } else if let Some(path) = movement.path.as_ref() {
                let started = *self.path_started.entry(id).or_insert(now);
                if path.len() > 1 && now.saturating_sub(started) >= REPATH_INTERVAL {
                    if let Some(fresh) = repath(area.graph.as_ref(), path) {
                        movement.path = Some(fresh);
                    }
                    self.path_started.insert(id, now);
                }
            }

            if let Some(path) = movement.path.take() {
                let (coords, remaining) =
                    move_along_path(movement.coords, &path, movement.speed, dt);
                let facing = remaining
                    .as_ref()
                    .and_then(|p| p.first().copied())
                    .unwrap_or(coords);
                if facing != coords {
                    movement.dir = nearest_cardinal_direction(coords.angle(facing));
                } else if coords != movement.coords {
                    movement.dir = nearest_cardinal_direction(movement.coords.angle(coords));
                }
                movement.coords = coords;
                movement.path = remaining;
            }
            if movement.path.is_none() {
                self.path_started.remove(&id);
            }

            // checked even when standing still
            if let Some(destination) = enter_portal(area, areas, movement)? {
                self.path_started.remove(&id);
                info!("{} travelled to {}", id, destination);
            }
        }

        debug!("Movement pass done for tick {}", state.tick);
        Ok(())
    }
}

/// Relocates the actor to the start of the portal's destination area
fn enter_portal(
    area: &Area,
    areas: &AreaMap,
    movement: &mut MovementTrait,
) -> Result<Option<shared::AreaId>, SimulationError> {
    let Some(portal) = area.portal_at(movement.coords) else {
        return Ok(None);
    };
    let destination = areas.get(&portal.destination)?;
    movement.area_id = destination.id.clone();
    movement.coords = destination.start;
    movement.path = None;
    movement.move_target = None;
    Ok(Some(destination.id.clone()))
}
