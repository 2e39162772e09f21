//! Areas of the world: walkable graph, start point and portals

use crate::error::SimulationError;
use crate::pathfinding::{NodeId, PathFinder};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{AreaId, Rect, Vector};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    pub rect: Rect,
    pub destination: AreaId,
}

pub struct Area {
    pub id: AreaId,
    pub graph: Box<dyn PathFinder>,
    /// Where newcomers and portal travellers appear
    pub start: Vector,
    pub portals: Vec<Portal>,
}

impl Area {
    pub fn new(id: AreaId, graph: Box<dyn PathFinder>, start: Vector, portals: Vec<Portal>) -> Self {
        Self {
            id,
            graph,
            start,
            portals,
        }
    }

    pub fn portal_at(&self, coords: Vector) -> Option<&Portal> {
        self.portals.iter().find(|portal| portal.rect.contains(coords))
    }

    /// Position of a random walkable node, optionally limited to a circle
    pub fn random_position<R: Rng>(
        &self,
        rng: &mut R,
        within: Option<(Vector, f32)>,
    ) -> Result<Vector, SimulationError> {
        let nodes: Vec<NodeId> = match within {
            Some((center, radius)) => self
                .graph
                .nodes()
                .into_iter()
                .filter(|node| {
                    self.graph
                        .node_position(*node)
                        .is_within_distance(center, radius)
                })
                .collect(),
            None => self.graph.nodes(),
        };

        nodes
            .choose(rng)
            .map(|node| self.graph.node_position(*node))
            .ok_or_else(|| SimulationError::NoWalkableTiles(self.id.clone()))
    }
}

/// Every area of the world, keyed by id
#[derive(Default)]
pub struct AreaMap {
    areas: HashMap<AreaId, Area>,
}

impl AreaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, area: Area) {
        self.areas.insert(area.id.clone(), area);
    }

    pub fn get(&self, id: &AreaId) -> Result<&Area, SimulationError> {
        self.areas
            .get(id)
            .ok_or_else(|| SimulationError::AreaNotFound(id.clone()))
    }

    pub fn contains(&self, id: &AreaId) -> bool {
        self.areas.contains_key(id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Area> {
        self.areas.values_mut()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
