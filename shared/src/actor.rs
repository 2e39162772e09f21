//! Replicated actor model: a tagged union of characters and npcs composed
//! from shared trait structs

use crate::math::{CardinalDirection, Path, Rect, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies an actor across server and clients.
///
/// Characters and npc instances are numbered independently, so the variant is
/// part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorId {
    Character(u32),
    Npc(u32),
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Character(id) => write!(f, "char-{}", id),
            ActorId::Npc(id) => write!(f, "npc-{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaId(pub String);

impl AreaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementTrait {
    /// Current position
    pub coords: Vector,
    pub area_id: AreaId,
    /// Tiles per second
    pub speed: f32,
    /// Desired destination, consumed by the movement behavior into a path
    pub move_target: Option<Vector>,
    /// Waypoints currently being followed
    pub path: Option<Path>,
    pub dir: CardinalDirection,
}

impl MovementTrait {
    pub fn new(area_id: AreaId, coords: Vector, speed: f32) -> Self {
        Self {
            coords,
            area_id,
            speed,
            move_target: None,
            path: None,
            dir: CardinalDirection::default(),
        }
    }

    pub fn is_moving(&self) -> bool {
        self.path.as_ref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTrait {
    /// Relative to the actor's position
    pub hit_box: Rect,
    pub health: f32,
    pub max_health: f32,
    pub attack_damage: f32,
    /// Attacks per second
    pub attack_speed: f32,
    /// Tiles
    pub attack_range: f32,
    pub attack_target_id: Option<ActorId>,
    /// Simulated time of the most recent attack
    pub last_attack: Option<Duration>,
}

impl CombatTrait {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Minimum simulated time between two attacks. Speeds too small to
    /// give a representable cooldown never attack.
    pub fn attack_cooldown(&self) -> Duration {
        if self.attack_speed <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f32(1.0 / self.attack_speed).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceTrait {
    pub model_id: String,
    pub color: Option<u32>,
    pub opacity: Option<f32>,
}

/// Npc temperament, deciding which task an instance starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NpcType {
    /// Stands still and does nothing
    Static,
    /// Walks its patrol path back and forth
    Patrol,
    /// Never aggroes
    Pacifist,
    /// Aggroes on actors it has exchanged attacks with
    Defensive,
    /// Aggroes on any character in range
    Aggressive,
    /// Defensive, and also aggroes on actors fighting its spawn allies
    Protective,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub user_id: UserId,
    pub name: String,
    pub xp: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcInfo {
    pub npc_id: String,
    pub spawn_id: String,
    pub name: String,
    pub npc_type: NpcType,
    pub aggro_range: f32,
    pub xp_reward: u32,
    pub patrol: Option<Path>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActorKind {
    Character(CharacterInfo),
    Npc(NpcInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub movement: MovementTrait,
    pub combat: CombatTrait,
    pub appearance: AppearanceTrait,
}

impl Actor {
    pub fn is_alive(&self) -> bool {
        self.combat.is_alive()
    }

    pub fn is_character(&self) -> bool {
        matches!(self.kind, ActorKind::Character(_))
    }

    pub fn as_character(&self) -> Option<&CharacterInfo> {
        match &self.kind {
            ActorKind::Character(info) => Some(info),
            ActorKind::Npc(_) => None,
        }
    }

    pub fn as_npc(&self) -> Option<&NpcInfo> {
        match &self.kind {
            ActorKind::Npc(info) => Some(info),
            ActorKind::Character(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            ActorKind::Character(info) => &info.name,
            ActorKind::Npc(info) => &info.name,
        }
    }

    /// Movement and combat only ever happen between actors of the same area
    pub fn shares_area_with(&self, other: &Actor) -> bool {
        self.movement.area_id == other.movement.area_id
    }

    /// Can `self` keep `target` as an attack target
    pub fn can_target(&self, target: &Actor) -> bool {
        self.id != target.id && self.shares_area_with(target) && target.is_alive()
    }

    /// Dying stops every action
    pub fn clear_actions(&mut self) {
        self.movement.path = None;
        self.movement.move_target = None;
        self.combat.attack_target_id = None;
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn character(id: u32, coords: Vector) -> Actor {
        Actor {
            id: ActorId::Character(id),
            kind: ActorKind::Character(CharacterInfo {
                user_id: format!("user-{}", id),
                name: format!("Hero {}", id),
                xp: 0,
            }),
            movement: MovementTrait::new(AreaId::new("forest"), coords, 3.0),
            combat: CombatTrait {
                hit_box: Rect::from_diameter(Vector::ZERO, 1.0),
                health: 100.0,
                max_health: 100.0,
                attack_damage: 10.0,
                attack_speed: 1.0,
                attack_range: 1.0,
                attack_target_id: None,
                last_attack: None,
            },
            appearance: AppearanceTrait {
                model_id: "adventurer".to_string(),
                color: None,
                opacity: None,
            },
        }
    }
}
