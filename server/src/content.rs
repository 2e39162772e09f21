//! World content: areas, npc templates, spawns, access tokens and character
//! defaults. Loaded from a JSON file or built in.

use crate::area::{Area, AreaMap, Portal};
use crate::pathfinding::TileGraph;
use serde::{Deserialize, Serialize};
use shared::{
    Actor, ActorId, ActorKind, AppearanceTrait, AreaId, CharacterInfo, CombatTrait,
    MovementTrait, NpcType, Path, Rect, UserId, Vector,
};
use std::collections::HashSet;
use std::path::Path as FsPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read content file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid content file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("area {0} is defined twice")]
    DuplicateArea(AreaId),
    #[error("{context} references unknown area {area}")]
    UnknownArea { context: String, area: AreaId },
    #[error("spawn {spawn} references unknown npc {npc}")]
    UnknownNpc { spawn: String, npc: String },
    #[error("area {0} has no walkable tiles")]
    EmptyArea(AreaId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalDefinition {
    pub rect: Rect,
    pub destination: AreaId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDefinition {
    pub id: AreaId,
    /// One string per row, `.` is walkable
    pub tiles: Vec<String>,
    pub start: Vector,
    #[serde(default)]
    pub portals: Vec<PortalDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcTemplate {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub npc_type: NpcType,
    pub speed: f32,
    pub max_health: f32,
    pub attack_damage: f32,
    pub attack_speed: f32,
    pub attack_range: f32,
    pub aggro_range: f32,
    pub xp_reward: u32,
    #[serde(default)]
    pub color: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcSpawn {
    pub id: String,
    pub npc_id: String,
    pub area_id: AreaId,
    pub count: usize,
    /// Fixed spawn position
    #[serde(default)]
    pub coords: Option<Vector>,
    /// Spawn on a random node this close to the area start
    #[serde(default)]
    pub random_radius: Option<f32>,
    /// Overrides the template temperament
    #[serde(default)]
    pub npc_type: Option<NpcType>,
    #[serde(default)]
    pub patrol: Option<Path>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterTemplate {
    pub model_id: String,
    pub speed: f32,
    pub max_health: f32,
    pub attack_damage: f32,
    pub attack_speed: f32,
    pub attack_range: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub token: String,
    pub user_id: UserId,
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldContent {
    /// Where characters join and respawn
    pub default_area: AreaId,
    pub areas: Vec<AreaDefinition>,
    pub character: CharacterTemplate,
    #[serde(default)]
    pub npcs: Vec<NpcTemplate>,
    #[serde(default)]
    pub spawns: Vec<NpcSpawn>,
    #[serde(default)]
    pub tokens: Vec<TokenGrant>,
}

impl WorldContent {
    pub fn from_file(path: &FsPath) -> Result<Self, ContentError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ContentError> {
        let content: WorldContent = serde_json::from_str(text)?;
        content.validate()?;
        Ok(content)
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        let mut area_ids = HashSet::new();
        for area in &self.areas {
            if !area_ids.insert(&area.id) {
                return Err(ContentError::DuplicateArea(area.id.clone()));
            }
            if !area.tiles.iter().any(|row| row.contains('.')) {
                return Err(ContentError::EmptyArea(area.id.clone()));
            }
        }

        let unknown_area = |context: String, area: &AreaId| ContentError::UnknownArea {
            context,
            area: area.clone(),
        };

        if !area_ids.contains(&self.default_area) {
            return Err(unknown_area("default area".to_string(), &self.default_area));
        }
        for area in &self.areas {
            for portal in &area.portals {
                if !area_ids.contains(&portal.destination) {
                    return Err(unknown_area(
                        format!("portal in {}", area.id),
                        &portal.destination,
                    ));
                }
            }
        }
        for spawn in &self.spawns {
            if !area_ids.contains(&spawn.area_id) {
                return Err(unknown_area(format!("spawn {}", spawn.id), &spawn.area_id));
            }
            if self.npc_template(&spawn.npc_id).is_none() {
                return Err(ContentError::UnknownNpc {
                    spawn: spawn.id.clone(),
                    npc: spawn.npc_id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn npc_template(&self, npc_id: &str) -> Option<&NpcTemplate> {
        self.npcs.iter().find(|npc| npc.id == npc_id)
    }

    pub fn build_areas(&self) -> AreaMap {
        let mut areas = AreaMap::new();
        for definition in &self.areas {
            let portals = definition
                .portals
                .iter()
                .map(|portal| Portal {
                    rect: portal.rect,
                    destination: portal.destination.clone(),
                })
                .collect();
            areas.insert(Area::new(
                definition.id.clone(),
                Box::new(TileGraph::from_rows(&definition.tiles)),
                definition.start,
                portals,
            ));
        }
        areas
    }

    /// Built-in world used when no content file is given
    pub fn demo() -> Self {
        let forest = AreaDefinition {
            id: AreaId::new("forest"),
            tiles: demo_tiles(64, 64, 7),
            start: Vector::new(9.0, 9.0),
            portals: vec![PortalDefinition {
                rect: Rect::new(62.5, 30.5, 1.0, 3.0),
                destination: AreaId::new("village"),
            }],
        };
        let village = AreaDefinition {
            id: AreaId::new("village"),
            tiles: demo_tiles(32, 32, 11),
            start: Vector::new(4.0, 16.0),
            portals: vec![PortalDefinition {
                rect: Rect::new(-0.5, 14.5, 1.0, 3.0),
                destination: AreaId::new("forest"),
            }],
        };

        let npc = |id: &str, npc_type: NpcType, speed: f32, health: f32, damage: f32, aggro: f32| {
            NpcTemplate {
                id: id.to_string(),
                name: capitalize(id),
                model_id: id.to_string(),
                npc_type,
                speed,
                max_health: health,
                attack_damage: damage,
                attack_speed: 1.0,
                attack_range: 1.0,
                aggro_range: aggro,
                xp_reward: (health / 2.0) as u32,
                color: None,
            }
        };

        let spawn = |id: &str, npc_id: &str, area: &str, count: usize| NpcSpawn {
            id: id.to_string(),
            npc_id: npc_id.to_string(),
            area_id: AreaId::new(area),
            count,
            coords: None,
            random_radius: None,
            npc_type: None,
            patrol: None,
        };

        WorldContent {
            default_area: AreaId::new("forest"),
            areas: vec![forest, village],
            character: CharacterTemplate {
                model_id: "adventurer".to_string(),
                speed: 3.0,
                max_health: 100.0,
                attack_damage: 8.0,
                attack_speed: 1.25,
                attack_range: 1.0,
            },
            npcs: vec![
                npc("rat", NpcType::Aggressive, 2.0, 20.0, 3.0, 5.0),
                npc("sheep", NpcType::Pacifist, 1.5, 30.0, 0.0, 0.0),
                npc("wolf", NpcType::Protective, 3.5, 45.0, 6.0, 7.0),
                npc("deer", NpcType::Defensive, 3.0, 35.0, 4.0, 6.0),
                npc("guard", NpcType::Patrol, 2.5, 150.0, 15.0, 4.0),
            ],
            spawns: vec![
                spawn("forest-rats", "rat", "forest", 6),
                NpcSpawn {
                    random_radius: Some(12.0),
                    ..spawn("forest-sheep", "sheep", "forest", 4)
                },
                spawn("forest-wolves", "wolf", "forest", 3),
                spawn("forest-deer", "deer", "forest", 3),
                NpcSpawn {
                    coords: Some(Vector::new(6.0, 10.0)),
                    patrol: Some(vec![
                        Vector::new(6.0, 10.0),
                        Vector::new(20.0, 10.0),
                        Vector::new(20.0, 22.0),
                    ]),
                    ..spawn("village-guard", "guard", "village", 1)
                },
            ],
            tokens: vec![TokenGrant {
                token: "admin".to_string(),
                user_id: "admin".to_string(),
                name: "Admin".to_string(),
                roles: crate::auth::ADMIN_ROLES.iter().map(|r| r.to_string()).collect(),
            }],
        }
    }
}

impl CharacterTemplate {
    pub fn instantiate(
        &self,
        id: ActorId,
        info: CharacterInfo,
        area_id: AreaId,
        coords: Vector,
        health: f32,
    ) -> Actor {
        Actor {
            id,
            kind: ActorKind::Character(info),
            movement: MovementTrait::new(area_id, coords, self.speed),
            combat: CombatTrait {
                hit_box: Rect::from_diameter(Vector::ZERO, 1.0),
                health: health.clamp(0.0, self.max_health),
                max_health: self.max_health,
                attack_damage: self.attack_damage,
                attack_speed: self.attack_speed,
                attack_range: self.attack_range,
                attack_target_id: None,
                last_attack: None,
            },
            appearance: AppearanceTrait {
                model_id: self.model_id.clone(),
                color: None,
                opacity: None,
            },
        }
    }
}

/// Open field with a scattering of deterministic rocks and a clear border
/// lane so portals at the edges stay reachable
fn demo_tiles(width: usize, height: usize, seed: usize) -> Vec<String> {
    (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let border = x < 2 || y < 2 || x + 2 >= width || y + 2 >= height;
                    let rock = (x * 31 + y * 17 + seed) % 23 == 0 && x % 2 == 0;
                    if rock && !border {
                        '#'
                    } else {
                        '.'
                    }
                })
                .collect()
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
