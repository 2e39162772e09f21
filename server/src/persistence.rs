//! Character persistence
//!
//! Characters are loaded when their user joins and written back when they
//! leave and on a periodic interval. The store only ever sees plain
//! snapshots, never live actors.

use crate::auth::UserIdentity;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{Actor, AreaId, UserId, Vector};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("character store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("character store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCharacter {
    pub id: u32,
    pub user_id: UserId,
    pub name: String,
    pub xp: u32,
    pub area_id: AreaId,
    pub coords: Vector,
    pub health: f32,
}

impl SavedCharacter {
    /// Snapshot of a character actor, `None` for npcs
    pub fn from_actor(actor: &Actor) -> Option<Self> {
        let info = actor.as_character()?;
        let id = match actor.id {
            shared::ActorId::Character(id) => id,
            shared::ActorId::Npc(_) => return None,
        };
        Some(Self {
            id,
            user_id: info.user_id.clone(),
            name: info.name.clone(),
            xp: info.xp,
            area_id: actor.movement.area_id.clone(),
            coords: actor.movement.coords,
            health: actor.combat.health,
        })
    }
}

pub trait CharacterStore: Send {
    /// The user's character, created at `area`/`coords` with full health
    /// when the user has none yet
    fn load_or_create(
        &mut self,
        user: &UserIdentity,
        area: &AreaId,
        coords: Vector,
        max_health: f32,
    ) -> Result<SavedCharacter, PersistenceError>;

    fn save(&mut self, characters: &[SavedCharacter]) -> Result<(), PersistenceError>;
}

/// Keeps characters for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryCharacterStore {
    characters: BTreeMap<UserId, SavedCharacter>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &UserId) -> Option<&SavedCharacter> {
        self.characters.get(user_id)
    }

    fn next_id(&self) -> u32 {
        self.characters.values().map(|c| c.id).max().unwrap_or(0) + 1
    }
}

impl CharacterStore for MemoryCharacterStore {
    fn load_or_create(
        &mut self,
        user: &UserIdentity,
        area: &AreaId,
        coords: Vector,
        max_health: f32,
    ) -> Result<SavedCharacter, PersistenceError> {
        if let Some(existing) = self.characters.get(&user.id) {
            return Ok(existing.clone());
        }
        let created = SavedCharacter {
            id: self.next_id(),
            user_id: user.id.clone(),
            name: user.name.clone(),
            xp: 0,
            area_id: area.clone(),
            coords,
            health: max_health,
        };
        info!("Created character {} for {}", created.id, user.id);
        self.characters.insert(user.id.clone(), created.clone());
        Ok(created)
    }

    fn save(&mut self, characters: &[SavedCharacter]) -> Result<(), PersistenceError> {
        for character in characters {
            self.characters
                .insert(character.user_id.clone(), character.clone());
        }
        Ok(())
    }
}

/// Memory store mirrored to a pretty printed JSON file
#[derive(Debug)]
pub struct JsonFileCharacterStore {
    path: PathBuf,
    inner: MemoryCharacterStore,
}

impl JsonFileCharacterStore {
    /// Opens the store, starting empty when the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let mut inner = MemoryCharacterStore::new();
        if path.exists() {
            let saved: Vec<SavedCharacter> = serde_json::from_str(&fs::read_to_string(&path)?)?;
            info!("Loaded {} characters from {}", saved.len(), path.display());
            inner.save(&saved)?;
        }
        Ok(Self { path, inner })
    }

    fn write(&self) -> Result<(), PersistenceError> {
        let all: Vec<&SavedCharacter> = self.inner.characters.values().collect();
        fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        debug!("Wrote {} characters to {}", all.len(), self.path.display());
        Ok(())
    }
}

impl CharacterStore for JsonFileCharacterStore {
    fn load_or_create(
        &mut self,
        user: &UserIdentity,
        area: &AreaId,
        coords: Vector,
        max_health: f32,
    ) -> Result<SavedCharacter, PersistenceError> {
        let existed = self.inner.get(&user.id).is_some();
        let character = self.inner.load_or_create(user, area, coords, max_health)?;
        if !existed {
            self.write()?;
        }
        Ok(character)
    }

    fn save(&mut self, characters: &[SavedCharacter]) -> Result<(), PersistenceError> {
        self.inner.save(characters)?;
        self.write()
    }
}
