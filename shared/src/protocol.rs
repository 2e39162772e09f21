//! Datagram protocol between server and viewers, encoded with bincode

use crate::actor::ActorId;
use crate::math::Vector;
use crate::patch::Patch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    Connect { client_version: u32, token: String },
    Request { request_id: u32, call: Call },
    Heartbeat,
    Disconnect,

    // Server -> client
    Connected { client_id: u32 },
    Response { request_id: u32, result: CallResult },
    Sync(SyncMessage),
    Disconnected { reason: String },
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Requests a viewer can make against the authoritative world
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Call {
    /// Spawns (or finds) the caller's character and starts replication for it
    Join,
    Leave,
    Move { character_id: ActorId, to: Vector },
    Attack { character_id: ActorId, target_id: ActorId },
    Respawn { character_id: ActorId },
    /// Sets the target's health to zero
    Kill { target_id: ActorId },
    SpawnRandomNpc,
    /// Asks for the next sync to carry every visible actor
    RequestFullState,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Join => "join",
            Call::Leave => "leave",
            Call::Move { .. } => "move",
            Call::Attack { .. } => "attack",
            Call::Respawn { .. } => "respawn",
            Call::Kill { .. } => "kill",
            Call::SpawnRandomNpc => "spawnRandomNpc",
            Call::RequestFullState => "requestFullState",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum CallOutput {
    Ok,
    Joined(ActorId),
    Spawned(ActorId),
}

pub type CallResult = Result<CallOutput, RequestError>;

/// Rejections returned to the caller. State is never touched when a call
/// fails.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
pub enum RequestError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("missing permission {0}")]
    MissingPermission(String),
    #[error("character {0} not found")]
    CharacterNotFound(ActorId),
    #[error("target {0} not found")]
    TargetNotFound(ActorId),
    #[error("you don't have access to character {0}")]
    NotOwner(ActorId),
    #[error("cannot act with a dead character")]
    CharacterDead,
    #[error("character is not dead")]
    CharacterNotDead,
    #[error("you can't attack yourself")]
    SelfTarget,
    #[error("there are no npcs to spawn")]
    NoNpcTemplates,
    #[error("join the world first")]
    NotJoined,
    #[error("internal server error: {0}")]
    Internal(String),
}

/// Side-channel notifications produced during a tick
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum GameEvent {
    CombatAttack { actor_id: ActorId, target_id: ActorId },
    ActorDied { actor_id: ActorId },
    MovementStop { actor_id: ActorId },
}

impl GameEvent {
    /// Actors a viewer must see to receive this event
    pub fn actors(&self) -> Vec<ActorId> {
        match *self {
            GameEvent::CombatAttack {
                actor_id,
                target_id,
            } => vec![actor_id, target_id],
            GameEvent::ActorDied { actor_id } | GameEvent::MovementStop { actor_id } => {
                vec![actor_id]
            }
        }
    }
}

/// One replication flush for one viewer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SyncMessage {
    /// The client must drop its mirror before applying `patch`
    pub full_state: bool,
    pub patch: Patch,
    /// Milliseconds since the unix epoch when the flush happened
    pub server_time: u64,
    pub events: Vec<GameEvent>,
}

impl SyncMessage {
    pub fn is_empty(&self) -> bool {
        !self.full_state && self.patch.is_empty() && self.events.is_empty()
    }
}
