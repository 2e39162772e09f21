//! Types and algorithms shared by the authoritative server and its viewers
//!
//! Everything here must behave identically on both sides of the wire: the
//! actor model, tile geometry, the path-following algorithm the server ticks
//! with and the client interpolates with, the patch format and the datagram
//! protocol.

pub mod actor;
pub mod math;
pub mod movement;
pub mod patch;
pub mod protocol;

use std::time::{SystemTime, UNIX_EPOCH};

pub use actor::{
    Actor, ActorId, ActorKind, AppearanceTrait, AreaId, CharacterInfo, CombatTrait,
    MovementTrait, NpcInfo, NpcType, UserId,
};
pub use math::{nearest_cardinal_direction, path_length, CardinalDirection, Path, Rect, Vector};
pub use movement::move_along_path;
pub use patch::{
    actor_fields, apply_field, apply_operation, apply_patch, ActorField, FieldKey, Operation, Patch,
};
pub use protocol::{Call, CallOutput, CallResult, GameEvent, Packet, RequestError, SyncMessage};

/// Bumped whenever `Packet` changes shape
pub const PROTOCOL_VERSION: u32 = 1;

/// Length of one tile diagonal
pub const TILE_DIAGONAL: f32 = std::f32::consts::SQRT_2;

/// Milliseconds since the unix epoch, used to stamp sync messages
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000);
    }
}
