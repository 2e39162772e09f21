//! Per-field trust table used when collapsing an authoritative update onto
//! the locally predicted mirror.
//!
//! The client interpolates movement on its own, so most position and path
//! updates describe something the mirror is already doing. Each rule decides
//! whether an incoming field replaces the predicted value or is dropped.
//! Fields without a rule are always trusted.

use shared::{path_length, Actor, ActorField, FieldKey, TILE_DIAGONAL};
use std::time::Duration;

/// Predicted coords further than `speed * TELEPORT_THRESHOLD` from the
/// authoritative ones are snapped
pub const TELEPORT_THRESHOLD: Duration = Duration::from_millis(1500);

/// What the rest of the message says about the actor being updated
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateContext {
    /// A `MovementStop` event in the same message names this actor
    pub stopped: bool,
    /// The same update moves the actor to another area
    pub area_changed: bool,
}

pub type TrustRule = fn(local: &Actor, field: &ActorField, ctx: &UpdateContext) -> bool;

pub const TRUST_TABLE: &[(FieldKey, TrustRule)] = &[
    (FieldKey::Coords, trust_coords),
    (FieldKey::Path, trust_path),
    (FieldKey::Dir, trust_never),
];

pub fn rule_for(key: FieldKey) -> Option<TrustRule> {
    TRUST_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, rule)| *rule)
}

pub fn is_trusted(local: &Actor, field: &ActorField, ctx: &UpdateContext) -> bool {
    match rule_for(field.key()) {
        Some(rule) => rule(local, field, ctx),
        None => true,
    }
}

/// Keeps the fields of one update that should overwrite `local`.
///
/// Every field is judged against the mirror as it was before the update.
pub fn filter_update(local: &Actor, fields: Vec<ActorField>, stopped: bool) -> Vec<ActorField> {
    let area_changed = fields.iter().any(|field| match field {
        ActorField::AreaId(area_id) => *area_id != local.movement.area_id,
        _ => false,
    });
    let ctx = UpdateContext {
        stopped,
        area_changed,
    };

    fields
        .into_iter()
        .filter(|field| is_trusted(local, field, &ctx))
        .collect()
}

fn trust_coords(local: &Actor, field: &ActorField, ctx: &UpdateContext) -> bool {
    let ActorField::Coords(coords) = field else {
        return true;
    };
    if ctx.area_changed {
        return true;
    }
    let threshold = local.movement.speed * TELEPORT_THRESHOLD.as_secs_f32();
    !coords.is_within_distance(local.movement.coords, threshold)
}

fn trust_path(local: &Actor, field: &ActorField, ctx: &UpdateContext) -> bool {
    let ActorField::Path(path) = field else {
        return true;
    };
    if ctx.stopped || ctx.area_changed {
        return true;
    }
    if path.as_ref().is_some_and(|p| !p.is_empty()) {
        return true;
    }

    // The server stopped the actor. If the local glide is on its last step,
    // let it land instead of freezing short of the tile.
    if let Some(local_path) = local.movement.path.as_deref() {
        if !local_path.is_empty()
            && path_length(local.movement.coords, local_path) <= TILE_DIAGONAL
        {
            return false;
        }
    }

    normalized(path.as_deref()) != normalized(local.movement.path.as_deref())
}

fn trust_never(_: &Actor, _: &ActorField, _: &UpdateContext) -> bool {
    false
}

fn normalized(path: Option<&[shared::Vector]>) -> &[shared::Vector] {
    path.unwrap_or(&[])
}
