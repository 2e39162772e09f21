//! Patch format shared by the diff engine and the client mirror
//!
//! A patch is an ordered list of operations against the actor collection.
//! `Set` carries a whole actor, `Update` a sparse list of changed fields and
//! `Remove` drops the id.

use crate::actor::{Actor, ActorId, ActorKind, AppearanceTrait, AreaId};
use crate::math::{CardinalDirection, Path, Rect, Vector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub type Patch = Vec<Operation>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Set(ActorId, Box<Actor>),
    Update(ActorId, Vec<ActorField>),
    Remove(ActorId),
}

impl Operation {
    pub fn actor_id(&self) -> ActorId {
        match self {
            Operation::Set(id, _) | Operation::Update(id, _) | Operation::Remove(id) => *id,
        }
    }
}

/// One replicated field of an actor together with its new value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActorField {
    Coords(Vector),
    AreaId(AreaId),
    MoveTarget(Option<Vector>),
    Path(Option<Path>),
    Speed(f32),
    Dir(CardinalDirection),
    HitBox(Rect),
    Health(f32),
    MaxHealth(f32),
    AttackDamage(f32),
    AttackSpeed(f32),
    AttackRange(f32),
    AttackTargetId(Option<ActorId>),
    LastAttack(Option<Duration>),
    Appearance(AppearanceTrait),
    Kind(ActorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Coords,
    AreaId,
    MoveTarget,
    Path,
    Speed,
    Dir,
    HitBox,
    Health,
    MaxHealth,
    AttackDamage,
    AttackSpeed,
    AttackRange,
    AttackTargetId,
    LastAttack,
    Appearance,
    Kind,
}

impl ActorField {
    pub fn key(&self) -> FieldKey {
        match self {
            ActorField::Coords(_) => FieldKey::Coords,
            ActorField::AreaId(_) => FieldKey::AreaId,
            ActorField::MoveTarget(_) => FieldKey::MoveTarget,
            ActorField::Path(_) => FieldKey::Path,
            ActorField::Speed(_) => FieldKey::Speed,
            ActorField::Dir(_) => FieldKey::Dir,
            ActorField::HitBox(_) => FieldKey::HitBox,
            ActorField::Health(_) => FieldKey::Health,
            ActorField::MaxHealth(_) => FieldKey::MaxHealth,
            ActorField::AttackDamage(_) => FieldKey::AttackDamage,
            ActorField::AttackSpeed(_) => FieldKey::AttackSpeed,
            ActorField::AttackRange(_) => FieldKey::AttackRange,
            ActorField::AttackTargetId(_) => FieldKey::AttackTargetId,
            ActorField::LastAttack(_) => FieldKey::LastAttack,
            ActorField::Appearance(_) => FieldKey::Appearance,
            ActorField::Kind(_) => FieldKey::Kind,
        }
    }
}

/// Every replicated field of `actor`, in `FieldKey` order
pub fn actor_fields(actor: &Actor) -> Vec<ActorField> {
    let m = &actor.movement;
    let c = &actor.combat;
    vec![
        ActorField::Coords(m.coords),
        ActorField::AreaId(m.area_id.clone()),
        ActorField::MoveTarget(m.move_target),
        ActorField::Path(m.path.clone()),
        ActorField::Speed(m.speed),
        ActorField::Dir(m.dir),
        ActorField::HitBox(c.hit_box),
        ActorField::Health(c.health),
        ActorField::MaxHealth(c.max_health),
        ActorField::AttackDamage(c.attack_damage),
        ActorField::AttackSpeed(c.attack_speed),
        ActorField::AttackRange(c.attack_range),
        ActorField::AttackTargetId(c.attack_target_id),
        ActorField::LastAttack(c.last_attack),
        ActorField::Appearance(actor.appearance.clone()),
        ActorField::Kind(actor.kind.clone()),
    ]
}

pub fn apply_field(actor: &mut Actor, field: ActorField) {
    let m = &mut actor.movement;
    let c = &mut actor.combat;
    match field {
        ActorField::Coords(v) => m.coords = v,
        ActorField::AreaId(v) => m.area_id = v,
        ActorField::MoveTarget(v) => m.move_target = v,
        ActorField::Path(v) => m.path = v,
        ActorField::Speed(v) => m.speed = v,
        ActorField::Dir(v) => m.dir = v,
        ActorField::HitBox(v) => c.hit_box = v,
        ActorField::Health(v) => c.health = v,
        ActorField::MaxHealth(v) => c.max_health = v,
        ActorField::AttackDamage(v) => c.attack_damage = v,
        ActorField::AttackSpeed(v) => c.attack_speed = v,
        ActorField::AttackRange(v) => c.attack_range = v,
        ActorField::AttackTargetId(v) => c.attack_target_id = v,
        ActorField::LastAttack(v) => c.last_attack = v,
        ActorField::Appearance(v) => actor.appearance = v,
        ActorField::Kind(v) => actor.kind = v,
    }
}

/// Applies every operation in order. Updates for unknown ids are ignored.
pub fn apply_patch(actors: &mut BTreeMap<ActorId, Actor>, patch: &[Operation]) {
    for operation in patch {
        apply_operation(actors, operation.clone());
    }
}

pub fn apply_operation(actors: &mut BTreeMap<ActorId, Actor>, operation: Operation) {
    match operation {
        Operation::Set(id, actor) => {
            actors.insert(id, *actor);
        }
        Operation::Update(id, fields) => {
            if let Some(actor) = actors.get_mut(&id) {
                for field in fields {
                    apply_field(actor, field);
                }
            }
        }
        Operation::Remove(id) => {
            actors.remove(&id);
        }
    }
}
