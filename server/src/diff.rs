//! Patch generation between two snapshots of the actor collection
//!
//! The raw diff is the ground truth. The optimizer stage drops updates the
//! client can predict on its own: small coordinate changes while walking,
//! path tails beyond the next couple of waypoints, and fields the client
//! never reads.

use shared::{actor_fields, Actor, ActorField, ActorId, FieldKey, Operation, Patch, Vector};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchOptimizer {
    pub enabled: bool,
    /// Waypoints of a path that are replicated
    pub path_truncate: usize,
}

impl Default for PatchOptimizer {
    fn default() -> Self {
        Self {
            enabled: true,
            path_truncate: 2,
        }
    }
}

impl PatchOptimizer {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn is_stripped(&self, key: FieldKey) -> bool {
        self.enabled && matches!(key, FieldKey::MoveTarget | FieldKey::LastAttack)
    }

    fn truncate(&self, field: ActorField) -> ActorField {
        match field {
            ActorField::Path(Some(path)) if self.enabled => {
                ActorField::Path(Some(path.into_iter().take(self.path_truncate).collect()))
            }
            other => other,
        }
    }

    fn coords_worth_sending(&self, previous: Vector, next: &Actor) -> bool {
        let current = next.movement.coords;
        if !self.enabled {
            return previous != current;
        }
        previous.round() != current.round() || (next.movement.path.is_none() && previous != current)
    }

    /// The actor as it goes out in a `Set`
    pub fn transform_actor(&self, actor: &Actor) -> Actor {
        let mut actor = actor.clone();
        if self.enabled {
            actor.movement.move_target = None;
            actor.combat.last_attack = None;
            if let Some(path) = actor.movement.path.as_mut() {
                path.truncate(self.path_truncate);
            }
        }
        actor
    }
}

/// Changed fields between two versions of the same actor
pub fn diff_actor(previous: &Actor, next: &Actor, optimizer: &PatchOptimizer) -> Vec<ActorField> {
    actor_fields(previous)
        .into_iter()
        .zip(actor_fields(next))
        .filter_map(|(before, after)| {
            let key = after.key();
            if optimizer.is_stripped(key) {
                return None;
            }
            if key == FieldKey::Coords {
                return optimizer
                    .coords_worth_sending(previous.movement.coords, next)
                    .then_some(after);
            }
            let (before, after) = (optimizer.truncate(before), optimizer.truncate(after));
            (before != after).then_some(after)
        })
        .collect()
}

/// Operations turning `previous` into `next`, in id order
pub fn diff_actors(
    previous: &BTreeMap<ActorId, Actor>,
    next: &BTreeMap<ActorId, Actor>,
    optimizer: &PatchOptimizer,
) -> Patch {
    let ids: BTreeSet<&ActorId> = previous.keys().chain(next.keys()).collect();
    let mut patch = Patch::new();
    for id in ids {
        match (previous.get(id), next.get(id)) {
            (None, Some(actor)) => {
                patch.push(Operation::Set(*id, Box::new(optimizer.transform_actor(actor))));
            }
            (Some(before), Some(after)) => {
                let fields = diff_actor(before, after, optimizer);
                if !fields.is_empty() {
                    patch.push(Operation::Update(*id, fields));
                }
            }
            (Some(_), None) => patch.push(Operation::Remove(*id)),
            (None, None) => {}
        }
    }
    patch
}

/// A `Set` for every given actor
pub fn full_state_patch<'a>(
    actors: impl IntoIterator<Item = &'a Actor>,
    optimizer: &PatchOptimizer,
) -> Patch {
    actors
        .into_iter()
        .map(|actor| Operation::Set(actor.id, Box::new(optimizer.transform_actor(actor))))
        .collect()
}
