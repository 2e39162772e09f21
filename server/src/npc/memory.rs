use shared::ActorId;
use std::collections::BTreeSet;

/// Attacks one npc has witnessed, as `(attacker, target)` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatMemory {
    combats: BTreeSet<(ActorId, ActorId)>,
}

impl CombatMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_attack(&mut self, attacker: ActorId, target: ActorId) {
        self.combats.insert((attacker, target));
    }

    pub fn has_attacked_each_other(&self, a: ActorId, b: ActorId) -> bool {
        self.combats.contains(&(a, b)) || self.combats.contains(&(b, a))
    }

    pub fn combats(&self) -> impl Iterator<Item = (ActorId, ActorId)> + '_ {
        self.combats.iter().copied()
    }

    /// Drops every pair involving an actor for which `exists` is false
    pub fn retain_actors(&mut self, mut exists: impl FnMut(ActorId) -> bool) {
        self.combats.retain(|(a, b)| exists(*a) && exists(*b));
    }

    pub fn is_empty(&self) -> bool {
        self.combats.is_empty()
    }
}
