//! Which actors a viewer gets to see

use shared::{Actor, ActorId, Rect};
use std::collections::{BTreeMap, BTreeSet};

/// Square of `view_distance` tiles centered on the observer
pub fn view_rect(observer: &Actor, view_distance: f32) -> Rect {
    Rect::from_diameter(observer.movement.coords, view_distance)
}

pub fn is_visible(observer: &Actor, view_distance: f32, actor: &Actor) -> bool {
    observer.shares_area_with(actor)
        && view_rect(observer, view_distance).contains(actor.movement.coords)
}

/// Ids visible from the observer's character. No observer sees nothing.
pub fn visible_actor_ids(
    actors: &BTreeMap<ActorId, Actor>,
    observer_id: Option<ActorId>,
    view_distance: f32,
) -> BTreeSet<ActorId> {
    let Some(observer) = observer_id.and_then(|id| actors.get(&id)) else {
        return BTreeSet::new();
    };
    actors
        .values()
        .filter(|actor| is_visible(observer, view_distance, actor))
        .map(|actor| actor.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::{character, npc};
    use shared::{AreaId, NpcType};

    fn actors(list: Vec<Actor>) -> BTreeMap<ActorId, Actor> {
        list.into_iter().map(|a| (a.id, a)).collect()
    }

    #[test]
    fn test_observer_sees_itself_and_nearby_actors() {
        let world = actors(vec![
            character(1, 10.0, 10.0),
            npc(1, NpcType::Static, 12.0, 10.0),
            npc(2, NpcType::Static, 30.0, 10.0),
        ]);
        let visible = visible_actor_ids(&world, Some(ActorId::Character(1)), 10.0);
        assert_eq!(
            visible,
            BTreeSet::from([ActorId::Character(1), ActorId::Npc(1)])
        );
    }

    #[test]
    fn test_edges_are_inclusive() {
        let observer = character(1, 10.0, 10.0);
        assert!(is_visible(&observer, 10.0, &npc(1, NpcType::Static, 15.0, 5.0)));
        assert!(!is_visible(&observer, 10.0, &npc(1, NpcType::Static, 15.1, 5.0)));
    }

    #[test]
    fn test_other_areas_are_hidden() {
        let observer = character(1, 10.0, 10.0);
        let mut neighbour = npc(1, NpcType::Static, 10.0, 10.0);
        neighbour.movement.area_id = AreaId::new("cave");
        assert!(!is_visible(&observer, 10.0, &neighbour));
    }

    #[test]
    fn test_without_observer_nothing_is_visible() {
        let world = actors(vec![character(1, 10.0, 10.0)]);
        assert!(visible_actor_ids(&world, None, 10.0).is_empty());
        assert!(visible_actor_ids(&world, Some(ActorId::Character(9)), 10.0).is_empty());
    }
}
