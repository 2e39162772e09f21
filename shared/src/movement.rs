//! Path following shared by the server tick and client frame interpolation
//!
//! Both sides call [`move_along_path`] with the same inputs and must end up on
//! the same trajectory, so this module stays free of any side-specific state.

use crate::math::{Path, Vector};
use std::time::Duration;

/// Advances `coords` along `path` by `speed * elapsed` tiles.
///
/// Waypoints are consumed in order. Reaching the final waypoint returns it
/// exactly together with `None`; otherwise the interpolated position and the
/// waypoints still ahead are returned. The distance travelled never exceeds
/// the budget.
pub fn move_along_path(
    coords: Vector,
    path: &[Vector],
    speed: f32,
    elapsed: Duration,
) -> (Vector, Option<Path>) {
    let mut budget = (speed * elapsed.as_secs_f32()).max(0.0);
    let mut current = coords;

    for (index, waypoint) in path.iter().enumerate() {
        let distance = current.distance(*waypoint);
        if budget >= distance {
            budget -= distance;
            current = *waypoint;
            continue;
        }

        let next = current.step_towards(*waypoint, budget);
        return (next, Some(path[index..].to_vec()));
    }

    (current, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_reaches_final_waypoint_exactly() {
        let path = vec![Vector::new(1.0, 0.0), Vector::new(1.0, 1.0)];
        let (coords, remaining) = move_along_path(Vector::ZERO, &path, 1.0, secs(5.0));
        assert_eq!(coords, Vector::new(1.0, 1.0));
        assert!(remaining.is_none());
    }

    #[test]
    fn test_exact_budget_consumes_path() {
        let path = vec![Vector::new(2.0, 0.0)];
        let (coords, remaining) = move_along_path(Vector::ZERO, &path, 2.0, secs(1.0));
        assert_eq!(coords, Vector::new(2.0, 0.0));
        assert!(remaining.is_none());
    }

    #[test]
    fn test_partial_progress_keeps_remaining_waypoints() {
        let path = vec![
            Vector::new(1.0, 0.0),
            Vector::new(2.0, 0.0),
            Vector::new(3.0, 0.0),
        ];
        let (coords, remaining) = move_along_path(Vector::ZERO, &path, 3.0, secs(0.5));
        assert_approx_eq!(coords.x, 1.5, 1e-5);
        assert_eq!(coords.y, 0.0);
        let remaining = remaining.unwrap();
        assert_eq!(remaining, vec![Vector::new(2.0, 0.0), Vector::new(3.0, 0.0)]);
    }

    #[test]
    fn test_zero_elapsed_does_not_move() {
        let path = vec![Vector::new(4.0, 4.0)];
        let start = Vector::new(1.0, 1.0);
        let (coords, remaining) = move_along_path(start, &path, 5.0, Duration::ZERO);
        assert_eq!(coords, start);
        assert_eq!(remaining, Some(path));
    }

    #[test]
    fn test_waypoint_on_current_position_is_consumed() {
        let start = Vector::new(2.0, 2.0);
        let path = vec![start, Vector::new(3.0, 2.0)];
        let (coords, remaining) = move_along_path(start, &path, 1.0, secs(0.25));
        assert_approx_eq!(coords.x, 2.25, 1e-5);
        assert_eq!(remaining, Some(vec![Vector::new(3.0, 2.0)]));
    }

    #[test]
    fn test_empty_path_returns_input() {
        let start = Vector::new(7.0, 3.0);
        let (coords, remaining) = move_along_path(start, &[], 5.0, secs(1.0));
        assert_eq!(coords, start);
        assert!(remaining.is_none());
    }

    #[test]
    fn test_never_displaces_more_than_budget() {
        let path = vec![
            Vector::new(0.3, 0.9),
            Vector::new(-2.0, 4.5),
            Vector::new(6.0, -1.25),
            Vector::new(6.5, 8.0),
        ];
        let start = Vector::new(0.1, 0.2);
        for step in 1..200 {
            let dt = step as f32 * 0.013;
            let speed = 3.7;
            let (coords, _) = move_along_path(start, &path, speed, secs(dt));
            assert!(start.distance(coords) <= speed * dt + 1e-4);
        }
    }

    #[test]
    fn test_many_small_steps_match_one_big_step() {
        let path = vec![Vector::new(4.0, 0.0), Vector::new(4.0, 4.0)];
        let mut coords = Vector::ZERO;
        let mut remaining = Some(path.clone());
        for _ in 0..100 {
            if let Some(p) = remaining.as_deref() {
                let (c, r) = move_along_path(coords, p, 2.0, secs(0.05));
                coords = c;
                remaining = r;
            }
        }
        assert_eq!(coords, Vector::new(4.0, 4.0));
        assert!(remaining.is_none());
    }
}
