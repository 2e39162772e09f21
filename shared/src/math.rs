//! Tile-space geometry used by the simulation on both sides of the wire

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;

/// A position or offset measured in tiles
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Vector) -> f32 {
        self.squared_distance(other).sqrt()
    }

    pub fn squared_distance(&self, other: Vector) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Radian angle of the line from `self` towards `other`
    pub fn angle(&self, other: Vector) -> f32 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Nearest whole tile
    pub fn round(&self) -> Vector {
        Vector::new(self.x.round(), self.y.round())
    }

    pub fn is_whole(&self) -> bool {
        self.x.fract() == 0.0 && self.y.fract() == 0.0
    }

    /// Moves `distance` tiles from `self` along the line towards `target`
    pub fn step_towards(&self, target: Vector, distance: f32) -> Vector {
        let total = self.distance(target);
        if total <= distance || total == 0.0 {
            return target;
        }
        let t = distance / total;
        Vector::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
        )
    }

    pub fn is_within_distance(&self, other: Vector, distance: f32) -> bool {
        self.squared_distance(other) <= distance * distance
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Ordered list of waypoints an actor walks through
pub type Path = Vec<Vector>;

/// Total distance of walking from `from` through every waypoint of `path`
pub fn path_length(from: Vector, path: &[Vector]) -> f32 {
    let mut current = from;
    let mut total = 0.0;
    for waypoint in path {
        total += current.distance(*waypoint);
        current = *waypoint;
    }
    total
}

/// Axis-aligned rectangle in tile space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `diameter` centered on `center`
    pub fn from_diameter(center: Vector, diameter: f32) -> Self {
        let half = diameter / 2.0;
        Self::new(center.x - half, center.y - half, diameter, diameter)
    }

    /// Inclusive on every edge
    pub fn contains(&self, point: Vector) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn offset(&self, by: Vector) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CardinalDirection {
    #[default]
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
}

impl CardinalDirection {
    pub const ALL: [CardinalDirection; 8] = [
        CardinalDirection::East,
        CardinalDirection::SouthEast,
        CardinalDirection::South,
        CardinalDirection::SouthWest,
        CardinalDirection::West,
        CardinalDirection::NorthWest,
        CardinalDirection::North,
        CardinalDirection::NorthEast,
    ];
}

/// Snaps a radian angle to one of the eight compass directions.
///
/// Tile space has y pointing down, so a positive angle faces south.
pub fn nearest_cardinal_direction(angle: f32) -> CardinalDirection {
    let octant = (angle / (PI / 4.0)).round() as i32;
    let index = octant.rem_euclid(8) as usize;
    CardinalDirection::ALL[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_distance() {
        let a = Vector::new(0.0, 0.0);
        let b = Vector::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(a.squared_distance(b), 25.0);
    }

    #[test]
    fn test_step_towards_partial() {
        let a = Vector::new(0.0, 0.0);
        let b = Vector::new(10.0, 0.0);
        let c = a.step_towards(b, 2.5);
        assert_approx_eq!(c.x, 2.5, 1e-6);
        assert_eq!(c.y, 0.0);
    }

    #[test]
    fn test_step_towards_never_passes_target() {
        let a = Vector::new(1.0, 1.0);
        let b = Vector::new(2.0, 2.0);
        assert_eq!(a.step_towards(b, 100.0), b);
    }

    #[test]
    fn test_path_length() {
        let path = vec![Vector::new(1.0, 0.0), Vector::new(1.0, 2.0)];
        assert_approx_eq!(path_length(Vector::ZERO, &path), 3.0, 1e-6);
        assert_eq!(path_length(Vector::ZERO, &[]), 0.0);
    }

    #[test]
    fn test_rect_contains_is_inclusive() {
        let rect = Rect::from_diameter(Vector::new(5.0, 5.0), 4.0);
        assert!(rect.contains(Vector::new(3.0, 3.0)));
        assert!(rect.contains(Vector::new(7.0, 7.0)));
        assert!(!rect.contains(Vector::new(7.01, 5.0)));
    }

    #[test]
    fn test_nearest_cardinal_direction() {
        let origin = Vector::ZERO;
        assert_eq!(
            nearest_cardinal_direction(origin.angle(Vector::new(1.0, 0.0))),
            CardinalDirection::East
        );
        assert_eq!(
            nearest_cardinal_direction(origin.angle(Vector::new(0.0, 1.0))),
            CardinalDirection::South
        );
        assert_eq!(
            nearest_cardinal_direction(origin.angle(Vector::new(-1.0, 0.0))),
            CardinalDirection::West
        );
        assert_eq!(
            nearest_cardinal_direction(origin.angle(Vector::new(-1.0, -1.0))),
            CardinalDirection::NorthWest
        );
    }

    #[test]
    fn test_round_and_whole() {
        assert_eq!(Vector::new(1.4, 2.6).round(), Vector::new(1.0, 3.0));
        assert!(Vector::new(3.0, 4.0).is_whole());
        assert!(!Vector::new(3.5, 4.0).is_whole());
    }
}
