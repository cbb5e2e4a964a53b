//! # Shared Geometry
//!
//! Leaf crate holding the world-independent pieces of the simulation core:
//! vector math, hitbox shapes, narrow-phase shape tests and tile properties.
//! Nothing in here knows about entities, chunks or ticks, which keeps the
//! geometry usable from gameplay collaborators without pulling in the world.
//!
//! ## Coordinate System
//! World space is measured in world units with the origin in the top-left
//! corner of the map. Angles are in radians and are kept in `[-PI, PI)`.
//! Rotating a point by `angle` uses the standard counter-clockwise rotation
//! matrix.

pub mod collision;
pub mod hitbox;
pub mod tiles;

pub use collision::{
    circle_and_rectangle_collide, circles_collide, hitbox_contact, hitboxes_collide,
    rectangles_collide, HitboxContact,
};
pub use hitbox::{Bounds, Hitbox, HitboxCollisionType, HitboxFlags, HitboxShape};
pub use tiles::{Biome, TileType};

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

pub const DEFAULT_TILE_SIZE: f32 = 64.0;
pub const DEFAULT_CHUNK_SIZE: u32 = 4;
pub const DEFAULT_WORLD_SIZE: u32 = 128;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Collision bit carried by hitboxes that don't ask for anything else.
pub const DEFAULT_COLLISION_BIT: u32 = 1;
/// Mask that accepts every collision bit.
pub const DEFAULT_COLLISION_MASK: u32 = u32::MAX;

/// Velocity added per second by a river tile's flow.
pub const RIVER_FLOW_FORCE: f32 = 240.0;

/// A point or vector in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Builds a vector of the given length pointing along `angle`.
    pub fn from_angle(magnitude: f32, angle: f32) -> Self {
        Self {
            x: magnitude * angle.cos(),
            y: magnitude * angle.sin(),
        }
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        (other - *self).length()
    }

    pub fn distance_squared_to(&self, other: Point) -> f32 {
        (other - *self).length_squared()
    }

    pub fn dot(&self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Returns the unit vector, or zero for a zero-length vector.
    pub fn normalize(&self) -> Point {
        let length = self.length();
        if length == 0.0 {
            Point::ZERO
        } else {
            Point {
                x: self.x / length,
                y: self.y / length,
            }
        }
    }

    pub fn scale(&self, scalar: f32) -> Point {
        Point {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Rotates the vector counter-clockwise by `angle` radians.
    pub fn rotate(&self, angle: f32) -> Point {
        let (sin, cos) = angle.sin_cos();
        Point {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Angle of the vector measured from the positive x axis.
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, scalar: f32) -> Point {
        self.scale(scalar)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Point) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, other: Point) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

/// Wraps an angle into `[-PI, PI)`.
pub fn normalize_angle(angle: f32) -> f32 {
    let mut wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    // rem_euclid can round up to the divisor itself
    if wrapped >= PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Signed shortest angular distance from `from` to `to`.
pub fn angle_difference(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, -2.0);

        assert_eq!(a + b, Point::new(4.0, 2.0));
        assert_eq!(a - b, Point::new(2.0, 6.0));
        assert_eq!(a * 2.0, Point::new(6.0, 8.0));
        assert_eq!(-a, Point::new(-3.0, -4.0));
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.dot(b), -5.0);
    }

    #[test]
    fn test_normalize_zero_vector() {
        assert_eq!(Point::ZERO.normalize(), Point::ZERO);

        let unit = Point::new(0.0, 10.0).normalize();
        assert_approx_eq!(unit.y, 1.0, 1e-6);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let rotated = Point::new(1.0, 0.0).rotate(PI / 2.0);
        assert_approx_eq!(rotated.x, 0.0, 1e-6);
        assert_approx_eq!(rotated.y, 1.0, 1e-6);
    }

    #[test]
    fn test_from_angle() {
        let vector = Point::from_angle(2.0, PI);
        assert_approx_eq!(vector.x, -2.0, 1e-6);
        assert_approx_eq!(vector.y, 0.0, 1e-5);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert_approx_eq!(normalize_angle(3.0 * PI / 2.0), -PI / 2.0, 1e-5);
        assert_approx_eq!(normalize_angle(-3.0 * PI / 2.0), PI / 2.0, 1e-5);
        assert_approx_eq!(normalize_angle(0.25), 0.25, 1e-6);

        for step in -40..40 {
            let wrapped = normalize_angle(step as f32 * 0.37);
            assert!(wrapped >= -PI && wrapped < PI);
        }
    }

    #[test]
    fn test_normalize_angle_pi_maps_to_negative_pi() {
        assert_approx_eq!(normalize_angle(PI), -PI, 1e-5);
    }

    #[test]
    fn test_angle_difference_takes_short_way() {
        assert_approx_eq!(angle_difference(PI - 0.1, -PI + 0.1), 0.2, 1e-5);
        assert_approx_eq!(angle_difference(0.5, 0.2), -0.3, 1e-6);
    }
}
