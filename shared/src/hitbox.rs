//! Hitbox shapes and their placement relative to an owning transform.
//!
//! A hitbox stores its shape and where it sits relative to its parent
//! (offset and relative rotation). The world-space position and rotation
//! are derived values, written only by [`Hitbox::update_placement`] when the
//! parent transform is cleaned.

use crate::{Point, DEFAULT_COLLISION_BIT, DEFAULT_COLLISION_MASK};
use bitflags::bitflags;

/// Geometry of a hitbox, centred on its world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitboxShape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
}

/// How a hitbox separates from the hitboxes it overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitboxCollisionType {
    /// Pushed apart with the correction split by mass.
    #[default]
    Soft,
    /// Blocks movement outright: whatever overlaps it takes the full correction.
    Hard,
}

bitflags! {
    /// Optional per-hitbox behaviour switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HitboxFlags: u8 {
        /// Passes through wall tiles.
        const IGNORES_WALL_COLLISIONS = 1 << 0;
        /// Reports collisions but never pushes or gets pushed.
        const IGNORES_PUSHING = 1 << 1;
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Bounds {
    /// Inverted box that any union will overwrite.
    pub const EMPTY: Bounds = Bounds {
        min_x: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        min_y: f32::INFINITY,
        max_y: f32::NEG_INFINITY,
    };

    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn around(center: Point, half_width: f32, half_height: f32) -> Self {
        Self {
            min_x: center.x - half_width,
            max_x: center.x + half_width,
            min_y: center.y - half_height,
            max_y: center.y + half_height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Inclusive overlap test; touching boxes count as overlapping.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// A circle or rectangle attached to an entity's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Hitbox {
    pub shape: HitboxShape,
    /// Offset from the parent position, in the parent's local frame.
    pub offset: Point,
    pub relative_rotation: f32,
    /// Weight used when distributing soft push corrections.
    pub mass: f32,
    pub collision_type: HitboxCollisionType,
    /// What this hitbox is.
    pub collision_bit: u32,
    /// What this hitbox can hit.
    pub collision_mask: u32,
    pub flags: HitboxFlags,
    position: Point,
    rotation: f32,
}

impl Hitbox {
    pub fn new(shape: HitboxShape) -> Self {
        Self {
            shape,
            offset: Point::ZERO,
            relative_rotation: 0.0,
            mass: 1.0,
            collision_type: HitboxCollisionType::Soft,
            collision_bit: DEFAULT_COLLISION_BIT,
            collision_mask: DEFAULT_COLLISION_MASK,
            flags: HitboxFlags::empty(),
            position: Point::ZERO,
            rotation: 0.0,
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(HitboxShape::Circle { radius })
    }

    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::new(HitboxShape::Rectangle { width, height })
    }

    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_relative_rotation(mut self, rotation: f32) -> Self {
        self.relative_rotation = rotation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_collision(mut self, bit: u32, mask: u32) -> Self {
        self.collision_bit = bit;
        self.collision_mask = mask;
        self
    }

    pub fn with_flags(mut self, flags: HitboxFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn hard(mut self) -> Self {
        self.collision_type = HitboxCollisionType::Hard;
        self
    }

    /// World-space centre, valid after the owning transform was cleaned.
    pub fn position(&self) -> Point {
        self.position
    }

    /// World-space rotation, valid after the owning transform was cleaned.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.shape, HitboxShape::Circle { .. })
    }

    pub fn is_hard(&self) -> bool {
        self.collision_type == HitboxCollisionType::Hard
    }

    pub fn ignores_walls(&self) -> bool {
        self.flags.contains(HitboxFlags::IGNORES_WALL_COLLISIONS)
    }

    pub fn ignores_pushing(&self) -> bool {
        self.flags.contains(HitboxFlags::IGNORES_PUSHING)
    }

    /// Bit/mask gate: each side has to be able to hit the other.
    pub fn can_collide_with(&self, other: &Hitbox) -> bool {
        (self.collision_mask & other.collision_bit) != 0 && (other.collision_mask & self.collision_bit) != 0
    }

    /// Recomputes the world placement from the parent transform.
    pub fn update_placement(&mut self, parent_position: Point, parent_rotation: f32) {
        self.position = parent_position + self.offset.rotate(parent_rotation);
        self.rotation = parent_rotation + self.relative_rotation;
    }

    /// Corners of a rectangle hitbox in world space, counter-clockwise.
    /// A circle has no corners and returns its centre four times.
    pub fn vertices(&self) -> [Point; 4] {
        match self.shape {
            HitboxShape::Circle { .. } => [self.position; 4],
            HitboxShape::Rectangle { width, height } => {
                rectangle_vertices(self.position, width, height, self.rotation)
            }
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self.shape {
            HitboxShape::Circle { radius } => Bounds::around(self.position, radius, radius),
            HitboxShape::Rectangle { .. } => {
                let mut bounds = Bounds::EMPTY;
                for vertex in self.vertices() {
                    bounds.min_x = bounds.min_x.min(vertex.x);
                    bounds.max_x = bounds.max_x.max(vertex.x);
                    bounds.min_y = bounds.min_y.min(vertex.y);
                    bounds.max_y = bounds.max_y.max(vertex.y);
                }
                bounds
            }
        }
    }

    pub fn contains_point(&self, point: Point) -> bool {
        match self.shape {
            HitboxShape::Circle { radius } => self.position.distance_squared_to(point) <= radius * radius,
            HitboxShape::Rectangle { width, height } => {
                let local = (point - self.position).rotate(-self.rotation);
                local.x.abs() <= width / 2.0 && local.y.abs() <= height / 2.0
            }
        }
    }
}

pub(crate) fn rectangle_vertices(center: Point, width: f32, height: f32, rotation: f32) -> [Point; 4] {
    let half_width = width / 2.0;
    let half_height = height / 2.0;
    [
        Point::new(-half_width, -half_height),
        Point::new(half_width, -half_height),
        Point::new(half_width, half_height),
        Point::new(-half_width, half_height),
    ]
    .map(|corner| center + corner.rotate(rotation))
}
