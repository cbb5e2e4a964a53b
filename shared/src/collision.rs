//! Narrow-phase shape tests.
//!
//! Circle/circle compares centre distance against the radius sum, circle/rectangle
//! de-rotates the circle into the rectangle's frame and clamp-tests it, and
//! rectangle/rectangle runs the Separating Axis Theorem over the four face
//! normals. Every contact reports a separation axis pointing from the first
//! shape toward the second.

use crate::hitbox::{rectangle_vertices, Hitbox, HitboxShape};
use crate::Point;

/// Overlap between two hitboxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxContact {
    /// Unit separation axis pointing from the first hitbox toward the second.
    pub axis: Point,
    /// Penetration depth along `axis`. Zero for shapes that only touch.
    pub overlap: f32,
    /// Approximate point where the shapes meet.
    pub point: Point,
}

impl HitboxContact {
    /// The same contact seen from the second hitbox.
    pub fn reversed(&self) -> HitboxContact {
        HitboxContact {
            axis: -self.axis,
            overlap: self.overlap,
            point: self.point,
        }
    }
}

/// Circles collide when the centre distance is at most the radius sum.
pub fn circles_collide(position1: Point, radius1: f32, position2: Point, radius2: f32) -> bool {
    let radius_sum = radius1 + radius2;
    position1.distance_squared_to(position2) <= radius_sum * radius_sum
}

pub fn circle_and_rectangle_collide(
    circle_position: Point,
    radius: f32,
    rect_position: Point,
    width: f32,
    height: f32,
    rect_rotation: f32,
) -> bool {
    let local = (circle_position - rect_position).rotate(-rect_rotation);
    circle_overlaps_local_rectangle(local, radius, width / 2.0, height / 2.0)
}

#[allow(clippy::too_many_arguments)]
pub fn rectangles_collide(
    position1: Point,
    width1: f32,
    height1: f32,
    rotation1: f32,
    position2: Point,
    width2: f32,
    height2: f32,
    rotation2: f32,
) -> bool {
    rectangle_contact(
        position1, width1, height1, rotation1, position2, width2, height2, rotation2,
    )
    .is_some()
}

pub fn hitboxes_collide(first: &Hitbox, second: &Hitbox) -> bool {
    hitbox_contact(first, second).is_some()
}

/// Exact shape test between two cleaned hitboxes.
///
/// Returns `None` when the shapes are apart. The contact axis points from
/// `first` toward `second`.
pub fn hitbox_contact(first: &Hitbox, second: &Hitbox) -> Option<HitboxContact> {
    match (first.shape, second.shape) {
        (HitboxShape::Circle { radius: radius1 }, HitboxShape::Circle { radius: radius2 }) => {
            circle_contact(first.position(), radius1, second.position(), radius2)
        }
        (HitboxShape::Circle { radius }, HitboxShape::Rectangle { width, height }) => {
            circle_rectangle_contact(
                first.position(),
                radius,
                second.position(),
                width,
                height,
                second.rotation(),
            )
        }
        (HitboxShape::Rectangle { width, height }, HitboxShape::Circle { radius }) => {
            circle_rectangle_contact(
                second.position(),
                radius,
                first.position(),
                width,
                height,
                first.rotation(),
            )
            .map(|contact| contact.reversed())
        }
        (
            HitboxShape::Rectangle {
                width: width1,
                height: height1,
            },
            HitboxShape::Rectangle {
                width: width2,
                height: height2,
            },
        ) => rectangle_contact(
            first.position(),
            width1,
            height1,
            first.rotation(),
            second.position(),
            width2,
            height2,
            second.rotation(),
        ),
    }
}

fn circle_contact(position1: Point, radius1: f32, position2: Point, radius2: f32) -> Option<HitboxContact> {
    if !circles_collide(position1, radius1, position2, radius2) {
        return None;
    }

    let offset = position2 - position1;
    let distance = offset.length();
    // Coincident centres have no direction; pick a fixed one so results stay deterministic
    let axis = if distance > 0.0 {
        offset.scale(1.0 / distance)
    } else {
        Point::new(0.0, 1.0)
    };
    let overlap = radius1 + radius2 - distance;

    Some(HitboxContact {
        axis,
        overlap,
        point: position1 + axis * (radius1 - overlap / 2.0),
    })
}

/// Clamp test against the half-extents, with the corner distance deciding
/// the rounded-corner region.
fn circle_overlaps_local_rectangle(local: Point, radius: f32, half_width: f32, half_height: f32) -> bool {
    let dx = local.x.abs();
    let dy = local.y.abs();

    if dx > half_width + radius || dy > half_height + radius {
        return false;
    }
    if dx <= half_width || dy <= half_height {
        return true;
    }

    let corner_x = dx - half_width;
    let corner_y = dy - half_height;
    corner_x * corner_x + corner_y * corner_y <= radius * radius
}

/// Contact with the axis pointing from the circle toward the rectangle.
fn circle_rectangle_contact(
    circle_position: Point,
    radius: f32,
    rect_position: Point,
    width: f32,
    height: f32,
    rect_rotation: f32,
) -> Option<HitboxContact> {
    let half_width = width / 2.0;
    let half_height = height / 2.0;
    let local = (circle_position - rect_position).rotate(-rect_rotation);

    if !circle_overlaps_local_rectangle(local, radius, half_width, half_height) {
        return None;
    }

    let clamped = Point::new(
        local.x.clamp(-half_width, half_width),
        local.y.clamp(-half_height, half_height),
    );

    // Normal in the rectangle's frame, pointing from the rectangle toward the circle
    let (normal, overlap) = if clamped != local {
        let difference = local - clamped;
        let distance = difference.length();
        (difference.scale(1.0 / distance), radius - distance)
    } else {
        let penetration_x = half_width - local.x.abs();
        let penetration_y = half_height - local.y.abs();
        if penetration_x < penetration_y {
            (Point::new(local.x.signum(), 0.0), radius + penetration_x)
        } else {
            (Point::new(0.0, local.y.signum()), radius + penetration_y)
        }
    };

    Some(HitboxContact {
        axis: -normal.rotate(rect_rotation),
        overlap,
        point: rect_position + clamped.rotate(rect_rotation),
    })
}

fn project(vertices: &[Point; 4], axis: Point) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for vertex in vertices {
        let projection = vertex.dot(axis);
        min = min.min(projection);
        max = max.max(projection);
    }
    (min, max)
}

#[allow(clippy::too_many_arguments)]
fn rectangle_contact(
    position1: Point,
    width1: f32,
    height1: f32,
    rotation1: f32,
    position2: Point,
    width2: f32,
    height2: f32,
    rotation2: f32,
) -> Option<HitboxContact> {
    let vertices1 = rectangle_vertices(position1, width1, height1, rotation1);
    let vertices2 = rectangle_vertices(position2, width2, height2, rotation2);

    let axes = [
        Point::new(1.0, 0.0).rotate(rotation1),
        Point::new(0.0, 1.0).rotate(rotation1),
        Point::new(1.0, 0.0).rotate(rotation2),
        Point::new(0.0, 1.0).rotate(rotation2),
    ];

    let mut separation_axis = axes[0];
    let mut min_overlap = f32::INFINITY;

    for axis in axes {
        let (min1, max1) = project(&vertices1, axis);
        let (min2, max2) = project(&vertices2, axis);

        let overlap = max1.min(max2) - min1.max(min2);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            separation_axis = axis;
        }
    }

    if separation_axis.dot(position2 - position1) < 0.0 {
        separation_axis = -separation_axis;
    }

    Some(HitboxContact {
        axis: separation_axis,
        overlap: min_overlap,
        point: (position1 + position2).scale(0.5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::PI;

    fn placed(mut hitbox: Hitbox, x: f32, y: f32, rotation: f32) -> Hitbox {
        hitbox.update_placement(Point::new(x, y), rotation);
        hitbox
    }

    #[test]
    fn test_circles_within_radius_sum() {
        assert!(circles_collide(Point::new(0.0, 0.0), 6.0, Point::new(10.0, 0.0), 5.0));
        assert!(!circles_collide(Point::new(0.0, 0.0), 6.0, Point::new(12.0, 0.0), 5.0));
    }

    #[test]
    fn test_circles_touching_collide() {
        assert!(circles_collide(Point::new(0.0, 0.0), 5.0, Point::new(10.0, 0.0), 5.0));
    }

    #[test]
    fn test_circle_above_rectangle() {
        let rect = Point::new(0.0, 0.0);
        assert!(!circle_and_rectangle_collide(Point::new(0.0, 20.0), 5.0, rect, 10.0, 10.0, 0.0));
        assert!(circle_and_rectangle_collide(Point::new(0.0, 9.0), 5.0, rect, 10.0, 10.0, 0.0));
    }

    #[test]
    fn test_circle_near_rectangle_corner() {
        let rect = Point::new(0.0, 0.0);
        // Inside the clamp box but outside the rounded corner
        assert!(!circle_and_rectangle_collide(Point::new(9.0, 9.0), 5.0, rect, 10.0, 10.0, 0.0));
        assert!(circle_and_rectangle_collide(Point::new(8.0, 8.0), 5.0, rect, 10.0, 10.0, 0.0));
    }

    #[test]
    fn test_circle_against_rotated_rectangle() {
        // A 40x4 bar rotated upright reaches the circle only after rotation
        let rect = Point::new(0.0, 0.0);
        assert!(!circle_and_rectangle_collide(Point::new(0.0, 15.0), 2.0, rect, 40.0, 4.0, 0.0));
        assert!(circle_and_rectangle_collide(Point::new(0.0, 15.0), 2.0, rect, 40.0, 4.0, PI / 2.0));
    }

    #[test]
    fn test_rectangles_separated_by_rotated_axis() {
        // Bounding boxes overlap but a diagonal axis separates them
        assert!(!rectangles_collide(
            Point::new(0.0, 0.0),
            10.0,
            10.0,
            0.0,
            Point::new(12.0, 12.0),
            10.0,
            10.0,
            PI / 4.0,
        ));
        assert!(rectangles_collide(
            Point::new(0.0, 0.0),
            10.0,
            10.0,
            0.0,
            Point::new(8.0, 3.0),
            10.0,
            10.0,
            PI / 4.0,
        ));
    }

    #[test]
    fn test_rectangles_touching_do_not_collide() {
        assert!(!rectangles_collide(
            Point::new(0.0, 0.0),
            10.0,
            10.0,
            0.0,
            Point::new(10.0, 0.0),
            10.0,
            10.0,
            0.0,
        ));
    }

    #[test]
    fn test_rectangle_contact_axis_points_at_second() {
        let first = placed(Hitbox::rectangle(10.0, 10.0), 0.0, 0.0, 0.0);
        let second = placed(Hitbox::rectangle(10.0, 10.0), 8.0, 1.0, 0.0);

        let contact = hitbox_contact(&first, &second).unwrap();
        assert_approx_eq!(contact.axis.x, 1.0, 1e-6);
        assert_approx_eq!(contact.axis.y, 0.0, 1e-6);
        assert_approx_eq!(contact.overlap, 2.0, 1e-5);

        let reversed = hitbox_contact(&second, &first).unwrap();
        assert_approx_eq!(reversed.axis.x, -1.0, 1e-6);
    }

    #[test]
    fn test_circle_contact_overlap() {
        let first = placed(Hitbox::circle(6.0), 0.0, 0.0, 0.0);
        let second = placed(Hitbox::circle(5.0), 10.0, 0.0, 0.0);

        let contact = hitbox_contact(&first, &second).unwrap();
        assert_approx_eq!(contact.overlap, 1.0, 1e-6);
        assert_approx_eq!(contact.axis.x, 1.0, 1e-6);
        assert_approx_eq!(contact.point.x, 5.5, 1e-6);
    }

    #[test]
    fn test_coincident_circles_have_fixed_axis() {
        let first = placed(Hitbox::circle(3.0), 4.0, 4.0, 0.0);
        let second = placed(Hitbox::circle(3.0), 4.0, 4.0, 0.0);

        let contact = hitbox_contact(&first, &second).unwrap();
        assert_eq!(contact.axis, Point::new(0.0, 1.0));
        assert_approx_eq!(contact.overlap, 6.0, 1e-6);
    }

    #[test]
    fn test_circle_rectangle_contact_order() {
        let circle = placed(Hitbox::circle(5.0), 0.0, 9.0, 0.0);
        let rect = placed(Hitbox::rectangle(10.0, 10.0), 0.0, 0.0, 0.0);

        let from_circle = hitbox_contact(&circle, &rect).unwrap();
        assert_approx_eq!(from_circle.axis.y, -1.0, 1e-6);
        assert_approx_eq!(from_circle.overlap, 1.0, 1e-5);

        let from_rect = hitbox_contact(&rect, &circle).unwrap();
        assert_approx_eq!(from_rect.axis.y, 1.0, 1e-6);
    }

    #[test]
    fn test_circle_centre_inside_rectangle() {
        let circle = placed(Hitbox::circle(2.0), 3.0, 0.0, 0.0);
        let rect = placed(Hitbox::rectangle(10.0, 10.0), 0.0, 0.0, 0.0);

        let contact = hitbox_contact(&circle, &rect).unwrap();
        // Shortest way out is through the +x face
        assert_approx_eq!(contact.axis.x, -1.0, 1e-6);
        assert_approx_eq!(contact.overlap, 4.0, 1e-5);
    }
}
