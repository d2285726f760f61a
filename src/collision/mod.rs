//! Discrete collision detection and the contact data it produces.

mod constraint;

pub use constraint::{ActiveCollision, CollisionConstraint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyHandle};
use crate::constraint::Anchor;
use crate::math::{Interval, Vec2};

//----------------------------------------------------------------------------------
// Types and Structures Definition
//----------------------------------------------------------------------------------
/// Surface response coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Fraction of closing speed returned as separating speed (0 to 1)
    pub restitution: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
}

impl Material {
    pub const fn new(restitution: f32, friction: f32) -> Self {
        Material { restitution, friction }
    }

    /// Combined coefficients for a contact between two materials (geometric mean)
    pub fn mix(self, other: Material) -> Material {
        Material {
            restitution: (self.restitution*other.restitution).max(0.0).sqrt(),
            friction: (self.friction*other.friction).max(0.0).sqrt(),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::new(crate::DEFAULT_RESTITUTION, crate::DEFAULT_FRICTION)
    }
}

/// A single contact between a body and another body or static geometry
///
/// Produced fresh every tick by a detector, consumed once to build a [`CollisionConstraint`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    pub body_a: BodyHandle,
    /// `None` when the other side is static geometry
    pub body_b: Option<BodyHandle>,
    /// Contact point relative to body A's centre
    pub offset_a: Vec2,
    /// Contact point relative to body B's centre, or in world space when `body_b` is `None`
    pub offset_b: Vec2,
    /// Unit normal pointing from A toward B
    pub normal: Vec2,
    /// Overlap depth, positive when penetrating
    pub penetration: f32,
    pub restitution: f32,
    pub friction: f32,
}

impl CollisionData {
    pub fn anchor_a(&self) -> Anchor {
        Anchor::body(self.body_a, self.offset_a)
    }

    pub fn anchor_b(&self) -> Anchor {
        match self.body_b {
            Some(handle) => Anchor::body(handle, self.offset_b),
            None => Anchor::World,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f32,
}

/// Straight boundary piece between two world points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Vec2,
    pub end: Vec2,
}

impl LineSegment {
    pub const fn new(start: Vec2, end: Vec2) -> Self {
        LineSegment { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Unit direction from start to end (zero for a degenerate segment)
    pub fn tangent(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }

    /// Unit normal, the tangent turned a quarter counter-clockwise
    pub fn normal(&self) -> Vec2 {
        self.tangent().perp()
    }

    /// Point on the segment closest to `point`
    ///
    /// Projects into the segment's tangent frame and clamps the projection to the segment's span.
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let tangent = self.tangent();
        let span = Interval::new(0.0, self.length());
        let along = span.clamp((point - self.start).dot(tangent));
        self.start + tangent*along
    }

    /// Whether `point` projects inside the segment's span (not past either end)
    pub fn projects_inside(&self, point: Vec2) -> bool {
        let along = (point - self.start).dot(self.tangent());
        Interval::new(0.0, self.length()).contains(along)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.start += delta;
        self.end += delta;
    }
}

/// Rigid static boundary made of an ordered run of segments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticShape {
    segments: Vec<LineSegment>,
    pub material: Material,
}

impl StaticShape {
    pub fn new(segments: Vec<LineSegment>, material: Material) -> Self {
        StaticShape { segments, material }
    }

    /// Open polyline through `points` in order
    pub fn polyline(points: &[Vec2], material: Material) -> Self {
        let segments = points
            .windows(2)
            .map(|pair| LineSegment::new(pair[0], pair[1]))
            .collect();
        StaticShape { segments, material }
    }

    /// Closed loop through `points`, joining the last point back to the first
    pub fn closed_loop(points: &[Vec2], material: Material) -> Self {
        let mut shape = StaticShape::polyline(points, material);
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if points.len() > 2 && first != last {
                shape.segments.push(LineSegment::new(last, first));
            }
        }
        shape
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn translate(&mut self, delta: Vec2) {
        for segment in &mut self.segments {
            segment.translate(delta);
        }
    }
}

//----------------------------------------------------------------------------------
// Detectors
//----------------------------------------------------------------------------------
/// Contact between a circle body and a single segment, if they overlap
///
/// Returns `None` when separated, and also when the centre lies exactly on the segment (no
/// usable normal).
pub fn circle_vs_segment(
    handle: BodyHandle,
    body: &Body,
    circle: Circle,
    segment: &LineSegment,
    material: Material,
) -> Option<CollisionData> {
    circle_segment_contact(handle, body, circle, segment, material)
        .filter(|contact| contact.penetration >= 0.0)
}

/// Contact geometry toward the closest point of `segment` whether or not the circle overlaps it
///
/// Penetration comes out negative for a separated circle. Used to resolve swept impacts, where
/// the circle is stopped a hair short of the segment.
pub fn circle_segment_contact(
    handle: BodyHandle,
    body: &Body,
    circle: Circle,
    segment: &LineSegment,
    material: Material,
) -> Option<CollisionData> {
    let center = body.position();
    let closest = segment.closest_point(center);
    let offset = closest - center;
    let normal = offset.try_normalize()?;

    Some(CollisionData {
        body_a: handle,
        body_b: None,
        offset_a: normal*circle.radius,
        offset_b: closest,
        normal,
        penetration: circle.radius - offset.length(),
        restitution: material.restitution,
        friction: material.friction,
    })
}

/// One contact per penetrated segment of `shape`; contacts are not merged across segments
pub fn circle_vs_shape<'a>(
    handle: BodyHandle,
    body: &'a Body,
    circle: Circle,
    body_material: Material,
    shape: &'a StaticShape,
) -> impl Iterator<Item = CollisionData> + 'a {
    let material = body_material.mix(shape.material);
    shape
        .segments()
        .iter()
        .filter_map(move |segment| circle_vs_segment(handle, body, circle, segment, material))
}

/// Contact between two circle bodies, normal from A toward B
///
/// Coincident centres produce no contact.
pub fn circle_vs_circle(
    (handle_a, body_a, circle_a, material_a): (BodyHandle, &Body, Circle, Material),
    (handle_b, body_b, circle_b, material_b): (BodyHandle, &Body, Circle, Material),
) -> Option<CollisionData> {
    let delta = body_b.position() - body_a.position();
    let radius = circle_a.radius + circle_b.radius;

    if delta.length_sqr() >= radius*radius {
        return None;
    }

    let normal = delta.try_normalize()?;
    let material = material_a.mix(material_b);

    Some(CollisionData {
        body_a: handle_a,
        body_b: Some(handle_b),
        offset_a: normal*circle_a.radius,
        offset_b: -normal*circle_b.radius,
        normal,
        penetration: radius - delta.length(),
        restitution: material.restitution,
        friction: material.friction,
    })
}
