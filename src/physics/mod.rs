//! The rigid-body physics engine contract (§6 "Contracts of collaborators").
//!
//! `spec.md` §1 explicitly places broad/narrow phase, the solver, and
//! ray/AABB queries out of scope for the core — the core only consumes an
//! API shaped like this trait. [`native`] is a compact, deterministic
//! implementation sufficient to drive every mechanic in §4 and the
//! properties in §8; a production deployment is free to swap in a real
//! engine behind the same trait.

pub mod native;

use crate::math::Vec2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Kinematic,
    Dynamic,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Box { half_extent: Vec2 },
}

/// Bit category this shape advertises, and the mask of categories it is
/// willing to collide with. Mirrors `enum shapeCategory` in the original
/// engine (WALL=1, FLOATING_WALL=2, PROJECTILE=4, PICKUP=8, DRONE=16).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShapeFilter {
    pub category: u32,
    pub mask: u32,
    pub group: i32,
}

impl ShapeFilter {
    pub const ALL: ShapeFilter = ShapeFilter {
        category: u32::MAX,
        mask: u32::MAX,
        group: 0,
    };

    pub fn new(category: u32, mask: u32) -> Self {
        ShapeFilter {
            category,
            mask,
            group: 0,
        }
    }

    /// Whether a shape with filter `self` should be considered a collision
    /// candidate against a shape with filter `other`.
    pub fn interacts_with(&self, other: &ShapeFilter) -> bool {
        if self.group != 0 && self.group == other.group {
            return self.group > 0;
        }
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

#[derive(Clone, Debug)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub fixed_rotation: bool,
    pub can_sleep: bool,
}

impl Default for BodyDef {
    fn default() -> Self {
        BodyDef {
            kind: BodyKind::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            fixed_rotation: false,
            can_sleep: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ShapeDef {
    pub shape: Shape,
    pub filter: ShapeFilter,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_sensor: bool,
    pub is_bullet: bool,
    pub enable_contact_events: bool,
    pub enable_sensor_events: bool,
}

impl Default for ShapeDef {
    fn default() -> Self {
        ShapeDef {
            shape: Shape::Circle { radius: 0.5 },
            filter: ShapeFilter::ALL,
            density: 1.0,
            friction: 0.3,
            restitution: 0.0,
            is_sensor: false,
            is_bullet: false,
            enable_contact_events: false,
            enable_sensor_events: false,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RayHit {
    pub shape: ShapeId,
    pub point: Vec2,
    pub normal: Vec2,
    pub fraction: f32,
}

#[derive(Copy, Clone, Debug)]
pub struct BodyMoveEvent {
    pub body: BodyId,
    pub position: Vec2,
    pub angle: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

#[derive(Copy, Clone, Debug)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub shape_a: ShapeId,
    pub shape_b: ShapeId,
    pub point: Vec2,
    pub normal: Vec2,
}

#[derive(Copy, Clone, Debug)]
pub struct SensorEvent {
    pub phase: ContactPhase,
    pub sensor: ShapeId,
    pub visitor: ShapeId,
}

/// The externally-specified physics contract. See module docs.
pub trait PhysicsWorld {
    fn step(&mut self, dt: f32, substeps: i32);

    fn create_body(&mut self, def: BodyDef) -> BodyId;
    fn destroy_body(&mut self, id: BodyId);
    fn create_shape(&mut self, body: BodyId, def: ShapeDef) -> ShapeId;
    fn destroy_shape(&mut self, id: ShapeId);

    fn body_of_shape(&self, shape: ShapeId) -> BodyId;
    fn shape_filter(&self, shape: ShapeId) -> ShapeFilter;

    fn transform(&self, id: BodyId) -> (Vec2, f32);
    fn set_transform(&mut self, id: BodyId, pos: Vec2, angle: f32);
    fn linear_velocity(&self, id: BodyId) -> Vec2;
    fn set_linear_velocity(&mut self, id: BodyId, v: Vec2);
    fn set_linear_damping(&mut self, id: BodyId, damping: f32);

    fn apply_linear_impulse(&mut self, id: BodyId, impulse: Vec2);
    fn apply_force(&mut self, id: BodyId, force: Vec2);
    fn apply_angular_impulse(&mut self, id: BodyId, impulse: f32);

    fn overlap_aabb(&self, min: Vec2, max: Vec2, filter: ShapeFilter) -> Vec<ShapeId>;
    fn overlap_circle(&self, center: Vec2, radius: f32, filter: ShapeFilter) -> Vec<ShapeId>;
    fn cast_ray_closest(
        &self,
        origin: Vec2,
        translation: Vec2,
        filter: ShapeFilter,
    ) -> Option<RayHit>;
    /// Distance between the closest points of two shapes (0 if overlapping).
    fn shape_distance(&self, a: ShapeId, b: ShapeId) -> f32;
    fn closest_point_on_shape(&self, shape: ShapeId, point: Vec2) -> Vec2;

    fn create_weld_joint(&mut self, body_a: BodyId, body_b: BodyId, anchor: Vec2) -> JointId;
    fn destroy_joint(&mut self, id: JointId);

    fn take_body_events(&mut self) -> Vec<BodyMoveEvent>;
    fn take_contact_events(&mut self) -> Vec<ContactEvent>;
    fn take_sensor_events(&mut self) -> Vec<SensorEvent>;
}
