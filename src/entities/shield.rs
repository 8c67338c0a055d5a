use crate::math::Vec2;
use crate::physics::{BodyId, ShapeId};

/// Owned 1:1 by a [`super::drone::Drone`] — the spec models it as its own
/// record with a back-reference to the drone, but since nothing else ever
/// reaches a shield except through its owning drone, embedding it directly
/// avoids a redundant container + back-pointer pair.
#[derive(Clone, Debug)]
pub struct Shield {
    /// Kinematic body kept in lockstep with the owning drone every tick.
    pub body: BodyId,
    /// The buffer shape attached to `body` that actually absorbs contacts.
    pub buffer_shape: ShapeId,
    pub pos: Vec2,
    pub health: f32,
    pub duration: f32,
}

impl Shield {
    pub fn is_expired(&self) -> bool {
        self.duration <= 0.0 || self.health <= 0.0
    }
}
