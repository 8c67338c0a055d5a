use crate::math::Vec2;
use crate::physics::{BodyId, ShapeId};
use crate::weapons::WeaponKind;

/// A weapon pickup. While `respawn_wait > 0` the pickup is *disabled*: its
/// body is destroyed outright (not merely deactivated) and its cell is
/// unoccupied, per §3.
#[derive(Clone, Debug)]
pub struct WeaponPickup {
    pub body: Option<BodyId>,
    pub shape: Option<ShapeId>,
    pub pos: Vec2,
    pub cell_idx: usize,
    pub weapon: WeaponKind,
    pub respawn_wait: f32,
    pub floating_walls_touching: u8,
    pub body_destroyed: bool,
}

impl WeaponPickup {
    pub fn is_disabled(&self) -> bool {
        self.respawn_wait > 0.0
    }
}
