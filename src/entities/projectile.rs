use smallvec::SmallVec;

use crate::math::Vec2;
use crate::physics::{BodyId, JointId, ShapeId};
use crate::weapons::WeaponKind;

#[derive(Clone, Debug)]
pub struct Projectile {
    pub body: BodyId,
    pub shape: ShapeId,
    /// Proximity sensor shape for mines (`weapon.proximityDetonates`).
    pub sensor: Option<ShapeId>,
    pub drone_idx: usize,
    pub weapon: WeaponKind,
    pub pos: Vec2,
    pub last_pos: Vec2,
    pub velocity: Vec2,
    pub last_velocity: Vec2,
    pub speed: f32,
    pub last_speed: f32,
    pub distance: f32,
    pub bounces: u8,
    pub contacts: u32,
    pub needs_to_be_destroyed: bool,
    /// Set once a mine has welded to a wall.
    pub set_mine: bool,
    pub weld_joint: Option<JointId>,
    /// Drones currently on the far side of a wall from this mine, recorded
    /// so the projectile step can re-test line-of-sight each tick (§4.3).
    pub drones_behind_walls: SmallVec<[u8; crate::constants::MAX_DRONES]>,
}

impl Projectile {
    pub fn is_mine(&self) -> bool {
        crate::weapons::weapon_info(self.weapon).proximity_detonates
    }
}
