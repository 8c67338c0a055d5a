use crate::constants::MAX_DRONES;
use crate::math::Vec2;
use crate::physics::{BodyId, ShapeId};
use crate::weapons::WeaponKind;

use super::shield::Shield;
use super::stats::{DroneStats, DroneStepInfo};

#[derive(Clone, Debug)]
pub struct Drone {
    pub body: BodyId,
    pub shape: ShapeId,
    pub idx: usize,
    pub team: u8,
    pub weapon: WeaponKind,
    pub ammo: i8,
    pub weapon_cooldown: f32,
    pub weapon_charge: f32,
    pub heat: u32,

    pub pos: Vec2,
    pub last_pos: Vec2,
    pub initial_pos: Vec2,
    pub velocity: Vec2,
    pub last_velocity: Vec2,
    pub last_move: Vec2,
    /// Unit vector; non-zero whenever the drone has ever fired or aimed.
    pub last_aim: Vec2,

    pub energy_left: f32,
    pub burst_charge: f32,
    pub burst_cooldown: f32,
    pub energy_refill_wait: f32,
    pub energy_fully_depleted: bool,
    pub energy_fully_depleted_this_step: bool,
    pub charging_weapon: bool,
    pub charging_burst: bool,
    pub braking: bool,
    pub shot_this_step: bool,

    pub dead: bool,
    pub died_this_step: bool,

    pub shield: Option<Shield>,
    pub step_info: DroneStepInfo,
    pub stats: DroneStats,
    pub in_line_of_sight: [bool; MAX_DRONES],
}

impl Drone {
    pub fn is_default_weapon(&self, default: WeaponKind) -> bool {
        self.weapon == default
    }
}
