use crate::constants::{MAX_DRONES, NUM_WEAPONS};

/// Cleared at the start of every physics substep (§3).
#[derive(Clone, Debug, Default)]
pub struct DroneStepInfo {
    pub fired_shot: bool,
    pub picked_up_weapon: bool,
    pub prev_weapon: Option<crate::weapons::WeaponKind>,
    /// `0` = no hit this step, else `weapon index + 1`.
    pub shot_hit: [u8; MAX_DRONES],
    pub explosion_hit: [u8; MAX_DRONES],
    pub shot_taken: [u8; MAX_DRONES],
    pub explosion_taken: [u8; MAX_DRONES],
    pub own_shot_taken: bool,
}

impl DroneStepInfo {
    pub fn clear(&mut self) {
        *self = DroneStepInfo::default();
    }
}

/// Per-episode aggregate statistics, indexed by weapon where noted.
#[derive(Clone, Debug, Default)]
pub struct DroneStats {
    pub shots_fired: [f32; NUM_WEAPONS],
    pub shots_hit: [f32; NUM_WEAPONS],
    pub shots_taken: [f32; NUM_WEAPONS],
    pub own_shots_taken: [f32; NUM_WEAPONS],
    pub weapons_picked_up: [f32; NUM_WEAPONS],
    pub shot_distances: [f32; NUM_WEAPONS],
    pub distance_traveled: f32,
    pub abs_distance_traveled: f32,
    pub bursts_total: f32,
    pub bursts_hit: f32,
    pub brake_time: f32,
    pub energy_emptied_count: f32,
    pub wins: f32,
    pub reward: f32,
}
