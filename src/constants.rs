//! Centralized simulation constants.
//!
//! Mirrors the teacher's `config::Config` approach of keeping every tunable
//! in one place, but split into a `const` table (values baked into the
//! engine's physical behaviour, never swapped at runtime) and the
//! `EngineConfig` struct in [`crate::config`] (the handful of knobs a
//! training run legitimately wants to vary).

/// Max drones supported by a single episode.
pub const MAX_DRONES: usize = 4;
/// Number of distinct weapon kinds.
pub const NUM_WEAPONS: usize = 5;
/// Number of wall kinds (standard, bouncy, death).
pub const NUM_WALL_TYPES: usize = 3;

pub const DELTA_TIME: f32 = 1.0 / 60.0;
pub const BOX2D_SUBSTEPS: i32 = 4;
pub const FRAMESKIP: u32 = 4;

pub const DRONE_RADIUS: f32 = 0.3;
pub const DRONE_MOVE_MAGNITUDE: f32 = 15.0;
pub const DRONE_LINEAR_DAMPING: f32 = 1.5;
pub const BRAKE_DAMPING_COEF: f32 = 8.0;
pub const BRAKE_DRAIN_RATE: f32 = 25.0;

pub const DRONE_ENERGY_MAX: f32 = 100.0;
pub const DRONE_ENERGY_REFILL_WAIT: f32 = 0.5;
pub const DRONE_ENERGY_REFILL_EMPTY_WAIT: f32 = 1.5;
pub const DRONE_ENERGY_REFILL_RATE: f32 = 20.0;
pub const WEAPON_DISCARD_COST: f32 = 15.0;

pub const BURST_CHARGE_RATE: f32 = 40.0;
pub const BURST_CHARGE_BASE_COST: f32 = 5.0;
pub const BURST_RADIUS_BASE: f32 = 0.04;
pub const BURST_RADIUS_MIN: f32 = 1.0;
pub const BURST_IMPACT_BASE: f32 = 2.0;
pub const BURST_IMPACT_MIN: f32 = 5.0;
pub const BURST_COOLDOWN: f32 = 3.0;

pub const SHIELD_START_DURATION: f32 = 2.0;
pub const SHIELD_START_HEALTH: f32 = 25.0;
pub const SHIELD_RADIUS: f32 = 0.5;

pub const PROJECTILE_BASE_RADIUS: f32 = 0.12;
/// Radius of a mine's proximity sensor shape.
pub const PROXIMITY_SENSOR_RADIUS: f32 = 1.2;
pub const DRONE_MOVE_AIM_COEF: f32 = 0.2;
pub const ACCELERATOR_MAX_SPEED: f32 = 60.0;

pub const EXPLOSION_ENERGY_REFILL_COEF: f32 = 0.5;

pub const DRONE_DRONE_SPAWN_DISTANCE: f32 = 3.0;
pub const PICKUP_SPAWN_DISTANCE: f32 = 1.5;
pub const MIN_SPAWN_DISTANCE: f32 = 0.5;
pub const PICKUP_SENSOR_RADIUS: f32 = 0.3;
/// World-unit size of one map cell; matches the 1-unit grid every built-in
/// map and spawn-quadrant AABB is authored against.
pub const CELL_SIZE: f32 = 1.0;

/// Episode length: substeps before `stepsLeft` reaches 0 and the
/// sudden-death period countdown begins (§4.5, §4.7e, §6).
pub const EPISODE_STEPS: u32 = SUDDEN_DEATH_INITIAL_STEPS as u32;

pub const SUDDEN_DEATH_INITIAL_STEPS: u16 = 1000;
pub const SUDDEN_DEATH_PERIOD_STEPS: u16 = 150;

pub const MAP_OBS_ROWS: usize = 11;
pub const MAP_OBS_COLUMNS: usize = 11;
pub const MAP_OBS_SIZE: usize = MAP_OBS_ROWS * MAP_OBS_COLUMNS;

pub const NUM_NEAREST_WALLS: usize = 8;
pub const MAX_FLOATING_WALLS: usize = 8;
pub const MAX_PICKUPS: usize = 4;
pub const NUM_PROJECTILE_OBS: usize = 16;

/// Per-floating-wall scalar fields: type+1, relx, rely, angle, vx, vy.
pub const FLOATING_WALL_OBS_STRIDE: usize = 6;
/// Per-pickup scalar fields: weapon+1, relx, rely.
pub const PICKUP_OBS_STRIDE: usize = 3;
/// Per-projectile scalar fields: weapon+1, ownerIdx+1, relx, rely.
pub const PROJECTILE_OBS_STRIDE: usize = 4;
/// Per-wall scalar fields: type, relx, rely.
pub const WALL_OBS_STRIDE: usize = 3;
/// Per-enemy-drone scalar fields (see §4.6).
pub const ENEMY_DRONE_OBS_STRIDE: usize = 18;
/// Self-drone scalar fields (see §4.6).
pub const SELF_DRONE_OBS_STRIDE: usize = 16;

pub const WIN_REWARD: f32 = 1.0;
pub const WEAPON_PICKUP_REWARD: f32 = 0.1;
pub const SHOT_HIT_REWARD: f32 = 0.25;
pub const AIMED_SHOT_REWARD: f32 = 0.1;
pub const AIM_REWARD: f32 = 0.02;
pub const APPROACH_REWARD_COEF: f32 = 0.01;
pub const DISTANCE_CUTOFF: f32 = 5.0;
pub const AIM_TOLERANCE: f32 = 0.5;

pub const LOG_BUFFER_CAPACITY: usize = 256;

/// Sentinel ammo value meaning "infinite" (the default weapon).
pub const INFINITE_AMMO: i8 = -1;

/// `2.0` is encoded in an `i32` discrete action as the no-op bucket.
pub const DISCRETE_NOOP: i32 = 8;
pub const DISCRETE_DIRECTIONS: usize = 8;
/// `[moveX, moveY, aimX, aimY, shoot, brake, burst, discard]`.
pub const CONTINUOUS_ACTION_SIZE: usize = 8;
/// `[move, aim, shoot, brake, burst, discard]`.
pub const DISCRETE_ACTION_SIZE: usize = 6;

/// The 8 compass unit vectors discrete actions map onto, index 0..=7.
pub const COMPASS_DIRS: [(f32, f32); DISCRETE_DIRECTIONS] = [
    (1.0, 0.0),
    (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (0.0, 1.0),
    (-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (-1.0, 0.0),
    (-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
    (0.0, -1.0),
    (std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
];
