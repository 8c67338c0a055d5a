//! `EngineConfig` (§3 [ADDED]): the handful of knobs a training run
//! legitimately wants to vary without recompiling, loadable from TOML.
//! Everything baked into `constants` as a hard physical invariant stays
//! there; this only covers tunables a regression or hyperparameter sweep
//! would plausibly want to override.

use serde::{Deserialize, Serialize};

use crate::constants::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub delta_time: f32,
    pub box2d_substeps: i32,
    pub frameskip: u32,

    pub drone_move_magnitude: f32,
    pub drone_linear_damping: f32,
    pub brake_damping_coef: f32,
    pub brake_drain_rate: f32,

    pub drone_energy_max: f32,
    pub drone_energy_refill_rate: f32,
    pub weapon_discard_cost: f32,

    pub burst_charge_rate: f32,
    pub burst_cooldown: f32,

    pub shield_start_duration: f32,
    pub shield_start_health: f32,

    pub sudden_death_initial_steps: u16,
    pub sudden_death_period_steps: u16,

    pub win_reward: f32,
    pub weapon_pickup_reward: f32,
    pub shot_hit_reward: f32,
    pub aimed_shot_reward: f32,
    pub aim_reward: f32,
    pub approach_reward_coef: f32,
    pub distance_cutoff: f32,
    pub aim_tolerance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            delta_time: DELTA_TIME,
            box2d_substeps: BOX2D_SUBSTEPS,
            frameskip: FRAMESKIP,

            drone_move_magnitude: DRONE_MOVE_MAGNITUDE,
            drone_linear_damping: DRONE_LINEAR_DAMPING,
            brake_damping_coef: BRAKE_DAMPING_COEF,
            brake_drain_rate: BRAKE_DRAIN_RATE,

            drone_energy_max: DRONE_ENERGY_MAX,
            drone_energy_refill_rate: DRONE_ENERGY_REFILL_RATE,
            weapon_discard_cost: WEAPON_DISCARD_COST,

            burst_charge_rate: BURST_CHARGE_RATE,
            burst_cooldown: BURST_COOLDOWN,

            shield_start_duration: SHIELD_START_DURATION,
            shield_start_health: SHIELD_START_HEALTH,

            sudden_death_initial_steps: SUDDEN_DEATH_INITIAL_STEPS,
            sudden_death_period_steps: SUDDEN_DEATH_PERIOD_STEPS,

            win_reward: WIN_REWARD,
            weapon_pickup_reward: WEAPON_PICKUP_REWARD,
            shot_hit_reward: SHOT_HIT_REWARD,
            aimed_shot_reward: AIMED_SHOT_REWARD,
            aim_reward: AIM_REWARD,
            approach_reward_coef: APPROACH_REWARD_COEF,
            distance_cutoff: DISTANCE_CUTOFF,
            aim_tolerance: AIM_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let cfg = EngineConfig::default();
        let s = cfg.to_toml().unwrap();
        let back = EngineConfig::from_toml(&s).unwrap();
        assert_eq!(cfg.frameskip, back.frameskip);
        assert_eq!(cfg.win_reward, back.win_reward);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = EngineConfig::from_toml("frameskip = 8\n").unwrap();
        assert_eq!(cfg.frameskip, 8);
        assert_eq!(cfg.win_reward, WIN_REWARD);
    }
}
