//! Reward Shaping (§4.8): per-substep, per-drone shaped reward.

use crate::constants::*;
use crate::entities::EntityStore;
use crate::weapons::WeaponKind;

/// Adds this substep's shaped reward into `rewards[idx]` for every live
/// drone, indexed the same way as `store.drones`. `round_over_winner` is
/// `Some(idx)` the substep the round ends with a lone survivor.
pub fn accumulate_rewards(
    store: &mut EntityStore,
    default_weapon: WeaponKind,
    round_over_winner: Option<usize>,
    rewards: &mut [f32],
) {
    debug_assert!(rewards.len() >= store.drones.len());

    for idx in 0..store.drones.len() {
        let drone = &store.drones[idx];
        if drone.dead {
            continue;
        }
        let mut r = 0.0f32;

        if round_over_winner == Some(idx) {
            r += WIN_REWARD;
        }

        if drone.step_info.picked_up_weapon {
            if let Some(prev) = drone.step_info.prev_weapon {
                if prev == default_weapon && drone.weapon != default_weapon {
                    r += WEAPON_PICKUP_REWARD;
                }
            }
        }

        let hits = drone.step_info.shot_hit.iter().filter(|&&w| w != 0).count()
            + drone.step_info.explosion_hit.iter().filter(|&&w| w != 0).count();
        r += SHOT_HIT_REWARD * hits as f32;

        let mut aimed_at_enemy = false;
        for other_idx in 0..store.drones.len() {
            if other_idx == idx || store.drones[other_idx].dead {
                continue;
            }
            let other = &store.drones[other_idx];
            let delta = other.pos - drone.pos;
            let dist = delta.length();
            if dist <= f32::EPSILON {
                continue;
            }
            let dir = delta.scale(1.0 / dist);

            let speed = drone.velocity.length();
            if speed > 0.1 {
                let allowed = drone.weapon == WeaponKind::Shotgun || dist > DISTANCE_CUTOFF;
                if allowed {
                    r += APPROACH_REWARD_COEF * drone.velocity.dot(dir);
                }
            }

            if !aimed_at_enemy && drone.in_line_of_sight.get(other_idx).copied().unwrap_or(false) {
                let aim = drone.last_aim;
                if aim.length_squared() > f32::EPSILON {
                    let cos_angle = aim.dot(dir).clamp(-1.0, 1.0);
                    let angle = cos_angle.acos();
                    if angle <= AIM_TOLERANCE {
                        aimed_at_enemy = true;
                        r += AIM_REWARD;
                        if drone.shot_this_step {
                            r += AIMED_SHOT_REWARD;
                        }
                    }
                }
            }
        }

        rewards[idx] += r;
        store.drones[idx].stats.reward += r;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Drone;
    use crate::physics::native::NativeWorld;
    use crate::physics::{BodyDef, BodyKind, PhysicsWorld, Shape, ShapeDef};
    use crate::math::Vec2;

    fn new_drone(world: &mut NativeWorld, pos: Vec2) -> Drone {
        let body = world.create_body(BodyDef {
            kind: BodyKind::Dynamic,
            position: pos,
            ..Default::default()
        });
        let shape = world.create_shape(
            body,
            ShapeDef {
                shape: Shape::Circle { radius: DRONE_RADIUS },
                ..Default::default()
            },
        );
        Drone {
            body,
            shape,
            idx: 0,
            team: 0,
            weapon: WeaponKind::Standard,
            ammo: INFINITE_AMMO,
            weapon_cooldown: 0.0,
            weapon_charge: 0.0,
            heat: 0,
            pos,
            last_pos: pos,
            initial_pos: pos,
            velocity: Vec2::ZERO,
            last_velocity: Vec2::ZERO,
            last_move: Vec2::ZERO,
            last_aim: Vec2::new(0.0, -1.0),
            energy_left: DRONE_ENERGY_MAX,
            burst_charge: 0.0,
            burst_cooldown: 0.0,
            energy_refill_wait: 0.0,
            energy_fully_depleted: false,
            energy_fully_depleted_this_step: false,
            charging_weapon: false,
            charging_burst: false,
            braking: false,
            shot_this_step: false,
            dead: false,
            died_this_step: false,
            shield: None,
            step_info: Default::default(),
            stats: Default::default(),
            in_line_of_sight: [false; MAX_DRONES],
        }
    }

    #[test]
    fn winner_gets_win_reward() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(1, 1);
        store.drones.push(new_drone(&mut world, Vec2::ZERO));
        store.drones.push(new_drone(&mut world, Vec2::new(5.0, 0.0)));
        let mut rewards = vec![0.0; 2];
        accumulate_rewards(&mut store, WeaponKind::Standard, Some(0), &mut rewards);
        assert!((rewards[0] - WIN_REWARD).abs() < 1e-6);
        assert_eq!(rewards[1], 0.0);
    }

    #[test]
    fn shot_hits_accumulate() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(1, 1);
        store.drones.push(new_drone(&mut world, Vec2::ZERO));
        store.drones.push(new_drone(&mut world, Vec2::new(5.0, 0.0)));
        store.drones[0].step_info.shot_hit[1] = 1;
        let mut rewards = vec![0.0; 2];
        accumulate_rewards(&mut store, WeaponKind::Standard, None, &mut rewards);
        assert!((rewards[0] - SHOT_HIT_REWARD).abs() < 1e-6);
    }
}
