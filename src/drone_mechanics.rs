//! Drone Mechanics (§4.2): move/brake/shoot/discard/burst, the energy and
//! weapon-charge state machine, shield lifecycle, and per-tick bookkeeping.
//! Operates on entities already living in an [`EntityStore`] — this module
//! has no entities of its own, only behavior.

use crate::constants::*;
use crate::entities::EntityStore;
use crate::explosion::{self, ExplosionDef};
use crate::map::{category, Map};
use crate::math::{clamp, RandState, Vec2};
use crate::physics::{PhysicsWorld, ShapeFilter};
use crate::projectile_mechanics;
use crate::weapons::{self, WeaponKind};

/// `direction` must already be clamped to the unit disc by the caller
/// (action decode does this, §6).
pub fn drone_move(store: &mut EntityStore, world: &mut dyn PhysicsWorld, idx: usize, direction: Vec2) {
    let drone = &mut store.drones[idx];
    drone.last_move = direction;
    if direction.length_squared() <= f32::EPSILON {
        return;
    }
    let magnitude = if drone.energy_fully_depleted && drone.energy_refill_wait > 0.0 {
        DRONE_MOVE_MAGNITUDE * 0.5
    } else {
        DRONE_MOVE_MAGNITUDE
    };
    world.apply_force(drone.body, direction.scale(magnitude));
}

/// Fires `idx`'s current weapon toward `aim` (already normalized, or zero
/// if the agent supplied none). Returns `true` if a shot was actually
/// released this call.
#[allow(clippy::too_many_arguments)]
pub fn drone_shoot(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    rng: &mut RandState,
    idx: usize,
    aim: Vec2,
    charging: bool,
    default_weapon: WeaponKind,
    dt: f32,
) -> bool {
    if store.drones[idx].ammo == 0 {
        return false;
    }
    store.drones[idx].shot_this_step = true;
    store.drones[idx].heat += 1;
    if aim.length_squared() > f32::EPSILON {
        store.drones[idx].last_aim = aim.normalize();
    }

    if store.drones[idx].weapon_cooldown > 0.0 {
        return false;
    }

    let weapon = store.drones[idx].weapon;
    let required = weapons::weapon_charge_required(weapon);
    if required > 0.0 {
        store.drones[idx].charging_weapon = charging;
        if charging {
            let charge = &mut store.drones[idx].weapon_charge;
            *charge = (*charge + dt).min(required);
            return false;
        }
        if store.drones[idx].weapon_charge < required {
            let charge = &mut store.drones[idx].weapon_charge;
            *charge = (*charge - dt * 4.0).max(0.0);
            return false;
        }
    }

    let info = weapons::weapon_info(weapon);
    let drone = &mut store.drones[idx];
    if drone.ammo > 0 {
        drone.ammo -= 1;
    }
    drone.weapon_cooldown = info.cool_down;
    drone.weapon_charge = 0.0;
    drone.step_info.fired_shot = true;
    drone.step_info.prev_weapon = Some(weapon);
    let fire_aim = drone.last_aim;
    let recoil = fire_aim.scale(-info.recoil_magnitude);
    world.apply_linear_impulse(drone.body, recoil);
    drone.step_info.prev_weapon.get_or_insert(weapon);

    for _ in 0..info.num_projectiles {
        projectile_mechanics::create_projectile(store, world, map, rng, idx, fire_aim);
        store.drones[idx].stats.shots_fired[weapon.index()] += 1.0;
    }

    if store.drones[idx].ammo == 0 {
        drone_change_weapon(store, idx, default_weapon, default_weapon);
        store.drones[idx].weapon_cooldown = weapons::weapon_info(default_weapon).cool_down;
    }
    true
}

/// Holding brake burns energy for damping; releasing (or depletion)
/// restores normal damping and schedules a refill wait.
pub fn drone_brake(store: &mut EntityStore, world: &mut dyn PhysicsWorld, idx: usize, brake: bool, dt: f32) {
    let drone = &mut store.drones[idx];
    drone.braking = brake && drone.energy_left > 0.0 && !drone.charging_burst;

    if !drone.braking {
        if !drone.charging_burst {
            drone.energy_refill_wait = DRONE_ENERGY_REFILL_WAIT;
        }
        world.set_linear_damping(drone.body, DRONE_LINEAR_DAMPING);
        return;
    }

    world.set_linear_damping(drone.body, DRONE_LINEAR_DAMPING * BRAKE_DAMPING_COEF);
    drone.energy_left = (drone.energy_left - BRAKE_DRAIN_RATE * dt).max(0.0);
    drone.stats.brake_time += dt;
    if drone.energy_left <= 0.0 {
        drone.energy_fully_depleted = true;
        drone.energy_fully_depleted_this_step = true;
        drone.energy_refill_wait = DRONE_ENERGY_REFILL_EMPTY_WAIT;
        drone.braking = false;
        drone.stats.energy_emptied_count += 1.0;
        world.set_linear_damping(drone.body, DRONE_LINEAR_DAMPING);
    }
}

/// Transfers energy into `burstCharge`; the first charging tick pays a
/// base cost. Returns the current charge fraction for observation use.
pub fn drone_charge_burst(store: &mut EntityStore, idx: usize, charging: bool, dt: f32) -> f32 {
    let drone = &mut store.drones[idx];
    if !charging || drone.energy_left <= 0.0 {
        drone.charging_burst = false;
        return drone.burst_charge;
    }
    if !drone.charging_burst {
        drone.energy_left = (drone.energy_left - BURST_CHARGE_BASE_COST).max(0.0);
    }
    drone.charging_burst = true;
    let gain = BURST_CHARGE_RATE * dt;
    let gain = gain.min(drone.energy_left);
    drone.energy_left -= gain;
    drone.burst_charge = (drone.burst_charge + gain).min(DRONE_ENERGY_MAX);
    drone.burst_charge
}

/// Releases the stored burst charge as an omnidirectional explosion.
pub fn drone_burst(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    rng: &mut RandState,
    map: &Map,
    idx: usize,
    exploding_queue: &mut Vec<crate::entities::ProjectileId>,
) {
    let drone = &store.drones[idx];
    if drone.burst_cooldown > 0.0 || drone.burst_charge <= 0.0 {
        return;
    }
    let charge = drone.burst_charge;
    let position = drone.pos;
    let def = ExplosionDef {
        position,
        radius: BURST_RADIUS_BASE * charge + BURST_RADIUS_MIN,
        falloff: (BURST_RADIUS_BASE * charge + BURST_RADIUS_MIN) / 2.0,
        impulse_per_length: BURST_IMPACT_BASE * charge + BURST_IMPACT_MIN,
        mask: category::DRONE | category::FLOATING_WALL | category::PROJECTILE | category::WALL,
        is_burst: true,
        is_implosion: false,
    };
    explosion::create_explosion(store, world, rng, map, idx, None, &def, exploding_queue);

    let drone = &mut store.drones[idx];
    drone.burst_cooldown = BURST_COOLDOWN;
    drone.energy_refill_wait = DRONE_ENERGY_REFILL_WAIT;
    drone.burst_charge = 0.0;
    drone.charging_burst = false;
    drone.stats.bursts_total += 1.0;
}

pub fn drone_change_weapon(store: &mut EntityStore, idx: usize, new: WeaponKind, default_weapon: WeaponKind) {
    let drone = &mut store.drones[idx];
    if drone.weapon != new {
        drone.weapon_cooldown = 0.0;
        drone.weapon_charge = 0.0;
        drone.heat = 0;
    }
    drone.weapon = new;
    drone.ammo = weapons::weapon_ammo(default_weapon, new);
}

pub fn drone_discard_weapon(store: &mut EntityStore, idx: usize, default_weapon: WeaponKind) {
    let drone = &store.drones[idx];
    if drone.weapon == default_weapon {
        return;
    }
    if drone.energy_fully_depleted && !drone.charging_burst {
        return;
    }
    drone_change_weapon(store, idx, default_weapon, default_weapon);
    let drone = &mut store.drones[idx];
    drone.energy_left = (drone.energy_left - WEAPON_DISCARD_COST).max(0.0);
    if drone.energy_left <= 0.0 {
        drone.energy_fully_depleted = true;
        drone.energy_fully_depleted_this_step = true;
        drone.energy_refill_wait = DRONE_ENERGY_REFILL_EMPTY_WAIT;
        drone.stats.energy_emptied_count += 1.0;
    }
}

/// Per-tick bookkeeping: cooldowns, charge bleed-off, energy refill,
/// shield expiry, distance accounting.
pub fn drone_step(store: &mut EntityStore, world: &mut dyn PhysicsWorld, idx: usize, dt: f32) {
    let drone = &mut store.drones[idx];
    if drone.dead {
        return;
    }

    drone.weapon_cooldown = (drone.weapon_cooldown - dt).max(0.0);
    drone.burst_cooldown = (drone.burst_cooldown - dt).max(0.0);
    if !drone.shot_this_step {
        drone.weapon_charge = (drone.weapon_charge - dt).max(0.0);
        drone.heat = drone.heat.saturating_sub(1);
    }

    if drone.energy_refill_wait > 0.0 {
        drone.energy_refill_wait = (drone.energy_refill_wait - dt).max(0.0);
    } else if !drone.charging_burst && drone.energy_left < DRONE_ENERGY_MAX {
        drone.energy_left = (drone.energy_left + DRONE_ENERGY_REFILL_RATE * dt).min(DRONE_ENERGY_MAX);
        if drone.energy_left >= DRONE_ENERGY_MAX {
            drone.energy_fully_depleted = false;
        }
    }

    if let Some(shield) = &drone.shield {
        world.set_transform(shield.body, drone.pos, 0.0);
    }

    let mut expired_shield = None;
    if let Some(shield) = &mut drone.shield {
        shield.duration = (shield.duration - dt).max(0.0);
        if shield.is_expired() {
            expired_shield = Some((shield.body, shield.buffer_shape));
        }
    }
    if expired_shield.is_some() {
        drone.shield = None;
    }

    let delta = drone.pos - drone.last_pos;
    let traveled = clamp(delta.length(), 0.0, f32::MAX);
    drone.stats.distance_traveled += traveled;
    drone.stats.abs_distance_traveled += delta.x.abs() + delta.y.abs();
    drone.step_info.fired_shot |= drone.shot_this_step;

    if let Some((body, shape)) = expired_shield {
        world.destroy_body(body);
        world.destroy_shape(shape);
        store.unregister_body(body);
        store.unregister_shape(shape);
    }
}

/// Idempotent: a dead drone is left untouched on a second call.
pub fn kill_drone(store: &mut EntityStore, world: &mut dyn PhysicsWorld, idx: usize) {
    if store.drones[idx].dead {
        return;
    }
    let shield_ids = store.drones[idx].shield.take().map(|s| (s.body, s.buffer_shape));
    let body = {
        let drone = &mut store.drones[idx];
        drone.dead = true;
        drone.died_this_step = true;
        drone.charging_burst = false;
        drone.charging_weapon = false;
        drone.braking = false;
        drone.body
    };
    world.set_linear_velocity(body, Vec2::ZERO);
    if let Some((shield_body, shield_shape)) = shield_ids {
        world.destroy_body(shield_body);
        world.destroy_shape(shield_shape);
        store.unregister_body(shield_body);
        store.unregister_shape(shield_shape);
    }
    // Body stays alive (cell back-references and obs packing still read
    // `pos`); only its motion is frozen. The step orchestrator filters
    // dead drones out of observation/reward dispatch.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Drone;
    use crate::physics::{BodyDef, BodyKind, Shape, ShapeDef};
    use crate::physics::native::NativeWorld;

    fn new_drone(world: &mut NativeWorld, idx: usize) -> Drone {
        let body = world.create_body(BodyDef {
            kind: BodyKind::Dynamic,
            position: Vec2::ZERO,
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
            idx,
            team: idx as u8,
            weapon: WeaponKind::Standard,
            ammo: INFINITE_AMMO,
            weapon_cooldown: 0.0,
            weapon_charge: 0.0,
            heat: 0,
            pos: Vec2::ZERO,
            last_pos: Vec2::ZERO,
            initial_pos: Vec2::ZERO,
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
    fn brake_drains_energy_and_sets_damping() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(1, 1);
        store.drones.push(new_drone(&mut world, 0));
        drone_brake(&mut store, &mut world, 0, true, 1.0);
        assert!(store.drones[0].energy_left < DRONE_ENERGY_MAX);
        assert!(store.drones[0].braking);
    }

    #[test]
    fn kill_drone_is_idempotent() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(1, 1);
        store.drones.push(new_drone(&mut world, 0));
        kill_drone(&mut store, &mut world, 0);
        kill_drone(&mut store, &mut world, 0);
        assert!(store.drones[0].dead);
        assert!(store.drones[0].died_this_step);
    }

    #[test]
    fn discard_is_noop_for_default_weapon() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(1, 1);
        store.drones.push(new_drone(&mut world, 0));
        let energy_before = store.drones[0].energy_left;
        drone_discard_weapon(&mut store, 0, WeaponKind::Standard);
        assert_eq!(store.drones[0].energy_left, energy_before);
    }
}
