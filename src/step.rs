//! Step Orchestrator (§4.7): action decode plus the per-substep sequence
//! that is the only place in the crate allowed to advance simulation time.

use crate::constants::*;
use crate::contacts;
use crate::drone_mechanics;
use crate::entities::{EntityRef, EntityStore, ProjectileId};
use crate::explosion;
use crate::map::{category, Map};
use crate::math::{RandState, Vec2};
use crate::physics::{PhysicsWorld, ShapeFilter};
use crate::projectile_mechanics;
use crate::spawner::{self, SpawnKind, SpawnerState};
use crate::sudden_death::{self, SuddenDeathState};
use crate::weapons::WeaponKind;

/// A single drone's decoded intent for one substep.
#[derive(Copy, Clone, Debug, Default)]
pub struct DroneAction {
    pub mv: Vec2,
    pub aim: Vec2,
    pub shoot: bool,
    pub brake: bool,
    pub burst: bool,
    pub discard: bool,
}

/// Decodes `[moveX, moveY, aimX, aimY, shoot, brake, burst, discard]`.
/// Move/aim pass through `tanh` then clamp to the unit disc (move) or
/// normalize (aim); the four trailing channels are thresholded at `0.5`.
pub fn decode_continuous(raw: &[f32]) -> DroneAction {
    let mx = raw.first().copied().unwrap_or(0.0).tanh();
    let my = raw.get(1).copied().unwrap_or(0.0).tanh();
    let ax = raw.get(2).copied().unwrap_or(0.0).tanh();
    let ay = raw.get(3).copied().unwrap_or(0.0).tanh();
    let shoot = raw.get(4).copied().unwrap_or(0.0) > 0.5;
    let brake = raw.get(5).copied().unwrap_or(0.0) > 0.5;
    let burst = raw.get(6).copied().unwrap_or(0.0) > 0.5;
    let discard = raw.get(7).copied().unwrap_or(0.0) > 0.5;

    let mut mv = Vec2::new(mx, my);
    let len = mv.length();
    if len > 1.0 {
        mv = mv.scale(1.0 / len);
    }
    let aim = Vec2::new(ax, ay).normalize();

    DroneAction { mv, aim, shoot, brake, burst, discard }
}

/// Decodes `[move(0..=8), aim(0..=8), shoot(0|1), brake(0|1), burst(0|1),
/// discard(0|1)]`, `8` meaning no-op for move/aim.
pub fn decode_discrete(raw: &[i32]) -> DroneAction {
    let decode_dir = |v: i32| -> Vec2 {
        if !(0..DISCRETE_DIRECTIONS as i32).contains(&v) {
            Vec2::ZERO
        } else {
            let (x, y) = COMPASS_DIRS[v as usize];
            Vec2::new(x, y)
        }
    };
    let mv = decode_dir(raw.first().copied().unwrap_or(DISCRETE_NOOP));
    let aim = decode_dir(raw.get(1).copied().unwrap_or(DISCRETE_NOOP));
    let shoot = raw.get(2).copied().unwrap_or(0) != 0;
    let brake = raw.get(3).copied().unwrap_or(0) != 0;
    let burst = raw.get(4).copied().unwrap_or(0) != 0;
    let discard = raw.get(5).copied().unwrap_or(0) != 0;
    DroneAction { mv, aim, shoot, brake, burst, discard }
}

pub struct SubstepReport {
    pub round_over: bool,
    /// `Some(idx)` iff exactly one drone is left alive.
    pub winner: Option<usize>,
    pub sudden_death_fired: bool,
    /// `true` iff this substep ended the round purely on the
    /// single-agent timeout, with no death involved (§6/§4.7).
    pub truncated: bool,
}

/// Runs one physics substep: steps a-h of §4.7, minus the reward pass
/// (computed separately by the caller from `DroneStepInfo`/`winner`).
#[allow(clippy::too_many_arguments)]
pub fn run_substep(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    rng: &mut RandState,
    spawner_state: &mut SpawnerState,
    sudden_death_state: &mut SuddenDeathState,
    exploding_queue: &mut Vec<ProjectileId>,
    default_weapon: WeaponKind,
    actions: &[DroneAction],
    steps_left: &mut u32,
    single_agent_timeout: bool,
) -> SubstepReport {
    // a. snapshot + clear per-substep bookkeeping.
    for drone in store.drones.iter_mut() {
        drone.last_velocity = drone.velocity;
        drone.step_info.clear();
        drone.in_line_of_sight = [false; MAX_DRONES];
        drone.shot_this_step = false;
        drone.died_this_step = false;
        drone.energy_fully_depleted_this_step = false;
    }
    update_line_of_sight(store, world);

    // b. move, shoot, brake, burst, discard, per drone.
    for idx in 0..store.drones.len() {
        if store.drones[idx].dead {
            continue;
        }
        let action = actions.get(idx).copied().unwrap_or_default();
        drone_mechanics::drone_move(store, world, idx, action.mv);

        if action.shoot {
            let required = crate::weapons::weapon_charge_required(store.drones[idx].weapon);
            let charging = required > 0.0 && store.drones[idx].weapon_charge < required;
            drone_mechanics::drone_shoot(
                store,
                world,
                map,
                rng,
                idx,
                action.aim,
                charging,
                default_weapon,
                DELTA_TIME,
            );
        }

        drone_mechanics::drone_brake(store, world, idx, action.brake, DELTA_TIME);

        let was_charging_burst = store.drones[idx].charging_burst;
        drone_mechanics::drone_charge_burst(store, idx, action.burst, DELTA_TIME);
        if !action.burst && was_charging_burst {
            drone_mechanics::drone_burst(store, world, rng, map, idx, exploding_queue);
        }

        if action.discard {
            drone_mechanics::drone_discard_weapon(store, idx, default_weapon);
        }
    }

    // c. advance physics.
    world.step(DELTA_TIME, BOX2D_SUBSTEPS);

    // d. reconcile moved bodies; handle OOB entities.
    reconcile_body_events(store, world, map);

    // e. sudden death ticking.
    let alive = store.drones.iter().filter(|d| !d.dead).count();
    *steps_left = steps_left.saturating_sub(1);
    let mut sudden_death_fired = false;
    if *steps_left == 0 {
        sudden_death_fired = sudden_death::tick(sudden_death_state, store, world, map, spawner_state, alive);
    }

    // f. projectile step, then contact/sensor dispatch.
    let expired = projectile_mechanics::projectile_step(store, world, DELTA_TIME);
    for id in expired {
        if !exploding_queue.contains(&id) {
            exploding_queue.push(id);
        }
    }
    contacts::dispatch_contacts(store, world, rng, map, exploding_queue);
    contacts::dispatch_sensors(store, world, map, spawner_state, default_weapon, exploding_queue);
    explosion::destroy_exploded_projectiles(store, world, exploding_queue);

    // g. per-entity step.
    for idx in 0..store.drones.len() {
        drone_mechanics::drone_step(store, world, idx, DELTA_TIME);
    }
    let ready = spawner::pickup_step(store, DELTA_TIME);
    for pickup_idx in ready {
        respawn_pickup(store, world, map, rng, spawner_state, pickup_idx);
    }

    // h. round-over check.
    let alive_after = store.drones.iter().filter(|d| !d.dead).count();
    let winner = if alive_after == 1 {
        store.drones.iter().position(|d| !d.dead)
    } else {
        None
    };
    if let Some(w) = winner {
        store.drones[w].stats.wins += 1.0;
    }
    let death_over = alive_after <= 1;
    let timeout_over = single_agent_timeout && *steps_left == 0;
    let round_over = death_over || timeout_over;

    SubstepReport {
        round_over,
        winner,
        sudden_death_fired,
        truncated: timeout_over && !death_over,
    }
}

fn update_line_of_sight(store: &mut EntityStore, world: &dyn PhysicsWorld) {
    let filter = ShapeFilter::new(u32::MAX, category::WALL | category::FLOATING_WALL);
    let n = store.drones.len();
    for i in 0..n {
        if store.drones[i].dead {
            continue;
        }
        for j in 0..n {
            if i == j || store.drones[j].dead {
                continue;
            }
            let from = store.drones[i].pos;
            let to = store.drones[j].pos;
            let clear = world.cast_ray_closest(from, to - from, filter).is_none();
            store.drones[i].in_line_of_sight[j] = clear;
        }
    }
}

fn reconcile_body_events(store: &mut EntityStore, world: &mut dyn PhysicsWorld, map: &Map) {
    let events = world.take_body_events();
    let mut dead_drones = Vec::new();
    let mut dead_walls = Vec::new();
    let mut dead_projectiles = Vec::new();

    for event in events {
        let Some(owner) = store.owner_of_body(event.body) else { continue };
        match owner {
            EntityRef::Drone(idx) => {
                let drone = &mut store.drones[idx];
                drone.last_pos = drone.pos;
                drone.pos = event.position;
                drone.velocity = world.linear_velocity(event.body);
                if !map.in_bounds(event.position) {
                    dead_drones.push(idx);
                }
            }
            EntityRef::Wall(widx) => {
                let wall = &mut store.walls[widx];
                wall.pos = event.position;
                wall.rot = event.angle;
                wall.velocity = world.linear_velocity(event.body);
                if wall.floating && !map.in_bounds(event.position) {
                    dead_walls.push(widx);
                }
            }
            EntityRef::Projectile(pid) => {
                if let Some(proj) = store.projectile_mut(pid) {
                    proj.last_pos = proj.pos;
                    proj.pos = event.position;
                    proj.last_velocity = proj.velocity;
                    proj.velocity = world.linear_velocity(event.body);
                    proj.last_speed = proj.speed;
                    proj.speed = proj.velocity.length();
                    if !map.in_bounds(event.position) {
                        dead_projectiles.push(pid);
                    }
                }
            }
            EntityRef::Pickup(_) => {}
        }
    }

    for idx in dead_drones {
        drone_mechanics::kill_drone(store, world, idx);
    }
    for widx in dead_walls {
        let (body, shape) = (store.walls[widx].body, store.walls[widx].shape);
        world.destroy_shape(shape);
        world.destroy_body(body);
        store.unregister_body(body);
        store.unregister_shape(shape);
    }
    for pid in dead_projectiles {
        if let Some(proj) = store.remove_projectile(pid) {
            store.unregister_body(proj.body);
            store.unregister_shape(proj.shape);
            if let Some(sensor) = proj.sensor {
                store.unregister_shape(sensor);
                world.destroy_shape(sensor);
            }
            world.destroy_shape(proj.shape);
            world.destroy_body(proj.body);
        }
    }
}

/// Attempts to respawn a pickup whose timer just elapsed at a fresh open
/// position; if none is found the slot stays disabled (§7 recoverable
/// bad-world-state policy: destroyed rather than forced to respawn).
fn respawn_pickup(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    rng: &mut RandState,
    spawner_state: &mut SpawnerState,
    pickup_idx: usize,
) {
    let Some(pos) = spawner::find_open_pos(rng, map, store, world, SpawnKind::Pickup, None) else {
        return;
    };
    let weapon = spawner::rand_weapon_pickup_type(rng, spawner_state, map.def.default_weapon);
    spawner_state.on_pickup_spawned(weapon);

    let (body, shape) = spawner::spawn_pickup_shape(world, pos);
    let Some((row, col)) = map.cell_of(pos) else { return };
    let cell_idx = store.cell_index(row, col);

    let pickup = &mut store.pickups[pickup_idx];
    pickup.body = Some(body);
    pickup.shape = Some(shape);
    pickup.pos = pos;
    pickup.cell_idx = cell_idx;
    pickup.weapon = weapon;
    pickup.respawn_wait = 0.0;
    pickup.body_destroyed = false;

    store.register_body(body, EntityRef::Pickup(pickup_idx));
    store.register_shape(shape, EntityRef::Pickup(pickup_idx));
    store.set_cell_occupant(cell_idx, Some(EntityRef::Pickup(pickup_idx)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_noop_is_zero_vector() {
        let action = decode_discrete(&[DISCRETE_NOOP, DISCRETE_NOOP, 0]);
        assert_eq!(action.mv, Vec2::ZERO);
        assert_eq!(action.aim, Vec2::ZERO);
        assert!(!action.shoot);
    }

    #[test]
    fn discrete_direction_maps_to_compass() {
        let action = decode_discrete(&[0, 2, 1]);
        assert!((action.mv.x - 1.0).abs() < 1e-6);
        assert!((action.aim.y - 1.0).abs() < 1e-6);
        assert!(action.shoot);
    }

    #[test]
    fn continuous_move_clamped_to_unit_disc() {
        let action = decode_continuous(&[10.0, 10.0, 0.0, 0.0, 0.0]);
        assert!(action.mv.length() <= 1.0 + 1e-5);
    }

    #[test]
    fn continuous_decodes_brake_burst_discard() {
        let action = decode_continuous(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(action.brake);
        assert!(action.burst);
        assert!(action.discard);
    }

    #[test]
    fn discrete_decodes_brake_burst_discard() {
        let action = decode_discrete(&[DISCRETE_NOOP, DISCRETE_NOOP, 0, 1, 1, 1]);
        assert!(action.brake);
        assert!(action.burst);
        assert!(action.discard);
    }
}
