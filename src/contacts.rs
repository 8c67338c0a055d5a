//! Contact/Sensor Router (§4.8 component list — "Contact/Sensor Router"):
//! drains the physics world's event queues once per substep and dispatches
//! each to the right entity-pair handler. Entity destruction triggered by a
//! handler is deferred to `exploding_queue` / direct removal only after the
//! whole drained batch has been walked, matching §9's deferred-destroy rule.

use crate::entities::{EntityRef, EntityStore, ProjectileId};
use crate::explosion::{self, ExplosionDef};
use crate::map::Map;
use crate::math::RandState;
use crate::physics::{ContactPhase, PhysicsWorld, ShapeId};
use crate::projectile_mechanics::{self, ContactOutcome};
use crate::spawner::SpawnerState;
use crate::weapons::{self, WeaponKind};

fn owner_pair(store: &EntityStore, a: ShapeId, b: ShapeId) -> (Option<EntityRef>, Option<EntityRef>) {
    (store.owner_of_shape(a), store.owner_of_shape(b))
}

fn explosion_def_for(kind: WeaponKind, position: crate::math::Vec2) -> Option<ExplosionDef> {
    weapons::weapon_explosion(kind).map(|info| ExplosionDef {
        position,
        radius: info.radius,
        falloff: info.falloff,
        impulse_per_length: info.impulse_per_length,
        mask: u32::MAX,
        is_burst: false,
        is_implosion: false,
    })
}

fn apply_outcome(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    rng: &mut RandState,
    map: &Map,
    proj_id: ProjectileId,
    outcome: ContactOutcome,
    contact_point: crate::math::Vec2,
    exploding_queue: &mut Vec<ProjectileId>,
) {
    match outcome {
        ContactOutcome::Bounce => {}
        ContactOutcome::Explode => {
            let Some(proj) = store.projectile(proj_id) else { return };
            let weapon = proj.weapon;
            let pos = proj.pos;
            let owner_idx = proj.drone_idx;
            if let Some(def) = explosion_def_for(weapon, pos) {
                explosion::create_explosion(store, world, rng, map, owner_idx, Some(proj_id), &def, exploding_queue);
            }
            if let Some(proj) = store.projectile_mut(proj_id) {
                proj.needs_to_be_destroyed = true;
            }
            if !exploding_queue.contains(&proj_id) {
                exploding_queue.push(proj_id);
            }
        }
        ContactOutcome::DestroyPlain => {
            if let Some(proj) = store.remove_projectile(proj_id) {
                store.unregister_body(proj.body);
                store.unregister_shape(proj.shape);
                if let Some(sensor) = proj.sensor {
                    store.unregister_shape(sensor);
                }
                world.destroy_shape(proj.shape);
                if let Some(sensor) = proj.sensor {
                    world.destroy_shape(sensor);
                }
                world.destroy_body(proj.body);
            }
        }
        ContactOutcome::WeldAsMine => {
            let Some(proj) = store.projectile(proj_id) else { return };
            let body = proj.body;
            if let Some(EntityRef::Wall(widx)) = store.owner_of_shape(find_wall_shape_near(store, contact_point)) {
                let wall_body = store.walls[widx].body;
                let joint = world.create_weld_joint(wall_body, body, contact_point);
                world.set_linear_velocity(body, crate::math::Vec2::ZERO);
                let proj = store.projectile_mut(proj_id).unwrap();
                proj.set_mine = true;
                proj.weld_joint = Some(joint);
            }
        }
    }
}

/// Best-effort resolution of which wall a weld contact touched; the
/// contact point is coincident with that wall's surface by construction.
fn find_wall_shape_near(store: &EntityStore, point: crate::math::Vec2) -> ShapeId {
    store
        .walls
        .iter()
        .min_by(|a, b| a.pos.distance_squared(point).total_cmp(&b.pos.distance_squared(point)))
        .map(|w| w.shape)
        .unwrap_or(ShapeId(0))
}

/// Drains and dispatches every contact event produced by the last
/// `physics.step` call.
pub fn dispatch_contacts(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    rng: &mut RandState,
    map: &Map,
    exploding_queue: &mut Vec<ProjectileId>,
) {
    let events = world.take_contact_events();
    for event in events {
        let (owner_a, owner_b) = owner_pair(store, event.shape_a, event.shape_b);
        let (proj_id, other) = match (owner_a, owner_b) {
            (Some(EntityRef::Projectile(p)), other) => (Some(p), other),
            (other, Some(EntityRef::Projectile(p))) => (Some(p), other),
            _ => (None, None),
        };
        let Some(proj_id) = proj_id else { continue };
        if store.projectile(proj_id).map_or(true, |p| p.needs_to_be_destroyed) {
            continue;
        }

        match event.phase {
            ContactPhase::Begin => {
                let teams: Vec<u8> = store.drones.iter().map(|d| d.team).collect();
                let outcome = projectile_mechanics::handle_begin_contact(
                    store,
                    world,
                    proj_id,
                    other,
                    event.point,
                    &teams,
                );
                apply_outcome(store, world, rng, map, proj_id, outcome, event.point, exploding_queue);
            }
            ContactPhase::End => {
                projectile_mechanics::handle_end_contact(store, world, proj_id, other);
            }
        }
    }
}

/// Drains and dispatches proximity-sensor events: mine-proximity checks
/// and weapon-pickup collection.
pub fn dispatch_sensors(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    spawner_state: &mut SpawnerState,
    default_weapon: WeaponKind,
    exploding_queue: &mut Vec<ProjectileId>,
) {
    let events = world.take_sensor_events();
    for event in events {
        if event.phase != ContactPhase::Begin {
            continue;
        }
        let (sensor_owner, visitor_owner) = owner_pair(store, event.sensor, event.visitor);

        match (sensor_owner, visitor_owner) {
            (Some(EntityRef::Projectile(pid)), Some(EntityRef::Drone(didx))) => {
                handle_mine_proximity(store, world, map, pid, didx, exploding_queue);
            }
            (Some(EntityRef::Pickup(pickup_idx)), Some(EntityRef::Drone(didx))) => {
                handle_pickup_collected(store, world, pickup_idx, didx, spawner_state, default_weapon);
            }
            _ => {}
        }
    }
}

fn handle_mine_proximity(
    store: &mut EntityStore,
    world: &dyn PhysicsWorld,
    _map: &Map,
    pid: ProjectileId,
    didx: usize,
    exploding_queue: &mut Vec<ProjectileId>,
) {
    if store.drones[didx].dead {
        return;
    }
    let Some(proj) = store.projectile(pid) else { return };
    let from = proj.pos;
    let to = store.drones[didx].pos;
    let filter = crate::physics::ShapeFilter::new(u32::MAX, crate::map::category::WALL | crate::map::category::FLOATING_WALL);
    let clear = world.cast_ray_closest(from, to - from, filter).is_none();
    if clear {
        if !exploding_queue.contains(&pid) {
            exploding_queue.push(pid);
        }
        if let Some(proj) = store.projectile_mut(pid) {
            proj.needs_to_be_destroyed = true;
        }
    } else if let Some(proj) = store.projectile_mut(pid) {
        if !proj.drones_behind_walls.contains(&(didx as u8)) {
            proj.drones_behind_walls.push(didx as u8);
        }
    }
}

fn handle_pickup_collected(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    pickup_idx: usize,
    didx: usize,
    spawner_state: &mut SpawnerState,
    default_weapon: WeaponKind,
) {
    if store.drones[didx].dead || store.pickups[pickup_idx].is_disabled() {
        return;
    }
    let weapon = store.pickups[pickup_idx].weapon;
    let prev = store.drones[didx].weapon;
    crate::drone_mechanics::drone_change_weapon(store, didx, weapon, default_weapon);
    store.drones[didx].step_info.picked_up_weapon = true;
    store.drones[didx].step_info.prev_weapon = Some(prev);
    store.drones[didx].stats.weapons_picked_up[weapon.index()] += 1.0;

    let pickup = &mut store.pickups[pickup_idx];
    pickup.respawn_wait = 10.0;
    if let Some(body) = pickup.body.take() {
        world.destroy_body(body);
    }
    if let Some(shape) = pickup.shape.take() {
        store.unregister_shape(shape);
        world.destroy_shape(shape);
    }
    pickup.body_destroyed = true;
    let idx = pickup.cell_idx;
    store.clear_cell_if(idx, EntityRef::Pickup(pickup_idx));
    spawner_state.on_pickup_disabled(weapon);
}
