//! Projectile Mechanics (§4.3): birth velocity composition, bouncing with
//! speed preservation, max-distance/max-bounces retirement, proximity
//! sensors, mine weld-to-wall, and accelerator speed-up.

use crate::entities::{EntityRef, EntityStore, Projectile, ProjectileId};
use crate::map::{category, Map};
use crate::math::{RandState, Vec2};
use crate::physics::{BodyDef, BodyKind, PhysicsWorld, Shape, ShapeDef, ShapeFilter};
use crate::weapons::{self, WeaponKind};

fn wall_filter() -> ShapeFilter {
    ShapeFilter::new(u32::MAX, category::WALL | category::FLOATING_WALL)
}

fn is_blocked(map: &Map, store: &EntityStore, pos: Vec2) -> bool {
    match map.cell_of(pos) {
        Some((row, col)) => {
            let idx = store.cell_index(row, col);
            matches!(store.cells[idx].occupant, Some(EntityRef::Wall(_)))
        }
        None => true,
    }
}

/// Spawns one projectile from `drone_idx` toward `aim` (unit vector).
pub fn create_projectile(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    rng: &mut RandState,
    drone_idx: usize,
    aim: Vec2,
) -> ProjectileId {
    let drone = &store.drones[drone_idx];
    let weapon = drone.weapon;
    let info = weapons::weapon_info(weapon);
    let hull = drone
        .shield
        .as_ref()
        .map(|s| crate::constants::SHIELD_RADIUS.max(s.pos.distance(drone.pos)))
        .unwrap_or(crate::constants::DRONE_RADIUS);

    let mut spawn_pos = drone.pos + aim.scale(hull + 1.5 * info.radius);
    if is_blocked(map, store, spawn_pos) {
        let cast = aim.scale(hull + 2.5 * info.radius);
        if let Some(hit) = world.cast_ray_closest(drone.pos, cast, wall_filter()) {
            spawn_pos = hit.point - aim.scale(1.5 * info.radius);
        }
    }

    let adjusted_aim = weapons::weapon_adjust_aim(rng, weapon, drone.heat, aim);
    let fire_speed = weapons::weapon_fire_speed(rng, weapon);
    let drone_vel = drone.velocity;
    let lateral = drone_vel - aim.scale(drone_vel.dot(aim));
    let velocity = adjusted_aim.scale(fire_speed) + lateral.scale(info.density * crate::constants::DRONE_MOVE_AIM_COEF);

    let body = world.create_body(BodyDef {
        kind: BodyKind::Dynamic,
        position: spawn_pos,
        can_sleep: info.can_sleep,
        ..Default::default()
    });
    world.set_linear_velocity(body, velocity);
    let shape = world.create_shape(
        body,
        ShapeDef {
            shape: Shape::Circle { radius: info.radius },
            filter: ShapeFilter::new(
                category::PROJECTILE,
                category::WALL | category::FLOATING_WALL | category::PROJECTILE | category::DRONE | category::SHIELD,
            ),
            density: info.density,
            restitution: 1.0,
            is_bullet: info.is_physics_bullet,
            enable_contact_events: true,
            ..Default::default()
        },
    );
    let sensor = if info.proximity_detonates {
        Some(world.create_shape(
            body,
            ShapeDef {
                shape: Shape::Circle {
                    radius: crate::constants::PROXIMITY_SENSOR_RADIUS,
                },
                filter: ShapeFilter::new(category::PROJECTILE, category::DRONE),
                is_sensor: true,
                enable_sensor_events: true,
                ..Default::default()
            },
        ))
    } else {
        None
    };

    let proj = Projectile {
        body,
        shape,
        sensor,
        drone_idx,
        weapon,
        pos: spawn_pos,
        last_pos: spawn_pos,
        velocity,
        last_velocity: velocity,
        speed: velocity.length(),
        last_speed: velocity.length(),
        distance: 0.0,
        bounces: 0,
        contacts: 0,
        needs_to_be_destroyed: false,
        set_mine: false,
        weld_joint: None,
        drones_behind_walls: Default::default(),
    };
    let id = store.insert_projectile(proj);
    store.register_body(body, EntityRef::Projectile(id));
    store.register_shape(shape, EntityRef::Projectile(id));
    if let Some(sensor_shape) = sensor {
        store.register_shape(sensor_shape, EntityRef::Projectile(id));
    }
    id
}

/// Per-tick upkeep for every live projectile: distance accounting,
/// line-of-sight re-checks for mines, and max-distance retirement.
/// Returns the set of projectiles that must explode.
pub fn projectile_step(
    store: &mut EntityStore,
    world: &dyn PhysicsWorld,
    dt: f32,
) -> Vec<ProjectileId> {
    let mut exploding = Vec::new();
    for id in store.projectile_ids() {
        let Some(proj) = store.projectile_mut(id) else { continue };
        if proj.needs_to_be_destroyed {
            continue;
        }
        let step_dist = proj.velocity.length() * dt;
        proj.distance += step_dist;

        let info = weapons::weapon_info(proj.weapon);
        if proj.is_mine() && !proj.drones_behind_walls.is_empty() {
            let pos = proj.pos;
            let still_behind = clear_line_of_sight(store, world, pos, &proj.drones_behind_walls);
            if !still_behind {
                exploding.push(id);
                store.projectile_mut(id).unwrap().needs_to_be_destroyed = true;
                continue;
            }
        }

        if info.max_distance.is_finite() && proj.distance >= info.max_distance {
            exploding.push(id);
            store.projectile_mut(id).unwrap().needs_to_be_destroyed = true;
        }
    }
    exploding
}

fn clear_line_of_sight(store: &EntityStore, world: &dyn PhysicsWorld, from: Vec2, drones: &[u8]) -> bool {
    let filter = ShapeFilter::new(u32::MAX, category::WALL | category::FLOATING_WALL);
    for &d in drones {
        let drone = &store.drones[d as usize];
        if drone.dead {
            continue;
        }
        let translation = drone.pos - from;
        if world.cast_ray_closest(from, translation, filter).is_none() {
            return true;
        }
    }
    false
}

/// Result of resolving a begin-contact for a projectile.
pub enum ContactOutcome {
    Bounce,
    Explode,
    DestroyPlain,
    WeldAsMine,
}

/// §4.3 begin-contact policy. `other` is `None` for a bare physics contact
/// with no resolvable owner (shouldn't normally happen, but handled like
/// the spec's "other is null" branch).
#[allow(clippy::too_many_arguments)]
pub fn handle_begin_contact(
    store: &mut EntityStore,
    world: &dyn PhysicsWorld,
    proj_id: ProjectileId,
    other: Option<EntityRef>,
    contact_point: Vec2,
    teams: &[u8],
) -> ContactOutcome {
    let is_mine = store.projectile(proj_id).map_or(false, |p| p.is_mine());

    match other {
        None => {
            if is_mine {
                ContactOutcome::Explode
            } else {
                ContactOutcome::Bounce
            }
        }
        Some(EntityRef::Projectile(other_id)) => {
            let other_is_mine = store.projectile(other_id).map_or(false, |p| p.is_mine());
            if is_mine && other_is_mine {
                ContactOutcome::Explode
            } else {
                ContactOutcome::Bounce
            }
        }
        Some(EntityRef::Wall(widx)) => {
            if store.walls[widx].kind == crate::entities::WallKind::Bouncy {
                return ContactOutcome::Bounce;
            }
            let proj = store.projectile_mut(proj_id).unwrap();
            proj.bounces += 1;
            let bounces = proj.bounces;
            let weapon = proj.weapon;
            let max_bounces = weapons::weapon_info(weapon).max_bounces;

            if is_mine {
                let candidates: Vec<usize> = (0..store.drones.len())
                    .filter(|&i| !store.drones[i].dead)
                    .collect();
                let filter = ShapeFilter::new(u32::MAX, category::WALL | category::FLOATING_WALL);
                let mut any_visible = false;
                let mut behind: smallvec::SmallVec<[u8; crate::constants::MAX_DRONES]> = Default::default();
                for &i in &candidates {
                    let translation = store.drones[i].pos - contact_point;
                    if world.cast_ray_closest(contact_point, translation, filter).is_none() {
                        any_visible = true;
                    } else {
                        behind.push(i as u8);
                    }
                }
                if any_visible {
                    return ContactOutcome::Explode;
                }
                let proj = store.projectile_mut(proj_id).unwrap();
                proj.drones_behind_walls = behind;
                return ContactOutcome::WeldAsMine;
            }

            if bounces >= max_bounces {
                ContactOutcome::Explode
            } else {
                ContactOutcome::Bounce
            }
        }
        Some(EntityRef::Drone(didx)) => {
            if store.drones[didx].shield.is_some() {
                return ContactOutcome::Bounce;
            }
            let proj = store.projectile_mut(proj_id).unwrap();
            proj.bounces += 1;
            let weapon = proj.weapon;
            let shooter_idx = proj.drone_idx;
            let info = weapons::weapon_info(weapon);

            let shooter_team = teams[shooter_idx];
            let hit_team = store.drones[didx].team;
            let w1 = weapon.index() as u8 + 1;
            if shooter_idx == didx {
                store.drones[shooter_idx].step_info.own_shot_taken = true;
                store.drones[shooter_idx].stats.own_shots_taken[weapon.index()] += 1.0;
            } else {
                store.drones[didx].step_info.shot_taken[shooter_idx] = w1;
                store.drones[shooter_idx].step_info.shot_hit[didx] = w1;
                store.drones[didx].stats.shots_taken[weapon.index()] += 1.0;
                store.drones[shooter_idx].stats.shots_hit[weapon.index()] += 1.0;
                if hit_team != shooter_team {
                    store.drones[shooter_idx].energy_left =
                        (store.drones[shooter_idx].energy_left + info.energy_refill).min(crate::constants::DRONE_ENERGY_MAX);
                }
            }

            if info.destroyed_on_drone_hit {
                if info.explodes_on_drone_hit {
                    ContactOutcome::Explode
                } else {
                    ContactOutcome::DestroyPlain
                }
            } else {
                ContactOutcome::Bounce
            }
        }
        Some(EntityRef::Pickup(_)) => ContactOutcome::Bounce,
    }
}

/// §4.3 end-contact policy: neutralizes physics-engine restitution drift
/// by clamping speed back to the pre-contact value, except between two
/// differently-weaponed projectiles (speed-up is allowed) or accelerator
/// weapons (boosted up to the cap).
pub fn handle_end_contact(store: &mut EntityStore, world: &mut dyn PhysicsWorld, proj_id: ProjectileId, other: Option<EntityRef>) {
    let Some(proj) = store.projectile(proj_id) else { return };
    if proj.is_mine() {
        return;
    }
    let weapon = proj.weapon;
    let body = proj.body;
    let last_speed = proj.last_speed;
    let current_speed = world.linear_velocity(body).length();

    let allow_speedup = matches!(other, Some(EntityRef::Projectile(other_id))
        if store.projectile(other_id).map_or(false, |p| p.weapon != weapon));

    if allow_speedup {
        let kept = current_speed.max(last_speed);
        rescale_velocity(world, body, kept);
        return;
    }

    let is_accelerator = weapon == WeaponKind::Machinegun;
    if is_accelerator {
        let boosted = current_speed.max(last_speed).min(crate::constants::ACCELERATOR_MAX_SPEED);
        rescale_velocity(world, body, boosted);
    } else {
        rescale_velocity(world, body, last_speed);
    }
}

fn rescale_velocity(world: &mut dyn PhysicsWorld, body: crate::physics::BodyId, target_speed: f32) {
    let v = world.linear_velocity(body);
    let len = v.length();
    if len <= f32::EPSILON {
        return;
    }
    world.set_linear_velocity(body, v.scale(target_speed / len));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Drone;
    use crate::physics::native::NativeWorld;
    use crate::physics::ShapeDef as PhysShapeDef;

    fn minimal_drone(world: &mut NativeWorld) -> Drone {
        let body = world.create_body(BodyDef {
            kind: BodyKind::Dynamic,
            position: Vec2::ZERO,
            ..Default::default()
        });
        let shape = world.create_shape(
            body,
            PhysShapeDef {
                shape: Shape::Circle { radius: crate::constants::DRONE_RADIUS },
                ..Default::default()
            },
        );
        Drone {
            body,
            shape,
            idx: 0,
            team: 0,
            weapon: WeaponKind::Standard,
            ammo: crate::constants::INFINITE_AMMO,
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
            energy_left: crate::constants::DRONE_ENERGY_MAX,
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
            in_line_of_sight: [false; crate::constants::MAX_DRONES],
        }
    }

    #[test]
    fn create_projectile_spawns_outside_hull() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(4, 4);
        store.drones.push(minimal_drone(&mut world));
        let mut rng = RandState::new(1);
        let map = crate::map::Map::load(
            crate::mapbank::built_in_maps().remove(0),
            1.0,
            &mut world,
            &mut store,
        );
        let aim = Vec2::new(0.0, -1.0);
        let id = create_projectile(&mut store, &mut world, &map, &mut rng, 0, aim);
        let proj = store.projectile(id).unwrap();
        assert!(proj.pos.distance(Vec2::ZERO) > crate::constants::DRONE_RADIUS);
    }
}
