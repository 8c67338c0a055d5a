//! Explosion Engine (§4.4): AABB-broadphase candidate filtering, perimeter-
//! scaled impulse, line-of-sight occlusion, implosion support, and chained
//! mine detonation via the deferred-destroy queue (§9 "Deferred
//! destruction").

use crate::entities::{EntityRef, EntityStore, ProjectileId};
use crate::map::{category, Map};
use crate::math::{RandState, Vec2};
use crate::physics::{PhysicsWorld, ShapeFilter};

#[derive(Copy, Clone, Debug)]
pub struct ExplosionDef {
    pub position: Vec2,
    pub radius: f32,
    pub falloff: f32,
    pub impulse_per_length: f32,
    pub mask: u32,
    pub is_burst: bool,
    pub is_implosion: bool,
}

fn occluded(world: &dyn PhysicsWorld, from: Vec2, to: Vec2, include_floating: bool) -> bool {
    let category_mask = if include_floating {
        category::WALL | category::FLOATING_WALL
    } else {
        category::WALL
    };
    let filter = ShapeFilter::new(u32::MAX, category_mask);
    world.cast_ray_closest(from, to - from, filter).is_some()
}

/// Applies `def`'s blast to every eligible body within `radius + falloff`
/// of `def.position`. `projectile` is the projectile whose detonation
/// produced this explosion (`None` for a drone burst).
#[allow(clippy::too_many_arguments)]
pub fn create_explosion(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    rng: &mut RandState,
    _map: &Map,
    parent_drone_idx: usize,
    projectile: Option<ProjectileId>,
    def: &ExplosionDef,
    exploding_queue: &mut Vec<ProjectileId>,
) {
    let reach = def.radius + def.falloff;
    let half = Vec2::new(reach, reach);
    let filter = ShapeFilter::new(def.mask, u32::MAX);
    let candidates = world.overlap_aabb(def.position - half, def.position + half, filter);

    for shape in candidates {
        let Some(owner) = store.owner_of_shape(shape) else { continue };

        if let EntityRef::Projectile(pid) = owner {
            if Some(pid) == projectile {
                continue;
            }
            if store.projectile(pid).map_or(true, |p| p.needs_to_be_destroyed) {
                continue;
            }
        }

        let mut is_parent_drone = false;
        if let EntityRef::Drone(didx) = owner {
            if didx == parent_drone_idx {
                if def.is_burst {
                    continue;
                }
                is_parent_drone = true;
            }
        }

        let is_static_wall = matches!(owner, EntityRef::Wall(widx) if !store.walls[widx].floating);
        if is_static_wall && !def.is_burst {
            continue;
        }

        let body = match owner {
            EntityRef::Wall(w) => store.walls[w].body,
            EntityRef::Drone(d) => store.drones[d].body,
            EntityRef::Projectile(p) => store.projectile(p).unwrap().body,
            EntityRef::Pickup(_) => continue,
        };

        let closest = world.closest_point_on_shape(shape, def.position);
        let dist = closest.distance(def.position);
        let max_reach = if is_static_wall { def.radius } else { reach };
        if dist > max_reach {
            continue;
        }

        let include_floating = !is_static_wall;
        if occluded(world, def.position, closest, include_floating) {
            continue;
        }

        let mut dir = closest - def.position;
        if dir.length_squared() <= f32::EPSILON {
            dir = rng.unit_vec2();
        } else {
            dir = dir.normalize();
        }
        if def.is_implosion {
            dir = -dir;
        }

        let parent_vel = store.drones[parent_drone_idx].velocity;
        let parent_speed_projection = if is_static_wall {
            0.0
        } else {
            let proj = parent_vel.dot(dir);
            if def.is_implosion { -proj } else { proj }
        };

        let falloff_scale = if def.falloff > 0.0 {
            (1.0 - (dist - def.radius).max(0.0) / def.falloff).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let shield_reduction = if let EntityRef::Drone(d) = owner {
            if store.drones[d].shield.is_some() { 0.4 } else { 1.0 }
        } else {
            1.0
        };

        let perimeter_factor = if is_static_wall {
            (1.0 + dist).ln().max(0.1)
        } else {
            1.0
        };

        let magnitude = (def.impulse_per_length.abs() + parent_speed_projection)
            * perimeter_factor
            * falloff_scale
            * shield_reduction;

        let impulse = dir.scale(magnitude);
        if is_static_wall {
            world.apply_linear_impulse(store.drones[parent_drone_idx].body, -impulse);
        } else {
            world.apply_linear_impulse(body, impulse);
            if let EntityRef::Wall(w) = owner {
                if store.walls[w].floating {
                    world.apply_angular_impulse(body, magnitude);
                }
            }
        }

        if let EntityRef::Projectile(pid) = owner {
            if store.projectile(pid).map_or(false, |p| p.is_mine()) && magnitude > 0.0 {
                if !exploding_queue.contains(&pid) {
                    exploding_queue.push(pid);
                }
            }
        }

        if let EntityRef::Drone(didx) = owner {
            if !is_parent_drone {
                let shooter_team = store.drones[parent_drone_idx].team;
                let hit_team = store.drones[didx].team;
                if hit_team != shooter_team {
                    let refill = magnitude * crate::constants::EXPLOSION_ENERGY_REFILL_COEF;
                    store.drones[parent_drone_idx].energy_left =
                        (store.drones[parent_drone_idx].energy_left + refill).min(crate::constants::DRONE_ENERGY_MAX);
                    store.drones[didx].step_info.explosion_taken[parent_drone_idx] = 1;
                    store.drones[parent_drone_idx].step_info.explosion_hit[didx] = 1;
                    if def.is_burst {
                        store.drones[parent_drone_idx].stats.bursts_hit += 1.0;
                    }
                } else if didx == parent_drone_idx {
                    store.drones[didx].step_info.own_shot_taken = true;
                }
            }
            let (pos, angle) = world.transform(body);
            store.drones[didx].last_velocity = store.drones[didx].velocity;
            store.drones[didx].velocity = world.linear_velocity(body);
            store.drones[didx].pos = pos;
            let _ = angle;
        }
    }
}

/// Drains `queue`, detaching each mine via the normal destroyer without
/// re-exploding it — the only safe place to free bodies after an AABB pass.
pub fn destroy_exploded_projectiles(store: &mut EntityStore, world: &mut dyn PhysicsWorld, queue: &mut Vec<ProjectileId>) {
    for id in queue.drain(..) {
        let Some(proj) = store.remove_projectile(id) else { continue };
        store.unregister_body(proj.body);
        store.unregister_shape(proj.shape);
        if let Some(sensor) = proj.sensor {
            store.unregister_shape(sensor);
        }
        if let Some(joint) = proj.weld_joint {
            world.destroy_joint(joint);
        }
        world.destroy_shape(proj.shape);
        if let Some(sensor) = proj.sensor {
            world.destroy_shape(sensor);
        }
        world.destroy_body(proj.body);
    }
}
