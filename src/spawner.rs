//! Spawner (§4.1): open-position search honoring quadrants/spacing, and the
//! weighted weapon-pickup draw.

use crate::constants::{
    DRONE_DRONE_SPAWN_DISTANCE, MIN_SPAWN_DISTANCE, PICKUP_SENSOR_RADIUS, PICKUP_SPAWN_DISTANCE,
};
use crate::entities::EntityStore;
use crate::map::{category, Map};
use crate::math::{RandState, Vec2};
use crate::physics::{BodyDef, BodyId, BodyKind, PhysicsWorld, Shape, ShapeDef, ShapeFilter, ShapeId};
use crate::weapons::{WeaponKind, WEAPON_TABLE};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpawnKind {
    Drone,
    Pickup,
    Wall,
}

/// Tracks how many of each weapon have been handed out this episode, so
/// `rand_weapon_pickup_type` can self-balance diversity (§4.1).
#[derive(Clone, Debug, Default)]
pub struct SpawnerState {
    pub spawned_weapon_pickups: [u32; crate::constants::NUM_WEAPONS],
}

impl SpawnerState {
    pub fn on_pickup_spawned(&mut self, weapon: WeaponKind) {
        self.spawned_weapon_pickups[weapon.index()] += 1;
    }

    pub fn on_pickup_disabled(&mut self, weapon: WeaponKind) {
        let count = &mut self.spawned_weapon_pickups[weapon.index()];
        *count = count.saturating_sub(1);
    }
}

/// Weighted draw over every weapon but `default`: weight `w` is
/// `spawnWeight(w) / ((spawnedCount(w)+1)*2)`, renormalized.
pub fn rand_weapon_pickup_type(
    rng: &mut RandState,
    state: &SpawnerState,
    default: WeaponKind,
) -> WeaponKind {
    let mut weights = [0.0f32; crate::constants::NUM_WEAPONS];
    let mut total = 0.0f32;
    for info in WEAPON_TABLE.iter() {
        if info.kind == default {
            continue;
        }
        let spawned = state.spawned_weapon_pickups[info.kind.index()] as f32;
        let w = info.spawn_weight / ((spawned + 1.0) * 2.0);
        weights[info.kind.index()] = w;
        total += w;
    }
    if total <= 0.0 {
        return default;
    }
    let mut draw = rng.range_f32(0.0, total);
    for info in WEAPON_TABLE.iter() {
        if info.kind == default {
            continue;
        }
        let w = weights[info.kind.index()];
        if draw < w {
            return info.kind;
        }
        draw -= w;
    }
    default
}

fn min_distance_sq_ok(
    world: &dyn PhysicsWorld,
    pos: Vec2,
    min_dist: f32,
    filter: ShapeFilter,
) -> bool {
    let half = Vec2::new(min_dist, min_dist);
    let candidates = world.overlap_aabb(pos - half, pos + half, filter);
    candidates.is_empty()
}

/// Iterates unvisited cells in random order until one satisfies every
/// constraint for `kind`, or every cell has been rejected.
pub fn find_open_pos(
    rng: &mut RandState,
    map: &Map,
    store: &EntityStore,
    world: &dyn PhysicsWorld,
    kind: SpawnKind,
    quadrant: Option<usize>,
) -> Option<Vec2> {
    if let Some(q) = quadrant {
        let aabb = map.def.spawn_quads[q];
        for _ in 0..32 {
            let candidate = aabb.sample(rng);
            if is_valid_spawn(rng, map, store, world, kind, candidate) {
                return Some(candidate);
            }
        }
        return None;
    }

    let total_cells = store.rows * store.columns;
    let mut order: Vec<usize> = (0..total_cells).collect();
    rng.shuffle(&mut order);

    for idx in order {
        let (row, col) = store.cell_row_col(idx);
        if store.cells[idx].occupant.is_some() {
            continue;
        }
        if kind == SpawnKind::Drone && !map.def.drone_spawn_mask[idx] {
            continue;
        }
        let pos = Vec2::new(
            (col as f32 + 0.5) * map.cell_size,
            (row as f32 + 0.5) * map.cell_size,
        );
        if is_valid_spawn(rng, map, store, world, kind, pos) {
            return Some(pos);
        }
    }
    None
}

fn is_valid_spawn(
    _rng: &mut RandState,
    _map: &Map,
    store: &EntityStore,
    world: &dyn PhysicsWorld,
    kind: SpawnKind,
    pos: Vec2,
) -> bool {
    match kind {
        SpawnKind::Drone => {
            let min_sq = DRONE_DRONE_SPAWN_DISTANCE * DRONE_DRONE_SPAWN_DISTANCE;
            for drone in &store.drones {
                if drone.dead {
                    continue;
                }
                if drone.pos.distance_squared(pos) < min_sq {
                    return false;
                }
            }
        }
        SpawnKind::Pickup => {
            let min_sq = PICKUP_SPAWN_DISTANCE * PICKUP_SPAWN_DISTANCE;
            for pickup in &store.pickups {
                if pickup.is_disabled() {
                    continue;
                }
                if pickup.pos.distance_squared(pos) < min_sq {
                    return false;
                }
            }
        }
        SpawnKind::Wall => {
            let min_sq = PICKUP_SPAWN_DISTANCE * PICKUP_SPAWN_DISTANCE;
            for wall in &store.walls {
                if wall.floating && wall.pos.distance_squared(pos) < min_sq {
                    return false;
                }
            }
        }
    }

    let filter = ShapeFilter::new(u32::MAX, category::FLOATING_WALL | category::DRONE);
    min_distance_sq_ok(world, pos, MIN_SPAWN_DISTANCE, filter)
}

/// Creates the static sensor body+shape a weapon pickup sits on, shared by
/// initial map population and the respawn path.
pub fn spawn_pickup_shape(world: &mut dyn PhysicsWorld, pos: Vec2) -> (BodyId, ShapeId) {
    let body = world.create_body(BodyDef {
        kind: BodyKind::Static,
        position: pos,
        ..Default::default()
    });
    let shape = world.create_shape(
        body,
        ShapeDef {
            shape: Shape::Circle {
                radius: PICKUP_SENSOR_RADIUS,
            },
            filter: ShapeFilter::new(category::PICKUP, category::DRONE),
            is_sensor: true,
            enable_sensor_events: true,
            ..Default::default()
        },
    );
    (body, shape)
}

/// Disables a pickup in place: destroys its body/shape (it is not merely
/// deactivated, per §3) and clears its cell back-reference. Used both for
/// normal pickup-by-drone and sudden-death cell reclamation.
pub fn disable_pickup(
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    pickup_idx: usize,
    respawn_wait: f32,
) {
    use crate::entities::EntityRef;

    let pickup = &mut store.pickups[pickup_idx];
    if pickup.is_disabled() {
        return;
    }
    pickup.respawn_wait = respawn_wait;
    let body = pickup.body.take();
    let shape = pickup.shape.take();
    pickup.body_destroyed = true;
    let cell_idx = pickup.cell_idx;

    if let Some(shape) = shape {
        store.unregister_shape(shape);
        world.destroy_shape(shape);
    }
    if let Some(body) = body {
        world.destroy_body(body);
    }
    store.clear_cell_if(cell_idx, EntityRef::Pickup(pickup_idx));
}

/// Ticks every disabled pickup's respawn timer; once it reaches zero the
/// caller (step orchestrator) attempts to respawn it at a fresh open
/// position via `find_open_pos`.
pub fn pickup_step(store: &mut EntityStore, dt: f32) -> Vec<usize> {
    let mut ready = Vec::new();
    for (idx, pickup) in store.pickups.iter_mut().enumerate() {
        if pickup.respawn_wait > 0.0 {
            pickup.respawn_wait = (pickup.respawn_wait - dt).max(0.0);
            if pickup.respawn_wait == 0.0 {
                ready.push(idx);
            }
        }
    }
    ready
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_draw_never_returns_default() {
        let mut rng = RandState::new(7);
        let state = SpawnerState::default();
        for _ in 0..50 {
            let kind = rand_weapon_pickup_type(&mut rng, &state, WeaponKind::Standard);
            assert_ne!(kind, WeaponKind::Standard);
        }
    }

    #[test]
    fn spawned_counts_reduce_future_weight() {
        let mut state = SpawnerState::default();
        state.on_pickup_spawned(WeaponKind::Sniper);
        state.on_pickup_spawned(WeaponKind::Sniper);
        assert_eq!(state.spawned_weapon_pickups[WeaponKind::Sniper.index()], 2);
        state.on_pickup_disabled(WeaponKind::Sniper);
        assert_eq!(state.spawned_weapon_pickups[WeaponKind::Sniper.index()], 1);
    }
}
