//! Sudden-Death Controller (§4.5): periodic ring-of-walls placement that
//! reconciles with floating walls, projectiles, pickups and drones.

use crate::entities::{EntityRef, EntityStore, WallKind};
use crate::map::{category, Map};
use crate::math::Vec2;
use crate::physics::{BodyDef, BodyKind, PhysicsWorld, Shape, ShapeDef, ShapeFilter};
use crate::spawner::SpawnerState;

#[derive(Clone, Debug)]
pub struct SuddenDeathState {
    pub period_left: u16,
    pub wall_counter: u16,
}

impl SuddenDeathState {
    pub fn new() -> Self {
        SuddenDeathState {
            period_left: crate::constants::SUDDEN_DEATH_PERIOD_STEPS,
            wall_counter: 0,
        }
    }
}

/// Called every substep once the episode's `stepsLeft` has reached 0.
/// Decrements `periodLeft`; when that hits 0, places a ring and resets the
/// period. Returns `true` if a new ring was placed this tick (caller should
/// then re-run the round-over check).
pub fn tick(
    state: &mut SuddenDeathState,
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    spawner_state: &mut SpawnerState,
    alive_drones: usize,
) -> bool {
    if alive_drones <= 1 {
        return false;
    }
    if state.period_left > 0 {
        state.period_left -= 1;
        return false;
    }
    place_ring(state, store, world, map, spawner_state);
    state.period_left = crate::constants::SUDDEN_DEATH_PERIOD_STEPS;
    true
}

fn place_ring(
    state: &mut SuddenDeathState,
    store: &mut EntityStore,
    world: &mut dyn PhysicsWorld,
    map: &Map,
    spawner_state: &mut SpawnerState,
) {
    let ring = state.wall_counter as usize;
    state.wall_counter += 1;
    let rows = store.rows;
    let columns = store.columns;

    for row in 0..rows {
        for col in 0..columns {
            let depth = row.min(rows - 1 - row).min(col).min(columns - 1 - col);
            if depth != ring {
                continue;
            }
            let idx = store.cell_index(row, col);
            if matches!(store.cells[idx].occupant, Some(EntityRef::Wall(_))) {
                continue;
            }
            if let Some(EntityRef::Pickup(p)) = store.cells[idx].occupant {
                let weapon = store.pickups[p].weapon;
                crate::spawner::disable_pickup(store, world, p, f32::INFINITY);
                spawner_state.on_pickup_disabled(weapon);
            }

            let pos = Vec2::new((col as f32 + 0.5) * map.cell_size, (row as f32 + 0.5) * map.cell_size);
            let body = world.create_body(BodyDef {
                kind: BodyKind::Static,
                position: pos,
                ..Default::default()
            });
            let shape = world.create_shape(
                body,
                ShapeDef {
                    shape: Shape::Box {
                        half_extent: Vec2::new(map.cell_size / 2.0, map.cell_size / 2.0),
                    },
                    filter: ShapeFilter::new(category::WALL, u32::MAX),
                    enable_contact_events: true,
                    ..Default::default()
                },
            );
            let wall_idx = store.walls.len();
            store.walls.push(crate::entities::Wall {
                kind: WallKind::Death,
                body,
                shape,
                pos,
                extent: Vec2::new(map.cell_size / 2.0, map.cell_size / 2.0),
                cell_idx: idx,
                floating: false,
                sudden_death: true,
                rot: 0.0,
                velocity: Vec2::ZERO,
            });
            store.register_body(body, EntityRef::Wall(wall_idx));
            store.register_shape(shape, EntityRef::Wall(wall_idx));
            store.set_cell_occupant(idx, Some(EntityRef::Wall(wall_idx)));
        }
    }

    reconcile(store, world, map);
}

fn cell_has_static_wall(store: &EntityStore, map: &Map, pos: Vec2) -> bool {
    match map.cell_of(pos) {
        Some((row, col)) => {
            let idx = store.cell_index(row, col);
            matches!(store.cells[idx].occupant, Some(EntityRef::Wall(w)) if !store.walls[w].floating)
        }
        None => false,
    }
}

/// Kills drones caught inside the new ring; destroys floating walls and
/// projectiles whose cell is now a static wall.
fn reconcile(store: &mut EntityStore, world: &mut dyn PhysicsWorld, map: &Map) {
    let wall_filter = ShapeFilter::new(u32::MAX, category::WALL);

    for idx in 0..store.drones.len() {
        if store.drones[idx].dead {
            continue;
        }
        let pos = store.drones[idx].pos;
        let hits = world.overlap_circle(pos, crate::constants::DRONE_RADIUS, wall_filter);
        if !hits.is_empty() {
            crate::drone_mechanics::kill_drone(store, world, idx);
        }
    }

    let floating_in_wall: Vec<usize> = store
        .walls
        .iter()
        .enumerate()
        .filter(|(_, w)| w.floating && cell_has_static_wall(store, map, w.pos))
        .map(|(i, _)| i)
        .collect();
    for wall_idx in floating_in_wall {
        let (body, shape) = (store.walls[wall_idx].body, store.walls[wall_idx].shape);
        world.destroy_shape(shape);
        world.destroy_body(body);
        store.unregister_body(body);
        store.unregister_shape(shape);
    }

    let stale_projectiles: Vec<_> = store
        .projectile_ids()
        .into_iter()
        .filter(|&id| cell_has_static_wall(store, map, store.projectile(id).unwrap().pos))
        .collect();
    for id in stale_projectiles {
        if let Some(proj) = store.remove_projectile(id) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::native::NativeWorld;

    #[test]
    fn counter_increments_monotonically() {
        let mut state = SuddenDeathState::new();
        assert_eq!(state.wall_counter, 0);
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(0, 0);
        let map = Map::load(crate::mapbank::built_in_maps().remove(0), 1.0, &mut world, &mut store);
        let mut spawner_state = SpawnerState::default();
        place_ring(&mut state, &mut store, &mut world, &map, &mut spawner_state);
        assert_eq!(state.wall_counter, 1);
        place_ring(&mut state, &mut store, &mut world, &map, &mut spawner_state);
        assert_eq!(state.wall_counter, 2);
    }
}
