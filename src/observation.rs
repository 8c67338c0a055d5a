//! Observation Packer (§4.6): a bit-packed local map view plus a
//! fixed-offset f32 scalar vector, per agent.

use crate::constants::*;
use crate::entities::{EntityRef, EntityStore};
use crate::map::Map;
use crate::math::scale_value;
use crate::weapons;

pub fn scalar_len(num_drones: usize) -> usize {
    NUM_NEAREST_WALLS * WALL_OBS_STRIDE
        + MAX_FLOATING_WALLS * FLOATING_WALL_OBS_STRIDE
        + MAX_PICKUPS * PICKUP_OBS_STRIDE
        + NUM_PROJECTILE_OBS * PROJECTILE_OBS_STRIDE
        + (num_drones - 1) * ENEMY_DRONE_OBS_STRIDE
        + SELF_DRONE_OBS_STRIDE
        + 1
}

/// Local id used inside the packed map/scalar view: the observing agent is
/// always 0; everyone else keeps their relative creation order.
fn local_id(agent_idx: usize, global_idx: usize) -> usize {
    if global_idx == agent_idx {
        0
    } else if global_idx < agent_idx {
        global_idx + 1
    } else {
        global_idx
    }
}

fn pack_cell_byte(wall_type_plus1: u8, is_floating: bool, is_pickup: bool, drone_idx_plus1: u8) -> u8 {
    let mut b = (wall_type_plus1 & 0b11) << 5;
    if is_floating {
        b |= 1 << 4;
    }
    if is_pickup {
        b |= 1 << 3;
    }
    b |= drone_idx_plus1 & 0b111;
    b
}

fn write_map_window(store: &EntityStore, map: &Map, agent_idx: usize, center: (usize, usize), out: &mut [u8]) {
    debug_assert_eq!(out.len(), MAP_OBS_SIZE);
    out.fill(0);

    let half_rows = (MAP_OBS_ROWS / 2) as isize;
    let half_cols = (MAP_OBS_COLUMNS / 2) as isize;

    // occupied_cell -> local drone id, resolved with 8-neighbor nudging.
    let mut drone_cell: Vec<Option<usize>> = vec![None; store.rows * store.columns];
    let mut order: Vec<usize> = (0..store.drones.len()).collect();
    order.sort_by_key(|&g| local_id(agent_idx, g));
    for &g in &order {
        let drone = &store.drones[g];
        if drone.dead {
            continue;
        }
        let Some((row, col)) = map.cell_of(drone.pos) else { continue };
        let mut idx = store.cell_index(row, col);
        if drone_cell[idx].is_some() {
            idx = nearest_empty_neighbor(store, &drone_cell, row, col).unwrap_or(idx);
        }
        drone_cell[idx] = Some(local_id(agent_idx, g));
    }

    for dy in -half_rows..=half_rows {
        for dx in -half_cols..=half_cols {
            let row = center.0 as isize + dy;
            let col = center.1 as isize + dx;
            if row < 0 || col < 0 || row as usize >= store.rows || col as usize >= store.columns {
                continue;
            }
            let (row, col) = (row as usize, col as usize);
            let idx = store.cell_index(row, col);

            let mut wall_type_plus1 = 0u8;
            let mut is_floating = false;
            let mut is_pickup = false;
            match store.cells[idx].occupant {
                Some(EntityRef::Wall(w)) => {
                    wall_type_plus1 = store.walls[w].kind as u8 + 1;
                    is_floating = store.walls[w].floating;
                }
                Some(EntityRef::Pickup(p)) => {
                    is_pickup = !store.pickups[p].is_disabled();
                }
                _ => {}
            }
            let drone_plus1 = drone_cell[idx].map(|id| id as u8 + 1).unwrap_or(0);

            let out_row = (dy + half_rows) as usize;
            let out_col = (dx + half_cols) as usize;
            out[out_row * MAP_OBS_COLUMNS + out_col] =
                pack_cell_byte(wall_type_plus1, is_floating, is_pickup, drone_plus1);
        }
    }
}

fn nearest_empty_neighbor(store: &EntityStore, drone_cell: &[Option<usize>], row: usize, col: usize) -> Option<usize> {
    let rows = store.rows as isize;
    let cols = store.columns as isize;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dy == 0 && dx == 0 {
                continue;
            }
            let r = row as isize + dy;
            let c = col as isize + dx;
            if r < 0 || c < 0 || r >= rows || c >= cols {
                continue;
            }
            let idx = store.cell_index(r as usize, c as usize);
            if drone_cell[idx].is_none() {
                return Some(idx);
            }
        }
    }
    None
}

pub struct ObsContext<'a> {
    pub store: &'a EntityStore,
    pub map: &'a Map,
    pub agent_idx: usize,
    pub steps_left_frac: f32,
}

/// Writes the agent's local map window and scalar vector. `scalar_out`
/// must be exactly `scalar_len(num_drones)` long.
pub fn compute_obs(ctx: &ObsContext, map_out: &mut [u8], scalar_out: &mut [f32]) {
    let store = ctx.store;
    let agent = &store.drones[ctx.agent_idx];
    let Some(center) = ctx.map.cell_of(agent.pos) else {
        map_out.fill(0);
        scalar_out.fill(0.0);
        return;
    };
    write_map_window(store, ctx.map, ctx.agent_idx, center, map_out);

    let mut w = ScalarWriter { buf: scalar_out, pos: 0 };
    let max_map_dist = (ctx.map.width().max(ctx.map.height())).max(1.0);
    let default_weapon = ctx.map.def.default_weapon;

    let nearest = ctx.map.nearest_walls(agent.pos, NUM_NEAREST_WALLS);
    for i in 0..NUM_NEAREST_WALLS {
        if let Some(&widx) = nearest.get(i) {
            let wall = &store.walls[widx];
            w.push(wall.kind as u8 as f32);
            w.push(scale_value(wall.pos.x - agent.pos.x, max_map_dist, false));
            w.push(scale_value(wall.pos.y - agent.pos.y, max_map_dist, false));
        } else {
            w.push(0.0);
            w.push(0.0);
            w.push(0.0);
        }
    }

    let floating: Vec<usize> = store.walls.iter().enumerate().filter(|(_, wl)| wl.floating).map(|(i, _)| i).take(MAX_FLOATING_WALLS).collect();
    for i in 0..MAX_FLOATING_WALLS {
        if let Some(&widx) = floating.get(i) {
            let wall = &store.walls[widx];
            w.push(wall.kind as u8 as f32 + 1.0);
            w.push(scale_value(wall.pos.x - agent.pos.x, max_map_dist, false));
            w.push(scale_value(wall.pos.y - agent.pos.y, max_map_dist, false));
            w.push(scale_value(wall.rot, std::f32::consts::PI, false));
            w.push(scale_value(wall.velocity.x, ACCELERATOR_MAX_SPEED, false));
            w.push(scale_value(wall.velocity.y, ACCELERATOR_MAX_SPEED, false));
        } else {
            for _ in 0..FLOATING_WALL_OBS_STRIDE {
                w.push(0.0);
            }
        }
    }

    let pickups: Vec<usize> = store.pickups.iter().enumerate().filter(|(_, p)| !p.is_disabled()).map(|(i, _)| i).take(MAX_PICKUPS).collect();
    for i in 0..MAX_PICKUPS {
        if let Some(&pidx) = pickups.get(i) {
            let pickup = &store.pickups[pidx];
            w.push(pickup.weapon.index() as f32 + 1.0);
            w.push(scale_value(pickup.pos.x - agent.pos.x, max_map_dist, false));
            w.push(scale_value(pickup.pos.y - agent.pos.y, max_map_dist, false));
        } else {
            for _ in 0..PICKUP_OBS_STRIDE {
                w.push(0.0);
            }
        }
    }

    let projectile_ids = store.projectile_ids();
    for i in 0..NUM_PROJECTILE_OBS {
        if let Some(&pid) = projectile_ids.get(i) {
            let proj = store.projectile(pid).unwrap();
            w.push(proj.weapon.index() as f32 + 1.0);
            w.push(proj.drone_idx as f32 + 1.0);
            w.push(scale_value(proj.pos.x - agent.pos.x, max_map_dist, false));
            w.push(scale_value(proj.pos.y - agent.pos.y, max_map_dist, false));
        } else {
            for _ in 0..PROJECTILE_OBS_STRIDE {
                w.push(0.0);
            }
        }
    }

    let mut enemy_order: Vec<usize> = (0..store.drones.len()).filter(|&i| i != ctx.agent_idx).collect();
    enemy_order.sort_unstable();
    for &eidx in &enemy_order {
        let enemy = &store.drones[eidx];
        let info = weapons::weapon_info(enemy.weapon);
        let delta = enemy.pos - agent.pos;
        let dist = delta.length();
        let bearing = delta.angle() - agent.last_aim.angle();
        w.push(enemy.weapon.index() as f32 + 1.0);
        w.push(if agent.in_line_of_sight.get(eidx).copied().unwrap_or(false) { 1.0 } else { 0.0 });
        w.push(scale_value(delta.x, max_map_dist, false));
        w.push(scale_value(delta.y, max_map_dist, false));
        w.push(scale_value(dist, max_map_dist, true));
        w.push(scale_value(enemy.velocity.x, DRONE_MOVE_MAGNITUDE, false));
        w.push(scale_value(enemy.velocity.y, DRONE_MOVE_MAGNITUDE, false));
        w.push(scale_value(enemy.velocity.x - enemy.last_velocity.x, DRONE_MOVE_MAGNITUDE, false));
        w.push(scale_value(enemy.velocity.y - enemy.last_velocity.y, DRONE_MOVE_MAGNITUDE, false));
        let norm = delta.normalize();
        w.push(scale_value(norm.x, 1.0, false));
        w.push(scale_value(norm.y, 1.0, false));
        w.push(scale_value(bearing, std::f32::consts::PI, false));
        w.push(scale_value(enemy.last_aim.x, 1.0, false));
        w.push(scale_value(enemy.last_aim.y, 1.0, false));
        w.push(scale_value(enemy.last_aim.angle(), std::f32::consts::PI, false));
        w.push(ammo_frac(enemy.ammo, weapons::weapon_ammo(default_weapon, enemy.weapon) as i32));
        w.push(scale_value(enemy.weapon_cooldown, info.cool_down.max(0.001), true));
        w.push(scale_value(enemy.weapon_charge, info.charge.max(0.001), true));
    }

    let info = weapons::weapon_info(agent.weapon);
    w.push(agent.weapon.index() as f32 + 1.0);
    w.push(scale_value(agent.pos.x, max_map_dist, false));
    w.push(scale_value(agent.pos.y, max_map_dist, false));
    w.push(scale_value(agent.velocity.x, DRONE_MOVE_MAGNITUDE, false));
    w.push(scale_value(agent.velocity.y, DRONE_MOVE_MAGNITUDE, false));
    w.push(scale_value(agent.velocity.x - agent.last_velocity.x, DRONE_MOVE_MAGNITUDE, false));
    w.push(scale_value(agent.velocity.y - agent.last_velocity.y, DRONE_MOVE_MAGNITUDE, false));
    w.push(scale_value(agent.last_aim.x, 1.0, false));
    w.push(scale_value(agent.last_aim.y, 1.0, false));
    w.push(scale_value(agent.last_aim.angle(), std::f32::consts::PI, false));
    w.push(ammo_frac(agent.ammo, weapons::weapon_ammo(default_weapon, agent.weapon) as i32));
    w.push(scale_value(agent.weapon_cooldown, info.cool_down.max(0.001), true));
    w.push(scale_value(agent.weapon_charge, info.charge.max(0.001), true));
    w.push(if agent.step_info.shot_hit.iter().any(|&v| v != 0) { 1.0 } else { 0.0 });
    w.push(if agent.step_info.shot_taken.iter().any(|&v| v != 0) { 1.0 } else { 0.0 });
    w.push(if agent.step_info.own_shot_taken { 1.0 } else { 0.0 });

    w.push(ctx.steps_left_frac.clamp(0.0, 1.0));
}

fn ammo_frac(ammo: i8, assumed_max: i32) -> f32 {
    if ammo == INFINITE_AMMO {
        1.0
    } else {
        scale_value(ammo as f32, assumed_max as f32, true)
    }
}

struct ScalarWriter<'a> {
    buf: &'a mut [f32],
    pos: usize,
}

impl<'a> ScalarWriter<'a> {
    fn push(&mut self, v: f32) {
        if self.pos < self.buf.len() {
            self.buf[self.pos] = v;
        }
        self.pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_cell_byte_round_trips_fields() {
        let b = pack_cell_byte(2, true, true, 3);
        assert_eq!((b >> 5) & 0b11, 2);
        assert_eq!((b >> 4) & 1, 1);
        assert_eq!((b >> 3) & 1, 1);
        assert_eq!(b & 0b111, 3);
    }

    #[test]
    fn scalar_len_grows_with_drone_count() {
        assert!(scalar_len(4) > scalar_len(2));
    }
}
