//! The map-bank external collaborator (§6): read-only static layouts and
//! spawn-zone metadata. The core ships a small built-in set so the engine
//! is runnable standalone; a production deployment can load its own TOML
//! fixtures through [`MapDef`]'s `serde` impls instead.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::weapons::WeaponKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Standard,
    Bouncy,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn sample(&self, rng: &mut crate::math::RandState) -> Vec2 {
        Vec2::new(
            rng.range_f32(self.min.x, self.max.x),
            rng.range_f32(self.min.y, self.max.y),
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapDef {
    pub name: String,
    /// Flattened cell layout using the same `col + row*columns` indexing as
    /// [`crate::entities::EntityStore::cell_index`].
    pub layout: Vec<CellKind>,
    pub columns: u8,
    pub rows: u8,
    pub default_weapon: WeaponKind,
    pub floating_standard_walls: u8,
    pub floating_bouncy_walls: u8,
    pub floating_death_walls: u8,
    pub weapon_pickups: u16,
    pub spawn_quads: [Aabb; 4],
    /// `true` at index `row*columns+col` where a drone may spawn.
    pub drone_spawn_mask: Vec<bool>,
}

impl MapDef {
    pub fn cell_index(&self, row: usize, col: usize) -> usize {
        col + row * self.columns as usize
    }

    /// Decodes a tiny run-length encoding: tokens are `<count><kind>` with
    /// `kind` one of `e` (empty), `s` (standard), `b` (bouncy), e.g.
    /// `"14e1s14e"` for a 16-wide row with one wall in the middle.
    pub fn decode_rle(rle: &str) -> Vec<CellKind> {
        let mut out = Vec::new();
        let mut count = String::new();
        for c in rle.chars() {
            if c.is_ascii_digit() {
                count.push(c);
            } else {
                let n: usize = count.parse().unwrap_or(1);
                let kind = match c {
                    's' => CellKind::Standard,
                    'b' => CellKind::Bouncy,
                    _ => CellKind::Empty,
                };
                out.extend(std::iter::repeat(kind).take(n));
                count.clear();
            }
        }
        out
    }
}

fn bordered_arena(columns: u8, rows: u8, default_weapon: WeaponKind) -> MapDef {
    let (c, r) = (columns as usize, rows as usize);
    let mut layout = vec![CellKind::Empty; c * r];
    for col in 0..c {
        layout[col] = CellKind::Standard;
        layout[(r - 1) * c + col] = CellKind::Standard;
    }
    for row in 0..r {
        layout[row * c] = CellKind::Standard;
        layout[row * c + (c - 1)] = CellKind::Standard;
    }
    let unit = 1.0f32;
    let w = c as f32 * unit;
    let h = r as f32 * unit;
    let half_w = w / 2.0;
    let half_h = h / 2.0;
    let spawn_quads = [
        Aabb {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(half_w, half_h),
        },
        Aabb {
            min: Vec2::new(half_w, 0.0),
            max: Vec2::new(w, half_h),
        },
        Aabb {
            min: Vec2::new(0.0, half_h),
            max: Vec2::new(half_w, h),
        },
        Aabb {
            min: Vec2::new(half_w, half_h),
            max: Vec2::new(w, h),
        },
    ];
    let mut drone_spawn_mask = vec![true; c * r];
    for col in 0..c {
        drone_spawn_mask[col] = false;
        drone_spawn_mask[(r - 1) * c + col] = false;
    }
    for row in 0..r {
        drone_spawn_mask[row * c] = false;
        drone_spawn_mask[row * c + (c - 1)] = false;
    }
    MapDef {
        name: "open_arena".into(),
        layout,
        columns,
        rows,
        default_weapon,
        floating_standard_walls: 2,
        floating_bouncy_walls: 1,
        floating_death_walls: 0,
        weapon_pickups: 4,
        spawn_quads,
        drone_spawn_mask,
    }
}

fn cross_arena(columns: u8, rows: u8, default_weapon: WeaponKind) -> MapDef {
    let mut map = bordered_arena(columns, rows, default_weapon);
    map.name = "cross".into();
    let (c, r) = (columns as usize, rows as usize);
    let mid_col = c / 2;
    let mid_row = r / 2;
    for row in 2..r - 2 {
        if row != mid_row {
            let idx = map.cell_index(row, mid_col);
            map.layout[idx] = CellKind::Bouncy;
            map.drone_spawn_mask[idx] = false;
        }
    }
    map.floating_standard_walls = 1;
    map.floating_bouncy_walls = 2;
    map
}

/// Built-in map bank. Returned fresh each call since `MapDef` owns `Vec`s
/// (no `const` fixtures); callers typically fetch this once at `Env`
/// construction.
pub fn built_in_maps() -> Vec<MapDef> {
    vec![
        bordered_arena(16, 16, WeaponKind::Standard),
        cross_arena(18, 14, WeaponKind::Standard),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bordered_arena_has_closed_perimeter() {
        let map = bordered_arena(6, 5, WeaponKind::Standard);
        for col in 0..6 {
            assert_eq!(map.layout[map.cell_index(0, col)], CellKind::Standard);
            assert_eq!(map.layout[map.cell_index(4, col)], CellKind::Standard);
        }
    }

    #[test]
    fn rle_decode_matches_counts() {
        let cells = MapDef::decode_rle("3e2s1b");
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[3], CellKind::Standard);
        assert_eq!(cells[5], CellKind::Bouncy);
    }

    #[test]
    fn built_in_maps_are_nonempty() {
        assert!(!built_in_maps().is_empty());
    }
}
