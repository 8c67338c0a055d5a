//! Map & Spatial Index (§4.1): the live arena derived from a [`MapDef`] —
//! static wall bodies registered with the physics world, a KD-tree over
//! those walls for nearest-wall queries, and cell/grid bookkeeping shared
//! by the spawner, sudden-death controller, and observation packer.

use crate::entities::{EntityRef, EntityStore, Wall, WallKind};
use crate::kdtree::KdTree;
use crate::mapbank::{CellKind, MapDef};
use crate::math::Vec2;
use crate::physics::{BodyDef, BodyKind, PhysicsWorld, Shape, ShapeDef, ShapeFilter};

/// Bit categories used when constructing [`ShapeFilter`]s, mirrored from
/// `enum shapeCategory` in the original engine.
pub mod category {
    pub const WALL: u32 = 1;
    pub const FLOATING_WALL: u32 = 2;
    pub const PROJECTILE: u32 = 4;
    pub const PICKUP: u32 = 8;
    pub const DRONE: u32 = 16;
    pub const SHIELD: u32 = 32;
}

pub struct Map {
    pub def: MapDef,
    pub cell_size: f32,
    wall_tree: KdTree,
}

impl Map {
    /// Instantiates static wall bodies for every non-empty cell of `def`
    /// into `world`/`store`, and builds the KD-tree over them.
    pub fn load(def: MapDef, cell_size: f32, world: &mut dyn PhysicsWorld, store: &mut EntityStore) -> Self {
        let rows = def.rows as usize;
        let columns = def.columns as usize;
        store.cells = vec![Default::default(); rows * columns];
        store.rows = rows;
        store.columns = columns;

        let mut wall_points = Vec::new();
        for row in 0..rows {
            for col in 0..columns {
                let idx = def.cell_index(row, col);
                let cell_kind = def.layout[idx];
                if cell_kind == CellKind::Empty {
                    continue;
                }
                let pos = Vec2::new(
                    (col as f32 + 0.5) * cell_size,
                    (row as f32 + 0.5) * cell_size,
                );
                let wall_kind = match cell_kind {
                    CellKind::Standard => WallKind::Standard,
                    CellKind::Bouncy => WallKind::Bouncy,
                    CellKind::Empty => unreachable!(),
                };
                let body = world.create_body(BodyDef {
                    kind: BodyKind::Static,
                    position: pos,
                    ..Default::default()
                });
                let shape = world.create_shape(
                    body,
                    ShapeDef {
                        shape: Shape::Box {
                            half_extent: Vec2::new(cell_size / 2.0, cell_size / 2.0),
                        },
                        filter: ShapeFilter::new(category::WALL, u32::MAX),
                        restitution: if wall_kind == WallKind::Bouncy { 1.0 } else { 0.0 },
                        enable_contact_events: true,
                        ..Default::default()
                    },
                );
                let wall_idx = store.walls.len();
                store.walls.push(Wall {
                    kind: wall_kind,
                    body,
                    shape,
                    pos,
                    extent: Vec2::new(cell_size / 2.0, cell_size / 2.0),
                    cell_idx: idx,
                    floating: false,
                    sudden_death: false,
                    rot: 0.0,
                    velocity: Vec2::ZERO,
                });
                store.register_body(body, EntityRef::Wall(wall_idx));
                store.register_shape(shape, EntityRef::Wall(wall_idx));
                store.set_cell_occupant(idx, Some(EntityRef::Wall(wall_idx)));
                wall_points.push((pos, wall_idx));
            }
        }

        let wall_tree = KdTree::build(wall_points);
        Map {
            def,
            cell_size,
            wall_tree,
        }
    }

    pub fn width(&self) -> f32 {
        self.def.columns as f32 * self.cell_size
    }

    pub fn height(&self) -> f32 {
        self.def.rows as f32 * self.cell_size
    }

    pub fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.width() && p.y >= 0.0 && p.y <= self.height()
    }

    pub fn cell_of(&self, p: Vec2) -> Option<(usize, usize)> {
        if !self.in_bounds(p) {
            return None;
        }
        let col = ((p.x / self.cell_size) as usize).min(self.def.columns as usize - 1);
        let row = ((p.y / self.cell_size) as usize).min(self.def.rows as usize - 1);
        Some((row, col))
    }

    /// The `k` static walls nearest `point`, nearest first. Indexes into
    /// `EntityStore::walls`.
    pub fn nearest_walls(&self, point: Vec2, k: usize) -> Vec<usize> {
        self.wall_tree.nearest_k(point, k)
    }

    pub fn wall_count(&self) -> usize {
        self.wall_tree.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::native::NativeWorld;
    use crate::weapons::WeaponKind;

    fn tiny_map() -> MapDef {
        MapDef {
            name: "t".into(),
            layout: vec![
                CellKind::Standard, CellKind::Standard, CellKind::Standard,
                CellKind::Standard, CellKind::Empty, CellKind::Standard,
                CellKind::Standard, CellKind::Standard, CellKind::Standard,
            ],
            columns: 3,
            rows: 3,
            default_weapon: WeaponKind::Standard,
            floating_standard_walls: 0,
            floating_bouncy_walls: 0,
            floating_death_walls: 0,
            weapon_pickups: 0,
            spawn_quads: [
                crate::mapbank::Aabb { min: Vec2::ZERO, max: Vec2::ZERO },
                crate::mapbank::Aabb { min: Vec2::ZERO, max: Vec2::ZERO },
                crate::mapbank::Aabb { min: Vec2::ZERO, max: Vec2::ZERO },
                crate::mapbank::Aabb { min: Vec2::ZERO, max: Vec2::ZERO },
            ],
            drone_spawn_mask: vec![false, false, false, false, true, false, false, false, false],
        }
    }

    #[test]
    fn load_registers_only_nonempty_cells() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(0, 0);
        let map = Map::load(tiny_map(), 1.0, &mut world, &mut store);
        assert_eq!(store.walls.len(), 8);
        assert_eq!(map.wall_count(), 8);
    }

    #[test]
    fn center_cell_is_in_bounds_and_empty() {
        let mut world = NativeWorld::new();
        let mut store = EntityStore::new(0, 0);
        let map = Map::load(tiny_map(), 1.0, &mut world, &mut store);
        let center = Vec2::new(1.5, 1.5);
        assert!(map.in_bounds(center));
        assert_eq!(map.cell_of(center), Some((1, 1)));
        let nearest = map.nearest_walls(center, 1);
        assert_eq!(nearest.len(), 1);
    }
}
