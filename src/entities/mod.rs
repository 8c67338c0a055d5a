//! Tagged-variant entities, owning containers, and the grid's non-owning
//! back-pointers (§3, §9 "Tagged variants" / "Non-owning back-refs").

pub mod drone;
pub mod log;
pub mod pickup;
pub mod projectile;
pub mod shield;
pub mod stats;
pub mod wall;

pub use drone::Drone;
pub use pickup::WeaponPickup;
pub use projectile::Projectile;
pub use shield::Shield;
pub use wall::{Wall, WallKind};

use std::collections::HashMap;

use crate::math::Vec2;
use crate::physics::{BodyId, ShapeId};

/// A dense, generation-free handle into a [`Projectile`] slot. Stable
/// across destruction of *other* projectiles; reused slots get a fresh
/// `Projectile` but the same index, which is safe here because nothing
/// outside `EntityStore` holds a `ProjectileId` across a destroy call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub usize);

/// Tag + handle pair identifying any live entity. Stands in for the
/// `(tag, handle)` userdata the spec's design notes say should live on the
/// physics body/shape; our physics trait has no userdata slot, so the
/// store keeps the reverse maps itself (`body_owner` / `shape_owner`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Wall(usize),
    Pickup(usize),
    Projectile(ProjectileId),
    Drone(usize),
}

/// A unit grid cell. `occupant` is the single non-floating entity sitting
/// in this cell, if any (§3 invariant: at most one).
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub pos: Vec2,
    pub occupant: Option<EntityRef>,
}

/// Owning containers for every entity kind, the grid, and the physics
/// handle → entity reverse lookup.
pub struct EntityStore {
    pub walls: Vec<Wall>,
    pub pickups: Vec<WeaponPickup>,
    projectiles: Vec<Option<Projectile>>,
    free_projectile_slots: Vec<usize>,
    pub drones: Vec<Drone>,

    pub cells: Vec<Cell>,
    pub rows: usize,
    pub columns: usize,

    body_owner: HashMap<BodyId, EntityRef>,
    shape_owner: HashMap<ShapeId, EntityRef>,
}

impl EntityStore {
    pub fn new(rows: usize, columns: usize) -> Self {
        EntityStore {
            walls: Vec::new(),
            pickups: Vec::new(),
            projectiles: Vec::new(),
            free_projectile_slots: Vec::new(),
            drones: Vec::new(),
            cells: vec![Cell::default(); rows * columns],
            rows,
            columns,
            body_owner: HashMap::new(),
            shape_owner: HashMap::new(),
        }
    }

    /// Resolved cell-indexing convention used everywhere (map loading, obs
    /// packing, sudden death): column-major, `col + row * columns`. The
    /// original source mixed `row + col*columns` and `col + row*columns`
    /// across call sites (§9 open question); this is the one convention the
    /// whole crate uses.
    pub fn cell_index(&self, row: usize, col: usize) -> usize {
        col + row * self.columns
    }

    pub fn cell_row_col(&self, idx: usize) -> (usize, usize) {
        (idx / self.columns, idx % self.columns)
    }

    pub fn register_body(&mut self, body: BodyId, ent: EntityRef) {
        self.body_owner.insert(body, ent);
    }
    pub fn register_shape(&mut self, shape: ShapeId, ent: EntityRef) {
        self.shape_owner.insert(shape, ent);
    }
    pub fn unregister_body(&mut self, body: BodyId) {
        self.body_owner.remove(&body);
    }
    pub fn unregister_shape(&mut self, shape: ShapeId) {
        self.shape_owner.remove(&shape);
    }
    pub fn owner_of_body(&self, body: BodyId) -> Option<EntityRef> {
        self.body_owner.get(&body).copied()
    }
    pub fn owner_of_shape(&self, shape: ShapeId) -> Option<EntityRef> {
        self.shape_owner.get(&shape).copied()
    }

    pub fn set_cell_occupant(&mut self, idx: usize, ent: Option<EntityRef>) {
        self.cells[idx].occupant = ent;
    }

    pub fn clear_cell_if(&mut self, idx: usize, ent: EntityRef) {
        if self.cells[idx].occupant == Some(ent) {
            self.cells[idx].occupant = None;
        }
    }

    pub fn insert_projectile(&mut self, p: Projectile) -> ProjectileId {
        if let Some(slot) = self.free_projectile_slots.pop() {
            self.projectiles[slot] = Some(p);
            ProjectileId(slot)
        } else {
            self.projectiles.push(Some(p));
            ProjectileId(self.projectiles.len() - 1)
        }
    }

    pub fn projectile(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.get(id.0).and_then(|s| s.as_ref())
    }

    pub fn projectile_mut(&mut self, id: ProjectileId) -> Option<&mut Projectile> {
        self.projectiles.get_mut(id.0).and_then(|s| s.as_mut())
    }

    pub fn remove_projectile(&mut self, id: ProjectileId) -> Option<Projectile> {
        let slot = self.projectiles.get_mut(id.0)?;
        let taken = slot.take();
        if taken.is_some() {
            self.free_projectile_slots.push(id.0);
        }
        taken
    }

    pub fn projectile_ids(&self) -> Vec<ProjectileId> {
        self.projectiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(i, _)| ProjectileId(i))
            .collect()
    }

    pub fn live_projectile_count(&self) -> usize {
        self.projectiles.iter().filter(|p| p.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_index_is_column_major() {
        let store = EntityStore::new(4, 5);
        assert_eq!(store.cell_index(0, 0), 0);
        assert_eq!(store.cell_index(1, 0), 5);
        assert_eq!(store.cell_index(0, 1), 1);
        assert_eq!(store.cell_row_col(7), (1, 2));
    }

    #[test]
    fn projectile_slots_are_reused() {
        let mut store = EntityStore::new(2, 2);
        let p = Projectile {
            body: BodyId(0),
            shape: ShapeId(0),
            sensor: None,
            drone_idx: 0,
            weapon: crate::weapons::WeaponKind::Standard,
            pos: Vec2::ZERO,
            last_pos: Vec2::ZERO,
            velocity: Vec2::ZERO,
            last_velocity: Vec2::ZERO,
            speed: 0.0,
            last_speed: 0.0,
            distance: 0.0,
            bounces: 0,
            contacts: 0,
            needs_to_be_destroyed: false,
            set_mine: false,
            weld_joint: None,
            drones_behind_walls: Default::default(),
        };
        let id1 = store.insert_projectile(p.clone());
        store.remove_projectile(id1);
        let id2 = store.insert_projectile(p);
        assert_eq!(id1, id2);
    }
}
