use crate::math::Vec2;
use crate::physics::{BodyId, ShapeId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WallKind {
    Standard,
    Bouncy,
    Death,
}

impl WallKind {
    pub fn from_index(i: u8) -> Self {
        match i {
            0 => WallKind::Standard,
            1 => WallKind::Bouncy,
            _ => WallKind::Death,
        }
    }
}

/// A grid-aligned static wall, or a dynamic (and possibly rotating)
/// floating wall, distinguished by `floating`.
#[derive(Clone, Debug)]
pub struct Wall {
    pub body: BodyId,
    pub shape: ShapeId,
    pub pos: Vec2,
    pub extent: Vec2,
    pub cell_idx: usize,
    pub kind: WallKind,
    pub floating: bool,
    pub sudden_death: bool,
    pub rot: f32,
    pub velocity: Vec2,
}
