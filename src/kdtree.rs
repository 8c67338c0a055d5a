//! A minimal static 2D KD-tree for nearest-wall queries (§4.1/§9:
//! "KD-tree. Static walls only; rebuilt at map load."). Dynamic sets
//! (pickups, projectiles) deliberately use linear scans elsewhere — the
//! spec's own design note says the counts involved don't justify a tree.

use crate::math::Vec2;

struct Node {
    point: Vec2,
    payload: usize,
    axis: u8,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

pub struct KdTree {
    root: Option<Box<Node>>,
    len: usize,
}

impl KdTree {
    pub fn empty() -> Self {
        KdTree { root: None, len: 0 }
    }

    /// Rebuilds a balanced tree from scratch. Called once at map load, per
    /// the spec's design note — static walls never move.
    pub fn build(mut points: Vec<(Vec2, usize)>) -> Self {
        let len = points.len();
        let root = Self::build_recursive(&mut points, 0);
        KdTree { root, len }
    }

    fn build_recursive(points: &mut [(Vec2, usize)], depth: usize) -> Option<Box<Node>> {
        if points.is_empty() {
            return None;
        }
        let axis = (depth % 2) as u8;
        points.sort_by(|a, b| {
            let (ka, kb) = if axis == 0 {
                (a.0.x, b.0.x)
            } else {
                (a.0.y, b.0.y)
            };
            ka.partial_cmp(&kb).unwrap()
        });
        let mid = points.len() / 2;
        let (left_pts, rest) = points.split_at_mut(mid);
        let (mid_pt, right_pts) = rest.split_first_mut().unwrap();
        Some(Box::new(Node {
            point: mid_pt.0,
            payload: mid_pt.1,
            axis,
            left: Self::build_recursive(left_pts, depth + 1),
            right: Self::build_recursive(right_pts, depth + 1),
        }))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `k` payloads nearest to `query`, nearest first.
    pub fn nearest_k(&self, query: Vec2, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        let mut best: Vec<(f32, usize)> = Vec::with_capacity(k + 1);
        Self::search(&self.root, query, k, &mut best);
        best.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        best.into_iter().map(|(_, p)| p).collect()
    }

    fn search(node: &Option<Box<Node>>, query: Vec2, k: usize, best: &mut Vec<(f32, usize)>) {
        let Some(node) = node else { return };
        let d2 = node.point.distance_squared(query);
        if best.len() < k {
            best.push((d2, node.payload));
            if best.len() == k {
                best.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            }
        } else if d2 < best.last().unwrap().0 {
            best.pop();
            let pos = best.partition_point(|&(d, _)| d < d2);
            best.insert(pos, (d2, node.payload));
        }

        let (diff, near, far) = if node.axis == 0 {
            (query.x - node.point.x, &node.left, &node.right)
        } else {
            (query.y - node.point.y, &node.left, &node.right)
        };
        let (first, second) = if diff < 0.0 {
            (near, far)
        } else {
            (far, near)
        };
        Self::search(first, query, k, best);
        if best.len() < k || diff * diff < best.last().unwrap().0 {
            Self::search(second, query, k, best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_closest_point() {
        let pts = vec![
            (Vec2::new(0.0, 0.0), 0),
            (Vec2::new(5.0, 5.0), 1),
            (Vec2::new(1.0, 1.0), 2),
            (Vec2::new(-3.0, -3.0), 3),
        ];
        let tree = KdTree::build(pts);
        let nearest = tree.nearest_k(Vec2::new(1.1, 0.9), 2);
        assert_eq!(nearest[0], 2);
        assert_eq!(nearest.len(), 2);
    }

    #[test]
    fn empty_tree_returns_empty() {
        let tree = KdTree::build(Vec::new());
        assert!(tree.nearest_k(Vec2::ZERO, 3).is_empty());
    }
}
