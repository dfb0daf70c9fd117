use eframe::egui::{Vec2, vec2};

/// Coincident points share a leaf once this depth is reached.
const QUADTREE_MAX_DEPTH: usize = 24;

#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadBounds {
    pub(crate) center: Vec2,
    pub(crate) half_extent: f32,
}

impl QuadBounds {
    fn from_points(points: &[Vec2]) -> Option<Self> {
        // min/max skip NaN, so the bounds alone cannot catch it
        if points.is_empty() || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }

        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        let center = (min + max) * 0.5;
        let span_x = (max.x - min.x).max(1.0);
        let span_y = (max.y - min.y).max(1.0);
        let half_extent = (span_x.max(span_y) * 0.5) + 1.0;

        Some(Self {
            center,
            half_extent,
        })
    }

    pub(crate) fn contains(self, point: Vec2) -> bool {
        let min = self.center - vec2(self.half_extent, self.half_extent);
        let max = self.center + vec2(self.half_extent, self.half_extent);
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };

        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        let right = point.x >= self.center.x;
        let lower = point.y >= self.center.y;
        match (right, lower) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    pub(crate) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }
}

/// A region of the partition. Leaves hold the indices of the nodes inside
/// them (one, or several that share a position); internal regions hold only
/// the aggregate.
pub(crate) struct QuadNode {
    pub(crate) bounds: QuadBounds,
    pub(crate) center_of_mass: Vec2,
    pub(crate) mass: f32,
    pub(crate) indices: Vec<usize>,
    pub(crate) children: [Option<Box<QuadNode>>; 4],
}

/// One region of the spatial index, flattened for drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadtreeCell {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
    /// Nodes inside the region.
    pub mass: f32,
}

impl QuadNode {
    /// Partitions `positions`; `None` when there are no points or any is not
    /// finite.
    pub(crate) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        depth: usize,
    ) -> Self {
        let mut center_of_mass = Vec2::ZERO;
        for &index in &indices {
            center_of_mass += positions[index];
        }

        let mass = indices.len() as f32;
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if node.indices.len() <= 1 || depth >= QUADTREE_MAX_DEPTH {
            return node;
        }

        let first = positions[node.indices[0]];
        if node.indices.iter().all(|&index| positions[index] == first) {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            let quadrant = bounds.quadrant_for(positions[index]);
            buckets[quadrant].push(index);
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            let child_bounds = bounds.child(quadrant);
            node.children[quadrant] = Some(Box::new(Self::build_node(
                child_bounds,
                bucket,
                positions,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }
}

pub(crate) fn collect_quadtree_cells(node: &QuadNode, depth: usize, cells: &mut Vec<QuadtreeCell>) {
    cells.push(QuadtreeCell {
        center: node.bounds.center,
        half_extent: node.bounds.half_extent,
        depth,
        is_leaf: node.is_leaf(),
        mass: node.mass,
    });

    for child in &node.children {
        if let Some(child) = child.as_ref() {
            collect_quadtree_cells(child, depth + 1, cells);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(node: &QuadNode, out: &mut Vec<Vec<usize>>) {
        if node.is_leaf() {
            out.push(node.indices.clone());
            return;
        }
        for child in node.children.iter().flatten() {
            leaves(child, out);
        }
    }

    #[test]
    fn test_empty_or_non_finite_input() {
        assert!(QuadNode::build(&[]).is_none());
        assert!(QuadNode::build(&[vec2(0.0, 0.0), vec2(f32::NAN, 1.0)]).is_none());
        assert!(QuadNode::build(&[vec2(f32::NAN, f32::NAN)]).is_none());
        assert!(QuadNode::build(&[vec2(2.0, 0.0), vec2(5.0, f32::INFINITY)]).is_none());
    }

    #[test]
    fn test_each_leaf_holds_one_node() {
        let positions = vec![
            vec2(0.0, 0.0),
            vec2(10.0, 0.0),
            vec2(0.0, 10.0),
            vec2(10.0, 10.0),
            vec2(1.0, 1.0),
            vec2(1.5, 1.2),
        ];
        let tree = QuadNode::build(&positions).unwrap();
        let mut found = Vec::new();
        leaves(&tree, &mut found);

        assert_eq!(found.len(), positions.len());
        assert!(found.iter().all(|leaf| leaf.len() == 1));
        let mut all = found.concat();
        all.sort_unstable();
        assert_eq!(all, (0..positions.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_aggregate_mass_and_centroid() {
        let positions = vec![vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(0.0, 8.0), vec2(4.0, 8.0)];
        let tree = QuadNode::build(&positions).unwrap();
        assert_eq!(tree.mass, 4.0);
        assert_eq!(tree.center_of_mass, vec2(2.0, 4.0));
        assert!(tree.indices.is_empty());
    }

    #[test]
    fn test_coincident_points_share_a_leaf() {
        let positions = vec![vec2(3.0, 3.0), vec2(3.0, 3.0), vec2(-5.0, 2.0)];
        let tree = QuadNode::build(&positions).unwrap();
        let mut found = Vec::new();
        leaves(&tree, &mut found);
        assert!(found.iter().any(|leaf| leaf == &vec![0, 1]));
    }

    #[test]
    fn test_cells_cover_every_region() {
        let positions = vec![vec2(0.0, 0.0), vec2(100.0, 100.0), vec2(-50.0, 20.0)];
        let tree = QuadNode::build(&positions).unwrap();
        let mut cells = Vec::new();
        collect_quadtree_cells(&tree, 0, &mut cells);

        assert_eq!(cells[0].depth, 0);
        assert_eq!(cells[0].mass, 3.0);
        assert_eq!(cells.iter().filter(|cell| cell.is_leaf).count(), 3);
        for cell in &cells {
            assert!(cells[0].half_extent >= cell.half_extent);
        }
    }
}
