use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn covering(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points.iter().filter(|point| point.is_finite()) {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span.max_elem() * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        dx * dx + dy * dy
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn quadrant(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let dx = if quadrant & 1 == 0 { -quarter } else { quarter };
        let dy = if quadrant & 2 == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(dx, dy),
            half_extent: quarter,
        }
    }
}

pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = QuadBounds::covering(positions)?;
        let indices = (0..positions.len())
            .filter(|&index| positions[index].is_finite())
            .collect::<Vec<_>>();
        Some(Self::build_cell(bounds, indices, positions, 0))
    }

    fn build_cell(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        depth: usize,
    ) -> Self {
        let mass = indices.len() as f32;
        let center_of_mass = if indices.is_empty() {
            bounds.center
        } else {
            indices.iter().fold(Vec2::ZERO, |sum, &index| sum + positions[index]) / mass
        };

        let mut cell = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &cell.indices {
            buckets[bounds.quadrant_of(positions[index])].push(index);
        }

        // Coincident points would otherwise split forever.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::build_cell(
                    bounds.quadrant(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        cell.indices.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct QuadtreeCell {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
}

pub(super) fn collect_cells(node: &QuadNode, depth: usize, cells: &mut Vec<QuadtreeCell>) {
    cells.push(QuadtreeCell {
        center: node.bounds.center,
        half_extent: node.bounds.half_extent,
        depth,
        is_leaf: node.is_leaf(),
    });
    for child in node.children() {
        collect_cells(child, depth + 1, cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_points(node: &QuadNode) -> usize {
        node.indices.len() + node.children().map(count_points).sum::<usize>()
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let positions = (0..200)
            .map(|index| {
                let angle = index as f32 * 0.37;
                vec2(angle.cos() * index as f32, angle.sin() * index as f32)
            })
            .collect::<Vec<_>>();

        let tree = QuadNode::build(&positions).unwrap();
        assert_eq!(count_points(&tree), positions.len());
        assert_eq!(tree.mass, 200.0);
        assert!(!tree.is_leaf());
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![vec2(5.0, 5.0); 40];
        let tree = QuadNode::build(&positions).unwrap();

        assert!(tree.is_leaf());
        assert_eq!(tree.indices.len(), 40);
        assert_eq!(tree.center_of_mass, vec2(5.0, 5.0));
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let positions = vec![vec2(0.0, 0.0), vec2(f32::NAN, 1.0), vec2(3.0, 4.0)];
        let tree = QuadNode::build(&positions).unwrap();
        assert_eq!(count_points(&tree), 2);
        assert!(QuadNode::build(&[vec2(f32::NAN, 0.0)]).is_none());
    }

    #[test]
    fn gap_is_zero_for_overlapping_boxes() {
        let a = QuadBounds {
            center: vec2(0.0, 0.0),
            half_extent: 10.0,
        };
        let b = QuadBounds {
            center: vec2(15.0, 0.0),
            half_extent: 10.0,
        };
        let c = QuadBounds {
            center: vec2(50.0, 0.0),
            half_extent: 10.0,
        };

        assert_eq!(a.gap_sq(b), 0.0);
        assert_eq!(a.gap_sq(c), 900.0);
        assert!(a.contains(vec2(10.0, -10.0)));
        assert!(!a.contains(vec2(10.5, 0.0)));
    }
}
