use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::{LayoutNode, ResolvedLink};

pub(super) fn fallback_direction(seed: usize) -> Vec2 {
    let angle = ((seed as f32) * 0.618_034 + 0.37) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct LinkWeight {
    pub(super) strength: f32,
    pub(super) bias: f32,
}

/// Weaker springs on hub nodes, correction biased toward the less connected end.
pub(super) fn link_weights(node_count: usize, links: &[ResolvedLink]) -> Vec<LinkWeight> {
    let mut degree = vec![0u32; node_count];
    for link in links {
        degree[link.source] += 1;
        degree[link.target] += 1;
    }

    links
        .iter()
        .map(|link| {
            let source = degree[link.source] as f32;
            let target = degree[link.target] as f32;
            LinkWeight {
                strength: 1.0 / source.min(target),
                bias: source / (source + target),
            }
        })
        .collect()
}

pub(super) fn apply_link_force(
    nodes: &mut [LayoutNode],
    links: &[ResolvedLink],
    weights: &[LinkWeight],
    rest_distance: f32,
    alpha: f32,
) {
    for (index, (link, weight)) in links.iter().zip(weights).enumerate() {
        let source = &nodes[link.source];
        let target = &nodes[link.target];
        let mut delta =
            (target.position + target.velocity) - (source.position + source.velocity);
        if delta.length_sq() < 1e-12 {
            delta = fallback_direction(index) * 1e-3;
        }

        let distance = delta.length();
        let correction = delta * ((distance - rest_distance) / distance * alpha * weight.strength);

        nodes[link.target].velocity -= correction * weight.bias;
        nodes[link.source].velocity += correction * (1.0 - weight.bias);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ManyBodyParams {
    pub(super) scaled_strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) theta: f32,
}

impl ManyBodyParams {
    fn pull(self, delta: Vec2, distance_sq: f32, mass: f32) -> Vec2 {
        let distance_sq = if distance_sq < self.distance_min_sq {
            (self.distance_min_sq * distance_sq).sqrt()
        } else {
            distance_sq
        };
        delta * (self.scaled_strength * mass / distance_sq)
    }
}

pub(super) fn accumulate_many_body(
    cell: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ManyBodyParams,
) -> Vec2 {
    if cell.mass <= 0.0 {
        return Vec2::ZERO;
    }

    let point = positions[index];

    if cell.is_leaf() {
        let mut change = Vec2::ZERO;
        for &other in &cell.indices {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            let mut distance_sq = delta.length_sq();
            if distance_sq < 1e-12 {
                delta = fallback_direction(index.wrapping_mul(31) ^ other) * 1e-3;
                distance_sq = delta.length_sq();
            }
            change += params.pull(delta, distance_sq, 1.0);
        }
        return change;
    }

    let delta = cell.center_of_mass - point;
    let distance_sq = delta.length_sq();
    let far_enough = !cell.bounds.contains(point)
        && distance_sq > 0.0
        && cell.bounds.side_length() < params.theta * distance_sq.sqrt();
    if far_enough {
        return params.pull(delta, distance_sq, cell.mass);
    }

    cell.children()
        .map(|child| accumulate_many_body(child, index, positions, params))
        .fold(Vec2::ZERO, |sum, change| sum + change)
}

pub(super) fn apply_centering(nodes: &mut [LayoutNode], center: Vec2) {
    if nodes.is_empty() {
        return;
    }

    let centroid =
        nodes.iter().fold(Vec2::ZERO, |sum, node| sum + node.position) / nodes.len() as f32;
    let shift = centroid - center;
    if shift.length_sq() <= 1e-12 {
        return;
    }
    for node in nodes {
        node.position -= shift;
    }
}

pub(super) fn collect_collision_candidates(
    cell_a: &QuadNode,
    cell_b: &QuadNode,
    same_cell: bool,
    reach_sq: f32,
    pairs: &mut Vec<(usize, usize)>,
) {
    if cell_a.bounds.gap_sq(cell_b.bounds) > reach_sq {
        return;
    }

    match (cell_a.is_leaf(), cell_b.is_leaf()) {
        (true, true) if same_cell => {
            for (offset, &from) in cell_a.indices.iter().enumerate() {
                for &to in &cell_a.indices[offset + 1..] {
                    pairs.push((from, to));
                }
            }
        }
        (true, true) => {
            for &from in &cell_a.indices {
                for &to in &cell_b.indices {
                    pairs.push((from, to));
                }
            }
        }
        _ if same_cell => {
            let children = cell_a.children().collect::<Vec<_>>();
            for (offset, child) in children.iter().enumerate() {
                collect_collision_candidates(child, child, true, reach_sq, pairs);
                for other in &children[offset + 1..] {
                    collect_collision_candidates(child, other, false, reach_sq, pairs);
                }
            }
        }
        (false, leaf_b) => {
            let split_a = leaf_b || cell_a.bounds.half_extent >= cell_b.bounds.half_extent;
            if split_a {
                for child in cell_a.children() {
                    collect_collision_candidates(child, cell_b, false, reach_sq, pairs);
                }
            } else {
                for child in cell_b.children() {
                    collect_collision_candidates(cell_a, child, false, reach_sq, pairs);
                }
            }
        }
        (true, false) => {
            for child in cell_b.children() {
                collect_collision_candidates(cell_a, child, false, reach_sq, pairs);
            }
        }
    }
}

/// Pushes overlapping discs apart in place. Pinned nodes never move; their
/// partner takes the whole correction.
pub(super) fn resolve_overlaps(
    nodes: &mut [LayoutNode],
    pairs: &[(usize, usize)],
    radius: f32,
    strength: f32,
) {
    let min_distance = radius * 2.0;
    for &(from, to) in pairs {
        let delta = nodes[from].position - nodes[to].position;
        let distance = delta.length();
        if distance >= min_distance {
            continue;
        }

        let direction = if distance > 1e-4 {
            delta / distance
        } else {
            fallback_direction(from.wrapping_mul(7) + to)
        };
        let push = direction * ((min_distance - distance) * strength);

        match (nodes[from].pin.is_some(), nodes[to].pin.is_some()) {
            (false, false) => {
                nodes[from].position += push * 0.5;
                nodes[to].position -= push * 0.5;
            }
            (true, false) => nodes[to].position -= push,
            (false, true) => nodes[from].position += push,
            (true, true) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f32, y: f32) -> LayoutNode {
        LayoutNode {
            id: format!("{x},{y}"),
            position: vec2(x, y),
            velocity: Vec2::ZERO,
            pin: None,
        }
    }

    #[test]
    fn link_force_pulls_stretched_pair_together() {
        let mut nodes = vec![node(0.0, 0.0), node(300.0, 0.0)];
        let links = vec![ResolvedLink::new(0, 1)];
        let weights = link_weights(2, &links);

        apply_link_force(&mut nodes, &links, &weights, 100.0, 1.0);

        assert!(nodes[0].velocity.x > 0.0);
        assert!(nodes[1].velocity.x < 0.0);
        let total = nodes[0].velocity.x - nodes[1].velocity.x;
        assert!((total - 200.0).abs() < 1e-3);
    }

    #[test]
    fn hub_links_are_weaker() {
        let links = vec![
            ResolvedLink::new(0, 1),
            ResolvedLink::new(0, 2),
            ResolvedLink::new(0, 3),
        ];
        let weights = link_weights(4, &links);

        assert_eq!(weights[0].strength, 1.0);
        assert_eq!(weights[0].bias, 0.75);
    }

    #[test]
    fn many_body_repels_with_inverse_distance() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadNode::build(&positions).unwrap();
        let params = ManyBodyParams {
            scaled_strength: -300.0,
            distance_min_sq: 1.0,
            theta: 0.9,
        };

        let change = accumulate_many_body(&tree, 0, &positions, params);
        assert!((change.x + 30.0).abs() < 1e-3);
        assert!(change.y.abs() < 1e-6);
    }

    #[test]
    fn barnes_hut_stays_close_to_exact_sum() {
        let positions = (0..300)
            .map(|index| {
                let angle = index as f32 * 2.399_963;
                let radius = 12.0 * (index as f32 + 0.5).sqrt();
                vec2(angle.cos() * radius, angle.sin() * radius)
            })
            .collect::<Vec<_>>();
        let tree = QuadNode::build(&positions).unwrap();
        let params = ManyBodyParams {
            scaled_strength: -300.0,
            distance_min_sq: 1.0,
            theta: 0.9,
        };
        let exact_params = ManyBodyParams { theta: 0.0, ..params };

        for index in [240, 270, 299] {
            let approx = accumulate_many_body(&tree, index, &positions, params);
            let exact = accumulate_many_body(&tree, index, &positions, exact_params);
            let error = (approx - exact).length() / exact.length().max(1e-3);
            assert!(error < 0.2, "index {index}: relative error {error}");
        }
    }

    #[test]
    fn coincident_nodes_do_not_produce_nan() {
        let positions = vec![vec2(1.0, 1.0); 3];
        let tree = QuadNode::build(&positions).unwrap();
        let params = ManyBodyParams {
            scaled_strength: -300.0,
            distance_min_sq: 1.0,
            theta: 0.9,
        };

        let change = accumulate_many_body(&tree, 1, &positions, params);
        assert!(change.is_finite());
        assert!(change.length() > 0.0);
    }

    #[test]
    fn centering_moves_centroid_to_target() {
        let mut nodes = vec![node(100.0, 0.0), node(300.0, 40.0)];
        apply_centering(&mut nodes, Vec2::ZERO);

        let centroid = (nodes[0].position + nodes[1].position) / 2.0;
        assert!(centroid.length() < 1e-4);
        assert_eq!(nodes[1].position - nodes[0].position, vec2(200.0, 40.0));
    }

    #[test]
    fn overlaps_are_pushed_apart_but_pins_hold() {
        let mut nodes = vec![node(0.0, 0.0), node(30.0, 0.0), node(60.0, 0.0)];
        nodes[0].pin = Some(vec2(0.0, 0.0));

        resolve_overlaps(&mut nodes, &[(0, 1)], 40.0, 1.0);
        assert_eq!(nodes[0].position, vec2(0.0, 0.0));
        assert!((nodes[1].position.x - 80.0).abs() < 1e-4);

        resolve_overlaps(&mut nodes, &[(1, 2)], 40.0, 1.0);
        assert!((nodes[2].position.x - nodes[1].position.x).abs() >= 80.0 - 1e-3);
    }

    #[test]
    fn candidate_pairs_cover_all_close_pairs() {
        let positions = (0..120)
            .map(|index| vec2((index % 12) as f32 * 35.0, (index / 12) as f32 * 35.0))
            .collect::<Vec<_>>();
        let tree = QuadNode::build(&positions).unwrap();
        let mut pairs = Vec::new();
        collect_collision_candidates(&tree, &tree, true, 80.0 * 80.0, &mut pairs);

        let found = pairs
            .iter()
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .collect::<std::collections::HashSet<_>>();
        for a in 0..positions.len() {
            for b in (a + 1)..positions.len() {
                if (positions[a] - positions[b]).length() < 80.0 {
                    assert!(found.contains(&(a, b)), "missing pair {a}-{b}");
                }
            }
        }
    }
}
