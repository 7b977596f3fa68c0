mod forces;
mod quadtree;

use std::collections::{HashMap, VecDeque};

use eframe::egui::{Vec2, vec2};

use crate::papers::{GraphData, Link, LinkKind};
use forces::{
    LinkWeight, ManyBodyParams, accumulate_many_body, apply_centering, apply_link_force,
    collect_collision_candidates, link_weights, resolve_overlaps,
};
pub(in crate::app) use quadtree::QuadtreeCell;
use quadtree::{QuadNode, collect_cells};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutConfig {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub charge_distance_min_sq: f32,
    pub theta: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub collision_passes: usize,
    pub center: Vec2,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub drag_alpha_target: f32,
    pub velocity_decay: f32,
    pub cooling_threshold: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_distance: 100.0,
            charge_strength: -300.0,
            charge_distance_min_sq: 1.0,
            theta: 0.9,
            collision_radius: 40.0,
            collision_strength: 1.0,
            collision_passes: 2,
            center: Vec2::ZERO,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            drag_alpha_target: 0.3,
            velocity_decay: 0.4,
            cooling_threshold: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct LayoutNode {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pin: Option<Vec2>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct ResolvedLink {
    pub source: usize,
    pub target: usize,
    pub kind: LinkKind,
}

#[cfg(test)]
impl ResolvedLink {
    pub(super) fn new(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            kind: LinkKind::Citation,
        }
    }
}

/// Resolves id-based links against the arena, dropping any link whose
/// endpoint is unknown or that connects a node to itself.
pub(in crate::app) fn resolve_links(
    links: &[Link],
    index_by_id: &HashMap<String, usize>,
) -> Vec<ResolvedLink> {
    links
        .iter()
        .filter_map(|link| {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&link.source), index_by_id.get(&link.target))
            else {
                tracing::warn!(
                    source = %link.source,
                    target = %link.target,
                    "dropping link with unknown endpoint"
                );
                return None;
            };

            if source == target {
                tracing::warn!(node = %link.source, "dropping self-link");
                return None;
            }

            Some(ResolvedLink {
                source,
                target,
                kind: link.kind,
            })
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum SimulationPhase {
    Idle,
    Running,
    Cooling,
    Settled,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum LayoutCommand {
    PinStart { node: usize },
    PinMove { node: usize, to: Vec2 },
    PinEnd { node: usize },
    Reheat,
    Stop,
}

#[derive(Debug, Default)]
pub(in crate::app) struct CommandQueue {
    pending: VecDeque<LayoutCommand>,
}

impl CommandQueue {
    pub(in crate::app) fn push(&mut self, command: LayoutCommand) {
        self.pending.push_back(command);
    }

    pub(in crate::app) fn extend(&mut self, commands: impl IntoIterator<Item = LayoutCommand>) {
        self.pending.extend(commands);
    }

    pub(in crate::app) fn clear(&mut self) {
        self.pending.clear();
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    pairs: Vec<(usize, usize)>,
}

impl PhysicsScratch {
    fn snapshot(&mut self, nodes: &[LayoutNode]) {
        self.positions.clear();
        self.positions.extend(nodes.iter().map(|node| node.position));
    }
}

fn seed_position(center: Vec2, index: usize) -> Vec2 {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let radius = 10.0 * (0.5 + index as f32).sqrt();
    let angle = index as f32 * golden_angle;
    center + vec2(angle.cos(), angle.sin()) * radius
}

pub(in crate::app) struct Simulation {
    config: LayoutConfig,
    nodes: Vec<LayoutNode>,
    links: Vec<ResolvedLink>,
    weights: Vec<LinkWeight>,
    index_by_id: HashMap<String, usize>,
    alpha: f32,
    alpha_target: f32,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub(in crate::app) fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            links: Vec::new(),
            weights: Vec::new(),
            index_by_id: HashMap::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            scratch: PhysicsScratch::default(),
        }
    }

    pub(in crate::app) fn replace(&mut self, graph: &GraphData) {
        let prior = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.id, node.position))
            .collect::<HashMap<_, _>>();

        let center = self.config.center;
        let mut carried = 0usize;
        self.nodes = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, paper)| {
                let position = match prior.get(&paper.id) {
                    Some(&position) if position.is_finite() => {
                        carried += 1;
                        position
                    }
                    _ => seed_position(center, index),
                };
                LayoutNode {
                    id: paper.id.clone(),
                    position,
                    velocity: Vec2::ZERO,
                    pin: None,
                }
            })
            .collect();

        self.index_by_id = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        self.links = resolve_links(&graph.links, &self.index_by_id);
        self.weights = link_weights(self.nodes.len(), &self.links);
        self.alpha = 1.0;
        self.alpha_target = 0.0;

        tracing::debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            dropped_links = graph.links.len() - self.links.len(),
            carried,
            "layout run started"
        );
    }

    pub(in crate::app) fn set_config(&mut self, config: LayoutConfig) {
        if self.config == config {
            return;
        }
        self.config = config;
        self.reheat();
    }

    pub(in crate::app) fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub(in crate::app) fn links(&self) -> &[ResolvedLink] {
        &self.links
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn phase(&self) -> SimulationPhase {
        let config = &self.config;
        if self.nodes.is_empty() {
            SimulationPhase::Idle
        } else if self.alpha < config.alpha_min && self.alpha_target < config.alpha_min {
            SimulationPhase::Settled
        } else if self.alpha >= config.cooling_threshold || self.alpha_target >= config.alpha_min {
            SimulationPhase::Running
        } else {
            SimulationPhase::Cooling
        }
    }

    pub(in crate::app) fn is_active(&self) -> bool {
        matches!(
            self.phase(),
            SimulationPhase::Running | SimulationPhase::Cooling
        )
    }

    pub(in crate::app) fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    pub(in crate::app) fn stop(&mut self) {
        self.alpha = 0.0;
        self.alpha_target = 0.0;
    }

    pub(in crate::app) fn apply(&mut self, command: LayoutCommand) {
        match command {
            LayoutCommand::PinStart { node } => {
                let Some(layout_node) = self.nodes.get_mut(node) else {
                    tracing::debug!(node, "pin start for unknown node ignored");
                    return;
                };
                layout_node.pin = Some(layout_node.position);
                layout_node.velocity = Vec2::ZERO;
                self.alpha_target = self.config.drag_alpha_target;
            }
            LayoutCommand::PinMove { node, to } => {
                if let Some(layout_node) = self.nodes.get_mut(node)
                    && layout_node.pin.is_some()
                    && to.is_finite()
                {
                    layout_node.pin = Some(to);
                    layout_node.position = to;
                }
            }
            LayoutCommand::PinEnd { node } => {
                if let Some(layout_node) = self.nodes.get_mut(node) {
                    layout_node.pin = None;
                }
                if self.nodes.iter().all(|layout_node| layout_node.pin.is_none()) {
                    self.alpha_target = 0.0;
                }
            }
            LayoutCommand::Reheat => self.reheat(),
            LayoutCommand::Stop => self.stop(),
        }
    }

    pub(in crate::app) fn drain(&mut self, queue: &mut CommandQueue) {
        while let Some(command) = queue.pending.pop_front() {
            self.apply(command);
        }
    }

    pub(in crate::app) fn tick(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        apply_link_force(
            &mut self.nodes,
            &self.links,
            &self.weights,
            self.config.link_distance,
            alpha,
        );
        self.apply_many_body(alpha);
        apply_centering(&mut self.nodes, self.config.center);
        self.integrate();
        self.apply_collisions();

        true
    }

    pub(in crate::app) fn settle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        ticks
    }

    fn apply_many_body(&mut self, alpha: f32) {
        let Self {
            nodes,
            scratch,
            config,
            ..
        } = self;

        scratch.snapshot(nodes);
        let Some(tree) = QuadNode::build(&scratch.positions) else {
            return;
        };

        let params = ManyBodyParams {
            scaled_strength: config.charge_strength * alpha,
            distance_min_sq: config.charge_distance_min_sq,
            theta: config.theta,
        };
        for (index, node) in nodes.iter_mut().enumerate() {
            if scratch.positions[index].is_finite() {
                node.velocity += accumulate_many_body(&tree, index, &scratch.positions, params);
            }
        }
    }

    fn integrate(&mut self) {
        let retain = 1.0 - self.config.velocity_decay;
        let center = self.config.center;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            node.velocity *= retain;
            node.position += node.velocity;

            if !node.position.is_finite() || !node.velocity.is_finite() {
                tracing::warn!(id = %node.id, "non-finite layout state, reseeding node");
                node.position = seed_position(center, index);
                node.velocity = Vec2::ZERO;
            }
        }
    }

    fn apply_collisions(&mut self) {
        let Self {
            nodes,
            scratch,
            config,
            ..
        } = self;

        let reach = config.collision_radius * 3.0;
        for _ in 0..config.collision_passes {
            scratch.snapshot(nodes);
            let Some(tree) = QuadNode::build(&scratch.positions) else {
                return;
            };

            scratch.pairs.clear();
            collect_collision_candidates(&tree, &tree, true, reach * reach, &mut scratch.pairs);
            resolve_overlaps(
                nodes,
                &scratch.pairs,
                config.collision_radius,
                config.collision_strength,
            );
        }
    }

    pub(in crate::app) fn quadtree_cells(&mut self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        self.scratch.snapshot(&self.nodes);
        if let Some(tree) = QuadNode::build(&self.scratch.positions) {
            collect_cells(&tree, 0, cells);
        }
    }
}
