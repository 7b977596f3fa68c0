use std::sync::Arc;

use crate::papers::{GraphData, PaperNode};
use crate::util::truncate_label;

use super::super::physics::{CommandQueue, LayoutConfig, Simulation};
use super::super::render_utils::cluster_color;
use super::super::{NodeStyle, RenderGraph, ViewModel, ViewScratch};
use super::interaction::InteractionController;

const PAPER_RADIUS: f32 = 8.0;
const BRIDGE_RADIUS: f32 = 12.0;
const HEADLESS_SETTLE_TICKS: usize = 400;

impl NodeStyle {
    fn for_paper(paper: &PaperNode) -> Self {
        Self {
            cluster_id: paper.cluster_id,
            is_bridge: paper.is_bridge,
            base_radius: if paper.is_bridge {
                BRIDGE_RADIUS
            } else {
                PAPER_RADIUS
            },
            color: cluster_color(paper.cluster_id),
            label: truncate_label(&paper.title),
        }
    }
}

impl RenderGraph {
    pub(in crate::app) fn new(config: LayoutConfig) -> Self {
        Self {
            source: Arc::new(GraphData::default()),
            simulation: Simulation::new(config),
            controller: InteractionController::default(),
            commands: CommandQueue::default(),
            styles: Vec::new(),
            view_scratch: ViewScratch::default(),
        }
    }

    fn rebuild(&mut self, source: Arc<GraphData>) {
        self.simulation.replace(&source);
        self.styles = source.nodes.iter().map(NodeStyle::for_paper).collect();
        self.controller.reset_gesture();
        self.commands.clear();
        self.source = source;
    }
}

impl ViewModel {
    pub(in crate::app) fn sync_render_graph(&mut self) {
        let visible = self.session.visible_graph();
        if Arc::ptr_eq(&visible, &self.render_graph.source) {
            return;
        }

        self.render_graph.rebuild(visible);
        if !self.live_physics {
            let ticks = self
                .render_graph
                .simulation
                .settle(HEADLESS_SETTLE_TICKS);
            tracing::debug!(ticks, "layout settled off-screen");
        }
        self.render_graph_revision = self.render_graph_revision.wrapping_add(1);
        self.search_match_cache = None;
    }
}
