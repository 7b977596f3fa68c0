use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use eframe::egui::{Color32, Context, Pos2};

use crate::papers::{ClusterInsight, Generator, GeneratorError, GraphData};

mod filter;
mod graph;
mod physics;
mod render_utils;
mod session;
mod ui;

use graph::interaction::InteractionController;
use physics::{CommandQueue, LayoutConfig, QuadtreeCell, Simulation};
use session::{InsightToken, RequestOutcome, RequestToken, Session};

pub const DEFAULT_TOPIC: &str = "Transformer Models in Computer Vision";

pub struct PaperAtlasApp {
    generator: Arc<dyn Generator>,
    reply_tx: Sender<GeneratorReply>,
    reply_rx: Receiver<GeneratorReply>,
    model: ViewModel,
}

enum GeneratorReply {
    Graph {
        token: RequestToken,
        result: Result<GraphData, GeneratorError>,
    },
    Insight {
        token: InsightToken,
        result: Result<ClusterInsight, GeneratorError>,
    },
}

#[derive(Default)]
struct UiRequests {
    map_topic: bool,
    insight: Option<InsightAction>,
}

#[derive(Clone, Copy, Debug)]
enum InsightAction {
    Generate(u32),
    Regenerate(u32),
}

struct ViewModel {
    topic_input: String,
    search: String,
    show_filters: bool,
    live_physics: bool,
    show_quadtree_overlay: bool,
    layout_config: LayoutConfig,
    session: Session,
    render_graph: RenderGraph,
    render_graph_revision: u64,
    search_match_cache: Option<SearchMatchCache>,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

struct RenderGraph {
    source: Arc<GraphData>,
    simulation: Simulation,
    controller: InteractionController,
    commands: CommandQueue,
    styles: Vec<NodeStyle>,
    view_scratch: ViewScratch,
}

struct NodeStyle {
    cluster_id: u32,
    is_bridge: bool,
    base_radius: f32,
    color: Color32,
    label: String,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    quadtree_cells: Vec<QuadtreeCell>,
}

impl PaperAtlasApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        generator: Arc<dyn Generator>,
        initial_topic: String,
    ) -> Self {
        let (reply_tx, reply_rx) = mpsc::channel();
        let mut app = Self {
            generator,
            reply_tx,
            reply_rx,
            model: ViewModel::new(initial_topic),
        };
        app.dispatch_graph_request(&cc.egui_ctx);
        app
    }

    fn dispatch_graph_request(&mut self, ctx: &Context) {
        let topic = self.model.topic_input.trim().to_owned();
        let Some(token) = self.model.session.begin_graph_request(&topic) else {
            return;
        };

        let generator = Arc::clone(&self.generator);
        let tx = self.reply_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = generator.generate_graph(&topic);
            let _ = tx.send(GeneratorReply::Graph { token, result });
            ctx.request_repaint();
        });
    }

    fn dispatch_insight_request(&mut self, ctx: &Context, action: InsightAction) {
        let request = match action {
            InsightAction::Generate(cluster_id) => {
                self.model.session.begin_insight_request(cluster_id)
            }
            InsightAction::Regenerate(cluster_id) => {
                self.model.session.regenerate_insight(cluster_id)
            }
        };
        let Some((token, papers)) = request else {
            return;
        };

        let generator = Arc::clone(&self.generator);
        let tx = self.reply_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let result = generator.generate_insight(&papers);
            let _ = tx.send(GeneratorReply::Insight { token, result });
            ctx.request_repaint();
        });
    }

    fn poll_replies(&mut self) {
        while let Ok(reply) = self.reply_rx.try_recv() {
            let outcome = match reply {
                GeneratorReply::Graph { token, result } => {
                    self.model.session.finish_graph_request(token, result)
                }
                GeneratorReply::Insight { token, result } => {
                    self.model.session.finish_insight_request(token, result)
                }
            };

            if outcome == RequestOutcome::Applied {
                self.model.search_match_cache = None;
            }
        }
    }
}

impl eframe::App for PaperAtlasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.poll_replies();

        let mut requests = UiRequests::default();
        self.model.show(ctx, &mut requests);

        if requests.map_topic {
            self.dispatch_graph_request(ctx);
        }
        if let Some(action) = requests.insight {
            self.dispatch_insight_request(ctx, action);
        }
    }
}

impl ViewModel {
    fn new(initial_topic: String) -> Self {
        let layout_config = LayoutConfig::default();
        Self {
            topic_input: initial_topic,
            search: String::new(),
            show_filters: false,
            live_physics: true,
            show_quadtree_overlay: false,
            layout_config,
            session: Session::new(),
            render_graph: RenderGraph::new(layout_config),
            render_graph_revision: 0,
            search_match_cache: None,
        }
    }
}
