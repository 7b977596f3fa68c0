use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{
    self, Align2, Color32, FontId, PointerButton, Pos2, Rect, Sense, Shape, Stroke, Ui, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::papers::LinkKind;

use super::super::physics::SimulationPhase;
use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_background, edge_visible,
};
use super::super::{RenderGraph, SearchMatchCache, ViewModel};
use super::interaction::{Camera, PointerEvent, ShellEvent, hit_test};

const LABEL_COLOR: Color32 = Color32::from_rgb(148, 163, 184);
const BRIDGE_RING_COLOR: Color32 = Color32::from_rgb(244, 114, 182);
const SELECTED_PAPER_COLOR: Color32 = Color32::from_rgb(245, 206, 93);

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn link_stroke(kind: LinkKind, zoom: f32) -> Stroke {
    let zoom_sqrt = zoom.sqrt();
    match kind {
        LinkKind::Citation => Stroke::new(
            (2.0 * zoom_sqrt).clamp(0.8, 4.0),
            Color32::from_rgba_unmultiplied(71, 85, 105, 153),
        ),
        LinkKind::Similarity | LinkKind::Dataset => Stroke::new(
            zoom_sqrt.clamp(0.5, 2.0),
            Color32::from_rgba_unmultiplied(51, 65, 85, 153),
        ),
    }
}

fn draw_link(painter: &egui::Painter, kind: LinkKind, start: Pos2, end: Pos2, zoom: f32) {
    let stroke = link_stroke(kind, zoom);
    if kind == LinkKind::Similarity {
        let dash = (4.0 * zoom).clamp(2.0, 12.0);
        painter.extend(Shape::dashed_line(&[start, end], stroke, dash, dash));
    } else {
        painter.line_segment([start, end], stroke);
    }
}

fn collect_pointer_events(
    ui: &Ui,
    rect: Rect,
    response: &egui::Response,
    gesture_active: bool,
) -> Vec<PointerEvent> {
    ui.input(|input| {
        let mut events = Vec::new();
        let pointer = &input.pointer;
        let latest = pointer.latest_pos();

        if let Some(pos) = pointer.press_origin()
            && rect.contains(pos)
        {
            for button in [
                PointerButton::Primary,
                PointerButton::Secondary,
                PointerButton::Middle,
            ] {
                if pointer.button_pressed(button) {
                    events.push(PointerEvent::Pressed { pos, button });
                }
            }
        }

        if let Some(pos) = latest
            && (gesture_active || !events.is_empty())
            && pointer.delta() != egui::Vec2::ZERO
        {
            events.push(PointerEvent::Moved { pos });
        }

        if pointer.any_released()
            && let Some(pos) = latest
        {
            events.push(PointerEvent::Released { pos });
        }

        let scroll = input.raw_scroll_delta.y;
        if response.hovered()
            && scroll.abs() > f32::EPSILON
            && let Some(pos) = pointer.hover_pos()
        {
            events.push(PointerEvent::Scrolled { pos, delta: scroll });
        }

        events
    })
}

impl ViewModel {
    fn update_screen_space(rect: Rect, camera: Camera, graph: &mut RenderGraph) {
        let scratch = &mut graph.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for (node, style) in graph.simulation.nodes().iter().zip(&graph.styles) {
            scratch
                .screen_positions
                .push(camera.world_to_screen(rect, node.position));
            scratch
                .screen_radii
                .push((style.base_radius * camera.zoom).clamp(2.0, 48.0));
        }
    }

    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let search_query = self.search.trim();
        if search_query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.render_graph_revision
            && cached.query == search_query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .render_graph
            .source
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, paper)| {
                fuzzy_match_score(&matcher, &paper.title, search_query).map(|_| index)
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: search_query.to_owned(),
            graph_revision: self.render_graph_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn handle_canvas_input(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        let graph = &mut self.render_graph;
        let events = collect_pointer_events(ui, rect, response, graph.controller.is_active());
        if events.is_empty() {
            return;
        }

        let mut shell_events = Vec::new();
        for event in events {
            let hit = match event {
                PointerEvent::Pressed { pos, .. } => hit_test(
                    &graph.view_scratch.screen_positions,
                    &graph.view_scratch.screen_radii,
                    pos,
                ),
                _ => None,
            };

            let interaction = graph.controller.handle(rect, event, hit);
            graph.commands.extend(interaction.commands);
            shell_events.extend(interaction.shell_event);
        }

        for shell_event in shell_events {
            match shell_event {
                ShellEvent::NodeClicked(index) => {
                    if let Some(paper) = graph.source.nodes.get(index) {
                        self.session.select_paper(&paper.id);
                    }
                }
                ShellEvent::BackgroundClicked => self.session.deselect_cluster(),
            }
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        self.sync_render_graph();

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let camera = self.render_graph.controller.camera();
        Self::update_screen_space(rect, camera, &mut self.render_graph);
        self.handle_canvas_input(ui, rect, &response);

        let search_matches = self.cached_search_matches();
        let selected_cluster = self.session.selected_cluster();
        let selected_paper = self.session.selected_paper().map(|paper| paper.id.clone());
        let live_physics = self.live_physics;
        let show_quadtree_overlay = self.show_quadtree_overlay;
        let graph = &mut self.render_graph;

        graph.simulation.set_config(self.layout_config);
        graph.simulation.drain(&mut graph.commands);
        if live_physics {
            graph.simulation.tick();
        }
        if (live_physics && graph.simulation.is_active()) || graph.controller.is_active() {
            ui.ctx().request_repaint();
        }

        let camera = graph.controller.camera();
        Self::update_screen_space(rect, camera, graph);
        draw_background(&painter, rect, camera);

        if graph.source.nodes.is_empty() {
            if !self.session.graph().nodes.is_empty() {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "No papers match the current filters.",
                    FontId::proportional(14.0),
                    LABEL_COLOR,
                );
            }
            return;
        }

        if show_quadtree_overlay {
            graph
                .simulation
                .quadtree_cells(&mut graph.view_scratch.quadtree_cells);
            for cell in &graph.view_scratch.quadtree_cells {
                let min = cell.center - vec2(cell.half_extent, cell.half_extent);
                let max = cell.center + vec2(cell.half_extent, cell.half_extent);
                let top_left = camera.world_to_screen(rect, min);
                let bottom_right = camera.world_to_screen(rect, max);

                let alpha = if cell.is_leaf { 110 } else { 55 };
                let line_width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
                painter.rect_stroke(
                    Rect::from_min_max(top_left, bottom_right),
                    0.0,
                    Stroke::new(
                        line_width,
                        Color32::from_rgba_unmultiplied(106, 198, 255, alpha),
                    ),
                    egui::StrokeKind::Middle,
                );
            }
        }

        let scratch = &graph.view_scratch;
        for link in graph.simulation.links() {
            let start = scratch.screen_positions[link.source];
            let end = scratch.screen_positions[link.target];
            if edge_visible(rect, start, end, 2.0) {
                draw_link(&painter, link.kind, start, end, camera.zoom);
            }
        }

        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered = graph
            .controller
            .dragged_node()
            .or_else(|| {
                pointer
                    .filter(|pos| rect.contains(*pos))
                    .and_then(|pos| hit_test(&scratch.screen_positions, &scratch.screen_radii, pos))
            });
        if graph.controller.dragged_node().is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if hovered.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let label_font = FontId::proportional((10.0 * camera.zoom.sqrt()).clamp(8.0, 14.0));
        let mut selection_animating = false;

        for (index, style) in graph.styles.iter().enumerate() {
            let position = scratch.screen_positions[index];
            let radius = scratch.screen_radii[index];
            if !circle_visible(rect, position, radius + 4.0) {
                continue;
            }

            let paper_id = graph.source.nodes[index].id.as_str();
            let is_hovered = hovered == Some(index);
            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            let mut color = if is_match {
                blend_color(style.color, Color32::from_rgb(103, 196, 255), 0.45)
            } else if search_active {
                dim_color(style.color, 0.38)
            } else {
                style.color
            };
            if is_hovered {
                color = blend_color(color, Color32::WHITE, 0.25);
            }

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("paper-selection", paper_id)),
                selected_paper.as_deref() == Some(paper_id),
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            painter.circle_filled(position, radius, color);
            if style.is_bridge {
                painter.circle_stroke(
                    position,
                    radius + 3.0,
                    Stroke::new(1.2, BRIDGE_RING_COLOR),
                );
            }
            if selected_cluster == Some(style.cluster_id) {
                painter.circle_stroke(position, radius, Stroke::new(3.0, Color32::WHITE));
            }
            if selection_mix > 0.0 {
                let halo_alpha = (60.0 + selection_mix * 160.0) as u8;
                painter.circle_stroke(
                    position,
                    radius + 5.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + selection_mix,
                        Color32::from_rgba_unmultiplied(
                            SELECTED_PAPER_COLOR.r(),
                            SELECTED_PAPER_COLOR.g(),
                            SELECTED_PAPER_COLOR.b(),
                            halo_alpha,
                        ),
                    ),
                );
            }

            let should_draw_label =
                camera.zoom > 0.45 || is_hovered || is_match || selection_mix > 0.0;
            if should_draw_label {
                painter.text(
                    position + vec2(radius + 6.0, 0.0),
                    Align2::LEFT_CENTER,
                    style.label.as_str(),
                    label_font.clone(),
                    LABEL_COLOR,
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some(index) = hovered
            && let Some(paper) = graph.source.nodes.get(index)
        {
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!(
                    "{}  |  {}  |  Cluster {}",
                    paper.title,
                    paper.year,
                    paper.cluster_id + 1
                ),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        let phase = match graph.simulation.phase() {
            SimulationPhase::Idle => "idle".to_owned(),
            SimulationPhase::Running => format!("running (alpha {:.2})", graph.simulation.alpha()),
            SimulationPhase::Cooling => format!("cooling (alpha {:.3})", graph.simulation.alpha()),
            SimulationPhase::Settled => "settled".to_owned(),
        };
        painter.text(
            rect.right_top() + vec2(-10.0, 10.0),
            Align2::RIGHT_TOP,
            format!(
                "{} papers  |  {} links  |  layout {phase}",
                graph.source.node_count(),
                graph.simulation.links().len()
            ),
            FontId::proportional(12.0),
            LABEL_COLOR,
        );

        draw_legend(&painter, rect);
    }
}

fn draw_legend(painter: &egui::Painter, rect: Rect) {
    let origin = rect.left_bottom() + vec2(14.0, -86.0);
    painter.rect_filled(
        Rect::from_min_size(origin - vec2(8.0, 8.0), vec2(150.0, 86.0)),
        6.0,
        Color32::from_rgba_unmultiplied(15, 23, 42, 210),
    );

    let font = FontId::proportional(11.0);
    for (row, kind) in [LinkKind::Citation, LinkKind::Similarity, LinkKind::Dataset]
        .into_iter()
        .enumerate()
    {
        let y = origin.y + 6.0 + row as f32 * 18.0;
        let start = Pos2::new(origin.x, y);
        let end = Pos2::new(origin.x + 28.0, y);
        draw_link(painter, kind, start, end, 1.0);
        painter.text(
            end + vec2(8.0, 0.0),
            Align2::LEFT_CENTER,
            kind.label(),
            font.clone(),
            LABEL_COLOR,
        );
    }

    let bridge = Pos2::new(origin.x + 14.0, origin.y + 60.0);
    painter.circle_filled(bridge, 6.0, Color32::from_gray(120));
    painter.circle_stroke(bridge, 9.0, Stroke::new(1.2, BRIDGE_RING_COLOR));
    painter.text(
        Pos2::new(origin.x + 36.0, bridge.y),
        Align2::LEFT_CENTER,
        "bridge paper",
        font,
        LABEL_COLOR,
    );
}
