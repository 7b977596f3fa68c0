use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use eframe::egui::{self, Color32, Key, RichText, Ui};

use super::super::physics::{LayoutCommand, LayoutConfig};
use super::super::render_utils::{cluster_color, dim_color};
use super::super::{UiRequests, ViewModel};

const ERROR_COLOR: Color32 = Color32::from_rgb(248, 113, 113);

fn physics_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    ui.add(
        egui::Slider::new(value, range)
            .text(text)
            .clamping(egui::SliderClamping::Always),
    )
    .on_hover_text(hover)
    .changed()
}

impl ViewModel {
    fn known_clusters(&self) -> BTreeSet<u32> {
        let mut clusters = self.session.graph().cluster_ids();
        clusters.extend(self.session.filter().visible_clusters());
        clusters
    }

    pub(in crate::app) fn draw_top_bar(&mut self, ui: &mut Ui, requests: &mut UiRequests) {
        let loading = self.session.is_loading();

        ui.horizontal(|ui| {
            ui.heading("paper-atlas");
            ui.separator();

            let topic = ui
                .add(
                    egui::TextEdit::singleline(&mut self.topic_input)
                        .hint_text("Enter a research topic...")
                        .desired_width(340.0),
                )
                .on_hover_text("Press Enter or click Map Field to generate a new graph.");
            let submitted = topic.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));

            let label = if loading { "Analyzing..." } else { "Map Field" };
            let map_clicked = ui
                .add_enabled(!loading, egui::Button::new(RichText::new(label).strong()))
                .clicked();
            if (submitted || map_clicked) && !loading {
                requests.map_topic = true;
            }

            if ui
                .add(egui::Button::new("Filters").selected(self.show_filters))
                .on_hover_text("Show year and cluster filters.")
                .clicked()
            {
                self.show_filters = !self.show_filters;
            }

            if !self.session.active_topic().is_empty() {
                ui.separator();
                ui.label(format!("Mapping: {}", self.session.active_topic()));
            }
        });

        if let Some(error) = self.session.error().map(str::to_owned) {
            ui.horizontal(|ui| {
                ui.label(RichText::new(error).color(ERROR_COLOR));
                if ui.small_button("Dismiss").clicked() {
                    self.session.dismiss_error();
                }
            });
        }

        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new("Clusters").small().strong());
            let selected = self.session.selected_cluster();
            for cluster_id in self.known_clusters() {
                let is_selected = selected == Some(cluster_id);
                let color = cluster_color(cluster_id);
                let badge = egui::Button::new(
                    RichText::new(format!("Cluster {}", cluster_id + 1)).color(Color32::WHITE),
                )
                .fill(if is_selected {
                    color
                } else {
                    dim_color(color, 0.7)
                })
                .stroke(if is_selected {
                    egui::Stroke::new(2.0, Color32::WHITE)
                } else {
                    egui::Stroke::NONE
                })
                .selected(is_selected);

                if ui.add(badge).clicked() {
                    self.session.select_cluster(cluster_id);
                }
            }
        });
        ui.add_space(2.0);
    }

    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search titles")
            .on_hover_text("Fuzzy-highlight matching papers without changing the graph.");
        ui.text_edit_singleline(&mut self.search);

        if self.show_filters {
            ui.separator();
            self.draw_filters(ui);
        }

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Continuously simulate layout forces while viewing the graph.");

        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the active quadtree partitions over the graph canvas.");

        ui.horizontal(|ui| {
            if ui
                .button("Reheat")
                .on_hover_text("Restart the layout from full energy.")
                .clicked()
            {
                self.render_graph.commands.push(LayoutCommand::Reheat);
            }
            if ui
                .button("Freeze")
                .on_hover_text("Stop the layout where it is.")
                .clicked()
            {
                self.render_graph.commands.push(LayoutCommand::Stop);
            }
        });

        ui.collapsing("Physics tuning", |ui| {
            let config = &mut self.layout_config;
            physics_slider(
                ui,
                &mut config.link_distance,
                20.0..=300.0,
                "Link distance",
                "Rest length of the spring along each link.",
            );

            let mut repulsion = -config.charge_strength;
            if physics_slider(
                ui,
                &mut repulsion,
                10.0..=1200.0,
                "Repulsion",
                "How strongly every paper pushes the others away.",
            ) {
                config.charge_strength = -repulsion;
            }

            physics_slider(
                ui,
                &mut config.collision_radius,
                4.0..=80.0,
                "Collision radius",
                "Minimum spacing kept around each paper.",
            );
            physics_slider(
                ui,
                &mut config.velocity_decay,
                0.05..=0.9,
                "Velocity decay",
                "Friction applied to node velocity every tick.",
            );

            if ui.button("Reset to defaults").clicked() {
                *config = LayoutConfig::default();
            }
        });
    }

    fn draw_filters(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Filters").strong());

        let (lo, hi) = self.session.graph().year_span().unwrap_or((2010, 2025));
        let lo = lo.min(self.session.filter().year_range().min);
        let hi = hi.max(self.session.filter().year_range().max);
        let range = self.session.filter().year_range();

        let mut min_year = range.min;
        if ui
            .add(egui::Slider::new(&mut min_year, lo..=hi).text("From"))
            .changed()
        {
            self.session.filter_mut().set_min_year(min_year);
        }

        let mut max_year = range.max;
        if ui
            .add(egui::Slider::new(&mut max_year, lo..=hi).text("To"))
            .changed()
        {
            self.session.filter_mut().set_max_year(max_year);
        }

        ui.add_space(4.0);
        ui.label("Visible clusters")
            .on_hover_text("At least one cluster always stays visible.");
        ui.horizontal_wrapped(|ui| {
            for cluster_id in self.known_clusters() {
                let visible = self.session.filter().is_cluster_visible(cluster_id);
                let toggle = egui::Button::new(format!("C{}", cluster_id + 1))
                    .fill(if visible {
                        cluster_color(cluster_id)
                    } else {
                        Color32::from_gray(40)
                    })
                    .selected(visible);
                if ui.add(toggle).clicked() {
                    self.session.filter_mut().toggle_cluster(cluster_id);
                }
            }
        });
    }
}
