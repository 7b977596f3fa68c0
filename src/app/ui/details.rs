use eframe::egui::{self, Color32, RichText, Ui};

use crate::papers::PaperNode;

use super::super::render_utils::cluster_color;
use super::super::{InsightAction, UiRequests, ViewModel};

const BRIDGE_BADGE_COLOR: Color32 = Color32::from_rgb(244, 114, 182);
const MUTED_TEXT: Color32 = Color32::from_rgb(148, 163, 184);

fn arxiv_abs_url(arxiv_id: &str) -> String {
    format!("https://arxiv.org/abs/{arxiv_id}")
}

fn arxiv_search_url(title: &str) -> String {
    format!(
        "https://arxiv.org/search/?query={}&searchtype=title",
        urlencoding::encode(title)
    )
}

fn scholar_url(title: &str) -> String {
    format!(
        "https://scholar.google.com/scholar?q={}",
        urlencoding::encode(title)
    )
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui, requests: &mut UiRequests) {
        ui.heading("Details");
        ui.add_space(6.0);

        let paper = self.session.selected_paper().cloned();
        let cluster = self.session.selected_cluster();
        if paper.is_none() && cluster.is_none() {
            ui.label("Select a paper or a cluster badge to explore the field.");
            if !self.session.active_topic().is_empty() {
                ui.add_space(6.0);
                ui.label(
                    RichText::new(format!(
                        "{} papers mapped for \"{}\".",
                        self.session.graph().node_count(),
                        self.session.active_topic()
                    ))
                    .color(MUTED_TEXT),
                );
            }
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Some(paper) = &paper {
                    Self::draw_paper_details(ui, paper);
                }
                if let Some(cluster_id) = cluster {
                    if paper.is_some() {
                        ui.separator();
                    }
                    self.draw_cluster_insight(ui, cluster_id, requests);
                }
            });
    }

    fn draw_paper_details(ui: &mut Ui, paper: &PaperNode) {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("Cluster {}", paper.cluster_id + 1))
                    .color(cluster_color(paper.cluster_id))
                    .small()
                    .strong(),
            );
            if paper.is_bridge {
                ui.label(
                    RichText::new("BRIDGE PAPER")
                        .color(BRIDGE_BADGE_COLOR)
                        .small()
                        .strong(),
                );
            }
        });

        ui.label(RichText::new(&paper.title).size(18.0).strong());
        ui.label(
            RichText::new(format!("{} · {}", paper.authors_line(), paper.year)).color(MUTED_TEXT),
        );
        ui.add_space(8.0);

        ui.label(RichText::new("Why it matters").strong());
        ui.label(RichText::new(format!("\"{}\"", paper.relevance_statement)).italics());
        ui.add_space(8.0);

        ui.label(format!(
            "arXiv: {}",
            paper.arxiv_id.as_deref().unwrap_or("N/A")
        ));
        ui.horizontal_wrapped(|ui| {
            if let Some(arxiv_id) = &paper.arxiv_id {
                ui.hyperlink_to("Open on arXiv", arxiv_abs_url(arxiv_id));
            }
            ui.hyperlink_to("Search arXiv", arxiv_search_url(&paper.title));
            ui.hyperlink_to("Google Scholar", scholar_url(&paper.title));
        });
        ui.add_space(8.0);

        ui.label(RichText::new("Abstract").strong());
        ui.label(&paper.abstract_text);
    }

    fn draw_cluster_insight(&mut self, ui: &mut Ui, cluster_id: u32, requests: &mut UiRequests) {
        ui.label(
            RichText::new(format!("Cluster {} Insights", cluster_id + 1))
                .color(cluster_color(cluster_id))
                .strong(),
        );
        ui.add_space(4.0);

        if self.session.is_insight_loading(cluster_id) {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Synthesizing related work...");
            });
            return;
        }

        match self.session.insight(cluster_id) {
            Some(insight) => {
                ui.label(RichText::new(&insight.title).size(16.0).strong());
                for paragraph in insight.paragraphs() {
                    ui.add_space(4.0);
                    ui.label(paragraph);
                }
                ui.add_space(6.0);
                if ui
                    .button("Regenerate")
                    .on_hover_text("Discard this narrative and ask for a new one.")
                    .clicked()
                {
                    requests.insight = Some(InsightAction::Regenerate(cluster_id));
                }
            }
            None => {
                ui.label(
                    RichText::new("Generate a related-work narrative for the papers in this cluster.")
                        .color(MUTED_TEXT),
                );
                if ui.button("Generate insight").clicked() {
                    requests.insight = Some(InsightAction::Generate(cluster_id));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_links_are_encoded() {
        assert_eq!(arxiv_abs_url("2010.11929"), "https://arxiv.org/abs/2010.11929");
        assert_eq!(
            arxiv_search_url("Swin Transformer: Hierarchical"),
            "https://arxiv.org/search/?query=Swin%20Transformer%3A%20Hierarchical&searchtype=title"
        );
        assert_eq!(
            scholar_url("DETR & friends"),
            "https://scholar.google.com/scholar?q=DETR%20%26%20friends"
        );
    }
}
