use eframe::egui::{self, Align2, Context, RichText, vec2};

use super::super::{UiRequests, ViewModel};

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context, requests: &mut UiRequests) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, requests));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.draw_details(ui, requests));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));

        if self.session.is_loading() {
            egui::Area::new(egui::Id::new("graph_loading"))
                .anchor(Align2::CENTER_TOP, vec2(0.0, 72.0))
                .interactable(false)
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(RichText::new("Mapping the research field...").strong());
                        });
                    });
                });
        }
    }
}
