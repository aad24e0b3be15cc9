//! Navigation Panel Widget
//! Left side panel with site navigation, address bar, account and export progress.

use crate::data::Topic;
use crate::gui::route::Route;
use egui::{Color32, RichText};

/// Left side panel: where to go and what is happening.
pub struct NavPanel {
    pub address: String,
    pub progress: f32,
    pub status: String,
}

impl Default for NavPanel {
    fn default() -> Self {
        Self {
            address: "/".to_string(),
            progress: 0.0,
            status: "Ready".to_string(),
        }
    }
}

/// Read-only state the panel reflects.
pub struct NavState<'a> {
    pub current: &'a Route,
    pub topics: &'a [Topic],
    pub can_go_back: bool,
    pub signed_in: bool,
    pub exporting: bool,
}

impl NavPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the address bar in step with the current page.
    pub fn sync_address(&mut self, route: &Route) {
        self.address = route.path();
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &NavState<'_>) -> NavAction {
        let mut action = NavAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🌍 Climate Atlas")
                    .size(22.0)
                    .color(Color32::from_rgb(211, 84, 0)),
            );
            ui.label(RichText::new("Africa").size(11.0).color(Color32::GRAY));
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Address Bar =====
        ui.horizontal(|ui| {
            if ui
                .add_enabled(state.can_go_back, egui::Button::new("◀"))
                .clicked()
            {
                action = NavAction::Back;
            }
            let field = ui.add(
                egui::TextEdit::singleline(&mut self.address)
                    .desired_width(190.0)
                    .font(egui::TextStyle::Monospace),
            );
            let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Go").clicked() || submitted {
                action = NavAction::Go(Route::parse(&self.address));
            }
        });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Sections =====
        ui.label(RichText::new("📖 Browse").size(14.0).strong());
        ui.add_space(5.0);
        for (label, route) in [
            ("Home", Route::Home),
            ("Topics", Route::Topics),
            ("Articles", Route::Articles),
        ] {
            if ui
                .selectable_label(*state.current == route, label)
                .clicked()
            {
                action = NavAction::Go(route);
            }
        }

        ui.add_space(10.0);
        ui.label(RichText::new("🗂 Topics").size(14.0).strong());
        ui.add_space(5.0);
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                for topic in state.topics {
                    let selected = matches!(state.current, Route::Topic(id) if *id == topic.id);
                    if ui.selectable_label(selected, &topic.title).clicked() {
                        action = NavAction::Go(Route::Topic(topic.id.clone()));
                    }
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Account =====
        ui.label(RichText::new("👤 Account").size(14.0).strong());
        ui.add_space(5.0);
        if state.signed_in {
            ui.label(
                RichText::new("Signed in")
                    .size(12.0)
                    .color(Color32::from_rgb(40, 167, 69)),
            );
        } else {
            ui.horizontal(|ui| {
                if ui.button("Sign in").clicked() {
                    action = NavAction::Go(Route::SignIn);
                }
                if ui.button("Sign up").clicked() {
                    action = NavAction::Go(Route::SignUp);
                }
            });
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Export").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(state.exporting),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") || self.status.contains("failed") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Saved") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by the navigation panel
#[derive(Debug, Clone, PartialEq)]
pub enum NavAction {
    None,
    Go(Route),
    Back,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_follows_route() {
        let mut panel = NavPanel::new();
        assert_eq!(panel.address, "/");
        panel.sync_address(&Route::Article("maize-under-heat".into()));
        assert_eq!(panel.address, "/articles/maize-under-heat");
    }

    #[test]
    fn progress_updates_status() {
        let mut panel = NavPanel::new();
        panel.set_progress(50.0, "Exporting 1/2");
        assert_eq!(panel.progress, 50.0);
        assert_eq!(panel.status, "Exporting 1/2");
    }
}
