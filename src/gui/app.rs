//! Africa Climate Atlas Main Application
//! Main window with navigation panel, page view and cookie banner.

use crate::auth::{AccessGate, HostedIdentity, IdentityProvider};
use crate::config::AppConfig;
use crate::consent::{CookieBanner, FileStore};
use crate::data::Catalog;
use crate::export::{ExportFormat, ExportPipeline, ExportRequest};
use crate::gui::indicators::IndicatorAccordion;
use crate::gui::nav_panel::{NavAction, NavPanel, NavState};
use crate::gui::page_view::{self, PageAction, PageContext, PageView};
use crate::gui::route::{resolve, Page, Route};
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{debug, error, info, warn};

/// Export result from background thread
enum ExportResult {
    Progress(f32, String),
    Saved(PathBuf),
    Failed { element_id: String, error: String },
    Complete { saved: usize, failed: usize },
}

/// Main application window.
pub struct AtlasApp {
    config: AppConfig,
    catalog: Catalog,
    route: Route,
    history: Vec<Route>,
    nav_panel: NavPanel,
    banner: CookieBanner<FileStore>,
    identity: HostedIdentity,
    gate: AccessGate,
    accordion: IndicatorAccordion,

    // Async export
    export_rx: Option<Receiver<ExportResult>>,
    is_exporting: bool,
}

impl AtlasApp {
    pub fn new(config: AppConfig, catalog: Catalog) -> Self {
        let identity = HostedIdentity::from_env(config.auth.clone());
        let gate = AccessGate::new(&identity);
        let banner = CookieBanner::mount(FileStore::new(config.storage.state_path.clone()));
        Self {
            config,
            catalog,
            route: Route::Home,
            history: Vec::new(),
            nav_panel: NavPanel::new(),
            banner,
            identity,
            gate,
            accordion: IndicatorAccordion::new(),
            export_rx: None,
            is_exporting: false,
        }
    }

    fn navigate(&mut self, route: Route) {
        if route == self.route {
            return;
        }
        let previous = std::mem::replace(&mut self.route, route);
        self.history.push(previous);
        self.on_route_changed();
    }

    fn go_back(&mut self) {
        if let Some(route) = self.history.pop() {
            self.route = route;
            self.on_route_changed();
        }
    }

    fn on_route_changed(&mut self) {
        self.accordion.close();
        self.nav_panel.sync_address(&self.route);
        let status = resolve(&self.route, &self.catalog).status;
        debug!(path = %self.route.path(), status, "Navigated");
    }

    fn handle_page_action(&mut self, action: PageAction) {
        match action {
            PageAction::None => {}
            PageAction::Navigate(route) => self.navigate(route),
            PageAction::Export {
                element_ids,
                format,
            } => {
                if !self.is_exporting {
                    self.start_export(element_ids, format);
                }
            }
            PageAction::OpenSignIn => {
                if let Err(e) = self.identity.open_sign_in() {
                    self.nav_panel.set_progress(0.0, &format!("Error: {}", e));
                }
            }
            PageAction::OpenSignUp => {
                if let Err(e) = self.identity.open_sign_up() {
                    self.nav_panel.set_progress(0.0, &format!("Error: {}", e));
                }
            }
            PageAction::Status(message) => self.nav_panel.set_progress(0.0, &message),
        }
    }

    /// Start export in background thread over a snapshot of the current page.
    fn start_export(&mut self, element_ids: Vec<String>, format: ExportFormat) {
        let response = resolve(&self.route, &self.catalog);
        let overlay = match &response.page {
            Page::Topic { topic, .. } => self.accordion.open_series(&topic.indicators),
            _ => None,
        };
        let cards = page_view::cards(&response.page);
        let mut doc = page_view::build_document(&cards, overlay, self.config.export.container_width);

        let export_config = self.config.export.clone();
        let (tx, rx) = channel();
        self.export_rx = Some(rx);
        self.is_exporting = true;
        self.nav_panel
            .set_progress(5.0, &format!("Exporting {} as {}...", element_ids.len(), format));

        thread::spawn(move || {
            let mut pipeline = ExportPipeline::new(&export_config);
            let results = match element_ids.as_slice() {
                [single] => {
                    let _ = tx.send(ExportResult::Progress(30.0, format!("Rendering {}...", single)));
                    let request = ExportRequest::new(single.clone(), format);
                    vec![(single.clone(), pipeline.export(&mut doc, &request))]
                }
                many => {
                    let _ = tx.send(ExportResult::Progress(
                        30.0,
                        format!("Rendering {} visualizations...", many.len()),
                    ));
                    let ids: Vec<&str> = many.iter().map(String::as_str).collect();
                    pipeline.export_all(&mut doc, &ids, format)
                }
            };
            Self::report(&tx, results);
        });
    }

    /// Send per-item outcomes, then the summary (called from background thread)
    fn report(
        tx: &Sender<ExportResult>,
        results: Vec<(String, Result<PathBuf, crate::export::ExportError>)>,
    ) {
        let mut saved = 0;
        let mut failed = 0;
        for (element_id, result) in results {
            match result {
                Ok(path) => {
                    saved += 1;
                    let _ = tx.send(ExportResult::Saved(path));
                }
                Err(e) => {
                    failed += 1;
                    let _ = tx.send(ExportResult::Failed {
                        element_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        let _ = tx.send(ExportResult::Complete { saved, failed });
    }

    /// Check for export results
    fn check_export_results(&mut self) {
        let rx = self.export_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            loop {
                match rx.try_recv() {
                    Ok(result) => {
                        if self.apply_export_result(result) {
                            should_keep_receiver = false;
                            break;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        error!("Export worker stopped before reporting completion");
                        self.nav_panel
                            .set_progress(0.0, "Error: export stopped unexpectedly");
                        self.is_exporting = false;
                        should_keep_receiver = false;
                        break;
                    }
                }
            }

            if should_keep_receiver {
                self.export_rx = Some(rx);
            }
        }
    }

    /// Apply one worker message. Returns true once the export is finished.
    fn apply_export_result(&mut self, result: ExportResult) -> bool {
        match result {
            ExportResult::Progress(progress, status) => {
                self.nav_panel.set_progress(progress, &status);
                false
            }
            ExportResult::Saved(path) => {
                self.nav_panel
                    .set_progress(90.0, &format!("Saved {}", path.display()));
                if self.config.export.open_after_export {
                    if let Err(e) = open::that(&path) {
                        warn!("Could not open {}: {}", path.display(), e);
                    }
                }
                false
            }
            ExportResult::Failed { element_id, error } => {
                self.nav_panel
                    .set_progress(0.0, &format!("Export of {} failed: {}", element_id, error));
                false
            }
            ExportResult::Complete { saved, failed } => {
                info!("Export finished: {} saved, {} failed", saved, failed);
                if failed == 0 {
                    self.nav_panel.set_progress(
                        100.0,
                        &format!(
                            "Saved {} file(s) to {}",
                            saved,
                            self.config.export.output_dir.display()
                        ),
                    );
                }
                self.is_exporting = false;
                true
            }
        }
    }
}

impl eframe::App for AtlasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_export_results();

        // Request repaint while exporting
        if self.is_exporting {
            ctx.request_repaint();
        }

        // Bottom panel - Cookie banner (hidden once decided)
        self.banner.show(ctx);

        // Left panel - Navigation
        let nav_action = SidePanel::left("nav_panel")
            .min_width(280.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .show(ui, |ui| {
                        let state = NavState {
                            current: &self.route,
                            topics: self.catalog.topics(),
                            can_go_back: !self.history.is_empty(),
                            signed_in: self.gate.is_signed_in(),
                            exporting: self.is_exporting,
                        };
                        self.nav_panel.show(ui, &state)
                    })
                    .inner
            })
            .inner;

        match nav_action {
            NavAction::Go(route) => self.navigate(route),
            NavAction::Back => self.go_back(),
            NavAction::None => {}
        }

        // Central panel - Page view
        let page_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let response = resolve(&self.route, &self.catalog);
                PageView::show(
                    ui,
                    &response,
                    PageContext {
                        gate: &self.gate,
                        provider: &self.identity,
                        accordion: &mut self.accordion,
                        exporting: self.is_exporting,
                    },
                )
            })
            .inner;

        self.handle_page_action(page_action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(dir: &std::path::Path) -> AtlasApp {
        let mut config = AppConfig::default();
        config.storage.state_path = dir.join("state.json");
        config.export.output_dir = dir.join("exports");
        AtlasApp::new(config, Catalog::bundled().unwrap())
    }

    #[test]
    fn dead_worker_releases_export_buttons() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let (tx, rx) = channel::<ExportResult>();
        app.export_rx = Some(rx);
        app.is_exporting = true;

        let worker = thread::spawn(move || {
            let _ = tx.send(ExportResult::Progress(30.0, "Rendering chart-1...".into()));
            panic!("renderer crashed");
        });
        assert!(worker.join().is_err());

        app.check_export_results();
        assert!(!app.is_exporting);
        assert!(app.export_rx.is_none());
        assert!(app.nav_panel.status.starts_with("Error"));
    }

    #[test]
    fn completion_is_not_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let (tx, rx) = channel();
        app.export_rx = Some(rx);
        app.is_exporting = true;

        AtlasApp::report(&tx, vec![("chart-1".into(), Ok(dir.path().join("chart-1.png")))]);
        drop(tx);

        app.check_export_results();
        assert!(!app.is_exporting);
        assert!(app.nav_panel.status.starts_with("Saved 1 file(s)"));
    }

    #[test]
    fn busy_worker_keeps_receiver() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let (tx, rx) = channel();
        app.export_rx = Some(rx);
        app.is_exporting = true;
        tx.send(ExportResult::Progress(30.0, "Rendering...".into())).unwrap();

        app.check_export_results();
        assert!(app.is_exporting);
        assert!(app.export_rx.is_some());
        assert_eq!(app.nav_panel.status, "Rendering...");
    }
}
