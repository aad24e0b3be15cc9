//! Africa Climate Atlas - Climate data, stories and visualizations for Africa
//!
//! A desktop atlas browsing topics, articles and charts, with PNG/SVG/PDF
//! export of any visualization.

mod auth;
mod charts;
mod config;
mod consent;
mod data;
mod export;
mod gui;

use anyhow::Context;
use config::AppConfig;
use data::Catalog;
use eframe::egui;
use gui::AtlasApp;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let (config, config_path) = AppConfig::discover().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config_path {
        Some(path) => info!("Using config {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let catalog = match &config.content.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::bundled().context("Bundled content is invalid")?,
    };
    info!(
        "Catalog ready: {} topics, {} articles",
        catalog.topics().len(),
        catalog.articles().len()
    );

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 650.0])
            .with_title("Africa Climate Atlas"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Africa Climate Atlas",
        options,
        Box::new(|_cc| Ok(Box::new(AtlasApp::new(config, catalog)))),
    )
    .map_err(|e| anyhow::anyhow!("Window failed: {}", e))
}
