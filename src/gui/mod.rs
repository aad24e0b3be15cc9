//! GUI module - User interface components

mod app;
pub mod indicators;
mod nav_panel;
mod page_view;
pub mod route;

pub use app::AtlasApp;
