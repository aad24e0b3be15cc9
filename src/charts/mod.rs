//! Charts module - Visualization dispatch and rendering

pub mod dispatcher;
mod plotter;
mod renderer;
pub mod style;

pub use dispatcher::{DisplayOptions, VisualizationDispatcher};
pub use plotter::{to_color32, ChartPlotter};
pub use renderer::StaticChartRenderer;
