//! Data module - content model and catalog lookups

pub mod catalog;
pub mod model;

pub use catalog::{Catalog, ContentSource};
pub use model::{
    Article, Cell, Chart, ChartPayload, ChartType, Indicator, MapPayload, Region, Series,
    TablePayload, TimeSeries, Topic, VisualizationData, VisualizationPayload,
};
