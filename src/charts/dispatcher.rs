//! Visualization Dispatcher
//! Routes a visualization to the renderer matching its declared type.
//!
//! Dispatch is a pure function: props are forwarded untouched and an
//! unknown type becomes a placeholder view instead of an error.

use crate::data::{
    ChartPayload, MapPayload, TablePayload, TimeSeries, VisualizationData, VisualizationPayload,
};

/// Default chart height in logical pixels.
pub const DEFAULT_HEIGHT: f32 = 400.0;

/// Display options supplied by the page embedding a visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    pub height: f32,
    pub show_controls: bool,
    pub time_series: Option<TimeSeries>,
    pub insight: Option<String>,
    pub responsive: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            show_controls: true,
            time_series: None,
            insight: None,
            responsive: true,
        }
    }
}

impl DisplayOptions {
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_controls(mut self, show_controls: bool) -> Self {
        self.show_controls = show_controls;
        self
    }

    pub fn with_time_series(mut self, time_series: Option<TimeSeries>) -> Self {
        self.time_series = time_series;
        self
    }

    pub fn with_insight(mut self, insight: Option<String>) -> Self {
        self.insight = insight;
        self
    }

    pub fn with_responsive(mut self, responsive: bool) -> Self {
        self.responsive = responsive;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartProps<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub payload: &'a ChartPayload,
    pub height: f32,
    pub show_controls: bool,
    pub time_series: Option<&'a TimeSeries>,
    pub insight: Option<&'a str>,
    pub responsive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableProps<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub payload: &'a TablePayload,
    pub height: f32,
    pub show_controls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapProps<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub payload: &'a MapPayload,
    pub height: f32,
    pub show_controls: bool,
    pub responsive: bool,
}

/// Renderable view selected by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualizationView<'a> {
    Chart(ChartProps<'a>),
    Table(TableProps<'a>),
    Map(MapProps<'a>),
    Unsupported { kind: &'a str, title: &'a str },
}

impl<'a> VisualizationView<'a> {
    /// Type of the adapter this view is routed to.
    pub fn kind(&self) -> &'a str {
        match self {
            VisualizationView::Chart(_) => "chart",
            VisualizationView::Table(_) => "table",
            VisualizationView::Map(_) => "map",
            VisualizationView::Unsupported { kind, .. } => *kind,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, VisualizationView::Unsupported { .. })
    }

    pub fn title(&self) -> &'a str {
        match self {
            VisualizationView::Chart(p) => p.title,
            VisualizationView::Table(p) => p.title,
            VisualizationView::Map(p) => p.title,
            VisualizationView::Unsupported { title, .. } => *title,
        }
    }
}

/// Placeholder height for unsupported types.
pub const UNSUPPORTED_HEIGHT: f32 = 80.0;

/// Selects a renderer by declared visualization type.
pub struct VisualizationDispatcher;

impl VisualizationDispatcher {
    pub fn dispatch<'a>(
        data: &'a VisualizationData,
        options: &'a DisplayOptions,
    ) -> VisualizationView<'a> {
        match &data.payload {
            VisualizationPayload::Chart(payload) => VisualizationView::Chart(ChartProps {
                id: &data.id,
                title: &data.title,
                payload,
                height: options.height,
                show_controls: options.show_controls,
                time_series: options.time_series.as_ref(),
                insight: options.insight.as_deref(),
                responsive: options.responsive,
            }),
            VisualizationPayload::Table(payload) => VisualizationView::Table(TableProps {
                id: &data.id,
                title: &data.title,
                payload,
                height: options.height,
                show_controls: options.show_controls,
            }),
            VisualizationPayload::Map(payload) => VisualizationView::Map(MapProps {
                id: &data.id,
                title: &data.title,
                payload,
                height: options.height,
                show_controls: options.show_controls,
                responsive: options.responsive,
            }),
            VisualizationPayload::Unsupported { kind } => VisualizationView::Unsupported {
                kind,
                title: &data.title,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{Cell, ChartType, Region, Series};
    use proptest::prelude::*;

    pub(crate) fn chart_data(id: &str) -> VisualizationData {
        VisualizationData {
            id: id.into(),
            topic_id: "rising-temperatures".into(),
            title: "Anomaly".into(),
            description: String::new(),
            payload: VisualizationPayload::Chart(ChartPayload {
                chart_type: ChartType::Line,
                x_label: "Year".into(),
                y_label: "°C".into(),
                labels: vec!["2021".into(), "2022".into(), "2023".into()],
                series: vec![Series {
                    name: "Africa".into(),
                    values: vec![0.42, 0.44, 0.61],
                    color: None,
                }],
                source: None,
            }),
        }
    }

    pub(crate) fn table_data(id: &str) -> VisualizationData {
        VisualizationData {
            id: id.into(),
            topic_id: "sea-level-rise".into(),
            title: "Gauges".into(),
            description: String::new(),
            payload: VisualizationPayload::Table(TablePayload {
                columns: vec!["Station".into(), "Trend".into()],
                rows: vec![vec![Cell::Text("Dakar".into()), Cell::Number(3.1)]],
                caption: None,
            }),
        }
    }

    pub(crate) fn map_data(id: &str) -> VisualizationData {
        VisualizationData {
            id: id.into(),
            topic_id: "rising-temperatures".into(),
            title: "Warming".into(),
            description: String::new(),
            payload: VisualizationPayload::Map(MapPayload {
                metric: "Temperature change".into(),
                unit: "°C".into(),
                regions: vec![Region {
                    name: "Kenya".into(),
                    code: "KEN".into(),
                    lon: 37.9,
                    lat: 0.0,
                    value: 1.2,
                }],
                min: None,
                max: None,
            }),
        }
    }

    fn unsupported(kind: &str) -> VisualizationData {
        VisualizationData {
            id: "x".into(),
            topic_id: "t".into(),
            title: "Mystery".into(),
            description: String::new(),
            payload: VisualizationPayload::Unsupported { kind: kind.into() },
        }
    }

    #[test]
    fn each_known_type_routes_to_its_adapter() {
        let options = DisplayOptions::default();
        for data in [chart_data("c"), table_data("t"), map_data("m")] {
            let view = VisualizationDispatcher::dispatch(&data, &options);
            assert_eq!(view.kind(), data.kind());
            assert!(view.is_supported());
        }
    }

    #[test]
    fn chart_props_are_forwarded_untouched() {
        let data = chart_data("chart-1");
        let series = TimeSeries {
            name: "Overlay".into(),
            points: vec![(2022, 0.4)],
        };
        let options = DisplayOptions::default()
            .with_height(250.0)
            .with_controls(false)
            .with_time_series(Some(series.clone()))
            .with_insight(Some("Warmest year".into()))
            .with_responsive(false);

        let VisualizationView::Chart(props) = VisualizationDispatcher::dispatch(&data, &options)
        else {
            panic!("expected chart view");
        };
        assert_eq!(props.id, "chart-1");
        assert_eq!(props.height, 250.0);
        assert!(!props.show_controls);
        assert_eq!(props.time_series, Some(&series));
        assert_eq!(props.insight, Some("Warmest year"));
        assert!(!props.responsive);
        assert!(std::ptr::eq(
            props.payload,
            match &data.payload {
                VisualizationPayload::Chart(p) => p,
                _ => unreachable!(),
            }
        ));
    }

    #[test]
    fn map_and_table_receive_height_and_controls() {
        let options = DisplayOptions::default().with_height(320.0).with_controls(false);
        let table = table_data("t");
        match VisualizationDispatcher::dispatch(&table, &options) {
            VisualizationView::Table(p) => {
                assert_eq!(p.height, 320.0);
                assert!(!p.show_controls);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
        let map = map_data("m");
        match VisualizationDispatcher::dispatch(&map, &options) {
            VisualizationView::Map(p) => {
                assert_eq!(p.height, 320.0);
                assert!(p.responsive);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    proptest! {
        #[test]
        fn unknown_types_fall_back(kind in "[a-z_-]{1,12}") {
            prop_assume!(!["chart", "table", "map"].contains(&kind.as_str()));
            let data = unsupported(&kind);
            let options = DisplayOptions::default();
            let view = VisualizationDispatcher::dispatch(&data, &options);
            prop_assert!(!view.is_supported());
            prop_assert_eq!(view.kind(), kind.as_str());
            prop_assert_eq!(view.title(), "Mystery");
        }
    }
}
