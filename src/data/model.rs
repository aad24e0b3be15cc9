//! Visualization Data Model
//! Typed records for topics, articles, chart cards and the chart/table/map
//! payloads behind every visualization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A climate topic (temperature, rainfall, drought, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub chart_count: usize,
    pub article_count: usize,
    pub image: String,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

/// Collapsible key indicator shown on a topic page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub label: String,
    pub value: String,
    pub description: String,
    #[serde(default)]
    pub time_series: Option<TimeSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: String,
    /// ISO date, `YYYY-MM-DD`
    pub date: String,
    pub excerpt: String,
    pub topic_id: String,
    /// Estimated read time in minutes
    pub read_time: u32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub body: Vec<String>,
    #[serde(default)]
    pub visualization_id: Option<String>,
}

/// Chart card listed on topic pages; opens a visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub description: String,
    pub visualization_id: String,
    #[serde(default)]
    pub insight: Option<String>,
}

/// Named yearly series drawn over a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    /// (year, value) pairs
    pub points: Vec<(i32, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Area,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    /// Hex colour override, e.g. `#e74c3c`
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPayload {
    pub chart_type: ChartType,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ChartPayload {
    /// Every series needs one value per category label.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.series.is_empty() {
            return Err("chart has no series".to_string());
        }
        for series in &self.series {
            if series.values.len() != self.labels.len() {
                return Err(format!(
                    "series `{}` has {} values for {} labels",
                    series.name,
                    series.values.len(),
                    self.labels.len()
                ));
            }
        }
        Ok(())
    }

    /// Min/max over all series values.
    pub fn value_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in self.series.iter().flat_map(|s| s.values.iter()) {
            if v.is_finite() {
                min = min.min(*v);
                max = max.max(*v);
            }
        }
        if min > max {
            (0.0, 1.0)
        } else {
            (min, max)
        }
    }
}

/// Table cell: numbers keep their numeric form for alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{:.2}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl TablePayload {
    pub fn check_shape(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("table has no columns".to_string());
        }
        match self
            .rows
            .iter()
            .position(|row| row.len() != self.columns.len())
        {
            Some(idx) => Err(format!(
                "row {} has {} cells for {} columns",
                idx,
                self.rows[idx].len(),
                self.columns.len()
            )),
            None => Ok(()),
        }
    }
}

/// A country or region on the map, placed at its centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// ISO 3166-1 alpha-3
    pub code: String,
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    pub metric: String,
    pub unit: String,
    pub regions: Vec<Region>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl MapPayload {
    pub fn check_shape(&self) -> Result<(), String> {
        if self.regions.is_empty() {
            return Err("map has no regions".to_string());
        }
        if let Some(r) = self
            .regions
            .iter()
            .find(|r| !(-180.0..=180.0).contains(&r.lon) || !(-90.0..=90.0).contains(&r.lat))
        {
            return Err(format!("region `{}` has an invalid centroid", r.code));
        }
        Ok(())
    }

    /// Colour scale bounds: explicit min/max win over the data extent.
    pub fn value_range(&self) -> (f64, f64) {
        let data_min = self.regions.iter().map(|r| r.value).fold(f64::INFINITY, f64::min);
        let data_max = self
            .regions
            .iter()
            .map(|r| r.value)
            .fold(f64::NEG_INFINITY, f64::max);
        let min = self.min.unwrap_or(data_min);
        let max = self.max.unwrap_or(data_max);
        if min.is_finite() && max.is_finite() && max > min {
            (min, max)
        } else if min.is_finite() {
            (min, min + 1.0)
        } else {
            (0.0, 1.0)
        }
    }
}

/// Payload keyed by the declared visualization type.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualizationPayload {
    Chart(ChartPayload),
    Table(TablePayload),
    Map(MapPayload),
    /// Declared type the atlas has no renderer for.
    Unsupported { kind: String },
}

impl VisualizationPayload {
    pub fn kind(&self) -> &str {
        match self {
            VisualizationPayload::Chart(_) => "chart",
            VisualizationPayload::Table(_) => "table",
            VisualizationPayload::Map(_) => "map",
            VisualizationPayload::Unsupported { kind } => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationData {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub description: String,
    pub payload: VisualizationPayload,
}

impl VisualizationData {
    /// Declared type discriminant.
    pub fn kind(&self) -> &str {
        self.payload.kind()
    }
}

/// Visualization record as stored in content files, before the
/// `type`/`data` pairing is checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVisualization {
    pub id: String,
    pub topic_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(labels: usize, values: usize) -> ChartPayload {
        ChartPayload {
            chart_type: ChartType::Line,
            x_label: "Year".into(),
            y_label: "°C".into(),
            labels: (0..labels).map(|i| (2000 + i).to_string()).collect(),
            series: vec![Series {
                name: "Anomaly".into(),
                values: vec![0.5; values],
                color: None,
            }],
            source: None,
        }
    }

    #[test]
    fn chart_shape_requires_one_value_per_label() {
        assert!(payload(3, 3).check_shape().is_ok());
        let err = payload(3, 2).check_shape().unwrap_err();
        assert!(err.contains("2 values for 3 labels"));
    }

    #[test]
    fn table_cells_deserialize_untagged() {
        let table: TablePayload = serde_json::from_str(
            r#"{"columns":["Country","Change"],"rows":[["Kenya",1.25],["Chad",2]]}"#,
        )
        .unwrap();
        assert!(table.check_shape().is_ok());
        assert_eq!(table.rows[0][1], Cell::Number(1.25));
        assert_eq!(table.rows[1][1].to_string(), "2");
        assert_eq!(table.rows[0][0].to_string(), "Kenya");
    }

    #[test]
    fn map_range_prefers_explicit_bounds() {
        let mut map = MapPayload {
            metric: "Warming".into(),
            unit: "°C".into(),
            regions: vec![
                Region { name: "Mali".into(), code: "MLI".into(), lon: -2.0, lat: 17.0, value: 1.8 },
                Region { name: "Ghana".into(), code: "GHA".into(), lon: -1.0, lat: 8.0, value: 1.1 },
            ],
            min: None,
            max: None,
        };
        assert_eq!(map.value_range(), (1.1, 1.8));
        map.min = Some(0.0);
        map.max = Some(3.0);
        assert_eq!(map.value_range(), (0.0, 3.0));
    }

    #[test]
    fn map_rejects_impossible_centroid() {
        let map = MapPayload {
            metric: "Rainfall".into(),
            unit: "%".into(),
            regions: vec![Region {
                name: "Nowhere".into(),
                code: "XXX".into(),
                lon: 200.0,
                lat: 0.0,
                value: 1.0,
            }],
            min: None,
            max: None,
        };
        assert!(map.check_shape().is_err());
    }
}
