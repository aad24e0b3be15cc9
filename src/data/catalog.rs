//! Content Catalog Module
//! Static lookups over topics, articles, chart cards and visualizations.
//!
//! Visualization records are validated here: a known `type` whose `data`
//! does not match its shape is rejected at load time, so the dispatcher only
//! ever sees well-formed payloads.

use crate::data::model::{
    Article, Chart, ChartPayload, MapPayload, RawVisualization, TablePayload, Topic,
    VisualizationData, VisualizationPayload,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Content bundled with the binary.
const BUNDLED_CONTENT: &str = include_str!("content.json");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read content file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed content: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Visualization `{id}` declares type `{kind}` but its data does not match: {reason}")]
    PayloadMismatch {
        id: String,
        kind: String,
        reason: String,
    },
    #[error("Duplicate {entity} id `{id}`")]
    DuplicateId { entity: &'static str, id: String },
}

/// Entity lookups consumed by pages. Absent ids yield `None`, never an error.
pub trait ContentSource {
    fn article_by_id(&self, id: &str) -> Option<&Article>;
    fn chart_by_id(&self, id: &str) -> Option<&Chart>;
    fn topic_by_id(&self, id: &str) -> Option<&Topic>;
    fn visualization_by_id(&self, id: &str) -> Option<&VisualizationData>;
    fn charts_by_topic(&self, topic_id: &str) -> Vec<&Chart>;
    fn visualizations_by_topic(&self, topic_id: &str) -> Vec<&VisualizationData>;
}

#[derive(Deserialize)]
struct ContentFile {
    topics: Vec<Topic>,
    articles: Vec<Article>,
    charts: Vec<Chart>,
    visualizations: Vec<RawVisualization>,
}

/// In-memory, read-only content.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    topics: Vec<Topic>,
    articles: Vec<Article>,
    charts: Vec<Chart>,
    visualizations: Vec<VisualizationData>,
}

impl Catalog {
    /// Catalog shipped inside the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CONTENT)
    }

    /// Load a content override from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!(path = %path.display(), "loaded content override");
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: ContentFile = serde_json::from_str(json)?;

        check_unique("topic", file.topics.iter().map(|t| t.id.as_str()))?;
        check_unique("article", file.articles.iter().map(|a| a.id.as_str()))?;
        check_unique("chart", file.charts.iter().map(|c| c.id.as_str()))?;
        check_unique(
            "visualization",
            file.visualizations.iter().map(|v| v.id.as_str()),
        )?;

        let visualizations = file
            .visualizations
            .into_iter()
            .map(validate_visualization)
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self {
            topics: file.topics,
            articles: file.articles,
            charts: file.charts,
            visualizations,
        };
        catalog.warn_dangling_references();

        debug!(
            topics = catalog.topics.len(),
            articles = catalog.articles.len(),
            charts = catalog.charts.len(),
            visualizations = catalog.visualizations.len(),
            "catalog ready"
        );
        Ok(catalog)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn articles_by_topic(&self, topic_id: &str) -> Vec<&Article> {
        self.articles
            .iter()
            .filter(|a| a.topic_id == topic_id)
            .collect()
    }

    /// Most recent articles first. ISO dates sort lexicographically.
    pub fn latest_articles(&self, limit: usize) -> Vec<&Article> {
        let mut articles: Vec<&Article> = self.articles.iter().collect();
        articles.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        articles.truncate(limit);
        articles
    }

    fn warn_dangling_references(&self) {
        for chart in &self.charts {
            if self.visualization_by_id(&chart.visualization_id).is_none() {
                warn!(chart = %chart.id, target = %chart.visualization_id, "chart card points at unknown visualization");
            }
        }
        for vis in &self.visualizations {
            if self.topic_by_id(&vis.topic_id).is_none() {
                warn!(visualization = %vis.id, topic = %vis.topic_id, "visualization references unknown topic");
            }
        }
    }
}

impl ContentSource for Catalog {
    fn article_by_id(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    fn chart_by_id(&self, id: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id == id)
    }

    fn topic_by_id(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    fn visualization_by_id(&self, id: &str) -> Option<&VisualizationData> {
        self.visualizations.iter().find(|v| v.id == id)
    }

    fn charts_by_topic(&self, topic_id: &str) -> Vec<&Chart> {
        self.charts.iter().filter(|c| c.topic_id == topic_id).collect()
    }

    fn visualizations_by_topic(&self, topic_id: &str) -> Vec<&VisualizationData> {
        self.visualizations
            .iter()
            .filter(|v| v.topic_id == topic_id)
            .collect()
    }
}

fn check_unique<'a>(
    entity: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                entity,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Check the `type`/`data` pairing and produce the typed record.
pub fn validate_visualization(raw: RawVisualization) -> Result<VisualizationData, CatalogError> {
    let RawVisualization {
        id,
        topic_id,
        kind,
        title,
        description,
        data,
    } = raw;

    let mismatch = |reason: String| CatalogError::PayloadMismatch {
        id: id.clone(),
        kind: kind.clone(),
        reason,
    };

    let payload = match kind.as_str() {
        "chart" => {
            let chart: ChartPayload =
                serde_json::from_value(data).map_err(|e| mismatch(e.to_string()))?;
            chart.check_shape().map_err(&mismatch)?;
            VisualizationPayload::Chart(chart)
        }
        "table" => {
            let table: TablePayload =
                serde_json::from_value(data).map_err(|e| mismatch(e.to_string()))?;
            table.check_shape().map_err(&mismatch)?;
            VisualizationPayload::Table(table)
        }
        "map" => {
            let map: MapPayload =
                serde_json::from_value(data).map_err(|e| mismatch(e.to_string()))?;
            map.check_shape().map_err(&mismatch)?;
            VisualizationPayload::Map(map)
        }
        _ => {
            warn!(id = %id, kind = %kind, "visualization type has no renderer");
            VisualizationPayload::Unsupported { kind: kind.clone() }
        }
    };

    Ok(VisualizationData {
        id,
        topic_id,
        title,
        description,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: &str, data: serde_json::Value) -> RawVisualization {
        RawVisualization {
            id: "vis".into(),
            topic_id: "rising-temperatures".into(),
            kind: kind.into(),
            title: "Title".into(),
            description: "Description".into(),
            data,
        }
    }

    #[test]
    fn bundled_catalog_loads() {
        let catalog = Catalog::bundled().unwrap();
        assert!(!catalog.topics().is_empty());
        assert!(!catalog.articles().is_empty());
        assert!(catalog.visualization_by_id("chart-1").is_some());
    }

    #[test]
    fn bundled_cards_point_at_existing_visualizations() {
        let catalog = Catalog::bundled().unwrap();
        for topic in catalog.topics() {
            for chart in catalog.charts_by_topic(&topic.id) {
                assert!(
                    catalog.visualization_by_id(&chart.visualization_id).is_some(),
                    "{} -> {}",
                    chart.id,
                    chart.visualization_id
                );
            }
        }
    }

    #[test]
    fn unknown_ids_are_absent_not_errors() {
        let catalog = Catalog::bundled().unwrap();
        assert!(catalog.article_by_id("does-not-exist").is_none());
        assert!(catalog.chart_by_id("does-not-exist").is_none());
        assert!(catalog.topic_by_id("does-not-exist").is_none());
        assert!(catalog.visualization_by_id("does-not-exist").is_none());
        assert!(catalog.charts_by_topic("does-not-exist").is_empty());
        assert!(catalog.visualizations_by_topic("does-not-exist").is_empty());
    }

    #[test]
    fn topic_filters_only_return_members() {
        let catalog = Catalog::bundled().unwrap();
        let topic = &catalog.topics()[0];
        let vis = catalog.visualizations_by_topic(&topic.id);
        assert!(!vis.is_empty());
        assert!(vis.iter().all(|v| v.topic_id == topic.id));
        assert!(catalog
            .articles_by_topic(&topic.id)
            .iter()
            .all(|a| a.topic_id == topic.id));
    }

    #[test]
    fn latest_articles_are_date_descending() {
        let catalog = Catalog::bundled().unwrap();
        let latest = catalog.latest_articles(3);
        assert!(latest.len() <= 3);
        assert!(latest.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn chart_type_with_table_data_is_rejected() {
        let err = validate_visualization(raw(
            "chart",
            json!({"columns": ["a"], "rows": [["x"]]}),
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::PayloadMismatch { ref kind, .. } if kind == "chart"));
    }

    #[test]
    fn ragged_table_is_rejected() {
        let err = validate_visualization(raw(
            "table",
            json!({"columns": ["a", "b"], "rows": [["x", 1], ["y"]]}),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn unknown_type_is_kept_as_unsupported() {
        let vis = validate_visualization(raw("globe", json!({"anything": true}))).unwrap();
        assert_eq!(vis.kind(), "globe");
        assert!(matches!(vis.payload, VisualizationPayload::Unsupported { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{
            "topics": [],
            "articles": [],
            "charts": [],
            "visualizations": [
                {"id": "a", "topicId": "t", "type": "globe", "title": "", "description": ""},
                {"id": "a", "topicId": "t", "type": "globe", "title": "", "description": ""}
            ]
        }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { entity: "visualization", .. }));
    }

    #[test]
    fn load_reads_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.json");
        std::fs::write(
            &path,
            r#"{"topics": [], "articles": [], "charts": [], "visualizations": []}"#,
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert!(catalog.topics().is_empty());
        assert!(Catalog::load(&dir.path().join("missing.json")).is_err());
    }
}
