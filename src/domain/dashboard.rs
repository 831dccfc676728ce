// Dashboard domain model: what a refresh cycle hands to the view
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Mini,
}

/// A chart already drawn onto an SVG surface
#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    #[serde(skip)]
    pub svg: String,
}

impl RenderedChart {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: ChartKind, svg: String) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            svg,
        }
    }
}

/// Latest state of one dashboard panel
#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub panel: String,
    pub updated_at: DateTime<Utc>,
    pub data: serde_json::Value,
    pub charts: Vec<RenderedChart>,
}

impl PanelSnapshot {
    pub fn new(panel: impl Into<String>, data: serde_json::Value, charts: Vec<RenderedChart>) -> Self {
        Self {
            panel: panel.into(),
            updated_at: Utc::now(),
            data,
            charts,
        }
    }

    pub fn chart(&self, id: &str) -> Option<&RenderedChart> {
        self.charts.iter().find(|c| c.id == id)
    }
}
