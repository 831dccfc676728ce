// In-memory store holding the latest snapshot of every panel
use crate::application::refresh_orchestrator::PanelSink;
use crate::domain::dashboard::PanelSnapshot;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct PanelStore {
    panels: RwLock<HashMap<String, PanelSnapshot>>,
    updates: broadcast::Sender<String>,
}

impl PanelStore {
    pub fn new(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            panels: RwLock::new(HashMap::new()),
            updates,
        }
    }

    pub fn get(&self, panel: &str) -> Option<PanelSnapshot> {
        self.panels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(panel)
            .cloned()
    }

    /// Names of panels as they are refreshed
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }
}

impl Default for PanelStore {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PanelSink for PanelStore {
    fn publish(&self, snapshot: PanelSnapshot) {
        let panel = snapshot.panel.clone();
        tracing::debug!(panel = %panel, charts = snapshot.charts.len(), "panel updated");
        self.panels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(panel.clone(), snapshot);
        // No subscribers is fine
        let _ = self.updates.send(panel);
    }
}
