// Page-session view state reported by the host UI
use crate::application::refresh_orchestrator::ViewGate;
use crate::domain::chart::Theme;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

/// Visibility, per-panel interaction and theme for one dashboard session
#[derive(Debug)]
pub struct ViewContext {
    visible: AtomicBool,
    interacting: Mutex<HashSet<String>>,
    theme: RwLock<Theme>,
}

impl ViewContext {
    pub fn new(theme: Theme) -> Self {
        Self {
            visible: AtomicBool::new(true),
            interacting: Mutex::new(HashSet::new()),
            theme: RwLock::new(theme),
        }
    }

    /// Returns true when the view just went from hidden to visible
    pub fn set_visible(&self, visible: bool) -> bool {
        let was_visible = self.visible.swap(visible, Ordering::AcqRel);
        visible && !was_visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub fn set_interacting(&self, panel: &str, active: bool) {
        let mut panels = self.interacting.lock().unwrap_or_else(|e| e.into_inner());
        if active {
            panels.insert(panel.to_string());
        } else {
            panels.remove(panel);
        }
    }

    pub fn is_interacting(&self, panel: &str) -> bool {
        self.interacting
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(panel)
    }

    pub fn theme(&self) -> Theme {
        *self.theme.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_theme(&self, theme: Theme) {
        *self.theme.write().unwrap_or_else(|e| e.into_inner()) = theme;
    }
}

impl Default for ViewContext {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl ViewGate for ViewContext {
    fn allows(&self, task: &str) -> bool {
        self.is_visible() && !self.is_interacting(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_requires_visible_and_idle_panel() {
        let view = ViewContext::default();
        assert!(view.allows("realtime"));

        view.set_interacting("realtime", true);
        assert!(!view.allows("realtime"));
        assert!(view.allows("charts"));

        view.set_interacting("realtime", false);
        assert!(!view.set_visible(false));
        assert!(!view.allows("charts"));
    }

    #[test]
    fn test_becoming_visible_is_reported_once() {
        let view = ViewContext::default();
        view.set_visible(false);
        assert!(view.set_visible(true));
        assert!(!view.set_visible(true));
    }

    #[test]
    fn test_theme_switch() {
        let view = ViewContext::new(Theme::Light);
        view.set_theme(Theme::Dark);
        assert_eq!(view.theme(), Theme::Dark);
    }
}
