// User-facing notifications and their per-task cooldown
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub task: String,
    pub outcome: Outcome,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(task: impl Into<String>, outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            outcome,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Receives notifications that passed the throttle (toasts in the host UI)
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Lets the first notification per task and outcome through, then suppresses
/// the same kind until the cooldown has elapsed.
#[derive(Debug)]
pub struct NotificationThrottle {
    cooldown: Duration,
    last_shown: HashMap<(String, Outcome), Instant>,
}

impl NotificationThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_shown: HashMap::new(),
        }
    }

    /// Records the notification as shown when it is allowed
    pub fn should_notify(&mut self, task: &str, outcome: Outcome, now: Instant) -> bool {
        let key = (task.to_string(), outcome);
        match self.last_shown.get(&key) {
            Some(last) if now.saturating_duration_since(*last) <= self.cooldown => false,
            _ => {
                self.last_shown.insert(key, now);
                true
            }
        }
    }
}

impl Default for NotificationThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_storm_notifies_once_per_minute() {
        let mut throttle = NotificationThrottle::default();
        let start = Instant::now();

        let shown: Vec<bool> = [0, 4, 9]
            .iter()
            .map(|s| throttle.should_notify("charts", Outcome::Failure, start + Duration::from_secs(*s)))
            .collect();
        assert_eq!(shown, vec![true, false, false]);

        assert!(throttle.should_notify("charts", Outcome::Failure, start + Duration::from_secs(61)));
    }

    #[test]
    fn test_outcomes_and_tasks_are_tracked_separately() {
        let mut throttle = NotificationThrottle::default();
        let now = Instant::now();

        assert!(throttle.should_notify("forecast", Outcome::Failure, now));
        assert!(throttle.should_notify("forecast", Outcome::Success, now));
        assert!(throttle.should_notify("history", Outcome::Failure, now));
        assert!(!throttle.should_notify("forecast", Outcome::Success, now + Duration::from_secs(30)));
    }

    #[test]
    fn test_suppressed_attempts_do_not_extend_cooldown() {
        let mut throttle = NotificationThrottle::new(Duration::from_secs(10));
        let start = Instant::now();

        assert!(throttle.should_notify("realtime", Outcome::Failure, start));
        assert!(!throttle.should_notify("realtime", Outcome::Failure, start + Duration::from_secs(9)));
        assert!(throttle.should_notify("realtime", Outcome::Failure, start + Duration::from_secs(11)));
    }
}
