// Fans notifications out to connected event-stream clients
use crate::application::notification::{Notification, Notifier, Outcome};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        match notification.outcome {
            Outcome::Success => {
                tracing::info!(task = %notification.task, message = %notification.message, "notification")
            }
            Outcome::Failure => {
                tracing::warn!(task = %notification.task, message = %notification.message, "notification")
            }
        }

        if self.sender.send(notification).is_err() {
            tracing::trace!("no event subscribers connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();

        notifier.notify(Notification::new("charts", Outcome::Failure, "backend unreachable"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.task, "charts");
        assert_eq!(received.outcome, Outcome::Failure);
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = BroadcastNotifier::new(4);
        notifier.notify(Notification::new("status", Outcome::Success, "ok"));
    }
}
