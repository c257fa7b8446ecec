use crate::models::NotificationKind;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub description: Option<String>,
}

/// Transient user feedback shown as a toast. Fire and forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind, description: Option<&str>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind, description: Option<&str>) {
        let description = description.unwrap_or_default();
        match kind {
            NotificationKind::Info | NotificationKind::Success => {
                info!(?kind, description, "{message}")
            }
            NotificationKind::Warning => warn!(description, "{message}"),
            NotificationKind::Error => error!(description, "{message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(32)
    }
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, kind: NotificationKind, description: Option<&str>) {
        let notification = Notification {
            message: message.to_string(),
            kind,
            description: description.map(str::to_string),
        };
        if self.sender.send(notification).is_err() {
            trace!(notification = message, "notification dropped without subscribers");
        }
    }
}
