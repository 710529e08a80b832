use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Outbound messages produced by the workflow. Both are best-effort: a
/// delivery failure never fails or rolls back the operation that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Staff alert raised when a new application lands.
    ApplicationReceived {
        applicant_name: String,
        applicant_phone: String,
        course_title: String,
    },
    /// Credentials for a freshly provisioned student account.
    EnrollmentCredentials {
        recipient: String,
        password: String,
        course_title: String,
    },
}

impl Notification {
    pub fn subject(&self) -> &'static str {
        match self {
            Notification::ApplicationReceived { .. } => "New admission application",
            Notification::EnrollmentCredentials { .. } => "Your student account",
        }
    }

    /// Rendered message body. Every interpolated field is escaped so
    /// applicant-supplied text cannot inject markup into the template.
    pub fn body(&self) -> String {
        match self {
            Notification::ApplicationReceived {
                applicant_name,
                applicant_phone,
                course_title,
            } => format!(
                "New application from {} ({}) for {}. Review it in the admin panel.",
                escape_text(applicant_name),
                escape_text(applicant_phone),
                escape_text(course_title),
            ),
            Notification::EnrollmentCredentials {
                recipient,
                password,
                course_title,
            } => format!(
                "Your enrollment in {} is confirmed. Sign in with {} and the temporary password {}.",
                escape_text(course_title),
                escape_text(recipient),
                escape_text(password),
            ),
        }
    }
}

/// Escape text destined for a templated message body.
pub fn escape_text(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound delivery hook (mail adapter, logging transport, test double).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Fire-and-forget decorator: hands messages to a background worker over a
/// channel so delivery never blocks the workflow. Worker-side failures are
/// logged and dropped.
pub struct QueuedPublisher {
    sender: mpsc::Sender<Notification>,
}

impl QueuedPublisher {
    pub fn spawn(delivery: Arc<dyn NotificationPublisher>) -> Self {
        let (sender, receiver) = mpsc::channel::<Notification>();
        thread::Builder::new()
            .name("notification-dispatch".to_string())
            .spawn(move || {
                for notification in receiver {
                    let subject = notification.subject();
                    if let Err(error) = delivery.publish(notification) {
                        warn!(%error, subject, "notification delivery failed");
                    }
                }
            })
            .expect("failed to spawn notification dispatch worker");
        Self { sender }
    }
}

impl NotificationPublisher for QueuedPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sender
            .send(notification)
            .map_err(|_| NotificationError::Transport("dispatch queue closed".to_string()))
    }
}
