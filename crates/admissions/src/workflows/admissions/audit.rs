use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::UserId;

/// Administrative actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ApplicationStatusChanged,
    StudentEnrolled,
    EnrollmentUpdated,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::ApplicationStatusChanged => "APPLICATION_STATUS_CHANGED",
            AuditAction::StudentEnrolled => "STUDENT_ENROLLED",
            AuditAction::EnrollmentUpdated => "ENROLLMENT_UPDATED",
        }
    }
}

/// One appended audit record. Events are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor_id: UserId,
    pub actor_name: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub details: String,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only sink for administrative mutations.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// In-memory sink backing tests and the demo wiring.
#[derive(Default, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit mutex poisoned").push(event);
    }
}
