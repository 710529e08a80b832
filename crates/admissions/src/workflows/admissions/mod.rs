//! Admission application intake, review, and enrollment provisioning.
//!
//! The workflow takes a prospective student from a public submission
//! through staff review to a confirmed, credentialed enrollment. Content
//! management and page rendering are external collaborators; this module
//! only needs the repository and notification contracts defined here.

pub mod audit;
pub mod domain;
pub mod intake;
pub mod notify;
pub mod rate_limit;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use domain::{
    Actor, Application, ApplicationId, ApplicationPage, ApplicationStatus, ApplicationSubmission,
    Batch, BatchId, BatchStatus, Course, CourseId, Enrollment, EnrollmentId, EnrollmentStatus,
    Role, User, UserId,
};
pub use intake::{IntakeGuard, ValidationError};
pub use notify::{Notification, NotificationError, NotificationPublisher, QueuedPublisher};
pub use rate_limit::{InMemoryRateLimiter, RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use repository::{AdmissionsRepository, RepositoryError};
pub use router::admissions_router;
pub use service::{
    AdmissionsError, AdmissionsService, ConflictReason, EnrollmentReceipt, RateLimitSettings,
    SubmissionReceipt,
};
