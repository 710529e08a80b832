use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use tracing::{error, warn};

use super::audit::{AuditAction, AuditEvent, AuditSink};
use super::domain::{
    Actor, Application, ApplicationId, ApplicationPage, ApplicationStatus, ApplicationSubmission,
    Batch, CourseId, Enrollment, EnrollmentId, EnrollmentStatus, Role, User, UserId,
};
use super::intake::{IntakeGuard, ValidationError};
use super::notify::{Notification, NotificationPublisher};
use super::rate_limit::{RateLimitPolicy, RateLimiter};
use super::repository::{AdmissionsRepository, RepositoryError};

const MAX_PAGE_SIZE: u32 = 100;
const TEMP_PASSWORD_LEN: usize = 12;

/// Write-frequency policies applied by the workflow. The in-memory limiter
/// backing the defaults is per-process; multi-instance deployments inject a
/// shared backend instead.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    /// Per phone number, on public submissions.
    pub submission: RateLimitPolicy,
    /// Per admin identity, on administrative mutations.
    pub admin_writes: RateLimitPolicy,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            submission: RateLimitPolicy::per_window(3, 600),
            admin_writes: RateLimitPolicy::per_window(20, 60),
        }
    }
}

/// Business-rule conflicts surfaced to callers as typed results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    #[error("an application for this course is already awaiting a decision")]
    DuplicateApplication,
    #[error("student is already enrolled in this course")]
    AlreadyEnrolled,
    #[error("application {id} is {status}, not ACCEPTED")]
    NotAccepted { id: String, status: &'static str },
}

/// Error raised by the admissions workflow.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("caller is not authorized to perform this action")]
    Unauthorized,
    #[error("too many requests; retry in {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },
    #[error(transparent)]
    Conflict(#[from] ConflictReason),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Confirmation returned to a successful public submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub application_id: ApplicationId,
    pub message: String,
}

/// Confirmation returned to a successful enrollment.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReceipt {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub message: String,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ENROLLMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("user-{id:06}"))
}

fn next_enrollment_id() -> EnrollmentId {
    let id = ENROLLMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EnrollmentId(format!("enr-{id:06}"))
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn require_reviewer(actor: Option<&Actor>) -> Result<&Actor, AdmissionsError> {
    actor
        .filter(|actor| actor.role.can_review())
        .ok_or(AdmissionsError::Unauthorized)
}

fn require_admin(actor: Option<&Actor>) -> Result<&Actor, AdmissionsError> {
    actor
        .filter(|actor| actor.role.is_admin())
        .ok_or(AdmissionsError::Unauthorized)
}

/// Service composing the intake guard, repository, rate limiter, notifier,
/// and audit sink. Each operation is a stateless request handler; shared
/// state lives behind the injected components.
pub struct AdmissionsService<R, N> {
    guard: IntakeGuard,
    repository: Arc<R>,
    notifier: Arc<N>,
    limiter: Arc<dyn RateLimiter>,
    audit: Arc<dyn AuditSink>,
    limits: RateLimitSettings,
}

impl<R, N> AdmissionsService<R, N>
where
    R: AdmissionsRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
        limits: RateLimitSettings,
    ) -> Self {
        Self {
            guard: IntakeGuard,
            repository,
            notifier,
            limiter,
            audit,
            limits,
        }
    }

    /// Accept a public application. Side effects in order: validate, rate
    /// limit, duplicate check, persist, best-effort staff alert. No write
    /// happens if any of the checks fail.
    pub fn submit_application(
        &self,
        submission: ApplicationSubmission,
        session_user: Option<UserId>,
    ) -> Result<SubmissionReceipt, AdmissionsError> {
        let submission = self.guard.normalized(submission)?;

        let key = format!("application:{}", submission.applicant_phone);
        let decision = self.limiter.check(&key, self.limits.submission);
        if !decision.allowed {
            return Err(AdmissionsError::RateLimited {
                retry_after_seconds: decision.retry_after_seconds,
            });
        }

        if self
            .repository
            .has_open_application(&submission.applicant_phone, &submission.course_id)?
        {
            return Err(ConflictReason::DuplicateApplication.into());
        }

        let course = self
            .repository
            .fetch_course(&submission.course_id)?
            .ok_or(RepositoryError::NotFound)?;

        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            course_id: submission.course_id,
            applicant_name: submission.applicant_name,
            applicant_phone: submission.applicant_phone,
            applicant_email: submission.applicant_email,
            father_name: submission.father_name,
            mother_name: submission.mother_name,
            date_of_birth: submission.date_of_birth,
            gender: submission.gender,
            national_id: submission.national_id,
            address: submission.address,
            education: submission.education,
            experience: submission.experience,
            motivation: submission.motivation,
            status: ApplicationStatus::Pending,
            review_notes: None,
            reviewed_by: None,
            user_id: session_user,
            submitted_at: now,
            updated_at: now,
        };
        let stored = self.repository.insert_application(application)?;

        let alert = Notification::ApplicationReceived {
            applicant_name: stored.applicant_name.clone(),
            applicant_phone: stored.applicant_phone.clone(),
            course_title: course.title,
        };
        if let Err(err) = self.notifier.publish(alert) {
            warn!(error = %err, application = %stored.id.0, "staff alert dispatch failed");
        }

        Ok(SubmissionReceipt {
            application_id: stored.id,
            message: "Application received. Our admissions team will contact you after review."
                .to_string(),
        })
    }

    /// Move an application through the review state machine. Staff/admin
    /// only; records the acting reviewer and an audit event.
    pub fn update_application_status(
        &self,
        actor: Option<&Actor>,
        id: &ApplicationId,
        status: &str,
        notes: Option<String>,
    ) -> Result<(), AdmissionsError> {
        let actor = require_reviewer(actor)?;
        self.check_admin_rate(actor)?;

        let next = ApplicationStatus::parse(status).ok_or_else(|| {
            ValidationError::UnknownApplicationStatus {
                found: status.to_string(),
            }
        })?;

        let mut application = self
            .repository
            .fetch_application(id)?
            .ok_or(RepositoryError::NotFound)?;

        let previous = application.status;
        if !previous.can_transition_to(next) {
            return Err(ValidationError::InvalidStatusTransition {
                from: previous.label(),
                to: next.label(),
            }
            .into());
        }

        application.status = next;
        if notes.is_some() {
            application.review_notes = notes;
        }
        application.reviewed_by = Some(actor.id.clone());
        application.updated_at = Utc::now();
        self.repository.update_application(application)?;

        self.audit.record(AuditEvent {
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action: AuditAction::ApplicationStatusChanged,
            entity_type: "application".to_string(),
            entity_id: id.0.clone(),
            details: format!("{} -> {}", previous.label(), next.label()),
            recorded_at: Utc::now(),
        });

        Ok(())
    }

    /// Convert an accepted application into an active enrollment,
    /// provisioning a student account when none exists. Admin only.
    pub fn enroll_student(
        &self,
        actor: Option<&Actor>,
        application_id: &ApplicationId,
    ) -> Result<EnrollmentReceipt, AdmissionsError> {
        let actor = require_admin(actor)?;
        self.check_admin_rate(actor)?;

        let mut application = self
            .repository
            .fetch_application(application_id)?
            .ok_or(RepositoryError::NotFound)?;

        if application.status != ApplicationStatus::Accepted {
            return Err(ConflictReason::NotAccepted {
                id: application.id.0.clone(),
                status: application.status.label(),
            }
            .into());
        }

        let (user, created) = self.resolve_user(&application)?;

        let (stored, batch) = match self.create_enrollment(&mut application, &user) {
            Ok(outcome) => outcome,
            Err(err) => {
                // A conflict means the user already owns an enrollment, so
                // the account is not an orphan; any other failure after a
                // fresh provisioning is compensated by removing the account
                // and unlinking it so a retry starts clean.
                if created && !matches!(err, AdmissionsError::Conflict(_)) {
                    self.remove_orphaned_user(&user.id);
                    application.user_id = None;
                    application.updated_at = Utc::now();
                    if let Err(unlink_err) =
                        self.repository.update_application(application.clone())
                    {
                        error!(
                            error = %unlink_err,
                            application = %application.id.0,
                            "failed to unlink removed user from application"
                        );
                    }
                }
                return Err(err);
            }
        };

        let course_title = self
            .repository
            .fetch_course(&application.course_id)?
            .map(|course| course.title)
            .unwrap_or_else(|| application.course_id.0.clone());

        if created {
            let credentials = Notification::EnrollmentCredentials {
                recipient: user.email.clone(),
                password: user.password.clone(),
                course_title: course_title.clone(),
            };
            if let Err(err) = self.notifier.publish(credentials) {
                warn!(error = %err, user = %user.id.0, "credentials dispatch failed");
            }
        }

        let batch_note = batch
            .map(|batch| format!(" (batch {})", batch.batch_number))
            .unwrap_or_default();

        self.audit.record(AuditEvent {
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action: AuditAction::StudentEnrolled,
            entity_type: "enrollment".to_string(),
            entity_id: stored.id.0.clone(),
            details: format!(
                "user {} enrolled in course {}{}",
                user.id.0, application.course_id.0, batch_note
            ),
            recorded_at: Utc::now(),
        });

        Ok(EnrollmentReceipt {
            enrollment_id: stored.id,
            user_id: user.id,
            message: format!(
                "{} enrolled in {}{}",
                application.applicant_name, course_title, batch_note
            ),
        })
    }

    /// One page of applications for the admin desk, newest first.
    pub fn applications(
        &self,
        actor: Option<&Actor>,
        status: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<ApplicationPage, AdmissionsError> {
        require_admin(actor)?;

        let status = match status {
            Some(value) => Some(ApplicationStatus::parse(value).ok_or_else(|| {
                ValidationError::UnknownApplicationStatus {
                    found: value.to_string(),
                }
            })?),
            None => None,
        };

        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE) as usize;
        let offset = (page as usize - 1) * page_size;

        let (items, total) = self.repository.list_applications(status, offset, page_size)?;
        let pages = ((total + page_size - 1) / page_size) as u32;

        Ok(ApplicationPage {
            items,
            total,
            page,
            pages,
        })
    }

    /// All enrollments, optionally scoped to one course. Admin only.
    pub fn enrollments(
        &self,
        actor: Option<&Actor>,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Enrollment>, AdmissionsError> {
        require_admin(actor)?;
        Ok(self.repository.list_enrollments(course_id)?)
    }

    /// Update an enrollment's lifecycle status and optional progress.
    pub fn update_enrollment_status(
        &self,
        actor: Option<&Actor>,
        id: &EnrollmentId,
        status: &str,
        progress: Option<u16>,
    ) -> Result<(), AdmissionsError> {
        let actor = require_admin(actor)?;
        self.check_admin_rate(actor)?;

        let next = EnrollmentStatus::parse(status).ok_or_else(|| {
            ValidationError::UnknownEnrollmentStatus {
                found: status.to_string(),
            }
        })?;
        let progress = match progress {
            Some(value) if value > 100 => {
                return Err(ValidationError::ProgressOutOfRange { found: value }.into());
            }
            Some(value) => Some(value as u8),
            None => None,
        };

        let mut enrollment = self
            .repository
            .fetch_enrollment(id)?
            .ok_or(RepositoryError::NotFound)?;

        let previous = enrollment.status;
        enrollment.status = next;
        if let Some(progress) = progress {
            enrollment.progress = progress;
        }
        self.repository.update_enrollment(enrollment)?;

        self.audit.record(AuditEvent {
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action: AuditAction::EnrollmentUpdated,
            entity_type: "enrollment".to_string(),
            entity_id: id.0.clone(),
            details: format!("{} -> {}", previous.label(), next.label()),
            recorded_at: Utc::now(),
        });

        Ok(())
    }

    /// Steps 1b-4 of provisioning: link the user onto the application,
    /// guard against a duplicate enrollment, pick the newest open batch,
    /// and create the enrollment.
    fn create_enrollment(
        &self,
        application: &mut Application,
        user: &User,
    ) -> Result<(Enrollment, Option<Batch>), AdmissionsError> {
        if application.user_id.as_ref() != Some(&user.id) {
            application.user_id = Some(user.id.clone());
            application.updated_at = Utc::now();
            self.repository.update_application(application.clone())?;
        }

        if self
            .repository
            .enrollment_exists(&user.id, &application.course_id)?
        {
            return Err(ConflictReason::AlreadyEnrolled.into());
        }

        let batch = self.repository.latest_open_batch(&application.course_id)?;

        let enrollment = Enrollment {
            id: next_enrollment_id(),
            user_id: user.id.clone(),
            course_id: application.course_id.clone(),
            batch_id: batch.as_ref().map(|batch| batch.id.clone()),
            status: EnrollmentStatus::Enrolled,
            progress: 0,
            enrolled_at: Utc::now(),
        };

        match self.repository.insert_enrollment(enrollment) {
            Ok(stored) => Ok((stored, batch)),
            // Lost a race with a concurrent enroll; the uniqueness
            // constraint is the authoritative guard.
            Err(RepositoryError::Conflict) => Err(ConflictReason::AlreadyEnrolled.into()),
            Err(err) => Err(err.into()),
        }
    }

    fn check_admin_rate(&self, actor: &Actor) -> Result<(), AdmissionsError> {
        let key = format!("admin:{}", actor.id.0);
        let decision = self.limiter.check(&key, self.limits.admin_writes);
        if decision.allowed {
            Ok(())
        } else {
            Err(AdmissionsError::RateLimited {
                retry_after_seconds: decision.retry_after_seconds,
            })
        }
    }

    /// Reuse the linked account, then an account matching the applicant
    /// email, and only then create one. An application without an email is
    /// refused rather than inventing an address.
    fn resolve_user(&self, application: &Application) -> Result<(User, bool), AdmissionsError> {
        if let Some(user_id) = &application.user_id {
            let user = self
                .repository
                .fetch_user(user_id)?
                .ok_or(RepositoryError::NotFound)?;
            return Ok((user, false));
        }

        let email = application
            .applicant_email
            .clone()
            .filter(|email| !email.is_empty())
            .ok_or(ValidationError::MissingApplicantEmail)?;

        if let Some(existing) = self.repository.find_user_by_email(&email)? {
            return Ok((existing, false));
        }

        let user = User {
            id: next_user_id(),
            email: email.clone(),
            name: application.applicant_name.clone(),
            phone: application.applicant_phone.clone(),
            role: Role::Student,
            gender: application.gender.clone(),
            date_of_birth: application.date_of_birth,
            national_id: application.national_id.clone(),
            address: application.address.clone(),
            guardian_name: application
                .father_name
                .clone()
                .or_else(|| application.mother_name.clone()),
            password: generate_password(),
        };

        match self.repository.insert_user(user) {
            Ok(user) => Ok((user, true)),
            // Another request provisioned the same email concurrently.
            Err(RepositoryError::Conflict) => {
                let user = self
                    .repository
                    .find_user_by_email(&email)?
                    .ok_or(RepositoryError::Conflict)?;
                Ok((user, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remove_orphaned_user(&self, user_id: &UserId) {
        if let Err(err) = self.repository.remove_user(user_id) {
            error!(
                error = %err,
                user = %user_id.0,
                "failed to remove provisioned user after enrollment failure"
            );
        }
    }
}
