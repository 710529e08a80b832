use super::domain::ApplicationSubmission;

/// Field-level validation errors raised before a submission reaches the
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("applicant name must not be empty")]
    MissingName,
    #[error("course reference must not be empty")]
    MissingCourse,
    #[error("phone must be a valid mobile number (11 digits starting 01)")]
    InvalidPhone { found: String },
    #[error("email address '{found}' is malformed")]
    InvalidEmail { found: String },
    #[error("unrecognized application status '{found}'")]
    UnknownApplicationStatus { found: String },
    #[error("unrecognized enrollment status '{found}'")]
    UnknownEnrollmentStatus { found: String },
    #[error("cannot move application from {from} to {to}")]
    InvalidStatusTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("progress must be between 0 and 100, got {found}")]
    ProgressOutOfRange { found: u16 },
    #[error("application has no email address; create the student account manually before enrolling")]
    MissingApplicantEmail,
}

impl ValidationError {
    /// The submission field the error refers to, for field-level API payloads.
    pub const fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingName => "applicant_name",
            ValidationError::MissingCourse => "course_id",
            ValidationError::InvalidPhone { .. } => "applicant_phone",
            ValidationError::InvalidEmail { .. }
            | ValidationError::MissingApplicantEmail => "applicant_email",
            ValidationError::UnknownApplicationStatus { .. }
            | ValidationError::UnknownEnrollmentStatus { .. }
            | ValidationError::InvalidStatusTransition { .. } => "status",
            ValidationError::ProgressOutOfRange { .. } => "progress",
        }
    }
}

/// Guard that normalizes and validates public submissions. Nothing is
/// persisted while a submission is still inside the guard.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    /// Trim and validate a submission, returning the normalized payload.
    pub fn normalized(
        &self,
        mut submission: ApplicationSubmission,
    ) -> Result<ApplicationSubmission, ValidationError> {
        submission.course_id.0 = submission.course_id.0.trim().to_string();
        if submission.course_id.0.is_empty() {
            return Err(ValidationError::MissingCourse);
        }

        submission.applicant_name = submission.applicant_name.trim().to_string();
        if submission.applicant_name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        submission.applicant_phone = submission.applicant_phone.trim().to_string();
        if !is_valid_mobile(&submission.applicant_phone) {
            return Err(ValidationError::InvalidPhone {
                found: submission.applicant_phone,
            });
        }

        submission.applicant_email = normalize_optional(submission.applicant_email);
        if let Some(email) = &submission.applicant_email {
            let email = email.to_ascii_lowercase();
            if !is_valid_email(&email) {
                return Err(ValidationError::InvalidEmail { found: email });
            }
            submission.applicant_email = Some(email);
        }

        submission.father_name = normalize_optional(submission.father_name);
        submission.mother_name = normalize_optional(submission.mother_name);
        submission.gender = normalize_optional(submission.gender);
        submission.national_id = normalize_optional(submission.national_id);
        submission.address = normalize_optional(submission.address);
        submission.education = normalize_optional(submission.education);
        submission.experience = normalize_optional(submission.experience);
        submission.motivation = normalize_optional(submission.motivation);

        Ok(submission)
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// National mobile shape: 11 digits, `01` prefix, operator digit 3-9.
pub fn is_valid_mobile(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 11
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'0'
        && bytes[1] == b'1'
        && (b'3'..=b'9').contains(&bytes[2])
}

/// Minimal well-formedness check: one `@`, non-empty local part, and a
/// dotted domain. Deliverability is the mail transport's problem.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let Some(domain) = parts.next() else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
