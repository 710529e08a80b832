use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for catalog courses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

/// Identifier wrapper for course batches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

/// Identifier wrapper for user accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for enrollments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub String);

/// Public intake payload. Only the course, the applicant name, and the phone
/// number are required; everything else is optional free text collected for
/// the review desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub course_id: CourseId,
    pub applicant_name: String,
    pub applicant_phone: String,
    #[serde(default)]
    pub applicant_email: Option<String>,
    #[serde(default)]
    pub father_name: Option<String>,
    #[serde(default)]
    pub mother_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
}

/// Persisted application record. Mutated only by the review workflow
/// (status, notes, reviewer) and once by the provisioner (user link).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub course_id: CourseId,
    pub applicant_name: String,
    pub applicant_phone: String,
    pub applicant_email: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub education: Option<String>,
    pub experience: Option<String>,
    pub motivation: Option<String>,
    pub status: ApplicationStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub user_id: Option<UserId>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review status tracked throughout the admission workflow. Labels are the
/// wire values and round-trip unchanged through persistence and the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    InterviewScheduled,
    Accepted,
    Rejected,
    Waitlisted,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Waitlisted => "WAITLISTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(ApplicationStatus::Pending),
            "UNDER_REVIEW" => Some(ApplicationStatus::UnderReview),
            "INTERVIEW_SCHEDULED" => Some(ApplicationStatus::InterviewScheduled),
            "ACCEPTED" => Some(ApplicationStatus::Accepted),
            "REJECTED" => Some(ApplicationStatus::Rejected),
            "WAITLISTED" => Some(ApplicationStatus::Waitlisted),
            _ => None,
        }
    }

    /// Statuses that represent a final review decision.
    pub const fn is_decided(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Waitlisted
        )
    }

    /// Statuses that block a fresh submission for the same phone + course.
    /// A REJECTED or WAITLISTED history does not prevent reapplying.
    pub const fn blocks_resubmission(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Pending
                | ApplicationStatus::UnderReview
                | ApplicationStatus::Accepted
        )
    }

    /// Transition table for the review operation. Same-status assignment is
    /// allowed (refreshes notes and reviewer), and INTERVIEW_SCHEDULED is
    /// settable from any state, matching the unguarded source behavior.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        if self == next || next == ApplicationStatus::InterviewScheduled {
            return true;
        }
        match self {
            ApplicationStatus::Pending => matches!(
                next,
                ApplicationStatus::UnderReview
                    | ApplicationStatus::Accepted
                    | ApplicationStatus::Rejected
                    | ApplicationStatus::Waitlisted
            ),
            ApplicationStatus::UnderReview | ApplicationStatus::InterviewScheduled => matches!(
                next,
                ApplicationStatus::UnderReview
                    | ApplicationStatus::Accepted
                    | ApplicationStatus::Rejected
                    | ApplicationStatus::Waitlisted
            ),
            ApplicationStatus::Accepted
            | ApplicationStatus::Rejected
            | ApplicationStatus::Waitlisted => false,
        }
    }
}

/// Catalog course snapshot used for receipts and notification titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
}

/// Scheduled intake cycle for a course. The batch number is unique within
/// its course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub course_id: CourseId,
    pub batch_number: u32,
    pub capacity: u32,
    pub status: BatchStatus,
}

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl BatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BatchStatus::Upcoming => "UPCOMING",
            BatchStatus::Ongoing => "ONGOING",
            BatchStatus::Completed => "COMPLETED",
        }
    }

    /// Batches still accepting enrollments.
    pub const fn is_open(self) -> bool {
        matches!(self, BatchStatus::Upcoming | BatchStatus::Ongoing)
    }
}

/// Account record. Created lazily by the provisioner when an accepted
/// applicant has no account yet; unique by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub guardian_name: Option<String>,
    pub password: String,
}

/// Caller roles recognized by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Staff => "STAFF",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STUDENT" => Some(Role::Student),
            "STAFF" => Some(Role::Staff),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub const fn can_review(self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Authenticated caller identity supplied by the surrounding transport
/// layer. Session mechanics are not this crate's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

/// Confirmed student-to-course relationship, optionally scoped to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub batch_id: Option<BatchId>,
    pub status: EnrollmentStatus,
    pub progress: u8,
    pub enrolled_at: DateTime<Utc>,
}

/// Enrollment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Enrolled,
    InProgress,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "ENROLLED",
            EnrollmentStatus::InProgress => "IN_PROGRESS",
            EnrollmentStatus::Completed => "COMPLETED",
            EnrollmentStatus::Dropped => "DROPPED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ENROLLED" => Some(EnrollmentStatus::Enrolled),
            "IN_PROGRESS" => Some(EnrollmentStatus::InProgress),
            "COMPLETED" => Some(EnrollmentStatus::Completed),
            "DROPPED" => Some(EnrollmentStatus::Dropped),
            _ => None,
        }
    }
}

/// One page of the admin application listing.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPage {
    pub items: Vec<Application>,
    pub total: usize,
    pub page: u32,
    pub pages: u32,
}
