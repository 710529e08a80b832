use super::domain::{
    Application, ApplicationId, ApplicationStatus, Batch, Course, CourseId, Enrollment,
    EnrollmentId, User, UserId,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction so the workflow can be exercised in isolation. The
/// application-level duplicate checks are early exits; uniqueness of user
/// email and of (user, course) enrollments is enforced here and is the
/// authoritative guard under concurrency.
pub trait AdmissionsRepository: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    /// Whether an application blocking resubmission exists for this
    /// phone + course pair.
    fn has_open_application(
        &self,
        phone: &str,
        course_id: &CourseId,
    ) -> Result<bool, RepositoryError>;
    /// Newest-first page of applications, optionally filtered by status.
    /// Returns the page items and the total match count.
    fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Application>, usize), RepositoryError>;

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError>;
    /// The open batch with the highest number for a course, if any.
    fn latest_open_batch(&self, course_id: &CourseId) -> Result<Option<Batch>, RepositoryError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    /// Rejects a duplicate email with `Conflict`.
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    /// Compensation hook for the provisioner; not part of the public
    /// workflow surface.
    fn remove_user(&self, id: &UserId) -> Result<(), RepositoryError>;

    /// Rejects a second enrollment for the same (user, course) with
    /// `Conflict`, regardless of batch.
    fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError>;
    fn enrollment_exists(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<bool, RepositoryError>;
    fn fetch_enrollment(
        &self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, RepositoryError>;
    fn update_enrollment(&self, enrollment: Enrollment) -> Result<(), RepositoryError>;
    fn list_enrollments(
        &self,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Enrollment>, RepositoryError>;
}
