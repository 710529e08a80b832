use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::workflows::admissions::audit::InMemoryAuditSink;
use crate::workflows::admissions::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, ApplicationSubmission, Batch, BatchId,
    BatchStatus, Course, CourseId, Enrollment, EnrollmentId, Role, User, UserId,
};
use crate::workflows::admissions::notify::{
    Notification, NotificationError, NotificationPublisher,
};
use crate::workflows::admissions::rate_limit::InMemoryRateLimiter;
use crate::workflows::admissions::repository::{AdmissionsRepository, RepositoryError};
use crate::workflows::admissions::service::{AdmissionsService, RateLimitSettings};

pub(super) fn course() -> Course {
    Course {
        id: CourseId("c1".to_string()),
        title: "Professional Web Development".to_string(),
    }
}

pub(super) fn batch(number: u32, status: BatchStatus) -> Batch {
    Batch {
        id: BatchId(format!("b-{number}")),
        course_id: course().id,
        batch_number: number,
        capacity: 30,
        status,
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        course_id: course().id,
        applicant_name: "Asha Rahman".to_string(),
        applicant_phone: "01712345678".to_string(),
        applicant_email: Some("asha@example.com".to_string()),
        father_name: Some("Kamal Rahman".to_string()),
        mother_name: Some("Nasima Rahman".to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(2002, 4, 17),
        gender: Some("female".to_string()),
        national_id: Some("1994537218".to_string()),
        address: Some("House 12, Road 3, Dhanmondi, Dhaka".to_string()),
        education: Some("HSC, Dhaka College".to_string()),
        experience: None,
        motivation: Some("Switching from customer support to development".to_string()),
    }
}

pub(super) fn admin() -> Actor {
    Actor {
        id: UserId("admin-1".to_string()),
        name: "Mahbub Alam".to_string(),
        role: Role::Admin,
    }
}

pub(super) fn staff() -> Actor {
    Actor {
        id: UserId("staff-1".to_string()),
        name: "Farhana Yesmin".to_string(),
        role: Role::Staff,
    }
}

pub(super) fn student() -> Actor {
    Actor {
        id: UserId("student-1".to_string()),
        name: "Rafiq Islam".to_string(),
        role: Role::Student,
    }
}

pub(super) type TestService = AdmissionsService<MemoryRepository, MemoryNotifier>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
    Arc<InMemoryAuditSink>,
) {
    build_service_with_limits(RateLimitSettings::default())
}

pub(super) fn build_service_with_limits(
    limits: RateLimitSettings,
) -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
    Arc<InMemoryAuditSink>,
) {
    let repository = Arc::new(MemoryRepository::default());
    repository.seed_course(course());
    let notifier = Arc::new(MemoryNotifier::default());
    let audit = Arc::new(InMemoryAuditSink::new());
    let service = AdmissionsService::new(
        repository.clone(),
        notifier.clone(),
        Arc::new(InMemoryRateLimiter::new()),
        audit.clone(),
        limits,
    );
    (service, repository, notifier, audit)
}

/// Submit the default application and walk it to ACCEPTED.
pub(super) fn accepted_application(service: &TestService) -> ApplicationId {
    let receipt = service
        .submit_application(submission(), None)
        .expect("submission succeeds");
    service
        .update_application_status(
            Some(&admin()),
            &receipt.application_id,
            "UNDER_REVIEW",
            None,
        )
        .expect("move to under review");
    service
        .update_application_status(Some(&admin()), &receipt.application_id, "ACCEPTED", None)
        .expect("accept application");
    receipt.application_id
}

#[derive(Default)]
struct MemoryState {
    applications: HashMap<ApplicationId, Application>,
    users: HashMap<UserId, User>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    courses: HashMap<CourseId, Course>,
    batches: Vec<Batch>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub(super) fn seed_course(&self, course: Course) {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.courses.insert(course.id.clone(), course);
    }

    pub(super) fn seed_batch(&self, batch: Batch) {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.batches.push(batch);
    }

    pub(super) fn application(&self, id: &ApplicationId) -> Option<Application> {
        let state = self.state.lock().expect("repository mutex poisoned");
        state.applications.get(id).cloned()
    }

    pub(super) fn user_by_email(&self, email: &str) -> Option<User> {
        let state = self.state.lock().expect("repository mutex poisoned");
        state.users.values().find(|user| user.email == email).cloned()
    }

    pub(super) fn user_count(&self) -> usize {
        self.state
            .lock()
            .expect("repository mutex poisoned")
            .users
            .len()
    }

    pub(super) fn enrollment_count(&self) -> usize {
        self.state
            .lock()
            .expect("repository mutex poisoned")
            .enrollments
            .len()
    }
}

impl AdmissionsRepository for MemoryRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.applications.get(id).cloned())
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if !state.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        state
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn has_open_application(
        &self,
        phone: &str,
        course_id: &CourseId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.applications.values().any(|application| {
            application.applicant_phone == phone
                && &application.course_id == course_id
                && application.status.blocks_resubmission()
        }))
    }

    fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Application>, usize), RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let mut matches: Vec<Application> = state
            .applications
            .values()
            .filter(|application| status.map_or(true, |status| application.status == status))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| b.id.0.cmp(&a.id.0))
        });
        let total = matches.len();
        let items = matches.into_iter().skip(offset).take(limit).collect();
        Ok((items, total))
    }

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.courses.get(id).cloned())
    }

    fn latest_open_batch(&self, course_id: &CourseId) -> Result<Option<Batch>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .batches
            .iter()
            .filter(|batch| &batch.course_id == course_id && batch.status.is_open())
            .max_by_key(|batch| batch.batch_number)
            .cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.users.get(id).cloned())
    }

    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn remove_user(&self, id: &UserId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state
            .users
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.enrollments.values().any(|existing| {
            existing.user_id == enrollment.user_id && existing.course_id == enrollment.course_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        state
            .enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    fn enrollment_exists(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.enrollments.values().any(|enrollment| {
            &enrollment.user_id == user_id && &enrollment.course_id == course_id
        }))
    }

    fn fetch_enrollment(
        &self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.enrollments.get(id).cloned())
    }

    fn update_enrollment(&self, enrollment: Enrollment) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if !state.enrollments.contains_key(&enrollment.id) {
            return Err(RepositoryError::NotFound);
        }
        state.enrollments.insert(enrollment.id.clone(), enrollment);
        Ok(())
    }

    fn list_enrollments(
        &self,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Enrollment>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let mut items: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|enrollment| course_id.map_or(true, |course| &enrollment.course_id == course))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(items)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Transport double whose every delivery fails.
pub(super) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

/// Delegating repository whose enrollment insert always fails, for
/// exercising the provisioner's compensation path.
pub(super) struct BrokenEnrollmentRepository {
    pub(super) inner: MemoryRepository,
}

impl AdmissionsRepository for BrokenEnrollmentRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.inner.update_application(application)
    }

    fn has_open_application(
        &self,
        phone: &str,
        course_id: &CourseId,
    ) -> Result<bool, RepositoryError> {
        self.inner.has_open_application(phone, course_id)
    }

    fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Application>, usize), RepositoryError> {
        self.inner.list_applications(status, offset, limit)
    }

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        self.inner.fetch_course(id)
    }

    fn latest_open_batch(&self, course_id: &CourseId) -> Result<Option<Batch>, RepositoryError> {
        self.inner.latest_open_batch(course_id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.inner.find_user_by_email(email)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch_user(id)
    }

    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert_user(user)
    }

    fn remove_user(&self, id: &UserId) -> Result<(), RepositoryError> {
        self.inner.remove_user(id)
    }

    fn insert_enrollment(&self, _enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        Err(RepositoryError::Unavailable("enrollment store offline".to_string()))
    }

    fn enrollment_exists(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<bool, RepositoryError> {
        self.inner.enrollment_exists(user_id, course_id)
    }

    fn fetch_enrollment(
        &self,
        id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        self.inner.fetch_enrollment(id)
    }

    fn update_enrollment(&self, enrollment: Enrollment) -> Result<(), RepositoryError> {
        self.inner.update_enrollment(enrollment)
    }

    fn list_enrollments(
        &self,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Enrollment>, RepositoryError> {
        self.inner.list_enrollments(course_id)
    }
}
