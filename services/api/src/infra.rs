use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use admissions::workflows::admissions::{
    AdmissionsRepository, Application, ApplicationId, ApplicationStatus, Batch, BatchId,
    BatchStatus, Course, CourseId, Enrollment, EnrollmentId, Notification, NotificationError,
    NotificationPublisher, RepositoryError, User, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    applications: HashMap<ApplicationId, Application>,
    users: HashMap<UserId, User>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    courses: HashMap<CourseId, Course>,
    batches: Vec<Batch>,
}

/// Process-local store backing the service until the real database adapter
/// is wired in. Uniqueness of user email and of (user, course) enrollments
/// is enforced here, matching the database constraints it stands in for.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAdmissionsRepository {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryAdmissionsRepository {
    pub(crate) fn insert_course(&self, course: Course) {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.courses.insert(course.id.clone(), course);
    }

    pub(crate) fn insert_batch(&self, batch: Batch) {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        state.batches.push(batch);
    }

    pub(crate) fn users(&self) -> Vec<User> {
        let state = self.state.lock().expect("repository mutex poisoned");
        state.users.values().cloned().collect()
    }
}

impl AdmissionsRepository for InMemoryAdmissionsRepository {
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
        Ok((matches.into_iter().skip(offset).take(limit).collect(), total))
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

/// Mail transport stand-in: renders the message and logs it. The real SMTP
/// adapter replaces this behind the same trait.
pub(crate) struct EmailLogTransport;

impl NotificationPublisher for EmailLogTransport {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            subject = notification.subject(),
            body = %notification.body(),
            "outbound email"
        );
        Ok(())
    }
}

/// In-memory transport for the CLI demo so dispatched messages can be
/// printed at the end of the walkthrough.
#[derive(Default, Clone)]
pub(crate) struct RecordingTransport {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingTransport {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for RecordingTransport {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Seed the catalog the demo and a fresh serve instance run against.
pub(crate) fn seed_demo_catalog(repository: &InMemoryAdmissionsRepository) {
    let web = Course {
        id: CourseId("c1".to_string()),
        title: "Professional Web Development".to_string(),
    };
    let design = Course {
        id: CourseId("c2".to_string()),
        title: "Graphics Design".to_string(),
    };
    repository.insert_course(web.clone());
    repository.insert_course(design.clone());

    repository.insert_batch(Batch {
        id: BatchId("c1-b2".to_string()),
        course_id: web.id.clone(),
        batch_number: 2,
        capacity: 30,
        status: BatchStatus::Completed,
    });
    repository.insert_batch(Batch {
        id: BatchId("c1-b3".to_string()),
        course_id: web.id,
        batch_number: 3,
        capacity: 30,
        status: BatchStatus::Upcoming,
    });
    repository.insert_batch(Batch {
        id: BatchId("c2-b1".to_string()),
        course_id: design.id,
        batch_number: 1,
        capacity: 25,
        status: BatchStatus::Ongoing,
    });
}
