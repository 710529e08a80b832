use crate::infra::{seed_demo_catalog, InMemoryAdmissionsRepository, RecordingTransport};
use admissions::error::AppError;
use admissions::workflows::admissions::{
    Actor, AdmissionsService, ApplicationSubmission, CourseId, InMemoryAuditSink,
    InMemoryRateLimiter, Notification, RateLimitSettings, Role, UserId,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Phone number for the sample applicant
    #[arg(long, default_value = "01712345678")]
    pub(crate) phone: String,
    /// Email address for the sample applicant
    #[arg(long, default_value = "asha@example.com")]
    pub(crate) email: String,
    /// Course the sample applicant applies to
    #[arg(long, default_value = "c1")]
    pub(crate) course: String,
    /// Stop after the review decision, before enrollment
    #[arg(long)]
    pub(crate) skip_enrollment: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryAdmissionsRepository::default());
    seed_demo_catalog(&repository);
    let notifier = Arc::new(RecordingTransport::default());
    let audit = Arc::new(InMemoryAuditSink::new());
    let service = AdmissionsService::new(
        repository.clone(),
        notifier.clone(),
        Arc::new(InMemoryRateLimiter::new()),
        audit.clone(),
        RateLimitSettings::default(),
    );

    let reviewer = Actor {
        id: UserId("admin-demo".to_string()),
        name: "Demo Admin".to_string(),
        role: Role::Admin,
    };

    println!("Admission workflow demo");

    let submission = ApplicationSubmission {
        course_id: CourseId(args.course),
        applicant_name: "Asha Rahman".to_string(),
        applicant_phone: args.phone,
        applicant_email: Some(args.email),
        father_name: Some("Kamal Rahman".to_string()),
        mother_name: Some("Nasima Rahman".to_string()),
        date_of_birth: None,
        gender: Some("female".to_string()),
        national_id: None,
        address: Some("Dhanmondi, Dhaka".to_string()),
        education: Some("HSC, Dhaka College".to_string()),
        experience: None,
        motivation: Some("Switching from customer support to development".to_string()),
    };

    let receipt = service.submit_application(submission, None)?;
    println!(
        "- Received application {} -> PENDING",
        receipt.application_id.0
    );
    println!("  {}", receipt.message);

    service.update_application_status(
        Some(&reviewer),
        &receipt.application_id,
        "UNDER_REVIEW",
        Some("phone screening done".to_string()),
    )?;
    println!("- Moved to UNDER_REVIEW");

    service.update_application_status(
        Some(&reviewer),
        &receipt.application_id,
        "ACCEPTED",
        Some("strong motivation, seat available".to_string()),
    )?;
    println!("- Moved to ACCEPTED");

    if args.skip_enrollment {
        println!("- Enrollment skipped");
        return Ok(());
    }

    let enrolled = service.enroll_student(Some(&reviewer), &receipt.application_id)?;
    println!("- Enrollment {} created", enrolled.enrollment_id.0);
    println!("  {}", enrolled.message);

    for user in repository.users() {
        println!(
            "  Provisioned account: {} ({}) role {}",
            user.id.0,
            user.email,
            user.role.label()
        );
    }

    let events = notifier.events();
    if events.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications dispatched");
        for event in &events {
            match event {
                Notification::ApplicationReceived {
                    applicant_phone, ..
                } => {
                    println!("- {} (staff alert, phone {})", event.subject(), applicant_phone)
                }
                Notification::EnrollmentCredentials { recipient, .. } => {
                    println!("- {} -> {} (password redacted)", event.subject(), recipient)
                }
            }
        }
    }

    let trail = audit.events();
    println!("\nAudit trail");
    for event in trail {
        println!(
            "- [{}] {} {}: {} (by {})",
            event.action.label(),
            event.entity_type,
            event.entity_id,
            event.details,
            event.actor_name
        );
    }

    Ok(())
}
