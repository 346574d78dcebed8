//! Project lifecycle and eligibility rules.
//!
//! Everything here is pure: callers load records, ask these functions what
//! should change, and hand the answer to the repository. `status` and
//! `payment_status` move independently and every move is currently allowed;
//! [`apply_transition`] is the single place to add a guard.

use validator::Validate;

use crate::domain::{
    NewProject, PaymentEvidence, PaymentStatus, Project, ProjectChanges, ProjectStatus,
    SubmitProjectRequest, User, MAX_BUDGET, MIN_BUDGET,
};
use crate::error::{AppError, Result};

/// Budget suggested when the estimator cannot produce a usable number.
pub const FALLBACK_BUDGET: f64 = 25.0;

/// The free trial is a one-time, per-account incentive.
pub fn is_eligible_for_free_trial(prior_projects: i64) -> bool {
    prior_projects == 0
}

/// Clamp an untrusted budget suggestion into the paid range. Missing, zero,
/// or non-finite values become [`FALLBACK_BUDGET`].
pub fn clamp_suggested_budget(raw: Option<f64>) -> f64 {
    match raw {
        Some(value) if value.is_finite() && value != 0.0 => value.clamp(MIN_BUDGET, MAX_BUDGET),
        _ => FALLBACK_BUDGET,
    }
}

/// Validate a request form and decide the record to create.
///
/// `prior_projects` is the number of projects the requester already has; it
/// is read fresh on every submission and decides the trial.
pub fn plan_new_project(
    requester: &User,
    mut request: SubmitProjectRequest,
    prior_projects: i64,
) -> Result<NewProject> {
    // A blank contact field means "use my account email"
    request.contact_email = request
        .contact_email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    request.description = request.description.trim().to_string();

    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Project title is required".to_string()));
    }
    request.validate()?;

    let is_free_trial = is_eligible_for_free_trial(prior_projects);
    let (budget, payment_status) = if is_free_trial {
        (0.0, PaymentStatus::Paid)
    } else {
        let budget = request
            .budget
            .ok_or_else(|| AppError::Validation("Budget is required".to_string()))?;
        if !budget.is_finite() || !(MIN_BUDGET..=MAX_BUDGET).contains(&budget) {
            return Err(AppError::Validation(format!(
                "Budget must be between ${} and ${}",
                MIN_BUDGET, MAX_BUDGET
            )));
        }
        (budget, PaymentStatus::Unpaid)
    };

    let contact_email = request
        .contact_email
        .unwrap_or_else(|| requester.email.clone());

    Ok(NewProject {
        user_id: requester.id,
        user_email: requester.email.clone(),
        user_name: Some(requester.name.clone()),
        contact_email: Some(contact_email),
        title: title.to_string(),
        description: request.description,
        budget,
        status: ProjectStatus::Pending,
        payment_status,
        is_free_trial,
        tech_stack: Vec::new(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Admin moves the delivery status.
    SetStatus(ProjectStatus),
    /// Client attaches proof of a manual transfer.
    SubmitEvidence(PaymentEvidence),
    /// Admin decision on submitted evidence.
    VerifyPayment { approved: bool },
}

/// Decide the changes a transition makes to `project`.
///
/// Rejecting a payment returns it to UNPAID but leaves the sender name and
/// transaction id on the record.
pub fn apply_transition(project: &Project, transition: Transition) -> Result<ProjectChanges> {
    let changes = match transition {
        Transition::SetStatus(status) => ProjectChanges {
            status: Some(status),
            ..Default::default()
        },
        Transition::SubmitEvidence(evidence) => {
            evidence.validate()?;
            if evidence.sender_name.trim().is_empty() || evidence.transaction_id.trim().is_empty() {
                return Err(AppError::Validation(
                    "Please provide sender name and transaction ID".to_string(),
                ));
            }
            ProjectChanges {
                payment_status: Some(PaymentStatus::PendingVerification),
                evidence: Some(evidence),
                ..Default::default()
            }
        }
        Transition::VerifyPayment { approved } => ProjectChanges {
            payment_status: Some(if approved {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            }),
            ..Default::default()
        },
    };

    tracing::debug!(
        project_id = %project.id,
        status = project.status.as_str(),
        payment_status = project.payment_status.as_str(),
        ?changes,
        "Applying project transition"
    );

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentMethod, Role};
    use chrono::Utc;
    use uuid::Uuid;

    fn client() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "a".to_string(),
            avatar: None,
            role: Role::Client,
            email_verified: true,
        }
    }

    fn request(description: &str, budget: Option<f64>) -> SubmitProjectRequest {
        SubmitProjectRequest {
            title: "Landing page".to_string(),
            description: description.to_string(),
            contact_email: None,
            budget,
        }
    }

    fn project() -> Project {
        Project {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_email: "a@x.com".to_string(),
            user_name: None,
            contact_email: None,
            title: "t".to_string(),
            description: "a description that is long enough".to_string(),
            budget: 50.0,
            status: ProjectStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            is_free_trial: false,
            tech_stack: vec![],
            payment_method: None,
            sender_name: None,
            transaction_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const DESCRIPTION: &str = "A marketing site with a contact form";

    #[test]
    fn eligibility_is_exactly_zero_prior_projects() {
        assert!(is_eligible_for_free_trial(0));
        assert!(!is_eligible_for_free_trial(1));
        assert!(!is_eligible_for_free_trial(7));
    }

    #[test]
    fn first_project_is_a_paid_free_trial() {
        let planned = plan_new_project(&client(), request(DESCRIPTION, Some(80.0)), 0).unwrap();
        assert!(planned.is_free_trial);
        assert_eq!(planned.budget, 0.0);
        assert_eq!(planned.payment_status, PaymentStatus::Paid);
        assert_eq!(planned.status, ProjectStatus::Pending);
        assert_eq!(planned.contact_email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn later_projects_are_unpaid_with_client_budget() {
        let planned = plan_new_project(&client(), request(DESCRIPTION, Some(42.0)), 3).unwrap();
        assert!(!planned.is_free_trial);
        assert_eq!(planned.budget, 42.0);
        assert_eq!(planned.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn description_of_nineteen_chars_is_rejected() {
        let err = plan_new_project(&client(), request("nineteen characters", Some(50.0)), 0)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn padding_does_not_count_towards_the_description() {
        let padded = format!("{}short brief{}", " ".repeat(10), " ".repeat(10));
        assert!(matches!(
            plan_new_project(&client(), request(&padded, Some(50.0)), 1),
            Err(AppError::Validation(_))
        ));

        let planned = plan_new_project(&client(), request(&format!("  {}  ", DESCRIPTION), Some(50.0)), 1)
            .unwrap();
        assert_eq!(planned.description, DESCRIPTION);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut req = request(DESCRIPTION, Some(50.0));
        req.title = "   ".to_string();
        assert!(matches!(
            plan_new_project(&client(), req, 1),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn paid_budget_must_be_in_range() {
        for budget in [Some(9.99), Some(100.5), Some(f64::NAN), None] {
            assert!(plan_new_project(&client(), request(DESCRIPTION, budget), 1).is_err());
        }
        assert!(plan_new_project(&client(), request(DESCRIPTION, Some(10.0)), 1).is_ok());
        assert!(plan_new_project(&client(), request(DESCRIPTION, Some(100.0)), 1).is_ok());
    }

    #[test]
    fn trial_ignores_out_of_range_budget() {
        assert!(plan_new_project(&client(), request(DESCRIPTION, Some(5000.0)), 0).is_ok());
    }

    #[test]
    fn suggestion_is_clamped_or_falls_back() {
        assert_eq!(clamp_suggested_budget(Some(3.0)), 10.0);
        assert_eq!(clamp_suggested_budget(Some(250.0)), 100.0);
        assert_eq!(clamp_suggested_budget(Some(37.5)), 37.5);
        assert_eq!(clamp_suggested_budget(Some(0.0)), 25.0);
        assert_eq!(clamp_suggested_budget(Some(f64::INFINITY)), 25.0);
        assert_eq!(clamp_suggested_budget(None), 25.0);
    }

    #[test]
    fn evidence_moves_payment_to_pending_verification() {
        let evidence = PaymentEvidence {
            payment_method: PaymentMethod::Jazzcash,
            sender_name: "Ali".to_string(),
            transaction_id: "TID-1".to_string(),
        };
        let changes =
            apply_transition(&project(), Transition::SubmitEvidence(evidence.clone())).unwrap();
        assert_eq!(changes.payment_status, Some(PaymentStatus::PendingVerification));
        assert_eq!(changes.evidence, Some(evidence));
        assert_eq!(changes.status, None);
    }

    #[test]
    fn blank_evidence_is_rejected() {
        let evidence = PaymentEvidence {
            payment_method: PaymentMethod::Bank,
            sender_name: "  ".to_string(),
            transaction_id: "TID-1".to_string(),
        };
        assert!(apply_transition(&project(), Transition::SubmitEvidence(evidence)).is_err());
    }

    #[test]
    fn verification_never_touches_status() {
        let approve = apply_transition(&project(), Transition::VerifyPayment { approved: true })
            .unwrap();
        assert_eq!(approve.payment_status, Some(PaymentStatus::Paid));
        assert_eq!(approve.status, None);
        assert_eq!(approve.evidence, None);

        let reject = apply_transition(&project(), Transition::VerifyPayment { approved: false })
            .unwrap();
        assert_eq!(reject.payment_status, Some(PaymentStatus::Unpaid));
        assert_eq!(reject.evidence, None);
    }

    #[test]
    fn any_status_is_reachable_from_any_status() {
        let all = [
            ProjectStatus::Pending,
            ProjectStatus::Scoping,
            ProjectStatus::InProgress,
            ProjectStatus::Completed,
            ProjectStatus::Cancelled,
        ];
        for from in all {
            let mut p = project();
            p.status = from;
            for to in all {
                let changes = apply_transition(&p, Transition::SetStatus(to)).unwrap();
                assert_eq!(changes.status, Some(to));
                assert_eq!(changes.payment_status, None);
            }
        }
    }
}
