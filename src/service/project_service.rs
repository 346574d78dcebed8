use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        lifecycle::{self, Transition},
        PaymentEvidence, PaymentStatus, Project, ProjectStatus, SubmitProjectRequest, User,
        MIN_DESCRIPTION_CHARS,
    },
    error::{AppError, Result},
    integrations::{suggest_budget, BudgetEstimator, BudgetSuggestion},
    repository::ProjectRepository,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub is_free_trial_eligible: bool,
    pub prior_projects: i64,
}

pub struct ProjectService {
    repo: Arc<dyn ProjectRepository>,
    estimator: Arc<dyn BudgetEstimator>,
}

impl ProjectService {
    pub fn new(repo: Arc<dyn ProjectRepository>, estimator: Arc<dyn BudgetEstimator>) -> Self {
        Self { repo, estimator }
    }

    pub async fn eligibility(&self, user: &User) -> Result<Eligibility> {
        let prior_projects = self.repo.count_by_owner(user.id).await?;
        Ok(Eligibility {
            is_free_trial_eligible: lifecycle::is_eligible_for_free_trial(prior_projects),
            prior_projects,
        })
    }

    /// Validate and create a request. Eligibility is recomputed here; whatever
    /// the form was showing does not matter.
    pub async fn submit(&self, user: &User, request: SubmitProjectRequest) -> Result<Project> {
        let prior_projects = self.repo.count_by_owner(user.id).await?;
        let new_project = lifecycle::plan_new_project(user, request.clone(), prior_projects)?;
        let claimed_trial = new_project.is_free_trial;

        let project = match self.repo.create(new_project).await {
            // A concurrent submission took the trial first; this one is paid
            Err(AppError::Conflict(_)) if claimed_trial => {
                tracing::info!(user = %user.email, "Free trial already claimed, planning a paid request");
                let prior_projects = self.repo.count_by_owner(user.id).await?.max(1);
                let paid = lifecycle::plan_new_project(user, request, prior_projects)?;
                self.repo.create(paid).await?
            }
            other => other?,
        };
        tracing::info!(
            project_id = %project.id,
            user = %user.email,
            free_trial = project.is_free_trial,
            "Project request submitted"
        );
        Ok(project)
    }

    pub async fn estimate_budget(&self, description: &str) -> Result<BudgetSuggestion> {
        if description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "Describe the project in at least {} characters to get an estimate",
                MIN_DESCRIPTION_CHARS
            )));
        }
        Ok(suggest_budget(self.estimator.as_ref(), description).await)
    }

    /// Owners see their own projects; admins see everything.
    pub async fn get_for(&self, user: &User, id: Uuid) -> Result<Project> {
        let project = self.find(id).await?;
        if project.user_id != user.id && !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(project)
    }

    pub async fn list_own(&self, user: &User) -> Result<Vec<Project>> {
        self.repo.list_by_owner(user.id).await
    }

    pub async fn submit_payment(
        &self,
        user: &User,
        id: Uuid,
        evidence: PaymentEvidence,
    ) -> Result<Project> {
        let project = self.find(id).await?;
        if project.user_id != user.id {
            tracing::warn!(project_id = %id, user = %user.email, "Payment evidence from non-owner refused");
            return Err(AppError::Forbidden);
        }

        let changes = lifecycle::apply_transition(&project, Transition::SubmitEvidence(evidence))?;
        let updated = self.repo.update(id, changes).await?;
        tracing::info!(project_id = %id, "Payment evidence submitted");
        Ok(updated)
    }

    pub async fn set_status(&self, admin: &User, id: Uuid, status: ProjectStatus) -> Result<Project> {
        ensure_admin(admin)?;
        let project = self.find(id).await?;

        let changes = lifecycle::apply_transition(&project, Transition::SetStatus(status))?;
        let updated = self.repo.update(id, changes).await?;
        tracing::info!(project_id = %id, status = status.as_str(), admin = %admin.email, "Project status changed");
        Ok(updated)
    }

    pub async fn verify_payment(&self, admin: &User, id: Uuid, approved: bool) -> Result<Project> {
        ensure_admin(admin)?;
        let project = self.find(id).await?;

        let changes = lifecycle::apply_transition(&project, Transition::VerifyPayment { approved })?;
        let updated = self.repo.update(id, changes).await?;
        tracing::info!(project_id = %id, approved, admin = %admin.email, "Payment verification recorded");
        Ok(updated)
    }

    /// Every request, newest first. `search` matches title or requester
    /// email, case-insensitively.
    pub async fn list_all(&self, admin: &User, search: Option<&str>) -> Result<Vec<Project>> {
        ensure_admin(admin)?;
        let projects = self.repo.list_all().await?;

        let needle = search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        Ok(match needle {
            Some(needle) => projects
                .into_iter()
                .filter(|p| {
                    p.title.to_lowercase().contains(&needle)
                        || p.user_email.to_lowercase().contains(&needle)
                })
                .collect(),
            None => projects,
        })
    }

    pub async fn pending_verifications(&self, admin: &User) -> Result<Vec<Project>> {
        ensure_admin(admin)?;
        self.repo.list_by_payment_status(PaymentStatus::PendingVerification).await
    }

    async fn find(&self, id: Uuid) -> Result<Project> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }
}

fn ensure_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
