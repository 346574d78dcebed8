use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{session::Session, ActionCodeStore, ActionMode, AuthService},
    domain::{
        Account, ConfirmResetRequest, CreateAccountRequest, LoginRequest, PasswordResetRequest,
        SignupRequest, User,
    },
    error::{AppError, Result},
    integrations::{Mailer, OutgoingEmail},
    repository::UserRepository,
};

/// A freshly started session: who, the raw cookie token, and the record.
pub struct SignedIn {
    pub user: User,
    pub token: String,
    pub session: Session,
}

/// Result of following an emailed link.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ActionOutcome {
    /// The address is now verified; the code is spent.
    VerifyEmail { email: String },
    /// The code is good; the client should ask for a new password.
    ResetPassword { email: String },
}

pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    auth: Arc<AuthService>,
    codes: Arc<ActionCodeStore>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        auth: Arc<AuthService>,
        codes: Arc<ActionCodeStore>,
        mailer: Arc<dyn Mailer>,
        base_url: String,
    ) -> Self {
        Self {
            users,
            auth,
            codes,
            mailer,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<SignedIn> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("An account with this email already exists".to_string()));
        }

        let password_hash = AuthService::hash_password(&request.password).await?;
        let account = self
            .users
            .create(
                CreateAccountRequest {
                    email,
                    display_name: request.display_name.filter(|n| !n.trim().is_empty()),
                    password: request.password,
                },
                password_hash,
            )
            .await?;

        tracing::info!(user = %account.email, "Account created");

        // The account exists either way; a mail outage only delays verification
        if let Err(e) = self.send_code(&account, ActionMode::VerifyEmail).await {
            tracing::warn!(user = %account.email, "Could not send verification email: {}", e);
        }

        self.start_session(&account).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<SignedIn> {
        let email = request.email.trim().to_lowercase();

        let password_hash = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !AuthService::verify_password(&request.password, &password_hash).await? {
            tracing::debug!(user = %email, "Login rejected: wrong password");
            return Err(AppError::Unauthorized);
        }

        let account = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.start_session(&account).await
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.auth.invalidate_session(token).await
    }

    /// Resolve a session's user. `None` when the account has been removed.
    pub async fn current_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let account = self.users.find_by_id(user_id).await?;
        Ok(account.map(|a| self.auth.project_user(&a)))
    }

    /// Always succeeds for well-formed input so the form cannot be used to
    /// probe which addresses have accounts.
    pub async fn request_password_reset(&self, request: PasswordResetRequest) -> Result<()> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        match self.users.find_by_email(&email).await? {
            Some(account) => {
                if let Err(e) = self.send_code(&account, ActionMode::ResetPassword).await {
                    tracing::error!(user = %email, "Could not send password reset email: {}", e);
                }
            }
            None => tracing::debug!(user = %email, "Password reset requested for unknown account"),
        }
        Ok(())
    }

    /// Follow an emailed link. `verifyEmail` is applied right away;
    /// `resetPassword` only checks the code.
    pub async fn check_action(&self, mode: Option<&str>, code: Option<&str>) -> Result<ActionOutcome> {
        let (mode, code) = parse_action(mode, code)?;

        match mode {
            ActionMode::VerifyEmail => {
                let user_id = self.codes.consume(code, mode).await?;
                self.users.mark_email_verified(user_id).await?;
                let account = self.account(user_id).await?;
                tracing::info!(user = %account.email, "Email verified");
                Ok(ActionOutcome::VerifyEmail { email: account.email })
            }
            ActionMode::ResetPassword => {
                let user_id = self.codes.check(code, mode).await?;
                let account = self.account(user_id).await?;
                Ok(ActionOutcome::ResetPassword { email: account.email })
            }
        }
    }

    /// Set a new password from a reset link. Every session of the account is
    /// signed out.
    pub async fn confirm_password_reset(&self, request: ConfirmResetRequest) -> Result<()> {
        request.validate()?;
        if request.oob_code.trim().is_empty() {
            return Err(AppError::BadRequest("Missing reset code".to_string()));
        }

        let user_id = self
            .codes
            .consume(request.oob_code.trim(), ActionMode::ResetPassword)
            .await?;

        let password_hash = AuthService::hash_password(&request.new_password).await?;
        self.users.update_password(user_id, password_hash).await?;
        let signed_out = self.auth.invalidate_user_sessions(user_id).await?;

        tracing::info!(user_id = %user_id, signed_out, "Password reset completed");
        Ok(())
    }

    pub async fn send_verification(&self, user: &User) -> Result<()> {
        if user.email_verified {
            return Err(AppError::BadRequest("Email is already verified".to_string()));
        }
        let account = self.account(user.id).await?;
        self.send_code(&account, ActionMode::VerifyEmail).await
    }

    async fn start_session(&self, account: &Account) -> Result<SignedIn> {
        let (session, token) = self.auth.create_session(account.id).await?;
        Ok(SignedIn {
            user: self.auth.project_user(account),
            token,
            session,
        })
    }

    async fn account(&self, id: Uuid) -> Result<Account> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    async fn send_code(&self, account: &Account, mode: ActionMode) -> Result<()> {
        let code = self.codes.issue(account.id, mode).await?;
        let link = format!(
            "{}/auth/action?mode={}&oobCode={}",
            self.base_url,
            mode.as_str(),
            urlencoding::encode(&code)
        );

        let (subject, intro) = match mode {
            ActionMode::VerifyEmail => (
                "Verify your DevFlow email",
                "Confirm your email address by opening this link:",
            ),
            ActionMode::ResetPassword => (
                "Reset your DevFlow password",
                "Someone asked to reset your password. If it was you, open this link:",
            ),
        };

        self.mailer
            .send(OutgoingEmail {
                to: account.email.clone(),
                subject: subject.to_string(),
                body: format!("{}\n\n{}\n", intro, link),
            })
            .await
            .map_err(|e| AppError::External(format!("Could not send email: {}", e)))
    }
}

fn parse_action<'a>(mode: Option<&str>, code: Option<&'a str>) -> Result<(ActionMode, &'a str)> {
    let mode = mode
        .and_then(ActionMode::parse)
        .ok_or_else(|| AppError::BadRequest("Invalid action mode".to_string()))?;
    let code = code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing action code".to_string()))?;
    Ok((mode, code))
}
