use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lowest budget a paid request may carry, in USD.
pub const MIN_BUDGET: f64 = 10.0;
/// Highest budget a paid request may carry, in USD.
pub const MAX_BUDGET: f64 = 100.0;
/// Descriptions shorter than this are not actionable.
pub const MIN_DESCRIPTION_CHARS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub contact_email: Option<String>,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub status: ProjectStatus,
    pub payment_status: PaymentStatus,
    pub is_free_trial: bool,
    pub tech_stack: Vec<String>,
    pub payment_method: Option<PaymentMethod>,
    pub sender_name: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Where the agency should reach the client. Older records may lack a
    /// contact address, in which case the account email is used.
    pub fn effective_contact_email(&self) -> &str {
        self.contact_email.as_deref().unwrap_or(&self.user_email)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Scoping,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "PENDING",
            ProjectStatus::Scoping => "SCOPING",
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ProjectStatus::Pending),
            "SCOPING" => Some(ProjectStatus::Scoping),
            "IN_PROGRESS" => Some(ProjectStatus::InProgress),
            "COMPLETED" => Some(ProjectStatus::Completed),
            "CANCELLED" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    PendingVerification,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::PendingVerification => "PENDING_VERIFICATION",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(PaymentStatus::Unpaid),
            "PENDING_VERIFICATION" => Some(PaymentStatus::PendingVerification),
            "PAID" => Some(PaymentStatus::Paid),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Out-of-band transfer channels accepted on the payment page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Jazzcash,
    Easypaisa,
    Bank,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Jazzcash => "jazzcash",
            PaymentMethod::Easypaisa => "easypaisa",
            PaymentMethod::Bank => "bank",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jazzcash" => Some(PaymentMethod::Jazzcash),
            "easypaisa" => Some(PaymentMethod::Easypaisa),
            "bank" => Some(PaymentMethod::Bank),
            _ => None,
        }
    }
}

/// Sender name and transaction reference for a manual transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvidence {
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, message = "Please provide the sender name"))]
    pub sender_name: String,
    #[validate(length(min = 1, message = "Please provide the transaction ID"))]
    pub transaction_id: String,
}

/// Client-facing request form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProjectRequest {
    pub title: String,
    #[validate(length(min = 20, message = "Description must be at least 20 characters"))]
    pub description: String,
    #[validate(email(message = "Contact email is not a valid address"))]
    pub contact_email: Option<String>,
    /// Ignored for free-trial submissions.
    pub budget: Option<f64>,
}

/// Fully decided record handed to the repository for insertion.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub contact_email: Option<String>,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub status: ProjectStatus,
    pub payment_status: PaymentStatus,
    pub is_free_trial: bool,
    pub tech_stack: Vec<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectChanges {
    pub status: Option<ProjectStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub evidence: Option<PaymentEvidence>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none() && self.evidence.is_none()
    }
}
