//! Budget estimation through the Gemini `generateContent` endpoint.
//!
//! [`GeminiEstimator`] is the raw client and reports every failure.
//! [`suggest_budget`] wraps any [`BudgetEstimator`] and never fails: whatever
//! goes wrong, the caller gets the fallback budget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::EstimatorConfig;
use crate::domain::lifecycle::{clamp_suggested_budget, FALLBACK_BUDGET};
use crate::integrations::BudgetEstimator;

const SYSTEM_INSTRUCTION: &str = "You are a professional software project estimator. \
Your goal is to provide a single numeric value representing the suggested budget in USD. \
High complexity projects get closer to $100, while simple tasks get closer to $10.";

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("Budget estimator is not configured")]
    NotConfigured,

    #[error("Estimator request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Estimator API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Estimator returned an unusable answer: {0}")]
    Malformed(String),
}

/// What the model is asked to return.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawEstimate {
    pub suggested_budget: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Budget suggestion shown on the request form.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSuggestion {
    pub budget: f64,
    pub reasoning: Option<String>,
    pub fallback_used: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiEstimator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        }
    }

    fn request_body(description: &str) -> serde_json::Value {
        let prompt = format!(
            "Estimate a fair budget for this web development project based on its description.\n\
             The budget MUST be between $10 and $100.\n\n\
             Project Description: \"{}\"",
            description
        );

        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "suggestedBudget": {
                            "type": "NUMBER",
                            "description": "The estimated budget for the project in USD, between 10 and 100."
                        },
                        "reasoning": {
                            "type": "STRING",
                            "description": "Short explanation for the budget."
                        }
                    },
                    "required": ["suggestedBudget"]
                }
            }
        })
    }
}

#[async_trait]
impl BudgetEstimator for GeminiEstimator {
    async fn estimate(&self, description: &str) -> Result<RawEstimate, EstimatorError> {
        let api_key = self.api_key.as_deref().ok_or(EstimatorError::NotConfigured)?;

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", api_key)])
            .json(&Self::request_body(description))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EstimatorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response.json().await?;
        let text = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EstimatorError::Malformed("empty response".to_string()))?;

        serde_json::from_str::<RawEstimate>(&text)
            .map_err(|e| EstimatorError::Malformed(e.to_string()))
    }
}

/// Ask the estimator for a budget, clamped into the paid range. Never fails.
pub async fn suggest_budget(estimator: &dyn BudgetEstimator, description: &str) -> BudgetSuggestion {
    match estimator.estimate(description).await {
        Ok(raw) => {
            let usable = raw
                .suggested_budget
                .filter(|b| b.is_finite() && *b != 0.0)
                .is_some();
            BudgetSuggestion {
                budget: clamp_suggested_budget(raw.suggested_budget),
                reasoning: raw.reasoning.filter(|r| !r.trim().is_empty()),
                fallback_used: !usable,
            }
        }
        Err(e) => {
            tracing::debug!("Budget estimation failed, using fallback: {}", e);
            BudgetSuggestion {
                budget: FALLBACK_BUDGET,
                reasoning: None,
                fallback_used: true,
            }
        }
    }
}
