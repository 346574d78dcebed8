mod common;

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use devflow::{
    config::EstimatorConfig,
    domain::lifecycle::FALLBACK_BUDGET,
    integrations::{suggest_budget, BudgetEstimator, EstimatorError, GeminiEstimator},
};

fn answer(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

/// The description picks the canned answer so one server covers every case.
async fn fake_generate(
    Path(model_call): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if model_call != "test-model:generateContent" {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown model" })));
    }
    if params.get("key").map(String::as_str) != Some("test-key") {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "bad key" })));
    }
    if body["generationConfig"]["responseSchema"]["required"][0] != "suggestedBudget" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "schema missing" })));
    }

    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("");
    if prompt.contains("quota") {
        (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": "quota exceeded" })))
    } else if prompt.contains("garbage") {
        (StatusCode::OK, Json(answer("this is not json")))
    } else if prompt.contains("empty") {
        (StatusCode::OK, Json(json!({ "candidates": [] })))
    } else if prompt.contains("enterprise") {
        (StatusCode::OK, Json(answer(r#"{"suggestedBudget": 4000, "reasoning": "Huge scope"}"#)))
    } else {
        (StatusCode::OK, Json(answer(r#"{"suggestedBudget": 35, "reasoning": "Small brochure site"}"#)))
    }
}

async fn estimator(api_key: Option<&str>) -> GeminiEstimator {
    let router = Router::new().route("/v1beta/models/:model_call", post(fake_generate));
    let base_url = common::spawn_server(router).await;

    GeminiEstimator::new(&EstimatorConfig {
        api_key: api_key.map(str::to_string),
        base_url,
        model: "test-model".to_string(),
    })
}

#[tokio::test]
async fn test_estimate_reads_first_candidate() {
    let gemini = estimator(Some("test-key")).await;

    let raw = gemini.estimate("A brochure site for a florist").await.unwrap();
    assert_eq!(raw.suggested_budget, Some(35.0));
    assert_eq!(raw.reasoning.as_deref(), Some("Small brochure site"));

    let suggestion = suggest_budget(&gemini, "A brochure site for a florist").await;
    assert_eq!(suggestion.budget, 35.0);
    assert!(!suggestion.fallback_used);
}

#[tokio::test]
async fn test_large_answers_are_clamped() {
    let gemini = estimator(Some("test-key")).await;
    let suggestion = suggest_budget(&gemini, "An enterprise resource planning suite").await;
    assert_eq!(suggestion.budget, 100.0);
    assert_eq!(suggestion.reasoning.as_deref(), Some("Huge scope"));
}

#[tokio::test]
async fn test_failures_fall_back() {
    let gemini = estimator(Some("test-key")).await;

    let err = gemini.estimate("this one hits the quota").await.unwrap_err();
    assert!(matches!(err, EstimatorError::Api { status: 429, .. }));

    let err = gemini.estimate("model answers with garbage").await.unwrap_err();
    assert!(matches!(err, EstimatorError::Malformed(_)));

    for description in ["this one hits the quota", "model answers with garbage", "an empty answer please"] {
        let suggestion = suggest_budget(&gemini, description).await;
        assert_eq!(suggestion.budget, FALLBACK_BUDGET, "{}", description);
        assert!(suggestion.fallback_used);
    }

    let wrong_key = estimator(Some("other-key")).await;
    assert_eq!(suggest_budget(&wrong_key, "A brochure site for a florist").await.budget, FALLBACK_BUDGET);

    let unconfigured = estimator(None).await;
    assert!(matches!(
        unconfigured.estimate("A brochure site for a florist").await,
        Err(EstimatorError::NotConfigured)
    ));
}
