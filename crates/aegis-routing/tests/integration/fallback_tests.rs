//! Fallback to cheaper tiers when the selected backend is unavailable.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::expect_used,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use crate::common::{COMPLEX_CONTEXT, COMPLEX_PROMPT, MockTiers, init_tracing};
use aegis_core::{ModelTier, PromptRequest};
use aegis_providers::MockFailure;
use aegis_routing::{BackendRegistry, Gateway, GatewayConfig, GatewayError};
use std::sync::Arc;

fn complex_request() -> PromptRequest {
    PromptRequest::new(COMPLEX_PROMPT).with_context(COMPLEX_CONTEXT)
}

#[tokio::test]
async fn test_large_outage_falls_back_to_medium() {
    let tiers = MockTiers::new();
    tiers.large.set_failure(Some(MockFailure::Unavailable));
    let gateway = tiers.gateway(GatewayConfig::default());

    let response = gateway.submit(complex_request()).await.unwrap();
    assert_eq!(response.routing_decision.tier, ModelTier::Medium);
    assert_eq!(response.model_used, "gpt-4o-mini");
    assert_eq!(response.response, "medium tier answer");
    assert!(
        response
            .routing_decision
            .reason
            .contains("large tier unavailable")
    );
    assert!(
        response
            .routing_decision
            .reason
            .contains("fell back to medium tier")
    );

    let stats = gateway.stats();
    assert_eq!(stats.model_distribution.get("gpt-4o-mini"), Some(&1));
    assert_eq!(stats.model_distribution.get("gpt-4o"), Some(&0));
}

#[tokio::test]
async fn test_fallback_response_is_cached_under_fallback_model() {
    let tiers = MockTiers::new();
    tiers.large.set_available(false);
    let gateway = tiers.gateway(GatewayConfig::default());

    gateway.submit(complex_request()).await.unwrap();
    let cached = gateway.submit(complex_request()).await.unwrap();
    assert!(cached.routing_decision.cache_hit);
    assert_eq!(cached.model_used, "gpt-4o-mini");
    assert_eq!(tiers.large.call_count(), 0);
    assert_eq!(tiers.medium.call_count(), 1);
}

#[tokio::test]
async fn test_unregistered_tier_falls_back() {
    init_tracing();
    let tiers = MockTiers::new();
    let registry = BackendRegistry::new()
        .with_backend(ModelTier::Small, Arc::new(tiers.small.clone()))
        .with_backend(ModelTier::Medium, Arc::new(tiers.medium.clone()));
    let gateway = Gateway::new(GatewayConfig::default(), registry).unwrap();

    let response = gateway.submit(complex_request()).await.unwrap();
    assert_eq!(response.routing_decision.tier, ModelTier::Medium);
    assert!(
        response
            .routing_decision
            .reason
            .contains("no backend registered")
    );
}

#[tokio::test]
async fn test_double_outage_reports_unavailable_and_caches_nothing() {
    let tiers = MockTiers::new();
    tiers.large.set_failure(Some(MockFailure::Unavailable));
    tiers.medium.set_failure(Some(MockFailure::Unavailable));
    let gateway = tiers.gateway(GatewayConfig::default());

    let error = gateway.submit(complex_request()).await.unwrap_err();
    assert!(matches!(error, GatewayError::BackendUnavailable { .. }));
    assert_eq!(error.status_code(), 503);
    assert_eq!(tiers.small.call_count(), 0);
    assert_eq!(gateway.stats().total_requests, 0);
    assert!(gateway.cache().is_empty());
}

#[tokio::test]
async fn test_failed_request_lowers_cache_hit_rate() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    gateway.submit(PromptRequest::new("What is 2+2?")).await.unwrap();
    gateway.submit(PromptRequest::new("What is 2+2?")).await.unwrap();

    tiers.large.set_failure(Some(MockFailure::Unavailable));
    tiers.medium.set_failure(Some(MockFailure::Unavailable));
    assert!(gateway.submit(complex_request()).await.is_err());

    let stats = gateway.stats();
    assert_eq!(stats.total_requests, 2);
    assert!((stats.cache_hit_rate - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.model_distribution.get("llama-3.1-8b-instant"), Some(&1));
}
