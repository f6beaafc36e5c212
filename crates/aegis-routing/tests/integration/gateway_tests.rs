//! End-to-end request flow through the gateway.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::expect_used,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use crate::common::{COMPLEX_CONTEXT, COMPLEX_PROMPT, MockTiers};
use aegis_core::{ModelTier, PromptRequest};
use aegis_routing::{GatewayConfig, GatewayError};

#[tokio::test]
async fn test_simple_prompt_miss_then_hit() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    let first = gateway
        .submit(PromptRequest::new("What is 2+2?"))
        .await
        .unwrap();
    assert!(!first.routing_decision.cache_hit);
    assert_eq!(first.routing_decision.tier, ModelTier::Small);
    assert_eq!(first.model_used, "llama-3.1-8b-instant");
    assert_eq!(first.response, "small tier answer");
    assert!(first.routing_decision.reason.contains("below threshold 0.30"));

    let second = gateway
        .submit(PromptRequest::new("What is 2+2?"))
        .await
        .unwrap();
    assert!(second.routing_decision.cache_hit);
    assert_eq!(second.response, first.response);
    assert_eq!(second.model_used, first.model_used);
    assert!(second.cost.abs() < f64::EPSILON);
    assert_eq!(tiers.tier_calls(), 1);

    let stats = gateway.stats();
    assert_eq!(stats.total_requests, 2);
    assert!((stats.cache_hit_rate - 50.0).abs() < 1e-9);
    assert_eq!(stats.model_distribution.get("llama-3.1-8b-instant"), Some(&2));
}

#[tokio::test]
async fn test_oversized_prompt_never_reaches_a_backend() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    let error = gateway
        .submit(PromptRequest::new("a".repeat(4001)))
        .await
        .unwrap_err();
    assert!(matches!(error, GatewayError::Validation(_)));
    assert_eq!(error.status_code(), 422);
    assert_eq!(tiers.tier_calls(), 0);
    assert_eq!(tiers.reasoning.call_count(), 0);
    assert_eq!(gateway.stats().total_requests, 0);
}

#[tokio::test]
async fn test_complex_prompt_routes_to_large_and_is_analysed() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    let response = gateway
        .submit(PromptRequest::new(COMPLEX_PROMPT).with_context(COMPLEX_CONTEXT))
        .await
        .unwrap();
    assert_eq!(response.routing_decision.tier, ModelTier::Large);
    assert_eq!(response.model_used, "gpt-4o");
    assert!(response.routing_decision.reason.contains("exceeds threshold 0.60"));
    assert!((0.5..=1.0).contains(&response.routing_decision.confidence));

    let analysis = response.causal_analysis.expect("large tier is always analysed");
    assert!(!analysis.is_hallucination);
    assert!((0.0..=1.0).contains(&analysis.confidence));
    assert_eq!(tiers.large.call_count(), 1);
}

#[tokio::test]
async fn test_cache_hit_reattaches_analysis_without_reanalysing() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());
    let request = PromptRequest::new(COMPLEX_PROMPT).with_context(COMPLEX_CONTEXT);

    let first = gateway.submit(request.clone()).await.unwrap();
    let analyses = tiers.reasoning.call_count();
    let second = gateway.submit(request).await.unwrap();

    assert!(second.routing_decision.cache_hit);
    assert_eq!(second.causal_analysis, first.causal_analysis);
    assert_eq!(tiers.reasoning.call_count(), analyses);
}

#[tokio::test]
async fn test_unsampled_medium_response_is_not_analysed() {
    let tiers = MockTiers::new();
    let mut config = GatewayConfig::default();
    config.analysis.sample_rate = 0.0;
    let gateway = tiers.gateway(config);

    let response = gateway
        .submit(PromptRequest::new(
            "Write a function that parses dates, explain why edge cases matter, and compare \
             two approaches to debug failures.",
        ))
        .await
        .unwrap();
    assert_eq!(response.routing_decision.tier, ModelTier::Medium);
    assert!(response.causal_analysis.is_none());
    assert_eq!(tiers.reasoning.call_count(), 0);
}

#[tokio::test]
async fn test_disabled_cache_always_generates() {
    let tiers = MockTiers::new();
    let mut config = GatewayConfig::default();
    config.cache.enabled = false;
    let gateway = tiers.gateway(config);

    for _ in 0..3 {
        let response = gateway.submit(PromptRequest::new("hello")).await.unwrap();
        assert!(!response.routing_decision.cache_hit);
    }
    assert_eq!(tiers.small.call_count(), 3);
    assert!(gateway.stats().cache_hit_rate.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_stats_invariants_over_mixed_traffic() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    let prompts = [
        PromptRequest::new("What is 2+2?"),
        PromptRequest::new("What is 2+2?"),
        PromptRequest::new("Name a colour"),
        PromptRequest::new(COMPLEX_PROMPT).with_context(COMPLEX_CONTEXT),
        PromptRequest::new("Name a colour").with_temperature(0.1),
    ];
    for request in prompts {
        gateway.submit(request).await.unwrap();
    }

    let stats = gateway.stats();
    assert_eq!(stats.total_requests, 5);
    assert_eq!(
        stats.model_distribution.values().sum::<u64>(),
        stats.total_requests
    );
    assert!((0.0..=100.0).contains(&stats.cache_hit_rate));
    assert!((stats.cache_hit_rate - 20.0).abs() < 1e-9);
    assert!(stats.cost_savings >= 0.0);
    assert!(stats.total_cost > 0.0);

    gateway.reset_stats();
    assert_eq!(gateway.stats().total_requests, 0);
}
