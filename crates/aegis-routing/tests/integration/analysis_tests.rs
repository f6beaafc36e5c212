//! Hallucination analysis as seen through the gateway.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::expect_used,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use crate::common::{COMPLEX_CONTEXT, COMPLEX_PROMPT, MockTiers};
use aegis_core::PromptRequest;
use aegis_providers::{MockBackend, MockFailure};
use aegis_routing::GatewayConfig;

fn complex_request() -> PromptRequest {
    PromptRequest::new(COMPLEX_PROMPT).with_context(COMPLEX_CONTEXT)
}

#[tokio::test]
async fn test_invented_cause_is_flagged_and_counted() {
    let mut tiers = MockTiers::new();
    tiers.large = MockBackend::new("large").with_default_response(
        "The consensus protocol is safe because quantum entanglement synchronises every replica instantly.",
    );
    tiers.reasoning = MockBackend::new("reasoning").with_default_response("0.95");
    let gateway = tiers.gateway(GatewayConfig::default());

    let response = gateway.submit(complex_request()).await.unwrap();
    let analysis = response.causal_analysis.expect("large tier is always analysed");
    assert!(analysis.is_hallucination);
    assert!(analysis.confidence > 0.6);
    assert!(
        analysis
            .pathway
            .as_deref()
            .is_some_and(|pathway| pathway.contains("quantum entanglement"))
    );
    assert!(analysis.explanation.contains("quantum entanglement"));
    assert_eq!(gateway.stats().hallucinations_caught, 1);
}

#[tokio::test]
async fn test_restating_response_is_not_flagged() {
    let mut tiers = MockTiers::new();
    tiers.large = MockBackend::new("large").with_default_response(
        "Leader election is needed to design a distributed consensus algorithm.",
    );
    tiers.reasoning = MockBackend::new("reasoning").with_default_response("0.95");
    let gateway = tiers.gateway(GatewayConfig::default());

    let response = gateway.submit(complex_request()).await.unwrap();
    let analysis = response.causal_analysis.expect("large tier is always analysed");
    assert!(!analysis.is_hallucination);
    assert!(analysis.pathway.is_none());
    assert_eq!(tiers.reasoning.call_count(), 0);
    assert_eq!(gateway.stats().hallucinations_caught, 0);
}

#[tokio::test]
async fn test_analysis_failure_still_returns_response() {
    let tiers = MockTiers::new();
    tiers.reasoning.set_failure(Some(MockFailure::Unavailable));
    let gateway = tiers.gateway(GatewayConfig::default());

    let response = gateway.submit(complex_request()).await.unwrap();
    assert_eq!(response.response, "large tier answer");
    assert!(response.causal_analysis.is_none());

    let stats = gateway.stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.analysis_failures, 1);
    assert_eq!(stats.hallucinations_caught, 0);
}

#[tokio::test]
async fn test_disabled_analysis_never_calls_reasoning_backend() {
    let tiers = MockTiers::new();
    let mut config = GatewayConfig::default();
    config.analysis.enabled = false;
    let gateway = tiers.gateway(config);

    let response = gateway.submit(complex_request()).await.unwrap();
    assert!(response.causal_analysis.is_none());
    assert_eq!(tiers.reasoning.call_count(), 0);
}
