//! Concurrent submissions and cancellation.

#![allow(
    clippy::tests_outside_test_module,
    clippy::missing_panics_doc,
    clippy::expect_used,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use crate::common::MockTiers;
use aegis_core::PromptRequest;
use aegis_providers::MockBackend;
use aegis_routing::{GatewayConfig, GatewayError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_keep_stats_consistent() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    let mut tasks = JoinSet::new();
    for index in 0..100 {
        let gateway = gateway.clone();
        tasks.spawn(async move {
            let prompt = format!("Question number {}", index % 25);
            gateway.submit(PromptRequest::new(prompt)).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().is_ok());
    }

    let stats = gateway.stats();
    assert_eq!(stats.total_requests, 100);
    assert_eq!(
        stats.model_distribution.values().sum::<u64>(),
        stats.total_requests
    );
    assert!((0.0..=100.0).contains(&stats.cache_hit_rate));
    assert_eq!(gateway.cache().len(), 25);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_concurrent_requests_agree() {
    let tiers = MockTiers::new();
    let gateway = tiers.gateway(GatewayConfig::default());

    let mut tasks = JoinSet::new();
    for _ in 0..20 {
        let gateway = gateway.clone();
        tasks.spawn(async move { gateway.submit(PromptRequest::new("What is 2+2?")).await });
    }
    while let Some(joined) = tasks.join_next().await {
        let response = joined.unwrap().unwrap();
        assert_eq!(response.response, "small tier answer");
    }
    assert_eq!(gateway.cache().len(), 1);
    assert_eq!(gateway.stats().total_requests, 20);
}

#[tokio::test]
async fn test_cancellation_mid_flight_leaves_no_trace() {
    let mut tiers = MockTiers::new();
    tiers.small = MockBackend::new("small")
        .with_default_response("slow answer")
        .with_delay(Duration::from_millis(500));
    let gateway = tiers.gateway(GatewayConfig::default());

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = gateway
        .submit_with_cancellation(PromptRequest::new("hello"), &token)
        .await;
    assert!(matches!(result, Err(GatewayError::Cancelled)));
    assert_eq!(tiers.small.call_count(), 1);
    assert_eq!(gateway.stats().total_requests, 0);
    assert!(gateway.cache().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_backend_calls_respect_concurrency_limit() {
    let mut tiers = MockTiers::new();
    tiers.small = MockBackend::new("small")
        .with_default_response("answer")
        .with_delay(Duration::from_millis(100));
    let mut config = GatewayConfig::default();
    config.routing.max_concurrent_calls = 1;
    let gateway = tiers.gateway(config);

    let started = Instant::now();
    let (first, second) = tokio::join!(
        gateway.submit(PromptRequest::new("first")),
        gateway.submit(PromptRequest::new("second")),
    );
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(200));
}
