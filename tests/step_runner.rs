//! Step runner traversal tests against an offline probe suite

mod common;

use common::{mixed_targets, ScriptedSuite};
use futures::StreamExt;
use network_readiness_probe::{
    models::ResultEnvelope,
    runner::StepRunner,
    types::{Category, ExecutionMode, Status},
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_stream_yields_every_category_in_order() {
    let suite = Arc::new(ScriptedSuite::default());
    let runner = StepRunner::new(mixed_targets(), suite).unwrap();
    assert_eq!(runner.total_steps(), 9);

    let items: Vec<(Category, _)> = runner.steps().collect().await;
    let categories: Vec<Category> = items.iter().map(|(c, _)| *c).collect();

    assert_eq!(
        categories,
        vec![
            Category::Dns,
            Category::Dns,
            Category::Tcp,
            Category::Https,
            Category::Quic,
            Category::UdpRange,
            Category::Ping,
            Category::Ntp,
            Category::Speedtest,
        ]
    );
    assert!(items.iter().all(|(category, result)| result.category() == *category));
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let suite = Arc::new(ScriptedSuite::default());
    let mut runner = StepRunner::new(mixed_targets(), Arc::clone(&suite) as _).unwrap();

    let mut envelope = ResultEnvelope::new(None);
    while let Some((category, result)) = runner.next_step().await {
        envelope.push(category, result);
    }

    assert!(runner.is_exhausted());
    assert_eq!(runner.completed(), 9);
    assert_eq!(envelope.tcp[0].status, Status::Fail);
    assert_eq!(envelope.tcp[0].error.as_deref(), Some("Network error: scripted failure"));
    assert_eq!(envelope.len(), 9);
    assert_eq!(suite.calls().len(), 9);
    assert!(runner.next_step().await.is_none());
}

#[tokio::test]
async fn test_sequential_and_concurrent_agree() {
    let sequential = Arc::new(ScriptedSuite::with_delay(Duration::from_millis(5)));
    let concurrent = Arc::new(ScriptedSuite::with_delay(Duration::from_millis(5)));

    let a: Vec<_> = StepRunner::new(mixed_targets(), sequential).unwrap().steps().collect().await;
    let b: Vec<_> = StepRunner::new(mixed_targets(), concurrent)
        .unwrap()
        .with_mode(ExecutionMode::Concurrent { max_in_flight: 4 })
        .steps()
        .collect()
        .await;

    assert_eq!(a, b);
}
