//! Integration tests for the counter demo running on a live store

#![allow(clippy::unwrap_used)]

use counter::{CounterApp, SIMULATED_LATENCY};
use namespaced_store_core::environment::Clock;
use namespaced_store_testing::{assertions::assert_action_types, test_clock, ActionRecorder, TokioClock};
use std::sync::Arc;
use std::time::Duration;

fn tokio_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock::new(test_clock().now()))
}

#[tokio::test]
async fn test_counter_with_store() {
    let app = CounterApp::start(tokio_clock()).unwrap();

    assert_eq!(app.snapshot().await.counter, 0);

    app.increment().await.unwrap();
    app.increment().await.unwrap();
    assert_eq!(app.snapshot().await.counter, 2);

    app.decrement().await.unwrap();
    assert_eq!(app.snapshot().await.counter, 1);
}

#[tokio::test]
async fn test_concurrent_increments() {
    let app = Arc::new(CounterApp::start(tokio_clock()).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let app = Arc::clone(&app);
            tokio::spawn(async move { app.increment().await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(app.snapshot().await.counter, 10);
}

#[tokio::test(start_paused = true)]
async fn test_run_reports_cost_after_delay() {
    let app = CounterApp::start(tokio_clock()).unwrap();

    app.run().await.unwrap();
    tokio::time::sleep(SIMULATED_LATENCY / 2).await;
    assert!(app.snapshot().await.cost.abs() < f64::EPSILON);

    tokio::time::sleep(SIMULATED_LATENCY).await;
    assert!((app.snapshot().await.cost - 1000.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_runs_report_once() {
    let app = CounterApp::start(tokio_clock()).unwrap();
    let recorder = ActionRecorder::start(app.store().subscribe_actions());

    app.run().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    app.run().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    app.run().await.unwrap();

    tokio::time::sleep(SIMULATED_LATENCY * 3).await;

    assert_action_types(
        &recorder.actions(),
        &[
            "@CostAsync/run",
            "@CostAsync/run",
            "@CostAsync/run",
            "@CostSync/set",
        ],
    );
    // Only the last run completes, a full second after it started.
    assert!((app.snapshot().await.cost - 1000.0).abs() < f64::EPSILON);
    assert_eq!(app.store().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_run() {
    let app = CounterApp::start(tokio_clock()).unwrap();
    let store = app.store().clone();

    app.run().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    app.shutdown(Duration::from_secs(1)).await.unwrap();

    tokio::time::sleep(SIMULATED_LATENCY * 2).await;
    assert!(store.state(|s| s.cost).await.abs() < f64::EPSILON);
    assert!(store.dispatch(namespaced_store_core::Action::new("@Counter/increment", None)).await.is_err());
}
