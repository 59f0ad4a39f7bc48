// Unit tests for the poll loop bookkeeping

use super::*;
use serde_json::json;

#[test]
fn test_classify() {
    assert_eq!(classify(Ok(json!(true))), Some(WaitOutcome::Ready));
    assert_eq!(classify(Ok(json!(false))), None);
    assert_eq!(classify(Ok(json!(null))), None);
    assert_eq!(classify(Err(PageError::ScriptTimeout)), None);
    assert_eq!(
        classify(Err(PageError::Script("testability is undefined".to_string()))),
        Some(WaitOutcome::EvaluationFailed(
            "javascript error: testability is undefined".to_string()
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn test_poller_budget_is_capped_by_interval() {
    let poller = Poller::new(Duration::from_secs(10), POLL_INTERVAL);
    assert_eq!(poller.budget(), POLL_INTERVAL);
    assert!(!poller.expired());
}

#[tokio::test(start_paused = true)]
async fn test_poller_budget_near_deadline() {
    let poller = Poller::new(Duration::from_millis(100), POLL_INTERVAL);
    assert_eq!(poller.budget(), Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert_eq!(poller.budget(), MIN_EVALUATION_BUDGET);
}

#[tokio::test(start_paused = true)]
async fn test_poller_tick_until_expired() {
    let start = Instant::now();
    let poller = Poller::new(Duration::from_millis(400), POLL_INTERVAL);

    let mut ticks = 0;
    while poller.tick().await {
        ticks += 1;
    }

    // 150 + 150 + 100
    assert_eq!(ticks, 3);
    assert_eq!(start.elapsed(), Duration::from_millis(400));
    assert!(poller.expired());
}

#[tokio::test(start_paused = true)]
async fn test_poller_with_unrepresentable_timeout() {
    let poller = Poller::new(Duration::MAX, POLL_INTERVAL);
    assert!(!poller.expired());
    assert_eq!(poller.budget(), POLL_INTERVAL);
    assert!(poller.remaining() > Duration::from_secs(365 * 24 * 60 * 60));
    assert!(poller.tick().await);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_is_already_expired() {
    let poller = Poller::new(Duration::ZERO, POLL_INTERVAL);
    assert!(poller.expired());
    assert!(!poller.tick().await);
    assert_eq!(poller.budget(), MIN_EVALUATION_BUDGET);
}

#[test]
fn test_settle_policy() {
    let timeout = Duration::from_secs(1);
    assert!(settle(WaitOutcome::Ready, timeout, true, "testability").is_ok());
    assert!(matches!(
        settle(WaitOutcome::TimedOut, timeout, true, "testability"),
        Err(TestabilityError::Timeout(_))
    ));
    assert!(settle(WaitOutcome::TimedOut, timeout, false, "testability").is_ok());
    assert!(settle(WaitOutcome::EvaluationFailed("gone".to_string()), timeout, true, "testability").is_ok());
}
