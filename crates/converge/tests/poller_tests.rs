//! Behaviour of the convergence poller under paused time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use converge::{
    await_convergence, AbortReason, Bound, ConvergeError, ConvergenceOutcome, ConvergenceRequest,
    ErrorPolicy, ResourceKind, Tick,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_millis(10);

/// A check that returns the number of calls made so far.
fn counting_check(
    calls: &Arc<AtomicU32>,
) -> impl FnMut() -> std::future::Ready<Result<u32, String>> {
    let calls = Arc::clone(calls);
    move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_makes_no_query() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = await_convergence(
        counting_check(&calls),
        |_: &u32| true,
        INTERVAL,
        Bound::Attempts(0),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(ConvergeError::InvalidBound { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_makes_no_query() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = await_convergence(
        counting_check(&calls),
        |_: &u32| true,
        Duration::ZERO,
        Bound::Attempts(3),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(ConvergeError::InvalidInterval { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_shorter_than_interval_makes_no_query() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = await_convergence(
        counting_check(&calls),
        |_: &u32| true,
        Duration::from_secs(10),
        Bound::Within(Duration::from_secs(5)),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(ConvergeError::InvalidBound { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_converges_on_third_attempt_after_three_intervals() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let outcome = await_convergence(
        counting_check(&calls),
        |n: &u32| *n >= 3,
        INTERVAL,
        Bound::Attempts(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(40), "elapsed {elapsed:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match outcome {
        ConvergenceOutcome::Converged { snapshot, attempts } => {
            assert_eq!(snapshot, 3);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected converged, got {}", other.label()),
    }
}

#[tokio::test(start_paused = true)]
async fn test_never_satisfied_times_out_after_exact_bound() {
    let calls = Arc::new(AtomicU32::new(0));

    let outcome = await_convergence(
        counting_check(&calls),
        |_: &u32| false,
        INTERVAL,
        Bound::Attempts(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert!(outcome.is_timed_out());
    assert!(!outcome.is_converged());
    assert_eq!(outcome.attempts(), 5);
    assert_eq!(outcome.last_snapshot(), Some(&5));
    assert!(outcome.into_converged().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_tolerated() {
    let calls = Arc::new(AtomicU32::new(0));
    let successes = Arc::new(AtomicU32::new(0));
    let check = {
        let calls = Arc::clone(&calls);
        let successes = Arc::clone(&successes);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let result = if n % 2 == 1 {
                Err(format!("throttled on call {n}"))
            } else {
                Ok(successes.fetch_add(1, Ordering::SeqCst) + 1)
            };
            std::future::ready(result)
        }
    };

    let outcome = await_convergence(
        check,
        |ok: &u32| *ok >= 4,
        INTERVAL,
        Bound::Attempts(10),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(outcome.is_converged());
    assert_eq!(outcome.attempts(), 8);
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_keeps_last_error() {
    let outcome = await_convergence(
        || std::future::ready(Err::<u32, _>("AccessDenied".to_string())),
        |_: &u32| true,
        INTERVAL,
        Bound::Attempts(3),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    match outcome {
        ConvergenceOutcome::TimedOut {
            last_snapshot,
            last_error,
            attempts,
        } => {
            assert_eq!(last_snapshot, None);
            assert_eq!(last_error.as_deref(), Some("AccessDenied"));
            assert_eq!(attempts, 3);
        }
        other => panic!("expected timeout, got {}", other.label()),
    }
}

#[tokio::test(start_paused = true)]
async fn test_abort_policy_stops_on_first_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let check = {
        let calls = Arc::clone(&calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err::<u32, _>("UnauthorizedOperation".to_string()))
        }
    };

    let outcome = ConvergenceRequest::new(ResourceKind::InstanceState, "i-0abc", |_: &u32| true)
        .with_interval(INTERVAL)
        .with_bound(Bound::Attempts(5))
        .with_error_policy(ErrorPolicy::Abort)
        .run(&CancellationToken::new(), check)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match outcome {
        ConvergenceOutcome::Aborted {
            reason: AbortReason::Failed(error),
            attempts,
            ..
        } => {
            assert_eq!(error, "UnauthorizedOperation");
            assert_eq!(attempts, 1);
        }
        other => panic!("expected abort, got {}", other.label()),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_the_wait() {
    let calls = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        trigger.cancel();
    });

    let outcome = await_convergence(
        counting_check(&calls),
        |_: &u32| false,
        INTERVAL,
        Bound::Attempts(100),
        &cancel,
    )
    .await
    .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_makes_no_query() {
    let calls = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = await_convergence(
        counting_check(&calls),
        |_: &u32| true,
        INTERVAL,
        Bound::Attempts(3),
        &cancel,
    )
    .await
    .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bound_stops_new_checks() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let outcome = await_convergence(
        counting_check(&calls),
        |_: &u32| false,
        INTERVAL,
        Bound::Within(Duration::from_millis(35)),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(outcome.is_timed_out());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() <= Duration::from_millis(35));
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_every_unconverged_check() {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&ticks);
    let calls = Arc::new(AtomicU32::new(0));

    let outcome = ConvergenceRequest::new(ResourceKind::CidrAssociation, "vpc-1", |n: &u32| *n == 3)
        .with_interval(INTERVAL)
        .with_observer(move |tick: Tick<'_, u32, String>| {
            let label = match tick {
                Tick::Pending { attempt, snapshot } => format!("pending {attempt} {snapshot}"),
                Tick::TransientError { attempt, error } => format!("error {attempt} {error}"),
            };
            seen.lock().unwrap().push(label);
        })
        .run(&CancellationToken::new(), counting_check(&calls))
        .await
        .unwrap();

    assert!(outcome.is_converged());
    assert_eq!(
        *ticks.lock().unwrap(),
        vec!["pending 1 1".to_string(), "pending 2 2".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_kind_defaults_apply_without_overrides() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let outcome = ConvergenceRequest::new(ResourceKind::StaticIpConsistency, "ip-1", |_: &u32| false)
        .run(&CancellationToken::new(), counting_check(&calls))
        .await
        .unwrap();

    assert!(outcome.is_timed_out());
    assert_eq!(calls.load(Ordering::SeqCst), 15);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(30), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(32), "elapsed {elapsed:?}");
}
