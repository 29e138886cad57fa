use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use fleet_observe::ErrorCollector;
use fleet_model::ModelError;

use super::*;
use crate::{error::CoreError, metrics::noop_metrics};

fn pool_with(workers: usize) -> (WorkerPool<u32>, Arc<ErrorCollector>) {
    let collector = Arc::new(ErrorCollector::new());
    let config = PoolConfig::new(workers, Duration::from_millis(20)).unwrap();
    let pool = WorkerPool::new("test", config, collector.clone(), noop_metrics());
    (pool, collector)
}

fn job(n: u32) -> Job<u32> {
    Job::new(n, format!("minion-{n}"), n)
}

#[test]
fn zero_workers_is_rejected() {
    assert_eq!(
        PoolConfig::new(0, Duration::from_secs(1)),
        Err(PoolError::NoWorkers)
    );
}

#[tokio::test]
async fn single_worker_runs_every_job_in_order() {
    let (mut pool, errors) = pool_with(1);
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

    let s = seen.clone();
    pool.spawn(handler_fn(move |job: Job<u32>| {
        let s = s.clone();
        async move {
            s.lock().unwrap().push(job.payload);
            Ok(())
        }
    }))
    .unwrap();

    for n in 1..=5 {
        pool.enqueue(job(n)).unwrap();
    }
    let report = pool.drain().await.unwrap();

    assert_eq!(report.enqueued, 5);
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert!(errors.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[tokio::test]
async fn jobs_queued_before_spawn_are_processed() {
    let (mut pool, _) = pool_with(2);
    for n in 1..=3 {
        pool.enqueue(job(n)).unwrap();
    }
    assert_eq!(pool.state(), PoolState::Idle);

    pool.spawn(handler_fn(|_: Job<u32>| async { Ok(()) })).unwrap();
    let report = pool.drain().await.unwrap();
    assert_eq!(report.succeeded, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_worker_count() {
    let (mut pool, _) = pool_with(3);
    let active = Arc::new(AtomicUsize::new(0));
    let watermark = Arc::new(AtomicUsize::new(0));

    let (a, w) = (active.clone(), watermark.clone());
    pool.spawn(handler_fn(move |_: Job<u32>| {
        let (a, w) = (a.clone(), w.clone());
        async move {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            w.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            a.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }))
    .unwrap();

    for n in 1..=12 {
        pool.enqueue(job(n)).unwrap();
    }
    let report = pool.drain().await.unwrap();

    assert_eq!(report.succeeded, 12);
    let peak = watermark.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak} exceeded 3 workers");
    assert!(peak >= 2, "expected some parallelism, got {peak}");
}

#[tokio::test]
async fn failures_are_reported_and_do_not_stop_workers() {
    let (mut pool, errors) = pool_with(2);
    pool.spawn(handler_fn(|job: Job<u32>| async move {
        if job.payload % 2 == 0 {
            Err(CoreError::ResourceState(format!("{} is not running", job.instance_name)))
        } else {
            Ok(())
        }
    }))
    .unwrap();

    for n in 1..=6 {
        pool.enqueue(job(n)).unwrap();
    }
    let report = pool.drain().await.unwrap();

    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 3);
    assert!(report.fatal.is_none());
    assert_eq!(errors.len(), 3);
    let r = &errors.for_instance("minion-4")[0];
    assert_eq!(r.action, "test");
    assert_eq!(r.kind, "resource-state");
}

#[tokio::test]
async fn fatal_job_error_is_retained_not_reported() {
    let (mut pool, errors) = pool_with(1);
    pool.spawn(handler_fn(|job: Job<u32>| async move {
        if job.payload == 2 {
            Err(CoreError::from(ModelError::Naming { instance: 2, total: 1 }))
        } else {
            Ok(())
        }
    }))
    .unwrap();

    for n in 1..=3 {
        pool.enqueue(job(n)).unwrap();
    }
    let report = pool.drain().await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert!(errors.is_empty());
    assert!(matches!(report.into_result(), Err(CoreError::Model(_))));
}

#[tokio::test]
async fn later_fatal_errors_are_reported() {
    let (mut pool, errors) = pool_with(1);
    pool.spawn(handler_fn(|job: Job<u32>| async move {
        Err(CoreError::from(ModelError::Naming {
            instance: job.payload,
            total: 1,
        }))
    }))
    .unwrap();

    for n in 2..=4 {
        pool.enqueue(job(n)).unwrap();
    }
    let report = pool.drain().await.unwrap();

    assert_eq!(report.failed, 3);
    assert_eq!(errors.len(), 2);
    assert!(errors.for_instance("minion-2").is_empty());
    for n in [3, 4] {
        let r = &errors.for_instance(&format!("minion-{n}"))[0];
        assert_eq!(r.kind, "naming");
    }
    match report.into_result() {
        Err(CoreError::Model(ModelError::Naming { instance, .. })) => assert_eq!(instance, 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn panicking_job_is_counted_and_pool_survives() {
    let (mut pool, errors) = pool_with(1);
    pool.spawn(handler_fn(|job: Job<u32>| async move {
        if job.payload == 1 {
            panic!("handler blew up");
        }
        Ok(())
    }))
    .unwrap();

    for n in 1..=3 {
        pool.enqueue(job(n)).unwrap();
    }
    let report = pool.drain().await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    let reports = errors.for_instance("minion-1");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, "panic");
    assert!(reports[0].message.contains("handler blew up"));
}

#[tokio::test]
async fn enqueue_after_drain_is_refused() {
    let (mut pool, _) = pool_with(1);
    pool.spawn(handler_fn(|_: Job<u32>| async { Ok(()) })).unwrap();
    pool.enqueue(job(1)).unwrap();
    pool.drain().await.unwrap();

    assert_eq!(
        pool.enqueue(job(2)),
        Err(PoolError::Closed(PoolState::Stopped))
    );
    assert!(matches!(pool.drain().await, Err(PoolError::Closed(_))));
}

#[tokio::test]
async fn drain_without_jobs_returns_immediately() {
    let (mut pool, _) = pool_with(2);
    pool.spawn(handler_fn(|_: Job<u32>| async { Ok(()) })).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(1), pool.drain())
        .await
        .expect("drain must not hang")
        .unwrap();
    assert_eq!(report.enqueued, 0);
}

#[tokio::test]
async fn drain_before_spawn_with_pending_jobs_fails() {
    let (mut pool, _) = pool_with(1);
    pool.enqueue(job(1)).unwrap();
    assert_eq!(pool.drain().await.unwrap_err(), PoolError::NotStarted(1));
}

#[tokio::test]
async fn spawn_twice_is_rejected() {
    let (mut pool, _) = pool_with(1);
    pool.spawn(handler_fn(|_: Job<u32>| async { Ok(()) })).unwrap();
    let again = pool.spawn(handler_fn(|_: Job<u32>| async { Ok(()) }));
    assert_eq!(again, Err(PoolError::AlreadyStarted(PoolState::Running)));
}

#[tokio::test]
async fn state_changes_are_observable() {
    let (mut pool, _) = pool_with(1);
    let rx = pool.subscribe_state();
    assert_eq!(*rx.borrow(), PoolState::Idle);

    pool.spawn(handler_fn(|_: Job<u32>| async { Ok(()) })).unwrap();
    assert_eq!(*rx.borrow(), PoolState::Running);

    pool.drain().await.unwrap();
    assert_eq!(*rx.borrow(), PoolState::Stopped);
}
