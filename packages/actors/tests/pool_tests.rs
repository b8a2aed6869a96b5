#![allow(clippy::disallowed_methods)]

mod common;

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;

use actors::{JobLookup, JobService, PoolState, SubmitError};
use common::{Gate, OBESITY, TIMEOUT, engine, gated, global_mean, pool, start, wait_done};
use futures_util::future::join_all;
use job_core::{Compute, ComputeError, JobId, JobState, StatRequest};
use serde_json::{Value, json};
use storage::{ResultStore, Storage, StorageConfig};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_submitted_job_finishes() -> Result<(), Box<dyn Error>> {
    let service = start(3, engine()).await?;

    let mut ids = Vec::new();
    for _ in 0..50 {
        ids.push(service.submit(global_mean()).await?);
    }
    for (n, id) in ids.iter().enumerate() {
        assert_eq!(id.to_string(), format!("job_id_{}", n + 1));
        assert_eq!(wait_done(&service, *id).await?, json!({"global_mean": 20.0}));
    }

    let snapshot = service.snapshot();
    assert_eq!(snapshot.len(), 50);
    assert!(snapshot.iter().all(|(_, state)| *state == JobState::Done));
    assert_eq!(service.running_jobs(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn job_is_running_until_its_result_is_written() -> Result<(), Box<dyn Error>> {
    let gate = Gate::new();
    let service = start(1, gated(gate.clone(), engine())).await?;

    let id = service.submit(StatRequest::StateMean {
        question: OBESITY.to_string(),
        state: "Alabama".to_string(),
    })
    .await?;
    assert_eq!(service.state(id), Some(JobState::Running));
    assert_eq!(service.lookup(id).await?, JobLookup::Running);

    gate.open();
    let first = wait_done(&service, id).await?;
    assert_eq!(first, json!({"Alabama": 15.0}));

    // Completed results never change.
    assert_eq!(service.lookup(id).await?, JobLookup::Done(first));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_ids_are_not_found() -> Result<(), Box<dyn Error>> {
    let service = start(1, engine()).await?;
    service.submit(global_mean()).await?;

    for seq in [2, 99] {
        let id = JobId::from_seq(seq).ok_or("zero id")?;
        assert_eq!(service.lookup(id).await?, JobLookup::NotFound);
        assert_eq!(service.state(id), None);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_refuses_new_work_and_drains_the_queue() -> Result<(), Box<dyn Error>> {
    let gate = Gate::new();
    let (service, handle) = JobService::start(
        pool(2),
        gated(gate.clone(), engine()),
        ResultStore::memory()?,
    )
    .await?;

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(service.submit(global_mean()).await?);
    }

    service.shutdown();
    assert!(!service.is_accepting());
    assert!(matches!(
        service.submit(global_mean()).await,
        Err(SubmitError::ShuttingDown)
    ));
    // A refused submission allocates no id.
    assert_eq!(service.registry().len(), 6);

    gate.open();
    tokio::time::timeout(TIMEOUT, service.wait_stopped()).await?;
    assert_eq!(service.pool_state(), PoolState::Stopped);

    for id in ids {
        assert_eq!(service.state(id), Some(JobState::Done));
        assert_eq!(service.lookup(id).await?, JobLookup::Done(json!({"global_mean": 20.0})));
    }

    tokio::time::timeout(TIMEOUT, handle).await??;
    assert!(service.queue_stats().await.is_none());
    assert!(matches!(
        service.submit(global_mean()).await,
        Err(SubmitError::ShuttingDown)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn idle_pool_stops_promptly() -> Result<(), Box<dyn Error>> {
    let service = start(4, engine()).await?;
    service.shutdown();
    // Repeated requests are harmless.
    service.shutdown();

    tokio::time::timeout(TIMEOUT, service.wait_stopped()).await?;
    assert_eq!(service.pool_state(), PoolState::Stopped);
    assert_eq!(service.registry().len(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_size_is_fixed() -> Result<(), Box<dyn Error>> {
    let service = start(4, engine()).await?;
    assert_eq!(service.pool_size(), 4);
    assert_eq!(service.workers_spawned(), 4);

    let mut ids = Vec::with_capacity(1000);
    for _ in 0..1000 {
        ids.push(service.submit(global_mean()).await?);
    }
    for id in ids {
        wait_done(&service, id).await?;
    }

    assert_eq!(service.workers_spawned(), 4);
    assert_eq!(service.running_jobs(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submitters_get_distinct_ids() -> Result<(), Box<dyn Error>> {
    let service = start(2, engine()).await?;

    let submissions = (0..200).map(|_| {
        let service = service.clone();
        async move { service.submit(global_mean()).await }
    });
    let ids = join_all(submissions)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let unique: HashSet<JobId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 200);
    assert_eq!(ids.iter().map(|id| id.seq()).max(), Some(200));
    assert_eq!(service.registry().len(), 200);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queued_tasks_wait_for_a_free_worker() -> Result<(), Box<dyn Error>> {
    let gate = Gate::new();
    let service = start(1, gated(gate.clone(), engine())).await?;

    for _ in 0..3 {
        service.submit(global_mean()).await?;
    }

    // The single worker holds one task; the rest stay queued.
    let backlog = tokio::time::timeout(TIMEOUT, async {
        loop {
            match service.queue_stats().await {
                Some(stats) if stats.pending == 2 => return Some(stats),
                Some(_) => tokio::time::sleep(std::time::Duration::from_millis(5)).await,
                None => return None,
            }
        }
    })
    .await?
    .ok_or("queue stopped")?;
    assert_eq!(backlog.idle_workers, 0);
    assert!(!backlog.draining);
    assert_eq!(service.running_jobs(), 3);

    gate.open();
    for seq in 1..=3 {
        wait_done(&service, JobId::from_seq(seq).ok_or("zero id")?).await?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_computation_is_stored_as_the_result() -> Result<(), Box<dyn Error>> {
    let service = start(2, engine()).await?;

    let id = service
        .submit(StatRequest::StateMean {
            question: OBESITY.to_string(),
            state: "Atlantis".to_string(),
        })
        .await?;

    let result = wait_done(&service, id).await?;
    assert_eq!(
        result,
        ComputeError::no_rows(OBESITY, Some("Atlantis")).to_result()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_computation_completes_the_job() -> Result<(), Box<dyn Error>> {
    let compute = Arc::new(|request: &StatRequest| -> Result<Value, ComputeError> {
        if request.question() == "boom" {
            panic!("bad input");
        }
        Ok(json!({"ok": true}))
    });
    let service = start(1, compute).await?;

    let failed = service
        .submit(StatRequest::Best5 {
            question: "boom".to_string(),
        })
        .await?;
    let result = wait_done(&service, failed).await?;
    assert_eq!(result, ComputeError::Panicked("bad input".to_string()).to_result());

    // The worker survives and keeps serving.
    let next = service.submit(global_mean()).await?;
    assert_eq!(wait_done(&service, next).await?, json!({"ok": true}));
    assert_eq!(service.workers_spawned(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unwritable_result_leaves_the_job_running() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    // A directory where job 1's result file belongs makes that write fail.
    std::fs::create_dir(dir.path().join("job_id_1.json"))?;
    let results = ResultStore::new(Storage::new(StorageConfig::filesystem(dir.path()))?);

    let (service, _handle) = JobService::start(pool(1), engine(), results).await?;
    let blocked = service.submit(global_mean()).await?;
    let written = service.submit(global_mean()).await?;

    assert_eq!(wait_done(&service, written).await?, json!({"global_mean": 20.0}));
    // One worker runs tasks in order, so job 1 has already been attempted.
    assert_eq!(service.state(blocked), Some(JobState::Running));
    assert_eq!(service.running_jobs(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn computation_that_never_returns_stalls_only_its_worker() -> Result<(), Box<dyn Error>> {
    let gate = Gate::new();
    let stalled_engine = engine();
    let blocker = gate.clone();
    let compute = Arc::new(move |request: &StatRequest| {
        if request.question() == "stall" {
            blocker.wait();
        }
        stalled_engine.compute(request)
    });
    let service = start(3, compute).await?;

    let stalled = service
        .submit(StatRequest::GlobalMean {
            question: "stall".to_string(),
        })
        .await?;

    let mut later = Vec::new();
    for _ in 0..30 {
        later.push(service.submit(global_mean()).await?);
    }
    for id in later {
        assert_eq!(wait_done(&service, id).await?, json!({"global_mean": 20.0}));
    }

    // Nothing times the computation out; the job stays running.
    assert_eq!(service.state(stalled), Some(JobState::Running));
    assert_eq!(service.lookup(stalled).await?, JobLookup::Running);
    assert_eq!(service.running_jobs(), 1);
    assert_eq!(service.workers_spawned(), 3);

    gate.open();
    wait_done(&service, stalled).await?;
    Ok(())
}
