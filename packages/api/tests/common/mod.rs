#![allow(clippy::disallowed_methods, dead_code)]

use std::error::Error;
use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use actors::{JobService, PoolConfig};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use job_core::{Compute, StatRequest};
use serde_json::Value;
use stats::{Dataset, Row, StatsEngine};
use storage::ResultStore;
use tower::ServiceExt;

pub const QUESTION: &str = "Percent of adults aged 18 years and older who have obesity";

pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

fn engine() -> StatsEngine {
    StatsEngine::new(Dataset::from_rows(vec![
        Row::new("A", QUESTION, 10.0).with_stratification("Gender", "Female"),
        Row::new("A", QUESTION, 20.0).with_stratification("Gender", "Male"),
        Row::new("B", QUESTION, 30.0).with_stratification("Gender", "Female"),
    ]))
}

/// Router over a fresh two-worker service with in-memory results.
pub async fn app() -> TestResult<(Router, JobService)> {
    app_with(2, Arc::new(engine())).await
}

pub async fn app_with(workers: usize, compute: Arc<dyn Compute>) -> TestResult<(Router, JobService)> {
    let workers = NonZeroUsize::new(workers).ok_or("zero workers")?;
    let (service, _handle) =
        JobService::start(PoolConfig::new(workers), compute, ResultStore::memory()?).await?;
    Ok((api::router(service.clone()), service))
}

/// Engine whose `stall` question blocks until the returned sender is dropped.
pub fn stalling_engine() -> (Arc<dyn Compute>, mpsc::Sender<()>) {
    let (release, wait) = mpsc::channel::<()>();
    let wait = Mutex::new(wait);
    let engine = engine();
    let compute = Arc::new(move |request: &StatRequest| {
        if request.question() == "stall" {
            let wait = wait.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = wait.recv_timeout(Duration::from_secs(30));
        }
        engine.compute(request)
    });
    (compute, release)
}

async fn send(router: &Router, request: Request<Body>) -> TestResult<(StatusCode, Vec<u8>)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();
    Ok((status, body.to_vec()))
}

pub async fn get(router: &Router, uri: &str) -> TestResult<(StatusCode, Value)> {
    let request = Request::builder().uri(uri).body(Body::empty())?;
    let (status, body) = send(router, request).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

pub async fn get_text(router: &Router, uri: &str) -> TestResult<(StatusCode, String)> {
    let request = Request::builder().uri(uri).body(Body::empty())?;
    let (status, body) = send(router, request).await?;
    Ok((status, String::from_utf8(body)?))
}

pub async fn post_raw(router: &Router, uri: &str, body: &str) -> TestResult<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?;
    let (status, body) = send(router, request).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

pub async fn post(router: &Router, uri: &str, body: &Value) -> TestResult<(StatusCode, Value)> {
    post_raw(router, uri, &body.to_string()).await
}

/// Submit and return the job id string.
pub async fn submit(router: &Router, kind: &str, body: &Value) -> TestResult<String> {
    let (status, json) = post(router, &format!("/api/{kind}"), body).await?;
    assert_eq!(status, StatusCode::OK, "{json}");
    let id = json["job_id"].as_str().ok_or("missing job_id")?;
    Ok(id.to_string())
}

/// Poll `get_results` until the job is done and return its data.
pub async fn wait_done(router: &Router, job_id: &str) -> TestResult<Value> {
    let uri = format!("/api/get_results/{job_id}");
    for _ in 0..2000 {
        let (_, json) = get(router, &uri).await?;
        if json["status"] == "done" {
            return Ok(json["data"].clone());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Err(format!("{job_id} never finished").into())
}
