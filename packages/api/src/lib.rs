//! HTTP API for the statistics job service.
//!
//! - `POST /api/<request_type>` submits a job and returns its id
//! - `GET /api/get_results/{job_id}` polls a job
//! - `GET /api/jobs` and `GET /api/num_jobs` report on the registry
//! - `GET /api/graceful_shutdown` starts draining the worker pool

mod error;
mod jobs;

use actors::JobService;
use axum::Json;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use job_core::RequestKind;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use jobs::{JobStatusResponse, NumJobsResponse, SubmitResponse};

/// Build the application router around a running service.
pub fn router(service: JobService) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/index", get(index))
        .route("/api/get_results/{job_id}", get(jobs::get_results))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/num_jobs", get(jobs::num_jobs))
        .route("/api/graceful_shutdown", get(graceful_shutdown));

    for kind in RequestKind::ALL {
        router = router.route(
            &format!("/api/{kind}"),
            post(move |State(service): State<JobService>, body| jobs::submit(service, kind, body)),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(service)
}

/// Every route this server answers.
fn routes() -> Vec<String> {
    let mut routes = vec![
        "GET /".to_string(),
        "GET /index".to_string(),
        "GET /api/get_results/{job_id}".to_string(),
        "GET /api/jobs".to_string(),
        "GET /api/num_jobs".to_string(),
        "GET /api/graceful_shutdown".to_string(),
    ];
    routes.extend(RequestKind::ALL.iter().map(|kind| format!("POST /api/{kind}")));
    routes
}

async fn index() -> String {
    let mut page = String::from("Statistics job service\n\nDefined routes:\n");
    for route in routes() {
        page.push_str("  ");
        page.push_str(&route);
        page.push('\n');
    }
    page
}

/// Stop accepting jobs. Returns immediately; queued work keeps running.
async fn graceful_shutdown(State(service): State<JobService>) -> Json<Value> {
    service.shutdown();
    Json(json!({"status": "shutting down"}))
}
