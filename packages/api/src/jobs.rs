//! Job submission and status handlers.

use actors::{JobLookup, JobService};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use job_core::{JobId, RequestKind, StatRequest};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Status of one job as reported to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatusResponse {
    Running,
    Done { data: Value },
}

#[derive(Debug, Serialize)]
pub struct NumJobsResponse {
    pub num_jobs: usize,
}

/// Validate the body for `kind` and enqueue it.
///
/// Once shutdown has begun every submission is refused, well-formed or not.
pub async fn submit(
    service: JobService,
    kind: RequestKind,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if !service.is_accepting() {
        return Err(ApiError::ShuttingDown);
    }
    let Json(payload) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let request = StatRequest::from_payload(kind, &payload)?;
    let job_id = service.submit(request).await?;
    Ok(Json(SubmitResponse { job_id }))
}

pub async fn get_results(
    State(service): State<JobService>,
    Path(raw_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let id = JobId::parse(&raw_id).ok_or(ApiError::InvalidJobId)?;
    match service.lookup(id).await? {
        JobLookup::NotFound => Err(ApiError::InvalidJobId),
        JobLookup::Running => Ok(Json(JobStatusResponse::Running)),
        JobLookup::Done(data) => Ok(Json(JobStatusResponse::Done { data })),
    }
}

/// Every job as a single-entry `{id: state}` map, in id order.
pub async fn list_jobs(State(service): State<JobService>) -> Json<Vec<Map<String, Value>>> {
    let jobs = service
        .snapshot()
        .into_iter()
        .map(|(id, state)| {
            let mut entry = Map::new();
            entry.insert(id.to_string(), Value::from(state.as_str()));
            entry
        })
        .collect();
    Json(jobs)
}

pub async fn num_jobs(State(service): State<JobService>) -> Json<NumJobsResponse> {
    Json(NumJobsResponse {
        num_jobs: service.running_jobs(),
    })
}
