//! Statistic requests accepted by the API.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The nine statistics a client can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    StatesMean,
    StateMean,
    Best5,
    Worst5,
    GlobalMean,
    DiffFromMean,
    StateDiffFromMean,
    MeanByCategory,
    StateMeanByCategory,
}

impl RequestKind {
    pub const ALL: [RequestKind; 9] = [
        RequestKind::StatesMean,
        RequestKind::StateMean,
        RequestKind::Best5,
        RequestKind::Worst5,
        RequestKind::GlobalMean,
        RequestKind::DiffFromMean,
        RequestKind::StateDiffFromMean,
        RequestKind::MeanByCategory,
        RequestKind::StateMeanByCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::StatesMean => "states_mean",
            RequestKind::StateMean => "state_mean",
            RequestKind::Best5 => "best5",
            RequestKind::Worst5 => "worst5",
            RequestKind::GlobalMean => "global_mean",
            RequestKind::DiffFromMean => "diff_from_mean",
            RequestKind::StateDiffFromMean => "state_diff_from_mean",
            RequestKind::MeanByCategory => "mean_by_category",
            RequestKind::StateMeanByCategory => "state_mean_by_category",
        }
    }

    /// Whether the request body must name a `state`.
    pub fn requires_state(&self) -> bool {
        matches!(
            self,
            RequestKind::StateMean
                | RequestKind::StateDiffFromMean
                | RequestKind::StateMeanByCategory
        )
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RequestError::UnknownKind(s.to_string()))
    }
}

/// A validated statistic request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
pub enum StatRequest {
    StatesMean { question: String },
    StateMean { question: String, state: String },
    Best5 { question: String },
    Worst5 { question: String },
    GlobalMean { question: String },
    DiffFromMean { question: String },
    StateDiffFromMean { question: String, state: String },
    MeanByCategory { question: String },
    StateMeanByCategory { question: String, state: String },
}

impl StatRequest {
    /// Build a request of `kind` from a JSON body.
    ///
    /// `question` is always required; `state` only for the per-state kinds.
    /// Other keys in the body are ignored.
    pub fn from_payload(kind: RequestKind, payload: &Map<String, Value>) -> Result<Self, RequestError> {
        let question = required_str(payload, "question")?;
        let state = || required_str(payload, "state");

        Ok(match kind {
            RequestKind::StatesMean => StatRequest::StatesMean { question },
            RequestKind::StateMean => StatRequest::StateMean {
                question,
                state: state()?,
            },
            RequestKind::Best5 => StatRequest::Best5 { question },
            RequestKind::Worst5 => StatRequest::Worst5 { question },
            RequestKind::GlobalMean => StatRequest::GlobalMean { question },
            RequestKind::DiffFromMean => StatRequest::DiffFromMean { question },
            RequestKind::StateDiffFromMean => StatRequest::StateDiffFromMean {
                question,
                state: state()?,
            },
            RequestKind::MeanByCategory => StatRequest::MeanByCategory { question },
            RequestKind::StateMeanByCategory => StatRequest::StateMeanByCategory {
                question,
                state: state()?,
            },
        })
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            StatRequest::StatesMean { .. } => RequestKind::StatesMean,
            StatRequest::StateMean { .. } => RequestKind::StateMean,
            StatRequest::Best5 { .. } => RequestKind::Best5,
            StatRequest::Worst5 { .. } => RequestKind::Worst5,
            StatRequest::GlobalMean { .. } => RequestKind::GlobalMean,
            StatRequest::DiffFromMean { .. } => RequestKind::DiffFromMean,
            StatRequest::StateDiffFromMean { .. } => RequestKind::StateDiffFromMean,
            StatRequest::MeanByCategory { .. } => RequestKind::MeanByCategory,
            StatRequest::StateMeanByCategory { .. } => RequestKind::StateMeanByCategory,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            StatRequest::StatesMean { question }
            | StatRequest::StateMean { question, .. }
            | StatRequest::Best5 { question }
            | StatRequest::Worst5 { question }
            | StatRequest::GlobalMean { question }
            | StatRequest::DiffFromMean { question }
            | StatRequest::StateDiffFromMean { question, .. }
            | StatRequest::MeanByCategory { question }
            | StatRequest::StateMeanByCategory { question, .. } => question,
        }
    }

    pub fn state(&self) -> Option<&str> {
        match self {
            StatRequest::StateMean { state, .. }
            | StatRequest::StateDiffFromMean { state, .. }
            | StatRequest::StateMeanByCategory { state, .. } => Some(state),
            _ => None,
        }
    }
}

fn required_str(payload: &Map<String, Value>, field: &'static str) -> Result<String, RequestError> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(RequestError::InvalidField(field)),
        None => Err(RequestError::MissingField(field)),
    }
}

/// Errors raised while turning a request body into a [`StatRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("unknown request type: {0}")]
    UnknownKind(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must be a string")]
    InvalidField(&'static str),
}
