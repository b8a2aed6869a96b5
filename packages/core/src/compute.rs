//! The seam between workers and the statistics that answer requests.

use serde_json::Value;

use crate::StatRequest;

/// Computes the answer to a request.
///
/// One instance is shared by every worker, so implementations only read
/// shared data.
pub trait Compute: Send + Sync + 'static {
    fn compute(&self, request: &StatRequest) -> Result<Value, ComputeError>;
}

impl<F> Compute for F
where
    F: Fn(&StatRequest) -> Result<Value, ComputeError> + Send + Sync + 'static,
{
    fn compute(&self, request: &StatRequest) -> Result<Value, ComputeError> {
        self(request)
    }
}

/// Errors a computation can end with. Both are recorded as the job's result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    #[error("no rows match question {question:?}{}", state_suffix(.state))]
    NoMatchingRows {
        question: String,
        state: Option<String>,
    },

    #[error("computation panicked: {0}")]
    Panicked(String),
}

fn state_suffix(state: &Option<String>) -> String {
    state.as_deref().map(|s| format!(" in {s}")).unwrap_or_default()
}

impl ComputeError {
    pub fn no_rows(question: &str, state: Option<&str>) -> Self {
        ComputeError::NoMatchingRows {
            question: question.to_string(),
            state: state.map(str::to_string),
        }
    }

    /// The payload stored for a job whose computation failed.
    pub fn to_result(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("error".to_string(), Value::String(self.to_string()));
        Value::Object(map)
    }
}
