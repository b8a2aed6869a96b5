//! Job domain types for submitted statistic requests.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::StatRequest;

const JOB_ID_PREFIX: &str = "job_id_";

/// Process-local job identifier, rendered as `job_id_<n>` with `n` starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    /// The first id allocated in a process.
    pub const FIRST: JobId = JobId(1);

    /// The id allocated right after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Build an id from its sequence number. Returns `None` for zero.
    pub fn from_seq(seq: u64) -> Option<Self> {
        (seq > 0).then_some(Self(seq))
    }

    /// The sequence number behind this id.
    pub fn seq(self) -> u64 {
        self.0
    }

    /// Parse a job ID from its `job_id_<n>` form.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix(JOB_ID_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u64>().ok().and_then(Self::from_seq)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", JOB_ID_PREFIX, self.0)
    }
}

impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid job id: {raw}")))
    }
}

/// Lifecycle state of a job. A job moves from `Running` to `Done` exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Running,
    Done,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, JobState::Done)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request annotated with the job it belongs to; the unit handed to workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub job_id: JobId,
    #[serde(flatten)]
    pub request: StatRequest,
}

impl Task {
    pub fn new(job_id: JobId, request: StatRequest) -> Self {
        Self { job_id, request }
    }
}
