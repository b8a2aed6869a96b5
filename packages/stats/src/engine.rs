//! The nine statistics, answered from a shared [`Dataset`].

use std::collections::BTreeMap;
use std::sync::Arc;

use job_core::{Compute, ComputeError, StatRequest};
use serde_json::{Map, Value};

use crate::dataset::Dataset;

/// Running sum and count for one group.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Answers statistic requests. Cheap to clone; the dataset is shared.
#[derive(Debug, Clone)]
pub struct StatsEngine {
    data: Arc<Dataset>,
}

impl StatsEngine {
    pub fn new(data: Dataset) -> Self {
        Self { data: Arc::new(data) }
    }

    /// Per-state means in order of first appearance.
    fn state_means(&self, question: &str) -> Vec<(String, f64)> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: BTreeMap<&str, Mean> = BTreeMap::new();
        for (row, value) in self.data.answers(question) {
            let entry = groups.entry(row.location.as_str()).or_insert_with(|| {
                order.push(row.location.clone());
                Mean::default()
            });
            entry.add(value);
        }

        order
            .into_iter()
            .filter_map(|state| {
                let mean = groups.get(state.as_str()).and_then(|m| m.value())?;
                Some((state, mean))
            })
            .collect()
    }

    fn sorted_state_means(&self, question: &str, descending: bool) -> Vec<(String, f64)> {
        let mut means = self.state_means(question);
        means.sort_by(|a, b| {
            let ord = a.1.total_cmp(&b.1);
            if descending { ord.reverse() } else { ord }
        });
        means
    }

    fn global_mean_value(&self, question: &str) -> Result<f64, ComputeError> {
        let mut mean = Mean::default();
        for (_, value) in self.data.answers(question) {
            mean.add(value);
        }
        mean.value().ok_or_else(|| ComputeError::no_rows(question, None))
    }

    fn state_mean_value(&self, question: &str, state: &str) -> Result<f64, ComputeError> {
        let mut mean = Mean::default();
        for (_, value) in self
            .data
            .answers(question)
            .filter(|(row, _)| row.location == state)
        {
            mean.add(value);
        }
        mean.value()
            .ok_or_else(|| ComputeError::no_rows(question, Some(state)))
    }

    /// Category means for one state, keyed by `key` and sorted by key.
    fn category_means(
        &self,
        question: &str,
        state: &str,
        key: impl Fn(&str, &str) -> String,
    ) -> BTreeMap<String, f64> {
        let mut groups: BTreeMap<String, Mean> = BTreeMap::new();
        for (row, value) in self.data.answers(question) {
            if row.location != state
                || row.stratification_category.is_empty()
                || row.stratification.is_empty()
            {
                continue;
            }
            groups
                .entry(key(&row.stratification_category, &row.stratification))
                .or_default()
                .add(value);
        }
        groups
            .into_iter()
            .filter_map(|(k, m)| m.value().map(|v| (k, v)))
            .collect()
    }

    pub fn states_mean(&self, question: &str) -> Result<Value, ComputeError> {
        Ok(object(self.sorted_state_means(question, false)))
    }

    pub fn state_mean(&self, question: &str, state: &str) -> Result<Value, ComputeError> {
        let mean = self.state_mean_value(question, state)?;
        Ok(single(state, Value::from(mean)))
    }

    pub fn best5(&self, question: &str) -> Result<Value, ComputeError> {
        let descending = !Dataset::best_is_min(question);
        let mut means = self.sorted_state_means(question, descending);
        means.truncate(5);
        Ok(object(means))
    }

    pub fn worst5(&self, question: &str) -> Result<Value, ComputeError> {
        let descending = Dataset::best_is_min(question);
        let mut means = self.sorted_state_means(question, descending);
        means.truncate(5);
        Ok(object(means))
    }

    pub fn global_mean(&self, question: &str) -> Result<Value, ComputeError> {
        let mean = self.global_mean_value(question)?;
        Ok(single("global_mean", Value::from(mean)))
    }

    pub fn diff_from_mean(&self, question: &str) -> Result<Value, ComputeError> {
        let global = self.global_mean_value(question)?;
        let diffs = self
            .state_means(question)
            .into_iter()
            .map(|(state, mean)| (state, global - mean))
            .collect();
        Ok(object(diffs))
    }

    pub fn state_diff_from_mean(&self, question: &str, state: &str) -> Result<Value, ComputeError> {
        let state_mean = self.state_mean_value(question, state)?;
        let global = self.global_mean_value(question)?;
        Ok(single(state, Value::from(global - state_mean)))
    }

    pub fn mean_by_category(&self, question: &str) -> Result<Value, ComputeError> {
        let mut states: Vec<String> = self
            .state_means(question)
            .into_iter()
            .map(|(state, _)| state)
            .collect();
        states.sort();

        let mut out = Map::new();
        for state in &states {
            let means = self.category_means(question, state, |category, stratification| {
                format!("('{state}', '{category}', '{stratification}')")
            });
            for (key, mean) in means {
                out.insert(key, Value::from(mean));
            }
        }

        Ok(Value::Object(out))
    }

    pub fn state_mean_by_category(&self, question: &str, state: &str) -> Result<Value, ComputeError> {
        let means = self.category_means(question, state, |category, stratification| {
            format!("('{category}', '{stratification}')")
        });

        let inner: Map<String, Value> = means
            .into_iter()
            .map(|(key, mean)| (key, Value::from(mean)))
            .collect();
        Ok(single(state, Value::Object(inner)))
    }
}

impl Compute for StatsEngine {
    fn compute(&self, request: &StatRequest) -> Result<Value, ComputeError> {
        match request {
            StatRequest::StatesMean { question } => self.states_mean(question),
            StatRequest::StateMean { question, state } => self.state_mean(question, state),
            StatRequest::Best5 { question } => self.best5(question),
            StatRequest::Worst5 { question } => self.worst5(question),
            StatRequest::GlobalMean { question } => self.global_mean(question),
            StatRequest::DiffFromMean { question } => self.diff_from_mean(question),
            StatRequest::StateDiffFromMean { question, state } => {
                self.state_diff_from_mean(question, state)
            }
            StatRequest::MeanByCategory { question } => self.mean_by_category(question),
            StatRequest::StateMeanByCategory { question, state } => {
                self.state_mean_by_category(question, state)
            }
        }
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn object(pairs: Vec<(String, f64)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect(),
    )
}
