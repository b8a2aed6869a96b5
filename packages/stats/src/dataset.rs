//! In-memory survey table loaded once at startup.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

/// Questions where a lower value is the better outcome.
pub const QUESTIONS_BEST_IS_MIN: [&str; 5] = [
    "Percent of adults aged 18 years and older who have an overweight classification",
    "Percent of adults aged 18 years and older who have obesity",
    "Percent of adults who engage in no leisure-time physical activity",
    "Percent of adults who report consuming fruit less than one time daily",
    "Percent of adults who report consuming vegetables less than one time daily",
];

/// Questions where a higher value is the better outcome.
pub const QUESTIONS_BEST_IS_MAX: [&str; 4] = [
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic physical activity and engage in muscle-strengthening activities on 2 or more days a week",
    "Percent of adults who achieve at least 300 minutes a week of moderate-intensity aerobic physical activity or 150 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who engage in muscle-strengthening activities on 2 or more days a week",
];

/// One survey row. Only the columns the statistics read are kept.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Row {
    #[serde(rename = "LocationDesc")]
    pub location: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Data_Value", deserialize_with = "blank_as_none")]
    pub data_value: Option<f64>,
    #[serde(rename = "Stratification1", default)]
    pub stratification: String,
    #[serde(rename = "StratificationCategory1", default)]
    pub stratification_category: String,
    #[serde(rename = "Age(years)", default)]
    pub age: String,
    #[serde(rename = "Education", default)]
    pub education: String,
    #[serde(rename = "Gender", default)]
    pub gender: String,
    #[serde(rename = "Income", default)]
    pub income: String,
    #[serde(rename = "Race/Ethnicity", default)]
    pub race_ethnicity: String,
}

impl Row {
    /// Shorthand used by tests and fixtures.
    pub fn new(location: &str, question: &str, data_value: f64) -> Self {
        Self {
            location: location.to_string(),
            question: question.to_string(),
            data_value: Some(data_value),
            ..Self::default()
        }
    }

    pub fn with_stratification(mut self, category: &str, stratification: &str) -> Self {
        self.stratification_category = category.to_string();
        self.stratification = stratification.to_string();
        self
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("invalid Data_Value {trimmed:?}: {e}")))
}

/// Immutable table shared read-only by every worker.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;
        tracing::info!(path = %path.display(), rows = dataset.len(), "Loaded dataset");
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv = csv::Reader::from_reader(reader);
        let rows = csv
            .deserialize::<Row>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows answering `question` that carry a value.
    pub fn answers<'a>(&'a self, question: &'a str) -> impl Iterator<Item = (&'a Row, f64)> + 'a {
        self.rows
            .iter()
            .filter(move |row| row.question == question)
            .filter_map(|row| row.data_value.map(|v| (row, v)))
    }

    pub fn best_is_min(question: &str) -> bool {
        QUESTIONS_BEST_IS_MIN.contains(&question)
    }
}

/// Dataset loading errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
YearStart,LocationDesc,Question,Data_Value,Total,Age(years),Education,Gender,Income,Race/Ethnicity,StratificationCategory1,Stratification1
2020,Utah,Q1,36.9,,,,Male,,,Gender,Male
2020,Ohio,Q1,,,,,,,,Total,Total
2021,Ohio,Q1,40.5,Total,,,,,,Total,Total
";

    #[test]
    fn reads_csv_with_extra_columns_and_blank_values() -> Result<(), DatasetError> {
        let dataset = Dataset::from_reader(CSV.as_bytes())?;
        assert_eq!(dataset.len(), 3);

        let first = &dataset.rows()[0];
        assert_eq!(first.location, "Utah");
        assert_eq!(first.data_value, Some(36.9));
        assert_eq!(first.gender, "Male");
        assert_eq!(first.stratification_category, "Gender");
        assert_eq!(dataset.rows()[1].data_value, None);

        let values: Vec<f64> = dataset.answers("Q1").map(|(_, v)| v).collect();
        assert_eq!(values, vec![36.9, 40.5]);
        Ok(())
    }

    #[test]
    fn rejects_non_numeric_values() {
        let bad = "LocationDesc,Question,Data_Value\nUtah,Q1,lots\n";
        assert!(matches!(
            Dataset::from_reader(bad.as_bytes()),
            Err(DatasetError::Csv(_))
        ));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let result = Dataset::from_csv_path("./definitely/not/here.csv");
        assert!(matches!(result, Err(DatasetError::Open { .. })));
    }

    #[test]
    fn classifies_questions() {
        assert!(Dataset::best_is_min(QUESTIONS_BEST_IS_MIN[1]));
        assert!(!Dataset::best_is_min(QUESTIONS_BEST_IS_MAX[0]));
        assert!(QUESTIONS_BEST_IS_MAX.iter().all(|q| !Dataset::best_is_min(q)));
    }
}
