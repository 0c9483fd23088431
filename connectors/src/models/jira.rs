use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct WorklogInsert {
    pub started: String,
    pub timeSpentSeconds: i64,
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<IssueSummary>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueSummary {
    pub key: String,
    pub fields: SummaryFields,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryFields {
    #[serde(default)]
    pub summary: String,
}
