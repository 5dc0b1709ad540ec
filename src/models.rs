use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub person: String,
    pub scores: Vec<f64>,
}

/// Per-person scores, one column per category, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub person_label: String,
    pub categories: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(categories: Vec<String>, rows: Vec<ResultRow>) -> Self {
        Self {
            person_label: "person".to_string(),
            categories,
            rows,
        }
    }

    pub fn with_person_label(mut self, label: impl Into<String>) -> Self {
        self.person_label = label.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub person: String,
    pub scores: Vec<f64>,
    pub aggregate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub person: String,
    pub scores: Vec<f64>,
    pub aggregate: f64,
    pub status: StatusLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Excellent,
    Good,
    Satisfactory,
    AtRisk,
    Unknown,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Excellent => "Excellent",
            StatusLabel::Good => "Good",
            StatusLabel::Satisfactory => "Satisfactory",
            StatusLabel::AtRisk => "At risk",
            StatusLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusTier {
    pub min: f64,
    pub label: StatusLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyRow {
    pub person: String,
    pub quarter: String,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyTable {
    pub subjects: Vec<String>,
    pub rows: Vec<QuarterlyRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task: String,
    pub theme: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStat {
    pub task: String,
    pub correct: f64,
    pub total: usize,
    pub pct_correct: f64,
    pub theme: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeStat {
    pub theme: String,
    pub mean_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonTotal {
    pub person: String,
    pub correct: f64,
}
