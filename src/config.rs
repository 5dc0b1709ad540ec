use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assessment::{DEFAULT_HARD_TASK_THRESHOLD, DEFAULT_WEAK_STUDENT_RATIO};
use crate::dashboard::DEFAULT_TOP_STUDENTS;
use crate::error::ScoreError;
use crate::models::{StatusLabel, StatusTier};
use crate::scorer::{StatusLadder, DEFAULT_CUTOFF};

/// Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub cutoff: f64,
    pub top_n: usize,
    pub tiers: Vec<StatusTier>,
    pub fallback: StatusLabel,
    pub hard_task_threshold: f64,
    pub weak_student_ratio: f64,
    pub dashboard_top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let ladder = StatusLadder::default();
        Self {
            cutoff: DEFAULT_CUTOFF,
            top_n: 5,
            tiers: ladder.tiers().to_vec(),
            fallback: ladder.fallback(),
            hard_task_threshold: DEFAULT_HARD_TASK_THRESHOLD,
            weak_student_ratio: DEFAULT_WEAK_STUDENT_RATIO,
            dashboard_top_n: DEFAULT_TOP_STUDENTS,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "loaded analysis config");
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn ladder(&self) -> Result<StatusLadder, ScoreError> {
        StatusLadder::from_tiers(self.tiers.clone(), self.fallback)
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        if !self.cutoff.is_finite() {
            return Err(ScoreError::InvalidCutoff(self.cutoff));
        }
        if self.top_n == 0 || self.dashboard_top_n == 0 {
            return Err(ScoreError::InvalidTopN);
        }
        if !self.hard_task_threshold.is_finite() {
            return Err(ScoreError::InvalidParameter(format!(
                "hard task threshold must be finite, got {}",
                self.hard_task_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.weak_student_ratio) {
            return Err(ScoreError::InvalidParameter(format!(
                "weak student ratio must be within 0..=1, got {}",
                self.weak_student_ratio
            )));
        }
        self.ladder()?;
        Ok(())
    }
}
