use std::collections::HashMap;

use crate::error::ScoreError;
use crate::models::{PersonTotal, ResultTable, TaskInfo, TaskStat, ThemeStat};
use crate::scorer::{mean, round_to};

pub const DEFAULT_HARD_TASK_THRESHOLD: f64 = 60.0;
pub const DEFAULT_WEAK_STUDENT_RATIO: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentSummary {
    pub student_count: usize,
    pub task_count: usize,
    pub tasks: Vec<TaskStat>,
    pub hard_tasks: Vec<String>,
    pub totals: Vec<PersonTotal>,
    pub weak_students: Vec<PersonTotal>,
    pub themes: Vec<ThemeStat>,
    pub theme_recommendations: Vec<String>,
}

/// Every row must hold one 0 or 1 per task.
pub fn validate_matrix(matrix: &ResultTable) -> Result<(), ScoreError> {
    for row in &matrix.rows {
        if row.scores.len() != matrix.categories.len() {
            return Err(ScoreError::InvalidParameter(format!(
                "{} has {} answers but the test has {} tasks",
                row.person,
                row.scores.len(),
                matrix.categories.len()
            )));
        }

        if let Some(index) = row
            .scores
            .iter()
            .position(|&answer| answer != 0.0 && answer != 1.0)
        {
            return Err(ScoreError::InvalidParameter(format!(
                "answer of {} to {} must be 0 or 1, got {}",
                row.person, matrix.categories[index], row.scores[index]
            )));
        }
    }

    Ok(())
}

pub fn task_stats(matrix: &ResultTable, info: &[TaskInfo]) -> Result<Vec<TaskStat>, ScoreError> {
    if matrix.is_empty() {
        return Err(ScoreError::EmptyTable);
    }
    validate_matrix(matrix)?;

    let total = matrix.rows.len();
    let stats = matrix
        .categories
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let correct: f64 = matrix
                .rows
                .iter()
                .map(|row| row.scores[index])
                .sum();
            let meta = info.iter().find(|entry| &entry.task == task);
            TaskStat {
                task: task.clone(),
                correct,
                total,
                pct_correct: round_to(correct / total as f64 * 100.0, 1),
                theme: meta.map(|entry| entry.theme.clone()),
                difficulty: meta.map(|entry| entry.difficulty.clone()),
            }
        })
        .collect();

    Ok(stats)
}

pub fn hard_tasks(stats: &[TaskStat], threshold: f64) -> Vec<String> {
    stats
        .iter()
        .filter(|stat| stat.pct_correct < threshold)
        .map(|stat| stat.task.clone())
        .collect()
}

pub fn personal_totals(matrix: &ResultTable) -> Vec<PersonTotal> {
    matrix
        .rows
        .iter()
        .map(|row| PersonTotal {
            person: row.person.clone(),
            correct: row.scores.iter().sum(),
        })
        .collect()
}

pub fn weak_students(matrix: &ResultTable, ratio: f64) -> Result<Vec<PersonTotal>, ScoreError> {
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return Err(ScoreError::InvalidParameter(format!(
            "weak student ratio must be within 0..=1, got {ratio}"
        )));
    }

    validate_matrix(matrix)?;

    let bar = matrix.categories.len() as f64 * ratio;
    Ok(personal_totals(matrix)
        .into_iter()
        .filter(|total| total.correct < bar)
        .collect())
}

/// Mean pass rate per theme, weakest first. Tasks without a theme are left out.
pub fn theme_stats(stats: &[TaskStat]) -> Vec<ThemeStat> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<f64>> = HashMap::new();

    for stat in stats {
        let Some(theme) = &stat.theme else {
            continue;
        };
        if !grouped.contains_key(theme) {
            order.push(theme.clone());
        }
        grouped
            .entry(theme.clone())
            .or_default()
            .push(stat.pct_correct);
    }

    let mut themes: Vec<ThemeStat> = order
        .into_iter()
        .map(|theme| {
            let mean_pct = grouped
                .get(&theme)
                .and_then(|values| mean(values))
                .unwrap_or(0.0);
            ThemeStat { theme, mean_pct }
        })
        .collect();

    themes.sort_by(|a, b| a.mean_pct.total_cmp(&b.mean_pct));
    themes
}

pub fn theme_recommendations(themes: &[ThemeStat], threshold: f64) -> Vec<String> {
    themes
        .iter()
        .filter(|theme| theme.mean_pct < threshold)
        .map(|theme| theme.theme.clone())
        .collect()
}

pub fn analyze(
    matrix: &ResultTable,
    info: &[TaskInfo],
    hard_threshold: f64,
    weak_ratio: f64,
) -> Result<AssessmentSummary, ScoreError> {
    if !hard_threshold.is_finite() {
        return Err(ScoreError::InvalidParameter(format!(
            "hard task threshold must be finite, got {hard_threshold}"
        )));
    }

    let tasks = task_stats(matrix, info)?;
    let themes = theme_stats(&tasks);

    Ok(AssessmentSummary {
        student_count: matrix.rows.len(),
        task_count: matrix.categories.len(),
        hard_tasks: hard_tasks(&tasks, hard_threshold),
        totals: personal_totals(matrix),
        weak_students: weak_students(matrix, weak_ratio)?,
        theme_recommendations: theme_recommendations(&themes, hard_threshold),
        themes,
        tasks,
    })
}
