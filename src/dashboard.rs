use std::collections::HashMap;

use serde::Serialize;

use crate::error::ScoreError;
use crate::models::QuarterlyTable;
use crate::scorer::{mean, rank_descending};

pub const DEFAULT_TOP_STUDENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMean {
    pub subject: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentMean {
    pub person: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub grade: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterTrend {
    pub quarter: String,
    pub subject_means: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentQuarterMean {
    pub person: String,
    pub quarter: String,
    pub subject_means: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSpread {
    pub subject: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub student_count: usize,
    pub subjects: Vec<String>,
    pub subject_means: Vec<SubjectMean>,
    pub grade_distribution: Vec<GradeCount>,
    pub top_students: Vec<StudentMean>,
    pub quarter_trends: Vec<QuarterTrend>,
    pub student_quarter_means: Vec<StudentQuarterMean>,
    pub subject_spread: Vec<SubjectSpread>,
    pub overall_mean: Option<f64>,
    pub overall_std: Option<f64>,
}

/// Groups values by key, keeping keys in first-appearance order.
fn group_in_order<'a, T>(
    items: impl Iterator<Item = (&'a str, T)>,
) -> Vec<(String, Vec<T>)> {
    let mut order: Vec<(String, Vec<T>)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for (key, value) in items {
        let slot = *index.entry(key).or_insert_with(|| {
            order.push((key.to_string(), Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(value);
    }

    order
}

fn column_means(rows: &[&Vec<f64>], width: usize) -> Vec<f64> {
    (0..width)
        .map(|column| {
            let values: Vec<f64> = rows.iter().map(|scores| scores[column]).collect();
            mean(&values).unwrap_or(f64::NAN)
        })
        .collect()
}

pub fn subject_means(table: &QuarterlyTable) -> Vec<SubjectMean> {
    let rows: Vec<&Vec<f64>> = table.rows.iter().map(|row| &row.scores).collect();
    column_means(&rows, table.subjects.len())
        .into_iter()
        .zip(&table.subjects)
        .map(|(mean, subject)| SubjectMean {
            subject: subject.clone(),
            mean,
        })
        .collect()
}

/// Per student: mean over quarters for each subject, then mean over subjects.
pub fn student_means(table: &QuarterlyTable) -> Vec<StudentMean> {
    let width = table.subjects.len();
    group_in_order(
        table
            .rows
            .iter()
            .map(|row| (row.person.as_str(), &row.scores)),
    )
    .into_iter()
    .map(|(person, rows)| {
        let per_subject = column_means(&rows, width);
        StudentMean {
            person,
            mean: mean(&per_subject).unwrap_or(f64::NAN),
        }
    })
    .collect()
}

pub fn grade_distribution(table: &QuarterlyTable) -> Vec<GradeCount> {
    let mut grades: Vec<f64> = table
        .rows
        .iter()
        .flat_map(|row| row.scores.iter().copied())
        .collect();
    grades.sort_by(f64::total_cmp);

    let mut counts: Vec<GradeCount> = Vec::new();
    for grade in grades {
        match counts.last_mut() {
            Some(last) if last.grade == grade => last.count += 1,
            _ => counts.push(GradeCount { grade, count: 1 }),
        }
    }
    counts
}

pub fn top_students(table: &QuarterlyTable, n: usize) -> Result<Vec<StudentMean>, ScoreError> {
    if n == 0 {
        return Err(ScoreError::InvalidTopN);
    }

    let mut ranked = rank_descending(&student_means(table), |student| student.mean);
    ranked.truncate(n);
    Ok(ranked)
}

pub fn quarter_trends(table: &QuarterlyTable) -> Vec<QuarterTrend> {
    let width = table.subjects.len();
    group_in_order(
        table
            .rows
            .iter()
            .map(|row| (row.quarter.as_str(), &row.scores)),
    )
    .into_iter()
    .map(|(quarter, rows)| QuarterTrend {
        quarter,
        subject_means: column_means(&rows, width),
    })
    .collect()
}

/// Mean per subject for every (student, quarter) pair, students in
/// first-appearance order and quarters in first-appearance order per student.
pub fn student_quarter_means(table: &QuarterlyTable) -> Vec<StudentQuarterMean> {
    let width = table.subjects.len();
    group_in_order(table.rows.iter().map(|row| (row.person.as_str(), row)))
        .into_iter()
        .flat_map(|(person, rows)| {
            group_in_order(rows.into_iter().map(|row| (row.quarter.as_str(), &row.scores)))
                .into_iter()
                .map(move |(quarter, scores)| StudentQuarterMean {
                    person: person.clone(),
                    quarter,
                    subject_means: column_means(&scores, width),
                })
        })
        .collect()
}

/// Linear interpolation between closest ranks over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

pub fn subject_spread(table: &QuarterlyTable) -> Vec<SubjectSpread> {
    if table.rows.is_empty() {
        return Vec::new();
    }

    table
        .subjects
        .iter()
        .enumerate()
        .map(|(column, subject)| {
            let mut values: Vec<f64> = table.rows.iter().map(|row| row.scores[column]).collect();
            values.sort_by(f64::total_cmp);
            SubjectSpread {
                subject: subject.clone(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
            }
        })
        .collect()
}

fn all_grades(table: &QuarterlyTable) -> Vec<f64> {
    table
        .rows
        .iter()
        .flat_map(|row| row.scores.iter().copied())
        .collect()
}

pub fn overall_mean(table: &QuarterlyTable) -> Option<f64> {
    mean(&all_grades(table))
}

/// Sample standard deviation (n - 1) over every grade.
pub fn overall_std(table: &QuarterlyTable) -> Option<f64> {
    let grades = all_grades(table);
    if grades.len() < 2 {
        return None;
    }

    let avg = mean(&grades)?;
    let variance =
        grades.iter().map(|grade| (grade - avg).powi(2)).sum::<f64>() / (grades.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn build_dashboard(table: &QuarterlyTable, top_n: usize) -> Result<Dashboard, ScoreError> {
    if table.rows.is_empty() {
        return Err(ScoreError::EmptyTable);
    }

    Ok(Dashboard {
        student_count: student_means(table).len(),
        subjects: table.subjects.clone(),
        subject_means: subject_means(table),
        grade_distribution: grade_distribution(table),
        top_students: top_students(table, top_n)?,
        quarter_trends: quarter_trends(table),
        student_quarter_means: student_quarter_means(table),
        subject_spread: subject_spread(table),
        overall_mean: overall_mean(table),
        overall_std: overall_std(table),
    })
}
