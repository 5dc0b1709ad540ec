use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::assessment::AssessmentSummary;
use crate::models::{CategoryStats, ClassifiedRow, ResultTable};
use crate::report::ReportContext;
use crate::scorer::class_average;

fn writer_for(path: &Path) -> anyhow::Result<Writer<std::fs::File>> {
    Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

/// Scored journal with an `underperforming` flag in place of a red row fill.
pub fn write_scored_sheet(
    path: &Path,
    table: &ResultTable,
    rows: &[ClassifiedRow],
    cutoff: f64,
) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;

    let mut header = vec![table.person_label.clone()];
    header.extend(table.categories.iter().cloned());
    header.extend(["average", "status", "underperforming"].map(str::to_string));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.person.clone()];
        record.extend(row.scores.iter().map(f64::to_string));
        record.push(format!("{:.2}", row.aggregate));
        record.push(row.status.to_string());
        record.push((row.aggregate < cutoff).to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote scored sheet");
    Ok(())
}

pub fn write_category_sheet(path: &Path, stats: &[CategoryStats]) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut writer = writer_for(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_test_sheets(
    dir: &Path,
    matrix: &ResultTable,
    summary: &AssessmentSummary,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let matrix_path = dir.join("answer_matrix.csv");
    let mut writer = writer_for(&matrix_path)?;
    let mut header = vec![matrix.person_label.clone()];
    header.extend(matrix.categories.iter().cloned());
    writer.write_record(&header)?;
    for row in &matrix.rows {
        let mut record = vec![row.person.clone()];
        record.extend(row.scores.iter().map(f64::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    let tasks_path = dir.join("task_stats.csv");
    write_rows(&tasks_path, &summary.tasks)?;

    let themes_path = dir.join("themes.csv");
    write_rows(&themes_path, &summary.themes)?;

    let students_path = dir.join("students.csv");
    write_rows(&students_path, &summary.totals)?;

    Ok(vec![matrix_path, tasks_path, themes_path, students_path])
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub class_average: Option<f64>,
    pub cutoff: f64,
    pub top: Vec<String>,
    pub underperformers: Vec<String>,
}

impl RunSummary {
    pub fn new(
        ctx: &ReportContext,
        scored: &[ClassifiedRow],
        top: &[ClassifiedRow],
        underperformers: &[ClassifiedRow],
        cutoff: f64,
    ) -> Self {
        Self {
            run_id: ctx.run_id,
            generated_at: ctx.generated_at,
            total: scored.len(),
            class_average: class_average(scored),
            cutoff,
            top: top.iter().map(|row| row.person.clone()).collect(),
            underperformers: underperformers
                .iter()
                .map(|row| row.person.clone())
                .collect(),
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::analyze;
    use crate::models::ResultRow;
    use crate::scorer::{
        classify_status, compute_aggregate, select_top_n, select_underperformers,
        summarize_by_category, StatusLadder,
    };
    use std::fs;

    fn journal() -> ResultTable {
        ResultTable::new(
            vec!["Math".to_string(), "History".to_string()],
            vec![
                ResultRow {
                    person: "Alice".to_string(),
                    scores: vec![5.0, 4.0],
                },
                ResultRow {
                    person: "Bob".to_string(),
                    scores: vec![3.0, 3.0],
                },
            ],
        )
        .with_person_label("student")
    }

    #[test]
    fn scored_sheet_flags_underperformers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        let table = journal();
        let rows = classify_status(compute_aggregate(&table).unwrap(), &StatusLadder::default());

        write_scored_sheet(&path, &table, &rows, 3.5).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "student,Math,History,average,status,underperforming");
        assert_eq!(lines[1], "Alice,5,4,4.50,Excellent,false");
        assert_eq!(lines[2], "Bob,3,3,3.00,At risk,true");
    }

    #[test]
    fn category_sheet_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.csv");
        let stats = summarize_by_category(&journal()).unwrap();

        write_category_sheet(&path, &stats).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "category,mean,min,max");
        assert_eq!(lines[1], "Math,4.0,3.0,5.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_sheets_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let matrix = ResultTable::new(
            vec!["T1".to_string()],
            vec![ResultRow {
                person: "Ann".to_string(),
                scores: vec![1.0],
            }],
        );
        let summary = analyze(&matrix, &[], 60.0, 0.6).unwrap();

        let written = write_test_sheets(dir.path(), &matrix, &summary).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|path| path.exists()));
    }

    #[test]
    fn summary_json_names_people() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let rows = classify_status(compute_aggregate(&journal()).unwrap(), &StatusLadder::default());
        let top = select_top_n(&rows, 1).unwrap();
        let under = select_underperformers(&rows, 3.5).unwrap();
        let ctx = ReportContext::new();

        write_json(&path, &RunSummary::new(&ctx, &rows, &top, &under, 3.5)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total"], 2);
        assert_eq!(value["top"][0], "Alice");
        assert_eq!(value["underperformers"][0], "Bob");
        assert_eq!(value["run_id"], ctx.run_id.to_string());
    }
}
