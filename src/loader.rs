use std::path::Path;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::models::{QuarterlyRow, QuarterlyTable, ResultRow, ResultTable, TaskInfo};

fn reader_for(path: &Path) -> anyhow::Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

fn parse_score(raw: &str, path: &Path, line: usize, column: &str) -> anyhow::Result<f64> {
    if raw.is_empty() {
        bail!("{}:{line}: missing score for {column}", path.display());
    }

    let value: f64 = raw
        .parse()
        .with_context(|| format!("{}:{line}: invalid score {raw:?} for {column}", path.display()))?;

    if !value.is_finite() {
        bail!("{}:{line}: score for {column} is not finite", path.display());
    }

    Ok(value)
}

/// Reads a journal where the first column names the person and every other
/// column is a scored category.
pub fn load_results(path: &Path) -> anyhow::Result<ResultTable> {
    let mut reader = reader_for(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();

    if headers.len() < 2 {
        bail!(
            "{} must have a person column and at least one score column",
            path.display()
        );
    }

    let person_label = headers[0].to_string();
    let categories: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut rows = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = record.with_context(|| format!("{}:{line}: malformed row", path.display()))?;
        let person = record.get(0).unwrap_or_default().to_string();
        let scores = categories
            .iter()
            .enumerate()
            .map(|(column, category)| {
                parse_score(record.get(column + 1).unwrap_or_default(), path, line, category)
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;

        rows.push(ResultRow { person, scores });
    }

    info!(
        path = %path.display(),
        rows = rows.len(),
        categories = categories.len(),
        "loaded result table"
    );

    Ok(ResultTable::new(categories, rows).with_person_label(person_label))
}

/// Reads a long-format journal: person, quarter, then one column per subject.
pub fn load_quarterly(path: &Path) -> anyhow::Result<QuarterlyTable> {
    let mut reader = reader_for(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();

    if headers.len() < 3 {
        bail!(
            "{} must have person, quarter and at least one subject column",
            path.display()
        );
    }

    let subjects: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();
    let mut rows = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = record.with_context(|| format!("{}:{line}: malformed row", path.display()))?;
        let scores = subjects
            .iter()
            .enumerate()
            .map(|(column, subject)| {
                parse_score(record.get(column + 2).unwrap_or_default(), path, line, subject)
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;

        rows.push(QuarterlyRow {
            person: record.get(0).unwrap_or_default().to_string(),
            quarter: record.get(1).unwrap_or_default().to_string(),
            scores,
        });
    }

    info!(path = %path.display(), rows = rows.len(), "loaded quarterly journal");
    Ok(QuarterlyTable { subjects, rows })
}

pub fn load_task_info(path: &Path) -> anyhow::Result<Vec<TaskInfo>> {
    let mut reader = reader_for(path)?;
    let mut tasks = Vec::new();

    for (index, result) in reader.deserialize::<TaskInfo>().enumerate() {
        let info =
            result.with_context(|| format!("{}:{}: malformed task row", path.display(), index + 2))?;
        tasks.push(info);
    }

    debug!(path = %path.display(), tasks = tasks.len(), "loaded task info");
    Ok(tasks)
}

const SUBJECTS: [&str; 5] = ["Math", "Russian", "Physics", "Chemistry", "History"];
const QUARTERS: [&str; 4] = ["I", "II", "III", "IV"];

fn sample_journal() -> Vec<(&'static str, [u8; 5])> {
    vec![
        ("Avery Lee", [5, 5, 4, 5, 5]),
        ("Jules Moreno", [4, 4, 5, 4, 4]),
        ("Kiara Patel", [3, 4, 3, 3, 4]),
        ("Noah Kim", [5, 4, 4, 4, 5]),
        ("Mila Novak", [3, 3, 2, 3, 3]),
        ("Omar Haddad", [4, 5, 4, 3, 4]),
        ("Sofia Rossi", [5, 5, 5, 5, 4]),
        ("Leo Fischer", [3, 3, 4, 4, 3]),
    ]
}

/// Grade in 3..=5, scattered enough to look like a real class.
fn quarterly_grade(student: usize, quarter: usize, subject: usize) -> u8 {
    let mix = student * 7 + quarter * 3 + subject * 5 + (student * subject) % 4;
    3 + (mix % 3) as u8
}

/// Writes a small deterministic dataset for every command.
pub fn write_sample_data(dir: &Path) -> anyhow::Result<Vec<std::path::PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut written = Vec::new();

    let journal_path = dir.join("journal.csv");
    let mut writer = csv::Writer::from_path(&journal_path)?;
    writer.write_record(std::iter::once("student").chain(SUBJECTS))?;
    for (name, grades) in sample_journal() {
        let mut record = vec![name.to_string()];
        record.extend(grades.iter().map(u8::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    written.push(journal_path);

    let students: Vec<String> = (1..=30).map(|i| format!("Student {i}")).collect();
    let mut generated = Vec::new();
    for (student_index, student) in students.iter().enumerate() {
        for (quarter_index, quarter) in QUARTERS.iter().enumerate() {
            let mut record = vec![student.clone(), quarter.to_string()];
            record.extend(
                (0..SUBJECTS.len())
                    .map(|subject| quarterly_grade(student_index, quarter_index, subject).to_string()),
            );
            generated.push(record);
        }
    }

    let quarterly_path = dir.join("quarterly.csv");
    let mut writer = csv::Writer::from_path(&quarterly_path)?;
    writer.write_record(["student", "quarter"].into_iter().chain(SUBJECTS))?;
    for record in &generated {
        writer.write_record(record)?;
    }
    writer.flush()?;
    written.push(quarterly_path);

    let tasks = ["T1", "T2", "T3", "T4", "T5", "T6"];
    let answers: [(&str, [u8; 6]); 6] = [
        ("Avery Lee", [1, 1, 1, 0, 1, 1]),
        ("Jules Moreno", [1, 0, 1, 0, 1, 0]),
        ("Kiara Patel", [1, 0, 0, 0, 1, 0]),
        ("Noah Kim", [1, 1, 1, 1, 1, 0]),
        ("Mila Novak", [0, 0, 1, 0, 0, 1]),
        ("Omar Haddad", [1, 1, 0, 0, 1, 1]),
    ];

    let results_path = dir.join("test_results.csv");
    let mut writer = csv::Writer::from_path(&results_path)?;
    writer.write_record(std::iter::once("student").chain(tasks))?;
    for (name, row) in answers {
        let mut record = vec![name.to_string()];
        record.extend(row.iter().map(u8::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    written.push(results_path);

    let info_path = dir.join("test_info.csv");
    let mut writer = csv::Writer::from_path(&info_path)?;
    let themes = [
        ("T1", "Fractions", "easy"),
        ("T2", "Fractions", "medium"),
        ("T3", "Equations", "easy"),
        ("T4", "Equations", "hard"),
        ("T5", "Geometry", "easy"),
        ("T6", "Geometry", "medium"),
    ];
    for (task, theme, difficulty) in themes {
        writer.serialize(TaskInfo {
            task: task.to_string(),
            theme: theme.to_string(),
            difficulty: difficulty.to_string(),
        })?;
    }
    writer.flush()?;
    written.push(info_path);

    info!(dir = %dir.display(), files = written.len(), "wrote sample data");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_journal_with_person_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.csv");
        fs::write(&path, "student,Math,History\nAlice, 5 ,4\nBob,3,3\n").unwrap();

        let table = load_results(&path).unwrap();
        assert_eq!(table.person_label, "student");
        assert_eq!(table.categories, vec!["Math", "History"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].person, "Alice");
        assert_eq!(table.rows[0].scores, vec![5.0, 4.0]);
        assert_eq!(table.rows[1].scores, vec![3.0, 3.0]);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load_results(Path::new("/nonexistent/journal.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/journal.csv"));
    }

    #[test]
    fn non_numeric_score_names_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.csv");
        fs::write(&path, "student,Math\nAlice,five\n").unwrap();

        let err = load_results(&path).unwrap_err();
        assert!(err.to_string().contains(":2: invalid score"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.csv");
        fs::write(&path, "student,Math,History\nAlice,5\n").unwrap();

        assert!(load_results(&path).is_err());
    }

    #[test]
    fn header_without_categories_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.csv");
        fs::write(&path, "student\nAlice\n").unwrap();

        assert!(load_results(&path).is_err());
    }

    #[test]
    fn loads_quarterly_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarterly.csv");
        fs::write(&path, "student,quarter,Math\nAlice,I,5\nAlice,II,4\n").unwrap();

        let table = load_quarterly(&path).unwrap();
        assert_eq!(table.subjects, vec!["Math"]);
        assert_eq!(table.rows[1].quarter, "II");
        assert_eq!(table.rows[1].scores, vec![4.0]);
    }

    #[test]
    fn sample_data_round_trips_through_loaders() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_sample_data(dir.path()).unwrap();
        assert_eq!(written.len(), 4);

        let journal = load_results(&dir.path().join("journal.csv")).unwrap();
        assert_eq!(journal.categories.len(), SUBJECTS.len());
        assert_eq!(journal.rows.len(), 8);

        let quarterly = load_quarterly(&dir.path().join("quarterly.csv")).unwrap();
        assert_eq!(quarterly.rows.len(), 30 * QUARTERS.len());
        assert!(quarterly
            .rows
            .iter()
            .flat_map(|row| row.scores.iter())
            .all(|grade| (3.0..=5.0).contains(grade)));

        let info = load_task_info(&dir.path().join("test_info.csv")).unwrap();
        assert_eq!(info.len(), 6);
        assert_eq!(info[3].theme, "Equations");
    }
}
