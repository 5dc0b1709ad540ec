use tracing::debug;

use crate::error::ScoreError;
use crate::models::{
    CategoryStats, ClassifiedRow, ResultRow, ResultTable, ScoredRow, StatusLabel, StatusTier,
};

pub const DEFAULT_CUTOFF: f64 = 3.5;

/// Rounds half to even on the scaled value, so 2.675 stays 2.67 like the
/// binary value it really is.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Ordered `(minimum, label)` tiers, most selective first, with a catch-all.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLadder {
    tiers: Vec<StatusTier>,
    fallback: StatusLabel,
}

impl Default for StatusLadder {
    fn default() -> Self {
        Self {
            tiers: vec![
                StatusTier {
                    min: 4.5,
                    label: StatusLabel::Excellent,
                },
                StatusTier {
                    min: 4.0,
                    label: StatusLabel::Good,
                },
                StatusTier {
                    min: 3.5,
                    label: StatusLabel::Satisfactory,
                },
            ],
            fallback: StatusLabel::AtRisk,
        }
    }
}

impl StatusLadder {
    pub fn from_tiers(tiers: Vec<StatusTier>, fallback: StatusLabel) -> Result<Self, ScoreError> {
        for tier in &tiers {
            if !tier.min.is_finite() {
                return Err(ScoreError::InvalidLadder(format!(
                    "minimum for {} is not finite",
                    tier.label
                )));
            }
        }

        for pair in tiers.windows(2) {
            if pair[1].min >= pair[0].min {
                return Err(ScoreError::InvalidLadder(format!(
                    "{} ({}) must be below {} ({})",
                    pair[1].label, pair[1].min, pair[0].label, pair[0].min
                )));
            }
        }

        Ok(Self { tiers, fallback })
    }

    pub fn tiers(&self) -> &[StatusTier] {
        &self.tiers
    }

    pub fn fallback(&self) -> StatusLabel {
        self.fallback
    }

    pub fn label_for(&self, score: f64) -> StatusLabel {
        if !score.is_finite() {
            return StatusLabel::Unknown;
        }

        self.tiers
            .iter()
            .find(|tier| score >= tier.min)
            .map(|tier| tier.label)
            .unwrap_or(self.fallback)
    }
}

fn validate_row(table: &ResultTable, row: &ResultRow) -> Result<(), ScoreError> {
    if row.scores.is_empty() {
        return Err(ScoreError::EmptyRow {
            person: row.person.clone(),
        });
    }

    if row.scores.len() != table.categories.len() {
        return Err(ScoreError::ColumnMismatch {
            person: row.person.clone(),
            expected: table.categories.len(),
            found: row.scores.len(),
        });
    }

    if let Some(index) = row.scores.iter().position(|score| !score.is_finite()) {
        return Err(ScoreError::NonFiniteScore {
            person: row.person.clone(),
            category: table.categories[index].clone(),
        });
    }

    Ok(())
}

pub fn compute_aggregate(table: &ResultTable) -> Result<Vec<ScoredRow>, ScoreError> {
    let mut scored = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        validate_row(table, row)?;
        let aggregate = mean(&row.scores).map(round2).unwrap_or(f64::NAN);
        scored.push(ScoredRow {
            person: row.person.clone(),
            scores: row.scores.clone(),
            aggregate,
        });
    }

    debug!(rows = scored.len(), "computed aggregate scores");
    Ok(scored)
}

pub fn classify_status(rows: Vec<ScoredRow>, ladder: &StatusLadder) -> Vec<ClassifiedRow> {
    rows.into_iter()
        .map(|row| ClassifiedRow {
            status: ladder.label_for(row.aggregate),
            person: row.person,
            scores: row.scores,
            aggregate: row.aggregate,
        })
        .collect()
}

pub fn select_underperformers(
    rows: &[ClassifiedRow],
    cutoff: f64,
) -> Result<Vec<ClassifiedRow>, ScoreError> {
    if !cutoff.is_finite() {
        return Err(ScoreError::InvalidCutoff(cutoff));
    }

    Ok(rows
        .iter()
        .filter(|row| row.aggregate < cutoff)
        .cloned()
        .collect())
}

/// Stable descending ranking: equal keys keep their input order.
pub fn rank_descending<T: Clone>(items: &[T], key: impl Fn(&T) -> f64) -> Vec<T> {
    let mut ranked = items.to_vec();
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
    ranked
}

pub fn select_top_n(rows: &[ClassifiedRow], n: usize) -> Result<Vec<ClassifiedRow>, ScoreError> {
    if n == 0 {
        return Err(ScoreError::InvalidTopN);
    }

    let mut ranked = rank_descending(rows, |row| row.aggregate);
    ranked.truncate(n);
    Ok(ranked)
}

pub fn summarize_by_category(table: &ResultTable) -> Result<Vec<CategoryStats>, ScoreError> {
    if table.is_empty() {
        return Err(ScoreError::EmptyTable);
    }

    for row in &table.rows {
        validate_row(table, row)?;
    }

    let stats = table
        .categories
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let column: Vec<f64> = table.rows.iter().map(|row| row.scores[index]).collect();
            CategoryStats {
                category: category.clone(),
                mean: mean(&column).map(round2).unwrap_or(f64::NAN),
                min: column.iter().copied().fold(f64::INFINITY, f64::min),
                max: column.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect();

    Ok(stats)
}

pub fn class_average(rows: &[ClassifiedRow]) -> Option<f64> {
    let aggregates: Vec<f64> = rows.iter().map(|row| row.aggregate).collect();
    mean(&aggregates).map(round2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &[f64])]) -> ResultTable {
        let width = rows.first().map(|(_, scores)| scores.len()).unwrap_or(0);
        ResultTable::new(
            (0..width).map(|i| format!("subject{i}")).collect(),
            rows.iter()
                .map(|(person, scores)| ResultRow {
                    person: person.to_string(),
                    scores: scores.to_vec(),
                })
                .collect(),
        )
    }

    fn classified(rows: &[(&str, &[f64])]) -> Vec<ClassifiedRow> {
        let scored = compute_aggregate(&table(rows)).unwrap();
        classify_status(scored, &StatusLadder::default())
    }

    #[test]
    fn aggregate_is_rounded_mean() {
        let scored = compute_aggregate(&table(&[
            ("Alice", &[5.0, 5.0, 4.0]),
            ("Bob", &[3.0, 3.0, 3.0]),
        ]))
        .unwrap();

        assert_eq!(scored[0].aggregate, 4.67);
        assert_eq!(scored[1].aggregate, 3.0);
    }

    #[test]
    fn aggregate_ties_round_to_even() {
        let scored = compute_aggregate(&table(&[
            ("Tie down", &[4.125, 4.125]),
            ("Tie up", &[4.375, 4.375]),
            ("Exact", &[4.0, 4.5]),
        ]))
        .unwrap();

        assert_eq!(scored[0].aggregate, 4.12);
        assert_eq!(scored[1].aggregate, 4.38);
        assert_eq!(scored[2].aggregate, 4.25);
        assert_eq!(round2(13.0 / 3.0), 4.33);
        assert_eq!(round_to(0.25, 1), 0.2);
        assert_eq!(round_to(66.666, 1), 66.7);
    }

    #[test]
    fn ragged_row_is_column_mismatch() {
        let input = ResultTable::new(
            vec!["Math".to_string(), "History".to_string()],
            vec![
                ResultRow {
                    person: "Alice".to_string(),
                    scores: vec![5.0, 4.0],
                },
                ResultRow {
                    person: "Bob".to_string(),
                    scores: vec![3.0],
                },
            ],
        );

        let expected = Err(ScoreError::ColumnMismatch {
            person: "Bob".to_string(),
            expected: 2,
            found: 1,
        });
        assert_eq!(compute_aggregate(&input), expected);
        assert!(matches!(
            summarize_by_category(&input),
            Err(ScoreError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn alice_and_bob_end_to_end() {
        let rows = classified(&[("Alice", &[5.0, 5.0, 4.0]), ("Bob", &[3.0, 3.0, 3.0])]);
        assert_eq!(rows[0].status, StatusLabel::Excellent);
        assert_eq!(rows[1].status, StatusLabel::AtRisk);

        let under = select_underperformers(&rows, DEFAULT_CUTOFF).unwrap();
        assert_eq!(under.len(), 1);
        assert_eq!(under[0].person, "Bob");

        let top = select_top_n(&rows, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].person, "Alice");
    }

    #[test]
    fn ladder_boundaries_follow_tiers() {
        let ladder = StatusLadder::default();
        assert_eq!(ladder.label_for(5.0), StatusLabel::Excellent);
        assert_eq!(ladder.label_for(4.5), StatusLabel::Excellent);
        assert_eq!(ladder.label_for(4.49), StatusLabel::Good);
        assert_eq!(ladder.label_for(4.0), StatusLabel::Good);
        assert_eq!(ladder.label_for(3.99), StatusLabel::Satisfactory);
        assert_eq!(ladder.label_for(3.5), StatusLabel::Satisfactory);
        assert_eq!(ladder.label_for(3.49), StatusLabel::AtRisk);
        assert_eq!(ladder.label_for(-10.0), StatusLabel::AtRisk);
    }

    #[test]
    fn non_finite_score_is_unknown() {
        let rows = classify_status(
            vec![ScoredRow {
                person: "Ghost".to_string(),
                scores: vec![],
                aggregate: f64::NAN,
            }],
            &StatusLadder::default(),
        );
        assert_eq!(rows[0].status, StatusLabel::Unknown);
    }

    #[test]
    fn ladder_rejects_unordered_tiers() {
        let result = StatusLadder::from_tiers(
            vec![
                StatusTier {
                    min: 4.0,
                    label: StatusLabel::Good,
                },
                StatusTier {
                    min: 4.5,
                    label: StatusLabel::Excellent,
                },
            ],
            StatusLabel::AtRisk,
        );
        assert!(matches!(result, Err(ScoreError::InvalidLadder(_))));

        let result = StatusLadder::from_tiers(
            vec![StatusTier {
                min: f64::INFINITY,
                label: StatusLabel::Excellent,
            }],
            StatusLabel::AtRisk,
        );
        assert!(matches!(result, Err(ScoreError::InvalidLadder(_))));
    }

    #[test]
    fn empty_row_is_invalid_input() {
        let input = ResultTable::new(
            vec![],
            vec![ResultRow {
                person: "Nobody".to_string(),
                scores: vec![],
            }],
        );
        assert_eq!(
            compute_aggregate(&input),
            Err(ScoreError::EmptyRow {
                person: "Nobody".to_string()
            })
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let input = table(&[("Eve", &[4.0, f64::NAN])]);
        assert!(matches!(
            compute_aggregate(&input),
            Err(ScoreError::NonFiniteScore { .. })
        ));
    }

    #[test]
    fn underperformers_keep_order_and_are_idempotent() {
        let rows = classified(&[
            ("Dana", &[3.0, 3.0]),
            ("Alice", &[5.0, 5.0]),
            ("Carl", &[2.0, 4.0]),
            ("Bea", &[3.5, 3.5]),
        ]);

        let under = select_underperformers(&rows, 3.5).unwrap();
        let names: Vec<&str> = under.iter().map(|row| row.person.as_str()).collect();
        assert_eq!(names, vec!["Dana", "Carl"]);

        let again = select_underperformers(&under, 3.5).unwrap();
        assert_eq!(again, under);
    }

    #[test]
    fn underperformers_may_be_empty() {
        let rows = classified(&[("Alice", &[5.0, 5.0])]);
        assert!(select_underperformers(&rows, 3.5).unwrap().is_empty());
    }

    #[test]
    fn non_finite_cutoff_is_rejected() {
        let rows = classified(&[("Alice", &[5.0])]);
        assert!(matches!(
            select_underperformers(&rows, f64::NAN),
            Err(ScoreError::InvalidCutoff(_))
        ));
    }

    #[test]
    fn top_n_is_stable_and_descending() {
        let rows = classified(&[
            ("A", &[4.0]),
            ("B", &[5.0]),
            ("C", &[4.0]),
            ("D", &[3.0]),
        ]);

        let top = select_top_n(&rows, 3).unwrap();
        let names: Vec<&str> = top.iter().map(|row| row.person.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn top_n_larger_than_table_returns_all() {
        let rows = classified(&[("A", &[4.0]), ("B", &[5.0])]);
        assert_eq!(select_top_n(&rows, 10).unwrap().len(), 2);
        assert_eq!(select_top_n(&rows, 0), Err(ScoreError::InvalidTopN));
    }

    #[test]
    fn category_summary_reports_mean_min_max() {
        let input = ResultTable::new(
            vec!["Math".to_string()],
            vec![
                ResultRow {
                    person: "A".to_string(),
                    scores: vec![5.0],
                },
                ResultRow {
                    person: "B".to_string(),
                    scores: vec![3.0],
                },
                ResultRow {
                    person: "C".to_string(),
                    scores: vec![4.0],
                },
            ],
        );

        let stats = summarize_by_category(&input).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].category, "Math");
        assert_eq!(stats[0].mean, 4.0);
        assert_eq!(stats[0].min, 3.0);
        assert_eq!(stats[0].max, 5.0);
    }

    #[test]
    fn class_average_over_aggregates() {
        let rows = classified(&[("A", &[5.0]), ("B", &[4.0]), ("C", &[4.0])]);
        assert_eq!(class_average(&rows), Some(4.33));
        assert_eq!(class_average(&[]), None);
    }
}
