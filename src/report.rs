use std::fmt::Write;

use chrono::{DateTime, Utc};
use html_escape::encode_text;
use uuid::Uuid;

use crate::assessment::AssessmentSummary;
use crate::dashboard::Dashboard;
use crate::models::{CategoryStats, ClassifiedRow};
use crate::scorer::class_average;

#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
        }
    }
}

impl Default for ReportContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Left-aligned plain text table, columns sized to the widest cell.
fn write_table(output: &mut String, headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(output, "{}", render(headers.to_vec()));
    for row in rows {
        let _ = writeln!(output, "{}", render(row.iter().map(String::as_str).collect()));
    }
}

pub fn build_report(
    ctx: &ReportContext,
    scored: &[ClassifiedRow],
    top: &[ClassifiedRow],
    underperformers: &[ClassifiedRow],
    stats: &[CategoryStats],
    cutoff: f64,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "CLASS PERFORMANCE REPORT");
    let _ = writeln!(output, "========================");
    let _ = writeln!(
        output,
        "Run {} generated {}",
        ctx.run_id,
        ctx.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Total students: {}", scored.len());
    let _ = writeln!(output);

    let _ = writeln!(output, "TOP {} STUDENTS:", top.len());
    let rows: Vec<Vec<String>> = top
        .iter()
        .map(|row| vec![row.person.clone(), format!("{:.2}", row.aggregate)])
        .collect();
    write_table(&mut output, &["Student", "Average"], &rows);
    let _ = writeln!(output);

    let _ = writeln!(output, "UNDERPERFORMING STUDENTS (average < {cutoff}):");
    if underperformers.is_empty() {
        let _ = writeln!(output, "No underperforming students");
    } else {
        let rows: Vec<Vec<String>> = underperformers
            .iter()
            .map(|row| {
                vec![
                    row.person.clone(),
                    format!("{:.2}", row.aggregate),
                    row.status.to_string(),
                ]
            })
            .collect();
        write_table(&mut output, &["Student", "Average", "Status"], &rows);
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "CATEGORY STATISTICS:");
    let rows: Vec<Vec<String>> = stats
        .iter()
        .map(|stat| {
            vec![
                stat.category.clone(),
                format!("{:.2}", stat.mean),
                format!("{}", stat.min),
                format!("{}", stat.max),
            ]
        })
        .collect();
    write_table(&mut output, &["Category", "Mean", "Min", "Max"], &rows);
    let _ = writeln!(output);

    match class_average(scored) {
        Some(average) => {
            let _ = writeln!(output, "CLASS AVERAGE: {average:.2}");
        }
        None => {
            let _ = writeln!(output, "CLASS AVERAGE: n/a");
        }
    }

    output
}

pub fn build_dashboard_report(ctx: &ReportContext, dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "PERFORMANCE DASHBOARD");
    let _ = writeln!(output, "=====================");
    let _ = writeln!(
        output,
        "Run {} generated {}",
        ctx.run_id,
        ctx.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Total students: {}", dashboard.student_count);
    let _ = writeln!(output, "Subject means:");
    for subject in &dashboard.subject_means {
        let _ = writeln!(output, "  {}: {:.2}", subject.subject, subject.mean);
    }
    if let Some(mean) = dashboard.overall_mean {
        let _ = writeln!(output, "Overall mean: {mean:.2}");
    }
    if let Some(std) = dashboard.overall_std {
        let _ = writeln!(output, "Std. deviation: {std:.2}");
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "GRADE DISTRIBUTION:");
    let total: usize = dashboard.grade_distribution.iter().map(|g| g.count).sum();
    let rows: Vec<Vec<String>> = dashboard
        .grade_distribution
        .iter()
        .map(|grade| {
            let share = if total == 0 {
                0.0
            } else {
                grade.count as f64 / total as f64 * 100.0
            };
            vec![
                format!("{}", grade.grade),
                grade.count.to_string(),
                format!("{share:.1}%"),
            ]
        })
        .collect();
    write_table(&mut output, &["Grade", "Count", "Share"], &rows);
    let _ = writeln!(output);

    let _ = writeln!(output, "TOP {} STUDENTS:", dashboard.top_students.len());
    let rows: Vec<Vec<String>> = dashboard
        .top_students
        .iter()
        .map(|student| vec![student.person.clone(), format!("{:.2}", student.mean)])
        .collect();
    write_table(&mut output, &["Student", "Average"], &rows);
    let _ = writeln!(output);

    let _ = writeln!(output, "QUARTER TRENDS:");
    let mut headers = vec!["Quarter"];
    headers.extend(dashboard.subjects.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = dashboard
        .quarter_trends
        .iter()
        .map(|trend| {
            let mut row = vec![trend.quarter.clone()];
            row.extend(trend.subject_means.iter().map(|mean| format!("{mean:.2}")));
            row
        })
        .collect();
    write_table(&mut output, &headers, &rows);
    let _ = writeln!(output);

    let _ = writeln!(output, "STUDENT MEANS BY QUARTER:");
    let mut headers = vec!["Student", "Quarter"];
    headers.extend(dashboard.subjects.iter().map(String::as_str));
    let rows: Vec<Vec<String>> = dashboard
        .student_quarter_means
        .iter()
        .map(|cell| {
            let mut row = vec![cell.person.clone(), cell.quarter.clone()];
            row.extend(cell.subject_means.iter().map(|mean| format!("{mean:.1}")));
            row
        })
        .collect();
    write_table(&mut output, &headers, &rows);
    let _ = writeln!(output);

    let _ = writeln!(output, "GRADE SPREAD BY SUBJECT:");
    let rows: Vec<Vec<String>> = dashboard
        .subject_spread
        .iter()
        .map(|spread| {
            vec![
                spread.subject.clone(),
                format!("{:.2}", spread.min),
                format!("{:.2}", spread.q1),
                format!("{:.2}", spread.median),
                format!("{:.2}", spread.q3),
                format!("{:.2}", spread.max),
            ]
        })
        .collect();
    write_table(
        &mut output,
        &["Subject", "Min", "Q1", "Median", "Q3", "Max"],
        &rows,
    );

    output
}

const HTML_STYLE: &str = "body{font-family:Arial;margin:40px}\
h1,h2{color:#2E86AB}\
table{border-collapse:collapse;width:100%;margin:15px 0}\
th,td{border:1px solid #ccc;padding:6px;text-align:center}\
th{background:#f3f3f3}\
.red{background:#ffe6e6}";

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        encode_text(&items.join(", ")).into_owned()
    }
}

pub fn build_test_html(
    ctx: &ReportContext,
    summary: &AssessmentSummary,
    hard_threshold: f64,
) -> String {
    let mut html = String::new();

    let _ = writeln!(html, "<!doctype html>");
    let _ = writeln!(html, "<html>");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "  <meta charset=\"utf-8\">");
    let _ = writeln!(html, "  <title>Test results report</title>");
    let _ = writeln!(html, "  <style>{HTML_STYLE}</style>");
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "  <h1>Test results report</h1>");
    let _ = writeln!(
        html,
        "  <p class=\"meta\">Run {} generated {}</p>",
        ctx.run_id,
        ctx.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        html,
        "  <p><strong>Number of students:</strong> {}</p>",
        summary.student_count
    );

    let _ = writeln!(html, "  <h2>Task summary</h2>");
    let _ = writeln!(html, "  <table>");
    let _ = writeln!(
        html,
        "    <tr><th>Task</th><th>Correct</th><th>Total</th><th>% correct</th><th>Theme</th><th>Difficulty</th></tr>"
    );
    for task in &summary.tasks {
        let class = if task.pct_correct < hard_threshold {
            " class=\"red\""
        } else {
            ""
        };
        let _ = writeln!(
            html,
            "    <tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{}</td></tr>",
            encode_text(&task.task),
            task.correct,
            task.total,
            task.pct_correct,
            encode_text(task.theme.as_deref().unwrap_or("")),
            encode_text(task.difficulty.as_deref().unwrap_or(""))
        );
    }
    let _ = writeln!(html, "  </table>");

    let _ = writeln!(html, "  <h2>Problem tasks (&lt;{hard_threshold} %)</h2>");
    let _ = writeln!(html, "  <ul>");
    for name in &summary.hard_tasks {
        let pct = summary
            .tasks
            .iter()
            .find(|task| &task.task == name)
            .map(|task| task.pct_correct)
            .unwrap_or(0.0);
        let _ = writeln!(html, "    <li>{} – {pct:.1}% correct</li>", encode_text(name));
    }
    let _ = writeln!(html, "  </ul>");

    let _ = writeln!(html, "  <h2>Weak students</h2>");
    let _ = writeln!(html, "  <ul>");
    for student in &summary.weak_students {
        let _ = writeln!(
            html,
            "    <li>{} – {} of {} correct</li>",
            encode_text(&student.person),
            student.correct,
            summary.task_count
        );
    }
    let _ = writeln!(html, "  </ul>");

    let _ = writeln!(html, "  <h2>Themes</h2>");
    let _ = writeln!(html, "  <table>");
    let _ = writeln!(html, "    <tr><th>Theme</th><th>Mean % correct</th></tr>");
    for theme in &summary.themes {
        let _ = writeln!(
            html,
            "    <tr><td>{}</td><td>{:.1}</td></tr>",
            encode_text(&theme.theme),
            theme.mean_pct
        );
    }
    let _ = writeln!(html, "  </table>");

    let weak_names: Vec<String> = summary
        .weak_students
        .iter()
        .map(|student| student.person.clone())
        .collect();
    let _ = writeln!(html, "  <h2>Recommendations for the teacher</h2>");
    let _ = writeln!(html, "  <ul>");
    let _ = writeln!(
        html,
        "    <li>Revisit themes: {}</li>",
        join_or_none(&summary.theme_recommendations)
    );
    let _ = writeln!(
        html,
        "    <li>Assign extra practice for tasks: {}</li>",
        join_or_none(&summary.hard_tasks)
    );
    let _ = writeln!(
        html,
        "    <li>Work individually with: {}</li>",
        join_or_none(&weak_names)
    );
    let _ = writeln!(html, "  </ul>");
    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");

    html
}
