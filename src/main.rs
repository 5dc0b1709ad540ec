use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod assessment;
mod config;
mod dashboard;
mod error;
mod export;
mod loader;
mod models;
mod report;
mod scorer;

use crate::config::AnalysisConfig;
use crate::models::ClassifiedRow;
use crate::report::ReportContext;

#[derive(Parser)]
#[command(name = "class-report")]
#[command(about = "Class grade and test result analysis with report export", long_about = None)]
struct Cli {
    /// JSON file with analysis parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample dataset for every command
    Seed {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Print top students and underperformers for a grade journal
    Score {
        #[arg(long, default_value = "journal.csv")]
        input: PathBuf,
        #[arg(long)]
        cutoff: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate the text report and spreadsheet sheets for a grade journal
    Report {
        #[arg(long, default_value = "journal.csv")]
        input: PathBuf,
        #[arg(long, default_value = "README.txt")]
        out: PathBuf,
        #[arg(long, default_value = "performance_report")]
        export_dir: PathBuf,
        #[arg(long)]
        cutoff: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summarize a quarterly journal
    Dashboard {
        #[arg(long, default_value = "quarterly.csv")]
        input: PathBuf,
        #[arg(long, default_value = "dashboard.txt")]
        out: PathBuf,
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Analyze a right/wrong answer matrix and write the HTML report
    Tests {
        #[arg(long, default_value = "test_results.csv")]
        results: PathBuf,
        #[arg(long)]
        info: Option<PathBuf>,
        #[arg(long, default_value = "test_report.html")]
        html: PathBuf,
        #[arg(long, default_value = "test_report")]
        export_dir: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct ScoredJournal {
    table: models::ResultTable,
    scored: Vec<ClassifiedRow>,
    top: Vec<ClassifiedRow>,
    underperformers: Vec<ClassifiedRow>,
}

fn score_journal(input: &Path, config: &AnalysisConfig) -> anyhow::Result<ScoredJournal> {
    let table = loader::load_results(input)?;
    let ladder = config.ladder()?;
    let aggregated = scorer::compute_aggregate(&table)
        .with_context(|| format!("failed to score {}", input.display()))?;
    let scored = scorer::classify_status(aggregated, &ladder);
    let top = scorer::select_top_n(&scored, config.top_n)?;
    let underperformers = scorer::select_underperformers(&scored, config.cutoff)?;

    info!(
        students = scored.len(),
        underperformers = underperformers.len(),
        cutoff = config.cutoff,
        "scored journal"
    );

    Ok(ScoredJournal {
        table,
        scored,
        top,
        underperformers,
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AnalysisConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Seed { dir } => {
            let written = loader::write_sample_data(&dir)?;
            println!("Sample data written:");
            for path in written {
                println!("- {}", path.display());
            }
        }
        Commands::Score {
            input,
            cutoff,
            limit,
        } => {
            config.cutoff = cutoff.unwrap_or(config.cutoff);
            config.top_n = limit.unwrap_or(config.top_n);
            config.validate()?;

            let journal = score_journal(&input, &config)?;
            if journal.scored.is_empty() {
                println!("No students found in {}.", input.display());
                return Ok(());
            }

            println!("Top students by average:");
            for row in &journal.top {
                println!("- {} {:.2} ({})", row.person, row.aggregate, row.status);
            }

            println!("Underperforming students (average < {}):", config.cutoff);
            if journal.underperformers.is_empty() {
                println!("- none");
            }
            for row in &journal.underperformers {
                println!("- {} {:.2} ({})", row.person, row.aggregate, row.status);
            }
        }
        Commands::Report {
            input,
            out,
            export_dir,
            cutoff,
            limit,
        } => {
            config.cutoff = cutoff.unwrap_or(config.cutoff);
            config.top_n = limit.unwrap_or(config.top_n);
            config.validate()?;

            let journal = score_journal(&input, &config)?;
            let stats = scorer::summarize_by_category(&journal.table)
                .with_context(|| format!("failed to summarize {}", input.display()))?;
            let ctx = ReportContext::new();

            std::fs::create_dir_all(&export_dir)
                .with_context(|| format!("failed to create {}", export_dir.display()))?;
            let students_sheet = export_dir.join("students.csv");
            let categories_sheet = export_dir.join("category_stats.csv");
            let summary_path = export_dir.join("summary.json");
            export::write_scored_sheet(
                &students_sheet,
                &journal.table,
                &journal.scored,
                config.cutoff,
            )?;
            export::write_category_sheet(&categories_sheet, &stats)?;
            export::write_json(
                &summary_path,
                &export::RunSummary::new(
                    &ctx,
                    &journal.scored,
                    &journal.top,
                    &journal.underperformers,
                    config.cutoff,
                ),
            )?;

            let report = report::build_report(
                &ctx,
                &journal.scored,
                &journal.top,
                &journal.underperformers,
                &stats,
                config.cutoff,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;

            info!(run_id = %ctx.run_id, "report complete");
            println!("Analysis complete. Results saved to:");
            println!("  - Sheets: {}", export_dir.display());
            println!("  - Text: {}", out.display());
        }
        Commands::Dashboard {
            input,
            out,
            json,
            top,
        } => {
            config.dashboard_top_n = top.unwrap_or(config.dashboard_top_n);
            config.validate()?;

            let table = loader::load_quarterly(&input)?;
            let summary = dashboard::build_dashboard(&table, config.dashboard_top_n)
                .with_context(|| format!("failed to summarize {}", input.display()))?;
            let ctx = ReportContext::new();

            std::fs::write(&out, report::build_dashboard_report(&ctx, &summary))
                .with_context(|| format!("failed to write {}", out.display()))?;
            if let Some(path) = &json {
                export::write_json(path, &summary)?;
            }

            println!("Dashboard written to {}.", out.display());
        }
        Commands::Tests {
            results,
            info: info_path,
            html,
            export_dir,
        } => {
            let matrix = loader::load_results(&results)?;
            let task_info = match &info_path {
                Some(path) => loader::load_task_info(path)?,
                None => {
                    warn!("no task info given, themes will be empty");
                    Vec::new()
                }
            };

            let summary = assessment::analyze(
                &matrix,
                &task_info,
                config.hard_task_threshold,
                config.weak_student_ratio,
            )
            .with_context(|| format!("failed to analyze {}", results.display()))?;
            let ctx = ReportContext::new();

            std::fs::write(
                &html,
                report::build_test_html(&ctx, &summary, config.hard_task_threshold),
            )
            .with_context(|| format!("failed to write {}", html.display()))?;
            let sheets = export::write_test_sheets(&export_dir, &matrix, &summary)?;

            info!(
                run_id = %ctx.run_id,
                hard_tasks = summary.hard_tasks.len(),
                weak_students = summary.weak_students.len(),
                "test analysis complete"
            );
            println!("Reports ready:");
            println!("  HTML   -> {}", html.display());
            for sheet in sheets {
                println!("  Sheet  -> {}", sheet.display());
            }
        }
    }

    Ok(())
}
