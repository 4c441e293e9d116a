use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};

mod compliance;
mod consolidate;
mod formula;
mod models;
mod periods;
mod report;
mod score;
mod store;
mod weekly;

use models::{AggregationSettings, AggregationStrategy, Dashboard, EvaluationMode};

#[derive(Parser)]
#[command(name = "kpi-scorecard")]
#[command(about = "KPI compliance scoring and dashboard consolidation", long_about = None)]
struct Cli {
    /// Evaluate as of this date (YYYY-MM-DD) instead of today
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a realistic sample dashboard document
    Seed {
        #[arg(long, default_value = "dashboards.json")]
        out: PathBuf,
    },
    /// Score dashboards from a document
    Score {
        #[arg(long)]
        file: PathBuf,
        /// Restrict to one dashboard title
        #[arg(long)]
        dashboard: Option<String>,
        #[arg(long, value_enum, default_value_t = EvaluationMode::RealTime)]
        mode: EvaluationMode,
    },
    /// Month-by-month score trend for one dashboard
    Trend {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        dashboard: Option<String>,
        #[arg(long, value_enum, default_value_t = EvaluationMode::RealTime)]
        mode: EvaluationMode,
    },
    /// Consolidate all dashboards in a document into one aggregate
    Consolidate {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = AggregationStrategy::Equal)]
        strategy: AggregationStrategy,
        /// Driver indicator name for the indicator-driven strategy
        #[arg(long)]
        driver: Option<String>,
        #[arg(long, default_value_t = 2)]
        precision: u32,
        /// Repeatable "Title=weight" override for the manual strategy
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, f64)>,
        /// Write the aggregate as a dashboard document
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report for one dashboard
    Report {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        dashboard: Option<String>,
        #[arg(long, value_enum, default_value_t = EvaluationMode::RealTime)]
        mode: EvaluationMode,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn parse_weight(raw: &str) -> Result<(String, f64), String> {
    let (title, weight) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Title=weight, got '{raw}'"))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight in '{raw}'"))?;
    Ok((title.trim().to_string(), weight))
}

fn select<'a>(dashboards: &'a [Dashboard], title: Option<&str>) -> Option<&'a Dashboard> {
    match title {
        Some(wanted) => dashboards
            .iter()
            .find(|d| d.title.eq_ignore_ascii_case(wanted)),
        None => dashboards.first(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let today = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());

    match cli.command {
        Commands::Seed { out } => {
            store::seed(&out)?;
            println!("Sample document written to {}.", out.display());
        }
        Commands::Score {
            file,
            dashboard,
            mode,
        } => {
            let dashboards = store::load_dashboards(&file)?;
            let selected: Vec<&Dashboard> = match dashboard.as_deref() {
                Some(wanted) => dashboards
                    .iter()
                    .filter(|d| d.title.eq_ignore_ascii_case(wanted))
                    .collect(),
                None => dashboards.iter().collect(),
            };
            if selected.is_empty() {
                println!("No matching dashboard in {}.", file.display());
                return Ok(());
            }
            for dashboard in selected {
                let overall = score::weighted_score(
                    &dashboard.indicators,
                    &dashboard.thresholds,
                    dashboard.year,
                    mode,
                    today,
                );
                println!("{} ({}): weighted score {overall:.1}%", dashboard.title, dashboard.year);
                for indicator in &dashboard.indicators {
                    let result = compliance::calculate_compliance(
                        indicator,
                        &dashboard.thresholds,
                        dashboard.year,
                        mode,
                        &dashboard.indicators,
                        today,
                    );
                    println!(
                        "- {}: {:.1}% ({}) with {:.2} of {:.2}",
                        indicator.name,
                        result.percentage,
                        result.status.label(),
                        result.progress,
                        result.target
                    );
                }
            }
        }
        Commands::Trend {
            file,
            dashboard,
            mode,
        } => {
            let dashboards = store::load_dashboards(&file)?;
            let Some(dashboard) = select(&dashboards, dashboard.as_deref()) else {
                println!("No matching dashboard in {}.", file.display());
                return Ok(());
            };
            let limit = if dashboard.year < today.year() {
                (models::MONTHS - 1) as i32
            } else if dashboard.year > today.year() {
                -1
            } else {
                today.month0() as i32
            };
            let trend =
                score::monthly_trend(&dashboard.indicators, dashboard.year, mode, limit, today);
            println!("{} ({}) monthly trend:", dashboard.title, dashboard.year);
            let mut any = false;
            for (month, value) in trend.iter().enumerate() {
                if let Some(value) = value {
                    println!("- {}: {value:.1}%", models::MONTH_NAMES[month]);
                    any = true;
                }
            }
            if !any {
                println!("No scored months yet.");
            }
        }
        Commands::Consolidate {
            file,
            strategy,
            driver,
            precision,
            weights,
            out,
        } => {
            let dashboards = store::load_dashboards(&file)?;
            let settings = AggregationSettings {
                strategy,
                driver,
                weights: weights.into_iter().collect(),
                precision,
            };
            let merged = consolidate::consolidate(&dashboards, &settings, today);
            let overall = score::weighted_score(
                &merged.indicators,
                &merged.thresholds,
                merged.year,
                EvaluationMode::RealTime,
                today,
            );
            println!(
                "Consolidated {} dashboards into {} indicators, weighted score {overall:.1}%.",
                dashboards.len(),
                merged.indicators.len()
            );
            if let Some(out) = out {
                store::write_dashboards(&out, &[merged])?;
                println!("Aggregate written to {}.", out.display());
            }
        }
        Commands::Report {
            file,
            dashboard,
            mode,
            out,
        } => {
            let dashboards = store::load_dashboards(&file)?;
            let Some(dashboard) = select(&dashboards, dashboard.as_deref()) else {
                println!("No matching dashboard in {}.", file.display());
                return Ok(());
            };
            let rendered = report::build_report(dashboard, mode, today);
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
