//! gigstats CLI
//!
//! Command-line interface for gigstats operations:
//! - Analyze trends in earnings, expenses and fee series
//! - Build a multi-metric overview
//! - Train the categorizer and predict categories
//! - Inspect or reset the learned model

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gigstats::categorizer::AdaptiveCategorizer;
use gigstats::config::{generate_default_config, Config, LoggingConfig};
use gigstats::import::{import_observations, import_training_examples, ObservationImporter};
use gigstats::series::{fill_gaps, Observation};
use gigstats::trend::{
    analyze_multi_metric, analyze_trend, calculate_momentum, decompose_seasonal, TrendResult,
    MIN_TREND_POINTS,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "gigstats")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trend analysis and transaction categorization for gig workers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/gigstats/config.toml or ./gigstats.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Column mapping for a `date,value` CSV
#[derive(Args, Debug, Clone)]
pub struct SeriesArgs {
    /// Path to CSV file
    pub path: PathBuf,
    /// Date column (0-indexed; default: detect from header)
    #[arg(long)]
    pub date_col: Option<usize>,
    /// Value column (0-indexed; default: detect from header)
    #[arg(long)]
    pub value_col: Option<usize>,
    /// Date format (strftime format)
    #[arg(long, default_value = "%Y-%m-%d")]
    pub date_format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the trend of one series
    Trend {
        #[command(flatten)]
        series: SeriesArgs,
        /// Label used in the summary text
        #[arg(short, long, default_value = "Value")]
        label: String,
    },

    /// Split a series into trend, seasonal and residual parts
    Decompose {
        #[command(flatten)]
        series: SeriesArgs,
        /// Season length in days
        #[arg(short, long, default_value = "7")]
        period: usize,
    },

    /// Analyze earnings, expenses and fees together
    Overview {
        /// Earnings CSV
        #[arg(long)]
        earnings: PathBuf,
        /// Expenses CSV
        #[arg(long)]
        expenses: Option<PathBuf>,
        /// Platform fees CSV
        #[arg(long)]
        fees: Option<PathBuf>,
    },

    /// Short-vs-long EMA momentum of a series
    Momentum {
        #[command(flatten)]
        series: SeriesArgs,
        #[arg(long, default_value = "7")]
        short: usize,
        #[arg(long, default_value = "30")]
        long: usize,
    },

    /// Train the categorizer from labeled transactions
    Train {
        /// CSV with description, amount, category and optional merchant, date columns
        path: PathBuf,
    },

    /// Predict the category of a transaction
    Predict {
        /// Transaction description
        description: String,
        /// Amount
        #[arg(short, long)]
        amount: f64,
        /// Merchant name
        #[arg(short, long)]
        merchant: Option<String>,
    },

    /// Show what the categorizer has learned
    Status,

    /// Forget everything the categorizer has learned
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging)?;

    tracing::debug!("gigstats v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Trend { series, label } => {
            let observations = load_series(&series)?;
            match analyze_trend(&observations, &label) {
                Some(trend) => match cli.format {
                    OutputFormat::Json => print_json(&trend)?,
                    OutputFormat::Table => print_trend(&trend),
                },
                None => not_enough_history(observations.len()),
            }
        }

        Commands::Decompose { series, period } => {
            if period == 0 {
                bail!("period must be at least 1");
            }
            let filled = fill_gaps(&load_series(&series)?);
            let values: Vec<f64> = filled.iter().map(|o| o.value).collect();
            let decomposition = decompose_seasonal(&values, period);

            match cli.format {
                OutputFormat::Json => print_json(&decomposition)?,
                OutputFormat::Table => {
                    println!(
                        "{:<12} {:>12} {:>12} {:>12} {:>12}",
                        "Date", "Value", "Trend", "Seasonal", "Residual"
                    );
                    println!("{}", "-".repeat(64));
                    for (i, obs) in filled.iter().enumerate() {
                        println!(
                            "{:<12} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
                            obs.date,
                            obs.value,
                            decomposition.trend[i],
                            decomposition.seasonal[i],
                            decomposition.residual[i]
                        );
                    }
                    println!();
                    println!(
                        "Seasonal strength: {:.2}",
                        decomposition.seasonal_strength
                    );
                }
            }
        }

        Commands::Overview {
            earnings,
            expenses,
            fees,
        } => {
            let earnings = load_series_auto(&earnings)?;
            let expenses = expenses
                .as_deref()
                .map(load_series_auto)
                .transpose()?
                .unwrap_or_default();
            let fees = fees
                .as_deref()
                .map(load_series_auto)
                .transpose()?
                .unwrap_or_default();

            let overview = analyze_multi_metric(&earnings, &expenses, &fees);
            match cli.format {
                OutputFormat::Json => print_json(&overview)?,
                OutputFormat::Table => {
                    println!("{:<10} {:<14} {:>10} {:>12} {:>12}", "Metric", "Direction", "R²", "Weekly", "Next 30d");
                    println!("{}", "-".repeat(62));
                    for (name, trend) in [
                        ("Earnings", &overview.earnings),
                        ("Expenses", &overview.expenses),
                        ("Profit", &overview.profit),
                        ("Fees", &overview.fees),
                    ] {
                        match trend {
                            Some(t) => println!(
                                "{:<10} {:<14} {:>10.2} {:>12.2} {:>12.2}",
                                name,
                                t.direction.to_string(),
                                t.strength,
                                t.weekly_change,
                                t.forecast_30_day
                            ),
                            None => println!("{:<10} {:<14}", name, "-"),
                        }
                    }

                    if !overview.correlations.is_empty() {
                        println!();
                        println!("Correlations:");
                        for c in &overview.correlations {
                            println!(
                                "  {} / {}: r={:.2} (n={})",
                                c.metric_a, c.metric_b, c.coefficient, c.sample_size
                            );
                        }
                    }

                    println!();
                    println!("{}", overview.narrative_summary);
                }
            }
        }

        Commands::Momentum {
            series,
            short,
            long,
        } => {
            let filled = fill_gaps(&load_series(&series)?);
            let values: Vec<f64> = filled.iter().map(|o| o.value).collect();
            let momentum = calculate_momentum(&values, short, long);

            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "short_window": short,
                    "long_window": long,
                    "data_points": values.len(),
                    "momentum": momentum,
                }))?,
                OutputFormat::Table => {
                    if values.len() < long {
                        println!(
                            "Need at least {} days of history for momentum (have {}).",
                            long,
                            values.len()
                        );
                    } else {
                        println!(
                            "Momentum ({}d vs {}d EMA): {:+.1}%",
                            short,
                            long,
                            momentum * 100.0
                        );
                    }
                }
            }
        }

        Commands::Train { path } => {
            let report = import_training_examples(&path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            print_import_errors(&report.errors);

            let mut categorizer = AdaptiveCategorizer::open(&config.categorizer);
            categorizer.train_batch(&report.records);
            categorizer
                .save()
                .with_context(|| format!("Failed to save model to {}", config.categorizer.model_path.display()))?;

            let stats = categorizer.stats();
            match cli.format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Table => {
                    println!("Trained on {} examples ({} rows failed)", report.rows_processed, report.rows_failed);
                    println!(
                        "Model: {} examples, {} categories, accuracy {:.0}%",
                        stats.total_examples,
                        stats.categories.len(),
                        stats.last_accuracy * 100.0
                    );
                }
            }
        }

        Commands::Predict {
            description,
            amount,
            merchant,
        } => {
            let categorizer = AdaptiveCategorizer::open(&config.categorizer);
            let prediction = categorizer.predict(&description, merchant.as_deref(), amount);

            match cli.format {
                OutputFormat::Json => print_json(&prediction)?,
                OutputFormat::Table => match prediction {
                    Some(p) => {
                        println!("Category:   {}", p.category);
                        println!("Confidence: {:.0}%", p.confidence * 100.0);
                        println!("Method:     {}", p.method);
                        if let Some(pct) = p.deductible_percent {
                            println!("Deductible: {:.0}%", pct);
                        }
                        println!("Reasoning:  {}", p.reasoning);
                    }
                    None if !categorizer.is_model_trained() => {
                        println!(
                            "The model needs more training data ({} examples so far).",
                            categorizer.stats().total_examples
                        );
                        println!("Train it with:");
                        println!("  gigstats train transactions.csv");
                    }
                    None => println!("No confident prediction."),
                },
            }
        }

        Commands::Status => {
            let categorizer = AdaptiveCategorizer::open(&config.categorizer);
            let stats = categorizer.stats();

            match cli.format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Table => {
                    println!("gigstats v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("Model file: {}", config.categorizer.model_path.display());
                    println!("Examples:   {}", stats.total_examples);
                    println!("Vocabulary: {}", stats.vocabulary_size);
                    println!("Trained:    {}", if stats.is_trained { "yes" } else { "no" });
                    println!("Accuracy:   {:.0}%", stats.last_accuracy * 100.0);
                    if let Some(updated) = stats.updated_at {
                        println!("Updated:    {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
                    }

                    if !stats.categories.is_empty() {
                        println!();
                        println!("{:<24} {:>8}", "Category", "Examples");
                        println!("{}", "-".repeat(33));
                        for (category, count) in &stats.categories {
                            println!("{:<24} {:>8}", category, count);
                        }
                    }
                }
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                eprintln!("This deletes everything the categorizer has learned.");
                eprintln!("Re-run with --yes to confirm.");
                std::process::exit(1);
            }

            let mut categorizer = AdaptiveCategorizer::open(&config.categorizer);
            categorizer.reset();
            categorizer.save().context("Failed to save reset model")?;
            println!("Categorizer model reset.");
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gigstats={}", logging.level)));

    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }
    Ok(())
}

fn load_series(args: &SeriesArgs) -> anyhow::Result<Vec<Observation>> {
    let context = || format!("Failed to import {}", args.path.display());

    let mut importer = ObservationImporter::new().with_date_format(&args.date_format);
    if args.date_col.is_none() && args.value_col.is_none() {
        importer = importer.with_detected_columns(&args.path).with_context(context)?;
    } else {
        importer = importer
            .with_date_column(args.date_col.unwrap_or(0))
            .with_value_column(args.value_col.unwrap_or(1));
    }
    let report = importer.import(&args.path).with_context(context)?;

    print_import_errors(&report.errors);
    Ok(report.records)
}

fn load_series_auto(path: &Path) -> anyhow::Result<Vec<Observation>> {
    let report =
        import_observations(path).with_context(|| format!("Failed to import {}", path.display()))?;
    print_import_errors(&report.errors);
    Ok(report.records)
}

fn print_import_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("Skipped rows (first 10):");
    for error in errors.iter().take(10) {
        eprintln!("  {}", error);
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn not_enough_history(days: usize) {
    println!(
        "Not enough history: a trend needs at least {} days of data (have {}).",
        MIN_TREND_POINTS, days
    );
}

fn print_trend(trend: &TrendResult) {
    println!(
        "{} ({} to {}, {} days)",
        trend.label, trend.start_date, trend.end_date, trend.data_points
    );
    println!("{}", "-".repeat(48));
    println!("Direction:      {}", trend.direction);
    println!("Strength (R²):  {:.2}", trend.strength);
    println!("Slope:          {:+.2}/day", trend.slope);
    println!("Weekly change:  {:+.2}", trend.weekly_change);
    println!("Monthly change: {:+.2}", trend.monthly_change);
    println!("Volatility:     {:.2}", trend.volatility);
    println!("Next 7 days:    {:.2}", trend.forecast_7_day);
    println!("Next 30 days:   {:.2}", trend.forecast_30_day);

    println!();
    println!("Weekday factors:");
    const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    for (weekday, factor) in &trend.seasonal_factors {
        let name = (*weekday as usize)
            .checked_sub(1)
            .and_then(|i| DAYS.get(i))
            .copied()
            .unwrap_or("?");
        println!("  {}: {:.2}", name, factor);
    }

    if !trend.change_points.is_empty() {
        println!();
        println!("Change points:");
        for cp in &trend.change_points {
            println!("  {}", cp.description);
        }
    }

    println!();
    println!("{}", trend.summary);
}
