//! Matrix call analytics command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing::info;

use matrix_call_analytics::{
    analytics::{build_dashboard_figures, AnalyticsEngine, PredictiveInsights, Report},
    config::AnalyticsConfig,
    models::AnalysisWindow,
    store::FileCallStore,
    utils::setup_logging,
};

#[derive(Parser)]
#[command(name = "matrix-analytics")]
#[command(about = "Analytics and reporting for AI voice-call agents")]
#[command(version = matrix_call_analytics::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides the configuration
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an analytics report
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Emit dashboard chart series as JSON
    Figures {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Validate configuration
    ValidateConfig,
    /// Generate default configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Call records, one JSON object per line
    #[arg(long, value_name = "FILE")]
    calls: Option<PathBuf>,

    /// Agent catalogue as a JSON array
    #[arg(long, value_name = "FILE")]
    agents: Option<PathBuf>,

    /// Window start, RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,

    /// Window end, RFC 3339 or YYYY-MM-DD (inclusive)
    #[arg(long)]
    end: Option<String>,

    /// Only report on the calls of this agent id
    #[arg(long, value_name = "ID")]
    agent: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_configuration(&cli)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate().context("Invalid configuration")?;

    let _guard = setup_logging(&config.logging).context("Failed to set up logging")?;
    info!("Starting {} v{}", matrix_call_analytics::NAME, matrix_call_analytics::VERSION);

    match cli.command {
        Commands::Report { input, format } => {
            let report = generate_report(&config, &input).await?;
            match format {
                OutputFormat::Json => println!("{}", report.to_json_pretty()?),
                OutputFormat::Text => print_report(&report),
            }
            Ok(())
        }
        Commands::Figures { input } => {
            let report = generate_report(&config, &input).await?;
            let figures = build_dashboard_figures(&report);
            println!("{}", serde_json::to_string_pretty(&figures)?);
            Ok(())
        }
        Commands::ValidateConfig => validate_configuration(&config),
        Commands::GenerateConfig { output } => generate_default_config(output),
    }
}

fn load_configuration(cli: &Cli) -> anyhow::Result<AnalyticsConfig> {
    let config = match &cli.config {
        Some(path) => AnalyticsConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AnalyticsConfig::load_from_env()
            .context("Failed to load configuration from MATRIX__* environment variables")?,
    };
    Ok(config)
}

async fn generate_report(config: &AnalyticsConfig, input: &InputArgs) -> anyhow::Result<Report> {
    let calls_path = input
        .calls
        .clone()
        .or_else(|| config.store.calls_path.as_ref().map(PathBuf::from))
        .context("No calls file given (use --calls or store.calls_path)")?;
    let agents_path = input
        .agents
        .clone()
        .or_else(|| config.store.agents_path.as_ref().map(PathBuf::from));

    let window = resolve_window(input, config.general.default_window_days, Utc::now())?;

    let store = FileCallStore::new(calls_path, agents_path);
    let engine = AnalyticsEngine::new(Arc::new(store), config.analytics.clone());
    let report = match &input.agent {
        Some(agent_id) => engine.report_for_agent(window, agent_id).await,
        None => engine.report_for_window(window).await,
    }
    .context("Failed to generate report")?;
    Ok(report)
}

fn resolve_window(input: &InputArgs, default_days: u32, now: DateTime<Utc>) -> anyhow::Result<AnalysisWindow> {
    let end = match &input.end {
        Some(value) => parse_time(value, true)?,
        None => now,
    };
    let window = match &input.start {
        Some(value) => AnalysisWindow::new(parse_time(value, false)?, end)?,
        None => AnalysisWindow::trailing_days(end, default_days),
    };
    Ok(window)
}

/// Parse an RFC 3339 timestamp or a bare date. A bare date means the start
/// of that day, or its last second when `end_of_day` is set.
fn parse_time(value: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid time '{}': expected RFC 3339 or YYYY-MM-DD", value))?;
    let naive = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    match naive {
        Some(naive) => Ok(Utc.from_utc_datetime(&naive)),
        None => bail!("Invalid time '{}'", value),
    }
}

fn print_report(report: &Report) {
    println!("{}", "Call Analytics Report".bold().blue());
    println!(
        "{}: {} .. {}",
        "Window".bold(),
        report.window.start.to_rfc3339(),
        report.window.end.to_rfc3339()
    );
    println!();

    let overview = &report.overview;
    println!("{}", "Overview:".bold());
    println!("  Total Calls:      {}", overview.total_calls.to_string().bold());
    println!("  Total Duration:   {:.1}s", overview.total_duration);
    println!("  Total Cost:       ${:.2}", overview.total_cost);
    println!("  Avg Duration:     {:.1}s", overview.avg_call_duration);
    println!("  Success Rate:     {:.1}%", overview.success_rate);
    println!("  Avg Quality:      {:.2}", overview.avg_quality_score);
    println!("  Avg Sentiment:    {:.2}", overview.avg_sentiment_score);
    println!("  Active Agents:    {}", overview.active_agents);
    if overview.provisional_calls > 0 {
        println!("  In Progress:      {}", overview.provisional_calls.to_string().yellow());
    }
    println!();

    if !report.agent_performance.agent_stats.is_empty() {
        println!("{}", "Agents:".bold());
        println!(
            "  {:<20} {:>6} {:>10} {:>10} {:>8} {:>8}",
            "Agent".bold(),
            "Calls".bold(),
            "Avg Dur".bold(),
            "Cost".bold(),
            "Quality".bold(),
            "Score".bold()
        );
        for stats in &report.agent_performance.agent_stats {
            let quality = stats
                .avg_quality
                .map(|q| format!("{:.2}", q))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<20} {:>6} {:>10.1} {:>10.2} {:>8} {:>8.2}",
                stats.agent_name, stats.call_count, stats.avg_duration, stats.total_cost, quality, stats.performance_score
            );
        }
        println!();

        let top: Vec<&str> = report
            .agent_performance
            .top_performers
            .iter()
            .map(|r| r.agent_name.as_str())
            .collect();
        println!("  Top performers:   {}", top.join(", ").green());
        let bottom: Vec<&str> = report
            .agent_performance
            .improvement_needed
            .iter()
            .map(|r| r.agent_name.as_str())
            .collect();
        println!("  Needs attention:  {}", bottom.join(", ").yellow());
        println!();
    }

    let quality = &report.quality_metrics;
    if quality.scored_calls > 0 {
        println!("{}", "Quality Distribution:".bold());
        for band in &quality.quality_distribution {
            println!("  {:<10} {}", band.band.to_string(), band.count);
        }
        if quality.out_of_range > 0 {
            println!("  {:<10} {}", "Invalid", quality.out_of_range.to_string().red());
        }
        println!();
    }

    if let Some(hour) = report.usage_patterns.peak_hour() {
        println!("{}", "Usage:".bold());
        println!("  Peak Hour:        {}:00 UTC", hour);
        println!("  Calls per Day:    {:.2}", report.usage_patterns.avg_calls_per_day);
        println!();
    }

    println!("{}", "Call Patterns:".bold());
    match &report.predictive_insights {
        PredictiveInsights::Patterns { call_patterns, insights, .. } => {
            for pattern in call_patterns {
                println!(
                    "  [{}] {} ({} calls, {:.1}s avg, ${:.2} avg)",
                    pattern.cluster, pattern.characteristics, pattern.size, pattern.avg_duration, pattern.avg_cost
                );
            }
            for insight in insights {
                println!("  {}", insight.cyan());
            }
        }
        PredictiveInsights::InsufficientData { predictions } => println!("  {}", predictions.dimmed()),
        PredictiveInsights::AnalysisError { predictions } => println!("  {}", predictions.red()),
    }
    println!();

    println!("{}", "Recommendations:".bold());
    for recommendation in &report.recommendations {
        println!("  {} {}", "•".green(), recommendation.message);
    }
}

fn validate_configuration(config: &AnalyticsConfig) -> anyhow::Result<()> {
    info!("Validating configuration...");

    config.validate()?;

    let clustering = &config.analytics.clustering;
    let recommendations = &config.analytics.recommendations;
    println!("{}", "✓ Configuration is valid".green());
    println!("  Application: {}", config.general.app_name);
    println!("  Default Window: {} days", config.general.default_window_days);
    println!("  Clustering Seed: {}", clustering.seed);
    println!("  Clustering Min Records: {}", clustering.min_records);
    println!("  Quality Threshold: {}", recommendations.quality_threshold);
    println!("  Underutilized Share: {}", recommendations.underutilized_share);
    println!("  Log Level: {}", config.logging.level);

    Ok(())
}

fn generate_default_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = AnalyticsConfig::default_config();
    let toml_content = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, toml_content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "✓ Default configuration written to:".green(), path.display());
        }
        None => {
            println!("{}", toml_content);
        }
    }

    Ok(())
}
