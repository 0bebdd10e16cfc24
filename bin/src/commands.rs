//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use polars::prelude::*;
use tracing::{info, info_span};
use workforce::{
    ClusteringResult, GroupKey, MetricCategory, MetricRegistry, NearestCentroidClassifier,
    PeriodMetric, PipelineConfig, PipelineContext, Prediction, Roster, TenureSummary,
    WorkforceAnalytics, median_survival,
};

use crate::cli::{Cli, Command};
use crate::input::read_roster;

pub(crate) fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::List => {
            list_metrics(&MetricRegistry::with_defaults());
            Ok(())
        }
        Command::Info { metric } => show_metric_info(&MetricRegistry::with_defaults(), metric),
        Command::Records => {
            let ctx = load_context(cli)?;
            println!("{}", Roster::to_frame(ctx.records())?);
            Ok(())
        }
        Command::Metrics => {
            let ctx = load_context(cli)?;
            println!("{}", ctx.metrics_frame()?);
            Ok(())
        }
        Command::Summary => {
            let ctx = load_context(cli)?;
            print_summary(&ctx);
            Ok(())
        }
        Command::Distribution { by } => print_distribution(&load_context(cli)?, (*by).into()),
        Command::Breakdown { by, metric } => {
            let ctx = load_context(cli)?;
            let registry = ctx.registry();
            let metric = registry.require(metric)?;
            let breakdown = ctx.group_breakdown((*by).into(), metric)?;
            println!("{} by {}", metric.name(), breakdown.key);
            println!("{}", breakdown.to_frame()?);
            Ok(())
        }
        Command::Features => {
            let table = load_context(cli)?.feature_table();
            if table.is_empty() {
                println!("Not enough periods to build lag features.");
            } else {
                println!("{}", table.to_frame()?);
            }
            Ok(())
        }
        Command::Clusters => print_clusters(&load_context(cli)?.cluster_departures()?),
        Command::Train { output } => train(cli, output),
        Command::Predict { model } => {
            let body = match predict(cli, model.as_deref()) {
                Ok(prediction) => prediction.to_json(),
                Err(err) => serde_json::json!({ "error": format!("{err:#}") }),
            };
            println!("{body}");
            Ok(())
        }
        Command::Report { model } => {
            let ctx = attach_model(load_context(cli)?, model.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&ctx.report())?);
            Ok(())
        }
    }
}

/// Read the roster and build the filtered context for this invocation.
fn load_context(cli: &Cli) -> Result<PipelineContext> {
    let path = cli
        .input
        .as_deref()
        .context("--input is required for this command")?;
    let as_of = cli.as_of.unwrap_or_else(|| Local::now().date_naive());

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(period) = cli.period {
        config.granularity = period.into();
    }

    let span = info_span!("load", path = %path.display(), %as_of);
    let _guard = span.enter();

    let rows = read_roster(path)?;
    let ctx = PipelineContext::new(&rows, as_of, config)?;
    let filter = cli.filter.to_filter();
    Ok(if filter.is_empty() {
        ctx
    } else {
        ctx.filtered(&filter)
    })
}

fn attach_model(ctx: PipelineContext, model: Option<&Path>) -> Result<PipelineContext> {
    Ok(match model {
        Some(path) => {
            let classifier = NearestCentroidClassifier::load(path)
                .with_context(|| format!("failed to load model {}", path.display()))?;
            ctx.with_classifier(Arc::new(classifier))
        }
        None => ctx,
    })
}

/// List all available metrics grouped by category.
fn list_metrics(registry: &MetricRegistry) {
    println!("Available Metrics ({} total)\n", registry.len());

    for category in [MetricCategory::Flow, MetricCategory::Rate] {
        println!("{category}:");
        for metric in registry.by_category(category) {
            println!("  {} - {}", metric.name(), metric.description());
        }
        println!();
    }
}

/// Show detailed information about a specific metric.
fn show_metric_info(registry: &MetricRegistry, metric_name: &str) -> Result<()> {
    let all_info = registry.all_info();
    let Some(info) = all_info.iter().find(|m| m.name == metric_name) else {
        return Err(anyhow!(
            "metric '{metric_name}' not found; available: {}",
            registry.names().join(", ")
        ));
    };

    println!("Metric: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    Ok(())
}

fn print_summary(ctx: &PipelineContext) {
    let summary = ctx.summary();
    let issues = ctx.issues();

    println!("As of: {}", ctx.as_of());
    println!("Total hires: {}", summary.total_hires);
    println!("Total terminations: {}", summary.total_terminations);
    println!("Active employees: {}", summary.active_employees);
    match summary.latest_yearly_retention {
        Some(rate) => println!("Latest yearly retention: {rate:.1}%"),
        None => println!("Latest yearly retention: n/a"),
    }
    match summary.average_tenure_days {
        Some(days) => println!("Average tenure: {days:.0} days"),
        None => println!("Average tenure: n/a"),
    }
    if !issues.is_empty() {
        println!("\nData-quality issues ({}):", issues.len());
        for issue in issues {
            println!(
                "  row {} [{}] {}: {}",
                issue.row, issue.severity, issue.field, issue.message
            );
        }
    }
}

fn print_distribution(ctx: &PipelineContext, key: GroupKey) -> Result<()> {
    match TenureSummary::from_values(&ctx.tenure_distribution()) {
        Some(tenure) => println!(
            "Tenure of departed employees: n={} mean={:.0} median={:.0} min={} max={} days",
            tenure.count, tenure.mean, tenure.median, tenure.min, tenure.max
        ),
        None => println!("No departed employees."),
    }

    let reasons = ctx.termination_reasons();
    if !reasons.is_empty() {
        let frame = df![
            "reason" => reasons.keys().cloned().collect::<Vec<_>>(),
            "count" => reasons.values().copied().collect::<Vec<_>>(),
        ]?;
        println!("{frame}");
    }

    let months = ctx.seasonality();
    let frame = df![
        "month" => months.iter().map(|m| m.month).collect::<Vec<_>>(),
        "hires" => months.iter().map(|m| m.hires).collect::<Vec<_>>(),
        "terminations" => months.iter().map(|m| m.terminations).collect::<Vec<_>>(),
    ]?;
    println!("Seasonality:\n{frame}");

    let heatmap = ctx.termination_heatmap(key);
    if !heatmap.rows.is_empty() {
        println!("Terminations by {key} and exit month:\n{}", heatmap.to_frame()?);
    }

    let curve = ctx.survival_curve();
    if !curve.is_empty() {
        let frame = df![
            "tenure_days" => curve.iter().map(|p| p.tenure_days).collect::<Vec<_>>(),
            "at_risk" => curve.iter().map(|p| p.at_risk as u32).collect::<Vec<_>>(),
            "events" => curve.iter().map(|p| p.events as u32).collect::<Vec<_>>(),
            "censored" => curve.iter().map(|p| p.censored as u32).collect::<Vec<_>>(),
            "survival" => curve.iter().map(|p| p.survival).collect::<Vec<_>>(),
        ]?;
        println!("Survival (Kaplan-Meier):\n{frame}");
        match median_survival(&curve) {
            Some(days) => println!("Median survival: {days} days"),
            None => println!("Median survival: not reached"),
        }
    }
    Ok(())
}

fn print_clusters(result: &ClusteringResult) -> Result<()> {
    if result.is_empty() {
        println!("No departed employees to cluster.");
        return Ok(());
    }

    let a = &result.assignments;
    let frame = df![
        "employee_id" => a.iter().map(|x| x.employee_id.clone()).collect::<Vec<_>>(),
        "cluster" => a.iter().map(|x| x.cluster as u32).collect::<Vec<_>>(),
        "tenure_days" => a.iter().map(|x| x.tenure_days).collect::<Vec<_>>(),
        "termination_month" => a.iter().map(|x| x.termination_month).collect::<Vec<_>>(),
        "termination_year" => a.iter().map(|x| x.termination_year).collect::<Vec<_>>(),
    ]?;
    println!("{frame}");

    println!("Centroids (inertia {:.3}):", result.inertia);
    for (cluster, (centroid, size)) in result.centroids.iter().zip(&result.sizes).enumerate() {
        println!(
            "  cluster {cluster}: {size} employees, tenure {:.0} days, month {:.1}, year {:.1}",
            centroid[0], centroid[1], centroid[2]
        );
    }
    Ok(())
}

fn train(cli: &Cli, output: &Path) -> Result<()> {
    let table = load_context(cli)?.feature_table();
    let model = NearestCentroidClassifier::fit(&table).context("failed to fit status classifier")?;
    model
        .save(output)
        .with_context(|| format!("failed to write model {}", output.display()))?;

    let classes: Vec<String> = model.classes().map(|c| c.to_string()).collect();
    info!(rows = table.len(), path = %output.display(), "saved status classifier");
    println!(
        "Trained on {} periods ({}); saved to {}",
        table.len(),
        classes.join(", "),
        output.display()
    );
    Ok(())
}

fn predict(cli: &Cli, model: Option<&Path>) -> Result<Prediction> {
    let ctx = attach_model(load_context(cli)?, model)?;
    Ok(ctx.predict_status())
}
