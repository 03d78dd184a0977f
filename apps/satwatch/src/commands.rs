use crate::wiring;
use chrono::{NaiveDateTime, Utc};
use satwatch_application::analysis::build_market_report;
use satwatch_application::collector::{CollectionReport, Collector, CollectorSettings};
use satwatch_application::config::{to_toml_pretty, Config};
use satwatch_application::sync::gap_plan;
use satwatch_domain::repositories::chart::ChartWriter;
use satwatch_infrastructure::reporting::{write_summary_json, HtmlDashboardWriter, SummaryMeta};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Run,
    Collect,
    Render,
    Gaps,
    Config,
}

/// Non-error endings of a command. `NothingCollected` maps to exit code 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    NothingCollected,
}

pub fn run(command: Command, config_path: Option<&Path>) -> Result<Outcome, String> {
    let config = wiring::resolve_config(config_path)?;
    let now = Utc::now().naive_utc();
    match command {
        Command::Run => run_collect(&config, now, true),
        Command::Collect => run_collect(&config, now, false),
        Command::Render => run_render(&config, now),
        Command::Gaps => run_gaps(&config, now),
        Command::Config => {
            print!("{}", to_toml_pretty(&config)?);
            Ok(Outcome::Completed)
        }
    }
}

fn run_collect(config: &Config, now: NaiveDateTime, render: bool) -> Result<Outcome, String> {
    let overall_start = Instant::now();
    let settings = CollectorSettings::from_config(config, now)?;
    let collector = Collector::new(settings, wiring::build_store(config), wiring::build_jobs(config)?);
    let report = collector.collect_all();

    print_tally(&report);
    if let Some(path) = &config.run.summary_path {
        write_summary(Path::new(path), &report, now)?;
    }

    if !report.is_usable() {
        tracing::error!("no metric produced data, skipping dashboard");
        return Ok(Outcome::NothingCollected);
    }
    if render {
        render_report(config, &report, now)?;
    }
    let total_ms = overall_start.elapsed().as_millis() as u64;
    metrics::histogram!("satwatch.run.duration_ms", "render" => render.to_string())
        .record(total_ms as f64);
    tracing::info!(total_ms, "run finished");
    Ok(Outcome::Completed)
}

fn run_render(config: &Config, now: NaiveDateTime) -> Result<Outcome, String> {
    let settings = CollectorSettings::from_config(config, now)?;
    let store = wiring::build_store(config);
    let report = CollectionReport::from_store(
        settings.window,
        store.as_ref(),
        &wiring::enabled_names(config),
    );
    if !report.is_usable() {
        tracing::error!(data_dir = %config.run.data_dir, "local store holds no data for the window");
        return Ok(Outcome::NothingCollected);
    }
    render_report(config, &report, now)?;
    Ok(Outcome::Completed)
}

fn run_gaps(config: &Config, now: NaiveDateTime) -> Result<Outcome, String> {
    let settings = CollectorSettings::from_config(config, now)?;
    let store = wiring::build_store(config);
    let names = wiring::enabled_names(config);

    println!("window: {}", settings.window);
    for (name, ranges) in gap_plan(store.as_ref(), &names, &settings.window) {
        if ranges.is_empty() {
            println!("{name}: up to date");
            continue;
        }
        let days: u64 = ranges.iter().map(|range| range.len_days()).sum();
        let listed: Vec<String> = ranges.iter().map(ToString::to_string).collect();
        println!("{name}: {days} missing day(s) in {}", listed.join(", "));
    }
    Ok(Outcome::Completed)
}

fn render_report(config: &Config, report: &CollectionReport, now: NaiveDateTime) -> Result<(), String> {
    let market = build_market_report(report, &config.indicators(), &config.signal_weights(), now);
    let path = PathBuf::from(&config.run.chart_path);
    HtmlDashboardWriter.write_chart(&path, &market)?;
    println!("dashboard: {}", path.display());
    if let Some(signal) = market.latest_signal {
        println!("latest signal: {signal}");
    }
    Ok(())
}

fn write_summary(path: &Path, report: &CollectionReport, now: NaiveDateTime) -> Result<(), String> {
    let meta = SummaryMeta {
        generated_at: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        window_start: report.window.start(),
        window_end: report.window.end(),
        success_count: report.success_count(),
        total_count: report.total_count(),
    };
    write_summary_json(path, &meta, report.summaries())?;
    tracing::info!(path = %path.display(), "summary written");
    Ok(())
}

fn print_tally(report: &CollectionReport) {
    for summary in report.summaries() {
        let mark = if report.series(&summary.name).is_some() {
            "✓"
        } else {
            "✗"
        };
        println!("{mark} {:<18} {:<16} records={}", summary.name, summary.status.label(), summary.records);
    }
    println!(
        "collected {}/{} metrics",
        report.success_count(),
        report.total_count()
    );
}
