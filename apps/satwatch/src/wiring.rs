use satwatch_application::collector::MetricJob;
use satwatch_application::config::{Config, EndpointsConfig, HttpConfig, MetricSpec};
use satwatch_domain::repositories::series_store::SeriesStore;
use satwatch_infrastructure::http::{HttpClient, HttpSettings};
use satwatch_infrastructure::persistence::csv_store::CsvSeriesStore;
use satwatch_infrastructure::sources::{build_source, SourceEndpoints, SourceOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Effective configuration: the file when one was given, otherwise built-in defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config, String> {
    let config = match path {
        Some(path) => {
            let config = satwatch_application::config::load_config(path)?;
            tracing::info!(path = %path.display(), "config loaded");
            config
        }
        None => {
            tracing::info!("no config given, using built-in defaults");
            Config::default()
        }
    };
    config.validate()?;
    Ok(config)
}

pub fn http_settings(http: &HttpConfig) -> HttpSettings {
    HttpSettings {
        timeout_ms: http.timeout_ms,
        retries: http.retries,
        backoff_ms: http.backoff_ms,
        user_agent: http.user_agent.clone(),
    }
}

pub fn source_endpoints(endpoints: &EndpointsConfig) -> SourceEndpoints {
    SourceEndpoints {
        yahoo: endpoints.yahoo.clone(),
        binance_futures: endpoints.binance_futures.clone(),
        binance_spot: endpoints.binance_spot.clone(),
        blockchain: endpoints.blockchain.clone(),
        bitcoin_data: endpoints.bitcoin_data.clone(),
        fear_greed: endpoints.fear_greed.clone(),
        google_trends: endpoints.google_trends.clone(),
        coinbase: endpoints.coinbase.clone(),
    }
}

pub fn build_store(config: &Config) -> Box<dyn SeriesStore> {
    Box::new(CsvSeriesStore::new(PathBuf::from(&config.run.data_dir)))
}

pub fn enabled_names(config: &Config) -> Vec<String> {
    config.enabled_metrics().map(|m| m.name.clone()).collect()
}

pub fn build_jobs(config: &Config) -> Result<Vec<MetricJob>, String> {
    let http = HttpClient::new(&http_settings(&config.http))?;
    let endpoints = source_endpoints(&config.endpoints);
    Ok(config
        .enabled_metrics()
        .map(|metric| MetricJob::new(metric.name.clone(), build_job_source(metric, &http, &endpoints)))
        .collect())
}

fn build_job_source(
    metric: &MetricSpec,
    http: &HttpClient,
    endpoints: &SourceEndpoints,
) -> Box<dyn satwatch_domain::repositories::metric_source::MetricSource> {
    let options = SourceOptions {
        calendar: metric.calendar,
        cadence: metric.cadence,
        pacing: Duration::from_millis(metric.pacing_ms),
    };
    tracing::debug!(
        metric = %metric.name,
        source = metric.source.kind(),
        cadence = ?metric.cadence,
        calendar = ?metric.calendar,
        "source configured"
    );
    build_source(&metric.source, &options, http, endpoints)
}
