use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use satwatch_domain::repositories::metric_source::FetchError;
use serde::de::DeserializeOwned;
use std::thread;
use std::time::{Duration, Instant};

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retries: 3,
            backoff_ms: 1_000,
            user_agent: concat!("satwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Blocking GET client shared by every source adapter. Retries 5xx and transport
/// failures with linear backoff; 429 waits out `Retry-After` while the budget lasts.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
    backoff: Duration,
    timeout_ms: u64,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, String> {
        Self::with_headers(settings, Vec::new())
    }

    pub fn with_headers(
        settings: &HttpSettings,
        extra_headers: Vec<(String, String)>,
    ) -> Result<Self, String> {
        let mut headers = HeaderMap::new();
        for (name, value) in extra_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name: {name}"))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| format!("invalid header value for {name}"))?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            client,
            retries: settings.retries,
            backoff: Duration::from_millis(settings.backoff_ms),
            timeout_ms: settings.timeout_ms,
        })
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        source: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.get_text(source, url, query)?;
        serde_json::from_str(&body).map_err(|err| {
            FetchError::Decode(format!("{source}: invalid JSON from {url}: {err}"))
        })
    }

    pub fn get_text(
        &self,
        source: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let span = tracing::info_span!(
            "infra.http.get",
            source,
            url = %url,
            timeout_ms = self.timeout_ms,
            retries = self.retries
        );
        let _enter = span.enter();

        let start = Instant::now();
        let mut attempts = 0u32;
        let mut last_error = FetchError::Transport(format!("{source}: no request sent"));

        while attempts <= self.retries {
            attempts += 1;
            if attempts > 1 {
                metrics::counter!("satwatch.http.retries_total", "source" => source).increment(1);
                tracing::debug!(attempt = attempts, "retrying request");
            }

            metrics::counter!("satwatch.http.requests_total", "source" => source).increment(1);
            let attempt_start = Instant::now();
            let response = self.client.get(url).query(query).send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    metrics::histogram!(
                        "satwatch.http.attempt_ms",
                        "source" => source,
                        "status" => status.as_u16().to_string()
                    )
                    .record(attempt_start.elapsed().as_millis() as f64);

                    if status.is_success() {
                        let body = resp.text().map_err(|err| {
                            FetchError::Transport(format!("{source}: failed to read body: {err}"))
                        })?;
                        metrics::histogram!("satwatch.http.call_ms", "source" => source, "result" => "ok")
                            .record(start.elapsed().as_millis() as f64);
                        return Ok(body);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = retry_after(&resp).unwrap_or(self.backoff * attempts);
                        last_error = FetchError::RateLimited(format!(
                            "{source}: rate limited (retry after {}s)",
                            wait.as_secs()
                        ));
                        if attempts <= self.retries && wait <= MAX_RETRY_AFTER {
                            tracing::warn!(wait_ms = wait.as_millis() as u64, "rate limited, waiting");
                            thread::sleep(wait);
                            continue;
                        }
                        break;
                    }

                    let message = resp
                        .text()
                        .map(|body| truncate(&body, 200))
                        .unwrap_or_default();
                    last_error = FetchError::Http {
                        status: status.as_u16(),
                        message: format!("{source}: {message}"),
                    };
                    if status.is_server_error() && attempts <= self.retries {
                        thread::sleep(self.backoff * attempts);
                        continue;
                    }
                    break;
                }
                Err(err) => {
                    metrics::histogram!(
                        "satwatch.http.attempt_ms",
                        "source" => source,
                        "status" => "err"
                    )
                    .record(attempt_start.elapsed().as_millis() as f64);
                    last_error = FetchError::Transport(format!("{source}: request failed: {err}"));
                    if attempts <= self.retries {
                        thread::sleep(self.backoff * attempts);
                        continue;
                    }
                    break;
                }
            }
        }

        metrics::counter!(
            "satwatch.http.errors_total",
            "source" => source,
            "kind" => last_error.kind()
        )
        .increment(1);
        metrics::histogram!("satwatch.http.call_ms", "source" => source, "result" => "err")
            .record(start.elapsed().as_millis() as f64);
        tracing::warn!(attempts, error = %last_error, "request failed");
        Err(last_error)
    }
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
