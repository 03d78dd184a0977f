use super::{clip, utc_from_seconds};
use crate::http::HttpClient;
use satwatch_domain::repositories::metric_source::{FetchError, MetricSource, RefreshScope};
use satwatch_domain::value_objects::date_range::DateRange;
use satwatch_domain::value_objects::record::Record;
use serde::Deserialize;
use std::thread;
use std::time::Duration;

pub const FEAR_GREED_COLUMN: &str = "Fear & Greed Value";
const TRENDS_LANGUAGE: &str = "en-US";
const TRENDS_TZ_OFFSET: &str = "360";

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedPoint>,
}

#[derive(Debug, Deserialize)]
struct FearGreedPoint {
    value: String,
    timestamp: String,
}

/// alternative.me Fear & Greed index, full history in one call.
pub struct FearGreedSource {
    http: HttpClient,
    base_url: String,
}

impl FearGreedSource {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl MetricSource for FearGreedSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let url = format!("{}/fng/", self.base_url);
        let response: FearGreedResponse = self.http.get_json(
            "fear_greed",
            &url,
            &[("limit", "0".to_string()), ("format", "json".to_string())],
        )?;

        let mut records = Vec::with_capacity(response.data.len());
        for point in response.data {
            let secs: i64 = point.timestamp.parse().map_err(|_| {
                FetchError::Decode(format!("invalid fear & greed timestamp {:?}", point.timestamp))
            })?;
            let value: f64 = point.value.parse().map_err(|_| {
                FetchError::Decode(format!("invalid fear & greed value {:?}", point.value))
            })?;
            if let Some(ts) = utc_from_seconds(secs) {
                records.push(Record::new(ts).with(FEAR_GREED_COLUMN, value));
            }
        }
        Ok(clip(records, range))
    }
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<ExploreWidget>,
}

#[derive(Debug, Deserialize)]
struct ExploreWidget {
    id: String,
    token: String,
    request: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: MultilineData,
}

#[derive(Debug, Deserialize)]
struct MultilineData {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct TimelinePoint {
    time: String,
    #[serde(default)]
    value: Vec<f64>,
}

/// Google Trends interest over time. Two steps: `explore` hands out a token for the
/// timeseries widget, `widgetdata/multiline` returns the series. Columns are `"<keyword> Trend"`.
pub struct SearchTrendsSource {
    http: HttpClient,
    base_url: String,
    keywords: Vec<String>,
    pacing: Duration,
}

impl SearchTrendsSource {
    pub fn new(http: HttpClient, base_url: &str, keywords: Vec<String>, pacing: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            keywords,
            pacing,
        }
    }

    fn explore(&self, range: &DateRange) -> Result<ExploreWidget, FetchError> {
        let timeframe = format!(
            "{} {}",
            range.start().format("%Y-%m-%d"),
            range.end().format("%Y-%m-%d")
        );
        let items: Vec<serde_json::Value> = self
            .keywords
            .iter()
            .map(|kw| serde_json::json!({ "keyword": kw, "geo": "", "time": timeframe }))
            .collect();
        let req = serde_json::json!({ "comparisonItem": items, "category": 0, "property": "" });

        let body = self.http.get_text(
            "google_trends",
            &format!("{}/trends/api/explore", self.base_url),
            &[
                ("hl", TRENDS_LANGUAGE.to_string()),
                ("tz", TRENDS_TZ_OFFSET.to_string()),
                ("req", req.to_string()),
            ],
        )?;
        let explore: ExploreResponse = parse_guarded_json(&body)?;
        explore
            .widgets
            .into_iter()
            .find(|w| w.id == "TIMESERIES")
            .ok_or_else(|| FetchError::Unavailable("google trends: no TIMESERIES widget".to_string()))
    }
}

impl MetricSource for SearchTrendsSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        let widget = self.explore(range)?;
        if !self.pacing.is_zero() {
            thread::sleep(self.pacing);
        }

        let body = self.http.get_text(
            "google_trends",
            &format!("{}/trends/api/widgetdata/multiline", self.base_url),
            &[
                ("hl", TRENDS_LANGUAGE.to_string()),
                ("tz", TRENDS_TZ_OFFSET.to_string()),
                ("req", widget.request.to_string()),
                ("token", widget.token),
            ],
        )?;
        let data: MultilineResponse = parse_guarded_json(&body)?;

        let mut records = Vec::with_capacity(data.default.timeline_data.len());
        for point in data.default.timeline_data {
            let secs: i64 = point
                .time
                .parse()
                .map_err(|_| FetchError::Decode(format!("invalid trends time {:?}", point.time)))?;
            let Some(ts) = utc_from_seconds(secs) else {
                continue;
            };
            let mut record = Record::new(ts);
            for (keyword, value) in self.keywords.iter().zip(point.value) {
                record.insert(&format!("{keyword} Trend"), value);
            }
            if !record.is_empty() {
                records.push(record);
            }
        }
        Ok(clip(records, range))
    }

    /// Values are relative to the peak of the requested timeframe, and timeframes over about
    /// nine months come back weekly.
    fn refresh_scope(&self) -> RefreshScope {
        RefreshScope::Window
    }
}

/// Google prefixes JSON bodies with `)]}'` to defeat script inclusion.
fn parse_guarded_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let start = body
        .find('{')
        .ok_or_else(|| FetchError::Decode("google trends: response has no JSON object".to_string()))?;
    serde_json::from_str(&body[start..])
        .map_err(|err| FetchError::Decode(format!("google trends: invalid JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{FearGreedSource, SearchTrendsSource, FEAR_GREED_COLUMN};
    use crate::http::{HttpClient, HttpSettings};
    use crate::test_support::{http_response, json_ok, try_spawn_server};
    use chrono::NaiveDate;
    use satwatch_domain::repositories::metric_source::{FetchError, MetricSource, RefreshScope};
    use satwatch_domain::value_objects::date_range::DateRange;
    use std::time::Duration;

    fn client() -> HttpClient {
        HttpClient::new(&HttpSettings {
            retries: 0,
            ..HttpSettings::default()
        })
        .expect("client")
    }

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, start).expect("date"),
            NaiveDate::from_ymd_opt(2024, 1, end).expect("date"),
        )
        .expect("range")
    }

    #[test]
    fn fear_greed_parses_string_fields() {
        let body = r#"{"name":"Fear and Greed Index","data":[
            {"value":"70","value_classification":"Greed","timestamp":"1704153600"},
            {"value":"65","value_classification":"Greed","timestamp":"1704067200"},
            {"value":"40","value_classification":"Fear","timestamp":"1703980800"}
        ],"metadata":{"error":null}}"#;
        let Some(server) = try_spawn_server(vec![json_ok(body)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = FearGreedSource::new(client(), &server.base_url);
        let records = source.fetch(&range(1, 2)).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(FEAR_GREED_COLUMN), Some(65.0));
        assert!(server.requests()[0].starts_with("GET /fng/?limit=0"));
    }

    #[test]
    fn search_trends_runs_explore_then_multiline() {
        let explore = r#")]}'
{"widgets":[{"id":"RELATED_QUERIES","token":"x","request":{}},{"id":"TIMESERIES","token":"tok123","request":{"time":"2024-01-01 2024-01-02"}}]}"#;
        let multiline = r#")]}',
{"default":{"timelineData":[{"time":"1704067200","formattedTime":"Jan 1, 2024","value":[55,20,10]},{"time":"1704153600","formattedTime":"Jan 2, 2024","value":[60,22,11]}]}}"#;
        let Some(server) = try_spawn_server(vec![
            http_response(200, "OK", "application/javascript", explore),
            http_response(200, "OK", "application/javascript", multiline),
        ]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = SearchTrendsSource::new(
            client(),
            &server.base_url,
            vec!["bitcoin".to_string(), "BTC".to_string(), "crypto".to_string()],
            Duration::ZERO,
        );
        let records = source.fetch(&range(1, 2)).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("bitcoin Trend"), Some(60.0));
        assert_eq!(records[0].get("crypto Trend"), Some(10.0));

        let requests = server.requests();
        assert!(requests[0].starts_with("GET /trends/api/explore?"), "{}", requests[0]);
        assert!(requests[1].contains("token=tok123"), "{}", requests[1]);
    }

    #[test]
    fn search_trends_refresh_the_whole_window() {
        let source = SearchTrendsSource::new(
            client(),
            "http://127.0.0.1:9",
            vec!["bitcoin".to_string()],
            Duration::ZERO,
        );
        assert_eq!(source.refresh_scope(), RefreshScope::Window);
        let boxed: Box<dyn MetricSource> = Box::new(source);
        assert_eq!(boxed.refresh_scope(), RefreshScope::Window);

        let fear_greed = FearGreedSource::new(client(), "http://127.0.0.1:9");
        assert_eq!(fear_greed.refresh_scope(), RefreshScope::Gaps);
    }

    #[test]
    fn search_trends_without_timeseries_widget_is_unavailable() {
        let Some(server) = try_spawn_server(vec![json_ok(r#"{"widgets":[]}"#)]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let source = SearchTrendsSource::new(
            client(),
            &server.base_url,
            vec!["bitcoin".to_string()],
            Duration::ZERO,
        );
        let err = source.fetch(&range(1, 2)).expect_err("unavailable");
        assert!(matches!(err, FetchError::Unavailable(_)), "{err}");
    }
}
