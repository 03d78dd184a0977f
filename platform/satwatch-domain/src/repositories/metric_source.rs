use crate::value_objects::date_range::DateRange;
use crate::value_objects::record::Record;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    RateLimited(String),
    Http { status: u16, message: String },
    Transport(String),
    Decode(String),
    Unavailable(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited(_) => "rate_limited",
            FetchError::Http { .. } => "http_status",
            FetchError::Transport(_) => "transport",
            FetchError::Decode(_) => "decode",
            FetchError::Unavailable(_) => "unavailable",
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::RateLimited(msg) => write!(f, "rate limited: {msg}"),
            FetchError::Http { status, message } => write!(f, "http status {status}: {message}"),
            FetchError::Transport(msg) => write!(f, "transport: {msg}"),
            FetchError::Decode(msg) => write!(f, "decode: {msg}"),
            FetchError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// How a sync turns missing ranges into upstream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshScope {
    /// Each missing range is requested on its own.
    #[default]
    Gaps,
    /// Any missing range triggers one request for the whole window, and the reply replaces
    /// every cached record inside it. For sources that scale values to the requested period.
    Window,
}

/// Upstream for one metric. Must be deterministic for a given range and remote state,
/// and must report inability to fetch as an empty result or an error, never as
/// fabricated records.
pub trait MetricSource {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError>;

    fn refresh_scope(&self) -> RefreshScope {
        RefreshScope::Gaps
    }
}

impl<T: MetricSource + ?Sized> MetricSource for Box<T> {
    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>, FetchError> {
        (**self).fetch(range)
    }

    fn refresh_scope(&self) -> RefreshScope {
        (**self).refresh_scope()
    }
}
