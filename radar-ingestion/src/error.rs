use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while collecting or processing artist data.
///
/// The variant decides what the caller does next: transient and rate-limit
/// failures are retried, `NotFound` and `Malformed` skip a single artist, and
/// the rest surface as a failed stage.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Fatal(String),
}

pub type CollectResult<T> = Result<T, CollectError>;

impl CollectError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CollectError::RateLimited(_))
    }

    /// Errors worth another attempt after a pause.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CollectError::TransientNetwork(_)
                | CollectError::RateLimited(_)
                | CollectError::Timeout(_)
        )
    }

    /// Network blips and timeouts, retried in place for the same artist.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CollectError::TransientNetwork(_) | CollectError::Timeout(_)
        )
    }

    /// Errors that only cost the current artist, never the whole pass.
    /// Transient ones get here once their retries are spent.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            CollectError::NotFound(_)
                | CollectError::Malformed(_)
                | CollectError::TransientNetwork(_)
                | CollectError::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for CollectError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return classify_status(status, &e.to_string());
        }
        if e.is_timeout() {
            CollectError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() {
            CollectError::TransientNetwork(e.to_string())
        } else if e.is_decode() || e.is_body() {
            CollectError::Malformed(e.to_string())
        } else {
            CollectError::Fatal(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CollectError {
    fn from(e: serde_json::Error) -> Self {
        CollectError::Malformed(e.to_string())
    }
}

impl From<csv::Error> for CollectError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            match e.into_kind() {
                csv::ErrorKind::Io(io) => CollectError::Io(io),
                other => CollectError::Fatal(format!("{:?}", other)),
            }
        } else {
            CollectError::Malformed(e.to_string())
        }
    }
}

fn mentions_rate_limit(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("ratelimit")
        || lower.contains("quotaexceeded")
        || lower.contains("too many requests")
}

/// Map a non-success HTTP status (and its body text) onto the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> CollectError {
    let message = format!("{}: {}", status, preview(body, 300));

    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::UNAUTHORIZED
        || mentions_rate_limit(body)
    {
        return CollectError::RateLimited(message);
    }

    match status {
        StatusCode::NOT_FOUND => CollectError::NotFound(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            CollectError::Timeout(message)
        }
        s if s.is_server_error() => CollectError::TransientNetwork(message),
        _ => CollectError::Fatal(message),
    }
}

/// First `max` bytes of a response body, cut on a char boundary.
pub fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
