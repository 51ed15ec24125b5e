//! # HTTP Transport Module
//!
//! A single serialized request pipeline to the game server.
//!
//! ## Features
//!
//! - **Throttle**: a process-wide minimum gap (default 1 s) between any two
//!   outbound requests; the difference is slept before issuing
//! - **Retries**: bounded retries with exponential backoff on any transport
//!   failure, including timeouts and non-2xx statuses
//! - **Normalization**: every caller sees a JSON object; list replies are
//!   collapsed to their first element, scalars to an empty object
//! - **Raw dump**: each response body is appended to the API dump log
//!   (routed by log target, see `init_logging` in the binary)
//!
//! The server rejects requests without browser-shaped headers, a token query
//! parameter, and (on some endpoints) a token-bearing referer; all three are
//! applied here so callers only name an [`Endpoint`] and a body.

pub mod endpoints;
pub mod types;

use log::{debug, info, warn};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::config::ApiConfig;
use crate::logutil::escape_log_limited;
pub use endpoints::{Endpoint, Method};
pub use types::JsonMap;

const ORIGIN: &str = "https://ruby-king.ru";
const USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";

/// Preview window for the raw response dump.
const DUMP_PREVIEW: usize = 4000;

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP status {0}")]
    Status(u16),

    #[error("request timed out after {0} s")]
    Timeout(u64),

    #[error("response body was not JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// All retries spent. Carries the last underlying failure.
    #[error("transport failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Wall time to sleep before the next request may be issued.
pub fn throttle_wait(last: Option<Instant>, now: Instant, gap: Duration) -> Duration {
    match last {
        None => Duration::ZERO,
        Some(t) => gap.saturating_sub(now.saturating_duration_since(t)),
    }
}

/// Collapse a decoded JSON value to an object: a list becomes its first
/// element (or `{}` when empty or non-object), anything else becomes `{}`.
pub fn normalize(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => map,
            _ => JsonMap::new(),
        },
        _ => JsonMap::new(),
    }
}

/// Throttled, retried client for the game API.
///
/// The client is exclusively owned by the engine; `&mut self` on
/// [`ApiClient::request`] serializes all traffic through the one pipeline.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    referer: String,
    min_gap: Duration,
    max_retries: u32,
    retry_delay: Duration,
    timeout_secs: u64,
    last_request: Option<Instant>,
}

impl ApiClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().build()?;
        let referer = format!(
            "{}/city?name={}&timeEnd={}",
            ORIGIN,
            cfg.token,
            chrono::Utc::now().timestamp_millis()
        );
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
            referer,
            min_gap: Duration::from_millis(cfg.min_request_gap_ms),
            max_retries: cfg.max_retries,
            retry_delay: Duration::from_secs(cfg.retry_delay_secs),
            timeout_secs: cfg.timeout_secs,
            last_request: None,
        })
    }

    /// Issue one logical request and return the normalized reply object.
    ///
    /// Sleeps whatever remains of the inter-request gap, then tries up to
    /// the configured retry budget with delays of `retry_delay * 2^attempt`
    /// between attempts.
    pub async fn request(
        &mut self,
        endpoint: Endpoint,
        body: Option<Value>,
    ) -> Result<JsonMap, ApiError> {
        let attempts = self.max_retries.max(1);
        let mut last = String::new();
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry_delay * 2u32.pow(attempt - 1);
                warn!(
                    "{}: retrying in {:?} (attempt {}/{}): {}",
                    endpoint.name(),
                    delay,
                    attempt + 1,
                    attempts,
                    last
                );
                sleep(delay).await;
            }
            self.pace().await;
            match self.attempt(endpoint, body.as_ref()).await {
                Ok(reply) => return Ok(reply),
                Err(e) => last = e.to_string(),
            }
        }
        Err(ApiError::Exhausted { attempts, last })
    }

    async fn pace(&mut self) {
        let wait = throttle_wait(self.last_request, Instant::now(), self.min_gap);
        if !wait.is_zero() {
            debug!("throttle: sleeping {:?}", wait);
            sleep(wait).await;
        }
        self.last_request = Some(Instant::now());
    }

    async fn attempt(&self, endpoint: Endpoint, body: Option<&Value>) -> Result<JsonMap, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let mut req = match endpoint.method() {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        req = req
            .query(&[("name", self.token.as_str())])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ORIGIN, ORIGIN);
        if endpoint.needs_referer() {
            req = req.header(reqwest::header::REFERER, self.referer.as_str());
        }
        if endpoint.method() == Method::Post {
            req = req.json(body.unwrap_or(&Value::Object(Default::default())));
        }

        let response = timeout(Duration::from_secs(self.timeout_secs), req.send())
            .await
            .map_err(|_| ApiError::Timeout(self.timeout_secs))??;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        info!(
            target: "api",
            "{} {}",
            endpoint.name(),
            escape_log_limited(&text, DUMP_PREVIEW)
        );
        let value: Value = serde_json::from_str(&text)?;
        Ok(normalize(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_passes_objects_through() {
        let map = normalize(json!({"status": "success"}));
        assert_eq!(map.get("status").unwrap(), "success");
    }

    #[test]
    fn normalize_takes_first_list_element() {
        let map = normalize(json!([{"a": 1}, {"b": 2}]));
        assert_eq!(map.get("a").unwrap(), 1);
        assert!(map.get("b").is_none());
    }

    #[test]
    fn normalize_empty_list_is_empty_map() {
        assert!(normalize(json!([])).is_empty());
    }

    #[test]
    fn normalize_scalars_are_empty_map() {
        assert!(normalize(json!(7)).is_empty());
        assert!(normalize(json!("ok")).is_empty());
        assert!(normalize(Value::Null).is_empty());
    }

    #[test]
    fn normalize_list_of_scalars_is_empty_map() {
        assert!(normalize(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn throttle_wait_sleeps_the_difference() {
        let gap = Duration::from_secs(1);
        let t0 = Instant::now();
        assert_eq!(throttle_wait(None, t0, gap), Duration::ZERO);

        let wait = throttle_wait(Some(t0), t0 + Duration::from_millis(300), gap);
        assert_eq!(wait, Duration::from_millis(700));

        let wait = throttle_wait(Some(t0), t0 + Duration::from_millis(1500), gap);
        assert_eq!(wait, Duration::ZERO);

        // Exactly at the gap boundary: no extra sleep.
        let wait = throttle_wait(Some(t0), t0 + gap, gap);
        assert_eq!(wait, Duration::ZERO);
    }
}
