use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, UPGRADE_INSECURE_REQUESTS};
use tracing::warn;

use crate::error::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Anything that can turn a URL into page markup.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// Caller-level timeout escalation, layered above transport retries.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    pub initial: Duration,
    pub step: Duration,
    pub ceiling: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            initial: Duration::from_secs(30),
            step: Duration::from_secs(15),
            ceiling: Duration::from_secs(60),
        }
    }
}

/// Fetch a page, re-issuing with a longer timeout while below the ceiling.
pub async fn fetch_page<F: Fetcher>(
    fetcher: &F,
    url: &str,
    policy: &TimeoutPolicy,
) -> Result<String, FetchError> {
    let mut timeout = policy.initial;
    loop {
        match fetcher.fetch(url, timeout).await {
            Err(e) if e.is_timeout() && timeout < policy.ceiling => {
                let next = (timeout + policy.step).min(policy.ceiling);
                if next <= timeout {
                    return Err(e);
                }
                timeout = next;
                warn!("{} (retrying with {:?} timeout)", e, timeout);
            }
            other => return other,
        }
    }
}

/// reqwest-backed transport with browser-like headers and status retries.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_attempts: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(max_attempts: u32, backoff: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .build()?;
        Ok(HttpFetcher {
            client,
            max_attempts: max_attempts.max(1),
            backoff,
        })
    }

    async fn attempt(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| classify(url, timeout, e))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            let err = match self.attempt(url, timeout).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };
            attempt += 1;
            if !is_transient(&err) || attempt >= self.max_attempts {
                return Err(err);
            }

            let backoff = backoff_delay(self.backoff, attempt);
            warn!(
                "{} (attempt {}/{}), backing off {:.1}s",
                err,
                attempt,
                self.max_attempts,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

/// `base * 2^(attempt-1)`, saturating at `MAX_BACKOFF`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base.checked_mul(factor))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

fn classify(url: &str, timeout: Duration, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: e,
        }
    }
}

/// Timeouts are left to the caller's escalation policy.
fn is_transient(err: &FetchError) -> bool {
    match err {
        FetchError::Status { status, .. } => is_retry_status(*status),
        FetchError::Transport { source, .. } => source.is_connect(),
        FetchError::Timeout { .. } => false,
    }
}

pub fn is_retry_status(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}
