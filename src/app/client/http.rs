//! Core HTTP operations with rate limiting and retry logic
//!
//! Every request toward an extract server passes through one direct rate
//! limiter, and 429/503 responses or transport failures are retried with
//! exponential backoff.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::constants::limits;
use crate::errors::{DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidConfig` if `rate_limit_rps` is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> DownloadResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| DownloadError::InvalidConfig {
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    fn backoff_delay(retries: u32) -> Duration {
        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries))
    }

    /// Fetches the HTTP response with rate limiting and retry logic
    ///
    /// The response is returned whatever its final status; callers decide
    /// how to treat non-success codes.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request keeps failing after retries
    pub async fn get_response(&self, url: &Url) -> DownloadResult<Response> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let mut retries = 0;
        loop {
            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE;

                    if !retryable {
                        tracing::debug!("Fetched {} ({})", url, status);
                        return Ok(response);
                    }

                    if retries >= limits::MAX_RETRIES {
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            DownloadError::RateLimitExceeded
                        } else {
                            DownloadError::ServerOverloaded
                        });
                    }

                    retries += 1;
                    let delay = Self::backoff_delay(retries);
                    tracing::warn!(
                        "Server answered {} for {}. Backing off for {}ms",
                        status.as_u16(),
                        url,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = Self::backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        limits::MAX_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        limits::MAX_RETRIES,
                        e
                    );
                    return Err(DownloadError::MaxRetriesExceeded {
                        max_retries: limits::MAX_RETRIES,
                    });
                }
            }
        }
    }

    /// Fetches a page and returns its body as text
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::NotFound`, `Forbidden` or `ServerError` for
    /// non-success statuses, or the transport error after retries.
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        let response = Self::ensure_success(self.get_response(url).await?, url)?;
        let text = response.text().await?;
        tracing::debug!("Fetched page {} ({} bytes)", url, text.len());
        Ok(text)
    }

    /// Map a non-success status onto the matching error
    pub fn ensure_success(response: Response, url: &Url) -> DownloadResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(match status {
            StatusCode::NOT_FOUND => DownloadError::NotFound {
                url: url.to_string(),
            },
            StatusCode::FORBIDDEN => DownloadError::Forbidden {
                url: url.to_string(),
            },
            other => DownloadError::ServerError {
                status: other.as_u16(),
            },
        })
    }
}
