use anyhow::{anyhow, Context};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::FetchError;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

#[allow(async_fn_in_trait)]
pub trait HtmlFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;
}

/// Rate-limited HTTP fetcher with doubling retry delays.
pub struct WebHtmlFetcher {
    client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    max_retries: u32,
    initial_delay: Duration,
}

impl WebHtmlFetcher {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.scraping.user_agent)
            .timeout(Duration::from_secs(config.scraping.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limits.requests_per_second)
                .ok_or_else(|| anyhow!("Invalid requests_per_second value"))?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            max_retries: config.scraping.max_retries,
            initial_delay: INITIAL_RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "pt-BR,es;q=0.8,en;q=0.5")
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

impl HtmlFetcher for WebHtmlFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            self.rate_limiter.until_ready().await;
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt > self.max_retries => {
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    })
                }
                Err(e) => {
                    info!("Retry attempt {} after error: {}", attempt, e);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}
