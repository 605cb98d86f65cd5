//! Native HTTP client using reqwest

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::RelationsConfig;
use crate::error::FetchError;

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn from_config(config: &RelationsConfig) -> Result<Self, FetchError> {
        Self::new(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// GET `url` with query `params` and return the body.
    ///
    /// Resolves to `FetchError::Cancelled` as soon as `cancel` fires, dropping
    /// the in-flight request.
    pub async fn get_with_params(
        &self,
        url: &str,
        params: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let url = reqwest::Url::parse_with_params(url, params).map_err(|e| FetchError::Http {
            message: format!("Invalid URL {}: {}", url, e),
        })?;

        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.get(url) => result,
        }
    }

    async fn get(&self, url: reqwest::Url) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Parse {
            message: e.to_string(),
        })
    }
}
