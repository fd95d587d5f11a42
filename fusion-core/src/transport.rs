use std::fmt::Debug;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;

/// Minimal HTTP GET abstraction used by forecast sources.
///
/// Returns the response body for 2xx responses and an error otherwise.
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("weather-fusion/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        let status = res.status();
        let body = res.text().await.context("Failed to read response body")?;

        if !status.is_success() {
            return Err(anyhow!("Request failed with status {}: {}", status, truncate_body(&body)));
        }

        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
