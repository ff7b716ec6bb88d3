use async_trait::async_trait;
use reqwest::Client;

use crate::ReportError;

/// Source of the current token price.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn fetch_price(&self) -> Result<serde_json::Value, ReportError>;
}

/// GETs a price document from a fixed URL and returns it verbatim.
#[derive(Debug, Clone)]
pub struct HttpPriceLookup {
    client: Client,
    url: String,
}

impl HttpPriceLookup {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PriceLookup for HttpPriceLookup {
    async fn fetch_price(&self) -> Result<serde_json::Value, ReportError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReportError::Price(format!("HTTP {}", status.as_u16())));
        }
        Ok(resp.json().await?)
    }
}
