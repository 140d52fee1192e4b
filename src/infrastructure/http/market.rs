//! HTTP adapters for the market quote and citation providers.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::domain::errors::ServiceError;
use crate::domain::models::{Citation, MarketSnapshot};
use crate::domain::ports::{CitationProvider, MarketDataProvider};

use super::{build_client, check_status, transport};

#[derive(Debug, Deserialize)]
struct QuoteReply {
    code: String,
    name: String,
    price: f64,
    change_percent: f64,
    #[serde(default)]
    turnover: f64,
    #[serde(default)]
    pe_ratio: Option<f64>,
    #[serde(default)]
    pb_ratio: Option<f64>,
}

pub struct HttpMarketDataProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMarketDataProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    async fn snapshot(&self, stock_code: &str) -> Result<MarketSnapshot, ServiceError> {
        let response = self
            .http
            .get(format!("{}/quote/{stock_code}", self.base_url))
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)?;
        let reply: QuoteReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;
        Ok(MarketSnapshot {
            code: reply.code,
            name: reply.name,
            price: reply.price,
            change_percent: reply.change_percent,
            turnover: reply.turnover,
            pe_ratio: reply.pe_ratio,
            pb_ratio: reply.pb_ratio,
            captured_at: Utc::now(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CitationReply {
    #[serde(default)]
    citations: Vec<WireCitation>,
}

#[derive(Debug, Deserialize)]
struct WireCitation {
    name: String,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    description: String,
}

pub struct HttpCitationProvider {
    name: String,
    http: reqwest::Client,
    base_url: String,
}

impl HttpCitationProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            name: name.into(),
            http: build_client()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CitationProvider for HttpCitationProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn citations(
        &self,
        task_id: &str,
        stock_code: &str,
    ) -> Result<Vec<Citation>, ServiceError> {
        let response = self
            .http
            .get(format!("{}/citations/{task_id}", self.base_url))
            .query(&[("code", stock_code)])
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)?;
        let reply: CitationReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;
        Ok(reply
            .citations
            .into_iter()
            .map(|c| Citation {
                name: c.name,
                count: c.count,
                description: c.description,
            })
            .collect())
    }
}
