//! HTTP adapter for the debate service.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::errors::ServiceError;
use crate::domain::models::DebateRound;
use crate::domain::ports::{DebateRequest, DebateResponse, DebateService};

use super::{build_client, check_status, transport};

/// Wire reply from the debate endpoint. The verdict arrives as a
/// recommendation for directional debates and a risk level for risk debates.
#[derive(Debug, Deserialize)]
struct DebateReply {
    success: bool,
    #[serde(default)]
    sides: Vec<WireRound>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    risk_level: Option<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    degraded: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRound {
    side: String,
    content: String,
    #[serde(default)]
    round: u32,
}

pub struct HttpDebateService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDebateService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DebateService for HttpDebateService {
    async fn run_debate(&self, request: &DebateRequest) -> Result<DebateResponse, ServiceError> {
        let response = self
            .http
            .post(format!("{}/debate", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)?;

        let reply: DebateReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;

        if !reply.success {
            return Err(ServiceError::Degraded(
                reply
                    .error
                    .unwrap_or_else(|| "debate service reported failure".to_string()),
            ));
        }

        let verdict = reply
            .recommendation
            .or(reply.risk_level)
            .unwrap_or_default();
        Ok(DebateResponse {
            side_views: reply
                .sides
                .into_iter()
                .map(|round| DebateRound {
                    side: round.side,
                    content: round.content,
                    round: round.round,
                })
                .collect(),
            verdict,
            summary: reply.summary,
            degraded: reply.degraded,
        })
    }
}
