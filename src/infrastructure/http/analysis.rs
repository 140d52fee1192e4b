//! HTTP adapter for the analysis service.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::errors::ServiceError;
use crate::domain::ports::{AnalysisRequest, AnalysisResponse, AnalysisService};

use super::{build_client, check_status, transport};

/// Wire reply from the analysis endpoint.
#[derive(Debug, Deserialize)]
struct AnalyzeReply {
    success: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpAnalysisService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ServiceError> {
        let response = self
            .http
            .post(format!("{}/analyze", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)?;

        let reply: AnalyzeReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;

        if !reply.success {
            return Err(ServiceError::Degraded(
                reply
                    .error
                    .unwrap_or_else(|| "analysis service reported failure".to_string()),
            ));
        }
        match reply.result {
            Some(output) if !output.trim().is_empty() => Ok(AnalysisResponse { output }),
            _ => Err(ServiceError::Protocol(
                "successful reply carried no result".to_string(),
            )),
        }
    }
}
