//! HTTP adapter for the remote session store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ServiceError;
use crate::domain::models::SessionStatus;
use crate::domain::ports::{RemoteSessionStatus, SessionStore};

use super::{build_client, check_status, transport};

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    stock_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateReply {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct ResultRequest<'a> {
    task_id: &'a str,
    output: &'a str,
}

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    status: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: String,
    stock_code: String,
    #[serde(default)]
    completed_tasks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResultReply {
    #[serde(default)]
    output: Option<String>,
}

pub struct HttpSessionStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSessionStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn create(&self, stock_code: &str) -> Result<String, ServiceError> {
        let response = self
            .http
            .post(format!("{}/sessions", self.base_url))
            .json(&CreateRequest { stock_code })
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)?;
        let reply: CreateReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;
        Ok(reply.session_id)
    }

    async fn start(&self, session_id: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(format!("{}/sessions/{session_id}/start", self.base_url))
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)
    }

    async fn record_task_result(
        &self,
        session_id: &str,
        task_id: &str,
        output: &str,
    ) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(format!("{}/sessions/{session_id}/results", self.base_url))
            .json(&ResultRequest { task_id, output })
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)
    }

    async fn complete(&self, session_id: &str, status: SessionStatus) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(format!("{}/sessions/{session_id}/complete", self.base_url))
            .json(&CompleteRequest {
                status: status.as_str(),
            })
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)
    }

    async fn status(&self, session_id: &str) -> Result<RemoteSessionStatus, ServiceError> {
        let response = self
            .http
            .get(format!("{}/sessions/{session_id}/status", self.base_url))
            .send()
            .await
            .map_err(transport)?;
        check_status(&response)?;
        let reply: StatusReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;
        let status = SessionStatus::from_str(&reply.status)
            .ok_or_else(|| ServiceError::Protocol(format!("unknown status {:?}", reply.status)))?;
        Ok(RemoteSessionStatus {
            status,
            stock_code: reply.stock_code,
            completed_tasks: reply.completed_tasks,
        })
    }

    async fn task_result(
        &self,
        session_id: &str,
        task_id: &str,
    ) -> Result<Option<String>, ServiceError> {
        let response = self
            .http
            .get(format!(
                "{}/sessions/{session_id}/results/{task_id}",
                self.base_url
            ))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(&response)?;
        let reply: ResultReply = response
            .json()
            .await
            .map_err(|err| ServiceError::Protocol(err.to_string()))?;
        Ok(reply.output)
    }
}
