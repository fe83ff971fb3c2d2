use async_trait::async_trait;
use reqwest::header;
use tracing::{info, warn};

use crate::gateway::{SubmissionGateway, SubmitError};
use crate::models::Feedback;

/// Posts the record as JSON to a caller-chosen endpoint, such as a
/// `feedback-relay` instance. Any 2xx counts as delivered.
pub struct HttpGateway {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), token: None, client: reqwest::Client::new() }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() { None } else { Some(token) };
        self
    }
}

#[async_trait]
impl SubmissionGateway for HttpGateway {
    async fn submit(&self, record: &Feedback) -> Result<(), SubmitError> {
        let mut req = self.client.post(&self.endpoint).json(record);
        if let Some(token) = &self.token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "feedback endpoint rejected submission");
            return Err(SubmitError::Rejected(status.as_u16()));
        }
        info!(endpoint = %self.endpoint, id = %record.id, "feedback delivered");
        Ok(())
    }
}
