use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::Feedback;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("attachment upload failed with status {0}")]
    UploadFailed(u16),
    #[error("issue creation failed with status {0}")]
    CreateFailed(u16),
    #[error("endpoint rejected submission with status {0}")]
    Rejected(u16),
    #[error("transport: {0}")]
    Transport(String),
}

impl SubmitError {
    /// Text suitable for showing to the person who filed the report.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::MissingCredential => {
                "Feedback could not be sent: the reporting service is not configured.".into()
            }
            SubmitError::UploadFailed(code) => {
                format!("An attachment could not be uploaded (HTTP {code}). Please try again.")
            }
            SubmitError::CreateFailed(code) | SubmitError::Rejected(code) => {
                format!("Feedback could not be sent (HTTP {code}). Please try again.")
            }
            SubmitError::InvalidResponse(_) => {
                "The reporting service returned an unexpected response.".into()
            }
            SubmitError::Transport(_) => {
                "Feedback could not be sent. Check your connection and try again.".into()
            }
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SubmitError::InvalidResponse(e.to_string())
        } else {
            SubmitError::Transport(e.to_string())
        }
    }
}

/// Delivers one feedback record somewhere. Every call is an independent
/// attempt; implementations do not retry and do not mutate the record.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, record: &Feedback) -> Result<(), SubmitError>;
}

/// Always succeeds after a fixed delay. Makes no network calls.
pub struct MockGateway {
    delay: Duration,
    submitted: AtomicUsize,
}

impl MockGateway {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::with_delay(Self::DEFAULT_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, submitted: AtomicUsize::new(0) }
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionGateway for MockGateway {
    async fn submit(&self, record: &Feedback) -> Result<(), SubmitError> {
        tokio::time::sleep(self.delay).await;
        self.submitted.fetch_add(1, Ordering::SeqCst);
        info!(title = %record.title(), id = %record.id, "mock gateway accepted feedback");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, SystemInfo};

    #[tokio::test]
    async fn mock_accepts_every_attempt() {
        let gw = MockGateway::with_delay(Duration::from_millis(5));
        let fb = Feedback::with_content(SystemInfo::unknown(), "Crash on share", "", Category::BugReport);
        gw.submit(&fb).await.unwrap();
        gw.submit(&fb).await.unwrap();
        assert_eq!(gw.submitted(), 2);
    }

    #[test]
    fn user_messages_carry_status() {
        assert!(SubmitError::UploadFailed(413).user_message().contains("413"));
        assert!(SubmitError::CreateFailed(422).user_message().contains("422"));
    }
}
