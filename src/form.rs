use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use crate::capture::{self, CaptureError, HierarchyDump, ScreenCapture};
use crate::gateway::{SubmissionGateway, SubmitError};
use crate::models::{Attachment, Category, Feedback, Id};
use crate::system_info::SystemInfoSource;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("title and description are required")]
    Incomplete,
    #[error("a submission is already in progress")]
    InFlight,
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl FormError {
    pub fn user_message(&self) -> String {
        match self {
            FormError::Incomplete => "Please enter a title and a description.".into(),
            FormError::InFlight => "Your feedback is already being sent.".into(),
            FormError::Submit(e) => e.user_message(),
        }
    }
}

/// Holds the record being edited and the submission policy around it:
/// submit is allowed only with a non-blank title and description, and
/// only one submission may run at a time.
pub struct FeedbackForm {
    record: Feedback,
    submitting: AtomicBool,
}

impl FeedbackForm {
    pub fn new(source: &dyn SystemInfoSource) -> Self {
        Self::from_record(Feedback::new(source.capture()))
    }

    pub fn from_record(record: Feedback) -> Self {
        Self { record, submitting: AtomicBool::new(false) }
    }

    pub fn record(&self) -> &Feedback {
        &self.record
    }

    pub fn into_record(self) -> Feedback {
        self.record
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.record.update_title(title);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.record.update_description(description);
    }

    pub fn set_category(&mut self, category: Category) {
        self.record.set_category(category);
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.record.attach(attachment);
    }

    pub fn remove_attachment(&mut self, id: Id) -> usize {
        self.record.detach(id)
    }

    pub fn add_screenshot(&mut self, source: &dyn ScreenCapture) -> Result<Id, CaptureError> {
        capture::attach_screenshot(&mut self.record, source)
    }

    pub fn add_view_hierarchy(&mut self, source: &dyn HierarchyDump) -> Result<Id, CaptureError> {
        capture::attach_view_hierarchy(&mut self.record, source)
    }

    pub fn can_submit(&self) -> bool {
        !self.is_submitting()
            && !self.record.title().trim().is_empty()
            && !self.record.description().trim().is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub async fn submit(&self, gateway: &dyn SubmissionGateway) -> Result<(), FormError> {
        if self.record.title().trim().is_empty() || self.record.description().trim().is_empty() {
            return Err(FormError::Incomplete);
        }
        let _guard = InFlight::acquire(&self.submitting).ok_or(FormError::InFlight)?;
        match gateway.submit(&self.record).await {
            Ok(()) => {
                info!(id = %self.record.id, "feedback submitted");
                Ok(())
            }
            Err(e) => {
                warn!(id = %self.record.id, error = %e, "feedback submission failed");
                Err(e.into())
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
