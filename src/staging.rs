use log::{info, warn};
use std::path::PathBuf;
use tempfile::TempDir;

use crate::models::Attachment;

/// Writes attachments to a private temp directory so a previewer can open
/// them by path. The directory is removed when the stager is dropped.
///
/// Staging is best effort: every I/O failure is logged and reported as
/// `None`, the attachment and its record stay usable.
pub struct PreviewStager {
    dir: Option<TempDir>,
}

impl PreviewStager {
    pub fn new() -> Self {
        let dir = match tempfile::Builder::new().prefix("feedback-preview-").tempdir() {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("preview staging unavailable: cannot create temp dir: {e}");
                None
            }
        };
        Self { dir }
    }

    pub fn is_available(&self) -> bool {
        self.dir.is_some()
    }

    /// Returns the path of the staged copy, or `None` if staging failed.
    pub fn stage(&self, attachment: &Attachment) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let path = dir.path().join(format!("{}_{}", attachment.id.simple(), attachment.file_name()));
        match std::fs::write(&path, &attachment.data) {
            Ok(()) => {
                info!("staged attachment id={} bytes={} path={}", attachment.id, attachment.size(), path.display());
                Some(path)
            }
            Err(e) => {
                warn!("failed to stage attachment id={} name={}: {e}", attachment.id, attachment.name);
                None
            }
        }
    }
}

impl Default for PreviewStager {
    fn default() -> Self {
        Self::new()
    }
}
