use chrono::Utc;
use thiserror::Error;

use crate::models::{Attachment, Feedback, Id};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("screenshot capture failed: {0}")]
    Screenshot(anyhow::Error),
    #[error("view hierarchy dump failed: {0}")]
    Hierarchy(anyhow::Error),
    #[error("nothing captured")]
    Empty,
}

/// Platform hook that renders the current screen as PNG bytes.
pub trait ScreenCapture: Send + Sync {
    fn capture_png(&self) -> anyhow::Result<Vec<u8>>;
}

/// Platform hook that dumps the current view tree as text.
pub trait HierarchyDump: Send + Sync {
    fn dump(&self) -> anyhow::Result<String>;
}

pub fn screenshot_attachment(source: &dyn ScreenCapture) -> Result<Attachment, CaptureError> {
    let png = source.capture_png().map_err(CaptureError::Screenshot)?;
    if png.is_empty() {
        return Err(CaptureError::Empty);
    }
    let name = format!("screenshot_{}.png", Utc::now().format("%Y%m%d_%H%M%S"));
    Ok(Attachment::new(name, png, "image/png"))
}

pub fn hierarchy_attachment(source: &dyn HierarchyDump) -> Result<Attachment, CaptureError> {
    let text = source.dump().map_err(CaptureError::Hierarchy)?;
    if text.trim().is_empty() {
        return Err(CaptureError::Empty);
    }
    let name = format!("view_hierarchy_{}.txt", Utc::now().format("%Y%m%d_%H%M%S"));
    Ok(Attachment::new(name, text.into_bytes(), "text/plain; charset=utf-8"))
}

/// Captures a screenshot and appends it to `record`.
pub fn attach_screenshot(record: &mut Feedback, source: &dyn ScreenCapture) -> Result<Id, CaptureError> {
    let attachment = screenshot_attachment(source)?;
    let id = attachment.id;
    record.attach(attachment);
    Ok(id)
}

/// Dumps the view hierarchy and appends it to `record`.
pub fn attach_view_hierarchy(record: &mut Feedback, source: &dyn HierarchyDump) -> Result<Id, CaptureError> {
    let attachment = hierarchy_attachment(source)?;
    let id = attachment.id;
    record.attach(attachment);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemInfo;

    struct FixedScreen(Vec<u8>);
    impl ScreenCapture for FixedScreen {
        fn capture_png(&self) -> anyhow::Result<Vec<u8>> { Ok(self.0.clone()) }
    }

    struct BrokenScreen;
    impl ScreenCapture for BrokenScreen {
        fn capture_png(&self) -> anyhow::Result<Vec<u8>> { Err(anyhow::anyhow!("no window")) }
    }

    struct Tree(&'static str);
    impl HierarchyDump for Tree {
        fn dump(&self) -> anyhow::Result<String> { Ok(self.0.to_string()) }
    }

    #[test]
    fn screenshot_and_hierarchy_land_in_order() {
        let mut fb = Feedback::new(SystemInfo::unknown());
        let shot = attach_screenshot(&mut fb, &FixedScreen(vec![0x89, b'P', b'N', b'G'])).unwrap();
        let tree = attach_view_hierarchy(&mut fb, &Tree("Window\n  Button")).unwrap();

        let atts = fb.attachments();
        assert_eq!(atts.len(), 2);
        assert_eq!(atts[0].id, shot);
        assert!(atts[0].is_image());
        assert!(atts[0].name.ends_with(".png"));
        assert_eq!(atts[1].id, tree);
        assert!(atts[1].is_text());
        assert_eq!(atts[1].data, b"Window\n  Button");
    }

    #[test]
    fn failed_capture_leaves_record_alone() {
        let mut fb = Feedback::new(SystemInfo::unknown());
        let before = fb.clone();
        assert!(matches!(attach_screenshot(&mut fb, &BrokenScreen), Err(CaptureError::Screenshot(_))));
        assert!(matches!(attach_view_hierarchy(&mut fb, &Tree("   ")), Err(CaptureError::Empty)));
        assert_eq!(fb, before);
    }
}
