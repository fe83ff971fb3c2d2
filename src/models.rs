use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

pub type Id = Uuid;

pub const UNKNOWN: &str = "Unknown";

/// Coarse classification of an attachment's MIME type, used for rendering
/// and for the embed-vs-link decision upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Image,
    Text,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "base64_bytes")]
    #[schema(value_type = String, format = Byte)]
    pub data: Vec<u8>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            data,
            content_type: content_type.into(),
            created_at: Utc::now(),
        }
    }

    /// Builds an attachment whose content type is guessed from the payload's
    /// magic bytes, then from the file extension.
    pub fn sniffed(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name, &data);
        Self::new(name, data, content_type)
    }

    pub fn kind(&self) -> ContentKind {
        match self.content_type.parse::<mime::Mime>() {
            Ok(m) if m.type_() == mime::IMAGE => ContentKind::Image,
            Ok(m) if m.type_() == mime::TEXT => ContentKind::Text,
            _ => ContentKind::Other,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind() == ContentKind::Image
    }

    pub fn is_text(&self) -> bool {
        self.kind() == ContentKind::Text
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Final path component of `name`, safe to use as a file name.
    pub fn file_name(&self) -> String {
        safe_file_name(&self.name)
    }
}

// names come from pickers and may carry directory separators
pub(crate) fn safe_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    if last.is_empty() || last == "." || last == ".." {
        "attachment".to_string()
    } else {
        last.to_string()
    }
}

fn guess_content_type(name: &str, data: &[u8]) -> String {
    if let Some(t) = infer::get(data) {
        return t.mime_type().to_string();
    }
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let guessed = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "json" => "application/json",
        "xml" => "text/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "svg" => "image/svg+xml",
        _ if !data.is_empty() && std::str::from_utf8(data).is_ok() => "text/plain",
        _ => "application/octet-stream",
    };
    guessed.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    BugReport,
    FeatureRequest,
    PerformanceIssue,
    UsabilityIssue,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::BugReport,
        Category::FeatureRequest,
        Category::PerformanceIssue,
        Category::UsabilityIssue,
        Category::Other,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Category::BugReport => "Bug Report",
            Category::FeatureRequest => "Feature Request",
            Category::PerformanceIssue => "Performance Issue",
            Category::UsabilityIssue => "Usability Issue",
            Category::Other => "Other",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Category::BugReport => "bug_report",
            Category::FeatureRequest => "feature_request",
            Category::PerformanceIssue => "performance_issue",
            Category::UsabilityIssue => "usability_issue",
            Category::Other => "other",
        }
    }
}

/// Snapshot of the reporting environment. Every field is populated; values
/// that could not be read are stored as [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SystemInfo {
    app_version: String,
    build_number: String,
    bundle_id: String,
    os_name: String,
    os_version: String,
    device_model: String,
    device_name: String,
}

impl SystemInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        app_version: Option<String>,
        build_number: Option<String>,
        bundle_id: Option<String>,
        os_name: Option<String>,
        os_version: Option<String>,
        device_model: Option<String>,
        device_name: Option<String>,
    ) -> Self {
        Self {
            app_version: or_unknown(app_version),
            build_number: or_unknown(build_number),
            bundle_id: or_unknown(bundle_id),
            os_name: or_unknown(os_name),
            os_version: or_unknown(os_version),
            device_model: or_unknown(device_model),
            device_name: or_unknown(device_name),
        }
    }

    pub fn unknown() -> Self {
        Self::new(None, None, None, None, None, None, None)
    }

    pub fn app_version(&self) -> &str { &self.app_version }
    pub fn build_number(&self) -> &str { &self.build_number }
    pub fn bundle_id(&self) -> &str { &self.bundle_id }
    pub fn os_name(&self) -> &str { &self.os_name }
    pub fn os_version(&self) -> &str { &self.os_version }
    pub fn device_model(&self) -> &str { &self.device_model }
    pub fn device_name(&self) -> &str { &self.device_name }
}

#[derive(Deserialize)]
struct SystemInfoWire {
    app_version: Option<String>,
    build_number: Option<String>,
    bundle_id: Option<String>,
    os_name: Option<String>,
    os_version: Option<String>,
    device_model: Option<String>,
    device_name: Option<String>,
}

impl<'de> Deserialize<'de> for SystemInfo {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let w = SystemInfoWire::deserialize(d)?;
        Ok(SystemInfo::new(
            w.app_version,
            w.build_number,
            w.bundle_id,
            w.os_name,
            w.os_version,
            w.device_model,
            w.device_name,
        ))
    }
}

fn or_unknown(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// One feedback report. Mutations go through the methods below so that
/// `updated_at` always moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Feedback {
    pub id: Uuid,
    title: String,
    description: String,
    category: Category,
    attachments: Vec<Attachment>,
    system_info: SystemInfo,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(system_info: SystemInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            category: Category::default(),
            attachments: Vec::new(),
            system_info,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content(
        system_info: SystemInfo,
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
    ) -> Self {
        let mut fb = Self::new(system_info);
        fb.title = title.into();
        fb.description = description.into();
        fb.category = category;
        fb
    }

    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> &str { &self.description }
    pub fn category(&self) -> Category { self.category }
    pub fn attachments(&self) -> &[Attachment] { &self.attachments }
    pub fn system_info(&self) -> &SystemInfo { &self.system_info }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn update_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn update_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        self.touch();
    }

    /// Appends in insertion order. No dedup and no size limit.
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
        self.touch();
    }

    /// Removes every attachment carrying `id` and returns how many went.
    /// An unknown id leaves the record untouched, `updated_at` included.
    pub fn detach(&mut self, id: Id) -> usize {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.id != id);
        let removed = before - self.attachments.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        let now = Utc::now();
        // strictly increasing even if the clock did not tick
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::nanoseconds(1)
        };
    }
}

#[derive(Deserialize)]
struct FeedbackWire {
    id: Uuid,
    title: String,
    description: String,
    #[serde(default)]
    category: Category,
    #[serde(default)]
    attachments: Vec<Attachment>,
    system_info: SystemInfo,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FeedbackWire> for Feedback {
    type Error = String;

    fn try_from(w: FeedbackWire) -> Result<Self, Self::Error> {
        if w.updated_at < w.created_at {
            return Err(format!("updated_at {} precedes created_at {}", w.updated_at, w.created_at));
        }
        let mut seen = HashSet::with_capacity(w.attachments.len());
        if let Some(dup) = w.attachments.iter().find(|a| !seen.insert(a.id)) {
            return Err(format!("duplicate attachment id {}", dup.id));
        }
        Ok(Feedback {
            id: w.id,
            title: w.title,
            description: w.description,
            category: w.category,
            attachments: w.attachments,
            system_info: w.system_info,
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
    }
}

impl<'de> Deserialize<'de> for Feedback {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let wire = FeedbackWire::deserialize(d)?;
        Feedback::try_from(wire).map_err(serde::de::Error::custom)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Feedback {
        Feedback::new(SystemInfo::unknown())
    }

    #[test]
    fn every_mutation_moves_updated_at_forward() {
        let mut fb = record();
        assert_eq!(fb.created_at(), fb.updated_at());

        let mut last = fb.updated_at();
        fb.update_title("Crash");
        assert!(fb.updated_at() > last);
        last = fb.updated_at();

        fb.update_description("It crashed");
        assert!(fb.updated_at() > last);
        last = fb.updated_at();

        let a = Attachment::new("log.txt", b"hello".to_vec(), "text/plain");
        let id = a.id;
        fb.attach(a);
        assert!(fb.updated_at() > last);
        last = fb.updated_at();

        assert_eq!(fb.detach(id), 1);
        assert!(fb.updated_at() > last);
        assert!(fb.updated_at() >= fb.created_at());
    }

    #[test]
    fn detach_then_attach_restores_membership() {
        let mut fb = record();
        let a = Attachment::new("shot.png", vec![1, 2, 3], "image/png");
        fb.attach(a.clone());

        let t0 = fb.updated_at();
        fb.detach(a.id);
        let t1 = fb.updated_at();
        fb.attach(a.clone());
        let t2 = fb.updated_at();

        assert_eq!(fb.attachments(), &[a]);
        assert!(t0 < t1 && t1 < t2);
    }

    #[test]
    fn detach_unknown_id_is_a_no_op() {
        let mut fb = record();
        fb.attach(Attachment::new("a.txt", vec![], "text/plain"));
        let before = fb.clone();

        assert_eq!(fb.detach(Uuid::new_v4()), 0);
        assert_eq!(fb, before);
    }

    #[test]
    fn duplicate_names_are_removed_independently() {
        let mut fb = record();
        let first = Attachment::new("same.txt", b"1".to_vec(), "text/plain");
        let second = Attachment::new("same.txt", b"2".to_vec(), "text/plain");
        fb.attach(first.clone());
        fb.attach(second.clone());

        fb.detach(first.id);
        assert_eq!(fb.attachments().len(), 1);
        assert_eq!(fb.attachments()[0].id, second.id);
    }

    #[test]
    fn empty_content_is_representable() {
        let fb = Feedback::with_content(SystemInfo::unknown(), "", "", Category::Other);
        assert!(fb.title().is_empty());
        assert!(fb.description().is_empty());
    }

    #[test]
    fn classification_follows_mime_type() {
        assert_eq!(Attachment::new("a", vec![], "image/png").kind(), ContentKind::Image);
        assert_eq!(Attachment::new("a", vec![], "text/plain; charset=utf-8").kind(), ContentKind::Text);
        assert_eq!(Attachment::new("a", vec![], "application/pdf").kind(), ContentKind::Other);
        assert_eq!(Attachment::new("a", vec![], "not a mime").kind(), ContentKind::Other);
    }

    #[test]
    fn sniffing_uses_magic_bytes_then_extension() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert!(Attachment::sniffed("whatever.bin", png).is_image());
        assert!(Attachment::sniffed("hierarchy.txt", b"<UIWindow>".to_vec()).is_text());
        assert_eq!(
            Attachment::sniffed("blob", vec![0xff, 0xfe, 0x00]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn json_round_trip_keeps_fields_and_classification() {
        let mut fb = Feedback::with_content(
            SystemInfo::new(Some("1.2.0".into()), Some("42".into()), None, None, None, None, None),
            "Crash on share",
            "Tapping share crashes",
            Category::PerformanceIssue,
        );
        fb.attach(Attachment::new("a.png", vec![0, 159, 146, 150], "image/png"));
        fb.attach(Attachment::new("b.txt", b"log line".to_vec(), "text/plain"));
        fb.attach(Attachment::new("c.zip", vec![80, 75], "application/zip"));

        let json = serde_json::to_string(&fb).unwrap();
        let back: Feedback = serde_json::from_str(&json).unwrap();

        assert_eq!(back, fb);
        let kinds: Vec<_> = back.attachments().iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![ContentKind::Image, ContentKind::Text, ContentKind::Other]);
        assert_eq!(back.system_info().bundle_id(), UNKNOWN);
    }

    #[test]
    fn attachment_bytes_travel_as_base64() {
        let a = Attachment::new("b.txt", b"hi".to_vec(), "text/plain");
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["data"], "aGk=");
    }

    #[test]
    fn system_info_blank_values_fall_back_to_unknown() {
        let info = SystemInfo::new(Some("  ".into()), Some("7".into()), None, None, None, None, None);
        assert_eq!(info.app_version(), UNKNOWN);
        assert_eq!(info.build_number(), "7");
        assert_eq!(info.device_name(), UNKNOWN);
    }

    #[test]
    fn decoding_rejects_updated_before_created() {
        let mut v = serde_json::to_value(record()).unwrap();
        v["updated_at"] = serde_json::json!("2000-01-01T00:00:00Z");
        let err = serde_json::from_value::<Feedback>(v).unwrap_err();
        assert!(err.to_string().contains("precedes"));
    }

    #[test]
    fn decoding_rejects_duplicate_attachment_ids() {
        let mut fb = record();
        fb.attach(Attachment::new("a.png", vec![1], "image/png"));
        let mut v = serde_json::to_value(&fb).unwrap();
        let first = v["attachments"][0].clone();
        v["attachments"].as_array_mut().unwrap().push(first);
        let err = serde_json::from_value::<Feedback>(v).unwrap_err();
        assert!(err.to_string().contains("duplicate attachment id"));
    }

    #[test]
    fn decoding_fills_blank_system_info_with_unknown() {
        let fb = Feedback::with_content(
            SystemInfo::new(Some("1.0".into()), None, None, None, None, None, None),
            "t",
            "d",
            Category::Other,
        );
        let mut v = serde_json::to_value(&fb).unwrap();
        v["system_info"]["app_version"] = serde_json::json!("");
        v["system_info"]["os_name"] = serde_json::json!("  ");
        v["system_info"].as_object_mut().unwrap().remove("device_name");
        let back: Feedback = serde_json::from_value(v).unwrap();
        assert_eq!(back.system_info().app_version(), UNKNOWN);
        assert_eq!(back.system_info().os_name(), UNKNOWN);
        assert_eq!(back.system_info().device_name(), UNKNOWN);
    }

    #[test]
    fn size_and_file_name() {
        let a = Attachment::new("shots/2024/a.png", vec![1, 2, 3], "image/png");
        assert_eq!(a.size(), 3);
        assert_eq!(a.file_name(), "a.png");
        assert_eq!(safe_file_name("a\\b.txt"), "b.txt");
        assert_eq!(safe_file_name(".."), "attachment");
        assert_eq!(safe_file_name("trailing/"), "attachment");
    }

    #[test]
    fn category_names() {
        assert_eq!(Category::default(), Category::BugReport);
        assert_eq!(Category::UsabilityIssue.display_name(), "Usability Issue");
        let v = serde_json::to_value(Category::FeatureRequest).unwrap();
        assert_eq!(v, Category::FeatureRequest.slug());
    }
}
