//! GitHub Issues adapter.
//!
//! A submission uploads every attachment, one at a time and in list order,
//! into `attachments/` of the configured repository through the contents
//! API, then opens an issue whose body links to the uploaded files. The
//! first failed upload aborts the run and no issue is created.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{info, warn};
use rand::Rng;
use reqwest::{header, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::gateway::{SubmissionGateway, SubmitError};
use crate::models::{safe_file_name, Attachment, Feedback};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const ISSUE_LABELS: [&str; 2] = ["bug", "feedback"];

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg"];
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "feedback-kit";

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Name of the environment variable holding the bearer token.
    pub token_var: String,
}

impl GitHubConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            owner: owner.into(),
            repo: repo.into(),
            branch: "main".into(),
            token_var: DEFAULT_TOKEN_VAR.into(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_var(mut self, var: impl Into<String>) -> Self {
        self.token_var = var.into();
        self
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo)
    }
}

pub struct GitHubGateway {
    cfg: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubGateway {
    pub fn new(cfg: GitHubConfig) -> Self {
        Self { cfg, client: reqwest::Client::new() }
    }

    fn token(&self) -> Result<String, SubmitError> {
        std::env::var(&self.cfg.token_var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(SubmitError::MissingCredential)
    }

    fn authorized(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
        req.header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(header::USER_AGENT, USER_AGENT)
    }

    /// Uploads one attachment and returns its download URL.
    async fn upload(&self, token: &str, attachment: &Attachment) -> Result<String, SubmitError> {
        let remote = remote_name(&attachment.name);
        let url = format!(
            "{}/contents/attachments/{}",
            self.cfg.repo_url(),
            urlencoding::encode(&remote)
        );
        let payload = UploadPayload {
            message: format!("Add feedback attachment {}", attachment.name),
            content: STANDARD.encode(&attachment.data),
            branch: &self.cfg.branch,
        };
        let resp = self.authorized(self.client.put(&url), token).json(&payload).send().await?;
        if resp.status() != StatusCode::CREATED {
            warn!("upload of '{}' failed status={}", attachment.name, resp.status());
            return Err(SubmitError::UploadFailed(resp.status().as_u16()));
        }
        let body: UploadResponse = resp.json().await?;
        body.content
            .and_then(|c| c.download_url)
            .ok_or_else(|| SubmitError::InvalidResponse("missing content.download_url".into()))
    }

    async fn create_issue(&self, token: &str, title: &str, body: &str) -> Result<String, SubmitError> {
        let payload = IssuePayload { title, body, labels: &ISSUE_LABELS };
        let url = format!("{}/issues", self.cfg.repo_url());
        let resp = self.authorized(self.client.post(&url), token).json(&payload).send().await?;
        if resp.status() != StatusCode::CREATED {
            warn!("issue creation failed status={}", resp.status());
            return Err(SubmitError::CreateFailed(resp.status().as_u16()));
        }
        let created: IssueResponse = resp.json().await?;
        created
            .html_url
            .ok_or_else(|| SubmitError::InvalidResponse("missing html_url".into()))
    }
}

#[async_trait]
impl SubmissionGateway for GitHubGateway {
    async fn submit(&self, record: &Feedback) -> Result<(), SubmitError> {
        let token = self.token()?;
        let mut body = issue_body(record);

        let mut links = Vec::with_capacity(record.attachments().len());
        for attachment in record.attachments() {
            let url = self.upload(&token, attachment).await?;
            links.push(attachment_link(&attachment.name, &url));
        }
        if !links.is_empty() {
            body.push_str("\n## Uploaded Attachments\n");
            for link in &links {
                body.push_str(&format!("- {link}\n"));
            }
        }

        let html_url = self.create_issue(&token, record.title(), &body).await?;
        info!("created issue for feedback {}: {html_url}", record.id);
        Ok(())
    }
}

#[derive(Serialize)]
struct UploadPayload<'a> {
    message: String,
    content: String,
    branch: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    content: Option<UploadedContent>,
}

#[derive(Deserialize)]
struct UploadedContent {
    download_url: Option<String>,
}

#[derive(Serialize)]
struct IssuePayload<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [&'a str],
}

#[derive(Deserialize)]
struct IssueResponse {
    html_url: Option<String>,
}

/// Markdown issue body before any upload: description, environment and the
/// names of the attachments that will follow.
pub fn issue_body(record: &Feedback) -> String {
    let mut body = String::new();
    body.push_str(&format!("**Category:** {}\n\n", record.category().display_name()));
    if !record.description().is_empty() {
        body.push_str("## Description\n");
        body.push_str(record.description());
        body.push_str("\n\n");
    }

    let info = record.system_info();
    body.push_str("## Environment\n");
    body.push_str(&format!("- **App Version:** {}\n", info.app_version()));
    body.push_str(&format!("- **Build Number:** {}\n", info.build_number()));
    body.push_str(&format!("- **Bundle ID:** {}\n", info.bundle_id()));
    body.push_str(&format!("- **OS:** {} {}\n", info.os_name(), info.os_version()));
    body.push_str(&format!("- **Device Model:** {}\n", info.device_model()));
    body.push_str(&format!("- **Device Name:** {}\n", info.device_name()));

    if !record.attachments().is_empty() {
        body.push_str("\n## Attachments\n");
        for a in record.attachments() {
            body.push_str(&format!("- {}\n", a.name));
        }
    }
    body
}

/// True when the text after the last `.` is a known image extension.
pub fn is_image_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn attachment_link(name: &str, url: &str) -> String {
    if is_image_name(name) {
        format!("![{name}]({url})")
    } else {
        format!("[{name}]({url})")
    }
}

// only the final path component goes into the contents path; the issue body keeps the full name
fn remote_name(name: &str) -> String {
    let prefix: u32 = rand::thread_rng().gen();
    format!("{prefix:08x}_{}", safe_file_name(name))
}
