use anyhow::{anyhow, bail, Context};
use std::sync::Arc;
use std::time::Duration;

use crate::gateway::{MockGateway, SubmissionGateway};
use crate::github::{GitHubConfig, GitHubGateway, DEFAULT_API_BASE, DEFAULT_TOKEN_VAR};
use crate::http_gateway::HttpGateway;
use crate::rate_limit::RateLimitConfig;

#[derive(Debug, Clone)]
pub enum Backend {
    Mock { delay: Duration },
    GitHub(GitHubConfig),
    Http { endpoint: String, token: Option<String> },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub backend: Backend,
    pub rate_limit: RateLimitConfig,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind = var("FEEDBACK_BIND").unwrap_or_else(|| "0.0.0.0:8080".into());
        let kind = var("FEEDBACK_BACKEND").unwrap_or_else(|| "mock".into());
        let backend = match kind.to_ascii_lowercase().as_str() {
            "mock" => {
                let ms = match var("FEEDBACK_MOCK_DELAY_MS") {
                    Some(v) => v.parse::<u64>().context("FEEDBACK_MOCK_DELAY_MS must be an integer")?,
                    None => MockGateway::DEFAULT_DELAY.as_millis() as u64,
                };
                Backend::Mock { delay: Duration::from_millis(ms) }
            }
            "github" => {
                let owner = required("FEEDBACK_GITHUB_OWNER")?;
                let repo = required("FEEDBACK_GITHUB_REPO")?;
                let cfg = GitHubConfig::new(owner, repo)
                    .with_api_base(var("FEEDBACK_GITHUB_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()))
                    .with_token_var(var("FEEDBACK_GITHUB_TOKEN_VAR").unwrap_or_else(|| DEFAULT_TOKEN_VAR.into()));
                Backend::GitHub(cfg)
            }
            "http" => Backend::Http {
                endpoint: required("FEEDBACK_HTTP_ENDPOINT")?,
                token: var("FEEDBACK_HTTP_TOKEN"),
            },
            other => bail!("unknown FEEDBACK_BACKEND '{other}' (expected mock, github or http)"),
        };
        Ok(Self { bind, backend, rate_limit: RateLimitConfig::from_env() })
    }
}

pub fn build_gateway(backend: &Backend) -> Arc<dyn SubmissionGateway> {
    match backend {
        Backend::Mock { delay } => Arc::new(MockGateway::with_delay(*delay)),
        Backend::GitHub(cfg) => Arc::new(GitHubGateway::new(cfg.clone())),
        Backend::Http { endpoint, token } => {
            let gw = HttpGateway::new(endpoint.clone());
            Arc::new(match token {
                Some(t) => gw.with_token(t.clone()),
                None => gw,
            })
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    var(name).ok_or_else(|| anyhow!("{name} must be set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "FEEDBACK_BACKEND",
        "FEEDBACK_MOCK_DELAY_MS",
        "FEEDBACK_GITHUB_OWNER",
        "FEEDBACK_GITHUB_REPO",
        "FEEDBACK_GITHUB_TOKEN_VAR",
        "FEEDBACK_HTTP_ENDPOINT",
    ];

    fn clear() {
        for v in VARS { std::env::remove_var(v); }
    }

    #[test]
    #[serial]
    fn defaults_to_mock() {
        clear();
        let s = Settings::from_env().unwrap();
        assert!(matches!(s.backend, Backend::Mock { delay } if delay == MockGateway::DEFAULT_DELAY));
        assert_eq!(s.bind, "0.0.0.0:8080");
    }

    #[test]
    #[serial]
    fn github_requires_owner_and_repo() {
        clear();
        std::env::set_var("FEEDBACK_BACKEND", "github");
        std::env::set_var("FEEDBACK_GITHUB_OWNER", "acme");
        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("FEEDBACK_GITHUB_REPO"));

        std::env::set_var("FEEDBACK_GITHUB_REPO", "app");
        std::env::set_var("FEEDBACK_GITHUB_TOKEN_VAR", "ACME_TOKEN");
        let s = Settings::from_env().unwrap();
        match s.backend {
            Backend::GitHub(cfg) => {
                assert_eq!(cfg.owner, "acme");
                assert_eq!(cfg.token_var, "ACME_TOKEN");
                assert_eq!(cfg.api_base, DEFAULT_API_BASE);
            }
            other => panic!("unexpected backend {other:?}"),
        }
        clear();
    }

    #[test]
    #[serial]
    fn unknown_backend_is_rejected() {
        clear();
        std::env::set_var("FEEDBACK_BACKEND", "carrier-pigeon");
        assert!(Settings::from_env().is_err());
        clear();
    }
}
