pub mod capture;
pub mod config;
pub mod error;
pub mod form;
pub mod gateway;
pub mod github;
pub mod http_gateway;
pub mod models;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod staging;
pub mod system_info;

// Re-export commonly used items for tests / external users
pub use form::{FeedbackForm, FormError};
pub use gateway::{MockGateway, SubmissionGateway, SubmitError};
pub use github::{GitHubConfig, GitHubGateway};
pub use http_gateway::HttpGateway;
pub use models::{Attachment, Category, ContentKind, Feedback, SystemInfo};
