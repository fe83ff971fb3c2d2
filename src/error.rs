use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::gateway::SubmitError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("too many submissions, try again later")] TooManyRequests,
    #[error("{0}")] Gateway(String),
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        ApiError::Gateway(e.user_message())
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
