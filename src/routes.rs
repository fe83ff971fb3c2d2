use std::sync::Arc;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::gateway::SubmissionGateway;
use crate::models::{Category, Feedback};
use crate::rate_limit::SubmitRateLimiter;

// records travel with base64 attachments inline
const MAX_FEEDBACK_BYTES: usize = 32 * 1024 * 1024;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_FEEDBACK_BYTES));
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/feedback").route(web::post().to(submit_feedback)))
            .service(web::resource("/categories").route(web::get().to(list_categories))),
    );
    cfg.route("/health", web::get().to(health));
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn SubmissionGateway>,
    pub rate_limiter: Option<SubmitRateLimiter>,
}

#[derive(Serialize, ToSchema)]
pub struct SubmitResponse {
    pub id: uuid::Uuid,
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryEntry {
    pub id: Category,
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/feedback",
    request_body = Feedback,
    responses(
        (status = 201, description = "Feedback delivered to the configured backend", body = SubmitResponse),
        (status = 400, description = "Malformed feedback record"),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Backend failed")
    )
)]
pub async fn submit_feedback(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<Feedback>,
) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        let client = client_key(&req, rl.trusts_forwarded());
        if !rl.allow_submit(&client) {
            tracing::warn!(%client, "feedback submission rate limited");
            return Err(ApiError::TooManyRequests);
        }
    }
    let record = payload.into_inner();
    tracing::info!(
        id = %record.id,
        category = record.category().display_name(),
        attachments = record.attachments().len(),
        "relaying feedback"
    );
    data.gateway.submit(&record).await?;
    Ok(HttpResponse::Created().json(SubmitResponse { id: record.id, status: "submitted".into() }))
}

// forwarded headers are client controlled unless a proxy rewrites them
fn client_key(req: &HttpRequest, trust_forwarded: bool) -> String {
    if trust_forwarded {
        if let Some(ip) = req.connection_info().realip_remote_addr() {
            return ip.to_string();
        }
    }
    req.peer_addr()
        .map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Feedback categories", body = [CategoryEntry]))
)]
pub async fn list_categories() -> HttpResponse {
    let entries: Vec<CategoryEntry> = Category::ALL
        .iter()
        .map(|c| CategoryEntry { id: *c, name: c.display_name().to_string() })
        .collect();
    HttpResponse::Ok().json(entries)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
