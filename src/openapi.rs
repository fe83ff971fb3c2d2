use crate::models::{Attachment, Category, ContentKind, Feedback, SystemInfo};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::submit_feedback,
        crate::routes::list_categories,
    ),
    components(schemas(
        Feedback, Attachment, Category, ContentKind, SystemInfo,
        crate::routes::SubmitResponse, crate::routes::CategoryEntry,
    )),
    tags(
        (name = "feedback", description = "Feedback intake"),
    )
)]
pub struct ApiDoc;
