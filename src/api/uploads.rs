//! File upload endpoints

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    AppState,
};

use super::AuthenticatedUser;

/// Multipart form with the image in a `file` part
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Absolute URL to store in a book's `coverImage`
    pub url: String,
}

/// Upload a cover image (admin only)
#[utoipa::path(
    post,
    path = "/upload/image",
    tag = "uploads",
    security(("bearer_auth" = [])),
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing file, unsupported type or too large"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let caller = user.caller();
    caller.require_admin()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let url = state
            .services
            .uploads
            .store_image(&caller, content_type.as_deref(), &data)
            .await?;
        return Ok(Json(UploadResponse { url }));
    }

    Err(AppError::Validation("Missing 'file' part".to_string()))
}
