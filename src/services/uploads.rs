//! Cover image uploads

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
    models::Caller,
};

/// Route prefix the uploads directory is served under
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct UploadService {
    dir: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(storage: &StorageConfig, public_url: &str) -> Self {
        Self {
            dir: storage.uploads_dir.clone(),
            base_url: public_url.trim_end_matches('/').to_string(),
            max_bytes: storage.max_upload_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Save an image under a fresh name and return the URL it is served at
    pub async fn store_image(
        &self,
        caller: &Caller,
        content_type: Option<&str>,
        data: &[u8],
    ) -> AppResult<String> {
        caller.require_admin()?;

        let extension = content_type
            .and_then(image_extension)
            .ok_or_else(|| AppError::Validation("Only PNG, JPEG, GIF and WebP images are accepted".to_string()))?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "Uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create uploads directory: {}", e)))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.dir.join(&file_name), data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

        tracing::info!(file = %file_name, bytes = data.len(), by = %caller.email, "Cover image uploaded");
        Ok(format!("{}{}/{}", self.base_url, UPLOADS_ROUTE, file_name))
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
