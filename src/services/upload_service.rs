use actix_multipart::Multipart;
use futures::stream::{StreamExt, TryStreamExt};
use mongodb::bson::oid::ObjectId;
use std::path::{Path, PathBuf};

use crate::utils::{ApiError, ApiResult};

pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn ensure_image(content_type: Option<&str>) -> ApiResult<()> {
    match content_type {
        Some(ct) if ct.starts_with("image/") => Ok(()),
        _ => Err(ApiError::BadRequest("Please upload an image file".to_string())),
    }
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::BadRequest(format!("Please upload an image less than {} bytes", max_bytes))
}

/// `photo_<id><.ext>`, keeping the extension of the uploaded file if it had one.
pub fn photo_filename(bootcamp_id: &ObjectId, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("photo_{}{}", bootcamp_id.to_hex(), ext)
}

/// Pulls the `file` field out of the form. The MIME type is checked before any
/// bytes are buffered, and buffering stops as soon as `max_bytes` is exceeded.
pub async fn read_photo(mut payload: Multipart, max_bytes: usize) -> ApiResult<PhotoUpload> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        ensure_image(content_type.as_deref())?;

        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(too_large(max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        let upload = PhotoUpload {
            original_name,
            content_type: content_type.unwrap_or_default(),
            bytes,
        };
        validate_photo(&upload, max_bytes)?;
        return Ok(upload);
    }

    Err(ApiError::BadRequest("Please upload a file".to_string()))
}

/// Validates an already-buffered upload; `read_photo` applies the same rules while streaming.
pub fn validate_photo(upload: &PhotoUpload, max_bytes: usize) -> ApiResult<()> {
    ensure_image(Some(upload.content_type.as_str()))?;
    if upload.bytes.is_empty() {
        return Err(ApiError::BadRequest("Please upload a file".to_string()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(())
}

pub async fn store_photo(dir: &Path, filename: &str, bytes: &[u8]) -> ApiResult<PathBuf> {
    let storage_error = |e: std::io::Error| ApiError::Internal(format!("Problem with file upload: {}", e));

    tokio::fs::create_dir_all(dir).await.map_err(storage_error)?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await.map_err(storage_error)?;

    log::info!("📸 Stored {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, size: usize) -> PhotoUpload {
        PhotoUpload {
            original_name: "campus.JPG".into(),
            content_type: content_type.into(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn only_images_are_accepted() {
        assert!(ensure_image(Some("image/png")).is_ok());
        assert!(matches!(ensure_image(Some("application/pdf")), Err(ApiError::BadRequest(_))));
        assert!(matches!(ensure_image(None), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(validate_photo(&upload("image/jpeg", 100), 100).is_ok());
        assert!(matches!(validate_photo(&upload("image/jpeg", 101), 100), Err(ApiError::BadRequest(_))));
        assert!(validate_photo(&upload("text/plain", 10), 100).is_err());
        assert!(validate_photo(&upload("image/jpeg", 0), 100).is_err());
    }

    #[test]
    fn filename_uses_bootcamp_id_and_extension() {
        let id = ObjectId::parse_str("5d713995b721c3bb38c1f5d0").unwrap();
        assert_eq!(photo_filename(&id, "campus.JPG"), "photo_5d713995b721c3bb38c1f5d0.jpg");
        assert_eq!(photo_filename(&id, "noext"), "photo_5d713995b721c3bb38c1f5d0");
        assert_eq!(photo_filename(&id, "../../evil.p/hp"), "photo_5d713995b721c3bb38c1f5d0");
    }

    #[actix_web::test]
    async fn stores_into_configured_directory() {
        let dir = std::env::temp_dir().join(format!("devcamper-upload-{}", ObjectId::new().to_hex()));
        let path = store_photo(&dir, "photo_x.png", b"png-bytes").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png-bytes");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[actix_web::test]
    async fn unwritable_storage_is_internal() {
        let blocker = std::env::temp_dir().join(format!("devcamper-blocker-{}", ObjectId::new().to_hex()));
        tokio::fs::write(&blocker, b"file, not dir").await.unwrap();

        let result = store_photo(&blocker, "photo_x.png", b"png").await;
        assert!(matches!(result, Err(ApiError::Internal(_))));

        tokio::fs::remove_file(&blocker).await.unwrap();
    }
}
