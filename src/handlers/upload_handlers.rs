//! HTTP handlers for avatar and photo uploads.
//! Validates wire-level request shape and delegates naming/storage
//! concerns to `UploadService`.

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use serde::Serialize;

use crate::{
    errors::AppError, models::upload::UploadItem, services::upload_service::UploadService,
};

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PhotosResponse {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoUrlResponse {
    pub url: String,
}

/// POST `/v1/users/{user_id}/avatar` — store a single avatar image.
pub async fn upload_avatar(
    State(service): State<UploadService>,
    Path(user_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    ensure_owner(&user_id)?;

    let mut items = collect_items(multipart).await?;
    if items.len() != 1 {
        return Err(AppError::invalid_argument(
            "avatar upload requires exactly one `file` field",
        ));
    }
    let item = items.remove(0);
    if item.size_bytes == 0 {
        return Err(AppError::invalid_argument("file payload is empty"));
    }

    let url = service.upload_avatar(&user_id, item).await?;
    Ok(Json(AvatarResponse { url }))
}

/// POST `/v1/users/{user_id}/photos` — store a batch of photos.
///
/// Batch bounds (1..=5) are enforced by the service before any storage
/// call; this handler only converts the wire payload.
pub async fn upload_photos(
    State(service): State<UploadService>,
    Path(user_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PhotosResponse>, AppError> {
    ensure_owner(&user_id)?;

    let items = collect_items(multipart).await?;
    let urls = service.upload_photos(&user_id, items).await?;
    Ok(Json(PhotosResponse { urls }))
}

/// GET `/v1/users/{user_id}/photos/{photo_id}` — resolve a stored photo id
/// to a retrieval URL.
pub async fn get_photo_url(
    State(service): State<UploadService>,
    Path((user_id, photo_id)): Path<(String, String)>,
) -> Result<Json<PhotoUrlResponse>, AppError> {
    ensure_owner(&user_id)?;

    let url = service.get_photo_url(&user_id, &photo_id).await?;
    Ok(Json(PhotoUrlResponse { url }))
}

fn ensure_owner(user_id: &str) -> Result<(), AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::invalid_argument("user_id is required"));
    }
    Ok(())
}

/// Drain every `file` field of the multipart body into upload items.
///
/// Field metadata is read before the bytes, since reading the body
/// consumes the field.
async fn collect_items(mut multipart: Multipart) -> Result<Vec<UploadItem>, AppError> {
    let mut items = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::invalid_argument(format!("invalid multipart body: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|err| {
            AppError::invalid_argument(format!("failed to read file field: {}", err))
        })?;
        items.push(UploadItem::from_bytes(data, file_name, content_type));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::tests::test_config;
    use crate::services::upload_service::UploadService;
    use crate::storage::object_store::ObjectStore;

    const BOUNDARY: &str = "test-boundary-7291";

    /// Router over a lazily built store: requests that fail validation
    /// must come back before anything touches the network, so these tests
    /// never bootstrap a bucket.
    fn app() -> Router {
        let cfg = test_config();
        let store = Arc::new(ObjectStore::connect_lazy(&cfg));
        let service = UploadService::new(store, cfg.key_scheme);
        crate::routes::routes::routes().with_state(service)
    }

    fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (filename, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: image/jpeg\r\n\r\n",
                    BOUNDARY, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post_multipart(uri: &str, files: &[(&str, &[u8])]) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(files)))
            .expect("request builds");

        let response = app().oneshot(request).await.expect("handler responds");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_blank_owner_is_invalid_argument() {
        let (status, body) = post_multipart(
            "/v1/users/%20/avatar",
            &[("pic.jpg", b"JPEGDATA".as_slice())],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("user_id is required"));
    }

    #[tokio::test]
    async fn test_empty_avatar_payload_is_invalid_argument() {
        let (status, body) =
            post_multipart("/v1/users/u1/avatar", &[("pic.jpg", b"".as_slice())]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("empty"));
    }

    #[tokio::test]
    async fn test_avatar_without_file_field_is_invalid_argument() {
        let (status, _) = post_multipart("/v1/users/u1/avatar", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_photo_batch_of_zero_is_rejected() {
        let (status, body) = post_multipart("/v1/users/u2/photos", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("empty"));
    }

    #[tokio::test]
    async fn test_photo_batch_of_six_is_rejected() {
        let data = b"JPEGDATA".as_slice();
        let files: Vec<(&str, &[u8])> = (0..6).map(|_| ("pic.jpg", data)).collect();
        let (status, body) = post_multipart("/v1/users/u2/photos", &files).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("limit is 5"));
    }
}
