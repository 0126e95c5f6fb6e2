//! Media storage collaborator: accept raw bytes, persist them under the media
//! directory, hand back a URL the feed endpoints can embed.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use worklink_types::api::Claims;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 10 MB upload limit for media files. The route mounting [`upload`] must
/// raise axum's default 2 MB body limit above this so the check here decides.
pub const MAX_MEDIA_SIZE: usize = 10 * 1024 * 1024;

/// POST /media — accepts raw bytes (application/octet-stream), saves to
/// {media_dir}/{id}, inserts a DB row and returns the serving URL.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    if bytes.is_empty() {
        return Err(ApiError::validation("File is empty"));
    }
    if bytes.len() > MAX_MEDIA_SIZE {
        return Err(ApiError::validation("File exceeds the 10 MB limit"));
    }

    let file_id = Uuid::new_v4().to_string();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.media_dir)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("create media dir: {}", e)))?;

    let path = state.media_dir.join(&file_id);
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("create {}: {}", path.display(), e)))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("write {}: {}", path.display(), e)))?;

    state
        .db
        .insert_media_file(&file_id, &claims.sub.to_string(), size)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "data": {
                "file_id": file_id,
                "url": format!("/media/{}", file_id),
                "size": size,
            },
        })),
    ))
}

/// GET /media/{file_id} — serves the stored bytes.
pub async fn serve(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = file_id.to_string();
    if state.db.get_media_file(&id)?.is_none() {
        return Err(ApiError::not_found("File not found"));
    }

    let path = state.media_dir.join(&id);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!("Media row exists but file read failed {}: {}", path.display(), e);
        ApiError::not_found("File not found")
    })?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::LogMailer;
    use crate::state::AppStateInner;
    use std::sync::Arc;
    use worklink_db::Database;
    use worklink_types::api::TokenType;
    use worklink_types::models::Role;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            mailer: Arc::new(LogMailer),
            media_dir: std::env::temp_dir().join("worklink-media-tests"),
        })
    }

    fn test_claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: Role::Employee,
            token_type: TokenType::Access,
            exp: 0,
        }
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_by_the_handler() {
        let state = test_state();
        let bytes = Bytes::from(vec![0u8; MAX_MEDIA_SIZE + 1]);

        let err = match upload(State(state), Extension(test_claims()), bytes).await {
            Err(e) => e,
            Ok(_) => panic!("oversized upload accepted"),
        };
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let state = test_state();

        let err = match upload(State(state), Extension(test_claims()), Bytes::new()).await {
            Err(e) => e,
            Ok(_) => panic!("empty upload accepted"),
        };
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
