//! Social feed: posts with images, like toggle, comments, followed-user feed.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use worklink_db::models::{CommentListingRow, PostImageRow, PostListingRow};
use worklink_db::queries::PostChanges;
use worklink_types::api::{
    Claims, CommentCreateRequest, CommentResponse, PostCreateRequest, PostImageResponse,
    PostResponse, PostUpdateRequest,
};
use worklink_types::models::PostKind;

use crate::error::{ApiError, ApiResult};
use crate::follows::summary_response;
use crate::parse_ts;
use crate::policy::{authorize, Action, Actor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub post_type: Option<PostKind>,
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.title.as_deref().unwrap_or("").trim().is_empty()
        && req.content.as_deref().unwrap_or("").trim().is_empty()
        && req.images.is_empty()
    {
        return Err(ApiError::validation("Post cannot be empty"));
    }

    let post_id = Uuid::new_v4().to_string();
    let images: Vec<(String, String)> = req
        .images
        .iter()
        .map(|url| (Uuid::new_v4().to_string(), url.clone()))
        .collect();

    state.db.create_post(
        &post_id,
        &claims.sub.to_string(),
        req.title.as_deref(),
        req.content.as_deref(),
        req.post_type.as_str(),
        &images,
    )?;

    let listing = state
        .db
        .get_post_listing(&post_id, &claims.sub.to_string())?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post vanished after insert")))?;
    let images = state.db.get_post_images(&post_id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "data": post_response(listing, images)?,
        })),
    ))
}

/// Own posts plus posts by followed authors, newest first.
pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_feed(
        &claims.sub.to_string(),
        query.post_type.map(|k| k.as_str()),
    )?;
    post_list_response(&state, rows)
}

pub async fn post_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let listing = state
        .db
        .get_post_listing(&id, &claims.sub.to_string())?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    let images = state.db.get_post_images(&id)?;

    Ok(Json(json!({
        "message": "Post retrieved successfully",
        "data": post_response(listing, images)?,
    })))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<PostUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let post = state
        .db
        .get_post(&id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    authorize(
        &actor_from(&claims),
        Action::ModifyPost {
            author_id: &post.author_id,
            what: "update",
        },
    )?;

    state.db.update_post(
        &id,
        &PostChanges {
            title: req.title,
            content: req.content,
            post_type: req.post_type.map(|k| k.as_str().to_string()),
        },
    )?;

    let listing = state
        .db
        .get_post_listing(&id, &claims.sub.to_string())?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    let images = state.db.get_post_images(&id)?;

    Ok(Json(json!({
        "message": "Post updated successfully",
        "data": post_response(listing, images)?,
    })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let post = state
        .db
        .get_post(&id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    authorize(
        &actor_from(&claims),
        Action::ModifyPost {
            author_id: &post.author_id,
            what: "delete",
        },
    )?;

    state.db.delete_post(&id)?;
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<impl IntoResponse> {
    let viewer = claims.sub.to_string();
    let rows =
        state
            .db
            .list_posts_by_author(&viewer, &viewer, query.post_type.map(|k| k.as_str()))?;
    post_list_response(&state, rows)
}

pub async fn user_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<impl IntoResponse> {
    if state.db.get_user_by_id(&user_id.to_string())?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    let rows = state.db.list_posts_by_author(
        &user_id.to_string(),
        &claims.sub.to_string(),
        query.post_type.map(|k| k.as_str()),
    )?;
    post_list_response(&state, rows)
}

/// Idempotent like toggle: first call likes, second unlikes.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    if state.db.get_post(&id)?.filter(|p| p.is_active).is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let (is_liked, likes_count) = state.db.toggle_like(
        &Uuid::new_v4().to_string(),
        &id,
        &claims.sub.to_string(),
    )?;

    let message = if is_liked { "Post liked" } else { "Post unliked" };
    Ok(Json(json!({
        "message": message,
        "data": { "is_liked": is_liked, "likes_count": likes_count },
    })))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    if state.db.get_post(&id)?.filter(|p| p.is_active).is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let rows = state.db.list_comments(&id)?;
    let data = rows
        .into_iter()
        .map(comment_response)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(json!({
        "message": "Comments retrieved successfully",
        "count": data.len(),
        "data": data,
    })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CommentCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.content.trim().is_empty() {
        return Err(ApiError::validation("Comment cannot be empty"));
    }
    let id = post_id.to_string();
    if state.db.get_post(&id)?.filter(|p| p.is_active).is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let comment_id = Uuid::new_v4().to_string();
    let comments_count = state.db.create_comment(
        &comment_id,
        &id,
        &claims.sub.to_string(),
        req.content.trim(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added successfully",
            "data": { "comment_id": comment_id, "comments_count": comments_count },
        })),
    ))
}

pub async fn post_images(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    if state.db.get_post(&id)?.is_none() {
        return Err(ApiError::not_found("Post not found"));
    }

    let images: Vec<PostImageResponse> = state
        .db
        .get_post_images(&id)?
        .into_iter()
        .map(image_response)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(json!({
        "message": "Images retrieved successfully",
        "data": images,
    })))
}

/// Owner-only: the image's post author may remove it.
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(image_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let image = state
        .db
        .get_image(&image_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;
    let post = state
        .db
        .get_post(&image.post_id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    authorize(
        &actor_from(&claims),
        Action::ModifyPost {
            author_id: &post.author_id,
            what: "delete",
        },
    )?;

    state.db.delete_image(&image.id)?;
    Ok(Json(json!({ "message": "Image deleted successfully" })))
}

fn actor_from(claims: &Claims) -> Actor {
    Actor {
        id: claims.sub.to_string(),
        role: claims.role,
    }
}

fn post_list_response(
    state: &AppState,
    rows: Vec<PostListingRow>,
) -> ApiResult<Json<serde_json::Value>> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.post.id.clone()).collect();
    let mut by_post: HashMap<String, Vec<PostImageRow>> = HashMap::new();
    for image in state.db.get_images_for_posts(&post_ids)? {
        by_post.entry(image.post_id.clone()).or_default().push(image);
    }

    let data = rows
        .into_iter()
        .map(|row| {
            let images = by_post.remove(&row.post.id).unwrap_or_default();
            post_response(row, images)
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(json!({
        "message": "Posts retrieved successfully",
        "count": data.len(),
        "data": data,
    })))
}

fn post_response(row: PostListingRow, images: Vec<PostImageRow>) -> ApiResult<PostResponse> {
    let post = row.post;
    Ok(PostResponse {
        id: post
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt post id: {}", e)))?,
        author: summary_response(row.author)?,
        title: post.title,
        content: post.content,
        post_type: PostKind::parse(&post.post_type).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("unknown post type '{}'", post.post_type))
        })?,
        images: images
            .into_iter()
            .map(image_response)
            .collect::<ApiResult<Vec<_>>>()?,
        likes_count: post.likes_count,
        comments_count: post.comments_count,
        is_liked: row.is_liked,
        created_at: parse_ts(&post.created_at),
        updated_at: parse_ts(&post.updated_at),
    })
}

fn image_response(row: PostImageRow) -> ApiResult<PostImageResponse> {
    Ok(PostImageResponse {
        id: row
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt image id: {}", e)))?,
        url: row.url,
    })
}

fn comment_response(row: CommentListingRow) -> ApiResult<CommentResponse> {
    Ok(CommentResponse {
        id: row
            .comment
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt comment id: {}", e)))?,
        author: summary_response(row.author)?,
        content: row.comment.content,
        created_at: parse_ts(&row.comment.created_at),
    })
}
