//! Follow graph: follow, unfollow, follower/following lists and per-user stats.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use worklink_db::models::UserSummaryRow;
use worklink_types::api::{BasicProfile, Claims, FollowRequest, FollowStats};
use worklink_types::models::Role;

use crate::error::{ApiError, ApiResult};
use crate::policy::{authorize, Action, Actor};
use crate::state::AppState;

pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FollowRequest>,
) -> ApiResult<impl IntoResponse> {
    let follower_id = claims.sub.to_string();
    let target_id = req.user_id.to_string();

    let target = state
        .db
        .get_user_summary(&target_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let target_role = parse_role(&target.role)?;

    authorize(
        &Actor {
            id: follower_id.clone(),
            role: claims.role,
        },
        Action::Follow {
            target_id: &target_id,
            target_role,
        },
    )?;

    if state.db.follow_exists(&follower_id, &target_id)? {
        return Err(ApiError::validation("You are already following this user"));
    }

    state
        .db
        .create_follow(&Uuid::new_v4().to_string(), &follower_id, &target_id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "You are now following {} {}",
                target.first_name, target.last_name
            ),
            "data": summary_response(target)?,
        })),
    ))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let target = state
        .db
        .get_user_summary(&user_id.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let removed = state
        .db
        .delete_follow(&claims.sub.to_string(), &target.id)?;
    if !removed {
        return Err(ApiError::validation("You are not following this user"));
    }

    Ok(Json(json!({
        "message": format!(
            "You have unfollowed {} {}",
            target.first_name, target.last_name
        ),
    })))
}

pub async fn my_followers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    followers_of(&state, claims.sub).await
}

pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    followers_of(&state, user_id).await
}

pub async fn my_following(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    following_of(&state, claims.sub).await
}

pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    following_of(&state, user_id).await
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let target = state
        .db
        .get_user_summary(&user_id.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let (followers_count, following_count) = state.db.follow_counts(&target.id)?;
    let is_following = state
        .db
        .follow_exists(&claims.sub.to_string(), &target.id)?;

    Ok(Json(json!({
        "message": format!(
            "Follow stats for {} {}",
            target.first_name, target.last_name
        ),
        "data": FollowStats {
            followers_count,
            following_count,
            is_following,
        },
    })))
}

async fn followers_of(state: &AppState, user_id: Uuid) -> ApiResult<Json<serde_json::Value>> {
    let target = state
        .db
        .get_user_summary(&user_id.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let rows = state.db.list_followers(&target.id)?;
    user_list_response(
        format!("Followers of {} {}", target.first_name, target.last_name),
        rows,
    )
}

async fn following_of(state: &AppState, user_id: Uuid) -> ApiResult<Json<serde_json::Value>> {
    let target = state
        .db
        .get_user_summary(&user_id.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let rows = state.db.list_following(&target.id)?;
    user_list_response(
        format!(
            "Users followed by {} {}",
            target.first_name, target.last_name
        ),
        rows,
    )
}

fn user_list_response(
    message: String,
    rows: Vec<UserSummaryRow>,
) -> ApiResult<Json<serde_json::Value>> {
    let data = rows
        .into_iter()
        .map(summary_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(json!({
        "message": message,
        "count": data.len(),
        "data": data,
    })))
}

pub(crate) fn summary_response(row: UserSummaryRow) -> ApiResult<BasicProfile> {
    Ok(BasicProfile {
        id: row
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id: {}", e)))?,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        role: parse_role(&row.role)?,
    })
}

fn parse_role(raw: &str) -> ApiResult<Role> {
    Role::parse(raw).ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown role '{}'", raw)))
}
