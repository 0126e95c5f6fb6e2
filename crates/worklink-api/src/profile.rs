//! Profile read and update. The response shape is role-dependent: individual
//! accounts carry skills/education/experience, company accounts carry the
//! company fields. Each variant serializes only its own field set.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;
use uuid::Uuid;

use worklink_db::queries::ProfileChanges;
use worklink_types::api::{Claims, ProfileResponse, ProfileUpdateRequest};
use worklink_types::models::{ProfileView, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let view = load_profile_view(&state, claims.sub)?;
    Ok(Json(ProfileResponse { profile: view }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ProfileUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = claims.sub.to_string();
    if state.db.get_user_by_id(&user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    if req.first_name.is_some() || req.last_name.is_some() {
        state.db.update_user_names(
            &user_id,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
        )?;
    }

    state.db.update_profile(
        &user_id,
        &ProfileChanges {
            phone_number: req.phone_number,
            skills: req.skills,
            education: req.education,
            experience: req.experience,
            profile_image: req.profile_image,
            company_name: req.company_name,
            address: req.address,
            company_image: req.company_image,
        },
    )?;

    Ok(Json(json!({ "message": "Profile updated successfully" })))
}

pub(crate) fn load_profile_view(state: &AppState, user_id: Uuid) -> ApiResult<ProfileView> {
    let id_str = user_id.to_string();
    let user = state
        .db
        .get_user_by_id(&id_str)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let profile = state
        .db
        .get_profile(&id_str)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let role = Role::parse(&profile.role)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown role '{}'", profile.role)))?;

    let view = match role {
        Role::Company => ProfileView::Company {
            id: user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role,
            company_name: profile.company_name,
            address: profile.address,
            company_image: profile.company_image,
        },
        Role::Employee | Role::Employer => ProfileView::Individual {
            id: user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role,
            phone_number: profile.phone_number,
            skills: profile.skills,
            education: profile.education,
            experience: profile.experience,
            profile_image: profile.profile_image,
        },
    };
    Ok(view)
}
