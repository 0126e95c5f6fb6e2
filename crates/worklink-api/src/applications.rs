//! Job applications: apply, my-applications, applications-received, detail and
//! the owner-only status update.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use worklink_db::models::ApplicationDetailRow;
use worklink_types::api::{ApplicationResponse, ApplyRequest, Claims, StatusUpdateRequest};
use worklink_types::models::{ApplicationStatus, Role};

use crate::error::{ApiError, ApiResult};
use crate::parse_ts;
use crate::policy::{authorize, Action, Actor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
}

pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<impl IntoResponse> {
    let actor = actor_from(&claims);
    let job = state
        .db
        .get_job(&job_id.to_string())?
        .filter(|j| j.is_active)
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    authorize(
        &actor,
        Action::ApplyToJob {
            owner_id: &job.posted_by,
        },
    )?;

    if let Some(prior) = state.db.get_application_for(&job.id, &actor.id)? {
        let applied = parse_ts(&prior.applied_at);
        return Err(ApiError::Conflict {
            message: format!(
                "You have already applied for this job on {}",
                applied.format("%Y-%m-%d %H:%M")
            ),
            detail: json!({
                "application_status": prior.status,
                "applied_date": applied,
                "job_title": job.title,
                "company_name": job.company_name,
            }),
        });
    }

    let application_id = Uuid::new_v4().to_string();
    state.db.create_application(
        &application_id,
        &job.id,
        &actor.id,
        req.resume.as_deref(),
        req.cover_letter.as_deref(),
        req.applicant_phone.as_deref(),
        req.expected_salary,
        req.available_from.map(|d| d.to_string()).as_deref(),
    )?;

    let detail = state
        .db
        .get_application_detail(&application_id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("application vanished after insert")))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Application submitted successfully",
            "data": application_response(detail)?,
        })),
    ))
}

pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ApplicationListQuery>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_applications_by_applicant(
        &claims.sub.to_string(),
        query.status.map(|s| s.as_str()),
        query.search.as_deref(),
    )?;
    listing_response(rows)
}

/// All applications received across the caller's postings.
pub async fn applications_received(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ApplicationListQuery>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_applications_received(
        &claims.sub.to_string(),
        query.status.map(|s| s.as_str()),
        query.search.as_deref(),
    )?;
    listing_response(rows)
}

/// Applications for one job, visible to its poster only.
pub async fn applications_for_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ApplicationListQuery>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .db
        .get_job(&job_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    authorize(
        &actor_from(&claims),
        Action::ViewJobApplications {
            job_owner_id: &job.posted_by,
        },
    )?;

    let rows = state.db.list_applications_for_job(
        &job.id,
        query.status.map(|s| s.as_str()),
        query.search.as_deref(),
    )?;
    listing_response(rows)
}

pub async fn application_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(application_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let detail = state
        .db
        .get_application_detail(&application_id.to_string())?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    authorize(
        &actor_from(&claims),
        Action::ViewApplication {
            applicant_id: &detail.application.applicant_id,
            job_owner_id: &detail.job_posted_by,
        },
    )?;

    Ok(Json(json!({
        "message": "Application retrieved successfully",
        "data": application_response(detail)?,
    })))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = application_id.to_string();
    let detail = state
        .db
        .get_application_detail(&id)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    authorize(
        &actor_from(&claims),
        Action::UpdateApplicationStatus {
            job_owner_id: &detail.job_posted_by,
        },
    )?;

    state.db.update_application_status(&id, req.status.as_str())?;
    let detail = state
        .db
        .get_application_detail(&id)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    Ok(Json(json!({
        "message": "Application status updated successfully",
        "data": application_response(detail)?,
    })))
}

fn actor_from(claims: &Claims) -> Actor {
    Actor {
        id: claims.sub.to_string(),
        role: claims.role,
    }
}

fn listing_response(rows: Vec<ApplicationDetailRow>) -> ApiResult<Json<serde_json::Value>> {
    let data = rows
        .into_iter()
        .map(application_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(json!({
        "message": "Applications retrieved successfully",
        "count": data.len(),
        "data": data,
    })))
}

fn application_response(row: ApplicationDetailRow) -> ApiResult<ApplicationResponse> {
    let app = row.application;
    Ok(ApplicationResponse {
        id: app
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt application id: {}", e)))?,
        status: ApplicationStatus::parse(&app.status).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("unknown application status '{}'", app.status))
        })?,
        applied_at: parse_ts(&app.applied_at),
        updated_at: parse_ts(&app.updated_at),
        applicant_name: row.applicant_name,
        applicant_email: row.applicant_email,
        applicant_role: Role::parse(&row.applicant_role).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("unknown role '{}'", row.applicant_role))
        })?,
        job_title: row.job_title,
        company_name: row.job_company,
        job_location: row.job_location,
        resume: app.resume,
        cover_letter: app.cover_letter,
        expected_salary: app.expected_salary,
    })
}
