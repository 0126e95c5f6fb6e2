//! Job catalog: create, filterable/paginated listing, detail, update, delete,
//! my-jobs and the filter-options endpoint.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use worklink_db::models::JobListingRow;
use worklink_db::queries::{JobChanges, JobFilter, JobSort};
use worklink_types::api::{
    ChoiceOption, Claims, JobCreateRequest, JobFilterOptions, JobResponse, JobUpdateRequest,
    PagedResponse,
};
use worklink_types::models::{ExperienceLevel, JobType, Role};

use crate::error::{ApiError, ApiResult};
use crate::parse_ts;
use crate::policy::{authorize, Action, Actor, JobVerb};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    /// Comma-separated job types.
    pub job_type: Option<String>,
    /// Comma-separated experience levels.
    pub experience_level: Option<String>,
    pub company: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    /// Comma-separated skills, any-match.
    pub skills: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl JobListQuery {
    fn into_filter(self, available_to: Option<String>) -> JobFilter {
        let split = |s: Option<String>| -> Vec<String> {
            s.map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
        };

        JobFilter {
            search: self.search,
            location: self.location,
            job_types: split(self.job_type),
            experience_levels: split(self.experience_level),
            company_name: self.company,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            skills: split(self.skills),
            date_from: self.date_from,
            date_to: self.date_to,
            available_to,
            sort: self.sort.as_deref().map(JobSort::parse).unwrap_or_default(),
            page: self.page.unwrap_or(1).max(1),
            page_size: self
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<JobCreateRequest>,
) -> ApiResult<impl IntoResponse> {
    let actor = actor_from(&claims);
    authorize(&actor, Action::PostJob)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    if req.description.trim().is_empty() {
        return Err(ApiError::validation("Description is required"));
    }

    // A company account's profile name wins over whatever the client sent.
    let mut company_name = req.company_name.trim().to_string();
    if claims.role == Role::Company {
        if let Some(profile) = state.db.get_profile(&actor.id)? {
            if let Some(name) = profile.company_name.filter(|n| !n.trim().is_empty()) {
                company_name = name;
            }
        }
    }
    if company_name.is_empty() {
        return Err(ApiError::validation("Company name is required"));
    }

    let job_id = Uuid::new_v4().to_string();
    state.db.create_job(
        &job_id,
        &actor.id,
        req.title.trim(),
        req.description.trim(),
        &company_name,
        req.location.trim(),
        req.job_type.as_str(),
        req.experience_level.as_str(),
        req.salary_min,
        req.salary_max,
        &req.skills_required,
    )?;

    let listing = state
        .db
        .get_job_listing(&job_id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("job vanished after insert")))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Job posted successfully",
            "data": job_response(listing)?,
        })),
    ))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<impl IntoResponse> {
    paged_listing(&state, query.into_filter(None))
}

/// Jobs still open to the caller: excludes their own postings and jobs they
/// already applied to.
pub async fn available_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<impl IntoResponse> {
    paged_listing(&state, query.into_filter(Some(claims.sub.to_string())))
}

fn paged_listing(state: &AppState, filter: JobFilter) -> ApiResult<Json<PagedResponse<JobResponse>>> {
    let (rows, count) = state.db.list_jobs(&filter)?;
    let data = rows
        .into_iter()
        .map(job_response)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(PagedResponse {
        message: "Jobs retrieved successfully".to_string(),
        count,
        page: filter.page,
        page_size: filter.page_size,
        total_pages: count.div_ceil(filter.page_size as u64),
        data,
    }))
}

pub async fn job_detail(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let listing = state
        .db
        .get_job_listing(&job_id.to_string())?
        .filter(|l| l.job.is_active)
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(json!({
        "message": "Job retrieved successfully",
        "data": job_response(listing)?,
    })))
}

pub async fn update_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<JobUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = job_id.to_string();
    let job = state
        .db
        .get_job(&id)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let owner_role = poster_role(&state, &job.posted_by)?;
    authorize(
        &actor_from(&claims),
        Action::ModifyJob {
            verb: JobVerb::Edit,
            owner_id: &job.posted_by,
            owner_role,
        },
    )?;

    state.db.update_job(
        &id,
        &JobChanges {
            title: req.title,
            description: req.description,
            company_name: req.company_name,
            location: req.location,
            job_type: req.job_type.map(|t| t.as_str().to_string()),
            experience_level: req.experience_level.map(|l| l.as_str().to_string()),
            salary_min: req.salary_min,
            salary_max: req.salary_max,
            skills_required: req.skills_required,
            is_active: req.is_active,
        },
    )?;

    let listing = state
        .db
        .get_job_listing(&id)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(json!({
        "message": "Job updated successfully",
        "data": job_response(listing)?,
    })))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let id = job_id.to_string();
    let job = state
        .db
        .get_job(&id)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let owner_role = poster_role(&state, &job.posted_by)?;
    authorize(
        &actor_from(&claims),
        Action::ModifyJob {
            verb: JobVerb::Delete,
            owner_id: &job.posted_by,
            owner_role,
        },
    )?;

    state.db.delete_job(&id)?;
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

/// The caller's own postings, inactive ones included.
pub async fn my_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_jobs_by_poster(&claims.sub.to_string())?;
    let data = rows
        .into_iter()
        .map(job_response)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(json!({
        "message": "Jobs retrieved successfully",
        "data": data,
    })))
}

pub async fn filter_options(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let (locations, companies) = state.db.job_filter_values()?;

    Ok(Json(json!({
        "message": "Filter options retrieved successfully",
        "data": JobFilterOptions {
            job_types: JobType::ALL
                .iter()
                .map(|t| ChoiceOption { value: t.as_str(), label: t.label() })
                .collect(),
            experience_levels: ExperienceLevel::ALL
                .iter()
                .map(|l| ChoiceOption { value: l.as_str(), label: l.label() })
                .collect(),
            locations,
            companies,
        },
    })))
}

fn actor_from(claims: &Claims) -> Actor {
    Actor {
        id: claims.sub.to_string(),
        role: claims.role,
    }
}

fn poster_role(state: &AppState, poster_id: &str) -> ApiResult<Role> {
    let profile = state
        .db
        .get_profile(poster_id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("job poster has no profile")))?;
    Role::parse(&profile.role)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown role '{}'", profile.role)))
}

fn job_response(row: JobListingRow) -> ApiResult<JobResponse> {
    let job = row.job;
    Ok(JobResponse {
        id: job
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt job id: {}", e)))?,
        title: job.title,
        description: job.description,
        company_name: job.company_name,
        location: job.location,
        job_type: JobType::parse(&job.job_type)
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown job type '{}'", job.job_type)))?,
        experience_level: ExperienceLevel::parse(&job.experience_level).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "unknown experience level '{}'",
                job.experience_level
            ))
        })?,
        salary_min: job.salary_min,
        salary_max: job.salary_max,
        skills_required: job.skills_required,
        is_active: job.is_active,
        created_at: parse_ts(&job.created_at),
        updated_at: parse_ts(&job.updated_at),
        posted_by_name: row.posted_by_name,
        posted_by_email: row.posted_by_email,
        applications_count: row.applications_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_splits_comma_lists() {
        let query = JobListQuery {
            job_type: Some("full_time, contract".into()),
            skills: Some("rust,,sql".into()),
            ..Default::default()
        };
        let filter = query.into_filter(None);
        assert_eq!(filter.job_types, vec!["full_time", "contract"]);
        assert_eq!(filter.skills, vec!["rust", "sql"]);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn page_size_is_clamped() {
        let query = JobListQuery {
            page: Some(0),
            page_size: Some(10_000),
            ..Default::default()
        };
        let filter = query.into_filter(None);
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, MAX_PAGE_SIZE);
    }
}
