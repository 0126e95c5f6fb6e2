use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ApplicationStatus, ExperienceLevel, JobType, PostKind, ProfileView, Role};

// -- JWT Claims --

/// Claims shared by the REST middleware and the token issuer. The `token_type`
/// discriminator keeps refresh tokens from being replayed as access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub token_type: TokenType,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub company_name: Option<String>,
}

fn default_role() -> Role {
    Role::Employee
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub access: String,
    pub refresh: String,
    pub user: BasicProfile,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp_code: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

// -- Profile --

#[derive(Debug, Clone, Serialize)]
pub struct BasicProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileView,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub skills: Option<String>,
    pub education: Option<String>,
    pub experience: Option<String>,
    pub profile_image: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub company_image: Option<String>,
}

// -- Jobs --

#[derive(Debug, Deserialize)]
pub struct JobCreateRequest {
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub experience_level: ExperienceLevel,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    /// Comma-separated skills.
    pub skills_required: String,
}

#[derive(Debug, Deserialize)]
pub struct JobUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub skills_required: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub experience_level: ExperienceLevel,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub skills_required: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub posted_by_name: String,
    pub posted_by_email: String,
    pub applications_count: u64,
}

/// Paged collection envelope used by the list/search endpoints.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub message: String,
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct JobFilterOptions {
    pub job_types: Vec<ChoiceOption>,
    pub experience_levels: Vec<ChoiceOption>,
    pub locations: Vec<String>,
    pub companies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
}

// -- Applications --

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
    pub applicant_phone: Option<String>,
    pub expected_salary: Option<f64>,
    pub available_from: Option<chrono::NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_role: Role,
    pub job_title: String,
    pub company_name: String,
    pub job_location: String,
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
    pub expected_salary: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

// -- Follows --

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FollowStats {
    pub followers_count: u64,
    pub following_count: u64,
    pub is_following: bool,
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct PostCreateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default = "default_post_kind")]
    pub post_type: PostKind,
    /// URLs returned by the media upload endpoint.
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_post_kind() -> PostKind {
    PostKind::Update
}

#[derive(Debug, Deserialize)]
pub struct PostUpdateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub post_type: Option<PostKind>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: BasicProfile,
    pub title: Option<String>,
    pub content: Option<String>,
    pub post_type: PostKind,
    pub images: Vec<PostImageResponse>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostImageResponse {
    pub id: Uuid,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentCreateRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub author: BasicProfile,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
