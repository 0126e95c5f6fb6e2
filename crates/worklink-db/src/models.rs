/// Database row types — these map directly to SQLite rows.
/// Distinct from worklink-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub user_id: String,
    pub role: String,
    pub is_email_verified: bool,
    pub phone_number: Option<String>,
    pub skills: Option<String>,
    pub education: Option<String>,
    pub experience: Option<String>,
    pub profile_image: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub company_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OtpRow {
    pub id: String,
    pub user_id: String,
    pub code: String,
    pub kind: String,
    pub created_at: String,
    pub is_verified: bool,
}

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub posted_by: String,
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub location: String,
    pub job_type: String,
    pub experience_level: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub skills_required: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Job row joined with its poster and application count, as the list and
/// detail endpoints present it.
#[derive(Debug, Clone)]
pub struct JobListingRow {
    pub job: JobRow,
    pub posted_by_name: String,
    pub posted_by_email: String,
    pub applications_count: u64,
}

#[derive(Debug, Clone)]
pub struct ApplicationRow {
    pub id: String,
    pub job_id: String,
    pub applicant_id: String,
    pub status: String,
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
    pub applicant_phone: Option<String>,
    pub expected_salary: Option<f64>,
    pub available_from: Option<String>,
    pub applied_at: String,
    pub updated_at: String,
}

/// Application joined with applicant and job, for list/detail responses.
#[derive(Debug, Clone)]
pub struct ApplicationDetailRow {
    pub application: ApplicationRow,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_role: String,
    pub job_title: String,
    pub job_company: String,
    pub job_location: String,
    pub job_posted_by: String,
}

#[derive(Debug, Clone)]
pub struct FollowRow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

/// User summary as surfaced in follower/following lists.
#[derive(Debug, Clone)]
pub struct UserSummaryRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub post_type: String,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PostListingRow {
    pub post: PostRow,
    pub author: UserSummaryRow,
    pub is_liked: bool,
}

#[derive(Debug, Clone)]
pub struct PostImageRow {
    pub id: String,
    pub post_id: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentListingRow {
    pub comment: CommentRow,
    pub author: UserSummaryRow,
}

#[derive(Debug, Clone)]
pub struct MediaFileRow {
    pub id: String,
    pub owner_id: String,
    pub size: i64,
    pub created_at: String,
}
