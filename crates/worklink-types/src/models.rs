use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role. Gates posting, applying and following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Employer,
    Company,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Employer => "employer",
            Role::Company => "company",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(Role::Employee),
            "employer" => Some(Role::Employer),
            "company" => Some(Role::Company),
            _ => None,
        }
    }

    /// Employers and companies post jobs; employees never do.
    pub fn can_post_jobs(&self) -> bool {
        matches!(self, Role::Employer | Role::Company)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    EmailVerification,
    PasswordReset,
}

impl OtpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpKind::EmailVerification => "email_verification",
            OtpKind::PasswordReset => "password_reset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email_verification" => Some(OtpKind::EmailVerification),
            "password_reset" => Some(OtpKind::PasswordReset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Internship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full Time",
            JobType::PartTime => "Part Time",
            JobType::Contract => "Contract",
            JobType::Internship => "Internship",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full_time" => Some(JobType::FullTime),
            "part_time" => Some(JobType::PartTime),
            "contract" => Some(JobType::Contract),
            "internship" => Some(JobType::Internship),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Junior,
    Mid,
    Senior,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 4] = [
        ExperienceLevel::Entry,
        ExperienceLevel::Junior,
        ExperienceLevel::Mid,
        ExperienceLevel::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "Entry Level (0-1 years)",
            ExperienceLevel::Junior => "Junior (1-3 years)",
            ExperienceLevel::Mid => "Mid Level (3-5 years)",
            ExperienceLevel::Senior => "Senior (5+ years)",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(ExperienceLevel::Entry),
            "junior" => Some(ExperienceLevel::Junior),
            "mid" => Some(ExperienceLevel::Mid),
            "senior" => Some(ExperienceLevel::Senior),
            _ => None,
        }
    }
}

/// Application lifecycle. Mutable only by the job's poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Reviewed,
    Shortlisted,
    InterviewScheduled,
    Selected,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::Selected => "selected",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(ApplicationStatus::Applied),
            "reviewed" => Some(ApplicationStatus::Reviewed),
            "shortlisted" => Some(ApplicationStatus::Shortlisted),
            "interview_scheduled" => Some(ApplicationStatus::InterviewScheduled),
            "selected" => Some(ApplicationStatus::Selected),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Achievement,
    Update,
    JobUpdate,
    Milestone,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Achievement => "achievement",
            PostKind::Update => "update",
            PostKind::JobUpdate => "job_update",
            PostKind::Milestone => "milestone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "achievement" => Some(PostKind::Achievement),
            "update" => Some(PostKind::Update),
            "job_update" => Some(PostKind::JobUpdate),
            "milestone" => Some(PostKind::Milestone),
            _ => None,
        }
    }
}

/// Role-shaped profile representation. Each role serializes its own field set
/// instead of stripping fields at runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Individual {
        id: Uuid,
        first_name: String,
        last_name: String,
        email: String,
        role: Role,
        phone_number: Option<String>,
        skills: Option<String>,
        education: Option<String>,
        experience: Option<String>,
        profile_image: Option<String>,
    },
    Company {
        id: Uuid,
        first_name: String,
        last_name: String,
        email: String,
        role: Role,
        company_name: Option<String>,
        address: Option<String>,
        company_image: Option<String>,
    },
}
