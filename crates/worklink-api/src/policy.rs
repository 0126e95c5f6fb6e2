//! Authorization policy: one place answering "may this actor perform this
//! action on this resource", instead of per-handler role checks.

use worklink_types::models::Role;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobVerb {
    Edit,
    Delete,
}

impl JobVerb {
    fn as_str(&self) -> &'static str {
        match self {
            JobVerb::Edit => "edit",
            JobVerb::Delete => "delete",
        }
    }
}

#[derive(Debug)]
pub enum Action<'a> {
    PostJob,
    /// Edit or delete a job. Ownership alone is not enough: the poster's role
    /// must match the actor's role cohort.
    ModifyJob {
        verb: JobVerb,
        owner_id: &'a str,
        owner_role: Role,
    },
    ApplyToJob {
        owner_id: &'a str,
    },
    UpdateApplicationStatus {
        job_owner_id: &'a str,
    },
    ViewApplication {
        applicant_id: &'a str,
        job_owner_id: &'a str,
    },
    /// List every application submitted to one job.
    ViewJobApplications {
        job_owner_id: &'a str,
    },
    Follow {
        target_id: &'a str,
        target_role: Role,
    },
    ModifyPost {
        author_id: &'a str,
        what: &'a str,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Deny {
    /// Role or ownership violation — 403.
    Forbidden(String),
    /// Rule violation on otherwise well-formed input — 400.
    Invalid(String),
}

impl From<Deny> for ApiError {
    fn from(deny: Deny) -> Self {
        match deny {
            Deny::Forbidden(msg) => ApiError::Forbidden(msg),
            Deny::Invalid(msg) => ApiError::Validation(msg),
        }
    }
}

pub fn authorize(actor: &Actor, action: Action<'_>) -> Result<(), Deny> {
    match action {
        Action::PostJob => {
            if actor.role.can_post_jobs() {
                Ok(())
            } else {
                Err(Deny::Forbidden("Employees cannot post jobs".into()))
            }
        }

        Action::ModifyJob {
            verb,
            owner_id,
            owner_role,
        } => {
            // employees are rejected before any ownership check
            if actor.role == Role::Employee {
                return Err(Deny::Forbidden(format!(
                    "Employees cannot {} jobs",
                    verb.as_str()
                )));
            }
            if actor.id != owner_id {
                return Err(Deny::Forbidden(format!(
                    "You can only {} jobs you posted",
                    verb.as_str()
                )));
            }
            if actor.role != owner_role {
                let msg = match actor.role {
                    Role::Employer => format!("Employers can only {} employer jobs", verb.as_str()),
                    Role::Company => format!("Companies can only {} company jobs", verb.as_str()),
                    Role::Employee => unreachable!("employees rejected above"),
                };
                return Err(Deny::Forbidden(msg));
            }
            Ok(())
        }

        Action::ApplyToJob { owner_id } => {
            if actor.role == Role::Company {
                return Err(Deny::Forbidden("Companies cannot apply for jobs".into()));
            }
            // self-application block applies to an employer's own postings only
            if actor.role == Role::Employer && actor.id == owner_id {
                return Err(Deny::Invalid("You cannot apply for your own job".into()));
            }
            Ok(())
        }

        Action::UpdateApplicationStatus { job_owner_id } => {
            if actor.id == job_owner_id {
                Ok(())
            } else {
                Err(Deny::Forbidden(
                    "Only the job owner can update application status".into(),
                ))
            }
        }

        Action::ViewApplication {
            applicant_id,
            job_owner_id,
        } => {
            if actor.id == applicant_id || actor.id == job_owner_id {
                Ok(())
            } else {
                Err(Deny::Forbidden("Access denied".into()))
            }
        }

        Action::ViewJobApplications { job_owner_id } => {
            if actor.id == job_owner_id {
                Ok(())
            } else {
                Err(Deny::Forbidden(
                    "You can only view applications for jobs you posted".into(),
                ))
            }
        }

        Action::Follow {
            target_id,
            target_role,
        } => {
            if actor.id == target_id {
                return Err(Deny::Invalid("You cannot follow yourself".into()));
            }
            if actor.role == Role::Company && target_role != Role::Company {
                return Err(Deny::Forbidden(
                    "Companies can only follow other companies".into(),
                ));
            }
            Ok(())
        }

        Action::ModifyPost { author_id, what } => {
            if actor.id == author_id {
                Ok(())
            } else {
                Err(Deny::Forbidden(format!(
                    "You can only {} your own posts",
                    what
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str, role: Role) -> Actor {
        Actor {
            id: id.into(),
            role,
        }
    }

    #[test]
    fn only_employers_and_companies_post() {
        assert!(authorize(&actor("u", Role::Employer), Action::PostJob).is_ok());
        assert!(authorize(&actor("u", Role::Company), Action::PostJob).is_ok());
        assert!(matches!(
            authorize(&actor("u", Role::Employee), Action::PostJob),
            Err(Deny::Forbidden(_))
        ));
    }

    #[test]
    fn employee_rejected_before_ownership() {
        // the employee owns the job, but the role gate comes first
        let deny = authorize(
            &actor("u1", Role::Employee),
            Action::ModifyJob {
                verb: JobVerb::Edit,
                owner_id: "u1",
                owner_role: Role::Employee,
            },
        )
        .unwrap_err();
        assert_eq!(deny, Deny::Forbidden("Employees cannot edit jobs".into()));
    }

    #[test]
    fn ownership_checked_before_role_cohort() {
        let deny = authorize(
            &actor("u2", Role::Employer),
            Action::ModifyJob {
                verb: JobVerb::Edit,
                owner_id: "u1",
                owner_role: Role::Employer,
            },
        )
        .unwrap_err();
        assert_eq!(
            deny,
            Deny::Forbidden("You can only edit jobs you posted".into())
        );
    }

    #[test]
    fn same_role_cohort_required_even_for_owner() {
        // owner whose stored role differs from their acting role cohort
        let deny = authorize(
            &actor("u1", Role::Employer),
            Action::ModifyJob {
                verb: JobVerb::Delete,
                owner_id: "u1",
                owner_role: Role::Company,
            },
        )
        .unwrap_err();
        assert_eq!(
            deny,
            Deny::Forbidden("Employers can only delete employer jobs".into())
        );
    }

    #[test]
    fn owner_in_cohort_may_modify() {
        assert!(authorize(
            &actor("u1", Role::Company),
            Action::ModifyJob {
                verb: JobVerb::Edit,
                owner_id: "u1",
                owner_role: Role::Company,
            },
        )
        .is_ok());
    }

    #[test]
    fn companies_never_apply() {
        assert!(matches!(
            authorize(
                &actor("c1", Role::Company),
                Action::ApplyToJob { owner_id: "other" }
            ),
            Err(Deny::Forbidden(_))
        ));
    }

    #[test]
    fn employer_blocked_from_own_job_only() {
        assert!(matches!(
            authorize(
                &actor("e1", Role::Employer),
                Action::ApplyToJob { owner_id: "e1" }
            ),
            Err(Deny::Invalid(_))
        ));
        assert!(authorize(
            &actor("e1", Role::Employer),
            Action::ApplyToJob { owner_id: "c1" }
        )
        .is_ok());
        // employees may apply anywhere
        assert!(authorize(
            &actor("e2", Role::Employee),
            Action::ApplyToJob { owner_id: "e2" }
        )
        .is_ok());
    }

    #[test]
    fn company_follows_company_only() {
        assert!(matches!(
            authorize(
                &actor("c1", Role::Company),
                Action::Follow {
                    target_id: "u2",
                    target_role: Role::Employee,
                }
            ),
            Err(Deny::Forbidden(_))
        ));
        assert!(authorize(
            &actor("c1", Role::Company),
            Action::Follow {
                target_id: "c2",
                target_role: Role::Company,
            }
        )
        .is_ok());
        // non-company followers are unrestricted by role
        assert!(authorize(
            &actor("u1", Role::Employee),
            Action::Follow {
                target_id: "c2",
                target_role: Role::Company,
            }
        )
        .is_ok());
    }

    #[test]
    fn self_follow_is_invalid_regardless_of_role() {
        assert!(matches!(
            authorize(
                &actor("c1", Role::Company),
                Action::Follow {
                    target_id: "c1",
                    target_role: Role::Company,
                }
            ),
            Err(Deny::Invalid(_))
        ));
    }

    #[test]
    fn application_visible_to_applicant_and_owner_only() {
        let action = || Action::ViewApplication {
            applicant_id: "a1",
            job_owner_id: "o1",
        };
        assert!(authorize(&actor("a1", Role::Employee), action()).is_ok());
        assert!(authorize(&actor("o1", Role::Employer), action()).is_ok());
        assert!(authorize(&actor("x1", Role::Employer), action()).is_err());
    }

    #[test]
    fn job_application_list_is_owner_only() {
        assert!(authorize(
            &actor("o1", Role::Employer),
            Action::ViewJobApplications { job_owner_id: "o1" }
        )
        .is_ok());
        let deny = authorize(
            &actor("o2", Role::Employer),
            Action::ViewJobApplications { job_owner_id: "o1" },
        )
        .unwrap_err();
        assert_eq!(
            deny,
            Deny::Forbidden("You can only view applications for jobs you posted".into())
        );
    }

    #[test]
    fn status_update_is_owner_only() {
        assert!(authorize(
            &actor("o1", Role::Employer),
            Action::UpdateApplicationStatus { job_owner_id: "o1" }
        )
        .is_ok());
        assert!(authorize(
            &actor("a1", Role::Employee),
            Action::UpdateApplicationStatus { job_owner_id: "o1" }
        )
        .is_err());
    }

    #[test]
    fn post_modification_is_author_only() {
        assert!(authorize(
            &actor("u1", Role::Employee),
            Action::ModifyPost {
                author_id: "u1",
                what: "update",
            }
        )
        .is_ok());
        let deny = authorize(
            &actor("u2", Role::Employee),
            Action::ModifyPost {
                author_id: "u1",
                what: "delete",
            },
        )
        .unwrap_err();
        assert_eq!(
            deny,
            Deny::Forbidden("You can only delete your own posts".into())
        );
    }
}
