use serde::Deserialize;
use thiserror::Error;

use crate::db::types::ApplicationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot {action} an application in state '{from:?}'")]
pub(crate) struct TransitionRefused {
    pub(crate) from: ApplicationStatus,
    pub(crate) action: &'static str,
}

/// review: submitted | under_review -> approved | rejected
pub(crate) fn review(
    current: ApplicationStatus,
    decision: ReviewDecision,
) -> Result<ApplicationStatus, TransitionRefused> {
    match current {
        ApplicationStatus::Submitted | ApplicationStatus::UnderReview => Ok(match decision {
            ReviewDecision::Approve => ApplicationStatus::Approved,
            ReviewDecision::Reject => ApplicationStatus::Rejected,
        }),
        from => Err(TransitionRefused { from, action: "review" }),
    }
}

/// enroll: approved -> enrolled
pub(crate) fn enroll(current: ApplicationStatus) -> Result<ApplicationStatus, TransitionRefused> {
    match current {
        ApplicationStatus::Approved => Ok(ApplicationStatus::Enrolled),
        from => Err(TransitionRefused { from, action: "enroll" }),
    }
}

/// withdraw: submitted | under_review | approved -> withdrawn
pub(crate) fn withdraw(current: ApplicationStatus) -> Result<ApplicationStatus, TransitionRefused> {
    match current {
        ApplicationStatus::Submitted
        | ApplicationStatus::UnderReview
        | ApplicationStatus::Approved => Ok(ApplicationStatus::Withdrawn),
        from => Err(TransitionRefused { from, action: "withdraw" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_approves_and_rejects_from_submitted() {
        assert_eq!(
            review(ApplicationStatus::Submitted, ReviewDecision::Approve),
            Ok(ApplicationStatus::Approved)
        );
        assert_eq!(
            review(ApplicationStatus::UnderReview, ReviewDecision::Reject),
            Ok(ApplicationStatus::Rejected)
        );
    }

    #[test]
    fn approved_is_terminal_for_review() {
        assert!(review(ApplicationStatus::Approved, ReviewDecision::Reject).is_err());
        assert!(review(ApplicationStatus::Rejected, ReviewDecision::Approve).is_err());
        assert!(review(ApplicationStatus::Enrolled, ReviewDecision::Approve).is_err());
    }

    #[test]
    fn enroll_only_from_approved() {
        assert_eq!(enroll(ApplicationStatus::Approved), Ok(ApplicationStatus::Enrolled));
        assert!(enroll(ApplicationStatus::Submitted).is_err());
        assert!(enroll(ApplicationStatus::Enrolled).is_err());
        assert!(enroll(ApplicationStatus::Withdrawn).is_err());
    }

    #[test]
    fn withdraw_allowed_until_enrolled() {
        assert_eq!(withdraw(ApplicationStatus::Submitted), Ok(ApplicationStatus::Withdrawn));
        assert_eq!(withdraw(ApplicationStatus::Approved), Ok(ApplicationStatus::Withdrawn));
        assert!(withdraw(ApplicationStatus::Enrolled).is_err());
        assert!(withdraw(ApplicationStatus::Rejected).is_err());
    }
}
