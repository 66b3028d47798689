//! Access control guard.
//!
//! Authorization is a pure function of `(role, ownership, resource state)`.
//! The role half lives in an explicit capability table so the policy can be
//! read and tested in one place; the ownership/membership half is matched
//! per action below. Identity is always an explicit parameter: there is no
//! ambient session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::id::UserId;
use crate::manuscript::{Manuscript, ManuscriptStatus};
use crate::user::Role;

/// The verified identity attached to a request by the external auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user: impl Into<UserId>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
        }
    }
}

/// Every gated operation in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadManuscript,
    ListManuscripts,
    SaveDraft,
    SubmitManuscript,
    InviteReviewers,
    RespondToInvitation,
    SubmitReview,
    ReadOwnReview,
    ListReviews,
    RecordDecision,
    SearchReviewers,
    ViewStats,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::ReadManuscript => "read manuscripts",
            Action::ListManuscripts => "list manuscripts",
            Action::SaveDraft => "save drafts",
            Action::SubmitManuscript => "submit manuscripts",
            Action::InviteReviewers => "invite reviewers",
            Action::RespondToInvitation => "respond to review invitations",
            Action::SubmitReview => "submit reviews",
            Action::ReadOwnReview => "read their own review",
            Action::ListReviews => "list reviews",
            Action::RecordDecision => "record editorial decisions",
            Action::SearchReviewers => "search reviewers",
            Action::ViewStats => "view dashboard statistics",
        };
        write!(f, "{}", s)
    }
}

const AUTHOR_ACTIONS: &[Action] = &[
    Action::ReadManuscript,
    Action::ListManuscripts,
    Action::SaveDraft,
    Action::SubmitManuscript,
    Action::ViewStats,
];

const REVIEWER_ACTIONS: &[Action] = &[
    Action::ReadManuscript,
    Action::ListManuscripts,
    Action::RespondToInvitation,
    Action::SubmitReview,
    Action::ReadOwnReview,
    Action::ViewStats,
];

const EDITOR_ACTIONS: &[Action] = &[
    Action::ReadManuscript,
    Action::ListManuscripts,
    Action::InviteReviewers,
    Action::ListReviews,
    Action::RecordDecision,
    Action::SearchReviewers,
    Action::ViewStats,
];

const ADMIN_ACTIONS: &[Action] = &[
    Action::ReadManuscript,
    Action::ListManuscripts,
    Action::SaveDraft,
    Action::SubmitManuscript,
    Action::InviteReviewers,
    Action::RespondToInvitation,
    Action::SubmitReview,
    Action::ReadOwnReview,
    Action::ListReviews,
    Action::RecordDecision,
    Action::SearchReviewers,
    Action::ViewStats,
];

/// The capability table: what each role may do at all, before any
/// ownership or state check.
pub fn capabilities(role: Role) -> &'static [Action] {
    match role {
        Role::Author => AUTHOR_ACTIONS,
        Role::Reviewer => REVIEWER_ACTIONS,
        Role::Editor => EDITOR_ACTIONS,
        Role::Admin => ADMIN_ACTIONS,
    }
}

/// The resource an action targets, when it targets one.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    None,
    Manuscript(&'a Manuscript),
}

/// Decide whether `identity` may perform `action` on `resource`.
///
/// Role membership is checked against the capability table first, then
/// ownership/membership rules for manuscript-scoped actions. Admin passes
/// every check (reserved; not exercised by the current workflow).
pub fn authorize(
    identity: &Identity,
    action: Action,
    resource: Resource<'_>,
) -> Result<(), WorkflowError> {
    if !capabilities(identity.role).contains(&action) {
        return Err(WorkflowError::forbidden(format!(
            "the {} role may not {}",
            identity.role, action
        )));
    }

    if identity.role == Role::Admin {
        return Ok(());
    }

    let manuscript = match resource {
        Resource::None => return Ok(()),
        Resource::Manuscript(m) => m,
    };

    match action {
        Action::ReadManuscript => match identity.role {
            Role::Author if manuscript.submitted_by != identity.user => Err(
                WorkflowError::forbidden("authors may only read their own manuscripts"),
            ),
            Role::Reviewer if !manuscript.has_reviewer(&identity.user) => Err(
                WorkflowError::forbidden("you are not invited to review this manuscript"),
            ),
            Role::Editor if manuscript.status == ManuscriptStatus::Draft => Err(
                WorkflowError::forbidden("draft manuscripts are not visible to editors"),
            ),
            _ => Ok(()),
        },
        Action::SaveDraft | Action::SubmitManuscript => {
            if manuscript.submitted_by != identity.user {
                Err(WorkflowError::forbidden(
                    "only the submitting author may modify this manuscript",
                ))
            } else {
                Ok(())
            }
        }
        Action::RespondToInvitation | Action::SubmitReview | Action::ReadOwnReview => {
            if !manuscript.has_reviewer(&identity.user) {
                Err(WorkflowError::forbidden(
                    "you are not invited to review this manuscript",
                ))
            } else {
                Ok(())
            }
        }
        // Role-scoped only; no ownership component.
        Action::ListManuscripts
        | Action::InviteReviewers
        | Action::ListReviews
        | Action::RecordDecision
        | Action::SearchReviewers
        | Action::ViewStats => Ok(()),
    }
}
