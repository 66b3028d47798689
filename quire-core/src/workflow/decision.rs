//! Editorial decisions.
//!
//! `under_review`/`revision_required` -> `{accepted, revision_required,
//! rejected}`. Each decision appends an immutable entry to the decision log
//! and a timeline event; the first decision-maker becomes the assigned
//! editor if none is set. There is no reassignment.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

use crate::error::{FieldError, WorkflowError};
use crate::id::UserId;
use crate::manuscript::{DecisionKind, EditorialDecision, Manuscript, ManuscriptStatus};
use crate::validate::COMMENT_MIN;

/// The outcome an editor selects, in its wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Accepted,
    RevisionRequired,
    Rejected,
}

impl DecisionOutcome {
    /// The manuscript status this outcome moves to.
    pub fn target_status(self) -> ManuscriptStatus {
        match self {
            Self::Accepted => ManuscriptStatus::Accepted,
            Self::RevisionRequired => ManuscriptStatus::RevisionRequired,
            Self::Rejected => ManuscriptStatus::Rejected,
        }
    }

    /// The normalized spelling recorded in the decision log.
    pub fn normalized(self) -> DecisionKind {
        match self {
            Self::Accepted => DecisionKind::Accept,
            Self::RevisionRequired => DecisionKind::Revision,
            Self::Rejected => DecisionKind::Reject,
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accepted => "accepted",
            Self::RevisionRequired => "revision_required",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Requested scale of a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionType {
    Minor,
    Major,
}

/// Editorial decision payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub decision: DecisionOutcome,
    pub feedback: String,
    #[serde(default)]
    pub revision_type: Option<RevisionType>,
}

/// Validate a decision payload: detailed feedback is always required, and
/// a revision decision must say whether the revision is minor or major.
pub fn validate_decision(request: &DecisionRequest) -> Result<(), WorkflowError> {
    let mut errors = Vec::new();

    if request.feedback.trim().chars().count() < COMMENT_MIN {
        errors.push(FieldError::new(
            "feedback",
            format!("please provide detailed feedback (at least {} characters)", COMMENT_MIN),
        ));
    }
    if request.decision == DecisionOutcome::RevisionRequired && request.revision_type.is_none() {
        errors.push(FieldError::new(
            "revisionType",
            "a revision type (minor or major) is required for revision decisions",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

/// Record an editorial decision.
///
/// The manuscript must currently be exactly `under_review` or
/// `revision_required`; anything else is a conflict and nothing changes.
pub fn decide(
    manuscript: &mut Manuscript,
    editor: &UserId,
    request: &DecisionRequest,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if !manuscript.status.accepts_decision() {
        return Err(WorkflowError::conflict(format!(
            "manuscript in {} status is not ready for an editorial decision",
            manuscript.status
        )));
    }

    manuscript.status = request.decision.target_status();
    manuscript.editorial_decisions.append(EditorialDecision {
        editor: editor.clone(),
        decision: request.decision.normalized(),
        comments: request.feedback.clone(),
        date: now,
    });
    if manuscript.assigned_editor.is_none() {
        manuscript.assigned_editor = Some(editor.clone());
    }
    manuscript.record_event(format!("Editorial decision: {}", request.decision), editor, now);
    manuscript.updated_at = now;

    Ok(())
}
