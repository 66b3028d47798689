//! The reviewer invitation protocol.
//!
//! Per-manuscript, per-reviewer sub-state machine:
//! `invited -> accepted -> completed`, or `invited -> declined` (terminal).
//! Inviting reviewers on a `submitted` (or `revision_required`) manuscript
//! promotes it to `under_review`.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

use crate::error::WorkflowError;
use crate::id::UserId;
use crate::manuscript::{InvitationStatus, Manuscript, ManuscriptStatus, ReviewerEntry};

/// Default review deadline when the inviting editor does not set one.
pub const DEFAULT_DEADLINE_DAYS: i64 = 14;

/// The deadline applied to an invitation sent at `now` with none specified.
pub fn default_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(DEFAULT_DEADLINE_DAYS)
}

/// One reviewer in an invitation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitee {
    pub user: UserId,
    pub deadline: Option<DateTime<Utc>>,
}

/// Result of a successful invitation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteOutcome {
    /// How many new reviewer entries were created (already-invited users
    /// are filtered out, not duplicated).
    pub invited: usize,
    /// The manuscript status after the batch.
    pub status: ManuscriptStatus,
}

/// Invite a batch of reviewers.
///
/// Already-invited users are filtered out per invitee; a batch consisting
/// solely of already-invited users fails with a conflict rather than
/// silently succeeding with zero effect. The first successful batch on a
/// `submitted` manuscript moves it to `under_review`; re-inviting on
/// `revision_required` cycles it back to `under_review`.
pub fn invite(
    manuscript: &mut Manuscript,
    invitees: &[Invitee],
    actor: &UserId,
    now: DateTime<Utc>,
) -> Result<InviteOutcome, WorkflowError> {
    if manuscript.status == ManuscriptStatus::Draft {
        return Err(WorkflowError::conflict(
            "cannot assign reviewers to a draft manuscript",
        ));
    }
    if invitees.is_empty() {
        return Err(WorkflowError::invalid(
            "reviewers",
            "at least one reviewer is required",
        ));
    }

    // Dedup against existing entries and within the batch itself.
    let mut seen: HashSet<&UserId> = manuscript.reviewers.iter().map(|r| &r.user).collect();
    let mut fresh: Vec<&Invitee> = Vec::new();
    for invitee in invitees {
        if seen.insert(&invitee.user) {
            fresh.push(invitee);
        }
    }

    if fresh.is_empty() {
        return Err(WorkflowError::conflict(
            "all selected reviewers have already been invited",
        ));
    }

    let invited = fresh.len();
    let entries: Vec<ReviewerEntry> = fresh
        .into_iter()
        .map(|invitee| ReviewerEntry {
            user: invitee.user.clone(),
            status: InvitationStatus::Invited,
            invited_at: now,
            deadline: invitee.deadline.unwrap_or_else(|| default_deadline(now)),
            responded_at: None,
            completed_at: None,
        })
        .collect();
    manuscript.reviewers.extend(entries);

    if manuscript.status.promotes_on_invitation() {
        manuscript.status = ManuscriptStatus::UnderReview;
    }

    manuscript.record_event(format!("{} reviewer(s) invited", invited), actor, now);
    manuscript.updated_at = now;

    Ok(InviteOutcome {
        invited,
        status: manuscript.status,
    })
}

/// A reviewer's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationResponse {
    Accept,
    Decline,
}

impl fmt::Display for InvitationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accept => "accepted",
            Self::Decline => "declined",
        };
        write!(f, "{}", s)
    }
}

/// Accept or decline an invitation.
///
/// Only valid while the entry is exactly `invited`; a second response is
/// rejected with a conflict naming the current status and changes nothing.
pub fn respond(
    manuscript: &mut Manuscript,
    reviewer: &UserId,
    response: InvitationResponse,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    let entry = manuscript
        .reviewer_entry_mut(reviewer)
        .ok_or_else(|| WorkflowError::forbidden("you are not invited to review this manuscript"))?;

    if entry.status != InvitationStatus::Invited {
        return Err(WorkflowError::conflict(format!(
            "you have already {} this invitation",
            entry.status
        )));
    }

    entry.status = match response {
        InvitationResponse::Accept => InvitationStatus::Accepted,
        InvitationResponse::Decline => InvitationStatus::Declined,
    };
    entry.responded_at = Some(now);

    manuscript.record_event(format!("Reviewer {} invitation", response), reviewer, now);
    manuscript.updated_at = now;

    Ok(())
}

/// Check that `reviewer` may submit a review right now: they must hold an
/// entry in exactly `accepted` state. Returns the entry for snapshotting
/// invitation metadata onto the review document.
///
/// Callers run this gate before persisting a review, then call [`complete`]
/// after the review write succeeds, so neither an orphaned `completed`
/// entry nor an unauthorized review document can be left behind.
pub fn review_gate<'a>(
    manuscript: &'a Manuscript,
    reviewer: &UserId,
) -> Result<&'a ReviewerEntry, WorkflowError> {
    let entry = manuscript
        .reviewer_entry(reviewer)
        .ok_or_else(|| WorkflowError::forbidden("you are not assigned to review this manuscript"))?;

    if entry.status != InvitationStatus::Accepted {
        return Err(WorkflowError::conflict(format!(
            "review submission requires an accepted invitation; yours is {}",
            entry.status
        )));
    }
    Ok(entry)
}

/// Advance a reviewer's entry to `completed` as part of review submission.
///
/// Gated on the entry being exactly `accepted` (see [`review_gate`]).
pub fn complete(
    manuscript: &mut Manuscript,
    reviewer: &UserId,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    review_gate(manuscript, reviewer)?;

    let entry = manuscript
        .reviewer_entry_mut(reviewer)
        .ok_or_else(|| WorkflowError::forbidden("you are not assigned to review this manuscript"))?;
    entry.status = InvitationStatus::Completed;
    entry.completed_at = Some(now);

    manuscript.record_event("Review submitted", reviewer, now);
    manuscript.updated_at = now;

    Ok(())
}
