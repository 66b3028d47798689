//! The manuscript aggregate.
//!
//! A manuscript moves through the review lifecycle along the edges enforced
//! by the `workflow` module; this module defines the document itself and the
//! structurally append-only logs (timeline, editorial decisions) that record
//! what happened to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{ManuscriptId, ReviewId, UserId};

/// Lifecycle position of a manuscript.
///
/// Valid edges: `draft -> submitted -> under_review ->
/// {revision_required | accepted | rejected}`; `revision_required` cycles
/// back to `under_review` when reviewers are re-invited; `accepted ->
/// published` is a manual administrative step. `rejected` and `published`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManuscriptStatus {
    Draft,
    Submitted,
    UnderReview,
    RevisionRequired,
    Accepted,
    Rejected,
    Published,
}

impl ManuscriptStatus {
    /// Returns true if no further workflow transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Published)
    }

    /// Returns true if an editorial decision may be recorded in this status.
    pub fn accepts_decision(self) -> bool {
        matches!(self, Self::UnderReview | Self::RevisionRequired)
    }

    /// Returns true if reviewer invitations promote this status to
    /// `under_review`.
    pub fn promotes_on_invitation(self) -> bool {
        matches!(self, Self::Submitted | Self::RevisionRequired)
    }
}

impl fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::RevisionRequired => "revision_required",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Published => "published",
        };
        write!(f, "{}", s)
    }
}

/// Kind of submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManuscriptType {
    Research,
    Review,
    CaseStudy,
    ShortCommunication,
}

/// An author on the byline. Not necessarily a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub corresponding: bool,
}

/// Opaque descriptor of an uploaded blob. The blob store owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The manuscript's current file set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manuscript: Option<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<FileRef>,
    #[serde(default)]
    pub supplementary: Vec<FileRef>,
}

/// Snapshot of the file set taken at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: u32,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manuscript: Option<FileRef>,
    #[serde(default)]
    pub supplementary: Vec<FileRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
}

/// One audit-trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event: String,
    pub actor: UserId,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Append-only audit trail. Exposes `append` and read access only, so the
/// no-retroactive-mutation invariant holds structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline(Vec<TimelineEvent>);

impl Timeline {
    pub fn append(&mut self, event: TimelineEvent) {
        self.0.push(event);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&TimelineEvent> {
        self.0.last()
    }
}

/// Sub-state of one reviewer's relationship to one manuscript.
///
/// `invited -> accepted -> completed`, or `invited -> declined` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Invited,
    Accepted,
    Declined,
    Completed,
}

impl InvitationStatus {
    /// Returns true once the reviewer has responded (or finished).
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Invited)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Invited => "invited",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// One reviewer's entry on a manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerEntry {
    pub user: UserId,
    pub status: InvitationStatus,
    pub invited_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Internal, normalized spelling of a decision in the decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Accept,
    Reject,
    Revision,
}

/// One immutable entry in the editorial decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorialDecision {
    pub editor: UserId,
    pub decision: DecisionKind,
    pub comments: String,
    pub date: DateTime<Utc>,
}

/// Append-only log of editorial decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionLog(Vec<EditorialDecision>);

impl DecisionLog {
    pub fn append(&mut self, decision: EditorialDecision) {
        self.0.push(decision);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditorialDecision> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&EditorialDecision> {
        self.0.last()
    }
}

/// Author-supplied reviewer suggestion. Free text, never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedReviewer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expertise: Option<String>,
}

/// Read counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub views: u32,
    #[serde(default)]
    pub downloads: u32,
}

/// Publication metadata, populated only after acceptance/publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
}

/// The central aggregate: a submitted work tracked through review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: ManuscriptId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub authors: Vec<Author>,
    pub submitted_by: UserId,
    pub status: ManuscriptStatus,
    pub manuscript_type: ManuscriptType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub files: FileSet,
    #[serde(default)]
    pub versions: Vec<Version>,
    pub current_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_editor: Option<UserId>,
    #[serde(default)]
    pub reviewers: Vec<ReviewerEntry>,
    #[serde(default)]
    pub suggested_reviewers: Vec<SuggestedReviewer>,
    #[serde(default)]
    pub reviews: Vec<ReviewId>,
    #[serde(default)]
    pub editorial_decisions: DecisionLog,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub publication: PublicationInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manuscript {
    /// Returns the reviewer entry for a user, if invited.
    pub fn reviewer_entry(&self, user: &UserId) -> Option<&ReviewerEntry> {
        self.reviewers.iter().find(|r| &r.user == user)
    }

    pub fn reviewer_entry_mut(&mut self, user: &UserId) -> Option<&mut ReviewerEntry> {
        self.reviewers.iter_mut().find(|r| &r.user == user)
    }

    pub fn has_reviewer(&self, user: &UserId) -> bool {
        self.reviewer_entry(user).is_some()
    }

    /// Append an audit event attributed to `actor`.
    pub fn record_event(&mut self, event: impl Into<String>, actor: &UserId, now: DateTime<Utc>) {
        self.timeline.append(TimelineEvent {
            event: event.into(),
            actor: actor.clone(),
            date: now,
            metadata: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!ManuscriptStatus::Draft.is_terminal());
        assert!(!ManuscriptStatus::Accepted.is_terminal());
        assert!(ManuscriptStatus::Rejected.is_terminal());
        assert!(ManuscriptStatus::Published.is_terminal());
    }

    #[test]
    fn test_status_accepts_decision() {
        assert!(ManuscriptStatus::UnderReview.accepts_decision());
        assert!(ManuscriptStatus::RevisionRequired.accepts_decision());
        assert!(!ManuscriptStatus::Draft.accepts_decision());
        assert!(!ManuscriptStatus::Submitted.accepts_decision());
        assert!(!ManuscriptStatus::Accepted.accepts_decision());
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&ManuscriptStatus::UnderReview).unwrap(),
            "\"under_review\""
        );
        assert_eq!(
            serde_json::to_string(&ManuscriptType::CaseStudy).unwrap(),
            "\"case-study\""
        );
    }

    #[test]
    fn test_timeline_is_append_only_surface() {
        let mut timeline = Timeline::default();
        assert!(timeline.is_empty());
        timeline.append(TimelineEvent {
            event: "Manuscript submitted".into(),
            actor: UserId::from("u1"),
            date: Utc::now(),
            metadata: None,
        });
        timeline.append(TimelineEvent {
            event: "2 reviewer(s) invited".into(),
            actor: UserId::from("u2"),
            date: Utc::now(),
            metadata: None,
        });
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.last().unwrap().event, "2 reviewer(s) invited");
    }

    #[test]
    fn test_invitation_status_resolution() {
        assert!(!InvitationStatus::Invited.is_resolved());
        assert!(InvitationStatus::Accepted.is_resolved());
        assert!(InvitationStatus::Declined.is_resolved());
        assert!(InvitationStatus::Completed.is_resolved());
    }
}
