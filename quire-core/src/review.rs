//! Review documents.
//!
//! One (manuscript, reviewer) pair maps to at most one review. Resubmission
//! never loses history: the previous content moves into the revision log
//! with the next sequential version number, and `content` always reflects
//! the latest submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ManuscriptId, ReviewId, UserId};
use crate::manuscript::InvitationStatus;

/// Reviewer's overall recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
}

/// The five structured 1-5 ratings every review carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub originality: u8,
    pub methodology: u8,
    pub clarity: u8,
    pub significance: u8,
    pub references: u8,
}

impl Ratings {
    pub fn as_array(&self) -> [u8; 5] {
        [
            self.originality,
            self.methodology,
            self.clarity,
            self.significance,
            self.references,
        ]
    }

    /// Mean of the five ratings.
    pub fn mean(&self) -> f64 {
        let sum: u32 = self.as_array().iter().map(|&r| u32::from(r)).sum();
        f64::from(sum) / 5.0
    }
}

/// Textual comment fields. `confidential_comments` is editor-only on read;
/// the partition is enforced where reviews are serialized for a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComments {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidential_comments: Option<String>,
}

/// The substantive body of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewContent {
    pub overall_recommendation: Recommendation,
    pub ratings: Ratings,
    pub comments: ReviewComments,
}

/// A superseded submission, retained verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub version: u32,
    pub submitted_at: DateTime<Utc>,
    pub content: ReviewContent,
}

/// Append-only history of superseded review content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionHistory(Vec<RevisionRecord>);

impl RevisionHistory {
    /// The version number the next appended record must carry.
    /// Versions are sequential from 1; never reused, never skipped.
    pub fn next_version(&self) -> u32 {
        self.0.last().map(|r| r.version + 1).unwrap_or(1)
    }

    pub fn append(&mut self, record: RevisionRecord) {
        debug_assert_eq!(record.version, self.next_version());
        self.0.push(record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RevisionRecord> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&RevisionRecord> {
        self.0.last()
    }
}

/// Top-level review lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Invited,
    InProgress,
    Submitted,
    Completed,
}

/// Invitation metadata snapshotted onto the review document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInvitation {
    pub sent_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: InvitationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

/// A reviewer's structured report on one manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub manuscript: ManuscriptId,
    pub reviewer: UserId,
    pub invitation: ReviewInvitation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ReviewContent>,
    #[serde(default)]
    pub revision_history: RevisionHistory,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// First submission for a (manuscript, reviewer) pair with no prior
    /// review document. Round 1; history stays empty until a resubmission.
    pub fn first_submission(
        manuscript: ManuscriptId,
        reviewer: UserId,
        invitation: ReviewInvitation,
        content: ReviewContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewId::generate(),
            manuscript,
            reviewer,
            invitation,
            content: Some(content),
            revision_history: RevisionHistory::default(),
            status: ReviewStatus::Completed,
            submitted_at: Some(now),
            completed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Resubmission: the previous content moves into the revision log with
    /// the next sequential version, and the new content takes its place.
    pub fn resubmit(&mut self, content: ReviewContent, now: DateTime<Utc>) {
        if let Some(previous) = self.content.take() {
            let version = self.revision_history.next_version();
            self.revision_history.append(RevisionRecord {
                version,
                submitted_at: self.submitted_at.unwrap_or(self.updated_at),
                content: previous,
            });
        }
        self.content = Some(content);
        self.status = ReviewStatus::Completed;
        self.submitted_at = Some(now);
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Whether the review is past its deadline. Derived, never stored:
    /// a submitted or completed review is never late.
    pub fn is_late(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            ReviewStatus::Submitted | ReviewStatus::Completed => false,
            ReviewStatus::Invited | ReviewStatus::InProgress => now > self.invitation.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn content(recommendation: Recommendation, strengths: &str) -> ReviewContent {
        ReviewContent {
            overall_recommendation: recommendation,
            ratings: Ratings {
                originality: 4,
                methodology: 3,
                clarity: 5,
                significance: 4,
                references: 3,
            },
            comments: ReviewComments {
                strengths: strengths.to_string(),
                weaknesses: "w".repeat(60),
                suggestions: "s".repeat(60),
                confidential_comments: None,
            },
        }
    }

    fn invitation(now: DateTime<Utc>) -> ReviewInvitation {
        ReviewInvitation {
            sent_at: now,
            deadline: now + Duration::days(14),
            status: InvitationStatus::Accepted,
            responded_at: Some(now),
        }
    }

    #[test]
    fn test_ratings_mean() {
        let ratings = Ratings {
            originality: 5,
            methodology: 4,
            clarity: 3,
            significance: 4,
            references: 4,
        };
        assert!((ratings.mean() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_submission_has_empty_history() {
        let now = Utc::now();
        let review = Review::first_submission(
            ManuscriptId::from("m1"),
            UserId::from("r1"),
            invitation(now),
            content(Recommendation::Accept, &"a".repeat(60)),
            now,
        );
        assert!(review.revision_history.is_empty());
        assert_eq!(review.status, ReviewStatus::Completed);
        assert_eq!(review.submitted_at, Some(now));
    }

    #[test]
    fn test_resubmit_appends_exactly_one_revision_with_next_version() {
        let now = Utc::now();
        let first = content(Recommendation::MajorRevision, &"first".repeat(12));
        let mut review = Review::first_submission(
            ManuscriptId::from("m1"),
            UserId::from("r1"),
            invitation(now),
            first.clone(),
            now,
        );

        let later = now + Duration::days(3);
        let second = content(Recommendation::MinorRevision, &"second".repeat(10));
        review.resubmit(second.clone(), later);

        assert_eq!(review.revision_history.len(), 1);
        let archived = review.revision_history.last().unwrap();
        assert_eq!(archived.version, 1);
        assert_eq!(archived.content, first);
        assert_eq!(review.content.as_ref(), Some(&second));
        assert_eq!(review.submitted_at, Some(later));

        // A third submission gets version 2, never reusing or skipping.
        let third = content(Recommendation::Accept, &"third".repeat(12));
        review.resubmit(third.clone(), later + Duration::days(1));
        assert_eq!(review.revision_history.len(), 2);
        assert_eq!(review.revision_history.last().unwrap().version, 2);
        assert_eq!(review.revision_history.last().unwrap().content, second);
        assert_eq!(review.content, Some(third));
    }

    #[test]
    fn test_is_late_is_derived_from_deadline_and_status() {
        let now = Utc::now();
        let mut review = Review::first_submission(
            ManuscriptId::from("m1"),
            UserId::from("r1"),
            invitation(now),
            content(Recommendation::Accept, &"a".repeat(60)),
            now,
        );

        // Completed reviews are never late, even past the deadline.
        assert!(!review.is_late(now + Duration::days(30)));

        review.status = ReviewStatus::InProgress;
        assert!(!review.is_late(now + Duration::days(13)));
        assert!(review.is_late(now + Duration::days(15)));
    }
}
