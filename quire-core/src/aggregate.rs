//! Review aggregation and decision support.
//!
//! The mean rating is a read-only decision aid for editors; the actual
//! editorial decision is always an independently entered value. This module
//! also owns the confidentiality partition: confidential comments leave the
//! system only in views built for editors.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::id::{ManuscriptId, ReviewId, UserId};
use crate::review::{Ratings, Recommendation, Review, ReviewStatus};
use crate::user::Role;

/// Aggregate over the submitted reviews of one manuscript.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewSummary {
    /// Number of reviews with submitted content.
    pub review_count: usize,
    /// Mean of the per-review rating means, if any review has been submitted.
    pub mean_rating: Option<f64>,
}

/// Summarize submitted reviews: each review's five ratings are averaged,
/// then the per-review means are averaged across reviews.
pub fn summarize(reviews: &[Review]) -> ReviewSummary {
    let means: Vec<f64> = reviews
        .iter()
        .filter(|r| matches!(r.status, ReviewStatus::Submitted | ReviewStatus::Completed))
        .filter_map(|r| r.content.as_ref())
        .map(|content| content.ratings.mean())
        .collect();

    let mean_rating = if means.is_empty() {
        None
    } else {
        Some(means.iter().sum::<f64>() / means.len() as f64)
    };

    ReviewSummary {
        review_count: means.len(),
        mean_rating,
    }
}

/// Comment fields as serialized for a particular audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCommentsView {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    /// Present only in editor-facing views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidential_comments: Option<String>,
}

/// Review content as serialized for a particular audience.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContentView {
    pub overall_recommendation: Recommendation,
    pub ratings: Ratings,
    pub mean_rating: f64,
    pub comments: ReviewCommentsView,
}

/// A review as serialized for a caller.
///
/// This is the read-serialization boundary the confidentiality partition is
/// enforced at: build views through [`ReviewView::for_audience`] and the
/// audience can never receive fields it must not see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub manuscript: ManuscriptId,
    pub reviewer: UserId,
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ReviewContentView>,
    pub rounds: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub deadline: DateTime<Utc>,
    pub is_late: bool,
}

impl ReviewView {
    /// Serialize `review` for its own author. The owner keeps their
    /// confidential comments (they wrote them and need them to revise);
    /// the partition bars the manuscript's authoring side, not the
    /// review's owner.
    pub fn for_owner(review: &Review, now: DateTime<Utc>) -> Self {
        Self::build(review, true, now)
    }

    /// Serialize `review` for a caller with `role`. Confidential comments
    /// are stripped for everyone but editors and admins.
    pub fn for_audience(review: &Review, role: Role, now: DateTime<Utc>) -> Self {
        Self::build(review, matches!(role, Role::Editor | Role::Admin), now)
    }

    fn build(review: &Review, editor_facing: bool, now: DateTime<Utc>) -> Self {
        let content = review.content.as_ref().map(|content| ReviewContentView {
            overall_recommendation: content.overall_recommendation,
            ratings: content.ratings,
            mean_rating: content.ratings.mean(),
            comments: ReviewCommentsView {
                strengths: content.comments.strengths.clone(),
                weaknesses: content.comments.weaknesses.clone(),
                suggestions: content.comments.suggestions.clone(),
                confidential_comments: if editor_facing {
                    content.comments.confidential_comments.clone()
                } else {
                    None
                },
            },
        });

        Self {
            id: review.id.clone(),
            manuscript: review.manuscript.clone(),
            reviewer: review.reviewer.clone(),
            status: review.status,
            content,
            rounds: review.revision_history.len() + 1,
            submitted_at: review.submitted_at,
            deadline: review.invitation.deadline,
            is_late: review.is_late(now),
        }
    }
}
