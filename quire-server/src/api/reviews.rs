//! Review submission and reads.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use quire_core::aggregate::{summarize, ReviewView};
use quire_core::guard::{authorize, Action, Resource};
use quire_core::review::{Review, ReviewInvitation};
use quire_core::validate::{validate_review, ReviewSubmission};
use quire_core::workflow;
use quire_core::ManuscriptId;

use crate::error::ApiResult;
use crate::identity::Caller;
use crate::AppState;

use super::{bump_stats, load_manuscript, user_ref};

/// `POST /api/manuscripts/:id/review` — submit (or resubmit) a review.
///
/// Ordering matters for the no-orphans invariant: the gate runs first, the
/// review document is persisted next, and only then does the reviewer entry
/// advance to `completed`. A failed review write leaves the entry untouched.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
    Json(payload): Json<ReviewSubmission>,
) -> ApiResult<Json<Value>> {
    validate_review(&payload)?;

    let mut manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(&caller, Action::SubmitReview, Resource::Manuscript(&manuscript))?;

    let invitation = {
        let entry = workflow::review_gate(&manuscript, &caller.user)?;
        ReviewInvitation {
            sent_at: entry.invited_at,
            deadline: entry.deadline,
            status: entry.status,
            responded_at: entry.responded_at,
        }
    };

    let now = Utc::now();
    let content = payload.into_content();
    let first_submission = match state.store.find_review(&manuscript.id, &caller.user).await? {
        Some(mut review) => {
            review.resubmit(content, now);
            state.store.save_review(&review).await?;
            false
        }
        None => {
            let review = Review::first_submission(
                manuscript.id.clone(),
                caller.user.clone(),
                invitation,
                content,
                now,
            );
            state.store.create_review(review.clone()).await?;
            manuscript.reviews.push(review.id);
            true
        }
    };

    workflow::complete(&mut manuscript, &caller.user, now)?;
    state.store.save_manuscript(&manuscript).await?;
    if first_submission {
        bump_stats(state.store.as_ref(), &caller.user, |stats| {
            stats.reviews += 1;
        })
        .await;
    }
    info!("review submitted for manuscript {} by {}", manuscript.id, caller.user);

    Ok(Json(json!({
        "success": true,
        "message": "Review submitted successfully",
    })))
}

/// `GET /api/manuscripts/:id/review` — a reviewer's own review, if any.
pub async fn fetch_own(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Json<Value>> {
    let manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(&caller, Action::ReadOwnReview, Resource::Manuscript(&manuscript))?;

    let review = state.store.find_review(&manuscript.id, &caller.user).await?;
    let view = review.map(|r| ReviewView::for_owner(&r, Utc::now()));

    Ok(Json(json!({ "success": true, "review": view })))
}

/// `GET /api/manuscripts/:id/reviews` — editor view of all reviews plus
/// the mean-rating decision aid.
pub async fn list(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Json<Value>> {
    authorize(&caller, Action::ListReviews, Resource::None)?;
    let manuscript = load_manuscript(state.store.as_ref(), &id).await?;

    let reviews = state
        .store
        .find_reviews_for_manuscript(&manuscript.id)
        .await?;
    let summary = summarize(&reviews);

    let now = Utc::now();
    let mut items = Vec::with_capacity(reviews.len());
    for review in &reviews {
        let reviewer = user_ref(state.store.as_ref(), &review.reviewer).await?;
        items.push(json!({
            "review": ReviewView::for_audience(review, caller.role, now),
            "reviewer": reviewer,
        }));
    }

    Ok(Json(json!({
        "success": true,
        "reviews": items,
        "summary": {
            "reviewCount": summary.review_count,
            "meanRating": summary.mean_rating,
        },
    })))
}
