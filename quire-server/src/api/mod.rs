//! The HTTP API.
//!
//! Every mutating operation follows the same shape: extract the caller's
//! identity, authorize through the guard, load the document, run the pure
//! workflow transition, persist, respond. Validation runs before any store
//! write, and a failed transition never persists partial side effects.

pub mod manuscripts;
pub mod reviews;
pub mod stats;
pub mod users;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tracing::warn;

use quire_core::user::UserStats;
use quire_core::{Manuscript, ManuscriptId, UserId};

use crate::error::ApiError;
use crate::store::Store;
use crate::AppState;

/// Assemble the API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(users::register))
        .route("/api/users/search", get(users::search))
        .route(
            "/api/manuscripts",
            post(manuscripts::create).get(manuscripts::list),
        )
        .route("/api/manuscripts/stats", get(stats::stats))
        .route("/api/manuscripts/:id", get(manuscripts::get))
        .route("/api/manuscripts/:id/submit", post(manuscripts::submit))
        .route("/api/manuscripts/:id/invite", post(manuscripts::invite))
        .route("/api/manuscripts/:id/respond", post(manuscripts::respond))
        .route("/api/manuscripts/:id/decision", post(manuscripts::decision))
        .route(
            "/api/manuscripts/:id/review",
            post(reviews::submit).get(reviews::fetch_own),
        )
        .route("/api/manuscripts/:id/reviews", get(reviews::list))
}

/// Minimal populated reference to a user, embedded in responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Load a manuscript or fail with `NotFound`.
pub(crate) async fn load_manuscript(
    store: &dyn Store,
    id: &ManuscriptId,
) -> Result<Manuscript, ApiError> {
    store
        .find_manuscript(id)
        .await?
        .ok_or_else(|| ApiError::not_found("manuscript not found"))
}

/// Populate a user reference, tolerating dangling ids (the referenced user
/// may have been created out-of-band).
pub(crate) async fn user_ref(store: &dyn Store, id: &UserId) -> Result<Option<UserRef>, ApiError> {
    Ok(store.find_user(id).await?.map(|user| UserRef {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

/// Best-effort update of a user's aggregate counters. Counter drift must
/// never fail the operation that caused it, so errors are only logged.
pub(crate) async fn bump_stats<F>(store: &dyn Store, id: &UserId, update: F)
where
    F: FnOnce(&mut UserStats),
{
    match store.find_user(id).await {
        Ok(Some(mut user)) => {
            update(&mut user.stats);
            user.updated_at = chrono::Utc::now();
            if let Err(err) = store.save_user(&user).await {
                warn!("failed to update stats for user {}: {}", id, err);
            }
        }
        Ok(None) => {}
        Err(err) => warn!("failed to load user {} for stats update: {}", id, err),
    }
}
