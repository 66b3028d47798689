//! Role-scoped dashboard statistics.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use quire_core::guard::{authorize, Action, Resource};
use quire_core::manuscript::InvitationStatus;
use quire_core::{ManuscriptStatus, Role};

use crate::error::ApiResult;
use crate::identity::Caller;
use crate::store::ManuscriptFilter;
use crate::AppState;

/// `GET /api/manuscripts/stats` — dashboard counters for the caller's role.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> ApiResult<Json<Value>> {
    authorize(&caller, Action::ViewStats, Resource::None)?;
    let store = state.store.as_ref();

    let stats = match caller.role {
        Role::Author => {
            let own = || ManuscriptFilter::submitted_by(caller.user.clone());
            json!({
                "totalSubmissions": store.count_manuscripts(&own()).await?,
                "underReview": store
                    .count_manuscripts(&own().with_status(ManuscriptStatus::UnderReview))
                    .await?,
                "accepted": store
                    .count_manuscripts(&own().with_status(ManuscriptStatus::Accepted))
                    .await?,
                "revisionRequired": store
                    .count_manuscripts(&own().with_status(ManuscriptStatus::RevisionRequired))
                    .await?,
                "rejected": store
                    .count_manuscripts(&own().with_status(ManuscriptStatus::Rejected))
                    .await?,
            })
        }
        Role::Reviewer => {
            let invited = ManuscriptFilter::reviewed_by(caller.user.clone());
            let mut pending = ManuscriptFilter::reviewed_by(caller.user.clone());
            pending.reviewer_status_in =
                vec![InvitationStatus::Invited, InvitationStatus::Accepted];
            let mut completed = ManuscriptFilter::reviewed_by(caller.user.clone());
            completed.reviewer_status_in = vec![InvitationStatus::Completed];

            json!({
                "totalReviews": store.count_manuscripts(&invited).await?,
                "pendingReviews": store.count_manuscripts(&pending).await?,
                "completedReviews": store.count_manuscripts(&completed).await?,
            })
        }
        Role::Editor => {
            let by_status = |status: ManuscriptStatus| {
                ManuscriptFilter::default().with_status(status)
            };
            let mut managed = ManuscriptFilter::default();
            managed.assigned_editor = Some(caller.user.clone());

            json!({
                "newSubmissions": store
                    .count_manuscripts(&by_status(ManuscriptStatus::Submitted))
                    .await?,
                "underReview": store
                    .count_manuscripts(&by_status(ManuscriptStatus::UnderReview))
                    .await?,
                "awaitingDecision": store
                    .count_manuscripts(&by_status(ManuscriptStatus::RevisionRequired))
                    .await?,
                "totalManaged": store.count_manuscripts(&managed).await?,
            })
        }
        // Admin dashboards are not part of the current workflow.
        Role::Admin => json!({}),
    };

    Ok(Json(json!({ "success": true, "stats": stats })))
}
