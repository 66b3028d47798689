//! Manuscript lifecycle endpoints: creation, listing, reads, reviewer
//! invitations, invitation responses and editorial decisions.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use quire_core::guard::{authorize, Action, Resource};
use quire_core::manuscript::{FileRef, FileSet};
use quire_core::validate::{ManuscriptSubmission, SubmissionIntent};
use quire_core::workflow::{self, DecisionRequest, InvitationResponse, Invitee};
use quire_core::{ManuscriptId, ManuscriptStatus, Role, UserId};

use crate::error::ApiResult;
use crate::identity::Caller;
use crate::store::{ManuscriptFilter, Page};
use crate::AppState;

use super::{bump_stats, load_manuscript, user_ref};

/// A blob descriptor as the upload pipeline reports it. The blob store is
/// external; only metadata crosses this API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
}

impl FilePayload {
    fn into_file_ref(self, now: DateTime<Utc>) -> FileRef {
        FileRef {
            filename: self.filename,
            url: self.url,
            size: self.size,
            mime_type: self.mime_type,
            uploaded_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesPayload {
    pub manuscript: Option<FilePayload>,
    pub cover_letter: Option<FilePayload>,
    #[serde(default)]
    pub supplementary: Vec<FilePayload>,
}

impl FilesPayload {
    fn into_file_set(self, now: DateTime<Utc>) -> FileSet {
        FileSet {
            manuscript: self.manuscript.map(|f| f.into_file_ref(now)),
            cover_letter: self.cover_letter.map(|f| f.into_file_ref(now)),
            supplementary: self
                .supplementary
                .into_iter()
                .map(|f| f.into_file_ref(now))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateManuscriptRequest {
    #[serde(flatten)]
    pub payload: ManuscriptSubmission,
    #[serde(default)]
    pub files: FilesPayload,
}

/// `POST /api/manuscripts` — create a draft or submit directly.
pub async fn create(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(request): Json<CreateManuscriptRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let action = match request.payload.status {
        SubmissionIntent::Draft => Action::SaveDraft,
        SubmissionIntent::Submitted => Action::SubmitManuscript,
    };
    authorize(&caller, action, Resource::None)?;

    let now = Utc::now();
    let files = request.files.into_file_set(now);
    let manuscript = workflow::create(request.payload, files, &caller.user, now)?;
    state.store.create_manuscript(manuscript.clone()).await?;

    let message = match manuscript.status {
        ManuscriptStatus::Draft => "Draft saved successfully",
        _ => "Manuscript submitted successfully",
    };
    if manuscript.status == ManuscriptStatus::Submitted {
        bump_stats(state.store.as_ref(), &caller.user, |stats| {
            stats.submissions += 1;
        })
        .await;
    }
    info!(
        "manuscript {} created by {} with status {}",
        manuscript.id, caller.user, manuscript.status
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message,
            "manuscript": {
                "id": manuscript.id,
                "title": manuscript.title,
                "status": manuscript.status,
            },
        })),
    ))
}

/// `POST /api/manuscripts/:id/submit` — submit an existing draft.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Json<Value>> {
    let mut manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(&caller, Action::SubmitManuscript, Resource::Manuscript(&manuscript))?;

    workflow::submit(&mut manuscript, &caller.user, Utc::now())?;
    state.store.save_manuscript(&manuscript).await?;
    bump_stats(state.store.as_ref(), &caller.user, |stats| {
        stats.submissions += 1;
    })
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Manuscript submitted successfully",
        "manuscript": {
            "id": manuscript.id,
            "title": manuscript.title,
            "status": manuscript.status,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<ManuscriptStatus>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

/// `GET /api/manuscripts` — role-scoped listing.
///
/// Authors see their own manuscripts, reviewers the ones they are invited
/// to, editors the non-draft review queue. Admin sees everything.
pub async fn list(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    authorize(&caller, Action::ListManuscripts, Resource::None)?;

    let mut filter = ManuscriptFilter::default();
    match caller.role {
        Role::Author => filter.submitted_by = Some(caller.user.clone()),
        Role::Reviewer => filter.reviewer = Some(caller.user.clone()),
        Role::Editor => {
            filter.status_in = vec![
                ManuscriptStatus::Submitted,
                ManuscriptStatus::UnderReview,
                ManuscriptStatus::RevisionRequired,
            ]
        }
        Role::Admin => {}
    }
    if let Some(status) = params.status {
        filter.status = Some(status);
        filter.status_in.clear();
    }

    let page = Page {
        limit: params.limit.unwrap_or(10),
        skip: params.skip.unwrap_or(0),
    };
    let manuscripts = state.store.find_manuscripts(&filter, page).await?;
    let total = state.store.count_manuscripts(&filter).await?;

    let mut summaries = Vec::with_capacity(manuscripts.len());
    for manuscript in &manuscripts {
        let submitted_by = user_ref(state.store.as_ref(), &manuscript.submitted_by).await?;
        summaries.push(json!({
            "id": manuscript.id,
            "title": manuscript.title,
            "abstract": manuscript.abstract_text,
            "status": manuscript.status,
            "manuscriptType": manuscript.manuscript_type,
            "keywords": manuscript.keywords,
            "authors": manuscript.authors,
            "submittedBy": submitted_by,
            "createdAt": manuscript.created_at,
            "updatedAt": manuscript.updated_at,
        }));
    }

    Ok(Json(json!({
        "success": true,
        "manuscripts": summaries,
        "pagination": {
            "total": total,
            "limit": page.limit,
            "skip": page.skip,
            "hasMore": total > (page.skip + page.limit) as u64,
        },
    })))
}

/// `GET /api/manuscripts/:id` — role/ownership-gated read with populated
/// participant references.
pub async fn get(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
) -> ApiResult<Json<Value>> {
    let manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(&caller, Action::ReadManuscript, Resource::Manuscript(&manuscript))?;

    let submitted_by = user_ref(state.store.as_ref(), &manuscript.submitted_by).await?;
    let assigned_editor = match &manuscript.assigned_editor {
        Some(editor) => user_ref(state.store.as_ref(), editor).await?,
        None => None,
    };
    let mut reviewer_users = Vec::with_capacity(manuscript.reviewers.len());
    for entry in &manuscript.reviewers {
        if let Some(user) = user_ref(state.store.as_ref(), &entry.user).await? {
            reviewer_users.push(user);
        }
    }

    Ok(Json(json!({
        "success": true,
        "manuscript": manuscript,
        "participants": {
            "submittedBy": submitted_by,
            "assignedEditor": assigned_editor,
            "reviewers": reviewer_users,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteeRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub reviewers: Vec<InviteeRequest>,
}

/// `POST /api/manuscripts/:id/invite` — editor invites a reviewer batch.
pub async fn invite(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<InviteRequest>,
) -> ApiResult<Json<Value>> {
    let mut manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(&caller, Action::InviteReviewers, Resource::Manuscript(&manuscript))?;

    let invitees: Vec<Invitee> = request
        .reviewers
        .into_iter()
        .map(|r| Invitee {
            user: r.user_id,
            deadline: r.deadline,
        })
        .collect();

    let outcome = workflow::invite(&mut manuscript, &invitees, &caller.user, Utc::now())?;
    state.store.save_manuscript(&manuscript).await?;
    info!(
        "{} invited {} reviewer(s) to manuscript {}; status {}",
        caller.user, outcome.invited, manuscript.id, outcome.status
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully invited {} reviewer(s)", outcome.invited),
        "manuscript": manuscript,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: InvitationResponse,
}

/// `POST /api/manuscripts/:id/respond` — reviewer accepts or declines.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<RespondRequest>,
) -> ApiResult<Json<Value>> {
    let mut manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(
        &caller,
        Action::RespondToInvitation,
        Resource::Manuscript(&manuscript),
    )?;

    workflow::respond(&mut manuscript, &caller.user, request.action, Utc::now())?;
    state.store.save_manuscript(&manuscript).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully {} the review invitation", request.action),
    })))
}

/// `POST /api/manuscripts/:id/decision` — editorial decision.
pub async fn decision(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<ManuscriptId>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<Value>> {
    // Payload problems are caught before the document is even loaded.
    workflow::validate_decision(&request)?;

    let mut manuscript = load_manuscript(state.store.as_ref(), &id).await?;
    authorize(&caller, Action::RecordDecision, Resource::Manuscript(&manuscript))?;

    workflow::decide(&mut manuscript, &caller.user, &request, Utc::now())?;
    state.store.save_manuscript(&manuscript).await?;
    info!(
        "editorial decision {} on manuscript {} by {}",
        request.decision, manuscript.id, caller.user
    );

    Ok(Json(json!({
        "success": true,
        "message": "Editorial decision submitted successfully",
        "manuscript": manuscript,
    })))
}
