//! Registration and reviewer search.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::info;

use quire_core::guard::{authorize, Action, Resource};
use quire_core::user::{Profile, UserStats};
use quire_core::validate::{validate_registration, RegisterRequest};
use quire_core::{Role, User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::identity::Caller;
use crate::store::UserSearch;
use crate::AppState;

/// Salted SHA-256 credential digest, stored as `salt$hex`.
///
/// Real credential policy (rotation, lockout, session issuance) belongs to
/// the external auth provider; the tracker only keeps what registration
/// produced and never returns it.
fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    format!("{}${}", salt, hex::encode(hasher.finalize()))
}

/// `POST /api/auth/register` — open to unauthenticated callers.
/// Role defaults to author; admin is never self-assignable here.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate_registration(&payload)?;

    let email = payload.email.trim().to_lowercase();
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("a user with this email already exists"));
    }

    let now = chrono::Utc::now();
    let user = User {
        id: UserId::generate(),
        email,
        name: payload.name.trim().to_string(),
        password_hash: hash_password(&payload.password),
        role: payload.role.unwrap_or_default(),
        profile: Profile::default(),
        stats: UserStats::default(),
        created_at: now,
        updated_at: now,
    };
    state.store.create_user(user.clone()).await?;
    info!("registered {} as {}", user.id, user.role);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": {
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "role": user.role,
            },
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub expertise: Option<String>,
    pub role: Option<Role>,
    pub limit: Option<usize>,
}

/// `GET /api/users/search` — editor-only reviewer lookup.
pub async fn search(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    authorize(&caller, Action::SearchReviewers, Resource::None)?;

    let search = UserSearch {
        query: params.query.filter(|q| !q.is_empty()),
        expertise: params.expertise.filter(|e| !e.is_empty()),
        role: params.role.unwrap_or(Role::Reviewer),
        limit: params.limit.unwrap_or(20),
    };
    let users = state.store.search_users(&search).await?;

    let cards: Vec<Value> = users
        .into_iter()
        .map(|user| {
            json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "affiliation": user.profile.affiliation,
                "expertise": user.profile.expertise,
                "orcid": user.profile.orcid,
                "reviewsCompleted": user.stats.reviews,
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "users": cards })))
}
