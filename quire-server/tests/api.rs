//! End-to-end API tests over the in-memory store.
//!
//! These drive the full request path: identity extraction, the guard, the
//! workflow transitions and persistence, asserting on the wire-visible
//! behavior only.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use quire_server::api::api_router;
use quire_server::identity::{ROLE_HEADER, USER_HEADER};
use quire_server::store::InMemoryStore;
use quire_server::AppState;

fn app() -> Router {
    let store = Arc::new(InMemoryStore::new());
    Router::new()
        .merge(api_router())
        .with_state(Arc::new(AppState::new(store)))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    identity: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user, role)) = identity {
        builder = builder.header(USER_HEADER, user).header(ROLE_HEADER, role);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request build");

    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn register(app: &Router, name: &str, email: &str, role: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "correct-horse-battery",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {}: {}", email, body);
    body["user"]["id"].as_str().expect("user id").to_string()
}

fn manuscript_payload(status: &str) -> Value {
    json!({
        "title": "Convergence of adaptive spectral schemes",
        "abstract": "b".repeat(200),
        "manuscriptType": "research",
        "authors": [
            {"name": "Ada Lovelace", "email": "ada@example.org", "corresponding": true}
        ],
        "keywords": ["spectral methods"],
        "status": status,
        "files": {
            "manuscript": {
                "filename": "main.pdf",
                "url": "/uploads/main.pdf",
                "size": 4096,
                "mimeType": "application/pdf"
            }
        }
    })
}

fn review_payload(strengths_len: usize, confidential: Option<&str>) -> Value {
    json!({
        "overallRecommendation": "minor_revision",
        "ratings": {
            "originality": 4,
            "methodology": 4,
            "clarity": 3,
            "significance": 4,
            "references": 5
        },
        "comments": {
            "strengths": "s".repeat(strengths_len),
            "weaknesses": "w".repeat(60),
            "suggestions": "g".repeat(60),
            "confidentialComments": confidential,
        }
    })
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/manuscripts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("UNAUTHORIZED"));
}

#[tokio::test]
async fn test_registration_rejects_admin_and_duplicates() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Mallory",
            "email": "mallory@example.org",
            "password": "longenough",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], json!("VALIDATION_FAILED"));

    register(&app, "Alice", "alice@example.org", "author").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Alice Again",
            "email": "ALICE@example.org",
            "password": "longenough",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn test_draft_without_corresponding_author_fails_validation() {
    let app = app();
    register(&app, "Alice", "alice@example.org", "author").await;

    let mut payload = manuscript_payload("draft");
    payload["authors"] = json!([
        {"name": "First Author", "email": "first@example.org", "corresponding": false},
        {"name": "Second Author", "email": "second@example.org", "corresponding": false}
    ]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/manuscripts",
        Some(("alice", "author")),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    let details = body["details"].as_array().expect("details");
    assert!(details.iter().any(|d| d["field"] == json!("authors")));
}

#[tokio::test]
async fn test_full_review_lifecycle() {
    let app = app();
    let author = register(&app, "Alice Author", "alice@example.org", "author").await;
    register(&app, "Ed Editor", "ed@example.org", "editor").await;
    let rita = register(&app, "Rita Reviewer", "rita@example.org", "reviewer").await;
    let sam = register(&app, "Sam Reviewer", "sam@example.org", "reviewer").await;
    let author_id = (author.as_str(), "author");

    // Author submits directly: status submitted, one version snapshot.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/manuscripts",
        Some(author_id),
        Some(manuscript_payload("submitted")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["manuscript"]["status"], json!("submitted"));
    let manuscript_id = body["manuscript"]["id"].as_str().expect("id").to_string();

    let detail_uri = format!("/api/manuscripts/{}", manuscript_id);
    let (status, body) = send(&app, Method::GET, &detail_uri, Some(author_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["manuscript"]["versions"].as_array().unwrap().len(), 1);
    let timeline_len = body["manuscript"]["timeline"].as_array().unwrap().len();
    assert_eq!(timeline_len, 1);

    // Another author cannot read it.
    let (status, _) = send(&app, Method::GET, &detail_uri, Some(("bob", "author")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A reviewer cannot invite.
    let invite_uri = format!("/api/manuscripts/{}/invite", manuscript_id);
    let (status, _) = send(
        &app,
        Method::POST,
        &invite_uri,
        Some((rita.as_str(), "reviewer")),
        Some(json!({"reviewers": [{"userId": rita}]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Editor invites both reviewers: manuscript moves under review.
    let (status, body) = send(
        &app,
        Method::POST,
        &invite_uri,
        Some(("ed", "editor")),
        Some(json!({"reviewers": [{"userId": rita}, {"userId": sam}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["manuscript"]["status"], json!("under_review"));
    assert_eq!(body["manuscript"]["reviewers"].as_array().unwrap().len(), 2);

    // Re-inviting only already-invited reviewers is a conflict.
    let (status, body) = send(
        &app,
        Method::POST,
        &invite_uri,
        Some(("ed", "editor")),
        Some(json!({"reviewers": [{"userId": rita}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    // Rita accepts, Sam declines.
    let respond_uri = format!("/api/manuscripts/{}/respond", manuscript_id);
    let (status, _) = send(
        &app,
        Method::POST,
        &respond_uri,
        Some((rita.as_str(), "reviewer")),
        Some(json!({"action": "accept"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::POST,
        &respond_uri,
        Some((sam.as_str(), "reviewer")),
        Some(json!({"action": "decline"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Sam cannot change his mind.
    let (status, body) = send(
        &app,
        Method::POST,
        &respond_uri,
        Some((sam.as_str(), "reviewer")),
        Some(json!({"action": "accept"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("declined"));

    // Sam declined, so he cannot submit a review.
    let review_uri = format!("/api/manuscripts/{}/review", manuscript_id);
    let (status, _) = send(
        &app,
        Method::POST,
        &review_uri,
        Some((sam.as_str(), "reviewer")),
        Some(review_payload(60, None)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Rita's 40-character strengths fail validation before anything persists.
    let (status, body) = send(
        &app,
        Method::POST,
        &review_uri,
        Some((rita.as_str(), "reviewer")),
        Some(review_payload(40, None)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    // A decision before any review state is still allowed by the state
    // machine (under_review), but a decision payload without a revision
    // type is not.
    let decision_uri = format!("/api/manuscripts/{}/decision", manuscript_id);
    let (status, body) = send(
        &app,
        Method::POST,
        &decision_uri,
        Some(("ed", "editor")),
        Some(json!({"decision": "revision_required", "feedback": "f".repeat(80)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    // Rita submits a valid review with confidential comments.
    let (status, body) = send(
        &app,
        Method::POST,
        &review_uri,
        Some((rita.as_str(), "reviewer")),
        Some(review_payload(60, Some("methods section needs scrutiny"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    // Her entry is completed; a second submission needs re-acceptance.
    let (status, _) = send(
        &app,
        Method::POST,
        &review_uri,
        Some((rita.as_str(), "reviewer")),
        Some(review_payload(70, None)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Rita sees her own review, confidential comments included.
    let (status, body) = send(
        &app,
        Method::GET,
        &review_uri,
        Some((rita.as_str(), "reviewer")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["review"]["content"]["comments"]["confidentialComments"],
        json!("methods section needs scrutiny")
    );

    // Editor's listing carries the aggregate and the confidential text.
    let reviews_uri = format!("/api/manuscripts/{}/reviews", manuscript_id);
    let (status, body) = send(&app, Method::GET, &reviews_uri, Some(("ed", "editor")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["reviewCount"], json!(1));
    assert_eq!(body["summary"]["meanRating"], json!(4.0));
    assert_eq!(
        body["reviews"][0]["review"]["content"]["comments"]["confidentialComments"],
        json!("methods section needs scrutiny")
    );

    // Valid revision decision: status changes, decision logged, editor
    // assigned.
    let (status, body) = send(
        &app,
        Method::POST,
        &decision_uri,
        Some(("ed", "editor")),
        Some(json!({
            "decision": "revision_required",
            "feedback": "f".repeat(80),
            "revisionType": "major",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["manuscript"]["status"], json!("revision_required"));
    assert_eq!(
        body["manuscript"]["editorial_decisions"].as_array().unwrap().len(),
        1
    );
    assert!(body["manuscript"]["assigned_editor"].is_string());

    // A second decision on revision_required is allowed; on the resulting
    // accepted manuscript it is not.
    let (status, body) = send(
        &app,
        Method::POST,
        &decision_uri,
        Some(("ed", "editor")),
        Some(json!({"decision": "accepted", "feedback": "f".repeat(80)})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let (status, _) = send(
        &app,
        Method::POST,
        &decision_uri,
        Some(("ed", "editor")),
        Some(json!({"decision": "rejected", "feedback": "f".repeat(80)})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_draft_lifecycle_and_editor_visibility() {
    let app = app();
    let author = register(&app, "Alice", "alice@example.org", "author").await;
    register(&app, "Ed", "ed@example.org", "editor").await;
    let author_id = (author.as_str(), "author");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/manuscripts",
        Some(author_id),
        Some(manuscript_payload("draft")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["manuscript"]["status"], json!("draft"));
    let id = body["manuscript"]["id"].as_str().unwrap().to_string();

    // Editors never see drafts.
    let detail_uri = format!("/api/manuscripts/{}", id);
    let (status, _) = send(&app, Method::GET, &detail_uri, Some(("ed", "editor")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Inviting reviewers to a draft is a conflict.
    let invite_uri = format!("/api/manuscripts/{}/invite", id);
    let (status, _) = send(
        &app,
        Method::POST,
        &invite_uri,
        Some(("ed", "editor")),
        Some(json!({"reviewers": [{"userId": "someone"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The author submits the draft; the timeline grows by exactly one.
    let (status, body) = send(&app, Method::GET, &detail_uri, Some(author_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let before = body["manuscript"]["timeline"].as_array().unwrap().len();

    let submit_uri = format!("/api/manuscripts/{}/submit", id);
    let (status, body) = send(&app, Method::POST, &submit_uri, Some(author_id), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["manuscript"]["status"], json!("submitted"));

    let (status, body) = send(&app, Method::GET, &detail_uri, Some(author_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let after = body["manuscript"]["timeline"].as_array().unwrap().len();
    assert_eq!(after, before + 1);

    // Now the editor can see it.
    let (status, _) = send(&app, Method::GET, &detail_uri, Some(("ed", "editor")), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reviewer_search_is_editor_only() {
    let app = app();
    register(&app, "Rita Reviewer", "rita@example.org", "reviewer").await;

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/users/search?query=rita",
        Some(("alice", "author")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users/search?query=rita",
        Some(("ed", "editor")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["users"][0]["name"], json!("Rita Reviewer"));
}

#[tokio::test]
async fn test_role_scoped_listings_and_stats() {
    let app = app();
    let author = register(&app, "Alice", "alice@example.org", "author").await;
    register(&app, "Ed", "ed@example.org", "editor").await;
    let author_id = (author.as_str(), "author");

    // One draft and one submission.
    for status_name in ["draft", "submitted"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/manuscripts",
            Some(author_id),
            Some(manuscript_payload(status_name)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // The author sees both; the editor's queue hides the draft.
    let (_, body) = send(&app, Method::GET, "/api/manuscripts", Some(author_id), None).await;
    assert_eq!(body["pagination"]["total"], json!(2));
    let (_, body) = send(&app, Method::GET, "/api/manuscripts", Some(("ed", "editor")), None).await;
    assert_eq!(body["pagination"]["total"], json!(1));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/manuscripts/stats",
        Some(author_id),
        None,
    )
    .await;
    assert_eq!(body["stats"]["totalSubmissions"], json!(2));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/manuscripts/stats",
        Some(("ed", "editor")),
        None,
    )
    .await;
    assert_eq!(body["stats"]["newSubmissions"], json!(1));
}
