//! Entity store abstraction.
//!
//! The `Store` trait is the persistence contract for the three document
//! collections (users, manuscripts, reviews). All operations are
//! single-document-atomic; there are no multi-document transactions and no
//! optimistic-concurrency token (accepted limitation, see DESIGN.md).
//! `find_*` returns `Ok(None)` for missing documents; errors mean the
//! storage layer itself failed.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

use quire_core::manuscript::InvitationStatus;
use quire_core::{Manuscript, ManuscriptId, ManuscriptStatus, Review, Role, User, UserId};
use quire_core::WorkflowError;

/// Storage layer failure. Always surfaced to the caller as a retryable
/// error, never swallowed.
#[derive(Debug, Clone, Error)]
#[error("{operation}: {message}")]
pub struct StoreError {
    pub operation: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        WorkflowError::Storage(err.to_string())
    }
}

/// Equality/membership filter over manuscripts. Unset fields match anything.
#[derive(Debug, Clone, Default)]
pub struct ManuscriptFilter {
    pub submitted_by: Option<UserId>,
    pub assigned_editor: Option<UserId>,
    /// Manuscripts where this user appears in `reviewers[]`.
    pub reviewer: Option<UserId>,
    /// Further restrict `reviewer` matches to entries in these states.
    pub reviewer_status_in: Vec<InvitationStatus>,
    pub status: Option<ManuscriptStatus>,
    pub status_in: Vec<ManuscriptStatus>,
}

impl ManuscriptFilter {
    pub fn submitted_by(user: UserId) -> Self {
        Self {
            submitted_by: Some(user),
            ..Self::default()
        }
    }

    pub fn reviewed_by(user: UserId) -> Self {
        Self {
            reviewer: Some(user),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: ManuscriptStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Whether a manuscript satisfies a filter. Shared by both backends: the
/// SQLite backend narrows with promoted columns first and re-checks here.
pub(crate) fn manuscript_matches(manuscript: &Manuscript, filter: &ManuscriptFilter) -> bool {
    if let Some(user) = &filter.submitted_by {
        if &manuscript.submitted_by != user {
            return false;
        }
    }
    if let Some(editor) = &filter.assigned_editor {
        if manuscript.assigned_editor.as_ref() != Some(editor) {
            return false;
        }
    }
    if let Some(reviewer) = &filter.reviewer {
        match manuscript.reviewer_entry(reviewer) {
            None => return false,
            Some(entry) => {
                if !filter.reviewer_status_in.is_empty()
                    && !filter.reviewer_status_in.contains(&entry.status)
                {
                    return false;
                }
            }
        }
    }
    if let Some(status) = filter.status {
        if manuscript.status != status {
            return false;
        }
    }
    if !filter.status_in.is_empty() && !filter.status_in.contains(&manuscript.status) {
        return false;
    }
    true
}

/// Pagination window for listings.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub skip: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 10, skip: 0 }
    }
}

/// Reviewer search parameters (editor-facing).
#[derive(Debug, Clone)]
pub struct UserSearch {
    /// Case-insensitive substring over name, email and affiliation.
    pub query: Option<String>,
    /// Case-insensitive substring over expertise tags.
    pub expertise: Option<String>,
    pub role: Role,
    pub limit: usize,
}

impl Default for UserSearch {
    fn default() -> Self {
        Self {
            query: None,
            expertise: None,
            role: Role::Reviewer,
            limit: 20,
        }
    }
}

/// Whether a user satisfies a search. Shared by both backends.
pub(crate) fn user_matches(user: &User, search: &UserSearch) -> bool {
    if user.role != search.role {
        return false;
    }
    if let Some(query) = &search.query {
        let query = query.to_lowercase();
        let affiliation = user
            .profile
            .affiliation
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        if !user.name.to_lowercase().contains(&query)
            && !user.email.to_lowercase().contains(&query)
            && !affiliation.contains(&query)
        {
            return false;
        }
    }
    if let Some(expertise) = &search.expertise {
        let expertise = expertise.to_lowercase();
        if !user
            .profile
            .expertise
            .iter()
            .any(|tag| tag.to_lowercase().contains(&expertise))
        {
            return false;
        }
    }
    true
}

/// Persistence contract for the three collections.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: User) -> Result<(), StoreError>;
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn save_user(&self, user: &User) -> Result<(), StoreError>;
    async fn search_users(&self, search: &UserSearch) -> Result<Vec<User>, StoreError>;

    // Manuscripts
    async fn create_manuscript(&self, manuscript: Manuscript) -> Result<(), StoreError>;
    async fn find_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError>;
    /// Newest-first listing of manuscripts matching `filter`.
    async fn find_manuscripts(
        &self,
        filter: &ManuscriptFilter,
        page: Page,
    ) -> Result<Vec<Manuscript>, StoreError>;
    async fn count_manuscripts(&self, filter: &ManuscriptFilter) -> Result<u64, StoreError>;
    async fn save_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError>;

    // Reviews
    async fn create_review(&self, review: Review) -> Result<(), StoreError>;
    async fn find_review(
        &self,
        manuscript: &ManuscriptId,
        reviewer: &UserId,
    ) -> Result<Option<Review>, StoreError>;
    async fn find_reviews_for_manuscript(
        &self,
        manuscript: &ManuscriptId,
    ) -> Result<Vec<Review>, StoreError>;
    async fn save_review(&self, review: &Review) -> Result<(), StoreError>;
}
