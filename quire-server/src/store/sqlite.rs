//! SQLite implementation of `Store`.
//!
//! Documents are stored as JSON blobs with the filterable fields promoted to
//! real columns; the reviewer membership list is mirrored into a join table
//! so role-scoped listings stay indexable. Synchronous rusqlite work runs on
//! `tokio::task::spawn_blocking` so it never blocks the async runtime.
//!
//! # Schema versioning
//!
//! A `schema_version` table tracks the current version. Schema changes bump
//! `CURRENT_SCHEMA_VERSION` and add a migration step in `run_migrations`;
//! migrations run sequentially from the stored version to the target.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use quire_core::{Manuscript, ManuscriptId, Review, User, UserId};

use super::{manuscript_matches, user_matches, ManuscriptFilter, Page, Store, StoreError, UserSearch};

/// Current schema version.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bring the schema up to
    /// date. The database uses WAL journaling with a busy timeout so
    /// concurrent request handlers queue instead of failing.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();

        if path_str != ":memory:" && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::new(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| StoreError::new("open database", e.to_string()))?;

        let is_in_memory = path_str == ":memory:";
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| StoreError::new("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            warn!(
                "SQLite journal_mode is '{}', not 'wal'; continuing without WAL",
                journal_mode
            );
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            "#,
        )
        .map_err(|e| StoreError::new("configure pragmas", e.to_string()))?;

        Self::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        )
        .map_err(|e| StoreError::new("create schema_version table", e.to_string()))?;

        let version: i64 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::new("read schema version", e.to_string()))?
            .unwrap_or(0);

        if version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::new(
                "check schema version",
                format!(
                    "database schema version {} is newer than this binary supports ({})",
                    version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        Self::run_migrations(conn, version)
    }

    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), StoreError> {
        if from_version < 1 {
            conn.execute_batch(
                r#"
                BEGIN;
                CREATE TABLE users (
                    id    TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    role  TEXT NOT NULL,
                    doc   TEXT NOT NULL
                );
                CREATE INDEX idx_users_role ON users(role);

                CREATE TABLE manuscripts (
                    id              TEXT PRIMARY KEY,
                    submitted_by    TEXT NOT NULL,
                    assigned_editor TEXT,
                    status          TEXT NOT NULL,
                    created_at      TEXT NOT NULL,
                    doc             TEXT NOT NULL
                );
                CREATE INDEX idx_manuscripts_submitter ON manuscripts(submitted_by, status);
                CREATE INDEX idx_manuscripts_status ON manuscripts(status, created_at);

                CREATE TABLE manuscript_reviewers (
                    manuscript_id TEXT NOT NULL REFERENCES manuscripts(id),
                    reviewer_id   TEXT NOT NULL,
                    status        TEXT NOT NULL,
                    PRIMARY KEY (manuscript_id, reviewer_id)
                );
                CREATE INDEX idx_reviewers_user ON manuscript_reviewers(reviewer_id);

                CREATE TABLE reviews (
                    id            TEXT PRIMARY KEY,
                    manuscript_id TEXT NOT NULL,
                    reviewer_id   TEXT NOT NULL,
                    doc           TEXT NOT NULL,
                    UNIQUE (manuscript_id, reviewer_id)
                );

                DELETE FROM schema_version;
                INSERT INTO schema_version (version) VALUES (1);
                COMMIT;
                "#,
            )
            .map_err(|e| StoreError::new("migration v1", e.to_string()))?;
        }
        Ok(())
    }

    /// Run `f` with the connection on a blocking thread.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::new(operation, "connection lock poisoned"))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::new(operation, format!("blocking task failed: {}", e)))?
    }
}

fn encode<T: serde::Serialize>(operation: &'static str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::new(operation, e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    doc: &str,
) -> Result<T, StoreError> {
    serde_json::from_str(doc).map_err(|e| StoreError::new(operation, e.to_string()))
}

/// Write a manuscript row and refresh its reviewer join rows in one
/// transaction, so membership listings never observe a half-written update.
fn write_manuscript(
    conn: &Connection,
    operation: &'static str,
    manuscript: &Manuscript,
) -> Result<(), StoreError> {
    let doc = encode(operation, manuscript)?;
    let failed = |e: rusqlite::Error| StoreError::new(operation, e.to_string());

    conn.execute_batch("BEGIN").map_err(failed)?;
    let result = (|| -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO manuscripts (id, submitted_by, assigned_editor, status, created_at, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 assigned_editor = excluded.assigned_editor,
                 status = excluded.status,
                 doc = excluded.doc",
            params![
                manuscript.id.0,
                manuscript.submitted_by.0,
                manuscript.assigned_editor.as_ref().map(|e| e.0.as_str()),
                manuscript.status.to_string(),
                manuscript.created_at.to_rfc3339(),
                doc,
            ],
        )?;
        conn.execute(
            "DELETE FROM manuscript_reviewers WHERE manuscript_id = ?1",
            params![manuscript.id.0],
        )?;
        for entry in &manuscript.reviewers {
            conn.execute(
                "INSERT INTO manuscript_reviewers (manuscript_id, reviewer_id, status)
                 VALUES (?1, ?2, ?3)",
                params![manuscript.id.0, entry.user.0, entry.status.to_string()],
            )?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => conn.execute_batch("COMMIT").map_err(failed),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(failed(e))
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        self.with_conn("create user", move |conn| {
            let doc = encode("create user", &user)?;
            conn.execute(
                "INSERT INTO users (id, email, role, doc) VALUES (?1, ?2, ?3, ?4)",
                params![user.id.0, user.email, user.role.to_string(), doc],
            )
            .map_err(|e| StoreError::new("create user", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let id = id.clone();
        self.with_conn("find user", move |conn| {
            let doc: Option<String> = conn
                .query_row("SELECT doc FROM users WHERE id = ?1", params![id.0], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|e| StoreError::new("find user", e.to_string()))?;
            doc.map(|d| decode("find user", &d)).transpose()
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        self.with_conn("find user by email", move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::new("find user by email", e.to_string()))?;
            doc.map(|d| decode("find user by email", &d)).transpose()
        })
        .await
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let user = user.clone();
        self.with_conn("save user", move |conn| {
            let doc = encode("save user", &user)?;
            conn.execute(
                "INSERT INTO users (id, email, role, doc) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET email = excluded.email,
                     role = excluded.role, doc = excluded.doc",
                params![user.id.0, user.email, user.role.to_string(), doc],
            )
            .map_err(|e| StoreError::new("save user", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn search_users(&self, search: &UserSearch) -> Result<Vec<User>, StoreError> {
        let search = search.clone();
        self.with_conn("search users", move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM users WHERE role = ?1")
                .map_err(|e| StoreError::new("search users", e.to_string()))?;
            let docs = stmt
                .query_map(params![search.role.to_string()], |row| {
                    row.get::<_, String>(0)
                })
                .map_err(|e| StoreError::new("search users", e.to_string()))?;

            let mut matched = Vec::new();
            for doc in docs {
                let doc = doc.map_err(|e| StoreError::new("search users", e.to_string()))?;
                let user: User = decode("search users", &doc)?;
                if user_matches(&user, &search) {
                    matched.push(user);
                }
            }
            matched.sort_by(|a, b| a.name.cmp(&b.name));
            matched.truncate(search.limit);
            Ok(matched)
        })
        .await
    }

    async fn create_manuscript(&self, manuscript: Manuscript) -> Result<(), StoreError> {
        self.with_conn("create manuscript", move |conn| {
            write_manuscript(conn, "create manuscript", &manuscript)
        })
        .await
    }

    async fn find_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        let id = id.clone();
        self.with_conn("find manuscript", move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM manuscripts WHERE id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::new("find manuscript", e.to_string()))?;
            doc.map(|d| decode("find manuscript", &d)).transpose()
        })
        .await
    }

    async fn find_manuscripts(
        &self,
        filter: &ManuscriptFilter,
        page: Page,
    ) -> Result<Vec<Manuscript>, StoreError> {
        let filter = filter.clone();
        self.with_conn("find manuscripts", move |conn| {
            let matched = query_manuscripts(conn, "find manuscripts", &filter)?;
            Ok(matched
                .into_iter()
                .skip(page.skip)
                .take(page.limit)
                .collect())
        })
        .await
    }

    async fn count_manuscripts(&self, filter: &ManuscriptFilter) -> Result<u64, StoreError> {
        let filter = filter.clone();
        self.with_conn("count manuscripts", move |conn| {
            let matched = query_manuscripts(conn, "count manuscripts", &filter)?;
            Ok(matched.len() as u64)
        })
        .await
    }

    async fn save_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError> {
        let manuscript = manuscript.clone();
        self.with_conn("save manuscript", move |conn| {
            write_manuscript(conn, "save manuscript", &manuscript)
        })
        .await
    }

    async fn create_review(&self, review: Review) -> Result<(), StoreError> {
        self.with_conn("create review", move |conn| {
            let doc = encode("create review", &review)?;
            conn.execute(
                "INSERT INTO reviews (id, manuscript_id, reviewer_id, doc)
                 VALUES (?1, ?2, ?3, ?4)",
                params![review.id.0, review.manuscript.0, review.reviewer.0, doc],
            )
            .map_err(|e| StoreError::new("create review", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn find_review(
        &self,
        manuscript: &ManuscriptId,
        reviewer: &UserId,
    ) -> Result<Option<Review>, StoreError> {
        let manuscript = manuscript.clone();
        let reviewer = reviewer.clone();
        self.with_conn("find review", move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM reviews WHERE manuscript_id = ?1 AND reviewer_id = ?2",
                    params![manuscript.0, reviewer.0],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::new("find review", e.to_string()))?;
            doc.map(|d| decode("find review", &d)).transpose()
        })
        .await
    }

    async fn find_reviews_for_manuscript(
        &self,
        manuscript: &ManuscriptId,
    ) -> Result<Vec<Review>, StoreError> {
        let manuscript = manuscript.clone();
        self.with_conn("find reviews", move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM reviews WHERE manuscript_id = ?1")
                .map_err(|e| StoreError::new("find reviews", e.to_string()))?;
            let docs = stmt
                .query_map(params![manuscript.0], |row| row.get::<_, String>(0))
                .map_err(|e| StoreError::new("find reviews", e.to_string()))?;

            let mut reviews = Vec::new();
            for doc in docs {
                let doc = doc.map_err(|e| StoreError::new("find reviews", e.to_string()))?;
                reviews.push(decode::<Review>("find reviews", &doc)?);
            }
            reviews.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            Ok(reviews)
        })
        .await
    }

    async fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        let review = review.clone();
        self.with_conn("save review", move |conn| {
            let doc = encode("save review", &review)?;
            conn.execute(
                "INSERT INTO reviews (id, manuscript_id, reviewer_id, doc)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
                params![review.id.0, review.manuscript.0, review.reviewer.0, doc],
            )
            .map_err(|e| StoreError::new("save review", e.to_string()))?;
            Ok(())
        })
        .await
    }
}

/// Fetch candidates narrowed by the promoted columns, then apply the full
/// filter to the deserialized documents. Results are newest-first.
fn query_manuscripts(
    conn: &Connection,
    operation: &'static str,
    filter: &ManuscriptFilter,
) -> Result<Vec<Manuscript>, StoreError> {
    let mut sql = String::from("SELECT doc FROM manuscripts");
    let mut clauses: Vec<&'static str> = Vec::new();
    let mut bind: Vec<String> = Vec::new();

    if let Some(user) = &filter.submitted_by {
        clauses.push("submitted_by = ?");
        bind.push(user.0.clone());
    }
    if let Some(editor) = &filter.assigned_editor {
        clauses.push("assigned_editor = ?");
        bind.push(editor.0.clone());
    }
    if let Some(reviewer) = &filter.reviewer {
        clauses.push("id IN (SELECT manuscript_id FROM manuscript_reviewers WHERE reviewer_id = ?)");
        bind.push(reviewer.0.clone());
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        bind.push(status.to_string());
    }

    for (i, clause) in clauses.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(clause);
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::new(operation, e.to_string()))?;
    let docs = stmt
        .query_map(rusqlite::params_from_iter(bind.iter()), |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| StoreError::new(operation, e.to_string()))?;

    let mut matched = Vec::new();
    for doc in docs {
        let doc = doc.map_err(|e| StoreError::new(operation, e.to_string()))?;
        let manuscript: Manuscript = decode(operation, &doc)?;
        if manuscript_matches(&manuscript, filter) {
            matched.push(manuscript);
        }
    }
    Ok(matched)
}
