//! Payload validation.
//!
//! Validation runs before any mutation is attempted; a failing payload never
//! causes a partial write. Failures carry field-level messages all the way to
//! the caller.

use serde::Deserialize;

use crate::error::{FieldError, WorkflowError};
use crate::manuscript::{Author, FileSet, ManuscriptType, SuggestedReviewer};
use crate::review::{Ratings, Recommendation, ReviewComments, ReviewContent};
use crate::user::Role;

pub const TITLE_MIN: usize = 10;
pub const TITLE_MAX: usize = 500;
pub const ABSTRACT_MIN: usize = 50;
pub const ABSTRACT_MAX: usize = 3000;
pub const KEYWORD_MIN: usize = 2;
pub const KEYWORDS_MAX: usize = 10;
pub const SUGGESTED_REVIEWERS_MAX: usize = 5;
pub const NAME_MIN: usize = 2;
pub const PASSWORD_MIN: usize = 8;
/// Minimum length for the substantive review/decision text fields.
pub const COMMENT_MIN: usize = 50;
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

/// Whether a manuscript payload is being saved as a draft or submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionIntent {
    Draft,
    Submitted,
}

impl Default for SubmissionIntent {
    fn default() -> Self {
        SubmissionIntent::Draft
    }
}

/// Manuscript creation/submission payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManuscriptSubmission {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub manuscript_type: ManuscriptType,
    #[serde(default)]
    pub category: Option<String>,
    pub authors: Vec<Author>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub suggested_reviewers: Vec<SuggestedReviewer>,
    #[serde(default)]
    pub status: SubmissionIntent,
}

/// Validate a manuscript payload together with its file set.
///
/// Field constraints apply to drafts and submissions alike; the
/// manuscript-file-present requirement only gates actual submission.
pub fn validate_manuscript(
    payload: &ManuscriptSubmission,
    files: &FileSet,
) -> Result<(), WorkflowError> {
    let mut errors = Vec::new();

    let title = payload.title.trim();
    if title.chars().count() < TITLE_MIN {
        errors.push(FieldError::new(
            "title",
            format!("title must be at least {} characters", TITLE_MIN),
        ));
    } else if title.chars().count() > TITLE_MAX {
        errors.push(FieldError::new(
            "title",
            format!("title cannot exceed {} characters", TITLE_MAX),
        ));
    }

    let abstract_len = payload.abstract_text.chars().count();
    if abstract_len < ABSTRACT_MIN {
        errors.push(FieldError::new(
            "abstract",
            format!("abstract must be at least {} characters", ABSTRACT_MIN),
        ));
    } else if abstract_len > ABSTRACT_MAX {
        errors.push(FieldError::new(
            "abstract",
            format!("abstract cannot exceed {} characters", ABSTRACT_MAX),
        ));
    }

    if payload.keywords.is_empty() {
        errors.push(FieldError::new("keywords", "at least 1 keyword is required"));
    } else if payload.keywords.len() > KEYWORDS_MAX {
        errors.push(FieldError::new(
            "keywords",
            format!("maximum {} keywords allowed", KEYWORDS_MAX),
        ));
    }
    for (i, keyword) in payload.keywords.iter().enumerate() {
        if keyword.trim().chars().count() < KEYWORD_MIN {
            errors.push(FieldError::new(
                format!("keywords[{}]", i),
                format!("keyword must be at least {} characters", KEYWORD_MIN),
            ));
        }
    }

    if payload.authors.is_empty() {
        errors.push(FieldError::new("authors", "at least one author is required"));
    } else {
        for (i, author) in payload.authors.iter().enumerate() {
            if author.name.trim().chars().count() < NAME_MIN {
                errors.push(FieldError::new(
                    format!("authors[{}].name", i),
                    format!("name must be at least {} characters", NAME_MIN),
                ));
            }
            if !is_plausible_email(&author.email) {
                errors.push(FieldError::new(
                    format!("authors[{}].email", i),
                    "invalid email address",
                ));
            }
        }
        if !payload.authors.iter().any(|a| a.corresponding) {
            errors.push(FieldError::new(
                "authors",
                "at least one corresponding author is required",
            ));
        }
    }

    if payload.suggested_reviewers.len() > SUGGESTED_REVIEWERS_MAX {
        errors.push(FieldError::new(
            "suggestedReviewers",
            format!("maximum {} suggested reviewers allowed", SUGGESTED_REVIEWERS_MAX),
        ));
    }

    if payload.status == SubmissionIntent::Submitted && files.manuscript.is_none() {
        errors.push(FieldError::new(
            "files.manuscript",
            "a manuscript file is required for submission",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

/// Review comment fields as they arrive on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCommentsPayload {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    #[serde(default)]
    pub confidential_comments: Option<String>,
}

impl From<ReviewCommentsPayload> for ReviewComments {
    fn from(payload: ReviewCommentsPayload) -> Self {
        ReviewComments {
            strengths: payload.strengths,
            weaknesses: payload.weaknesses,
            suggestions: payload.suggestions,
            confidential_comments: payload.confidential_comments,
        }
    }
}

/// Review submission payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub overall_recommendation: Recommendation,
    pub ratings: Ratings,
    pub comments: ReviewCommentsPayload,
}

impl ReviewSubmission {
    pub fn into_content(self) -> ReviewContent {
        ReviewContent {
            overall_recommendation: self.overall_recommendation,
            ratings: self.ratings,
            comments: self.comments.into(),
        }
    }
}

/// Validate review content: ratings in range, substantive comments long
/// enough. Confidential comments are optional and unconstrained.
pub fn validate_review(payload: &ReviewSubmission) -> Result<(), WorkflowError> {
    let mut errors = Vec::new();

    let ratings = [
        ("ratings.originality", payload.ratings.originality),
        ("ratings.methodology", payload.ratings.methodology),
        ("ratings.clarity", payload.ratings.clarity),
        ("ratings.significance", payload.ratings.significance),
        ("ratings.references", payload.ratings.references),
    ];
    for (field, value) in ratings {
        if !(RATING_MIN..=RATING_MAX).contains(&value) {
            errors.push(FieldError::new(
                field,
                format!("rating must be between {} and {}", RATING_MIN, RATING_MAX),
            ));
        }
    }

    let comments = [
        ("comments.strengths", &payload.comments.strengths),
        ("comments.weaknesses", &payload.comments.weaknesses),
        ("comments.suggestions", &payload.comments.suggestions),
    ];
    for (field, value) in comments {
        if value.trim().chars().count() < COMMENT_MIN {
            errors.push(FieldError::new(
                field,
                format!("please provide at least {} characters", COMMENT_MIN),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

/// Registration payload. Role defaults to author when unspecified.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

pub fn validate_registration(payload: &RegisterRequest) -> Result<(), WorkflowError> {
    let mut errors = Vec::new();

    if payload.name.trim().chars().count() < NAME_MIN {
        errors.push(FieldError::new(
            "name",
            format!("name must be at least {} characters", NAME_MIN),
        ));
    }
    if !is_plausible_email(&payload.email) {
        errors.push(FieldError::new("email", "invalid email address"));
    }
    if payload.password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("password must be at least {} characters", PASSWORD_MIN),
        ));
    }
    if let Some(role) = payload.role {
        if !role.is_self_selectable() {
            errors.push(FieldError::new(
                "role",
                "only author, reviewer and editor are selectable at registration",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

/// Minimal shape check: one `@` with a dot somewhere after it.
/// Deliverability is the mail system's problem, not ours.
fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_submission() -> ManuscriptSubmission {
        ManuscriptSubmission {
            title: "Adaptive mesh refinement".into(),
            abstract_text: "x".repeat(200),
            manuscript_type: ManuscriptType::Research,
            category: None,
            authors: vec![Author {
                name: "Ada Lovelace".into(),
                email: "ada@example.org".into(),
                affiliation: None,
                corresponding: true,
            }],
            keywords: vec!["simulation".into()],
            suggested_reviewers: Vec::new(),
            status: SubmissionIntent::Submitted,
        }
    }

    fn files_with_manuscript() -> FileSet {
        FileSet {
            manuscript: Some(crate::manuscript::FileRef {
                filename: "main.pdf".into(),
                url: "/uploads/main.pdf".into(),
                size: 1024,
                mime_type: "application/pdf".into(),
                uploaded_at: chrono::Utc::now(),
            }),
            cover_letter: None,
            supplementary: Vec::new(),
        }
    }

    #[test]
    fn test_valid_submission_passes() {
        assert!(validate_manuscript(&valid_submission(), &files_with_manuscript()).is_ok());
    }

    #[test]
    fn test_short_title_rejected() {
        let mut payload = valid_submission();
        payload.title = "Too short".into(); // 9 characters
        let err = validate_manuscript(&payload, &files_with_manuscript()).unwrap_err();
        match err {
            WorkflowError::Validation(fields) => {
                assert!(fields.iter().any(|f| f.field == "title"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_corresponding_author_rejected() {
        let mut payload = valid_submission();
        payload.authors = vec![
            Author {
                name: "First Author".into(),
                email: "first@example.org".into(),
                affiliation: None,
                corresponding: false,
            },
            Author {
                name: "Second Author".into(),
                email: "second@example.org".into(),
                affiliation: None,
                corresponding: false,
            },
        ];
        // Applies to drafts too: the corresponding-author invariant holds
        // from creation, not just at submission.
        payload.status = SubmissionIntent::Draft;
        let err = validate_manuscript(&payload, &FileSet::default()).unwrap_err();
        match err {
            WorkflowError::Validation(fields) => {
                assert!(fields
                    .iter()
                    .any(|f| f.field == "authors" && f.message.contains("corresponding")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_submission_requires_manuscript_file_but_draft_does_not() {
        let mut payload = valid_submission();
        let err = validate_manuscript(&payload, &FileSet::default()).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        payload.status = SubmissionIntent::Draft;
        assert!(validate_manuscript(&payload, &FileSet::default()).is_ok());
    }

    #[test]
    fn test_keyword_bounds() {
        let mut payload = valid_submission();
        payload.keywords = Vec::new();
        assert!(validate_manuscript(&payload, &files_with_manuscript()).is_err());

        payload.keywords = (0..11).map(|i| format!("keyword-{}", i)).collect();
        assert!(validate_manuscript(&payload, &files_with_manuscript()).is_err());
    }

    fn valid_review() -> ReviewSubmission {
        ReviewSubmission {
            overall_recommendation: Recommendation::MinorRevision,
            ratings: Ratings {
                originality: 4,
                methodology: 4,
                clarity: 3,
                significance: 4,
                references: 5,
            },
            comments: ReviewCommentsPayload {
                strengths: "s".repeat(60),
                weaknesses: "w".repeat(60),
                suggestions: "g".repeat(60),
                confidential_comments: None,
            },
        }
    }

    #[test]
    fn test_valid_review_passes() {
        assert!(validate_review(&valid_review()).is_ok());
    }

    #[test]
    fn test_short_strengths_rejected() {
        let mut payload = valid_review();
        payload.comments.strengths = "x".repeat(40);
        let err = validate_review(&payload).unwrap_err();
        match err {
            WorkflowError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "comments.strengths");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let mut payload = valid_review();
        payload.ratings.clarity = 0;
        assert!(validate_review(&payload).is_err());
        payload.ratings.clarity = 6;
        assert!(validate_review(&payload).is_err());
    }

    #[test]
    fn test_confidential_comments_optional() {
        let mut payload = valid_review();
        payload.comments.confidential_comments = Some("short note".into());
        assert!(validate_review(&payload).is_ok());
    }

    #[test]
    fn test_registration_rejects_admin_role() {
        let payload = RegisterRequest {
            name: "Grace Hopper".into(),
            email: "grace@example.org".into(),
            password: "correct-horse".into(),
            role: Some(Role::Admin),
        };
        let err = validate_registration(&payload).unwrap_err();
        match err {
            WorkflowError::Validation(fields) => {
                assert!(fields.iter().any(|f| f.field == "role"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_plausible_email("a@b.org"));
        assert!(!is_plausible_email("a.b.org"));
        assert!(!is_plausible_email("@b.org"));
        assert!(!is_plausible_email("a@borg"));
    }
}
