//! Draft creation and the `draft -> submitted` transition.

use chrono::{DateTime, Utc};

use crate::error::WorkflowError;
use crate::id::{ManuscriptId, UserId};
use crate::manuscript::{
    DecisionLog, FileSet, Manuscript, ManuscriptStatus, Metrics, PublicationInfo, Timeline,
    Version,
};
use crate::validate::{validate_manuscript, ManuscriptSubmission, SubmissionIntent};

/// Build a new manuscript from a validated payload.
///
/// Drafts and direct submissions both snapshot the file set as version 1 and
/// seed the timeline; only the resulting status differs. Validation runs
/// first, so an invalid payload creates nothing.
pub fn create(
    payload: ManuscriptSubmission,
    files: FileSet,
    submitter: &UserId,
    now: DateTime<Utc>,
) -> Result<Manuscript, WorkflowError> {
    validate_manuscript(&payload, &files)?;

    let (status, seed_event) = match payload.status {
        SubmissionIntent::Draft => (ManuscriptStatus::Draft, "Draft created"),
        SubmissionIntent::Submitted => (ManuscriptStatus::Submitted, "Manuscript submitted"),
    };

    let mut manuscript = Manuscript {
        id: ManuscriptId::generate(),
        title: payload.title.trim().to_string(),
        abstract_text: payload.abstract_text,
        keywords: payload.keywords,
        authors: payload.authors,
        submitted_by: submitter.clone(),
        status,
        manuscript_type: payload.manuscript_type,
        category: payload.category,
        versions: vec![Version {
            version: 1,
            date: now,
            manuscript: files.manuscript.clone(),
            supplementary: files.supplementary.clone(),
            changelog: None,
        }],
        files,
        current_version: 1,
        assigned_editor: None,
        reviewers: Vec::new(),
        suggested_reviewers: payload.suggested_reviewers,
        reviews: Vec::new(),
        editorial_decisions: DecisionLog::default(),
        timeline: Timeline::default(),
        metrics: Metrics::default(),
        publication: PublicationInfo::default(),
        created_at: now,
        updated_at: now,
    };
    manuscript.record_event(seed_event, submitter, now);

    Ok(manuscript)
}

/// `draft -> submitted`.
///
/// Requires the manuscript to currently be a draft and to pass full
/// submission validation (including a manuscript file being present).
/// No transition ever brings a manuscript back to draft.
pub fn submit(
    manuscript: &mut Manuscript,
    actor: &UserId,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    if manuscript.status != ManuscriptStatus::Draft {
        return Err(WorkflowError::conflict(format!(
            "cannot submit a manuscript in {} status",
            manuscript.status
        )));
    }

    let payload = ManuscriptSubmission {
        title: manuscript.title.clone(),
        abstract_text: manuscript.abstract_text.clone(),
        manuscript_type: manuscript.manuscript_type,
        category: manuscript.category.clone(),
        authors: manuscript.authors.clone(),
        keywords: manuscript.keywords.clone(),
        suggested_reviewers: manuscript.suggested_reviewers.clone(),
        status: SubmissionIntent::Submitted,
    };
    validate_manuscript(&payload, &manuscript.files)?;

    manuscript.status = ManuscriptStatus::Submitted;
    if manuscript.versions.is_empty() {
        manuscript.versions.push(Version {
            version: 1,
            date: now,
            manuscript: manuscript.files.manuscript.clone(),
            supplementary: manuscript.files.supplementary.clone(),
            changelog: None,
        });
    }
    manuscript.record_event("Manuscript submitted", actor, now);
    manuscript.updated_at = now;

    Ok(())
}
