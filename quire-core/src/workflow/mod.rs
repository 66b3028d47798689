//! The manuscript workflow state machine.
//!
//! Pure transition logic over the `Manuscript` aggregate. Each function takes
//! the current document plus an acting identity and either applies the
//! transition (mutating the in-memory aggregate and appending its audit
//! events) or fails without touching anything. Persistence happens outside:
//! handlers load a document, run a transition, and save the result, so a
//! rejected transition never leaves partial side effects behind.
//!
//! - `submit`: draft creation and the `draft -> submitted` edge
//! - `invitation`: the per-reviewer invitation protocol and the
//!   `submitted -> under_review` promotion
//! - `decision`: editorial decisions and their decision-log side effects

pub mod decision;
pub mod invitation;
pub mod submit;

pub use decision::{decide, validate_decision, DecisionOutcome, DecisionRequest, RevisionType};
pub use invitation::{
    complete, default_deadline, invite, respond, review_gate, InvitationResponse, Invitee,
    InviteOutcome, DEFAULT_DEADLINE_DAYS,
};
pub use submit::{create, submit};
