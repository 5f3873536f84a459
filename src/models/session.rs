// src/models/session.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Addresses one dispatched question. A session is identified by
/// (user, question, creation time); this id is the handle the outer layer
/// embeds in its selectable components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Terminal resolution of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Answered { selected_index: usize },
    Expired,
}

/// `Open` until exactly one trigger claims the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Resolved(Resolution),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Resolved(_))
    }
}

/// Final result of a session, emitted exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub session_id: SessionId,
    pub user_id: String,
    pub question_id: String,
    pub resolution: Resolution,
    pub is_correct: bool,
    pub correct_index: usize,
    pub correct_answer: String,
    pub points_awarded: u32,
    /// Ledger total after resolution. `None` on expiry or when the ledger
    /// could not be reached.
    pub new_total_score: Option<i64>,
    /// Set when the ledger failed, so no score is reported that was never
    /// committed.
    pub degraded: bool,
    pub resolved_at: DateTime<Utc>,
}

/// Why a selection event was not applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The selection came from someone other than the session's user.
    ForeignUser,
    /// The index is not one of the presented options.
    OptionOutOfRange,
}

/// Result of a selection event against a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Submission {
    /// This selection won the race and resolved the session.
    Resolved { outcome: Outcome },
    /// The session had already been answered or had expired.
    AlreadyResolved,
    /// Not an event for this session; it stays open.
    Ignored { reason: IgnoreReason },
}

/// DTO for requesting a new question.
#[derive(Debug, Deserialize, validator::Validate)]
pub struct OpenSessionRequest {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 20))]
    pub difficulty: Option<String>,
}

/// DTO returned when a session opens. The correct answer is not included.
#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: SessionId,
    pub question: crate::models::question::PublicQuestion,
    pub expires_at: DateTime<Utc>,
    pub timeout_secs: u64,
}

/// DTO for a selection event.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Who pressed the option; selections by anyone but the session's user
    /// are ignored.
    pub user_id: String,
    pub selected_index: usize,
}
