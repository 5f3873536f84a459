// src/services/arbiter.rs

//! Single-shot, time-boxed answer arbitration.
//!
//! A session is resolved by whichever trigger claims it first: the user's
//! selection or the deadline timer. The claim is a compare-and-set on the
//! session state; the losing trigger sees a terminal state and does nothing.
//! Scoring, the terminal render and outcome emission all hang off the single
//! winning claim.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{
    config::MAX_ANSWER_TIMEOUT,
    models::{
        question::Question,
        session::{IgnoreReason, Outcome, Resolution, SessionId, SessionState, Submission},
    },
    services::{
        ledger::ScoreLedger,
        renderer::{
            MessageHandle, Presentation, RenderError, Renderer, TerminalView, open_buttons,
            terminal_buttons,
        },
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    #[error("user {0} already has an open quiz session")]
    SessionActive(String),

    #[error("failed to present question: {0}")]
    Presentation(#[from] RenderError),
}

struct Session {
    id: SessionId,
    user_id: String,
    question: Arc<Question>,
    expires_at: DateTime<Utc>,
    message: MessageHandle,
    state: Mutex<SessionState>,
    outcome: watch::Sender<Option<Outcome>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Open -> Resolved. Returns false if another trigger got there first.
    fn claim(&self, resolution: Resolution) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_terminal() {
            return false;
        }
        *state = SessionState::Resolved(resolution);
        true
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unscheduling is an optimization; a late timer is a no-op anyway.
    fn cancel_timer(&self) {
        if let Some(timer) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
    }
}

/// Cloneable reference to one session. Every clone observes the same
/// single outcome.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Session>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.session.id
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    pub fn question(&self) -> &Arc<Question> {
        &self.session.question
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.session.expires_at
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The outcome, if the session has been fully resolved.
    pub fn outcome(&self) -> Option<Outcome> {
        self.session.outcome.borrow().clone()
    }

    /// Waits until the session is resolved by either trigger.
    pub async fn resolved(&self) -> Option<Outcome> {
        let mut rx = self.session.outcome.subscribe();
        let outcome: Option<Outcome> = (*rx.wait_for(Option::is_some).await.ok()?).clone();
        outcome
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.session.id)
            .field("user_id", &self.session.user_id)
            .field("question_id", &self.session.question.id)
            .field("state", &self.session.state())
            .finish()
    }
}

enum Slot {
    /// Reserved while the question is being presented.
    Opening,
    Open(Arc<Session>),
}

#[derive(Default)]
struct Registry {
    by_user: HashMap<String, Slot>,
    by_id: HashMap<SessionId, Arc<Session>>,
}

struct ArbiterInner {
    ledger: Arc<ScoreLedger>,
    renderer: Arc<dyn Renderer>,
    registry: Mutex<Registry>,
}

/// Releases a user's `Opening` reservation unless the session went live,
/// including when the `open` future is dropped mid-presentation.
struct Reservation<'a> {
    inner: &'a ArbiterInner,
    user_id: &'a str,
    armed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut registry = self.inner.lock_registry();
        if matches!(registry.by_user.get(self.user_id), Some(Slot::Opening)) {
            registry.by_user.remove(self.user_id);
        }
    }
}

impl ArbiterInner {
    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unregister(&self, session: &Session) {
        let mut registry = self.lock_registry();
        registry.by_id.remove(&session.id);
        if matches!(
            registry.by_user.get(&session.user_id),
            Some(Slot::Open(current)) if current.id == session.id
        ) {
            registry.by_user.remove(&session.user_id);
        }
    }

    async fn expire(&self, session: &Session) {
        if !session.claim(Resolution::Expired) {
            return;
        }
        tracing::info!("Session {} for user {} expired", session.id, session.user_id);
        self.finalize(session, Resolution::Expired).await;
    }

    /// Runs once per session, after the winning claim: score, render,
    /// unregister, emit.
    async fn finalize(&self, session: &Session, resolution: Resolution) -> Outcome {
        let question = &session.question;

        let selected_index = match resolution {
            Resolution::Answered { selected_index } => Some(selected_index),
            Resolution::Expired => None,
        };
        let is_correct = selected_index.is_some_and(|i| question.is_correct(i));

        let (points_awarded, new_total_score, degraded) = match (selected_index, is_correct) {
            (Some(_), true) => {
                let points = question.points();
                match self.ledger.increment(&session.user_id, points).await {
                    Ok(total) => (points, Some(total), false),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to record {} points for user {} (session {}): {}",
                            points,
                            session.user_id,
                            session.id,
                            e
                        );
                        (0, None, true)
                    }
                }
            }
            (Some(_), false) => match self.ledger.get(&session.user_id).await {
                Ok(total) => (0, Some(total), false),
                Err(e) => {
                    tracing::warn!("Failed to read score for user {}: {}", session.user_id, e);
                    (0, None, true)
                }
            },
            (None, _) => (0, None, false),
        };

        let outcome = Outcome {
            session_id: session.id,
            user_id: session.user_id.clone(),
            question_id: question.id.clone(),
            resolution,
            is_correct,
            correct_index: question.correct_index,
            correct_answer: question.correct_answer().to_string(),
            points_awarded,
            new_total_score,
            degraded,
            resolved_at: Utc::now(),
        };

        let view = TerminalView {
            buttons: terminal_buttons(&question.options, question.correct_index, selected_index),
            outcome: outcome.clone(),
        };
        if let Err(e) = self.renderer.update_terminal(&session.message, &view).await {
            tracing::error!("Failed to render result of session {}: {}", session.id, e);
        }

        self.unregister(session);
        session.outcome.send_replace(Some(outcome.clone()));

        tracing::info!(
            "Session {} resolved: correct={} points={}",
            session.id,
            outcome.is_correct,
            outcome.points_awarded
        );
        outcome
    }
}

/// Owns the lifecycle of every quiz session. At most one session per user is
/// open at a time.
pub struct SessionArbiter {
    inner: Arc<ArbiterInner>,
}

impl SessionArbiter {
    pub fn new(ledger: Arc<ScoreLedger>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            inner: Arc::new(ArbiterInner {
                ledger,
                renderer,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Presents `question` to `user_id` and starts the answer window.
    /// Windows longer than [`MAX_ANSWER_TIMEOUT`] are cut to it.
    ///
    /// Fails if the user already has a session that has not finished, or if
    /// the question could not be presented. In both cases nothing is left
    /// open.
    pub async fn open(
        &self,
        question: Arc<Question>,
        user_id: &str,
        timeout: Duration,
    ) -> Result<SessionHandle, ArbiterError> {
        {
            let mut registry = self.inner.lock_registry();
            if registry.by_user.contains_key(user_id) {
                return Err(ArbiterError::SessionActive(user_id.to_string()));
            }
            registry.by_user.insert(user_id.to_string(), Slot::Opening);
        }
        let mut reservation = Reservation {
            inner: &self.inner,
            user_id,
            armed: true,
        };

        let id = SessionId::new();
        let timeout = timeout.min(MAX_ANSWER_TIMEOUT);
        let deadline = Instant::now() + timeout;
        let opened_at = Utc::now();
        let expires_at = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|d| opened_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let presentation = Presentation {
            session_id: id,
            user_id: user_id.to_string(),
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            category: question.category.clone(),
            difficulty: question.difficulty.clone(),
            points: question.points(),
            media: question.media.clone(),
            buttons: open_buttons(&question.options),
            expires_at,
        };

        let message = self.inner.renderer.present(&presentation).await.map_err(|e| {
            tracing::warn!("Failed to present question {} to {}: {}", question.id, user_id, e);
            e
        })?;

        let (outcome, _) = watch::channel(None);
        let session = Arc::new(Session {
            id,
            user_id: user_id.to_string(),
            question,
            expires_at,
            message,
            state: Mutex::new(SessionState::Open),
            outcome,
            timer: Mutex::new(None),
        });

        {
            let mut registry = self.inner.lock_registry();
            registry
                .by_user
                .insert(user_id.to_string(), Slot::Open(Arc::clone(&session)));
            registry.by_id.insert(id, Arc::clone(&session));
        }
        reservation.armed = false;

        let arbiter = Arc::downgrade(&self.inner);
        let timed = Arc::clone(&session);
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = arbiter.upgrade() {
                inner.expire(&timed).await;
            }
        });
        *session.timer.lock().unwrap_or_else(PoisonError::into_inner) = Some(timer);

        tracing::info!(
            "Opened session {} for user {} (question {}, {}s)",
            id,
            user_id,
            session.question.id,
            timeout.as_secs()
        );

        Ok(SessionHandle { session })
    }

    /// Applies a selection event to a session.
    ///
    /// Only a selection by the session's own user with an in-range index can
    /// resolve it, and only if it beats the timer. Anything else leaves
    /// ledger and render untouched.
    pub async fn submit(
        &self,
        handle: &SessionHandle,
        actor_id: &str,
        selected_index: usize,
    ) -> Submission {
        let session = &handle.session;

        if actor_id != session.user_id {
            tracing::debug!("Ignoring selection by {} on session {}", actor_id, session.id);
            return Submission::Ignored {
                reason: IgnoreReason::ForeignUser,
            };
        }
        if selected_index >= session.question.options.len() {
            tracing::debug!(
                "Ignoring out-of-range option {} on session {}",
                selected_index,
                session.id
            );
            return Submission::Ignored {
                reason: IgnoreReason::OptionOutOfRange,
            };
        }

        let resolution = Resolution::Answered { selected_index };
        if !session.claim(resolution) {
            return Submission::AlreadyResolved;
        }
        session.cancel_timer();

        // Finish in a task of its own so a dropped caller cannot strand a
        // claimed session half-resolved.
        let inner = Arc::clone(&self.inner);
        let claimed = Arc::clone(session);
        let finalize = tokio::spawn(async move { inner.finalize(&claimed, resolution).await });

        match finalize.await {
            Ok(outcome) => Submission::Resolved { outcome },
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::error!("Resolution of session {} was cancelled: {}", session.id, e);
                Submission::AlreadyResolved
            }
        }
    }

    /// Open session by id. Resolved sessions are no longer listed.
    pub fn find(&self, id: &SessionId) -> Option<SessionHandle> {
        self.inner
            .lock_registry()
            .by_id
            .get(id)
            .map(|session| SessionHandle {
                session: Arc::clone(session),
            })
    }

    /// The user's open session, if any.
    pub fn active_for(&self, user_id: &str) -> Option<SessionHandle> {
        match self.inner.lock_registry().by_user.get(user_id) {
            Some(Slot::Open(session)) => Some(SessionHandle {
                session: Arc::clone(session),
            }),
            _ => None,
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock_registry().by_id.len()
    }
}
