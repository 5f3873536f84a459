// src/services/renderer.rs

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::{
    config::{DEFAULT_MESSAGE_RETENTION_SECS, MAX_LABEL_CHARS},
    models::session::{Outcome, SessionId},
};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("rendering surface unavailable: {0}")]
    Unavailable(String),

    #[error("unknown message: {0}")]
    UnknownMessage(String),
}

/// Opaque reference to a message the renderer has shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
    Neutral,
    Correct,
    Wrong,
}

/// One selectable answer as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionButton {
    pub index: usize,
    pub label: String,
    pub enabled: bool,
    pub mark: OptionMark,
}

/// Everything needed to show a question to its user.
#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub session_id: SessionId,
    pub user_id: String,
    pub question_id: String,
    pub prompt: String,
    pub category: String,
    pub difficulty: String,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub buttons: Vec<OptionButton>,
    pub expires_at: DateTime<Utc>,
}

/// Final state of a presented question.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalView {
    pub buttons: Vec<OptionButton>,
    pub outcome: Outcome,
}

/// The chat surface that shows questions and their results.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn present(&self, presentation: &Presentation) -> Result<MessageHandle, RenderError>;

    async fn update_terminal(
        &self,
        handle: &MessageHandle,
        view: &TerminalView,
    ) -> Result<(), RenderError>;
}

/// Buttons longer than the platform limit are cut with an ellipsis.
fn button_label(option: &str) -> String {
    if option.chars().count() > MAX_LABEL_CHARS {
        let cut: String = option.chars().take(MAX_LABEL_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        option.to_string()
    }
}

/// Buttons for an open question: all enabled, none marked.
pub fn open_buttons(options: &[String]) -> Vec<OptionButton> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| OptionButton {
            index,
            label: button_label(option),
            enabled: true,
            mark: OptionMark::Neutral,
        })
        .collect()
}

/// Buttons after resolution: all disabled, the correct one marked, and a
/// wrong selection marked as such.
pub fn terminal_buttons(
    options: &[String],
    correct_index: usize,
    selected_index: Option<usize>,
) -> Vec<OptionButton> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let mark = if index == correct_index {
                OptionMark::Correct
            } else if Some(index) == selected_index {
                OptionMark::Wrong
            } else {
                OptionMark::Neutral
            };
            OptionButton {
                index,
                label: button_label(option),
                enabled: false,
                mark,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Open,
    Finished,
}

/// A message as currently displayed on the [`MessageBoard`].
#[derive(Debug, Clone, Serialize)]
pub struct RenderedMessage {
    pub handle: MessageHandle,
    pub presentation: Presentation,
    pub status: MessageStatus,
    pub buttons: Vec<OptionButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// How many times the terminal update was applied. Exactly once per
    /// resolved session.
    pub terminal_updates: usize,
    #[serde(skip)]
    finished_at: Option<Instant>,
}

/// In-process renderer that keeps the latest state of every message, keyed
/// by session. Serves the HTTP surface and doubles as a recording renderer.
///
/// Finished messages stay readable for `retention`, then are dropped on the
/// next present or terminal update. Open messages are never dropped.
pub struct MessageBoard {
    messages: Mutex<HashMap<SessionId, RenderedMessage>>,
    retention: Duration,
}

impl Default for MessageBoard {
    fn default() -> Self {
        Self::with_retention(Duration::from_secs(DEFAULT_MESSAGE_RETENTION_SECS))
    }
}

impl MessageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            retention,
        }
    }

    fn evict_finished(&self, messages: &mut HashMap<SessionId, RenderedMessage>) {
        let now = Instant::now();
        let before = messages.len();
        messages.retain(|_, m| match m.finished_at {
            Some(finished_at) => now.saturating_duration_since(finished_at) < self.retention,
            None => true,
        });
        let evicted = before - messages.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} finished messages", evicted);
        }
    }

    pub fn message(&self, session_id: &SessionId) -> Option<RenderedMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Renderer for MessageBoard {
    async fn present(&self, presentation: &Presentation) -> Result<MessageHandle, RenderError> {
        let handle = MessageHandle(presentation.session_id.to_string());
        let message = RenderedMessage {
            handle: handle.clone(),
            presentation: presentation.clone(),
            status: MessageStatus::Open,
            buttons: presentation.buttons.clone(),
            outcome: None,
            terminal_updates: 0,
            finished_at: None,
        };

        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_finished(&mut messages);
        messages.insert(presentation.session_id, message);

        Ok(handle)
    }

    async fn update_terminal(
        &self,
        handle: &MessageHandle,
        view: &TerminalView,
    ) -> Result<(), RenderError> {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_finished(&mut messages);
        let message = messages
            .get_mut(&view.outcome.session_id)
            .filter(|m| &m.handle == handle)
            .ok_or_else(|| RenderError::UnknownMessage(handle.0.clone()))?;

        message.status = MessageStatus::Finished;
        message.buttons = view.buttons.clone();
        message.outcome = Some(view.outcome.clone());
        message.terminal_updates += 1;
        message.finished_at = Some(Instant::now());
        Ok(())
    }
}
