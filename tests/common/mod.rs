// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;
use trivia_engine::models::question::{Question, QuizFile};
use trivia_engine::models::score::ScoreRecord;
use trivia_engine::services::catalog::{CatalogError, QuestionSource};
use trivia_engine::services::ledger::{LedgerError, ScoreStore};
use trivia_engine::services::renderer::{
    MessageBoard, MessageHandle, Presentation, RenderError, Renderer, TerminalView,
};

/// The "q1" question: options A/B/C, correct answer B, difficulty "media".
pub fn scenario_json() -> serde_json::Value {
    json!({
        "id": "q1",
        "pregunta": "Which letter is second?",
        "opciones": ["A", "B", "C"],
        "respuestaCorrecta": 1,
        "dificultad": "media",
        "categoria": "armas"
    })
}

pub fn scenario_question() -> Arc<Question> {
    Arc::new(serde_json::from_value(scenario_json()).unwrap())
}

pub fn quiz_file(questions: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "quiz": {
            "categorias": ["agentes", "armas", "mapas"],
            "dificultades": { "media": 2 },
            "preguntas": questions
        }
    })
}

/// In-memory question source.
pub struct StaticSource(pub serde_json::Value);

#[async_trait]
impl QuestionSource for StaticSource {
    async fn fetch(&self) -> Result<QuizFile, CatalogError> {
        Ok(serde_json::from_value(self.0.clone()).unwrap())
    }
}

/// Wraps a [`MessageBoard`] and fails on demand.
#[derive(Default)]
pub struct FlakyRenderer {
    pub board: MessageBoard,
    pub fail_present: AtomicBool,
    pub fail_terminal: AtomicBool,
}

impl FlakyRenderer {
    pub fn set_fail_present(&self, fail: bool) {
        self.fail_present.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_terminal(&self, fail: bool) {
        self.fail_terminal.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Renderer for FlakyRenderer {
    async fn present(&self, presentation: &Presentation) -> Result<MessageHandle, RenderError> {
        if self.fail_present.load(Ordering::SeqCst) {
            return Err(RenderError::Unavailable("gateway timeout".to_string()));
        }
        self.board.present(presentation).await
    }

    async fn update_terminal(
        &self,
        handle: &MessageHandle,
        view: &TerminalView,
    ) -> Result<(), RenderError> {
        if self.fail_terminal.load(Ordering::SeqCst) {
            return Err(RenderError::Unavailable("message deleted".to_string()));
        }
        self.board.update_terminal(handle, view).await
    }
}

/// A store whose writes always fail.
pub struct BrokenStore;

#[async_trait]
impl ScoreStore for BrokenStore {
    async fn get(&self, _user_id: &str) -> Result<Option<i64>, LedgerError> {
        Err(LedgerError::Io(std::io::Error::other("read-only filesystem")))
    }

    async fn add(&self, _user_id: &str, _points: u32) -> Result<i64, LedgerError> {
        Err(LedgerError::Io(std::io::Error::other("read-only filesystem")))
    }

    async fn all(&self) -> Result<Vec<ScoreRecord>, LedgerError> {
        Ok(Vec::new())
    }
}

pub fn temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("trivia-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
