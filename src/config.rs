// src/config.rs

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

/// Points awarded per difficulty tier. Lookups are case-insensitive and also
/// accept the unaccented spellings.
pub const DIFFICULTY_POINTS: &[(&str, u32)] = &[
    ("fácil", 1),
    ("facil", 1),
    ("media", 2),
    ("difícil", 3),
    ("dificil", 3),
    ("experto", 5),
];

/// Points awarded when a question carries an unknown difficulty label.
pub const FALLBACK_POINTS: u32 = 1;

/// Known question categories and their descriptions.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("agentes", "Preguntas sobre los agentes de VALORANT"),
    ("mapas", "Preguntas sobre los mapas del juego"),
    ("armas", "Preguntas sobre las armas y combate"),
    ("habilidades", "Preguntas sobre habilidades de los agentes"),
    ("esports", "Preguntas sobre la escena competitiva"),
    ("lore", "Preguntas sobre la historia y el lore"),
    ("economía", "Preguntas sobre la economía del juego"),
];

pub const MAX_LABEL_CHARS: usize = 30;

/// Autocomplete responses are capped by the chat platform.
pub const MAX_CATEGORY_SUGGESTIONS: usize = 25;

pub const DEFAULT_ANSWER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RANKING_PLAYERS: usize = 10;
pub const DEFAULT_MESSAGE_RETENTION_SECS: u64 = 300;

/// Longest accepted answer window (one day).
pub const MAX_ANSWER_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub rust_log: String,
    pub port: u16,
    pub quiz_data_path: PathBuf,
    pub scores_path: PathBuf,
    /// When set, scores are kept in Postgres instead of the JSON file.
    pub database_url: Option<String>,
    pub answer_timeout: Duration,
    pub max_ranking_players: usize,
    /// How long a finished question message stays readable.
    pub message_retention: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let quiz_data_path = env::var("QUIZ_DATA_PATH")
            .unwrap_or_else(|_| "data/valorantData.json".to_string())
            .into();

        let scores_path = env::var("SCORES_PATH")
            .unwrap_or_else(|_| "data/quizPoints.json".to_string())
            .into();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let answer_timeout_secs = env::var("ANSWER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ANSWER_TIMEOUT_SECS);

        let message_retention_secs = env::var("MESSAGE_RETENTION_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MESSAGE_RETENTION_SECS);

        let max_ranking_players = env::var("MAX_RANKING_PLAYERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_RANKING_PLAYERS);

        Self {
            rust_log,
            port,
            quiz_data_path,
            scores_path,
            database_url,
            answer_timeout: Duration::from_secs(answer_timeout_secs).min(MAX_ANSWER_TIMEOUT),
            max_ranking_players,
            message_retention: Duration::from_secs(message_retention_secs),
        }
    }
}
