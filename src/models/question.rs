// src/models/question.rs

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::config::{DIFFICULTY_POINTS, FALLBACK_POINTS};

/// A single multiple-choice question as stored in the quiz data file.
///
/// Field names on the wire follow the data file (`pregunta`, `opciones`, ...)
/// so existing question packs load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_correct_index))]
pub struct Question {
    /// Unique within the catalog. Numeric ids in the file are kept as text.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(rename = "pregunta")]
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,

    #[serde(rename = "opciones")]
    #[validate(length(min = 2, max = 5))]
    pub options: Vec<String>,

    /// Zero-based index into `options`.
    #[serde(rename = "respuestaCorrecta")]
    pub correct_index: usize,

    /// Raw difficulty label, e.g. "media". See [`difficulty_points`].
    #[serde(rename = "dificultad")]
    pub difficulty: String,

    #[serde(rename = "categoria")]
    pub category: String,

    /// Optional illustrative image URL.
    #[serde(rename = "imagen", default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl Question {
    pub fn is_correct(&self, selected_index: usize) -> bool {
        selected_index == self.correct_index
    }

    pub fn correct_answer(&self) -> &str {
        self.options
            .get(self.correct_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn points(&self) -> u32 {
        difficulty_points(&self.difficulty)
    }
}

fn validate_correct_index(question: &Question) -> Result<(), validator::ValidationError> {
    if question.correct_index >= question.options.len() {
        return Err(validator::ValidationError::new("correct_index_out_of_range"));
    }
    Ok(())
}

/// Ids appear both as strings and as integers in question packs.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Converts a difficulty label to its point value.
///
/// Unknown labels are worth [`FALLBACK_POINTS`] so malformed data still plays.
pub fn difficulty_points(tier: &str) -> u32 {
    let tier = tier.trim().to_lowercase();
    DIFFICULTY_POINTS
        .iter()
        .find(|(label, _)| *label == tier)
        .map(|(_, points)| *points)
        .unwrap_or(FALLBACK_POINTS)
}

/// Top-level shape of the quiz data file.
#[derive(Debug, Default, Deserialize)]
pub struct QuizFile {
    #[serde(default)]
    pub quiz: QuizSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuizSection {
    #[serde(rename = "categorias", default)]
    pub categories: Vec<String>,

    /// Kept as raw values so one malformed record does not reject the pack.
    #[serde(rename = "preguntas", default)]
    pub questions: Vec<serde_json::Value>,
}

/// DTO for sending a question to a player (excludes the correct index).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub difficulty: String,
    pub category: String,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            prompt: q.prompt.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty.clone(),
            category: q.category.clone(),
            points: q.points(),
            media: q.media.clone(),
        }
    }
}

/// A category with its description, for listings and autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
}
