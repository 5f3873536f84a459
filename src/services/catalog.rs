// src/services/catalog.rs

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use rand::Rng;
use rand::seq::IndexedRandom;
use validator::Validate;

use crate::{
    config::{CATEGORIES, MAX_CATEGORY_SUGGESTIONS},
    models::question::{Category, Question, QuizFile, difficulty_points},
    utils::fs::read_json_file,
};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read question data: {0}")]
    Read(#[from] std::io::Error),
}

/// Where the question pool comes from. Loaded in bulk, re-read on reload.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self) -> Result<QuizFile, CatalogError>;
}

/// Question pack stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionSource for JsonFileSource {
    async fn fetch(&self) -> Result<QuizFile, CatalogError> {
        match read_json_file::<QuizFile>(&self.path).await? {
            Some(file) => Ok(file),
            None => {
                tracing::warn!("Question data file {} not found", self.path.display());
                Ok(QuizFile::default())
            }
        }
    }
}

/// Summary of a (re)load. A failed read still produces a report, with an
/// empty pool and the failure in `warning`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Default)]
struct QuestionPool {
    questions: Vec<Arc<Question>>,
    categories: Vec<String>,
}

/// Immutable pool of questions with filtered random selection.
///
/// The pool is swapped as a whole on reload; questions already handed out
/// stay valid because sessions hold their own `Arc`.
pub struct QuestionCatalog {
    source: Box<dyn QuestionSource>,
    pool: RwLock<Arc<QuestionPool>>,
}

impl QuestionCatalog {
    /// Creates a catalog with an empty pool. Call [`QuestionCatalog::load`].
    pub fn new(source: impl QuestionSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            pool: RwLock::new(Arc::new(QuestionPool::default())),
        }
    }

    /// Reads the pool from the source. Never fails: on error the pool is
    /// replaced by an empty one and the error is reported as a warning.
    pub async fn load(&self) -> LoadReport {
        let (pool, report) = match self.source.fetch().await {
            Ok(file) => build_pool(file),
            Err(e) => {
                tracing::warn!("Failed to load quiz data, continuing with an empty pool: {}", e);
                (
                    QuestionPool::default(),
                    LoadReport {
                        warning: Some(e.to_string()),
                        ..LoadReport::default()
                    },
                )
            }
        };

        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(pool);

        tracing::info!(
            "Quiz data loaded: {} questions ({} skipped)",
            report.loaded,
            report.skipped
        );
        report
    }

    /// Alias of [`QuestionCatalog::load`] for the reload-on-demand path.
    pub async fn reload(&self) -> LoadReport {
        self.load().await
    }

    fn snapshot(&self) -> Arc<QuestionPool> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Arc<Question>> {
        self.snapshot().questions.iter().find(|q| q.id == id).cloned()
    }

    /// Picks a question uniformly among those matching every given filter
    /// (case-insensitive). `None` when nothing matches.
    pub fn select_random(
        &self,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Option<Arc<Question>> {
        self.select_random_with(&mut rand::rng(), category, difficulty)
    }

    pub fn select_random_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Option<Arc<Question>> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let difficulty = difficulty.map(str::trim).filter(|d| !d.is_empty());

        let pool = self.snapshot();
        let eligible: Vec<&Arc<Question>> = pool
            .questions
            .iter()
            .filter(|q| category.is_none_or(|c| q.category.to_lowercase() == c.to_lowercase()))
            .filter(|q| {
                difficulty.is_none_or(|d| q.difficulty.to_lowercase() == d.to_lowercase())
            })
            .collect();

        eligible.choose(rng).map(|q| Arc::clone(*q))
    }

    pub fn difficulty_points(&self, tier: &str) -> u32 {
        difficulty_points(tier)
    }

    /// Categories declared by the data file, or the configured table when the
    /// file declares none.
    pub fn categories(&self) -> Vec<Category> {
        let pool = self.snapshot();
        if pool.categories.is_empty() {
            return CATEGORIES
                .iter()
                .map(|(name, description)| Category {
                    name: name.to_string(),
                    description: Some(description.to_string()),
                })
                .collect();
        }

        pool.categories
            .iter()
            .map(|name| Category {
                name: name.clone(),
                description: CATEGORIES
                    .iter()
                    .find(|(known, _)| known.eq_ignore_ascii_case(name))
                    .map(|(_, d)| d.to_string()),
            })
            .collect()
    }

    /// Autocomplete: categories containing `query`, case-insensitively.
    pub fn suggest_categories(&self, query: &str) -> Vec<Category> {
        let query = query.trim().to_lowercase();
        self.categories()
            .into_iter()
            .filter(|c| c.name.to_lowercase().contains(&query))
            .take(MAX_CATEGORY_SUGGESTIONS)
            .collect()
    }
}

/// Validates raw records, dropping malformed ones and duplicate ids.
fn build_pool(file: QuizFile) -> (QuestionPool, LoadReport) {
    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(file.quiz.questions.len());
    let mut skipped = 0;

    for raw in file.quiz.questions {
        let question: Question = match serde_json::from_value(raw) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!("Skipping unreadable question record: {}", e);
                skipped += 1;
                continue;
            }
        };

        if let Err(e) = question.validate() {
            tracing::warn!("Skipping invalid question {}: {}", question.id, e);
            skipped += 1;
            continue;
        }

        if !seen.insert(question.id.clone()) {
            tracing::warn!("Skipping duplicate question id {}", question.id);
            skipped += 1;
            continue;
        }

        questions.push(Arc::new(question));
    }

    let report = LoadReport {
        loaded: questions.len(),
        skipped,
        warning: None,
    };

    (
        QuestionPool {
            questions,
            categories: file.quiz.categories,
        },
        report,
    )
}
