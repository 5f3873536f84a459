// src/services/score_store.rs

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::{
    models::score::ScoreRecord,
    services::ledger::{LedgerError, ScoreStore},
    utils::fs::{read_json_file, write_json_atomic},
};

/// Score file contents. Older files map user id to points in a plain object;
/// those load in the order the keys appear in the file (first-seen order) and
/// are rewritten as a list on the next write.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreFile {
    Records(Vec<ScoreRecord>),
    Legacy(serde_json::Map<String, serde_json::Value>),
}

impl TryFrom<ScoreFile> for Vec<ScoreRecord> {
    type Error = serde_json::Error;

    fn try_from(file: ScoreFile) -> Result<Self, Self::Error> {
        match file {
            ScoreFile::Records(records) => Ok(records),
            ScoreFile::Legacy(map) => map
                .into_iter()
                .map(|(user_id, score)| {
                    Ok(ScoreRecord {
                        user_id,
                        score: serde_json::from_value(score)?,
                    })
                })
                .collect(),
        }
    }
}

fn add_points(records: &mut Vec<ScoreRecord>, user_id: &str, points: u32) -> i64 {
    match records.iter_mut().find(|r| r.user_id == user_id) {
        Some(record) => {
            record.score += i64::from(points);
            record.score
        }
        None => {
            records.push(ScoreRecord {
                user_id: user_id.to_string(),
                score: i64::from(points),
            });
            i64::from(points)
        }
    }
}

/// Scores kept in a JSON file as an ordered list of records.
///
/// The file is read once and cached. Every `add` writes the whole list
/// atomically; the cache only changes after the write is on disk.
pub struct JsonFileScoreStore {
    path: PathBuf,
    cache: Mutex<Option<Vec<ScoreRecord>>>,
}

impl JsonFileScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    async fn read_records(&self) -> Result<Vec<ScoreRecord>, LedgerError> {
        let file: Option<ScoreFile> = read_json_file(&self.path).await?;
        let records = file
            .map(Vec::try_from)
            .transpose()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(records.unwrap_or_default())
    }
}

#[async_trait]
impl ScoreStore for JsonFileScoreStore {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, LedgerError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.score))
    }

    async fn add(&self, user_id: &str, points: u32) -> Result<i64, LedgerError> {
        let mut cache = self.cache.lock().await;
        let mut next = match cache.as_ref() {
            Some(records) => records.clone(),
            None => self.read_records().await?,
        };

        let total = add_points(&mut next, user_id, points);
        write_json_atomic(&self.path, &next).await?;
        *cache = Some(next);

        Ok(total)
    }

    async fn all(&self) -> Result<Vec<ScoreRecord>, LedgerError> {
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.as_ref() {
            return Ok(records.clone());
        }

        let records = self.read_records().await?;
        *cache = Some(records.clone());
        Ok(records)
    }
}

/// Scores in the `quiz_scores` table. Each add is a single upsert, so the
/// database is the unit of atomicity.
#[derive(Clone)]
pub struct PgScoreStore {
    pool: PgPool,
}

impl PgScoreStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreStore for PgScoreStore {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, LedgerError> {
        let score = sqlx::query_scalar::<_, i64>("SELECT score FROM quiz_scores WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(score)
    }

    async fn add(&self, user_id: &str, points: u32) -> Result<i64, LedgerError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quiz_scores (user_id, score)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                score = quiz_scores.score + EXCLUDED.score,
                updated_at = NOW()
            RETURNING score
            "#,
        )
        .bind(user_id)
        .bind(i64::from(points))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert score for {}: {:?}", user_id, e);
            e
        })?;
        Ok(total)
    }

    async fn all(&self) -> Result<Vec<ScoreRecord>, LedgerError> {
        let records = sqlx::query_as::<_, ScoreRecord>(
            "SELECT user_id, score FROM quiz_scores ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

/// Non-durable store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryScoreStore {
    records: Mutex<Vec<ScoreRecord>>,
}

impl MemoryScoreStore {
    pub fn with_records(records: Vec<ScoreRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, LedgerError> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.user_id == user_id).map(|r| r.score))
    }

    async fn add(&self, user_id: &str, points: u32) -> Result<i64, LedgerError> {
        let mut records = self.records.lock().await;
        Ok(add_points(&mut records, user_id, points))
    }

    async fn all(&self) -> Result<Vec<ScoreRecord>, LedgerError> {
        Ok(self.records.lock().await.clone())
    }
}
