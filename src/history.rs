//! Conversation history: named `Turn` records grouped into sessions,
//! stored in sqlite. History is owned here and passed by reference into
//! the chain, which is stateless across calls.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::core::errors::ApiError;

const SCHEMA_VERSION: i64 = 1;
pub const DEFAULT_SESSION_ID: &str = "default";
const DEFAULT_SESSION_TITLE: &str = "Support Chat";
const MAX_HISTORY_LIMIT: i64 = 1000;
const MAX_TITLE_LEN: usize = 160;

/// One question/answer exchange.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub turn_count: i64,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), ApiError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        if version != SCHEMA_VERSION {
            self.rebuild_schema().await?;
        }

        Ok(())
    }

    async fn rebuild_schema(&self) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DROP TABLE IF EXISTS turns")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        sqlx::query("DROP TABLE IF EXISTS sessions")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "\
            CREATE TABLE sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL CHECK(length(trim(title)) > 0),
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "\
            CREATE TABLE turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX idx_sessions_updated_at ON sessions(updated_at DESC)")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        sqlx::query("CREATE INDEX idx_turns_session_id_id ON turns(session_id, id)")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("INSERT INTO sessions (id, title) VALUES (?1, ?2)")
            .bind(DEFAULT_SESSION_ID)
            .bind(DEFAULT_SESSION_TITLE)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        let pragma = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
        sqlx::query(&pragma)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
        let rows = sqlx::query(
            "\
            SELECT s.id, s.title, s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM turns WHERE session_id = s.id) as turn_count,
                   (SELECT question FROM turns WHERE session_id = s.id ORDER BY id DESC LIMIT 1) as last_question
            FROM sessions s
            ORDER BY s.updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(session_info_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::internal)
    }

    pub async fn create_session(&self, title: Option<String>) -> Result<String, ApiError> {
        let session_id = Uuid::new_v4().to_string();
        let title = normalize_title(title);

        sqlx::query("INSERT INTO sessions (id, title) VALUES (?1, ?2)")
            .bind(&session_id)
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(session_id)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionDetail>, ApiError> {
        let row =
            sqlx::query("SELECT id, title, created_at, updated_at FROM sessions WHERE id = ?1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        row.map(session_detail_from_row)
            .transpose()
            .map_err(ApiError::internal)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    /// Turns for a session in chronological order, capped at `limit`
    /// most recent.
    pub async fn get_history(&self, session_id: &str, limit: i64) -> Result<Vec<Turn>, ApiError> {
        let limit = sanitize_limit(limit);

        let rows = sqlx::query(
            "\
            SELECT question, answer, created_at
            FROM (
                SELECT id, question, answer, created_at
                FROM turns
                WHERE session_id = ?1
                ORDER BY id DESC
                LIMIT ?2
            )
            ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(turn_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::internal)
    }

    /// Append a completed question/answer exchange. Creates the session
    /// when it does not exist yet.
    pub async fn append_turn(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        ensure_session(&mut tx, session_id).await?;

        sqlx::query("INSERT INTO turns (session_id, question, answer) VALUES (?1, ?2, ?3)")
            .bind(session_id)
            .bind(question)
            .bind(answer)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        touch_session_tx(&mut tx, session_id).await?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    /// Drop every turn in the session but keep the session itself. A
    /// cleared session behaves exactly like a fresh one.
    pub async fn clear_session(&self, session_id: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM turns WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() as usize)
    }
}

fn session_info_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SessionInfo, sqlx::Error> {
    let last_question: Option<String> = row.try_get("last_question")?;
    let preview = last_question.unwrap_or_default().chars().take(100).collect();

    Ok(SessionInfo {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        turn_count: row.try_get("turn_count")?,
        preview,
    })
}

fn session_detail_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SessionDetail, sqlx::Error> {
    Ok(SessionDetail {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn turn_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Turn, sqlx::Error> {
    Ok(Turn {
        question: row.try_get("question")?,
        answer: row.try_get("answer")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn ensure_session(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
) -> Result<(), ApiError> {
    sqlx::query("INSERT OR IGNORE INTO sessions (id, title) VALUES (?1, ?2)")
        .bind(session_id)
        .bind(DEFAULT_SESSION_TITLE)
        .execute(&mut **tx)
        .await
        .map_err(ApiError::internal)?;
    Ok(())
}

async fn touch_session_tx(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE sessions SET updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
    )
    .bind(session_id)
    .execute(&mut **tx)
    .await
    .map_err(ApiError::internal)?;
    Ok(())
}

fn sanitize_limit(limit: i64) -> i64 {
    if limit <= 0 {
        return 1;
    }
    limit.min(MAX_HISTORY_LIMIT)
}

fn normalize_title(title: Option<String>) -> String {
    let fallback = || format!("Session {}", Utc::now().format("%Y-%m-%d %H:%M"));

    let Some(raw) = title else {
        return fallback();
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback();
    }

    trimmed.chars().take(MAX_TITLE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (HistoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.db"))
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn append_and_get_round_trip_in_order() {
        let (store, _dir) = test_store().await;

        store
            .append_turn("default", "first question", "first answer")
            .await
            .unwrap();
        store
            .append_turn("default", "second question", "second answer")
            .await
            .unwrap();

        let turns = store.get_history("default", 100).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].question, "first question");
        assert_eq!(turns[0].answer, "first answer");
        assert_eq!(turns[1].question, "second question");
    }

    #[tokio::test]
    async fn append_creates_unknown_session() {
        let (store, _dir) = test_store().await;

        store.append_turn("s-unknown", "q", "a").await.unwrap();
        let session = store.get_session("s-unknown").await.unwrap();
        assert!(session.is_some());
    }

    #[tokio::test]
    async fn cleared_session_equals_fresh_session() {
        let (store, _dir) = test_store().await;

        store.append_turn("default", "q1", "a1").await.unwrap();
        store.append_turn("default", "q2", "a2").await.unwrap();

        let deleted = store.clear_session("default").await.unwrap();
        assert_eq!(deleted, 2);

        let turns = store.get_history("default", 100).await.unwrap();
        assert!(turns.is_empty());

        // Session itself survives the clear.
        assert!(store.get_session("default").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_list_delete_sessions() {
        let (store, _dir) = test_store().await;

        let id = store
            .create_session(Some("Returns questions".to_string()))
            .await
            .unwrap();
        store.append_turn(&id, "q", "a").await.unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert!(sessions.iter().any(|s| s.id == id && s.turn_count == 1));

        assert!(store.delete_session(&id).await.unwrap());
        assert!(store.get_session(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_limit_keeps_most_recent() {
        let (store, _dir) = test_store().await;

        for i in 0..5 {
            store
                .append_turn("default", &format!("q{i}"), &format!("a{i}"))
                .await
                .unwrap();
        }

        let turns = store.get_history("default", 2).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].question, "q3");
        assert_eq!(turns[1].question, "q4");
    }
}
