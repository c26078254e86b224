//! Test session repositories.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use tokio::sync::RwLock;
use tokio_rusqlite::Connection;

use avp_protocols::{ProtocolError, TestSession, TestSessionRepository, TestSessionStatus};

use crate::schema::init_schema;

/// Write access to test session rows.
#[async_trait]
pub trait TestSessionStore: TestSessionRepository {
    /// Insert or replace a session.
    async fn insert_session(&self, session: &TestSession) -> Result<(), ProtocolError>;
}

/// In-memory session repository preserving insertion order.
pub struct MemoryTestSessionRepository {
    sessions: RwLock<Vec<TestSession>>,
}

impl MemoryTestSessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
        }
    }

    /// Insert a session, replacing any with the same ID.
    pub async fn insert(&self, session: TestSession) {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => sessions.push(session),
        }
    }
}

impl Default for MemoryTestSessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestSessionRepository for MemoryTestSessionRepository {
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<TestSession>, ProtocolError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<TestSession>, ProtocolError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.iter().find(|s| s.id == session_id).cloned())
    }
}

#[async_trait]
impl TestSessionStore for MemoryTestSessionRepository {
    async fn insert_session(&self, session: &TestSession) -> Result<(), ProtocolError> {
        self.insert(session.clone()).await;
        Ok(())
    }
}

/// SQLite-backed session repository.
pub struct SqliteTestSessionRepository {
    conn: Connection,
}

impl SqliteTestSessionRepository {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, ProtocolError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| ProtocolError::StorageError(e.to_string()))?;
        Self::with_connection(conn).await
    }

    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(path)
            .await
            .map_err(|e| ProtocolError::StorageError(e.to_string()))?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, ProtocolError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| ProtocolError::QueryError(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TestSessionStore for SqliteTestSessionRepository {
    async fn insert_session(&self, session: &TestSession) -> Result<(), ProtocolError> {
        let session = session.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO test_sessions (id, project_id, video_id, name, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        session.id,
                        session.project_id,
                        session.video_id,
                        session.name,
                        session.status.as_str(),
                        session.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| ProtocolError::QueryError(e.to_string()))
    }
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        Box::new(ProtocolError::InvalidData(message)),
    )
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<TestSession> {
    let status: String = row.get(4)?;
    let created: String = row.get(5)?;

    let status = TestSessionStatus::parse(&status)
        .ok_or_else(|| conversion_error(4, format!("unknown session status '{}'", status)))?;
    let created_at = DateTime::parse_from_rfc3339(&created)
        .map_err(|e| conversion_error(5, format!("bad created_at '{}': {}", created, e)))?
        .with_timezone(&Utc);

    Ok(TestSession {
        id: row.get(0)?,
        project_id: row.get(1)?,
        video_id: row.get(2)?,
        name: row.get(3)?,
        status,
        created_at,
    })
}

#[async_trait]
impl TestSessionRepository for SqliteTestSessionRepository {
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<TestSession>, ProtocolError> {
        let project_id = project_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, video_id, name, status, created_at
                     FROM test_sessions WHERE project_id = ?1 ORDER BY rowid",
                )?;
                let sessions = stmt
                    .query_map([&project_id], row_to_session)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(sessions)
            })
            .await
            .map_err(|e| ProtocolError::QueryError(e.to_string()))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<TestSession>, ProtocolError> {
        let session_id = session_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, video_id, name, status, created_at
                     FROM test_sessions WHERE id = ?1",
                )?;
                match stmt.query_row([&session_id], row_to_session) {
                    Ok(session) => Ok(Some(session)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(|e| ProtocolError::QueryError(e.to_string()))
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
