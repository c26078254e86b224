//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Initialize the test session schema.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS test_sessions (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    video_id TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'created',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_test_sessions_project ON test_sessions(project_id);
CREATE INDEX IF NOT EXISTS idx_test_sessions_created ON test_sessions(created_at);
"#;
