//! DuckDB persistence for pipeline runs and vulnerability reports.

use crate::report::{Report, RunKey};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use sweep_core::CodeChunk;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS pipeline_runs (
    repo_id VARCHAR NOT NULL,
    user_id VARCHAR NOT NULL,
    github_id VARCHAR NOT NULL,
    repo_name VARCHAR NOT NULL,
    repo_path VARCHAR NOT NULL,
    total_chunks INTEGER NOT NULL,
    chunks_json VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL,
    PRIMARY KEY (repo_id, user_id, github_id)
);

CREATE TABLE IF NOT EXISTS vulnerability_reports (
    repo_id VARCHAR NOT NULL,
    user_id VARCHAR NOT NULL,
    github_id VARCHAR NOT NULL,
    report_json VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL,
    PRIMARY KEY (repo_id, user_id, github_id)
);
";

/// Persistence seam for runs and reports.
pub trait ReportStore: Send + Sync {
    /// Insert or replace the chunk listing for a run, preserving
    /// `created_at` across upserts.
    fn upsert_run(
        &self,
        key: &RunKey,
        repo_name: &str,
        repo_path: &str,
        chunks: &[CodeChunk],
    ) -> Result<(), StoreError>;

    /// Chunks saved for a run, or `None` when the run was never recorded.
    fn get_run_chunks(&self, key: &RunKey) -> Result<Option<Vec<CodeChunk>>, StoreError>;

    /// Insert or replace a report, preserving `created_at` across upserts.
    fn upsert_report(&self, report: &Report) -> Result<(), StoreError>;

    fn get_report(&self, key: &RunKey) -> Result<Option<Report>, StoreError>;
}

/// Single-connection DuckDB store. The connection is shared behind a mutex;
/// all writers serialize through it.
pub struct DuckStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        debug!("opened report store at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.acquire_conn().execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn acquire_conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("store mutex poisoned, recovering connection");
                poisoned.into_inner()
            }
        }
    }

    fn existing_created_at(
        conn: &Connection,
        table: &str,
        key: &RunKey,
    ) -> Result<Option<String>, duckdb::Error> {
        let sql = format!(
            "SELECT created_at FROM {table} WHERE repo_id = ? AND user_id = ? AND github_id = ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt
            .query_row(params![key.repo_id, key.user_id, key.github_id], |row| {
                row.get::<_, String>(0)
            })
            .ok())
    }
}

impl ReportStore for DuckStore {
    fn upsert_run(
        &self,
        key: &RunKey,
        repo_name: &str,
        repo_path: &str,
        chunks: &[CodeChunk],
    ) -> Result<(), StoreError> {
        let chunks_json = serde_json::to_string(chunks)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.acquire_conn();

        if let Some(created_at) = Self::existing_created_at(&conn, "pipeline_runs", key)? {
            conn.execute(
                "UPDATE pipeline_runs
                 SET repo_name = ?, repo_path = ?, total_chunks = ?, chunks_json = ?,
                     created_at = ?, updated_at = ?
                 WHERE repo_id = ? AND user_id = ? AND github_id = ?",
                params![
                    repo_name,
                    repo_path,
                    chunks.len() as i64,
                    chunks_json,
                    created_at,
                    now,
                    key.repo_id,
                    key.user_id,
                    key.github_id
                ],
            )?;
        } else {
            conn.execute(
                "INSERT INTO pipeline_runs
                 (repo_id, user_id, github_id, repo_name, repo_path, total_chunks, chunks_json,
                  created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    key.repo_id,
                    key.user_id,
                    key.github_id,
                    repo_name,
                    repo_path,
                    chunks.len() as i64,
                    chunks_json,
                    now,
                    now
                ],
            )?;
        }
        Ok(())
    }

    fn get_run_chunks(&self, key: &RunKey) -> Result<Option<Vec<CodeChunk>>, StoreError> {
        let conn = self.acquire_conn();
        let mut stmt = conn.prepare(
            "SELECT chunks_json FROM pipeline_runs
             WHERE repo_id = ? AND user_id = ? AND github_id = ?",
        )?;
        let json = stmt
            .query_row(params![key.repo_id, key.user_id, key.github_id], |row| {
                row.get::<_, String>(0)
            })
            .ok();
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn upsert_report(&self, report: &Report) -> Result<(), StoreError> {
        let now = Utc::now();
        let key = &report.key;
        let conn = self.acquire_conn();

        if let Some(created_at) = Self::existing_created_at(&conn, "vulnerability_reports", key)? {
            // The original created_at must survive inside the stored JSON
            // too, or read-back would surface the new run's timestamp.
            let mut preserved = report.clone();
            preserved.updated_at = now;
            if let Ok(original) = DateTime::parse_from_rfc3339(&created_at) {
                preserved.created_at = original.with_timezone(&Utc);
            }
            let report_json = serde_json::to_string(&preserved)?;
            conn.execute(
                "UPDATE vulnerability_reports
                 SET report_json = ?, updated_at = ?
                 WHERE repo_id = ? AND user_id = ? AND github_id = ?",
                params![
                    report_json,
                    now.to_rfc3339(),
                    key.repo_id,
                    key.user_id,
                    key.github_id
                ],
            )?;
        } else {
            let report_json = serde_json::to_string(report)?;
            conn.execute(
                "INSERT INTO vulnerability_reports
                 (repo_id, user_id, github_id, report_json, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    key.repo_id,
                    key.user_id,
                    key.github_id,
                    report_json,
                    report.created_at.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }

    fn get_report(&self, key: &RunKey) -> Result<Option<Report>, StoreError> {
        let conn = self.acquire_conn();
        let mut stmt = conn.prepare(
            "SELECT report_json FROM vulnerability_reports
             WHERE repo_id = ? AND user_id = ? AND github_id = ?",
        )?;
        let json = stmt
            .query_row(params![key.repo_id, key.user_id, key.github_id], |row| {
                row.get::<_, String>(0)
            })
            .ok();
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{aggregate_report, Finding, ScanResult, Severity};

    fn key() -> RunKey {
        RunKey {
            repo_id: "7".to_string(),
            user_id: "alice".to_string(),
            github_id: "gh-1".to_string(),
        }
    }

    fn sample_chunks() -> Vec<CodeChunk> {
        vec![CodeChunk {
            file_path: "src/app.py".to_string(),
            chunk_index: 1,
            start_line: 1,
            end_line: 5,
            annotated_text: "### FILE: src/app.py\n### LINES: 1-5\n# 1: x".to_string(),
        }]
    }

    fn sample_report() -> Report {
        let results = vec![ScanResult::completed(
            0,
            "src/app.py".to_string(),
            vec![Finding {
                vulnerability_type: "hardcoded secret".to_string(),
                severity: Severity::High,
                description: "d".to_string(),
                file_path: Some("src/app.py".to_string()),
                start_line: Some(3),
                cwe_id: Some("CWE-798".to_string()),
                ..Finding::default()
            }],
        )];
        aggregate_report(key(), "acme/demo", &results)
    }

    #[test]
    fn test_missing_rows_are_none() {
        let store = DuckStore::open_in_memory().unwrap();
        assert!(store.get_run_chunks(&key()).unwrap().is_none());
        assert!(store.get_report(&key()).unwrap().is_none());
    }

    #[test]
    fn test_run_roundtrip() {
        let store = DuckStore::open_in_memory().unwrap();
        store
            .upsert_run(&key(), "acme/demo", "/tmp/demo", &sample_chunks())
            .unwrap();

        let chunks = store.get_run_chunks(&key()).unwrap().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].file_path, "src/app.py");
        assert_eq!(chunks[0].end_line, 5);
    }

    #[test]
    fn test_report_roundtrip() {
        let store = DuckStore::open_in_memory().unwrap();
        store.upsert_report(&sample_report()).unwrap();

        let loaded = store.get_report(&key()).unwrap().unwrap();
        assert_eq!(loaded.total_vulnerabilities, 1);
        assert_eq!(loaded.severity_counts.high, 1);
        assert_eq!(loaded.key, key());
    }

    #[test]
    fn test_upsert_preserves_created_at() {
        let store = DuckStore::open_in_memory().unwrap();
        store
            .upsert_run(&key(), "acme/demo", "/tmp/demo", &sample_chunks())
            .unwrap();

        let created: String = {
            let conn = store.acquire_conn();
            let mut stmt = conn
                .prepare("SELECT created_at FROM pipeline_runs WHERE repo_id = ?")
                .unwrap();
            stmt.query_row(params!["7"], |row| row.get(0)).unwrap()
        };

        store.upsert_run(&key(), "acme/demo", "/tmp/demo", &[]).unwrap();

        let conn = store.acquire_conn();
        let mut stmt = conn
            .prepare("SELECT created_at, total_chunks FROM pipeline_runs WHERE repo_id = ?")
            .unwrap();
        let (created_after, total): (String, i64) = stmt
            .query_row(params!["7"], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!(created_after, created);
        assert_eq!(total, 0);
    }

    #[test]
    fn test_report_created_at_survives_second_upsert() {
        let store = DuckStore::open_in_memory().unwrap();

        let mut first = sample_report();
        first.created_at = Utc::now() - chrono::Duration::hours(5);
        first.updated_at = first.created_at;
        store.upsert_report(&first).unwrap();

        let second = sample_report();
        store.upsert_report(&second).unwrap();

        let loaded = store.get_report(&key()).unwrap().unwrap();
        assert_eq!(loaded.created_at, first.created_at);
        assert!(loaded.updated_at > loaded.created_at);
        assert_eq!(loaded.total_vulnerabilities, second.total_vulnerabilities);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.db");
        let store = DuckStore::open(&path).unwrap();
        store.upsert_report(&sample_report()).unwrap();
        assert!(store.get_report(&key()).unwrap().is_some());
    }
}
