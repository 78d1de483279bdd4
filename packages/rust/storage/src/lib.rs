//! libSQL storage layer.
//!
//! The [`Store`] struct wraps a libSQL database holding the record
//! collections, the write-once fetch caches, and task run history.
//! Documents are stored as canonical JSON text: object keys are
//! recursively sorted on serialization, so byte equality of the stored
//! form is value equality of the document.

pub mod cache;
mod migrations;

pub use cache::form_key;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use serde_json::Value;
use uuid::Uuid;

use parldata_records::{UpdateDoc, apply_update, get_path};
use parldata_shared::{ParldataError, RecordKind, Result};

/// One row of the task run history. `finished_at` stays empty only while
/// the run is in flight.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub id: String,
    pub task: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Store {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Store {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ParldataError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    ParldataError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // -----------------------------------------------------------------------
    // Record operations
    // -----------------------------------------------------------------------

    /// Get a record by collection and id.
    pub async fn get_record(&self, kind: RecordKind, id: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query(
                "SELECT doc FROM records WHERE collection = ?1 AND id = ?2",
                params![kind.collection(), id],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let doc: String = row
                    .get(0)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?;
                let value = serde_json::from_str(&doc)
                    .map_err(|e| ParldataError::Storage(format!("corrupt document: {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ParldataError::Storage(e.to_string())),
        }
    }

    /// Insert or replace a record wholesale.
    pub async fn put_record(&self, kind: RecordKind, id: &str, doc: &Value) -> Result<()> {
        let body = serde_json::to_string(doc)
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO records (collection, id, doc, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET
                   doc = excluded.doc,
                   updated_at = excluded.updated_at",
                params![kind.collection(), id, body.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Read, apply one batched update, and write back the record, all
    /// inside a transaction. Returns the post-update document, or `None`
    /// if the record does not exist.
    pub async fn update_record(
        &self,
        kind: RecordKind,
        id: &str,
        update: &UpdateDoc,
    ) -> Result<Option<Value>> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let mut rows = tx
            .query(
                "SELECT doc FROM records WHERE collection = ?1 AND id = ?2",
                params![kind.collection(), id],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let existing = match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map_err(|e| ParldataError::Storage(e.to_string()))?,
            Ok(None) => return Ok(None),
            Err(e) => return Err(ParldataError::Storage(e.to_string())),
        };
        drop(rows);

        let mut doc: Value = serde_json::from_str(&existing)
            .map_err(|e| ParldataError::Storage(format!("corrupt document: {e}")))?;
        apply_update(&mut doc, update)?;

        let body = serde_json::to_string(&doc)
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE records SET doc = ?1, updated_at = ?2
             WHERE collection = ?3 AND id = ?4",
            params![body.as_str(), now.as_str(), kind.collection(), id],
        )
        .await
        .map_err(|e| ParldataError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        Ok(Some(doc))
    }

    /// Number of records in a collection.
    pub async fn count_records(&self, kind: RecordKind) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM records WHERE collection = ?1",
                params![kind.collection()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) as u64),
            _ => Ok(0),
        }
    }

    /// All record ids in a collection, in id order.
    pub async fn record_ids(&self, kind: RecordKind) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM records WHERE collection = ?1 ORDER BY id",
                params![kind.collection()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(
                row.get::<String>(0)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
            );
        }
        Ok(results)
    }

    /// Canonical member names plus their recorded Greek-script alternate
    /// spellings, for building the name directory at task startup.
    pub async fn mp_names(&self) -> Result<Vec<(String, Vec<String>)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT doc FROM records WHERE collection = ?1 ORDER BY id",
                params![RecordKind::Mp.collection()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let body: String = row
                .get(0)
                .map_err(|e| ParldataError::Storage(e.to_string()))?;
            let doc: Value = serde_json::from_str(&body)
                .map_err(|e| ParldataError::Storage(format!("corrupt document: {e}")))?;

            let Some(canonical) = get_path(&doc, "name.el").and_then(Value::as_str) else {
                continue;
            };
            let alternates: Vec<String> = doc
                .get("other_names")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter(|entry| {
                            entry
                                .get("note")
                                .and_then(Value::as_str)
                                .is_some_and(|note| note.contains("el-Grek"))
                        })
                        .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            results.push((canonical.to_string(), alternates));
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Task run operations
    // -----------------------------------------------------------------------

    /// Insert a new task run. Returns the generated run ID.
    pub async fn insert_task_run(&self, task: &str) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO task_runs (id, task, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), task, now.as_str()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Look up one task run by id.
    pub async fn task_run(&self, run_id: &str) -> Result<Option<TaskRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, task, started_at, finished_at, stats_json
                 FROM task_runs WHERE id = ?1",
                params![run_id],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(TaskRun {
                id: row
                    .get(0)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
                task: row
                    .get(1)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
                started_at: row
                    .get(2)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
                finished_at: text_or_null(&row, 3)?,
                stats_json: text_or_null(&row, 4)?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(ParldataError::Storage(e.to_string())),
        }
    }

    /// All recorded runs of one task, oldest first.
    pub async fn task_runs(&self, task: &str) -> Result<Vec<TaskRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, task, started_at, finished_at, stats_json
                 FROM task_runs WHERE task = ?1 ORDER BY started_at, id",
                params![task],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(TaskRun {
                id: row
                    .get(0)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
                task: row
                    .get(1)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
                started_at: row
                    .get(2)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
                finished_at: text_or_null(&row, 3)?,
                stats_json: text_or_null(&row, 4)?,
            });
        }
        Ok(results)
    }

    /// Update a task run with completion data.
    pub async fn finish_task_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE task_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        Ok(())
    }
}

fn text_or_null(row: &libsql::Row, index: i32) -> Result<Option<String>> {
    match row
        .get_value(index)
        .map_err(|e| ParldataError::Storage(e.to_string()))?
    {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(text) => Ok(Some(text)),
        other => Err(ParldataError::Storage(format!(
            "unexpected column value: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    /// Create a temp file store for testing.
    async fn test_store() -> Store {
        let tmp = std::env::temp_dir().join(format!("pd_test_{}.db", Uuid::now_v7()));
        Store::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("pd_test_{}.db", Uuid::now_v7()));
        let _s1 = Store::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Store::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn record_roundtrip_and_count() {
        let store = test_store().await;
        let doc = json!({"identifier": "x", "title": "y"});

        store
            .put_record(RecordKind::Bill, "x", &doc)
            .await
            .expect("put record");
        let found = store
            .get_record(RecordKind::Bill, "x")
            .await
            .expect("get record");
        assert_eq!(found, Some(doc));

        assert_eq!(store.count_records(RecordKind::Bill).await.unwrap(), 1);
        assert_eq!(store.count_records(RecordKind::Mp).await.unwrap(), 0);
        assert_eq!(
            store.record_ids(RecordKind::Bill).await.unwrap(),
            vec!["x".to_string()]
        );
    }

    #[tokio::test]
    async fn update_record_applies_in_place() {
        let store = test_store().await;
        store
            .put_record(RecordKind::Bill, "x", &json!({"_sources": ["a"], "title": "t"}))
            .await
            .unwrap();

        let update = UpdateDoc::new().add_to_set("_sources", [json!("a"), json!("b")]);
        let updated = store
            .update_record(RecordKind::Bill, "x", &update)
            .await
            .expect("update")
            .expect("record exists");
        assert_eq!(updated["_sources"], json!(["a", "b"]));

        // The write is visible to subsequent reads
        let found = store.get_record(RecordKind::Bill, "x").await.unwrap();
        assert_eq!(found, Some(updated));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_none() {
        let store = test_store().await;
        let update = UpdateDoc::new().set("title", json!("t"));
        let result = store
            .update_record(RecordKind::Bill, "nope", &update)
            .await
            .expect("update");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn mp_names_include_greek_alternates() {
        let store = test_store().await;
        store
            .put_record(
                RecordKind::Mp,
                "mayronikola-royla",
                &json!({
                    "name": {"el": "Μαυρονικόλα Ρούλα", "en": null},
                    "other_names": [
                        {"name": "Μαυρονικόλα Ρούλλα",
                         "note": "Alternative spelling (el-Grek)"},
                        {"name": "Mavronicola Roula",
                         "note": "Romanization (en-Latn)"},
                    ],
                }),
            )
            .await
            .unwrap();

        let names = store.mp_names().await.expect("mp names");
        assert_eq!(
            names,
            vec![(
                "Μαυρονικόλα Ρούλα".to_string(),
                vec!["Μαυρονικόλα Ρούλλα".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn task_run_lifecycle() {
        let store = test_store().await;
        let run_id = store.insert_task_run("plenary_agendas").await.expect("insert run");
        assert!(!run_id.is_empty());

        let open = store.task_run(&run_id).await.unwrap().expect("run recorded");
        assert_eq!(open.task, "plenary_agendas");
        assert_eq!(open.finished_at, None);
        assert_eq!(open.stats_json, None);

        store
            .finish_task_run(&run_id, r#"{"inserted": 10}"#)
            .await
            .expect("finish run");
        let finished = store.task_run(&run_id).await.unwrap().expect("run recorded");
        assert!(finished.finished_at.is_some());
        assert_eq!(finished.stats_json.as_deref(), Some(r#"{"inserted": 10}"#));

        assert!(store.task_run("nope").await.unwrap().is_none());

        let history = store.task_runs("plenary_agendas").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, run_id);
        assert!(store.task_runs("bills").await.unwrap().is_empty());
    }
}
