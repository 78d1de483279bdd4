//! Write-once fetch caches.
//!
//! Text responses are keyed by the full request shape: URL, method, and
//! the canonical serialization of any form payload. Binary documents are
//! keyed by URL alone. Once a body is recorded for a key it is never
//! overwritten; concurrent duplicate first-fetches race to a single
//! winning row and the losers are discarded.

use std::collections::BTreeMap;

use chrono::Utc;
use libsql::params;
use sha2::{Digest, Sha256};

use parldata_shared::{ParldataError, Result};

use crate::Store;

/// The canonical cache key for a form payload: its JSON serialization,
/// key-sorted by construction, or the empty string for no payload.
pub fn form_key(form: Option<&BTreeMap<String, String>>) -> String {
    match form {
        Some(form) if !form.is_empty() => serde_json::to_string(form).unwrap_or_default(),
        _ => String::new(),
    }
}

impl Store {
    /// Look up a cached text body.
    pub async fn cached_text(
        &self,
        url: &str,
        method: &str,
        form_data: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT body FROM fetch_cache_text
                 WHERE url = ?1 AND method = ?2 AND form_data = ?3",
                params![url, method, form_data],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(ParldataError::Storage(e.to_string())),
        }
    }

    /// Record a text body. The first write for a key wins; later writes
    /// are no-ops.
    pub async fn store_text(
        &self,
        url: &str,
        method: &str,
        form_data: &str,
        body: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO fetch_cache_text (url, method, form_data, body, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![url, method, form_data, body, now.as_str()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Look up a cached binary payload.
    pub async fn cached_blob(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let mut rows = self
            .conn()
            .query(
                "SELECT payload FROM fetch_cache_blob WHERE url = ?1",
                params![url],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<Vec<u8>>(0)
                    .map_err(|e| ParldataError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(ParldataError::Storage(e.to_string())),
        }
    }

    /// Record a binary payload, first write wins.
    pub async fn store_blob(&self, url: &str, payload: &[u8]) -> Result<()> {
        let content_hash = format!("{:x}", Sha256::digest(payload));
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO fetch_cache_blob (url, payload, content_hash, fetched_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![url, payload.to_vec(), content_hash.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Drop every cached text body. Binary documents are retained; the
    /// source site republishes pages, not the documents they link to.
    pub async fn clear_text_cache(&self) -> Result<u64> {
        let dropped = self
            .conn()
            .execute("DELETE FROM fetch_cache_text", params![])
            .await
            .map_err(|e| ParldataError::Storage(e.to_string()))?;
        tracing::info!(dropped, "cleared text cache");
        Ok(dropped)
    }
}
