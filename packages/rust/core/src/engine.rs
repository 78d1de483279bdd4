//! The merge-upsert engine.
//!
//! A parse item either seeds a brand-new record or merges into an
//! existing one. Merging runs the record type's fixed stage list: the
//! first stage sees the incoming fields flattened and compacted, every
//! later stage sees the document as the previous stage left it in the
//! store, and each stage's update applies atomically. There is no
//! rollback; a conflict mid-merge surfaces as an error on an already
//! partially advanced document.

use serde_json::Value;

use parldata_records::{model, schema};
use parldata_shared::{ParldataError, ParseItem, Result};
use parldata_storage::Store;

/// What the engine did with one parse item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Merged,
}

pub struct MergeEngine<'a> {
    store: &'a Store,
}

impl<'a> MergeEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Upsert one parse item under its derived identity.
    pub async fn insert(&self, item: &ParseItem) -> Result<Outcome> {
        let model = model(item.kind);
        let id = model.identity(&item.fields)?;

        if self.store.get_record(item.kind, &id).await?.is_none() {
            let doc = model.seed(&item.fields)?;
            self.store.put_record(item.kind, &id, &doc).await?;
            tracing::debug!(kind = %item.kind, id, "record inserted");
            return Ok(Outcome::Inserted);
        }

        let mut stage_input: Value =
            schema::to_flat_object(schema::compact(schema::flatten(&item.fields)));
        for stage in model.stages() {
            let update = stage(&stage_input);
            stage_input = self
                .store
                .update_record(item.kind, &id, &update)
                .await?
                .ok_or_else(|| {
                    ParldataError::merge_conflict(format!(
                        "{} record {id:?} vanished mid-merge",
                        item.kind
                    ))
                })?;
        }
        model.schema.check_required(&stage_input)?;
        tracing::debug!(kind = %item.kind, id, "record merged");
        Ok(Outcome::Merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parldata_shared::RecordKind;
    use serde_json::json;
    use uuid::Uuid;

    async fn test_store() -> Store {
        let tmp = std::env::temp_dir().join(format!("pd_test_{}.db", Uuid::now_v7()));
        Store::open(&tmp).await.expect("open test db")
    }

    fn bill(source: &str, title: &str) -> ParseItem {
        ParseItem::new(
            RecordKind::Bill,
            json!({
                "_sources": [source],
                "identifier": "23.01.055.123-2014",
                "title": title,
            }),
        )
    }

    #[tokio::test]
    async fn first_insert_seeds_from_the_template() {
        let store = test_store().await;
        let engine = MergeEngine::new(&store);

        let outcome = engine
            .insert(&bill("http://example.org/a", "Ο περί Εταιρειών Νόμος"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Inserted);

        let doc = store
            .get_record(RecordKind::Bill, "23.01.055.123-2014")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["actions"], json!([]));
        assert_eq!(doc["titles"], json!(["Ο περί Εταιρειών Νόμος"]));
    }

    #[tokio::test]
    async fn merge_unions_sources_and_elects_the_title() {
        let store = test_store().await;
        let engine = MergeEngine::new(&store);

        engine
            .insert(&bill("http://example.org/a", "Ο περί Εταιρειών Νόμος"))
            .await
            .unwrap();
        let outcome = engine
            .insert(&bill(
                "http://example.org/b",
                "Ο περί Εταιρειών (Τροποποιητικός) Νόμος",
            ))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Merged);

        let doc = store
            .get_record(RecordKind::Bill, "23.01.055.123-2014")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["_sources"], json!(["http://example.org/a", "http://example.org/b"]));
        assert_eq!(doc["title"], json!("Ο περί Εταιρειών (Τροποποιητικός) Νόμος"));
        assert_eq!(doc["titles"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replaying_an_item_changes_nothing() {
        let store = test_store().await;
        let engine = MergeEngine::new(&store);
        let item = bill("http://example.org/a", "Ο περί Εταιρειών Νόμος");

        engine.insert(&item).await.unwrap();
        engine.insert(&item).await.unwrap();
        let once = store
            .get_record(RecordKind::Bill, "23.01.055.123-2014")
            .await
            .unwrap();
        engine.insert(&item).await.unwrap();
        let twice = store
            .get_record(RecordKind::Bill, "23.01.055.123-2014")
            .await
            .unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn merge_order_does_not_change_the_outcome() {
        let a = bill("http://example.org/a", "Ο περί Εταιρειών Νόμος");
        let b = bill("http://example.org/b", "Ο περί Εταιρειών (Τροποποιητικός) Νόμος");

        let store_ab = test_store().await;
        let engine = MergeEngine::new(&store_ab);
        engine.insert(&a).await.unwrap();
        engine.insert(&b).await.unwrap();
        // Run each stream to its settled state
        engine.insert(&a).await.unwrap();
        engine.insert(&b).await.unwrap();
        let doc_ab = store_ab
            .get_record(RecordKind::Bill, "23.01.055.123-2014")
            .await
            .unwrap();

        let store_ba = test_store().await;
        let engine = MergeEngine::new(&store_ba);
        engine.insert(&b).await.unwrap();
        engine.insert(&a).await.unwrap();
        engine.insert(&b).await.unwrap();
        engine.insert(&a).await.unwrap();
        let doc_ba = store_ba
            .get_record(RecordKind::Bill, "23.01.055.123-2014")
            .await
            .unwrap();

        assert_eq!(doc_ab, doc_ba);
    }

    #[tokio::test]
    async fn invalid_seed_is_a_validation_error() {
        let store = test_store().await;
        let engine = MergeEngine::new(&store);
        let item = ParseItem::new(
            RecordKind::Bill,
            json!({"_sources": ["http://example.org/a"], "identifier": "x"}),
        );
        let err = engine.insert(&item).await.unwrap_err();
        assert!(err.is_per_document());
    }
}
