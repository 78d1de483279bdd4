//! Name directory loading.
//!
//! Built once when a task that resolves names starts up, from the member
//! collection, and passed by reference into the parsing code.

use parldata_shared::Result;
use parldata_storage::Store;
use parldata_text::{NameDirectory, NameEntry};

/// Load every canonical member name plus its recorded Greek-script
/// alternates into a directory.
pub async fn load_name_directory(store: &Store) -> Result<NameDirectory> {
    let entries = store
        .mp_names()
        .await?
        .into_iter()
        .map(|(canonical, alternates)| NameEntry::with_alternates(canonical, alternates));
    NameDirectory::build(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parldata_shared::RecordKind;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn directory_reflects_the_member_collection() {
        let tmp = std::env::temp_dir().join(format!("pd_test_{}.db", Uuid::now_v7()));
        let store = Store::open(&tmp).await.expect("open test db");

        store
            .put_record(
                RecordKind::Mp,
                "omiroy-giannakis",
                &json!({"name": {"el": "Ομήρου Γιαννάκης", "en": null}, "other_names": []}),
            )
            .await
            .unwrap();
        store
            .put_record(
                RecordKind::Mp,
                "mayronikola-royla",
                &json!({
                    "name": {"el": "Μαυρονικόλα Ρούλα", "en": null},
                    "other_names": [
                        {"name": "Μαυρονικόλα Ρούλλα",
                         "note": "Alternative spelling (el-Grek)"},
                    ],
                }),
            )
            .await
            .unwrap();

        let directory = load_name_directory(&store).await.expect("load directory");
        assert_eq!(directory.len(), 3);
        assert_eq!(
            directory.match_declined("Ρούλλας Μαυρονικόλα").unwrap().as_deref(),
            Some("Μαυρονικόλα Ρούλα")
        );
    }
}
