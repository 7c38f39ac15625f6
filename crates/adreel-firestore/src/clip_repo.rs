//! Clip asset library (read-only).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use adreel_models::ClipAsset;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{from_document, Document, FromFirestoreValue, Value};

/// Subcollection under `users/{uid}` holding clip assets.
pub const CLIP_ASSETS_COLLECTION: &str = "clip_assets";

const LIST_PAGE_SIZE: u32 = 300;

/// Read access to a user's raw clip library.
///
/// `list_clips` returns clips in library insertion order; the tag matcher
/// relies on that order to break ties.
#[async_trait]
pub trait ClipLibrary: Send + Sync {
    async fn list_clips(&self, user_id: &str) -> FirestoreResult<Vec<ClipAsset>>;

    async fn get_clip(&self, user_id: &str, clip_id: &str) -> FirestoreResult<Option<ClipAsset>>;
}

/// Firestore-backed clip library.
#[derive(Clone)]
pub struct FirestoreClipLibrary {
    client: FirestoreClient,
}

impl FirestoreClipLibrary {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn collection(user_id: &str) -> String {
        format!("users/{}/{}", user_id, CLIP_ASSETS_COLLECTION)
    }
}

fn document_to_clip(doc: &Document) -> FirestoreResult<ClipAsset> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::InvalidResponse("clip document has no name".into()))?;
    let mut clip: ClipAsset = match doc.field("id") {
        Some(_) => from_document(doc)?,
        None => {
            let mut with_id = doc.clone();
            with_id
                .fields
                .get_or_insert_with(Default::default)
                .insert("id".to_string(), Value::StringValue(id.to_string()));
            from_document(&with_id)?
        }
    };
    if clip.id.is_empty() {
        clip.id = id.to_string();
    }
    Ok(clip)
}

fn created_at(doc: &Document) -> Option<DateTime<Utc>> {
    doc.field("created_at")
        .and_then(DateTime::<Utc>::from_firestore_value)
        .or_else(|| {
            doc.create_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
        })
}

#[async_trait]
impl ClipLibrary for FirestoreClipLibrary {
    async fn list_clips(&self, user_id: &str) -> FirestoreResult<Vec<ClipAsset>> {
        let collection = Self::collection(user_id);
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .with_retry("list_clips", || {
                    self.client.list_documents(
                        &collection,
                        Some(LIST_PAGE_SIZE),
                        page_token.as_deref(),
                    )
                })
                .await?;
            docs.extend(page.documents.unwrap_or_default());
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        // Firestore lists by document id; restore insertion order
        docs.sort_by_key(created_at);
        docs.iter().map(document_to_clip).collect()
    }

    async fn get_clip(&self, user_id: &str, clip_id: &str) -> FirestoreResult<Option<ClipAsset>> {
        let collection = Self::collection(user_id);
        let doc = self
            .client
            .with_retry("get_clip", || self.client.get_document(&collection, clip_id))
            .await?;
        doc.as_ref().map(document_to_clip).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn clip_doc(id: &str, created: &str) -> Document {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::StringValue(format!("clip {id}")));
        fields.insert(
            "storage_key".to_string(),
            Value::StringValue(format!("u1/clips/{id}.mp4")),
        );
        fields.insert(
            "created_at".to_string(),
            Value::TimestampValue(created.to_string()),
        );
        let mut doc = Document::new(fields);
        doc.name = Some(format!(
            "projects/p/databases/(default)/documents/users/u1/clip_assets/{id}"
        ));
        doc
    }

    #[test]
    fn test_document_to_clip_takes_id_from_name() {
        let clip = document_to_clip(&clip_doc("c9", "2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(clip.id, "c9");
        assert_eq!(clip.storage_key, "u1/clips/c9.mp4");
        assert!(clip.tags.is_empty());
    }

    #[test]
    fn test_insertion_order_by_created_at() {
        let mut docs = vec![
            clip_doc("a", "2024-03-01T00:00:00Z"),
            clip_doc("b", "2024-01-01T00:00:00Z"),
        ];
        docs.sort_by_key(created_at);
        assert_eq!(docs[0].id(), Some("b"));
    }
}
