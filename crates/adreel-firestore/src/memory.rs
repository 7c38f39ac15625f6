//! In-memory project store and clip library.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use adreel_models::{ClipAsset, Project, ProjectId};

use crate::clip_repo::ClipLibrary;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_version_conflict;
use crate::project_repo::{next_revision, ProjectStore, PROJECTS_COLLECTION};

/// Process-local project store with the same version semantics as Firestore.
#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<String, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get(&self, id: &ProjectId) -> FirestoreResult<Option<Project>> {
        Ok(self.projects.read().await.get(id.as_str()).cloned())
    }

    async fn create(&self, project: &Project) -> FirestoreResult<Project> {
        let mut projects = self.projects.write().await;
        if projects.contains_key(project.id.as_str()) {
            return Err(FirestoreError::AlreadyExists(project.id.to_string()));
        }
        projects.insert(project.id.to_string(), project.clone());
        Ok(project.clone())
    }

    async fn save(&self, project: &Project) -> FirestoreResult<Project> {
        let mut projects = self.projects.write().await;
        let stored = projects
            .get(project.id.as_str())
            .ok_or_else(|| FirestoreError::not_found(project.id.to_string()))?;

        if stored.version != project.version {
            record_version_conflict(PROJECTS_COLLECTION);
            return Err(FirestoreError::VersionConflict {
                doc_id: project.id.to_string(),
                expected: project.version,
                found: stored.version,
            });
        }

        let next = next_revision(project);
        projects.insert(project.id.to_string(), next.clone());
        Ok(next)
    }
}

/// Process-local clip library keyed by user.
#[derive(Default)]
pub struct InMemoryClipLibrary {
    clips: RwLock<HashMap<String, Vec<ClipAsset>>>,
}

impl InMemoryClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library holding `clips` for one user, in the given order.
    pub fn with_clips(user_id: &str, clips: Vec<ClipAsset>) -> Self {
        let mut map = HashMap::new();
        map.insert(user_id.to_string(), clips);
        Self {
            clips: RwLock::new(map),
        }
    }

    /// Append a clip to the user's library.
    pub async fn insert(&self, user_id: &str, clip: ClipAsset) {
        self.clips
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(clip);
    }
}

#[async_trait]
impl ClipLibrary for InMemoryClipLibrary {
    async fn list_clips(&self, user_id: &str) -> FirestoreResult<Vec<ClipAsset>> {
        Ok(self
            .clips
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_clip(&self, user_id: &str, clip_id: &str) -> FirestoreResult<Option<ClipAsset>> {
        Ok(self
            .clips
            .read()
            .await
            .get(user_id)
            .and_then(|clips| clips.iter().find(|c| c.id == clip_id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = InMemoryProjectStore::new();
        let project = store.create(&Project::new("u1", "Ad")).await.unwrap();

        let saved = store.save(&project).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.get(&project.id).await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_stale_write_rejected() {
        let store = InMemoryProjectStore::new();
        let project = store.create(&Project::new("u1", "Ad")).await.unwrap();

        let mut first = project.clone();
        first.title = "First".to_string();
        store.save(&first).await.unwrap();

        let mut second = project.clone();
        second.title = "Second".to_string();
        let err = store.save(&second).await.unwrap_err();

        assert!(matches!(
            err,
            FirestoreError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
        let stored = store.get(&project.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "First");
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryProjectStore::new();
        let project = Project::new("u1", "Ad");
        store.create(&project).await.unwrap();
        assert!(matches!(
            store.create(&project).await,
            Err(FirestoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_clip_library_keeps_insertion_order() {
        let library = InMemoryClipLibrary::new();
        library
            .insert("u1", ClipAsset::new("b", "B", "u1/clips/b.mp4", vec![]))
            .await;
        library
            .insert("u1", ClipAsset::new("a", "A", "u1/clips/a.mp4", vec![]))
            .await;

        let ids: Vec<String> = library
            .list_clips("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(library.get_clip("u2", "a").await.unwrap().is_none());
        assert!(library.get_clip("u1", "a").await.unwrap().is_some());
    }
}
