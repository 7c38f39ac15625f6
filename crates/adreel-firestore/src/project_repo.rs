//! Project repository with optimistic concurrency.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use adreel_models::{Project, ProjectId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_version_conflict;
use crate::types::{from_document, to_fields, Document};

/// Top-level collection; a project is resumable from its id alone.
pub const PROJECTS_COLLECTION: &str = "ad_projects";

/// Durable storage for the Project aggregate.
///
/// `save` replaces the whole document, but only if the stored `version`
/// still equals the caller's; the returned project carries `version + 1`.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, id: &ProjectId) -> FirestoreResult<Option<Project>>;

    async fn create(&self, project: &Project) -> FirestoreResult<Project>;

    async fn save(&self, project: &Project) -> FirestoreResult<Project>;
}

/// Prepare the next revision of `project` for writing.
pub(crate) fn next_revision(project: &Project) -> Project {
    let mut next = project.clone();
    next.version = project.version + 1;
    next.touch();
    next
}

/// Firestore-backed project store.
#[derive(Clone)]
pub struct FirestoreProjectStore {
    client: FirestoreClient,
}

impl FirestoreProjectStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    async fn fetch(&self, id: &str) -> FirestoreResult<Option<Document>> {
        self.client
            .with_retry("get_project", || {
                self.client.get_document(PROJECTS_COLLECTION, id)
            })
            .await
    }
}

#[async_trait]
impl ProjectStore for FirestoreProjectStore {
    async fn get(&self, id: &ProjectId) -> FirestoreResult<Option<Project>> {
        match self.fetch(id.as_str()).await? {
            Some(doc) => Ok(Some(from_document(&doc)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, project: &Project) -> FirestoreResult<Project> {
        let fields = to_fields(project)?;
        self.client
            .create_document(PROJECTS_COLLECTION, project.id.as_str(), fields)
            .await?;
        info!(project_id = %project.id, user_id = %project.user_id, "Created project");
        Ok(project.clone())
    }

    async fn save(&self, project: &Project) -> FirestoreResult<Project> {
        let id = project.id.as_str();
        let doc = self
            .fetch(id)
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", PROJECTS_COLLECTION, id)))?;

        let stored: Project = from_document(&doc)?;
        if stored.version != project.version {
            record_version_conflict(PROJECTS_COLLECTION);
            warn!(
                project_id = %id,
                expected = project.version,
                found = stored.version,
                "Rejected stale project write"
            );
            return Err(FirestoreError::VersionConflict {
                doc_id: id.to_string(),
                expected: project.version,
                found: stored.version,
            });
        }

        let next = next_revision(project);
        let fields = to_fields(&next)?;

        // updateTime pins the read above, so a writer that slipped in between
        // is caught by Firestore itself
        let result = self
            .client
            .update_document_with_precondition(
                PROJECTS_COLLECTION,
                id,
                fields,
                None,
                doc.update_time.as_deref(),
            )
            .await;

        match result {
            Ok(_) => {
                debug!(project_id = %id, version = next.version, "Saved project");
                Ok(next)
            }
            Err(e) if e.is_precondition_failed() => {
                record_version_conflict(PROJECTS_COLLECTION);
                Err(FirestoreError::VersionConflict {
                    doc_id: id.to_string(),
                    expected: project.version,
                    found: project.version + 1,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_revision_bumps_version() {
        let project = Project::new("u", "t");
        let next = next_revision(&project);
        assert_eq!(next.version, project.version + 1);
        assert!(next.updated_at >= project.updated_at);
        assert_eq!(next.id, project.id);
    }
}
