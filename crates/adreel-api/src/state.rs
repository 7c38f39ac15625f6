//! Application state.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use adreel_batch::AwsBatchClient;
use adreel_firestore::{
    ClipLibrary, FirestoreClient, FirestoreClipLibrary, FirestoreProjectStore,
    InMemoryClipLibrary, InMemoryProjectStore, ProjectStore,
};
use adreel_llm_client::{GeminiClient, TtsClient};
use adreel_orchestrator::{AdOrchestrator, OrchestratorConfig};
use adreel_storage::{InMemoryObjectStore, ObjectStore, S3Store};

use crate::config::{ApiConfig, Backend};

/// A dependency probed by `/ready`.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the round-trip latency in milliseconds.
    async fn check(&self) -> Result<u64, String>;
}

struct FirestoreCheck(FirestoreClient);

#[async_trait]
impl ReadinessCheck for FirestoreCheck {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn check(&self) -> Result<u64, String> {
        let start = Instant::now();
        // A missing document still proves the store is reachable
        self.0
            .get_document("_health", "_check")
            .await
            .map_err(|e| e.to_string())?;
        Ok(start.elapsed().as_millis() as u64)
    }
}

struct StorageCheck(Arc<S3Store>);

#[async_trait]
impl ReadinessCheck for StorageCheck {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn check(&self) -> Result<u64, String> {
        let start = Instant::now();
        self.0.check_connectivity().await.map_err(|e| e.to_string())?;
        Ok(start.elapsed().as_millis() as u64)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: AdOrchestrator,
    pub readiness: Arc<Vec<Arc<dyn ReadinessCheck>>>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let analysis = Arc::new(GeminiClient::from_env()?);
        let batch = Arc::new(AwsBatchClient::from_env().await?);

        let mut readiness: Vec<Arc<dyn ReadinessCheck>> = Vec::new();
        let (projects, clips, objects) = match config.backend {
            Backend::Cloud => {
                let firestore = FirestoreClient::from_env().await?;
                let storage = Arc::new(S3Store::from_env().await?);
                readiness.push(Arc::new(FirestoreCheck(firestore.clone())));
                readiness.push(Arc::new(StorageCheck(Arc::clone(&storage))));

                let projects: Arc<dyn ProjectStore> =
                    Arc::new(FirestoreProjectStore::new(firestore.clone()));
                let clips: Arc<dyn ClipLibrary> = Arc::new(FirestoreClipLibrary::new(firestore));
                let objects: Arc<dyn ObjectStore> = storage;
                (projects, clips, objects)
            }
            Backend::InMemory => {
                info!("Using in-memory project, clip and object stores");
                let projects: Arc<dyn ProjectStore> = Arc::new(InMemoryProjectStore::new());
                let clips: Arc<dyn ClipLibrary> = Arc::new(InMemoryClipLibrary::new());
                let objects: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::default());
                (projects, clips, objects)
            }
        };

        let mut orchestrator = AdOrchestrator::new(
            projects,
            clips,
            objects,
            analysis,
            batch,
            OrchestratorConfig::from_env(),
        );
        match TtsClient::from_env() {
            Ok(tts) => orchestrator = orchestrator.with_narration(Arc::new(tts)),
            Err(e) => info!("Narration synthesis disabled: {}", e),
        }

        Ok(Self::with_orchestrator(config, orchestrator).with_readiness(readiness))
    }

    /// State around an already built orchestrator, with no readiness probes.
    pub fn with_orchestrator(config: ApiConfig, orchestrator: AdOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
            readiness: Arc::new(Vec::new()),
        }
    }

    pub fn with_readiness(mut self, checks: Vec<Arc<dyn ReadinessCheck>>) -> Self {
        self.readiness = Arc::new(checks);
        self
    }
}
