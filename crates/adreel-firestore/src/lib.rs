//! Firestore REST API client.
//!
//! This crate provides:
//! - `ProjectStore` for the Project aggregate, with optimistic concurrency
//! - `ClipLibrary` for read access to a user's clip assets
//! - Firestore-backed and in-memory implementations of both
//! - Service account authentication via gcp_auth
//! - Retry with exponential backoff and jitter

pub mod client;
pub mod clip_repo;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod project_repo;
pub mod retry;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig};
pub use clip_repo::{ClipLibrary, FirestoreClipLibrary, CLIP_ASSETS_COLLECTION};
pub use error::{FirestoreError, FirestoreResult};
pub use memory::{InMemoryClipLibrary, InMemoryProjectStore};
pub use project_repo::{FirestoreProjectStore, ProjectStore, PROJECTS_COLLECTION};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
