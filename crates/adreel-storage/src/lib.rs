//! Object storage for the AdReel backend.
//!
//! This crate provides:
//! - The `ObjectStore` seam used by the orchestrator
//! - An S3-compatible client (AWS S3, Cloudflare R2, MinIO)
//! - An in-memory store for local runs and tests
//! - The object key layout shared by every component

pub mod client;
pub mod error;
pub mod keys;
pub mod memory;
pub mod store;

pub use client::{S3Config, S3Store};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryObjectStore;
pub use store::ObjectStore;
