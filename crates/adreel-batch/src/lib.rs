//! External batch compute integration.
//!
//! This crate provides:
//! - The `BatchService` seam and its AWS Batch implementation
//! - Collision-free job names
//! - Reserved-key filtering and size-budgeted parameter packing
//! - Mapping from external job state to monotonic progress

pub mod client;
pub mod error;
pub mod naming;
pub mod params;
pub mod service;
pub mod status;

pub use client::{AwsBatchClient, BatchConfig};
pub use error::{BatchError, BatchResult};
pub use naming::job_name;
pub use params::{
    filter_reserved, is_reserved, merge_parameters, pack_parameters, param_bytes, PackedParameters,
    ESSENTIAL_KEYS, RESERVED_KEYS,
};
pub use service::{BatchService, JobDescription, SubmitRequest, SubmittedJob};
pub use status::progress_for;
