//! Bundler Core Library
//!
//! This library assembles a set of remote resources, optionally nested in
//! named folders, into a single compressed zip archive whose internal
//! layout mirrors the requested hierarchy. Fetches run concurrently; a
//! resource that cannot be fetched is omitted from the archive instead of
//! failing the whole operation.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`request`] - Request model (item tree) and structural validation
//! - [`fetch`] - HTTP fetching with typed failures and retry
//! - [`path`] - Canonical archive path resolution and collision handling
//! - [`archive`] - Zip container writer
//! - [`assembler`] - Orchestration: validate, fetch fan-out/fan-in, write

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod assembler;
pub mod fetch;
pub mod path;
pub mod request;

// Re-export commonly used types
pub use archive::{ArchiveError, ArchiveWriter};
pub use assembler::{ArchiveOutput, AssembleError, Assembler, DEFAULT_CONCURRENCY};
pub use fetch::{
    DEFAULT_MAX_ATTEMPTS, FailureKind, FetchError, FetchResult, Fetcher, HttpClient,
    RetryDecision, RetryPolicy, classify_error,
};
pub use path::{ResolvedEntry, ResolvedKind, resolve_entries};
pub use request::{ArchiveRequest, ItemNode, ValidationError, filename_from_url};
