//! Resource fetching: HTTP client, typed failures, and retry policy.
//!
//! The [`Fetcher`] trait is the assembler's only view of the network. The
//! production implementation is [`HttpClient`]; tests substitute stubs.

mod client;
mod error;
mod retry;

pub use client::{Fetcher, HttpClient};
pub use error::{FetchError, FetchResult};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureKind, RetryDecision, RetryPolicy, classify_error,
    fetch_with_retry,
};
