//! Archive assembly orchestration.
//!
//! The [`Assembler`] drives one request through its phases: validate the
//! tree, resolve archive paths (pure, pre-I/O), fan out one fetch task per
//! file bounded by a semaphore, fan in all results, then write the archive
//! sequentially in input order.
//!
//! # Concurrency model
//!
//! - Each fetch runs in its own Tokio task inside a [`JoinSet`]
//! - A semaphore permit is acquired before starting each fetch (RAII)
//! - Results land in a slot vector keyed by entry index, so the archive's
//!   entry order depends only on the input tree, never on completion order
//! - Path resolution and archive writing are sequential; the container is
//!   a single mutable sink
//!
//! # Failure policy
//!
//! Validation errors reject the request before any I/O. A failed fetch
//! never fails the operation: the entry is omitted from the archive and
//! counted in [`ArchiveOutput::skipped`]. Archive-write errors are fatal
//! and discard the partial buffer.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::archive::{ArchiveError, ArchiveWriter};
use crate::fetch::{FetchResult, Fetcher, RetryPolicy, fetch_with_retry};
use crate::path::{ResolvedKind, resolve_entries};
use crate::request::{ArchiveRequest, ValidationError};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Error type for assembly operations.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The request failed structural validation; nothing was produced.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Writing the archive container failed; the partial buffer was
    /// discarded.
    #[error("archive write failed: {0}")]
    Archive(#[from] ArchiveError),

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,

    /// The caller cancelled the operation before it completed.
    #[error("assembly cancelled")]
    Cancelled,
}

/// The finished archive and its delivery metadata.
#[derive(Debug, Clone)]
pub struct ArchiveOutput {
    /// The complete archive container bytes.
    pub bytes: Vec<u8>,
    /// Suggested file name, `{request name}.zip`.
    pub file_name: String,
    /// Number of file nodes omitted because their fetch failed.
    pub skipped: usize,
}

/// Orchestrates validation, concurrent fetching, and archive writing for
/// one request at a time.
///
/// The assembler owns no per-request state; it can be shared and reused
/// across requests.
pub struct Assembler {
    /// Maximum in-flight fetches per assembly.
    concurrency: usize,
    /// Retry policy applied inside each fetch task.
    retry_policy: RetryPolicy,
    /// Network boundary; stubbed in tests.
    fetcher: Arc<dyn Fetcher>,
}

impl Assembler {
    /// Creates an assembler with the given fetcher, concurrency limit, and
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::InvalidConcurrency`] if `concurrency` is
    /// outside 1-100.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        concurrency: usize,
        retry_policy: RetryPolicy,
    ) -> Result<Self, AssembleError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(AssembleError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            "creating assembler"
        );

        Ok(Self {
            concurrency,
            retry_policy,
            fetcher,
        })
    }

    /// Creates an assembler with default concurrency and retry policy.
    #[must_use]
    pub fn with_defaults(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
            fetcher,
        }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Assembles the archive for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::Validation`] for structural violations
    /// (detected before any I/O) and [`AssembleError::Archive`] if the
    /// container cannot be written. Individual fetch failures do NOT error;
    /// the affected entries are skipped and counted in the output.
    pub async fn assemble(&self, request: &ArchiveRequest) -> Result<ArchiveOutput, AssembleError> {
        self.assemble_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Assembles the archive, aborting when `cancel` fires.
    ///
    /// Cancellation before the write phase aborts in-flight fetches;
    /// cancellation during the write phase discards the partial buffer.
    /// Either way the caller sees [`AssembleError::Cancelled`] and no
    /// partial output.
    ///
    /// # Errors
    ///
    /// As [`assemble`](Self::assemble), plus [`AssembleError::Cancelled`].
    #[instrument(skip(self, request, cancel), fields(archive = %request.name))]
    pub async fn assemble_with_cancel(
        &self,
        request: &ArchiveRequest,
        cancel: CancellationToken,
    ) -> Result<ArchiveOutput, AssembleError> {
        // Validating: structure first, then the pure path resolution pass,
        // so collisions also reject the request before any fetch starts.
        request.validate()?;
        let entries = resolve_entries(&request.roots)?;

        let file_count = entries.iter().filter(|e| !e.is_folder()).count();
        info!(
            entries = entries.len(),
            files = file_count,
            "starting assembly"
        );

        if cancel.is_cancelled() {
            return Err(AssembleError::Cancelled);
        }

        // Fetching: fan-out, one task per file, bounded by the semaphore.
        let mut slots: Vec<Option<FetchResult>> = (0..entries.len()).map(|_| None).collect();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(usize, FetchResult)> = JoinSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let ResolvedKind::File { source } = &entry.kind else {
                continue;
            };

            let permit = tokio::select! {
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(AssembleError::Cancelled);
                }
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| AssembleError::SemaphoreClosed)?
                }
            };

            let fetcher = Arc::clone(&self.fetcher);
            let policy = self.retry_policy.clone();
            let source = source.clone();
            tasks.spawn(async move {
                // Permit is dropped when the task exits (RAII).
                let _permit = permit;
                let result = fetch_with_retry(fetcher.as_ref(), &source, &policy).await;
                (index, result)
            });
        }

        // Fan-in: every fetch settles before any content is used, so the
        // whole operation's latency is bounded by the slowest fetch.
        // Finished fetches are drained before cancellation is observed; a
        // cancel that lands after the last fetch settles surfaces in the
        // write pass instead.
        loop {
            let joined = tokio::select! {
                biased;
                joined = tasks.join_next() => joined,
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(AssembleError::Cancelled);
                }
            };
            let Some(joined) = joined else {
                break;
            };
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "fetch task panicked"),
            }
        }

        // Writing: sequential walk in resolved (input) order.
        let mut writer = ArchiveWriter::new();
        let mut written = 0usize;
        let mut skipped = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AssembleError::Cancelled);
            }
            match &entry.kind {
                ResolvedKind::Folder => writer.open_folder(&entry.archive_path)?,
                ResolvedKind::File { source } => match slots[index].take() {
                    Some(Ok(bytes)) => {
                        writer.write_file(&entry.archive_path, &bytes)?;
                        written += 1;
                    }
                    Some(Err(error)) => {
                        warn!(
                            url = %source,
                            path = %entry.archive_path,
                            error = %error,
                            "skipping entry after failed fetch"
                        );
                        skipped += 1;
                    }
                    None => {
                        warn!(
                            url = %source,
                            path = %entry.archive_path,
                            "skipping entry: fetch task did not complete"
                        );
                        skipped += 1;
                    }
                },
            }
        }

        let bytes = writer.finish()?;
        let file_name = format!("{}.zip", request.name.trim());

        info!(
            archive = %file_name,
            written,
            skipped,
            size_bytes = bytes.len(),
            "assembly complete"
        );

        Ok(ArchiveOutput {
            bytes,
            file_name,
            skipped,
        })
    }
}
