//! CLI entry point for the bundler tool.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bundler_core::{ArchiveRequest, Assembler, HttpClient, RetryPolicy};
use clap::Parser;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

/// Connect timeout in seconds; the per-request timeout is a CLI flag.
const CONNECT_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let request = build_request(&args)?;

    debug!(
        archive = %request.name,
        roots = request.roots.len(),
        "request assembled"
    );

    let client = HttpClient::with_timeouts(CONNECT_TIMEOUT_SECS, args.timeout_secs);
    let assembler = Assembler::new(
        Arc::new(client),
        usize::from(args.concurrency),
        RetryPolicy::with_max_attempts(u32::from(args.max_attempts)),
    )?;

    let output = assembler.assemble(&request).await?;

    if output.skipped > 0 {
        warn!(skipped = output.skipped, "some files could not be fetched");
    }

    let target = args.output.join(&output.file_name);
    std::fs::write(&target, &output.bytes)
        .with_context(|| format!("failed to write archive to {}", target.display()))?;

    info!(
        archive = %target.display(),
        size_bytes = output.bytes.len(),
        skipped = output.skipped,
        "archive written"
    );

    Ok(())
}

/// Builds the archive request from CLI inputs or stdin.
///
/// In `--flat` mode every input (argument or stdin line) is a URL and file
/// names are derived from each URL's last path segment. Otherwise the
/// input is a request JSON document, read from the single file argument or
/// from stdin.
fn build_request(args: &Args) -> Result<ArchiveRequest> {
    if args.flat {
        let urls: Vec<String> = if args.inputs.is_empty() {
            read_stdin()?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            args.inputs.clone()
        };
        if urls.is_empty() {
            bail!("no URLs provided; pass them as arguments or pipe via stdin");
        }
        return Ok(ArchiveRequest::from_urls(args.name.clone(), urls));
    }

    let json = match args.inputs.as_slice() {
        [] => read_stdin()?,
        [path] => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {path}"))?,
        _ => bail!("expected a single request file (or use --flat for URL lists)"),
    };

    serde_json::from_str(&json).context("failed to parse request JSON")
}

fn read_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        bail!("no input provided; pass a request file or pipe JSON via stdin");
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}
