//! CLI binary for fb2shelf.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `RunConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use fb2shelf::{run, RunConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process ./income into ./books with the default layout
  fb2shelf

  # Explicit directories
  fb2shelf --income ~/downloads/ebooks --library /srv/books --processed ~/downloads/done

  # With an author synonym table
  fb2shelf --authors authors.txt

LAYOUT:
  Every successfully classified book is repackaged as a one-entry zip at

      <library>/<author>/<series>/<title>.fb2.zip

  with the series ordinal (two digits) prefixed to the title when the
  book declares one, and "Без серии" standing in for books outside any
  series. Successfully processed inputs move to the processed tree,
  mirroring their relative path; failed inputs stay in the income tree
  for the next run.

SYNONYM TABLE:
  A UTF-8 text file, one mapping per line:

      Tolstoj, Lev=Толстой, Лев

  The left side is matched against the raw "Last, First" name extracted
  from the book; the right side is what ends up in the library path and
  in the repackaged book. Lines without '=' are ignored.
"#;

/// Sort FB2 files and archives into an author/series library layout.
#[derive(Parser, Debug)]
#[command(
    name = "fb2shelf",
    version,
    about = "Sort FB2 files and archives into an author/series library layout",
    long_about = "Process a directory of incoming FB2 e-book files and zip archives \
(nested archives supported), classify each book by its embedded author/series/title \
metadata, and repackage it into a normalized library tree.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for incoming files.
    #[arg(long, env = "FB2SHELF_INCOME", default_value = "income")]
    income: PathBuf,

    /// Library root the repackaged books are written under.
    #[arg(long, env = "FB2SHELF_LIBRARY", default_value = "books")]
    library: PathBuf,

    /// Successfully processed inputs are moved here.
    #[arg(long, env = "FB2SHELF_PROCESSED", default_value = "processed")]
    processed: PathBuf,

    /// Author synonym table (old=new per line); missing file is fine.
    #[arg(long, env = "FB2SHELF_AUTHORS", default_value = "authors.txt")]
    authors: PathBuf,

    /// Per-run processing log, also echoed to stdout.
    #[arg(long, env = "FB2SHELF_LOG", default_value = "log.txt")]
    log: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FB2SHELF_VERBOSE")]
    verbose: bool,

    /// Suppress all diagnostics except errors.
    #[arg(short, long, env = "FB2SHELF_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Diagnostics go to stderr; stdout belongs to the run log echo.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config and run ─────────────────────────────────────────────
    let config = RunConfig::builder()
        .income_dir(cli.income)
        .library_dir(cli.library)
        .processed_dir(cli.processed)
        .authors_file(cli.authors)
        .log_file(cli.log)
        .build()
        .context("Invalid configuration")?;

    let summary = run(&config).context("Run failed")?;

    if !cli.quiet {
        let tick = if summary.files_failed == 0 {
            green("✔")
        } else {
            red("✘")
        };
        eprintln!(
            "{tick}  {} files processed, {} failed  →  {}",
            bold(&summary.files_processed.to_string()),
            summary.files_failed,
            config.library_dir.display(),
        );
        if summary.files_failed > 0 {
            eprintln!(
                "   failed inputs were left in {} — see {}",
                config.income_dir.display(),
                config.log_file.display(),
            );
        }
    }

    Ok(())
}
