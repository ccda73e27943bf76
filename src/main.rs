use anyhow::{Context, Result};
use apply_edits::{apply_batch, filter_edits, parse_edit_stream, BatchOptions};
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Reads edit directives from stdin and applies them to all files under
/// git control, modulo the path filters.
///
/// One edit per line: `edit_type:::path:::offset:::length:::replacement`.
/// When a replacement is empty and the deleted text is part of a list
/// (function parameters, initializers), the deletion is extended to
/// remove dangling commas; replacing with a single space suppresses
/// that.
#[derive(Parser)]
#[command(name = "apply-edits")]
#[command(about = "Apply byte-offset edit streams from source analysis tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the build dir (dir that edit paths are relative to)
    #[arg(short = 'p', value_name = "BUILD_DIR")]
    build_dir: PathBuf,

    /// Optional path prefixes to filter what files the tool edits
    path_filter: Vec<String>,

    /// Apply edits in memory and report counts without writing any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show a unified diff for every changed file
    #[arg(long)]
    diff: bool,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {err:#}", "✗".red());
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let tracked = tracked_files(&cli.path_filter)?;

    let stdin = io::stdin();
    let parsed = parse_edit_stream(stdin.lock(), &cli.build_dir)?;
    let stream_errors = parsed.recoverable_errors();
    let edits = filter_edits(parsed.edits, &tracked);

    // Snapshot originals up front; the diff compares against them after
    // the batch runs.
    let originals: Vec<(PathBuf, Vec<u8>)> = if cli.diff {
        edits
            .keys()
            .filter_map(|path| fs::read(path).ok().map(|c| (path.clone(), c)))
            .collect()
    } else {
        Vec::new()
    };

    if cli.dry_run {
        println!("{}", "[DRY RUN - no files will be modified]".cyan());
    }

    let outcome = apply_batch(
        edits,
        BatchOptions {
            dry_run: cli.dry_run,
            collect_changes: cli.diff,
        },
    )?;

    if cli.diff {
        for (path, new_contents) in &outcome.changed {
            if let Some((_, original)) = originals.iter().find(|(p, _)| p == path) {
                display_diff(path, original, new_contents);
            }
        }
    }

    let total_errors = stream_errors + outcome.errors;

    println!("{}", "Summary:".bold());
    println!(
        "  {} edits applied",
        format!("{}", outcome.edits_applied).green()
    );
    println!("  {} errors", format!("{total_errors}").red());
    println!("  {} files", outcome.files_done);

    // Full success exits 0; otherwise the negated error count (callers
    // treat any non-zero status as failure).
    Ok(-(total_errors as i32))
}

/// The externally supplied allowed-file set: everything `git ls-files`
/// reports under the given path prefixes, canonicalized.
fn tracked_files(path_filters: &[String]) -> Result<HashSet<PathBuf>> {
    let git = if cfg!(windows) { "git.bat" } else { "git" };
    let output = Command::new(git)
        .arg("ls-files")
        .args(path_filters)
        .output()
        .context("running git ls-files")?;
    if !output.status.success() {
        anyhow::bail!("git ls-files failed with {}", output.status);
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    Ok(listing
        .lines()
        .filter_map(|line| Path::new(line).canonicalize().ok())
        .collect())
}

/// Unified diff between original and rewritten contents.
fn display_diff(file: &Path, original: &[u8], modified: &[u8]) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (edited)", file.display()).dimmed());

    let original = String::from_utf8_lossy(original);
    let modified = String::from_utf8_lossy(modified);
    let diff = TextDiff::from_lines(original.as_ref(), modified.as_ref());

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red(),
            ChangeTag::Insert => format!("+{change}").green(),
            ChangeTag::Equal => format!(" {change}").normal(),
        };
        print!("{sign}");
    }
}
