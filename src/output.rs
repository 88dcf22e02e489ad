//! CLI output formatting for the post-build pipeline.
//!
//! # Output Format
//!
//! Each step prints a header line followed by indented context lines. Paths
//! are shown relative to the build root so the output reads as an inventory
//! of what changed in the deployable tree.
//!
//! ## Reconcile
//!
//! ```text
//! Reconciled 12 files
//!     Themed content: 11
//!     Scattered: 1
//! ```
//!
//! ## Convert
//!
//! ```text
//! 001 about/index.html → wp/wp-content/themes/portfolio/templates/about/index.twig
//! 002 index.html (already converted)
//! ```
//!
//! ## Prune
//!
//! ```text
//! Pruned 3 empty directories
//!     Skipped: 1 (see warnings)
//! ```
//!
//! # Architecture
//!
//! Every `format_*` function returns `Vec<String>` for testability and is
//! pure: no I/O, no side effects. `print_*` wrappers write to stdout.
//! Per-resource conversion lines are numbered in arrival order, so the
//! caller owns the counter.

use crate::convert::ConversionStatus;
use crate::pipeline::{PipelineEvent, PipelineReport};
use crate::prune::PruneReport;
use crate::reconcile::ReconcileReport;
use crate::types::SiteResource;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` with `/` separators, or the full path when it
/// lies outside `root`.
fn display_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}

fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

// ============================================================================
// Pipeline steps
// ============================================================================

pub fn format_reconcile(report: &ReconcileReport) -> Vec<String> {
    let total = report.subtree_files + report.scattered_files;
    vec![
        format!("Reconciled {}", plural(total, "file", "files")),
        format!("{}Themed content: {}", indent(1), report.subtree_files),
        format!("{}Scattered: {}", indent(1), report.scattered_files),
    ]
}

pub fn format_conversion(
    index: usize,
    resource: &str,
    destination: &Path,
    status: ConversionStatus,
    build_root: &Path,
) -> String {
    match status {
        ConversionStatus::Moved => format!(
            "{} {} → {}",
            format_index(index),
            resource,
            display_relative(build_root, destination)
        ),
        ConversionStatus::AlreadyConverted => {
            format!("{} {} (already converted)", format_index(index), resource)
        }
    }
}

pub fn format_prune(report: &PruneReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Pruned {}",
        plural(report.removed, "empty directory", "empty directories")
    )];
    if report.skipped > 0 {
        lines.push(format!(
            "{}Skipped: {} (see warnings)",
            indent(1),
            report.skipped
        ));
    }
    lines
}

/// Format one streamed pipeline event. `converted` is the running count of
/// conversion events seen so far, including this one.
pub fn format_pipeline_event(
    event: &PipelineEvent,
    converted: usize,
    build_root: &Path,
) -> Vec<String> {
    match event {
        PipelineEvent::Reconciled(report) => format_reconcile(report),
        PipelineEvent::Converted {
            resource,
            destination,
            status,
        } => vec![format_conversion(
            converted,
            resource,
            destination,
            *status,
            build_root,
        )],
        PipelineEvent::Pruned(report) => format_prune(report),
    }
}

/// Final one-line summary of a completed run.
pub fn format_summary(report: &PipelineReport) -> String {
    let already = report.conversions.len() - report.moved_count();
    let mut line = format!(
        "Converted {}, pruned {}",
        plural(report.moved_count(), "page", "pages"),
        plural(report.pruned.removed, "directory", "directories"),
    );
    if already > 0 {
        line.push_str(&format!(" ({already} already converted)"));
    }
    line
}

// ============================================================================
// Resource listing (check command)
// ============================================================================

/// List discovered resources, HTML pages first with their template targets.
pub fn format_resources(resources: &[SiteResource]) -> Vec<String> {
    let (html, other): (Vec<_>, Vec<_>) = resources.iter().partition(|r| r.is_html());
    let mut lines = Vec::new();

    lines.push(format!("Pages ({})", html.len()));
    for (i, r) in html.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), r.path));
    }

    lines.push(format!("Other resources ({})", other.len()));
    for (i, r) in other.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), r.path));
    }
    lines
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
