//! Run report: what was found, what was downloaded, what failed.
//!
//! Rendered either as pretty JSON (stdout, machine readable) or as a short
//! human summary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use tele_dl::download::{DownloadOutcome, DownloadResult, DownloadStats};
use tele_dl::extract::{ExtractionStats, MediaItem, ValidationErrors, group_by_extension};
use tele_dl::page::Page;

use super::runtime::CancelCause;

#[derive(Debug, Serialize)]
pub(crate) struct PageSummary {
    pub(crate) path: String,
    pub(crate) url: String,
    pub(crate) title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadSummary {
    pub(crate) total: usize,
    pub(crate) successful: usize,
    pub(crate) failed: usize,
    pub(crate) skipped: usize,
    pub(crate) retried: usize,
    pub(crate) total_size: u64,
    pub(crate) duration_ms: u128,
}

#[derive(Debug, Serialize)]
pub(crate) struct FailureEntry {
    pub(crate) filename: String,
    pub(crate) url: String,
    pub(crate) attempts: u32,
    pub(crate) error: String,
}

/// Everything printed at the end of a run.
#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    pub(crate) page: PageSummary,
    pub(crate) extraction: ExtractionStats,
    pub(crate) duplicates_removed: usize,
    pub(crate) filtered_out: usize,
    pub(crate) extensions: BTreeMap<String, usize>,
    pub(crate) validation_warnings: Vec<String>,
    pub(crate) downloads: DownloadSummary,
    pub(crate) failures: Vec<FailureEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cancelled_by: Option<CancelCause>,
}

/// Inputs collected over a run, in pipeline order.
pub(crate) struct ReportInputs<'a> {
    pub(crate) page: &'a Page,
    pub(crate) extraction: ExtractionStats,
    pub(crate) extracted: usize,
    pub(crate) unique: usize,
    pub(crate) jobs: &'a [MediaItem],
    pub(crate) validation: &'a ValidationErrors,
    pub(crate) stats: &'a DownloadStats,
    pub(crate) results: &'a [DownloadResult],
    pub(crate) cancelled_by: Option<CancelCause>,
}

impl RunReport {
    pub(crate) fn build(inputs: ReportInputs<'_>) -> Self {
        let extensions = group_by_extension(inputs.jobs)
            .into_iter()
            .map(|(ext, items)| (ext, items.len()))
            .collect();

        let failures = inputs
            .results
            .iter()
            .filter_map(|result| match &result.outcome {
                DownloadOutcome::Failed(error) => Some(FailureEntry {
                    filename: result.item.filename.clone(),
                    url: result.item.url.clone(),
                    attempts: result.attempts,
                    error: error.to_string(),
                }),
                _ => None,
            })
            .collect();

        let stats = inputs.stats;
        Self {
            page: PageSummary {
                path: inputs.page.path.clone(),
                url: inputs.page.url.clone(),
                title: inputs.page.title.clone(),
                author_name: inputs.page.author_name.clone(),
                description: inputs.page.description.clone(),
            },
            extraction: inputs.extraction,
            duplicates_removed: inputs.extracted.saturating_sub(inputs.unique),
            filtered_out: inputs.unique.saturating_sub(inputs.jobs.len()),
            extensions,
            validation_warnings: inputs.validation.iter().map(ToString::to_string).collect(),
            downloads: DownloadSummary {
                total: stats.total,
                successful: stats.successful,
                failed: stats.failed,
                skipped: stats.skipped,
                retried: stats.retried,
                total_size: stats.total_size,
                duration_ms: stats.duration.as_millis(),
            },
            failures,
            cancelled_by: inputs.cancelled_by,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn render_human(&self) -> String {
        let mut out = String::new();
        let d = &self.downloads;

        let title = if self.page.title.is_empty() {
            self.page.path.as_str()
        } else {
            self.page.title.as_str()
        };
        let _ = writeln!(out, "Page: {title}");
        let _ = writeln!(
            out,
            "Found {} media files ({} nodes scanned, {} duplicates, {} filtered out)",
            self.extraction.valid_media,
            self.extraction.total_nodes,
            self.duplicates_removed,
            self.filtered_out
        );
        if !self.extensions.is_empty() {
            let breakdown: Vec<String> = self
                .extensions
                .iter()
                .map(|(ext, count)| format!("{ext}: {count}"))
                .collect();
            let _ = writeln!(out, "Types: {}", breakdown.join(", "));
        }
        for warning in &self.validation_warnings {
            let _ = writeln!(out, "Warning: {warning}");
        }

        let _ = writeln!(
            out,
            "Downloaded {}/{} ({} skipped, {} failed, {} retries), {} in {:.1}s",
            d.successful,
            d.total,
            d.skipped,
            d.failed,
            d.retried,
            format_bytes(d.total_size),
            seconds(d.duration_ms)
        );

        if let Some(cause) = self.cancelled_by {
            let _ = writeln!(out, "Run cancelled: {}", cause.describe());
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "Failures:");
            for (i, failure) in self.failures.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. {} ({}): {}",
                    i + 1,
                    failure.filename,
                    failure.url,
                    failure.error
                );
            }
        }

        out
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds(millis: u128) -> f64 {
    millis as f64 / 1000.0
}

/// Formats a byte count with binary units, e.g. `1.5 MiB`.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
