//! Run orchestration: page, media list, downloads, report.

use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tele_dl::download::{DownloadResult, DownloadStats, Downloader, HttpClient};
use tele_dl::extract::{
    ExtractionStats, MediaExtractor, MediaItem, ValidationErrors, deduplicate,
    filter_by_extension, validate,
};
use tele_dl::page::{Page, PageSource, TelegraphClient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ProcessExit;
use crate::app::config::{self, RunConfig};
use crate::app::progress::{self, DownloadProgress};
use crate::app::report::{ReportInputs, RunReport};
use crate::app::{exit_handler, terminal};
use crate::cli::Args;

/// Why the shared cancellation token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CancelCause {
    Interrupted,
    Deadline,
}

impl CancelCause {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Interrupted => "interrupted (Ctrl-C)",
            Self::Deadline => "deadline reached",
        }
    }
}

/// Everything a finished pipeline produced.
#[derive(Debug)]
pub(crate) struct RunOutput {
    pub(crate) page: Page,
    pub(crate) extraction: ExtractionStats,
    pub(crate) extracted: usize,
    pub(crate) unique: usize,
    pub(crate) jobs: Vec<MediaItem>,
    pub(crate) validation: ValidationErrors,
    pub(crate) stats: DownloadStats,
    pub(crate) results: Vec<DownloadResult>,
}

impl RunOutput {
    pub(crate) fn report(&self, cancelled_by: Option<CancelCause>) -> RunReport {
        RunReport::build(ReportInputs {
            page: &self.page,
            extraction: self.extraction,
            extracted: self.extracted,
            unique: self.unique,
            jobs: &self.jobs,
            validation: &self.validation,
            stats: &self.stats,
            results: &self.results,
            cancelled_by,
        })
    }
}

pub(crate) async fn run_downloader(args: Args) -> Result<ProcessExit> {
    let config = RunConfig::from_args(&args)?;
    debug!(?config, "configuration resolved");

    config::prepare_output_dir(&config.output_dir)?;

    let show_progress = progress::should_show_progress(
        args.progress_requested() && !config.json,
        io::stderr().is_terminal(),
        terminal::is_dumb_terminal(),
    );
    let source = TelegraphClient::new(&config.api_base, config.timeout)
        .context("failed to build Telegraph API client")?;

    let cancel = CancellationToken::new();
    let finished = CancellationToken::new();
    let watcher = tokio::spawn(watch_for_cancel(
        cancel.clone(),
        finished.clone(),
        config.deadline,
    ));

    let outcome = execute(&config, &source, &cancel, show_progress).await;

    finished.cancel();
    let cancelled_by = watcher.await.unwrap_or_else(|e| {
        warn!(error = %e, "cancel watcher panicked");
        None
    });

    let output = outcome?;
    let report = output.report(cancelled_by);
    if config.json {
        println!("{}", report.to_json().context("failed to serialize report")?);
    } else if !args.quiet {
        print!("{}", report.render_human());
    }

    Ok(exit_handler::exit_outcome(&output.stats, cancelled_by))
}

/// Fetches the page, extracts media and downloads it.
#[instrument(skip_all, fields(page = %config.page_path))]
pub(crate) async fn execute(
    config: &RunConfig,
    source: &dyn PageSource,
    cancel: &CancellationToken,
    show_progress: bool,
) -> Result<RunOutput> {
    info!("Fetching page");
    let page = tokio::select! {
        biased;
        () = cancel.cancelled() => bail!("cancelled before the page was fetched"),
        page = source.fetch_page(&config.page_path) => page
            .with_context(|| format!("failed to fetch page {}", config.page_path))?,
    };

    let extractor = MediaExtractor::new();
    let (items, extraction) = extractor.extract_with_stats(&page.nodes);

    let validation = validate(&items);
    for problem in &validation {
        warn!(%problem, "suspicious media item");
    }

    let unique = deduplicate(&items);
    let jobs = filter_by_extension(&unique, &config.extensions);
    info!(
        title = %page.title,
        found = items.len(),
        unique = unique.len(),
        to_download = jobs.len(),
        "Extracted media"
    );

    let client =
        HttpClient::with_timeout(config.timeout).context("failed to build HTTP client")?;
    let downloader = Downloader::new(client, config.download_options())?;

    let progress = DownloadProgress::new(show_progress, jobs.len());
    let (stats, results) = downloader
        .download_all(jobs.clone(), cancel, |done| progress.set(done))
        .await;
    progress.finish();

    Ok(RunOutput {
        extracted: items.len(),
        unique: unique.len(),
        page,
        extraction,
        jobs,
        validation,
        stats,
        results,
    })
}

/// Fires `cancel` on Ctrl-C or when `deadline` elapses, whichever comes first.
///
/// Returns `None` once `finished` fires without either happening.
async fn watch_for_cancel(
    cancel: CancellationToken,
    finished: CancellationToken,
    deadline: Option<Duration>,
) -> Option<CancelCause> {
    let deadline_reached = async move {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    let cause = tokio::select! {
        biased;
        () = finished.cancelled() => return None,
        () = ctrl_c() => CancelCause::Interrupted,
        () = deadline_reached => CancelCause::Deadline,
    };

    warn!(cause = cause.describe(), "cancelling downloads");
    cancel.cancel();
    Some(cause)
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
