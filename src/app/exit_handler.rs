//! Maps a finished run to the process exit outcome.

use tele_dl::download::DownloadStats;

use super::runtime::CancelCause;
use crate::ProcessExit;

/// Picks the exit outcome for a run that got as far as downloading.
///
/// Ctrl-C always fails the run. Otherwise a file counts as done when it was
/// downloaded or already on disk; jobs cut off by a deadline count as failed.
pub(crate) fn exit_outcome(
    stats: &DownloadStats,
    cancelled_by: Option<CancelCause>,
) -> ProcessExit {
    if cancelled_by == Some(CancelCause::Interrupted) {
        return ProcessExit::Failure;
    }

    let done = stats.successful + stats.skipped;
    match (done, stats.failed) {
        (_, 0) => ProcessExit::Success,
        (0, _) => ProcessExit::Failure,
        _ => ProcessExit::Partial,
    }
}
