//! Progress UI (bar) for download runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta})";

/// Download progress bar, or a no-op when progress is off.
pub(crate) struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    /// Draws a bar over `total` jobs on stderr when `enabled`.
    pub(crate) fn new(enabled: bool, total: usize) -> Self {
        if !enabled || total == 0 {
            return Self { bar: None };
        }
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    /// Sets the number of finished jobs.
    pub(crate) fn set(&self, done: usize) {
        if let Some(bar) = &self.bar {
            bar.set_position(done as u64);
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Whether a bar should be drawn at all.
pub(crate) fn should_show_progress(
    requested: bool,
    stderr_is_terminal: bool,
    dumb_terminal: bool,
) -> bool {
    requested && stderr_is_terminal && !dumb_terminal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_has_no_bar() {
        let progress = DownloadProgress::new(false, 10);
        assert!(!progress.is_visible());
        progress.set(5);
        progress.finish();
    }

    #[test]
    fn test_zero_jobs_has_no_bar() {
        assert!(!DownloadProgress::new(true, 0).is_visible());
    }

    #[test]
    fn test_enabled_progress_tracks_position() {
        let progress = DownloadProgress::new(true, 3);
        progress.set(2);
        assert_eq!(progress.bar.as_ref().map(ProgressBar::position), Some(2));
        progress.finish();
    }

    #[test]
    fn test_should_show_progress() {
        assert!(should_show_progress(true, true, false));
        assert!(!should_show_progress(false, true, false));
        assert!(!should_show_progress(true, false, false));
        assert!(!should_show_progress(true, true, true));
    }
}
