//! Resolved run settings: CLI arguments checked and converted into library types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tele_dl::download::{DownloadOptions, RetryPolicy};
use tele_dl::page::extract_page_path;
use tracing::info;

use crate::cli::Args;

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub(crate) struct RunConfig {
    pub(crate) page_path: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) workers: usize,
    pub(crate) timeout: Duration,
    pub(crate) deadline: Option<Duration>,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) extensions: Vec<String>,
    pub(crate) api_base: String,
    pub(crate) file_base: String,
    pub(crate) json: bool,
}

impl RunConfig {
    pub(crate) fn from_args(args: &Args) -> Result<Self> {
        let page_path = extract_page_path(&args.link)?;
        validate_base_url("--api-base", &args.api_base)?;
        validate_base_url("--file-base", &args.file_base)?;

        let extensions = args
            .extensions
            .iter()
            .map(|ext| ext.trim())
            .filter(|ext| !ext.trim_start_matches('.').is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            page_path,
            output_dir: args.output.clone(),
            workers: usize::from(args.workers),
            timeout: Duration::from_secs(args.timeout),
            deadline: args.deadline.map(Duration::from_secs),
            retry_policy: RetryPolicy::new(
                u32::from(args.retries),
                Duration::from_millis(args.backoff_ms),
            ),
            extensions,
            api_base: args.api_base.clone(),
            file_base: args.file_base.clone(),
            json: args.json,
        })
    }

    pub(crate) fn download_options(&self) -> DownloadOptions {
        DownloadOptions::new(&self.output_dir)
            .with_workers(self.workers)
            .with_retry_policy(self.retry_policy.clone())
            .with_file_base(&self.file_base)
    }
}

fn validate_base_url(flag: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .with_context(|| format!("What: Invalid {flag}\nWhy: '{value}' is not a URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "What: Invalid {flag}\nWhy: scheme '{}' is not supported\nFix: Use an http:// or https:// URL.",
            parsed.scheme()
        );
    }
    Ok(())
}

/// Creates `dir` if needed and proves it is writable by creating and removing a probe file.
pub(crate) fn prepare_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        info!(dir = %dir.display(), "Created output directory");
    }
    if !dir.is_dir() {
        bail!("output path {} is not a directory", dir.display());
    }

    let probe = dir.join(format!(".tele-dl-write-test-{}", std::process::id()));
    std::fs::write(&probe, b"")
        .with_context(|| format!("output directory {} is not writable", dir.display()))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["tele-dl", "--link", "https://telegra.ph/Sample-01-01"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_run_config_from_defaults() {
        let config = RunConfig::from_args(&args(&[])).unwrap();
        assert_eq!(config.page_path, "Sample-01-01");
        assert_eq!(config.workers, 50);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_policy.max_attempts(), 4);
        assert_eq!(config.retry_policy.backoff_unit(), Duration::from_secs(1));
        assert!(config.deadline.is_none());
    }

    #[test]
    fn test_run_config_rejects_foreign_link() {
        let parsed =
            Args::try_parse_from(["tele-dl", "--link", "https://example.com/page"]).unwrap();
        let err = RunConfig::from_args(&parsed).unwrap_err();
        assert!(err.to_string().contains("example.com"), "got: {err}");
    }

    #[test]
    fn test_run_config_rejects_bad_file_base() {
        let err = RunConfig::from_args(&args(&["--file-base", "ftp://files"])).unwrap_err();
        assert!(err.to_string().contains("--file-base"), "got: {err}");
    }

    #[test]
    fn test_run_config_drops_blank_extensions() {
        let config = RunConfig::from_args(&args(&["--ext", "jpg", "--ext", " . "])).unwrap();
        assert_eq!(config.extensions, ["jpg"]);
    }

    #[test]
    fn test_download_options_carry_settings() {
        let config =
            RunConfig::from_args(&args(&["-w", "3", "-o", "out", "--retries", "0"])).unwrap();
        let options = config.download_options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.output_dir, PathBuf::from("out"));
        assert_eq!(options.retry_policy.max_attempts(), 1);
    }

    #[test]
    fn test_prepare_output_dir_creates_nested() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        prepare_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_output_dir_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(prepare_output_dir(&file).is_err());
    }
}
