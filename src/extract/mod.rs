//! Media extraction from page content trees.
//!
//! [`MediaExtractor`] walks a content tree in document order and yields one
//! [`MediaItem`] per accepted media element:
//!
//! - the element's tag must be in the configured allow-set
//! - it must carry a non-empty string `src` attribute
//! - the optional URL filter must accept that `src`
//!
//! Indices are assigned only to yielded items, so they are dense (`0..n`)
//! no matter how many nodes were skipped in between. The index is baked into
//! the output filename (see [`derive_filename`]).
//!
//! Extraction is lazy: [`MediaExtractor::iter`] returns an iterator that only
//! walks as far as its consumer pulls, and can be created again over the same
//! tree to restart from the beginning.
//!
//! # Example
//!
//! ```
//! use tele_dl::extract::{MediaExtractor, deduplicate};
//! use tele_dl::page::ContentNode;
//!
//! let tree = vec![
//!     ContentNode::element("img").with_attr("src", "/file/a.jpg"),
//!     ContentNode::element("p").with_children([ContentNode::text()]),
//!     ContentNode::element("video").with_attr("src", "/file/b.mp4"),
//! ];
//!
//! let items = MediaExtractor::new().extract(&tree);
//! assert_eq!(items[0].filename, "0_a.jpg");
//! assert_eq!(items[1].filename, "1_b.mp4");
//! assert_eq!(deduplicate(&items).len(), 2);
//! ```

mod filename;
mod postprocess;
mod walker;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::page::{ContentNode, count_nodes};

pub use filename::{DEFAULT_EXTENSION, FILE_STORAGE_MARKER, derive_filename};
pub use postprocess::{
    ValidationError, ValidationErrors, deduplicate, filter_by_extension, group_by_extension,
    validate,
};
pub use walker::ContentWalker;

/// Tags accepted as media by default.
pub const DEFAULT_MEDIA_TAGS: &[&str] = &["img", "video", "audio", "source"];

/// Extensions tried, in order, when a URL basename has none.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".mp4", ".mov", ".avi", ".mp3", ".wav",
];

/// Attribute holding the media URL.
const SRC_ATTR: &str = "src";

/// A downloadable media reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItem {
    /// Source URL as written in the page, possibly relative.
    pub url: String,
    /// Output filename, `<index>_<basename><ext>`.
    pub filename: String,
}

impl MediaItem {
    /// Creates a media item.
    #[must_use]
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

/// A media item together with the element it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMedia {
    /// The extracted item.
    #[serde(flatten)]
    pub item: MediaItem,
    /// Tag of the source element.
    pub tag: String,
    /// `alt` attribute, if present as a string.
    pub alt: Option<String>,
    /// `title` attribute, if present as a string.
    pub title: Option<String>,
    /// Dense index of this item in the extraction run.
    pub index: usize,
}

/// Predicate deciding whether a `src` value is accepted.
pub type UrlFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Extraction settings.
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Tags treated as media candidates.
    pub supported_tags: Vec<String>,
    /// Extensions tried when a URL basename has none.
    pub file_extensions: Vec<String>,
    /// Optional `src` predicate; `None` accepts every URL.
    pub url_filter: Option<UrlFilter>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            supported_tags: DEFAULT_MEDIA_TAGS.iter().map(|s| (*s).to_string()).collect(),
            file_extensions: DEFAULT_FILE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            url_filter: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("supported_tags", &self.supported_tags)
            .field("file_extensions", &self.file_extensions)
            .field("url_filter", &self.url_filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Counters describing one full extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Every node in the tree, text leaves included.
    pub total_nodes: usize,
    /// Nodes whose tag is in the allow-set.
    pub candidate_nodes: usize,
    /// Candidates that produced an item.
    pub valid_media: usize,
    /// Candidates dropped for a missing, empty, non-string or filtered `src`.
    pub skipped_candidates: usize,
    /// Distinct URLs among the produced items.
    pub unique_urls: usize,
}

/// Extracts media items from content trees.
#[derive(Debug, Clone, Default)]
pub struct MediaExtractor {
    config: ExtractorConfig,
}

impl MediaExtractor {
    /// Creates an extractor with the default tag and extension lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor with custom settings.
    #[must_use]
    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Returns the active settings.
    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Returns a lazy iterator over the media in `nodes`, in document order.
    #[must_use]
    pub fn iter<'a>(&'a self, nodes: &'a [ContentNode]) -> MediaIter<'a> {
        MediaIter {
            walker: ContentWalker::new(nodes),
            extractor: self,
            next_index: 0,
            candidates: 0,
        }
    }

    /// Extracts every media item in document order.
    #[must_use]
    pub fn extract(&self, nodes: &[ContentNode]) -> Vec<MediaItem> {
        self.iter(nodes).map(|parsed| parsed.item).collect()
    }

    /// Extracts every media item along with its source element details.
    #[must_use]
    pub fn extract_detailed(&self, nodes: &[ContentNode]) -> Vec<ParsedMedia> {
        self.iter(nodes).collect()
    }

    /// Extracts every media item and reports counters for the run.
    #[must_use]
    #[instrument(level = "debug", skip_all, fields(root_nodes = nodes.len()))]
    pub fn extract_with_stats(&self, nodes: &[ContentNode]) -> (Vec<MediaItem>, ExtractionStats) {
        let mut iter = self.iter(nodes);
        let items: Vec<MediaItem> = iter.by_ref().map(|parsed| parsed.item).collect();

        let unique_urls = items
            .iter()
            .map(|item| item.url.as_str())
            .collect::<HashSet<_>>()
            .len();
        let stats = ExtractionStats {
            total_nodes: count_nodes(nodes),
            candidate_nodes: iter.candidates_seen(),
            valid_media: items.len(),
            skipped_candidates: iter.candidates_seen() - items.len(),
            unique_urls,
        };
        debug!(?stats, "extraction complete");

        (items, stats)
    }

    fn is_media_tag(&self, tag: &str) -> bool {
        self.config.supported_tags.iter().any(|t| t == tag)
    }

    fn parse_node(&self, node: &ContentNode, index: usize) -> Option<ParsedMedia> {
        let src = node.string_attr(SRC_ATTR).filter(|src| !src.is_empty())?;

        if let Some(filter) = &self.config.url_filter
            && !filter(src)
        {
            return None;
        }

        let filename = derive_filename(src, index, &self.config.file_extensions);
        Some(ParsedMedia {
            item: MediaItem::new(src, filename),
            tag: node.tag.clone(),
            alt: node.string_attr("alt").map(str::to_string),
            title: node.string_attr("title").map(str::to_string),
            index,
        })
    }
}

/// Lazy iterator over the media of a content tree.
///
/// Created by [`MediaExtractor::iter`].
#[derive(Debug, Clone)]
pub struct MediaIter<'a> {
    walker: ContentWalker<'a>,
    extractor: &'a MediaExtractor,
    next_index: usize,
    candidates: usize,
}

impl MediaIter<'_> {
    /// Nodes stepped over so far, text leaves included.
    #[must_use]
    pub fn nodes_visited(&self) -> usize {
        self.walker.visited()
    }

    /// Candidate elements seen so far, accepted or not.
    #[must_use]
    pub fn candidates_seen(&self) -> usize {
        self.candidates
    }
}

impl Iterator for MediaIter<'_> {
    type Item = ParsedMedia;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.walker.next()?;
            if !self.extractor.is_media_tag(&node.tag) {
                continue;
            }
            self.candidates += 1;

            if let Some(parsed) = self.extractor.parse_node(node, self.next_index) {
                self.next_index += 1;
                return Some(parsed);
            }
        }
    }
}
