//! Passes applied to a finished extraction: deduplication, validation,
//! extension filtering and grouping.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;

use super::MediaItem;
use super::filename::extension_of;

/// A problem found on a single media item. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Location of the offending value, e.g. `items[3].filename`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: String, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// Ordered collection of validation findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Returns `true` when nothing was flagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates findings in item order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Flags empty URLs, empty filenames and filenames containing `..`.
///
/// Items are only reported on, never removed.
#[must_use]
pub fn validate(items: &[MediaItem]) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for (i, item) in items.iter().enumerate() {
        if item.url.is_empty() {
            errors.push(ValidationError::new(format!("items[{i}].url"), "cannot be empty"));
        }
        if item.filename.is_empty() {
            errors.push(ValidationError::new(
                format!("items[{i}].filename"),
                "cannot be empty",
            ));
        }
        if item.filename.contains("..") {
            errors.push(ValidationError::new(
                format!("items[{i}].filename"),
                "contains path traversal",
            ));
        }
    }

    errors
}

/// Drops every item whose exact URL was already seen earlier in the list.
///
/// Survivors keep their position and their original filename (and so their index).
#[must_use]
pub fn deduplicate(items: &[MediaItem]) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.url.as_str()))
        .cloned()
        .collect()
}

/// Keeps items whose filename extension is one of `extensions`.
///
/// Comparison is case-insensitive and tolerates extensions given without the
/// leading dot. An empty filter keeps everything.
#[must_use]
pub fn filter_by_extension(items: &[MediaItem], extensions: &[String]) -> Vec<MediaItem> {
    if extensions.is_empty() {
        return items.to_vec();
    }
    let wanted: HashSet<String> = extensions
        .iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
        .collect();

    items
        .iter()
        .filter(|item| extension_of(&item.filename).is_some_and(|ext| wanted.contains(&ext)))
        .cloned()
        .collect()
}

/// Groups items by lowercased filename extension; items without one go under `unknown`.
#[must_use]
pub fn group_by_extension(items: &[MediaItem]) -> BTreeMap<String, Vec<MediaItem>> {
    let mut groups: BTreeMap<String, Vec<MediaItem>> = BTreeMap::new();
    for item in items {
        let key = extension_of(&item.filename).unwrap_or_else(|| "unknown".to_string());
        groups.entry(key).or_default().push(item.clone());
    }
    groups
}
