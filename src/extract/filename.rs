//! Output filename derivation for extracted media.
//!
//! Filenames follow `<index>_<basename><ext>`. The index prefix is what keeps
//! names unique within a run; basenames may collide freely.

/// Path fragment identifying media hosted on Telegraph's own file storage.
pub const FILE_STORAGE_MARKER: &str = "/file/";

/// Extension used when none can be inferred.
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Builds the output filename for the media item at `index`.
///
/// The basename is the last `/`-separated segment of `url` with any query
/// string or fragment removed. When it has no extension one is inferred:
/// Telegraph file-storage URLs get [`DEFAULT_EXTENSION`], other URLs get the
/// first entry of `extensions` whose dotless form appears anywhere in the
/// lowercased URL, falling back to [`DEFAULT_EXTENSION`].
///
/// # Examples
///
/// ```
/// use tele_dl::extract::derive_filename;
///
/// let exts = vec![".png".to_string(), ".mp4".to_string()];
/// assert_eq!(derive_filename("https://telegra.ph/file/abc.png?x=1", 0, &exts), "0_abc.png");
/// assert_eq!(derive_filename("/file/abc", 3, &exts), "3_abc.jpg");
/// assert_eq!(derive_filename("https://cdn.example/v/clip?fmt=MP4", 1, &exts), "1_clip.mp4");
/// ```
#[must_use]
pub fn derive_filename(url: &str, index: usize, extensions: &[String]) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    let basename = segment
        .find(['?', '#'])
        .map_or(segment, |cut| &segment[..cut]);

    if has_extension(basename) {
        format!("{index}_{basename}")
    } else {
        let ext = infer_extension(url, extensions);
        format!("{index}_{basename}{ext}")
    }
}

fn has_extension(basename: &str) -> bool {
    basename.contains('.')
}

fn infer_extension<'a>(url: &str, extensions: &'a [String]) -> &'a str {
    if url.contains(FILE_STORAGE_MARKER) {
        return DEFAULT_EXTENSION;
    }

    let lower = url.to_lowercase();
    extensions
        .iter()
        .find(|ext| {
            let bare = ext.trim_start_matches('.').to_lowercase();
            !bare.is_empty() && lower.contains(&bare)
        })
        .map_or(DEFAULT_EXTENSION, String::as_str)
}

/// Returns the lowercased extension of `filename` including the dot, if any.
pub(crate) fn extension_of(filename: &str) -> Option<String> {
    let dot = filename.rfind('.')?;
    let ext = &filename[dot..];
    (ext.len() > 1).then(|| ext.to_lowercase())
}
