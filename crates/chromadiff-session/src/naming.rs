//! Deterministic entry names for a diff request
//!
//! Paths may arrive as plain filesystem paths or as percent-encoded
//! `file://` URLs (the form file pickers hand out). Entry names only use
//! the decoded final path segment, so two requests sharing both filenames
//! overwrite each other.

use std::path::PathBuf;

use chromadiff_core::Channel;
use url::Url;

const FILE_URL_PREFIX: &str = "file://";

/// Filesystem path for a plain path or `file://` URL
///
/// URLs are percent-decoded. A URL that does not map to a local path
/// (for example one naming a remote host) falls back to the text after
/// the prefix.
pub fn local_path(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix(FILE_URL_PREFIX) else {
        return PathBuf::from(path);
    };

    match Url::parse(path) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .unwrap_or_else(|()| PathBuf::from(rest)),
        _ => PathBuf::from(rest),
    }
}

/// Last segment of a path or URL; empty when the path ends in a separator
pub fn file_name(path: &str) -> String {
    let local = local_path(path);
    let text = local.to_string_lossy();
    // A trailing separator must survive here, so no `Path::file_name`
    text.rsplit(['/', '\\']).next().unwrap_or_default().to_string()
}

/// Entry name of the diff map for `channel`
pub fn diff_entry(name_a: &str, name_b: &str, channel: Channel) -> String {
    format!("{name_a}{name_b}{}", channel.suffix())
}

/// Entry names in publication order: `[A, B, red, green, blue]`
///
/// Returns `None` when either path has no file name.
pub fn entry_names(path_a: &str, path_b: &str) -> Option<[String; 5]> {
    let a = file_name(path_a);
    let b = file_name(path_b);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let red = diff_entry(&a, &b, Channel::Red);
    let green = diff_entry(&a, &b, Channel::Green);
    let blue = diff_entry(&a, &b, Channel::Blue);
    Some([a, b, red, green, blue])
}
