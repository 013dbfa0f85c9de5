//! Local path naming for documents and their media.
//!
//! Document directories are named `<sanitized title>_<popularity>`. Media
//! files keep the basename of their URL, with an image extension added for
//! imgur links that omit one.

use url::Url;

/// Host whose direct image links sometimes omit the file extension.
pub const IMGUR_HOST: &str = "imgur.com";

/// Extension appended to imgur links without one.
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// Filename used when a URL has no usable last segment.
const FALLBACK_MEDIA_NAME: &str = "image.jpg";

/// Characters that cannot appear in a path component on common filesystems.
const ILLEGAL_PATH_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Removes characters that are illegal in file paths.
///
/// Only the illegal characters are dropped; everything else, including
/// non-ASCII text and spaces, is preserved. Applying it twice is a no-op.
///
/// # Example
///
/// ```
/// use ptt_spider::naming::sanitize_title;
///
/// assert_eq!(sanitize_title("a/b:c"), "abc");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !ILLEGAL_PATH_CHARS.contains(c))
        .collect()
}

/// Builds the directory name for a document.
#[must_use]
pub fn directory_name(title: &str, popularity: i32) -> String {
    format!("{}_{popularity}", sanitize_title(title))
}

/// Computes the local filename for a resource URL.
///
/// Uses the percent-decoded last path segment of the URL, so the name on
/// disk matches the name shown in the link. When the URL points at imgur and
/// that segment has no extension, [`DEFAULT_IMAGE_EXTENSION`] is appended.
#[must_use]
pub fn media_filename(resource_url: &str) -> String {
    let base = url_basename(resource_url);
    let name = if resource_url.contains(IMGUR_HOST) && !base.contains('.') {
        format!("{base}{DEFAULT_IMAGE_EXTENSION}")
    } else {
        base
    };

    let cleaned = sanitize_title(&name);
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_MEDIA_NAME.to_string()
    } else {
        cleaned
    }
}

fn url_basename(resource_url: &str) -> String {
    if let Ok(parsed) = Url::parse(resource_url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
    {
        return decode_segment(last);
    }

    resource_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(decode_segment)
        .unwrap_or_default()
}

/// Percent-decodes a path segment, keeping it as-is when it is not UTF-8.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned())
}
