//! Collection naming: title sanitization and staged entry file names.
//!
//! Titles become directory names and URLs contribute only their extension;
//! staged files are always named by position so archives sort naturally.

use url::Url;

/// Characters that are not allowed in a collection directory name.
const UNSAFE_TITLE_CHARS: [char; 8] = ['<', '>', ':', '"', '/', '|', '?', '*'];

/// Returns `name` with every `< > : " / | ? *` removed.
///
/// Nothing else is touched: whitespace is kept, the result may be empty, and
/// two different titles may map to the same name. Callers that care must check.
#[must_use]
pub fn sanitize_title(name: &str) -> String {
    name.chars()
        .filter(|c| !UNSAFE_TITLE_CHARS.contains(c))
        .collect()
}

/// Extension of the last path segment of `url`, including the leading dot.
///
/// Leading and trailing slashes of the path are ignored, and a dot that only
/// starts the segment (`/.hidden`) does not count. Returns an empty string when
/// the segment has no extension or the URL does not parse.
#[must_use]
pub fn extension_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let last_segment = parsed
        .path()
        .trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let stem_start = last_segment.len() - last_segment.trim_start_matches('.').len();
    match last_segment.rfind('.') {
        Some(dot) if dot >= stem_start => last_segment[dot..].to_string(),
        _ => String::new(),
    }
}

/// File name of the staged entry at zero-based `index`: `%02d` of `index + 1`
/// followed by `extension` verbatim.
#[must_use]
pub fn staged_file_name(index: usize, extension: &str) -> String {
    format!("{:02}{extension}", index + 1)
}
