//! GET URL construction.

use url::form_urlencoded;

/// Appends `params` to `url` as a query string, merging with any query
/// already present.
///
/// On a key collision the new value replaces the existing one. Existing keys
/// keep their position and new keys follow in the given order. An empty URL
/// yields an empty string, and an empty `params` returns `url` untouched.
///
/// ```
/// use webarchiver::connector::create_get_url;
///
/// assert_eq!(
///     create_get_url("https://example.com/list?page=1&sort=asc", &[("page", "2")]),
///     "https://example.com/list?page=2&sort=asc"
/// );
/// ```
#[must_use]
pub fn create_get_url<K, V>(url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if url.is_empty() {
        return String::new();
    }
    if params.is_empty() {
        return url.to_string();
    }

    let (base, existing) = match url.rfind('?') {
        Some(idx) => (&url[..idx], &url[idx + 1..]),
        None => (url, ""),
    };

    let mut merged: Vec<(String, String)> = form_urlencoded::parse(existing.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    for (key, value) in params {
        let (key, value) = (key.as_ref(), value.as_ref());
        match merged.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                merged[pos].1 = value.to_string();
                let mut seen = false;
                merged.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => merged.push((key.to_string(), value.to_string())),
        }
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(merged)
        .finish();
    format!("{base}?{query}")
}
