//! Netscape cookie file reader and writer.
//!
//! The format has 7 TAB-separated fields per line:
//! `domain`, `tailmatch`, `path`, `secure`, `expires`, `name`, `value`.
//! Curl's `#HttpOnly_` domain prefix is accepted on read and written back for
//! http-only cookies. Lines map to and from [`cookie_store::Cookie`].

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use cookie_store::{Cookie, CookieDomain, CookieExpiration, CookieStore, RawCookie};
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use url::Url;

/// Header line written at the top of every saved cookie file.
pub const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Errors that can occur while reading or writing a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number in the cookie file.
        line_number: usize,
        /// The offending line content, value redacted.
        content: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// I/O error on a cookie stream.
    #[error("failed to read cookie data: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error opening or writing a cookie file.
    #[error("cookie file {path}: {source}")]
    File {
        /// The cookie file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No valid cookies found in a non-empty file.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

impl CookieError {
    /// Creates a file error with path context.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

/// Cookies parsed from a file plus warnings for malformed lines.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<Cookie<'static>>,
    /// Warnings for malformed lines (line number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file from a buffered reader.
///
/// Blank lines and `#` comments are skipped. Individual malformed lines are
/// collected as warnings (partial success).
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when a non-empty file yields zero valid cookies.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut data_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        let line = line.trim_end();

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.is_empty() || line.starts_with('#') => continue,
            None => (line, false),
        };

        data_lines += 1;

        match parse_cookie_line(line, line_number, http_only) {
            Ok(cookie) => {
                debug!(
                    line = line_number,
                    domain = %String::from(&cookie.domain),
                    name = cookie.name(),
                    "parsed cookie"
                );
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && data_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

/// Writes `cookies` in Netscape format, header first. Session cookies get an
/// expiry of `0`.
///
/// # Errors
///
/// Returns [`CookieError::Io`] if the writer fails.
pub fn write_netscape_cookies<'a>(
    mut writer: impl Write,
    cookies: impl IntoIterator<Item = &'a Cookie<'static>>,
) -> Result<usize, CookieError> {
    writeln!(writer, "{NETSCAPE_HEADER}")?;
    let mut written = 0;
    for cookie in cookies {
        let (domain, tailmatch) = match &cookie.domain {
            CookieDomain::HostOnly(host) => (host.clone(), "FALSE"),
            CookieDomain::Suffix(suffix) => (format!(".{suffix}"), "TRUE"),
            CookieDomain::NotPresent | CookieDomain::Empty => continue,
        };
        let prefix = if cookie.http_only().unwrap_or(false) {
            HTTP_ONLY_PREFIX
        } else {
            ""
        };
        let expires = match &cookie.expires {
            CookieExpiration::AtUtc(at) => at.unix_timestamp().max(1),
            CookieExpiration::SessionEnd => 0,
        };
        writeln!(
            writer,
            "{prefix}{domain}\t{tailmatch}\t{}\t{}\t{expires}\t{}\t{}",
            cookie.path.as_ref(),
            if cookie.secure().unwrap_or(false) {
                "TRUE"
            } else {
                "FALSE"
            },
            cookie.name(),
            cookie.value()
        )?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Merges the cookie file at `path` into `store` and returns how many cookies
/// were added. A missing file loads nothing. Expired entries are skipped.
///
/// # Errors
///
/// Returns [`CookieError::File`] if the file exists but cannot be opened, or
/// [`CookieError::NoCookiesFound`] if no line of a non-empty file is valid.
#[instrument(level = "debug", skip(store), fields(path = %path.display()))]
pub fn load_cookie_file(store: &mut CookieStore, path: &Path) -> Result<usize, CookieError> {
    if !path.exists() {
        debug!("no cookie file, starting empty");
        return Ok(0);
    }
    let file = File::open(path).map_err(|e| CookieError::file(path, e))?;
    let parsed = parse_netscape_cookies(BufReader::new(file))?;

    let mut loaded = 0;
    for cookie in parsed.cookies {
        if cookie.is_expired() {
            continue;
        }
        let Some(origin) = cookie_origin(&cookie) else {
            continue;
        };
        match store.insert(cookie, &origin) {
            Ok(_) => loaded += 1,
            Err(e) => warn!(origin = %origin, error = %e, "cookie rejected by store"),
        }
    }
    debug!(
        cookies = loaded,
        warnings = parsed.warnings.len(),
        "cookie file loaded"
    );
    Ok(loaded)
}

/// Writes every unexpired cookie of `store`, session cookies included, to `path`.
///
/// # Errors
///
/// Returns [`CookieError::File`] if the file cannot be created or written.
#[instrument(level = "debug", skip(store), fields(path = %path.display()))]
pub fn save_cookie_file(store: &CookieStore, path: &Path) -> Result<usize, CookieError> {
    let file = File::create(path).map_err(|e| CookieError::file(path, e))?;
    let written = write_netscape_cookies(BufWriter::new(file), store.iter_unexpired()).map_err(
        |e| match e {
            CookieError::Io(source) => CookieError::file(path, source),
            other => other,
        },
    )?;
    debug!(cookies = written, "cookie file saved");
    Ok(written)
}

/// A URL the cookie could have been set from, used to re-insert it into a store.
fn cookie_origin(cookie: &Cookie<'_>) -> Option<Url> {
    let host = cookie.domain.as_cow()?;
    let scheme = if cookie.secure().unwrap_or(false) {
        "https"
    } else {
        "http"
    };
    Url::parse(&format!("{scheme}://{host}{}", cookie.path.as_ref())).ok()
}

fn parse_cookie_line(
    line: &str,
    line_number: usize,
    http_only: bool,
) -> Result<Cookie<'static>, CookieError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 7 {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("expected 7 TAB-separated fields, found {}", fields.len()),
        });
    }

    let domain = fields[0];
    let tailmatch = parse_bool_field(fields[1], "tailmatch", line_number, line)?;
    let path = fields[2];
    let secure = parse_bool_field(fields[3], "secure", line_number, line)?;

    let expires = fields[4]
        .parse::<u64>()
        .map_err(|_| CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!(
                "expires field must be a non-negative integer, got '{}'",
                fields[4]
            ),
        })?;

    let name = fields[5];

    if domain.trim_start_matches('.').is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "domain field is empty".to_string(),
        });
    }

    if name.is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "cookie name field is empty".to_string(),
        });
    }

    let invalid = |reason: String| CookieError::InvalidLine {
        line_number,
        content: redact_line_for_error(line),
        reason,
    };

    let host = domain.trim_start_matches('.');
    let path = if path.is_empty() { "/" } else { path };
    let scheme = if secure { "https" } else { "http" };
    let origin = Url::parse(&format!("{scheme}://{host}/"))
        .map_err(|e| invalid(format!("domain '{host}' is not a valid host: {e}")))?;

    let mut raw = RawCookie::build((name.to_string(), fields[6].to_string()))
        .path(path.to_string())
        .secure(secure)
        .http_only(http_only);
    if tailmatch {
        raw = raw.domain(host.to_string());
    }
    if expires > 0 {
        let at = i64::try_from(expires)
            .ok()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .ok_or_else(|| invalid(format!("expires field out of range: {expires}")))?;
        raw = raw.expires(at);
    }

    Cookie::try_from_raw_cookie(&raw.build(), &origin)
        .map(Cookie::into_owned)
        .map_err(|e| invalid(format!("cookie rejected: {e}")))
}

fn parse_bool_field(
    value: &str,
    field_name: &str,
    line_number: usize,
    line: &str,
) -> Result<bool, CookieError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("{field_name} field must be TRUE or FALSE, got '{value}'"),
        }),
    }
}

/// Redacts the value field (7th) for safe error messages.
fn redact_line_for_error(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        let mut redacted = fields[..6].join("\t");
        redacted.push_str("\t[REDACTED]");
        redacted
    } else {
        line.to_string()
    }
}
