//! Shared User-Agent strings for the fetcher and both connector variants.
//!
//! Remote hosts serving images and rendered pages commonly reject unknown
//! clients, so every request identifies as one of a small set of real browsers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Browser identities available as `User-Agent` presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAgent {
    Firefox,
    #[default]
    Chrome,
    Edge,
    Ie11,
}

impl UserAgent {
    /// All presets, in display order.
    pub const ALL: [UserAgent; 4] = [Self::Firefox, Self::Chrome, Self::Edge, Self::Ie11];

    /// Returns the full header value for this preset.
    #[must_use]
    pub fn as_header_value(self) -> &'static str {
        match self {
            Self::Firefox => {
                "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:50.0) Gecko/20100101 Firefox/50.0"
            }
            Self::Chrome => {
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Ubuntu Chromium/53.0.2785.143 Chrome/53.0.2785.143 Safari/537.36"
            }
            Self::Edge => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/42.0.2311.135 Safari/537.36 Edge/12.246"
            }
            Self::Ie11 => "Mozilla/5.0 (Windows NT 6.1; WOW64; Trident/7.0; AS; rv:11.0) like Gecko",
        }
    }

    /// Stable lowercase label, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Ie11 => "ie11",
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a preset label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user agent preset '{0}' (expected one of: firefox, chrome, edge, ie11)")]
pub struct UnknownUserAgent(pub String);

impl FromStr for UserAgent {
    type Err = UnknownUserAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ua| ua.as_str() == label)
            .ok_or_else(|| UnknownUserAgent(s.to_string()))
    }
}
