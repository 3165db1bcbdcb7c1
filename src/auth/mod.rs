//! Cookie persistence for the request connector.
//!
//! Cookies live in a [`cookie_store::CookieStore`] behind a
//! [`reqwest_cookie_store::CookieStoreMutex`] that reqwest consults on every
//! request and updates from every response. The store persists to the
//! Netscape cookie file format, which browsers and `curl` also read and write.

mod netscape;

pub use netscape::{
    CookieError, NETSCAPE_HEADER, ParseResult, load_cookie_file, parse_netscape_cookies,
    save_cookie_file, write_netscape_cookies,
};
