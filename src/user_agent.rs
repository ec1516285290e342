//! Browser identity headers sent with every portal request.
//!
//! The portal serves its login flow to browsers, so the client presents itself
//! as desktop Chrome. Values are kept in one place so they can be bumped
//! together.

use reqwest::header::{
    ACCEPT, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, ORIGIN, REFERER, USER_AGENT,
};

/// Desktop Chrome User-Agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/94.0.4606.61 Safari/537.36";

/// Client hint matching [`BROWSER_USER_AGENT`].
pub const BROWSER_SEC_CH_UA: &str =
    r#""Chromium";v="94", "Google Chrome";v="94", ";Not A Brand";v="99""#;

const ACCEPT_HTML: &str = "text/html";

/// Builds the fixed header set for a portal whose identity host is `origin`.
///
/// # Errors
///
/// Returns [`InvalidHeaderValue`] if `origin` or `referer` contain bytes that
/// are not valid in a header.
pub(crate) fn browser_headers(origin: &str, referer: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(BROWSER_SEC_CH_UA),
    );
    headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
    headers.insert(REFERER, HeaderValue::from_str(referer)?);
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    Ok(headers)
}
