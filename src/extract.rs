//! Field extraction from portal responses.
//!
//! Portal pages carry the values this client needs in two shapes: attributes
//! on HTML elements (anti-forgery tokens) and assignments inside inline
//! JavaScript (the current status). Both sit behind [`FieldExtractor`] so the
//! portal code only asks for a named field and never cares whether a regex or
//! a DOM query produced it.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;

/// Errors raised when an expected field is absent or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A required field was not present in the page.
    #[error("unable to find {field} in response")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The page has no `current_status` assignment.
    #[error("unable to extract working status: no current_status assignment in response")]
    StatusNotFound,

    /// The page has more than one `current_status` assignment.
    #[error("unable to extract working status: found {count} current_status assignments")]
    AmbiguousStatus {
        /// Number of assignments found.
        count: usize,
    },

    /// The toggle response body is not the expected JSON record.
    #[error("invalid toggle response: {0}")]
    InvalidToggleResponse(#[from] serde_json::Error),
}

/// Extracts every occurrence of one named field from a raw response body.
pub trait FieldExtractor {
    /// Field name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Returns all values of the field in document order.
    fn extract_all(&self, body: &str) -> Vec<String>;

    /// Returns the first value of the field, if present.
    fn extract_first(&self, body: &str) -> Option<String> {
        self.extract_all(body).into_iter().next()
    }
}

/// Field extractor backed by a regex whose first capture group is the value.
#[derive(Debug)]
pub struct PatternExtractor {
    name: &'static str,
    pattern: Regex,
}

impl PatternExtractor {
    /// Creates a pattern extractor from a compiled regex.
    #[must_use]
    pub fn new(name: &'static str, pattern: Regex) -> Self {
        Self { name, pattern }
    }
}

impl FieldExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract_all(&self, body: &str) -> Vec<String> {
        self.pattern
            .captures_iter(body)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

/// Field extractor backed by a CSS selector and an attribute read off each match.
#[derive(Debug)]
pub struct AttributeExtractor {
    name: &'static str,
    selector: Selector,
    attribute: &'static str,
}

impl AttributeExtractor {
    /// Creates an attribute extractor from a parsed selector.
    #[must_use]
    pub fn new(name: &'static str, selector: Selector, attribute: &'static str) -> Self {
        Self {
            name,
            selector,
            attribute,
        }
    }
}

impl FieldExtractor for AttributeExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract_all(&self, body: &str) -> Vec<String> {
        let document = Html::parse_document(body);
        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr(self.attribute))
            .map(str::to_string)
            .collect()
    }
}

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Parses a CSS selector at static init; panics on invalid selector.
fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e}"))
}

/// `var current_status = "<value>";` in the page's inline script.
pub static CURRENT_STATUS: LazyLock<PatternExtractor> = LazyLock::new(|| {
    PatternExtractor::new(
        "current_status",
        compile_static_regex(r#"var current_status = "(.*?)";"#),
    )
});

/// Anti-forgery token on the login page.
pub static CSRF_TOKEN: LazyLock<AttributeExtractor> = LazyLock::new(|| {
    AttributeExtractor::new(
        "csrf-token",
        compile_static_selector(r#"meta[name="csrf-token"]"#),
        "content",
    )
});

/// Token the toggle endpoint requires, found in the attendance page form.
pub static TOGGLE_TOKEN: LazyLock<AttributeExtractor> = LazyLock::new(|| {
    AttributeExtractor::new(
        "token",
        compile_static_selector(r#"input[name="token"]"#),
        "value",
    )
});

/// Extracts the current status; exactly one assignment must be present.
///
/// # Errors
///
/// Returns [`ExtractError::StatusNotFound`] or [`ExtractError::AmbiguousStatus`].
pub fn extract_status(body: &str) -> Result<String, ExtractError> {
    let mut values = CURRENT_STATUS.extract_all(body);
    match values.len() {
        0 => Err(ExtractError::StatusNotFound),
        1 => Ok(values.remove(0)),
        count => Err(ExtractError::AmbiguousStatus { count }),
    }
}

/// Extracts the login page's anti-forgery token.
///
/// # Errors
///
/// Returns [`ExtractError::MissingField`] if the meta tag is absent.
pub fn extract_csrf_token(body: &str) -> Result<String, ExtractError> {
    CSRF_TOKEN.extract_first(body).ok_or(ExtractError::MissingField {
        field: CSRF_TOKEN.name(),
    })
}

/// Extracts the toggle token if the page carries one.
#[must_use]
pub fn extract_toggle_token(body: &str) -> Option<String> {
    TOGGLE_TOKEN.extract_first(body)
}

/// JSON body returned by the toggle endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToggleResult {
    /// Status after the toggle.
    pub current_status: String,
    /// Portal result code, when present.
    #[serde(default)]
    pub result: Option<i64>,
    /// Portal state code, when present.
    #[serde(default)]
    pub state: Option<i64>,
}

/// Parses the toggle endpoint's JSON response.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidToggleResponse`] if the body is not JSON or
/// lacks `current_status`.
pub fn parse_toggle_result(body: &str) -> Result<ToggleResult, ExtractError> {
    Ok(serde_json::from_str(body)?)
}
