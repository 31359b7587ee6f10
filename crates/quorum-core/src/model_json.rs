//! Typed parsing of free-text model output.
//!
//! Model JSON is malformed often enough that failure is a value, not an
//! error: [`ModelJson::parse`] returns `Unparsed(raw)` instead of failing.

use serde::de::DeserializeOwned;

/// Result of reading a typed value out of model text.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelJson<T> {
    Parsed(T),
    Unparsed(String),
}

impl<T: DeserializeOwned> ModelJson<T> {
    /// Parse `raw` as `T`, falling back to the outermost `{...}` span when
    /// the object is wrapped in prose or a code fence.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(value) = serde_json::from_str(trimmed) {
            return ModelJson::Parsed(value);
        }
        if let Some(span) = object_span(trimmed) {
            if let Ok(value) = serde_json::from_str(span) {
                return ModelJson::Parsed(value);
            }
        }
        ModelJson::Unparsed(raw.to_string())
    }
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
