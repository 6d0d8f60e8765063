//! Domain models for markers, formats, and extraction results.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Attribute that tags an element for copying.
pub const COPY_ATTRIBUTE: &str = "copy";
/// Attribute that removes an element and its subtree from copying.
pub const NO_COPY_ATTRIBUTE: &str = "no-copy";

/// A single attribute on an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Output encodings a copy session can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Format {
    /// Extracted plain text.
    #[default]
    #[value(alias = "plain", alias = "txt")]
    Text,
    /// Plain text with heading, list item and blockquote prefixes.
    #[value(alias = "md")]
    Markdown,
    /// Serialized markup with excluded subtrees removed.
    #[value(alias = "htm")]
    Html,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Markdown => "markdown",
            Format::Html => "html",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = FormatParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" | "txt" => Ok(Format::Text),
            "markdown" | "md" => Ok(Format::Markdown),
            "html" | "htm" => Ok(Format::Html),
            other => Err(FormatParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`Format`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FormatParseError {
    #[error("unknown copy format '{0}'")]
    UnknownFormat(String),
}

/// Parsed value of a `copy` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Numeric ordering key.
    Ordered(i64),
    /// Boolean flag, empty value, or anything that is not a number.
    Unordered,
}

impl Marker {
    /// Parse a marker value the way `parseInt` reads it: leading whitespace, an optional sign,
    /// then as many decimal digits as are present. Trailing characters are ignored.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim_start();
        let sign_len = match trimmed.as_bytes().first() {
            Some(b'-' | b'+') => 1,
            _ => 0,
        };
        let digits = &trimmed[sign_len..];

        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        if end == 0 {
            return Marker::Unordered;
        }

        // The sign stays attached so `i64::MIN` still fits.
        match trimmed[..sign_len + end].parse::<i64>() {
            Ok(parsed) => Marker::Ordered(parsed),
            Err(_) => Marker::Unordered,
        }
    }

    pub fn key(&self) -> Option<i64> {
        match self {
            Marker::Ordered(key) => Some(*key),
            Marker::Unordered => None,
        }
    }
}

/// One rendered string per tagged element, in copy order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    parts: Vec<String>,
}

impl ExtractionResult {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Join the parts into the final clipboard payload.
    pub fn join(&self, separator: &str) -> String {
        self.parts.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("Markdown".parse::<Format>(), Ok(Format::Markdown));
        assert_eq!(" txt ".parse::<Format>(), Ok(Format::Text));
        assert_eq!("HTML".parse::<Format>(), Ok(Format::Html));
        assert!(matches!(
            "rtf".parse::<Format>(),
            Err(FormatParseError::UnknownFormat(ref name)) if name == "rtf"
        ));
    }

    #[test]
    fn markers_read_leading_integers() {
        assert_eq!(Marker::parse("3"), Marker::Ordered(3));
        assert_eq!(Marker::parse("  12 "), Marker::Ordered(12));
        assert_eq!(Marker::parse("-4"), Marker::Ordered(-4));
        assert_eq!(Marker::parse("2abc"), Marker::Ordered(2));
        assert_eq!(Marker::parse("+7"), Marker::Ordered(7));
    }

    #[test]
    fn markers_cover_the_full_i64_range() {
        assert_eq!(Marker::parse("-9223372036854775808"), Marker::Ordered(i64::MIN));
        assert_eq!(Marker::parse("9223372036854775807"), Marker::Ordered(i64::MAX));
        assert_eq!(Marker::parse("9223372036854775808"), Marker::Unordered);
        assert_eq!(Marker::parse("-9223372036854775809"), Marker::Unordered);
    }

    #[test]
    fn flags_and_words_are_unordered() {
        assert_eq!(Marker::parse(""), Marker::Unordered);
        assert_eq!(Marker::parse("true"), Marker::Unordered);
        assert_eq!(Marker::parse("-"), Marker::Unordered);
        assert_eq!(Marker::parse("first"), Marker::Unordered);
        assert_eq!(Marker::parse("99999999999999999999999"), Marker::Unordered);
    }
}
