//! Error types for CityGML parsing
//!
//! This module provides the fatal [`Error`] type returned by parsing and lookup
//! operations, plus the [`Diagnostic`] records collected for content-level
//! problems the parser recovers from.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O errors
//! - **E2xxx**: Markup and document structure errors (fatal for the document)
//! - **E3xxx**: Content errors (recovered during parsing, reported as diagnostics)
//! - **E4xxx**: Lookup and reference errors
//!
//! ## Common Error Codes
//!
//! - `E1001`: I/O error reading the document
//! - `E2001`: XML parsing error
//! - `E2002`: XML attribute error
//! - `E2003`: Malformed document structure
//! - `E3001`: Invalid linear ring
//! - `E3002`: Tessellation failure
//! - `E3003`: Numeric parse error
//! - `E4001`: Definition not found
//! - `E4002`: Dangling reference
//! - `E4003`: Texture loading failed

use std::io;
use thiserror::Error;

use crate::tessellator::TessellationError;

/// Result type for CityGML operations
pub type Result<T> = std::result::Result<T, Error>;

/// Additional context for structural errors
///
/// Carries the element being processed, the byte offset reported by the markup
/// reader, and an optional hint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// The element where the error occurred
    pub element: Option<String>,

    /// Byte offset into the document (when the event source reports one)
    pub byte_offset: Option<u64>,

    /// A helpful hint for resolving the error
    pub hint: Option<String>,
}

impl ErrorContext {
    /// Create a new empty error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error context with just a hint
    pub fn with_hint(hint: impl Into<String>) -> Self {
        Self {
            hint: Some(hint.into()),
            ..Self::default()
        }
    }

    /// Set the element name
    pub fn element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Set the byte offset
    pub fn byte_offset(mut self, offset: u64) -> Self {
        self.byte_offset = Some(offset);
        self
    }

    /// Set the hint
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if let Some(ref element) = self.element {
            parts.push(format!("Element: <{}>", element));
        }

        if let Some(offset) = self.byte_offset {
            parts.push(format!("Location: byte {}", offset));
        }

        if let Some(ref hint) = self.hint {
            parts.push(format!("Hint: {}", hint));
        }

        if !parts.is_empty() {
            write!(f, "\n{}", parts.join("\n"))
        } else {
            Ok(())
        }
    }
}

/// Errors that can occur when parsing CityGML documents
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading the document
    ///
    /// **Error Code**: E1001
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// XML parsing error reported by the markup reader
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Malformed XML syntax
    /// - Invalid character encoding
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - Duplicate attribute
    /// - Attribute without a quoted value
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Malformed document structure
    ///
    /// **Error Code**: E2003
    ///
    /// This error aborts the parse of the current document.
    ///
    /// **Common Causes**:
    /// - Closing an element that does not match the innermost open element
    /// - Document ends while elements are still open
    /// - Events delivered after the factory aborted
    #[error("[E2003] Malformed document structure: {0}")]
    MalformedStructure(String),

    /// A linear ring failed validation
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - Fewer than 3 distinct points
    /// - Missing closing point when explicit closure is required
    #[error("[E3001] Invalid linear ring: {0}")]
    InvalidRing(String),

    /// A polygon could not be tessellated
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Tessellation failed: {0}")]
    Tessellation(#[from] TessellationError),

    /// Parse error for numeric values
    ///
    /// **Error Code**: E3003
    ///
    /// **Suggestions**:
    /// - Verify numeric values use proper format (e.g., "1.5" not "1,5")
    #[error("[E3003] Parse error: {0}")]
    ParseError(String),

    /// No definition is registered under the requested id
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Definition not found: {0}")]
    NotFound(String),

    /// A reference was still unresolved at the end of the document
    ///
    /// **Error Code**: E4002
    #[error("[E4002] Dangling reference: {0}")]
    DanglingReference(String),

    /// The external texture loader failed
    ///
    /// **Error Code**: E4003
    #[error("[E4003] Texture loading failed: {0}")]
    TextureLoad(String),
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create a MalformedStructure error with context
    ///
    /// # Example
    /// ```ignore
    /// Error::malformed("close tag does not match", ErrorContext::new().element("gml:Polygon"))
    /// ```
    pub fn malformed(message: &str, context: ErrorContext) -> Self {
        Error::MalformedStructure(format!("{}{}", message, context))
    }

    /// Create a ParseError with context about what was being parsed
    ///
    /// # Arguments
    /// * `field_name` - The name of the field being parsed (e.g., "posList")
    /// * `value` - The value that failed to parse
    /// * `expected_type` - The expected type (e.g., "floating-point number")
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'",
            field_name, expected_type, value
        ))
    }

    /// True for errors that abort the parse of a document
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Xml(_) | Error::XmlAttr(_) | Error::MalformedStructure(_)
        )
    }
}

/// Category of a recovered content-level problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A ring had too few distinct points or was not closed; its polygon was dropped
    InvalidRing,
    /// A polygon could not be tessellated; its mesh is left empty
    TessellationFailure,
    /// A reference was never resolved
    DanglingReference,
    /// An attribute value did not match the type its schema expects
    AttributeTypeMismatch,
    /// A value could not be parsed (coordinates, numbers, colours)
    InvalidValue,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticKind::InvalidRing => "invalid ring",
            DiagnosticKind::TessellationFailure => "tessellation failure",
            DiagnosticKind::DanglingReference => "dangling reference",
            DiagnosticKind::AttributeTypeMismatch => "attribute type mismatch",
            DiagnosticKind::InvalidValue => "invalid value",
        };
        f.write_str(name)
    }
}

/// A content-level problem recovered during parsing
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What went wrong
    pub kind: DiagnosticKind,
    /// Human-readable description
    pub message: String,
    /// Id of the affected object, polygon or definition, when known
    pub element_id: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            element_id: None,
        }
    }

    /// Attach the id of the affected element
    pub fn with_element_id(mut self, id: Option<String>) -> Self {
        self.element_id = id;
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.element_id {
            Some(ref id) => write!(f, "{} ({}): {}", self.kind, id, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let malformed = Error::MalformedStructure("test".to_string());
        assert!(malformed.to_string().contains("[E2003]"));

        let ring = Error::InvalidRing("2 distinct points".to_string());
        assert!(ring.to_string().contains("[E3001]"));

        let parse_err = Error::ParseError("test".to_string());
        assert!(parse_err.to_string().contains("[E3003]"));

        let not_found = Error::NotFound("mat-1".to_string());
        assert!(not_found.to_string().contains("[E4001]"));
    }

    #[test]
    fn test_malformed_helper() {
        let err = Error::malformed(
            "close tag does not match",
            ErrorContext::new().element("gml:Polygon").byte_offset(120),
        );
        let message = err.to_string();
        assert!(message.contains("[E2003]"));
        assert!(message.contains("Element: <gml:Polygon>"));
        assert!(message.contains("Location: byte 120"));
        assert!(err.is_structural());
    }

    #[test]
    fn test_parse_error_with_context_helper() {
        let err = Error::parse_error_with_context("posList", "abc", "floating-point number");
        assert!(err.to_string().contains("posList"));
        assert!(err.to_string().contains("'abc'"));
        assert!(!err.is_structural());
    }

    #[test]
    fn test_parse_float_error_conversion() {
        let parse_err: std::num::ParseFloatError = "not_a_number".parse::<f64>().unwrap_err();
        let err = Error::from(parse_err);
        assert!(err.to_string().contains("Failed to parse floating-point number"));
    }

    #[test]
    fn test_error_context_display_empty() {
        assert_eq!(ErrorContext::new().to_string(), "");
        assert!(ErrorContext::with_hint("check nesting")
            .to_string()
            .contains("Hint: check nesting"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(DiagnosticKind::InvalidRing, "only 2 distinct points")
            .with_element_id(Some("poly-1".to_string()));
        assert_eq!(
            diag.to_string(),
            "invalid ring (poly-1): only 2 distinct points"
        );
    }
}
