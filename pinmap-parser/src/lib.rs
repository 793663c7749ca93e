use pinmap_diagnostics::{error_codes, Diagnostic, Span};
use thiserror::Error;

mod ast;
mod parser;

pub use ast::{Directive, PinAllDirective, PinDirective};
pub use parser::Parser;

/// Source code location for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl SourceLocation {
    pub fn from_span(file: &str, source: &str, span: std::ops::Range<usize>) -> Self {
        let span = Span::from_file_and_span(file, source, span);
        Self {
            file: span.file,
            line: span.line,
            column: span.column,
            length: span.length,
        }
    }

    /// Location of the end of `source`, used for "unexpected end of file"
    pub fn end_of(file: &str, source: &str) -> Self {
        Self::from_span(file, source, source.len()..source.len())
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    pub fn to_span(&self) -> Span {
        Span::new(self.file.clone(), self.line, self.column, self.length)
    }
}

#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("Parse error at {location}: {message}")]
    SyntaxError {
        location: SourceLocation,
        code: &'static str,
        message: String,
        help: Option<String>,
    },
    #[error("Lexer error at {location}: unrecognized input `{text}`")]
    LexerError {
        location: SourceLocation,
        text: String,
    },
}

impl ParseError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            ParseError::SyntaxError { location, .. } | ParseError::LexerError { location, .. } => {
                location
            }
        }
    }

    /// Convert to a renderable diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ParseError::SyntaxError {
                location,
                code,
                message,
                help,
            } => {
                let diag = Diagnostic::error(code, message.clone(), location.to_span());
                match help {
                    Some(help) => diag.with_help(help.clone()),
                    None => diag,
                }
            }
            ParseError::LexerError { location, text } => Diagnostic::error(
                error_codes::INVALID_TOKEN,
                format!("unrecognized input `{}`", text),
                location.to_span(),
            )
            .with_note("directives look like `pin \"name\", to: \"file.js\"`".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let error = ParseError::SyntaxError {
            location: SourceLocation {
                file: "importmap.pins".to_string(),
                line: 2,
                column: 5,
                length: 3,
            },
            code: error_codes::UNEXPECTED_TOKEN,
            message: "Expected module name".to_string(),
            help: None,
        };

        assert_eq!(
            error.to_string(),
            "Parse error at importmap.pins:2:5: Expected module name"
        );
        assert_eq!(error.to_diagnostic().code, "P0002");
    }

    #[test]
    fn test_location_at_end_of_source() {
        let location = SourceLocation::end_of("f.pins", "pin \"a\"\npin");
        assert_eq!(location.line, 2);
        assert_eq!(location.column, 4);
    }
}
