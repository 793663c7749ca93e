// Parser for import-map directive files

use crate::{Directive, ParseError, SourceLocation};
use pinmap_diagnostics::error_codes;
use pinmap_lexer::{Lexer, Token, TokenSpan};

mod directives;

pub struct Parser<'a> {
    pub(crate) tokens: Vec<TokenSpan>,
    pub(crate) current: usize,
    pub(crate) source: &'a str,
    pub(crate) file: String,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        Self::new_with_file("<input>", source)
    }

    pub fn new_with_file(file: &str, source: &'a str) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        for result in Lexer::new(source) {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => {
                    let span = e.span();
                    return Err(ParseError::LexerError {
                        location: SourceLocation::from_span(file, source, span.clone()),
                        text: source.get(span).unwrap_or_default().to_string(),
                    });
                }
            }
        }

        Ok(Self {
            tokens,
            current: 0,
            source,
            file: file.to_string(),
        })
    }

    /// Parse every directive in file order
    pub fn parse(&mut self) -> Result<Vec<Directive>, ParseError> {
        let mut directives = Vec::new();

        while !self.is_at_end() {
            if self.check(&Token::Pin) {
                directives.push(Directive::Pin(self.parse_pin()?));
            } else if self.check(&Token::PinAllFrom) {
                directives.push(Directive::PinAll(self.parse_pin_all()?));
            } else {
                return Err(self.error(
                    error_codes::UNEXPECTED_TOKEN,
                    &format!(
                        "Expected `pin` or `pin_all_from`, found {}",
                        self.describe_current()
                    ),
                ));
            }
        }

        Ok(directives)
    }

    // ==================== Helper Methods ====================

    pub(crate) fn match_token(&mut self, kind: &Token) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &Token) -> bool {
        self.tokens
            .get(self.current)
            .is_some_and(|t| std::mem::discriminant(&t.token) == std::mem::discriminant(kind))
    }

    pub(crate) fn advance(&mut self) -> Option<&TokenSpan> {
        let token = self.tokens.get(self.current);
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|t| &t.token)
    }

    /// Describe the current token for error messages
    pub(crate) fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of file".to_string(), Token::describe)
    }

    /// Location of the current token, or of the end of file
    pub(crate) fn location(&self) -> SourceLocation {
        match self.tokens.get(self.current) {
            Some(t) => SourceLocation::from_span(&self.file, self.source, t.span.clone()),
            None => SourceLocation::end_of(&self.file, self.source),
        }
    }

    pub(crate) fn location_of(&self, span: std::ops::Range<usize>) -> SourceLocation {
        SourceLocation::from_span(&self.file, self.source, span)
    }

    pub(crate) fn consume(&mut self, kind: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(error_codes::UNEXPECTED_TOKEN, message))
        }
    }

    pub(crate) fn error(&self, code: &'static str, message: &str) -> ParseError {
        if self.is_at_end() {
            return ParseError::SyntaxError {
                location: self.location(),
                code: error_codes::UNEXPECTED_EOF,
                message: format!("{} (reached end of file)", message),
                help: None,
            };
        }

        ParseError::SyntaxError {
            location: self.location(),
            code,
            message: message.to_string(),
            help: None,
        }
    }
}
