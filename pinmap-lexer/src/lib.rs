use logos::Logos;

/// Helper function to unescape string literals
fn unescape_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('\\') => result.push('\\'),
                Some('u') => {
                    // Unicode escape: \uXXXX
                    let hex: String = chars.by_ref().take(4).collect();
                    let decoded = Some(&hex)
                        .filter(|hex| hex.len() == 4)
                        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                        .and_then(char::from_u32);
                    match decoded {
                        Some(unicode_char) => result.push(unicode_char),
                        // Malformed: keep the text as written
                        None => {
                            result.push_str("\\u");
                            result.push_str(&hex);
                        }
                    }
                }
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Strips the surrounding quotes (single or double) and unescapes the body
fn string_literal(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s.get(1..s.len().saturating_sub(1))
        .map(unescape_string)
        .unwrap_or_default()
}

/// Token types for import-map directive files
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Directives
    #[token("pin")]
    Pin,
    #[token("pin_all_from")]
    #[token("pinAll")]
    PinAllFrom,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r#""([^"\\]|\\.)*""#, string_literal)]
    #[regex(r#"'([^'\\]|\\.)*'"#, string_literal)]
    StringLiteral(String),

    // Option key with its trailing colon: `to:`, `preload:`, `under:`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*:", |lex| {
        let s = lex.slice();
        s.trim_end_matches(':').to_string()
    })]
    Key(String),

    // Bare words are never valid on their own; kept so the parser can name them
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Delimiters
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // Comments (skip)
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

impl Token {
    /// Short human-readable description used in parser messages
    pub fn describe(&self) -> String {
        match self {
            Token::Pin => "`pin`".to_string(),
            Token::PinAllFrom => "`pin_all_from`".to_string(),
            Token::True => "`true`".to_string(),
            Token::False => "`false`".to_string(),
            Token::StringLiteral(s) => format!("string \"{}\"", s),
            Token::Key(k) => format!("option `{}:`", k),
            Token::Ident(i) => format!("identifier `{}`", i),
            Token::Comma => "`,`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Comment => "comment".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<TokenSpan, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.inner.next()?;
        let span = self.inner.span();

        match token {
            Ok(tok) => Some(Ok(TokenSpan { token: tok, span })),
            Err(_) => Some(Err(LexError::InvalidToken { span: span.clone() })),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Invalid token at {span:?}")]
    InvalidToken { span: std::ops::Range<usize> },
}

impl LexError {
    pub fn span(&self) -> std::ops::Range<usize> {
        match self {
            LexError::InvalidToken { span } => span.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_keywords() {
        let source = "pin pin_all_from pinAll";
        let mut lexer = Lexer::new(source);

        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Pin);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::PinAllFrom);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::PinAllFrom);
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_pin_with_options() {
        let source = r#"pin "@hotwired/stimulus", to: "stimulus.min.js", preload: true"#;
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();

        assert_eq!(
            tokens,
            vec![
                Token::Pin,
                Token::StringLiteral("@hotwired/stimulus".to_string()),
                Token::Comma,
                Token::Key("to".to_string()),
                Token::StringLiteral("stimulus.min.js".to_string()),
                Token::Comma,
                Token::Key("preload".to_string()),
                Token::True,
            ]
        );
    }

    #[test]
    fn test_single_quoted_and_escaped_strings() {
        let source = r#"'it\'s' "say \"hi\"""#;
        let mut lexer = Lexer::new(source);

        assert_eq!(
            lexer.next().unwrap().unwrap().token,
            Token::StringLiteral("it's".to_string())
        );
        assert_eq!(
            lexer.next().unwrap().unwrap().token,
            Token::StringLiteral("say \"hi\"".to_string())
        );
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(unescape_string(r"caf\u00e9"), "café");
        assert_eq!(unescape_string(r"\uZZ"), r"\uZZ");
        assert_eq!(unescape_string(r"a\u12"), r"a\u12");
        // Surrogate halves are not chars
        assert_eq!(unescape_string(r"\ud800x"), r"\ud800x");
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "# Pin all controllers\npin \"app\" # trailing\n";
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();

        assert_eq!(
            tokens,
            vec![Token::Pin, Token::StringLiteral("app".to_string())]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let source = "pinned pin";
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();

        assert_eq!(tokens[0], Token::Ident("pinned".to_string()));
        assert_eq!(tokens[1], Token::Pin);
    }

    #[test]
    fn test_invalid_token_span() {
        let source = "pin \"app\", to: 42";
        let err = Lexer::new(source)
            .find_map(|r| r.err())
            .expect("expected a lex error");

        assert_eq!(err.span(), 15..16);
    }
}
