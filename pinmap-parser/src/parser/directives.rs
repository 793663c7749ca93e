// `pin` and `pin_all_from` statements with their `key: value` options

use super::Parser;
use crate::{ParseError, PinAllDirective, PinDirective, SourceLocation};
use pinmap_diagnostics::{error_codes, fuzzy};
use pinmap_lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueKind {
    String,
    Bool,
}

impl ValueKind {
    fn describe(self) -> &'static str {
        match self {
            ValueKind::String => "a string",
            ValueKind::Bool => "`true` or `false`",
        }
    }
}

const PIN_OPTIONS: &[(&str, ValueKind)] = &[("to", ValueKind::String), ("preload", ValueKind::Bool)];

const PIN_ALL_OPTIONS: &[(&str, ValueKind)] = &[
    ("under", ValueKind::String),
    ("to", ValueKind::String),
    ("preload", ValueKind::Bool),
];

#[derive(Debug, Clone, PartialEq)]
enum OptionValue {
    String(String),
    Bool(bool),
}

impl OptionValue {
    fn kind(&self) -> ValueKind {
        match self {
            OptionValue::String(_) => ValueKind::String,
            OptionValue::Bool(_) => ValueKind::Bool,
        }
    }
}

/// Options given to one directive, in source order
#[derive(Debug, Default)]
struct DirectiveOptions {
    values: Vec<(String, OptionValue, SourceLocation)>,
}

impl DirectiveOptions {
    fn string(&self, key: &str) -> Option<String> {
        self.values.iter().find_map(|(k, v, _)| match v {
            OptionValue::String(s) if k == key => Some(s.clone()),
            _ => None,
        })
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.values.iter().find_map(|(k, v, _)| match v {
            OptionValue::Bool(b) if k == key => Some(*b),
            _ => None,
        })
    }

    fn location(&self, key: &str) -> Option<&SourceLocation> {
        self.values
            .iter()
            .find_map(|(k, _, location)| (k == key).then_some(location))
    }
}

impl<'a> Parser<'a> {
    /// pin "name" [, to: "file.js"] [, preload: bool]
    pub(crate) fn parse_pin(&mut self) -> Result<PinDirective, ParseError> {
        self.advance(); // consume 'pin'
        let parenthesized = self.match_token(&Token::LParen);

        let (name, location) = self.parse_argument("module name")?;
        let options = self.parse_options("pin", PIN_OPTIONS)?;
        self.finish_directive("pin", parenthesized)?;

        let to = options.string("to");
        if let (Some(""), Some(to_location)) = (to.as_deref(), options.location("to")) {
            return Err(ParseError::SyntaxError {
                location: to_location.clone(),
                code: error_codes::INVALID_OPTION_VALUE,
                message: format!("`to:` for `{}` must not be empty", name),
                help: Some(format!("drop the option to use the default `{}.js`", name)),
            });
        }

        Ok(PinDirective {
            name,
            to,
            preload: options.boolean("preload"),
            location,
        })
    }

    /// pin_all_from "dir" [, under: "prefix"] [, to: "asset/prefix"] [, preload: bool]
    pub(crate) fn parse_pin_all(&mut self) -> Result<PinAllDirective, ParseError> {
        self.advance(); // consume 'pin_all_from'
        let parenthesized = self.match_token(&Token::LParen);

        let (directory, location) = self.parse_argument("directory")?;
        let options = self.parse_options("pin_all_from", PIN_ALL_OPTIONS)?;
        self.finish_directive("pin_all_from", parenthesized)?;

        Ok(PinAllDirective {
            directory,
            under: options.string("under"),
            to: options.string("to"),
            preload: options.boolean("preload"),
            location,
        })
    }

    /// The leading string argument; must not be blank
    fn parse_argument(&mut self, what: &str) -> Result<(String, SourceLocation), ParseError> {
        let value = match self.peek() {
            Some(Token::StringLiteral(s)) => s.clone(),
            _ => {
                return Err(self.error(
                    error_codes::UNEXPECTED_TOKEN,
                    &format!("Expected {} string, found {}", what, self.describe_current()),
                ))
            }
        };
        let location = self.location();
        self.advance();

        if value.trim().is_empty() {
            return Err(ParseError::SyntaxError {
                location,
                code: error_codes::EMPTY_NAME,
                message: format!("{} must not be empty", what),
                help: None,
            });
        }

        Ok((value, location))
    }

    fn parse_options(
        &mut self,
        directive: &str,
        accepted: &[(&str, ValueKind)],
    ) -> Result<DirectiveOptions, ParseError> {
        let mut options = DirectiveOptions::default();

        while self.match_token(&Token::Comma) {
            let key = match self.peek() {
                Some(Token::Key(k)) => k.clone(),
                _ => {
                    return Err(self.error(
                        error_codes::UNEXPECTED_TOKEN,
                        &format!(
                            "Expected an option such as `to:` after `,`, found {}",
                            self.describe_current()
                        ),
                    ))
                }
            };
            let key_location = self.location();

            let Some(kind) = accepted
                .iter()
                .find_map(|(name, kind)| (*name == key).then_some(*kind))
            else {
                return Err(unknown_option(directive, &key, key_location, accepted));
            };

            if options.location(&key).is_some() {
                return Err(ParseError::SyntaxError {
                    location: key_location,
                    code: error_codes::DUPLICATE_OPTION,
                    message: format!("`{}:` given more than once for `{}`", key, directive),
                    help: None,
                });
            }
            self.advance();

            let value = match self.peek() {
                Some(Token::StringLiteral(s)) => OptionValue::String(s.clone()),
                Some(Token::True) => OptionValue::Bool(true),
                Some(Token::False) => OptionValue::Bool(false),
                _ => {
                    return Err(self.error(
                        error_codes::UNEXPECTED_TOKEN,
                        &format!(
                            "Expected a value for `{}:`, found {}",
                            key,
                            self.describe_current()
                        ),
                    ))
                }
            };

            if value.kind() != kind {
                return Err(ParseError::SyntaxError {
                    location: self.location(),
                    code: error_codes::INVALID_OPTION_VALUE,
                    message: format!("`{}:` expects {}", key, kind.describe()),
                    help: None,
                });
            }
            self.advance();

            options.values.push((key, value, key_location));
        }

        Ok(options)
    }

    /// Closing paren (if opened) and nothing but a new directive afterwards
    fn finish_directive(&mut self, directive: &str, parenthesized: bool) -> Result<(), ParseError> {
        if parenthesized {
            self.consume(
                &Token::RParen,
                &format!("Expected `)` to close `{}`", directive),
            )?;
        }

        if self.is_at_end() || self.check(&Token::Pin) || self.check(&Token::PinAllFrom) {
            return Ok(());
        }

        Err(self.error(
            error_codes::UNEXPECTED_TOKEN,
            &format!(
                "Expected `,` or a new directive after `{}`, found {}",
                directive,
                self.describe_current()
            ),
        ))
    }
}

fn unknown_option(
    directive: &str,
    key: &str,
    location: SourceLocation,
    accepted: &[(&str, ValueKind)],
) -> ParseError {
    let names: Vec<&str> = accepted.iter().map(|(name, _)| *name).collect();
    let help = fuzzy::find_similar_names(key, &names, 0.7, 1)
        .into_iter()
        .next()
        .map(|similar| format!("did you mean `{}:`?", similar));

    ParseError::SyntaxError {
        location,
        code: error_codes::UNKNOWN_OPTION,
        message: format!(
            "unknown option `{}:` for `{}` (accepted: {})",
            key,
            directive,
            names
                .iter()
                .map(|n| format!("`{}:`", n))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        help,
    }
}

#[cfg(test)]
mod tests {
    use crate::{Directive, ParseError, Parser};

    fn parse(source: &str) -> Result<Vec<Directive>, ParseError> {
        Parser::new_with_file("importmap.pins", source)?.parse()
    }

    #[test]
    fn test_pin_defaults() {
        let directives = parse(r#"pin "blogh/application""#).unwrap();

        match &directives[0] {
            Directive::Pin(pin) => {
                assert_eq!(pin.name, "blogh/application");
                assert_eq!(pin.to, None);
                assert_eq!(pin.preload, None);
                assert_eq!(pin.location.line, 1);
                assert_eq!(pin.location.column, 5);
            }
            other => panic!("expected pin, got {other:?}"),
        }
    }

    #[test]
    fn test_pin_all_with_all_options() {
        let directives = parse(
            r#"pin_all_from "app/javascript/blogh/controllers", under: "controllers", to: "blogh/controllers", preload: false"#,
        )
        .unwrap();

        match &directives[0] {
            Directive::PinAll(pin_all) => {
                assert_eq!(pin_all.directory, "app/javascript/blogh/controllers");
                assert_eq!(pin_all.under.as_deref(), Some("controllers"));
                assert_eq!(pin_all.to.as_deref(), Some("blogh/controllers"));
                assert_eq!(pin_all.preload, Some(false));
            }
            other => panic!("expected pin_all_from, got {other:?}"),
        }
    }

    #[test]
    fn test_parenthesized_form() {
        let directives = parse(r#"pin("app", to: "application.js") pinAll("controllers", under: "controllers")"#)
            .unwrap();
        assert_eq!(directives.len(), 2);
    }

    #[test]
    fn test_unknown_option_suggests_closest() {
        let err = parse(r#"pin_all_from "controllers", undr: "controllers""#).unwrap_err();

        match err {
            ParseError::SyntaxError { code, help, location, .. } => {
                assert_eq!(code, "P0004");
                assert_eq!(help.as_deref(), Some("did you mean `under:`?"));
                assert_eq!(location.column, 29);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_option_not_valid_for_directive() {
        let err = parse(r#"pin "app", under: "x""#).unwrap_err();
        assert!(err.to_string().contains("unknown option `under:` for `pin`"));
    }

    #[test]
    fn test_wrong_value_type() {
        let err = parse(r#"pin "app", preload: "yes""#).unwrap_err();
        assert!(err.to_string().contains("`preload:` expects `true` or `false`"));

        let err = parse(r#"pin "app", to: true"#).unwrap_err();
        assert!(err.to_string().contains("`to:` expects a string"));
    }

    #[test]
    fn test_duplicate_option() {
        let err = parse(r#"pin "app", to: "a.js", to: "b.js""#).unwrap_err();
        assert!(err.to_string().contains("given more than once"));
    }

    #[test]
    fn test_missing_comma() {
        let err = parse(r#"pin "app" to: "a.js""#).unwrap_err();
        assert!(err
            .to_string()
            .contains("Expected `,` or a new directive after `pin`, found option `to:`"));
    }

    #[test]
    fn test_empty_name_and_empty_to() {
        let err = parse(r#"pin "  ""#).unwrap_err();
        assert!(err.to_string().contains("module name must not be empty"));

        let err = parse(r#"pin "app", to: """#).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_unclosed_paren_at_end_of_file() {
        let err = parse(r#"pin("app", to: "a.js""#).unwrap_err();

        match err {
            ParseError::SyntaxError { code, message, .. } => {
                assert_eq!(code, "P0003");
                assert!(message.contains("Expected `)` to close `pin`"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
