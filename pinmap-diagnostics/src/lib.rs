// Diagnostics for import-map directive files
// Renders located errors with source snippets, notes and suggestions

use colored::Colorize;
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;

/// Source code location (line, column, file)
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub length: usize, // Length of the error span
}

impl Span {
    pub fn new(file: String, line: usize, column: usize, length: usize) -> Self {
        Self {
            file,
            line,
            column,
            length,
        }
    }

    pub fn from_file_and_span(file: &str, source: &str, span: std::ops::Range<usize>) -> Self {
        let start = span.start.min(source.len());
        let before = source.get(..start).unwrap_or_default();
        let line = before.chars().filter(|&c| c == '\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.len() + 1, |pos| before.len() - pos);
        let length = span.end.saturating_sub(span.start).max(1);

        Self {
            file: file.to_string(),
            line,
            column,
            length,
        }
    }

    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }

    /// Create span from file path
    pub fn from_path(path: &Path) -> Self {
        Self {
            file: path.display().to_string(),
            line: 0,
            column: 0,
            length: 0,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Error,
    Warning,
    Note,
    Help,
}

impl ErrorLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorLevel::Error => "error",
            ErrorLevel::Warning => "warning",
            ErrorLevel::Note => "note",
            ErrorLevel::Help => "help",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorLevel::Error => write!(f, "{}", "error".red().bold()),
            ErrorLevel::Warning => write!(f, "{}", "warning".yellow().bold()),
            ErrorLevel::Note => write!(f, "{}", "note".cyan().bold()),
            ErrorLevel::Help => write!(f, "{}", "help".green().bold()),
        }
    }
}

/// Structured diagnostic message
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub code: String, // e.g., "P0002" for an unexpected token
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

/// Code suggestion with replacement
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub replacement: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(level: ErrorLevel, code: &str, message: String, span: Span) -> Self {
        Self {
            level,
            code: code.to_string(),
            message,
            span,
            notes: Vec::new(),
            help: None,
            suggestion: None,
        }
    }

    pub fn error(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Error, code, message, span)
    }

    pub fn warning(code: &str, message: String, span: Span) -> Self {
        Self::new(ErrorLevel::Warning, code, message, span)
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn with_suggestion(mut self, message: String, replacement: String, span: Span) -> Self {
        self.suggestion = Some(Suggestion {
            message,
            replacement,
            span,
        });
        self
    }

    /// Format diagnostic in rustc style
    pub fn format(&self, source_code: &str) -> String {
        let mut output = self.header();

        // Source code snippet with highlight
        if let Some(snippet) = self.get_source_snippet(source_code) {
            output.push_str(&snippet);
        }

        output.push_str(&self.footer());

        // Suggestion
        if let Some(suggestion) = &self.suggestion {
            output.push_str(&format!(
                " {} {}\n",
                "help:".green().bold(),
                suggestion.message
            ));
            if let Some(suggested_snippet) = self.get_suggestion_snippet(source_code) {
                output.push_str(&suggested_snippet);
            }
        }

        output
    }

    // error[P0002]: message
    //  --> config/importmap.pins:3:5
    fn header(&self) -> String {
        let mut output = format!("{}[{}]: {}\n", self.level, self.code, self.message.bold());
        output.push_str(&format!(" {} {}\n", "-->".cyan().bold(), self.span));
        output
    }

    fn footer(&self) -> String {
        let mut output = String::new();

        for note in &self.notes {
            output.push_str(&format!(" {} {}\n", "=".cyan().bold(), note.cyan()));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!(" {} {}\n", "help:".green().bold(), help));
        }

        output
    }

    /// Extract source code snippet with error highlight
    fn get_source_snippet(&self, source_code: &str) -> Option<String> {
        if self.span.line == 0 {
            return None;
        }
        let line = source_code.lines().nth(self.span.line - 1)?;

        let mut snippet = String::new();

        // Line number with padding
        let line_num_width = self.span.line.to_string().len().max(2);

        snippet.push_str(&format!(" {}\n", " ".repeat(line_num_width + 1).cyan()));

        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", self.span.line, width = line_num_width)
                .cyan()
                .bold(),
            "|".cyan().bold(),
            line
        ));

        // Error indicator (^^^)
        let padding = " ".repeat(self.span.column.saturating_sub(1));
        let underline = "^".repeat(self.span.length.max(1));
        snippet.push_str(&format!(
            " {} {} {}{}\n",
            " ".repeat(line_num_width).cyan(),
            "|".cyan().bold(),
            padding,
            underline.red().bold()
        ));

        Some(snippet)
    }

    /// Get suggestion snippet with replacement
    fn get_suggestion_snippet(&self, source_code: &str) -> Option<String> {
        let suggestion = self.suggestion.as_ref()?;
        if suggestion.span.line == 0 {
            return None;
        }
        let line = source_code.lines().nth(suggestion.span.line - 1)?;

        let line_num_width = suggestion.span.line.to_string().len().max(2);

        let col = suggestion.span.column.saturating_sub(1);
        let before = line.get(..col)?;
        let after = line.get(col + suggestion.span.length..).unwrap_or_default();
        let modified_line = format!("{}{}{}", before, &suggestion.replacement, after);

        let mut snippet = String::new();
        snippet.push_str(&format!(
            " {} {} {}\n",
            format!("{:>width$}", suggestion.span.line, width = line_num_width)
                .cyan()
                .bold(),
            "|".cyan().bold(),
            modified_line
        ));

        // Indicator for replaced text
        let padding = " ".repeat(col);
        let indicator = "~".repeat(suggestion.replacement.len());
        snippet.push_str(&format!(
            " {} {} {}{}\n",
            " ".repeat(line_num_width).cyan(),
            "|".cyan().bold(),
            padding,
            indicator.green().bold()
        ));

        Some(snippet)
    }

    /// JSON form used by editor integrations
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "level": self.level.as_str(),
            "code": self.code,
            "message": self.message,
            "file": self.span.file,
            "line": self.span.line,
            "column": self.span.column,
            "length": self.span.length,
        });

        if let Some(object) = value.as_object_mut() {
            if !self.notes.is_empty() {
                object.insert("notes".to_string(), json!(self.notes));
            }
            if let Some(help) = &self.help {
                object.insert("help".to_string(), json!(help));
            }
            if let Some(suggestion) = &self.suggestion {
                object.insert(
                    "suggestion".to_string(),
                    json!({
                        "message": suggestion.message,
                        "replacement": suggestion.replacement,
                    }),
                );
            }
        }

        value
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.header(), self.footer())
    }
}

/// Diagnostic collection and reporting engine
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            ErrorLevel::Error => self.error_count += 1,
            ErrorLevel::Warning => self.warning_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr
    pub fn print_all(&self, source_code: &str) {
        for diag in &self.diagnostics {
            eprintln!("{}", diag.format(source_code));
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        if self.error_count > 0 {
            eprintln!(
                "\n{}: {} error{} emitted",
                "error".red().bold(),
                self.error_count,
                if self.error_count == 1 { "" } else { "s" }
            );
        }

        if self.warning_count > 0 {
            eprintln!(
                "{}: {} warning{} emitted",
                "warning".yellow().bold(),
                self.warning_count,
                if self.warning_count == 1 { "" } else { "s" }
            );
        }
    }

    /// Export diagnostics as JSON for editors
    pub fn to_json(&self) -> String {
        let diagnostics: Vec<Value> = self.diagnostics.iter().map(Diagnostic::to_value).collect();
        json!({ "diagnostics": diagnostics }).to_string()
    }

    /// Clear all diagnostics
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }
}

/// Common error codes
pub mod error_codes {
    // Syntax errors (P0001-P0099)
    pub const INVALID_TOKEN: &str = "P0001";
    pub const UNEXPECTED_TOKEN: &str = "P0002";
    pub const UNEXPECTED_EOF: &str = "P0003";
    pub const UNKNOWN_OPTION: &str = "P0004";
    pub const INVALID_OPTION_VALUE: &str = "P0005";
    pub const DUPLICATE_OPTION: &str = "P0006";
    pub const EMPTY_NAME: &str = "P0007";

    // Map errors (P0100-P0199)
    pub const DUPLICATE_PIN: &str = "P0101";
    pub const MISSING_ASSET: &str = "P0102";
    pub const UNREADABLE_SOURCE: &str = "P0103";
}

/// Fuzzy matching utilities for "did you mean?" suggestions
pub mod fuzzy {
    use strsim::jaro_winkler;

    /// Find similar names using fuzzy matching (Jaro-Winkler distance)
    /// Returns up to `max_suggestions` names with similarity > threshold
    pub fn find_similar_names(
        target: &str,
        candidates: &[&str],
        threshold: f64,
        max_suggestions: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(String, f64)> = candidates
            .iter()
            .map(|candidate| (candidate.to_string(), jaro_winkler(target, candidate)))
            .filter(|(_, score)| *score > threshold)
            .collect();

        // Sort by similarity (descending)
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(max_suggestions)
            .map(|(name, _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let source = "pin \"app\", too: \"application.js\"\n";

        let span = Span::new("importmap.pins".to_string(), 1, 12, 4);
        let diag = Diagnostic::error(
            error_codes::UNKNOWN_OPTION,
            "unknown option `too` for `pin`".to_string(),
            span.clone(),
        )
        .with_note("`pin` accepts `to` and `preload`".to_string())
        .with_suggestion("did you mean `to`?".to_string(), "to:".to_string(), span);

        let formatted = diag.format(source);

        assert!(formatted.contains("P0004"));
        assert!(formatted.contains("unknown option `too`"));
        assert!(formatted.contains("importmap.pins:1:12"));
        assert!(formatted.contains("pin \"app\", to: \"application.js\""));
    }

    #[test]
    fn test_span_from_byte_range() {
        let source = "pin \"a\"\npin \"b\", to: 1\n";
        let span = Span::from_file_and_span("f.pins", source, 21..22);

        assert_eq!(span.line, 2);
        assert_eq!(span.column, 14);
        assert_eq!(span.length, 1);
    }

    #[test]
    fn test_engine_counts() {
        let mut engine = DiagnosticEngine::new();
        engine.emit(Diagnostic::error(
            error_codes::UNEXPECTED_TOKEN,
            "expected `,`".to_string(),
            Span::unknown(),
        ));
        engine.emit(Diagnostic::warning(
            error_codes::DUPLICATE_PIN,
            "`app` pinned twice".to_string(),
            Span::unknown(),
        ));

        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);

        engine.clear();
        assert!(!engine.has_diagnostics());
    }

    #[test]
    fn test_find_similar_names() {
        let keys = ["to", "under", "preload"];

        assert_eq!(fuzzy::find_similar_names("undr", &keys, 0.8, 1), vec!["under"]);
        assert_eq!(
            fuzzy::find_similar_names("preloads", &keys, 0.8, 1),
            vec!["preload"]
        );
        assert!(fuzzy::find_similar_names("zzz", &keys, 0.8, 1).is_empty());
    }
}
