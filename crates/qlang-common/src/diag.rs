//! Structured diagnostics for the QLang front-end.
//!
//! All stages (lexer, parser, validator, runtime) report through a single
//! [`ErrorCollector`]. Diagnostics are collected rather than thrown so a
//! single run surfaces as many problems as possible; the collector also
//! owns a copy of the source lines and the per-method line ranges needed
//! for the pretty listing with bracketed tokens.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::stack::CallStack;

/// Diagnostic severity.
///
/// `Warning` never gates compilation or execution. `Error` accumulates
/// while parsing/evaluation continue. `Fatal` is reserved for states where
/// continuing would read uninitialized or destroyed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single collected diagnostic.
///
/// `length` is the length of the offending token; zero means "point at the
/// column with a caret" in listings. `origin` names the reporting stage
/// (`"lexer"`, `"parser"`, `"validator"`, `"runtime"`); `context` is the
/// enclosing `Class.Method` (or plain function name) when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub origin: String,
    pub context: String,
}

impl Diagnostic {
    /// Single-line rendering: `[Error] Line 12:4 - message (in Bar.baz)`.
    pub fn to_line(&self) -> String {
        let mut out = format!("[{}] ", self.severity);
        if self.line > 0 {
            out.push_str(&format!("Line {}", self.line));
            if self.column > 0 {
                out.push_str(&format!(":{}", self.column));
            }
            out.push_str(" - ");
        }
        out.push_str(&self.message);
        if !self.context.is_empty() {
            out.push_str(&format!(" (in {})", self.context));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Central diagnostic sink.
///
/// Owns the diagnostic list, per-severity counters, the source lines used
/// for listings, and the registered context ranges (method name -> line
/// range) that let [`ErrorCollector::list_errors`] print whole function
/// bodies around an offending line.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    diagnostics: Vec<Diagnostic>,
    source_lines: Vec<String>,
    context_ranges: FxHashMap<String, (u32, u32)>,
    warning_count: u32,
    error_count: u32,
    fatal_count: u32,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the source text for listing excerpts.
    pub fn set_source(&mut self, source: &str) {
        self.source_lines = source.lines().map(str::to_owned).collect();
    }

    /// Associate a context name (e.g. `Bar.baz`) with its line range so the
    /// listing can print the whole function body.
    pub fn register_context(&mut self, name: impl Into<String>, start_line: u32, end_line: u32) {
        self.context_ranges.insert(name.into(), (start_line, end_line));
    }

    /// Append a diagnostic and bump the per-severity counter.
    #[allow(clippy::too_many_arguments)]
    pub fn report(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        line: u32,
        column: u32,
        length: u32,
        origin: &str,
        context: &str,
    ) {
        match severity {
            Severity::Warning => self.warning_count += 1,
            Severity::Error => self.error_count += 1,
            Severity::Fatal => self.fatal_count += 1,
        }
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
            line,
            column,
            length,
            origin: origin.to_owned(),
            context: context.to_owned(),
        });
    }

    /// Report a runtime error, embedding the formatted stack trace in the
    /// message and using the innermost frame as context.
    pub fn report_runtime(
        &mut self,
        message: impl Into<String>,
        stack: &CallStack,
        line: u32,
        column: u32,
        length: u32,
    ) {
        let mut full = message.into();
        if !stack.is_empty() {
            full.push('\n');
            full.push_str(&stack.stack_trace());
        }
        let context = stack.current_context();
        self.report(Severity::Error, full, line, column, length, "runtime", &context);
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn fatal_count(&self) -> u32 {
        self.fatal_count
    }

    pub fn total_count(&self) -> u32 {
        self.diagnostics.len() as u32
    }

    /// Whether anything error-severity or worse was reported.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || self.fatal_count > 0
    }

    pub fn has_any_issues(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn clear_errors(&mut self) {
        self.diagnostics.clear();
        self.warning_count = 0;
        self.error_count = 0;
        self.fatal_count = 0;
    }

    /// JSON export of the diagnostic list for IDE consumers.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "[]".to_owned())
    }

    // ── Listing ────────────────────────────────────────────────────────

    /// Pretty-print every diagnostic.
    ///
    /// When `list_function` is true and a context range is registered for a
    /// diagnostic's context, the excerpt shows the entire function body with
    /// `>>` marking the offending line; otherwise only the offending line is
    /// shown. The offending token is enclosed in `[...]` when its length is
    /// known, or caret-marked when it is not.
    pub fn list_errors(&self, list_function: bool) -> String {
        if self.diagnostics.is_empty() {
            return "No errors reported.\n".to_owned();
        }

        let mut out = String::from("=== QLang Errors ===\n");
        out.push_str(&format!(
            "Total: {} issue(s) - {} fatal, {} error(s), {} warning(s)\n\n",
            self.diagnostics.len(),
            self.fatal_count,
            self.error_count,
            self.warning_count
        ));

        for (i, diag) in self.diagnostics.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, diag.to_line()));

            // Runtime contexts look like "Test.Run() at line 3"; strip the
            // call suffix before range lookup.
            let ctx_name = diag
                .context
                .split('(')
                .next()
                .unwrap_or("")
                .trim()
                .to_owned();

            if let Some(dot) = ctx_name.rfind('.') {
                let class_name = &ctx_name[..dot];
                let method_name = &ctx_name[dot + 1..];
                out.push_str(&format!(
                    "   Function: {} of class type {}\n",
                    method_name, class_name
                ));
            } else if !ctx_name.is_empty() {
                out.push_str(&format!("   Context: {}\n", ctx_name));
            }

            let range = if list_function {
                self.context_ranges.get(&ctx_name).copied()
            } else {
                None
            };

            match range {
                Some((start, end)) => {
                    out.push_str(
                        "   --------------------------------------------------\n",
                    );
                    for l in start..=end {
                        let Some(text) = self.source_line(l) else {
                            continue;
                        };
                        let shown = if l == diag.line {
                            self.bracket_token(text, diag)
                        } else {
                            text.to_owned()
                        };
                        let prefix = if l == diag.line { ">> " } else { "   " };
                        out.push_str(&format!("{}{}: {}\n", prefix, l, shown));
                        if l == diag.line && diag.column > 0 && diag.length == 0 {
                            out.push_str(&self.caret_line(3, l, diag.column));
                        }
                    }
                    out.push_str(
                        "   --------------------------------------------------\n",
                    );
                }
                None => {
                    if let Some(text) = self.source_line(diag.line) {
                        let shown = self.bracket_token(text, diag);
                        out.push_str(&format!("   {}: {}\n", diag.line, shown));
                        if diag.column > 0 && diag.length == 0 {
                            out.push_str(&self.caret_line(3, diag.line, diag.column));
                        }
                    }
                }
            }
            out.push('\n');
        }

        out.push_str("====================\n");
        out
    }

    fn source_line(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.source_lines.get(line as usize - 1).map(String::as_str)
    }

    /// Insert `[` `]` around the offending token when column and length
    /// identify it; otherwise return the line unchanged.
    fn bracket_token(&self, text: &str, diag: &Diagnostic) -> String {
        if diag.column == 0 || diag.length == 0 {
            return text.to_owned();
        }
        let col = diag.column as usize - 1;
        let len = diag.length as usize;
        if col >= text.len() {
            return text.to_owned();
        }
        let end = (col + len).min(text.len());
        format!("{}[{}]{}", &text[..col], &text[col..end], &text[end..])
    }

    /// A caret line aligned under `column` of a `"{prefix}{line}: "` gutter.
    fn caret_line(&self, prefix_width: usize, line: u32, column: u32) -> String {
        let gutter = prefix_width + line.to_string().len() + 2;
        format!("{}^\n", " ".repeat(gutter + column as usize - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_bumps_counters() {
        let mut collector = ErrorCollector::new();
        collector.report(Severity::Warning, "w", 1, 1, 0, "parser", "");
        collector.report(Severity::Error, "e", 2, 1, 0, "parser", "");
        collector.report(Severity::Fatal, "f", 3, 1, 0, "runtime", "");
        assert_eq!(collector.warning_count(), 1);
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.fatal_count(), 1);
        assert_eq!(collector.total_count(), 3);
        assert!(collector.has_errors());
        assert!(collector.has_any_issues());
    }

    #[test]
    fn warnings_alone_do_not_gate() {
        let mut collector = ErrorCollector::new();
        collector.report(Severity::Warning, "w", 0, 0, 0, "validator", "");
        assert!(!collector.has_errors());
        assert!(collector.has_any_issues());
    }

    #[test]
    fn clear_errors_resets_everything() {
        let mut collector = ErrorCollector::new();
        collector.report(Severity::Error, "e", 1, 1, 0, "parser", "");
        collector.clear_errors();
        assert_eq!(collector.total_count(), 0);
        assert!(!collector.has_errors());
        assert_eq!(collector.list_errors(false), "No errors reported.\n");
    }

    #[test]
    fn diagnostic_single_line_format() {
        let diag = Diagnostic {
            severity: Severity::Error,
            message: "Expected '(' after function or method name 'foo'".into(),
            line: 12,
            column: 4,
            length: 0,
            origin: "parser".into(),
            context: "Bar.baz".into(),
        };
        assert_eq!(
            diag.to_line(),
            "[Error] Line 12:4 - Expected '(' after function or method name 'foo' (in Bar.baz)"
        );
    }

    #[test]
    fn diagnostic_line_omits_zero_position() {
        let diag = Diagnostic {
            severity: Severity::Warning,
            message: "dangling".into(),
            line: 0,
            column: 0,
            length: 0,
            origin: "validator".into(),
            context: String::new(),
        };
        assert_eq!(diag.to_line(), "[Warning] dangling");
    }

    #[test]
    fn listing_brackets_known_token() {
        let mut collector = ErrorCollector::new();
        collector.set_source("int32 a = 1;\nfoo x + 1;\n");
        collector.report(Severity::Error, "Unexpected token 'x'", 2, 5, 1, "parser", "");
        let listing = collector.list_errors(false);
        assert!(listing.contains("1. [Error] Line 2:5 - Unexpected token 'x'"));
        assert!(listing.contains("   2: foo [x] + 1;"));
    }

    #[test]
    fn listing_carets_zero_length() {
        let mut collector = ErrorCollector::new();
        collector.set_source("foo x + 1\n");
        collector.report(Severity::Error, "Expected '('", 1, 5, 0, "parser", "");
        let listing = collector.list_errors(false);
        assert!(listing.contains("   1: foo x + 1"));
        // gutter is "   1: " (6 chars), caret under column 5
        assert!(listing.contains("\n          ^\n"));
    }

    #[test]
    fn listing_prints_function_body_for_registered_context() {
        let mut collector = ErrorCollector::new();
        collector.set_source("class Bar\nmethod baz()\nfoo x + 1\nend\nend\n");
        collector.register_context("Bar.baz", 2, 4);
        collector.report(Severity::Error, "Unexpected token 'foo'", 3, 1, 3, "parser", "Bar.baz");
        let listing = collector.list_errors(true);
        assert!(listing.contains("   Function: baz of class type Bar"));
        assert!(listing.contains("   2: method baz()"));
        assert!(listing.contains(">> 3: [foo] x + 1"));
        assert!(listing.contains("   4: end"));
    }

    #[test]
    fn runtime_report_embeds_stack_trace() {
        let mut collector = ErrorCollector::new();
        let mut stack = CallStack::new();
        stack.push("Update", "Game", 7);
        collector.report_runtime("unknown variable 'x'", &stack, 7, 3, 1);
        let diag = &collector.diagnostics()[0];
        assert_eq!(diag.origin, "runtime");
        assert!(diag.message.starts_with("unknown variable 'x'\nStack trace:"));
        assert!(diag.message.contains("1. Game.Update() at line 7"));
        assert_eq!(diag.context, "Game.Update() at line 7");
    }

    #[test]
    fn json_export_round_trips() {
        let mut collector = ErrorCollector::new();
        collector.report(Severity::Error, "e", 1, 2, 3, "parser", "A.b");
        let json = collector.to_json();
        assert!(json.contains("\"severity\":\"Error\""));
        assert!(json.contains("\"line\":1"));
        assert!(json.contains("\"context\":\"A.b\""));
    }
}
