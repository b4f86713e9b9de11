//! Ariadne-based rendering for collected diagnostics.
//!
//! The collector's own `list_errors` produces the classic gutter listing;
//! this module renders a single diagnostic with labeled source spans for
//! richer terminal output. Output is colorless so snapshots stay stable.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use qlang_common::diag::{Diagnostic, Severity};

/// Compute the byte offset of a 1-based (line, column) pair in `source`.
fn offset_of(source: &str, line: u32, column: u32) -> usize {
    if line == 0 {
        return 0;
    }
    let mut offset = 0usize;
    for (idx, text) in source.split('\n').enumerate() {
        if idx as u32 + 1 == line {
            let col = (column.max(1) as usize - 1).min(text.len());
            return offset + col;
        }
        offset += text.len() + 1;
    }
    source.len()
}

fn report_kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Warning => ReportKind::Warning,
        Severity::Error | Severity::Fatal => ReportKind::Error,
    }
}

/// Render a diagnostic into a formatted string with a labeled source span.
pub fn render_diagnostic(diag: &Diagnostic, source: &str) -> String {
    let config = Config::default().with_color(false);

    let start = offset_of(source, diag.line, diag.column);
    let len = (diag.length as usize).max(1);
    let end = (start + len).min(source.len().max(start + 1));
    let span: Range<usize> = start..end;

    // Only the first line of the message heads the report; runtime
    // diagnostics carry the stack trace in later lines.
    let headline = diag.message.lines().next().unwrap_or("");

    let label_message = if diag.context.is_empty() {
        format!("reported by {}", diag.origin)
    } else {
        format!("in {}", diag.context)
    };

    let mut builder = Report::build(report_kind(diag.severity), span.clone())
        .with_message(headline)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(label_message)
                .with_color(Color::Red),
        );

    if diag.message.lines().count() > 1 {
        let rest: Vec<&str> = diag.message.lines().skip(1).collect();
        builder = builder.with_note(rest.join("\n"));
    }

    let report = builder.finish();

    let mut buf = Vec::new();
    let cache = Source::from(source);
    if report.write(cache, &mut buf).is_err() {
        return diag.to_line();
    }
    String::from_utf8(buf).unwrap_or_else(|_| diag.to_line())
}

/// Render every diagnostic in a collector against the same source.
pub fn render_all(diagnostics: &[Diagnostic], source: &str) -> String {
    let mut out = String::new();
    for diag in diagnostics {
        out.push_str(&render_diagnostic(diag, source));
        out.push('\n');
    }
    out
}
