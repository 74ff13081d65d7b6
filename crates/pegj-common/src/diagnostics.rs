//! Diagnostics sink and rendering.
//!
//! Passes report through a [`DiagnosticSink`] with two severities. The
//! collecting [`Diagnostics`] sink keeps everything in emission order so the
//! driver can render it afterwards, either as ariadne reports against the
//! grammar source or as one JSON object per line.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use crate::span::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Receiver of compiler diagnostics.
pub trait DiagnosticSink {
    fn emit_error(&mut self, message: String, location: Option<Location>);
    fn emit_info(&mut self, message: String, location: Option<Location>);
}

/// A sink that records every diagnostic.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl DiagnosticSink for Diagnostics {
    fn emit_error(&mut self, message: String, location: Option<Location>) {
        self.items.push(Diagnostic {
            severity: Severity::Error,
            message,
            location,
        });
    }

    fn emit_info(&mut self, message: String, location: Option<Location>) {
        self.items.push(Diagnostic {
            severity: Severity::Info,
            message,
            location,
        });
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// How diagnostics are rendered by [`render`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Colorless human-readable output, stable for test snapshots.
    pub fn plain() -> Self {
        Self {
            color: false,
            json: false,
        }
    }
}

fn code(diag: &Diagnostic) -> &'static str {
    match diag.severity {
        Severity::Error => "G0001",
        Severity::Info => "G0100",
    }
}

/// Render one diagnostic.
///
/// With `source` available and a located diagnostic, the output is an ariadne
/// report pointing into the grammar text. Otherwise a single line
/// `severity[code]: message (line:col)` is produced. JSON mode always yields
/// one object on one line.
pub fn render(
    diag: &Diagnostic,
    source: Option<&str>,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    if options.json {
        return render_json(diag, filename);
    }

    let label = match diag.severity {
        Severity::Error => "error",
        Severity::Info => "info",
    };

    let (Some(source), Some(location)) = (source, diag.location) else {
        return match diag.location {
            Some(loc) => format!("{}[{}]: {} ({})\n", label, code(diag), diag.message, loc),
            None => format!("{}[{}]: {}\n", label, code(diag), diag.message),
        };
    };

    let config = Config::default().with_color(options.color);
    let source_len = source.chars().count();
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let span = clamp(location.range());

    let (kind, color) = match diag.severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Info => (ReportKind::Advice, Color::Blue),
    };

    let report = Report::build(kind, span.clone())
        .with_code(code(diag))
        .with_message(&diag.message)
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(&diag.message)
                .with_color(color),
        )
        .finish();

    let mut buf = Vec::new();
    if report.write(Source::from(source), &mut buf).is_err() {
        return format!("{}[{}]: {} ({})\n", label, code(diag), diag.message, location);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn render_json(diag: &Diagnostic, filename: &str) -> String {
    let spans: Vec<serde_json::Value> = diag
        .location
        .iter()
        .map(|loc| {
            serde_json::json!({
                "start": loc.start.offset,
                "end": loc.end.offset,
                "line": loc.start.line,
                "column": loc.start.column,
            })
        })
        .collect();
    let value = serde_json::json!({
        "code": code(diag),
        "severity": diag.severity,
        "message": diag.message,
        "file": filename,
        "spans": spans,
    });
    format!("{}\n", value)
}
