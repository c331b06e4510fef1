//! Diagnostics for the type loader
//!
//! A diagnostic is a message with a primary span, optional secondary labels for
//! related positions (the "base field is defined here" kind), and free-form help
//! and note lines. Diagnostics accumulate in a `Diagnostics` sink so one run can
//! report many independent problems; the `ErrorFormatter` renders them for a
//! terminal, with a source snippet when the file is known to the `SourceMap`.

use std::fmt;

pub use source_map::{FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
            DiagnosticSeverity::Hint => "hint",
        };
        f.write_str(s)
    }
}

/// Style for diagnostic labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Primary,
    Secondary,
}

/// A message attached to a span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
    pub style: LabelStyle,
}

impl Label {
    pub fn primary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    pub fn secondary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    /// Positions other than the primary one, in insertion order
    pub fn related(&self) -> impl Iterator<Item = (&str, SourceSpan)> {
        self.labels
            .iter()
            .filter(|l| l.style == LabelStyle::Secondary)
            .map(|l| (l.message.as_str(), l.span))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Accumulating diagnostic sink
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Drop everything recorded after `len`; used when a build step is rolled back
    pub fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }

    pub fn take(&mut self) -> Diagnostics {
        std::mem::take(self)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    fn with_severity(severity: DiagnosticSeverity, message: String, span: SourceSpan) -> Self {
        Self {
            diagnostic: Diagnostic {
                severity,
                code: None,
                message,
                span,
                labels: Vec::new(),
                notes: Vec::new(),
                help: Vec::new(),
            },
        }
    }

    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, message.into(), span)
    }

    pub fn warning(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, message.into(), span)
    }

    pub fn info(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Info, message.into(), span)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.diagnostic.labels.push(Label::primary(span, message));
        self
    }

    pub fn secondary_label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.diagnostic.labels.push(Label::secondary(span, message));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic.help.push(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// Terminal renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFormatter {
    use_colors: bool,
}

const RESET: &str = "\x1b[0m";
const CYAN: &str = "\x1b[96m";

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn severity_color(severity: DiagnosticSeverity) -> &'static str {
        match severity {
            DiagnosticSeverity::Error => "\x1b[31m",
            DiagnosticSeverity::Warning => "\x1b[33m",
            DiagnosticSeverity::Info => "\x1b[36m",
            DiagnosticSeverity::Hint => "\x1b[32m",
        }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        diagnostics
            .iter()
            .map(|d| self.format_diagnostic(d, source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let mut out = String::new();
        let mut header = diagnostic.severity.to_string();
        if let Some(code) = &diagnostic.code {
            header.push_str(&format!("[{}]", code));
        }
        out.push_str(&self.paint(Self::severity_color(diagnostic.severity), &header));
        out.push_str(": ");
        out.push_str(&diagnostic.message);
        out.push('\n');

        let primary = diagnostic
            .labels
            .iter()
            .find(|l| l.style == LabelStyle::Primary)
            .map(|l| l.message.as_str());
        self.format_location(&mut out, diagnostic.span, primary, source_map);

        for (message, span) in diagnostic.related() {
            out.push_str(&format!("  {} ", self.paint(CYAN, "-->")));
            out.push_str(&self.location_string(span, source_map));
            out.push_str(&format!(": {}\n", message));
        }
        for help in &diagnostic.help {
            out.push_str(&format!("     {}: {}\n", self.paint("\x1b[32m", "help"), help));
        }
        for note in &diagnostic.notes {
            out.push_str(&format!("{}: {}\n", self.paint("\x1b[34m", "note"), note));
        }
        out
    }

    fn location_string(&self, span: SourceSpan, source_map: &SourceMap) -> String {
        match source_map.file(span.file_id) {
            Some(file) if !span.is_unknown() => {
                format!("{}:{}:{}", file.name, span.start.line, span.start.column)
            }
            _ => span.to_string(),
        }
    }

    fn format_location(
        &self,
        out: &mut String,
        span: SourceSpan,
        label: Option<&str>,
        source_map: &SourceMap,
    ) {
        if span.is_unknown() {
            return;
        }
        out.push_str(&format!(
            "  {} {}\n",
            self.paint(CYAN, "-->"),
            self.location_string(span, source_map)
        ));
        let Some(line) = source_map.line(span.file_id, span.start.line) else {
            return;
        };
        let gutter = " ".repeat(span.start.line.to_string().len());
        let bar = self.paint(CYAN, "|");
        out.push_str(&format!("{} {}\n", gutter, bar));
        out.push_str(&format!(
            "{} {} {}\n",
            self.paint(CYAN, &span.start.line.to_string()),
            bar,
            line
        ));
        let width = if span.end.line == span.start.line && span.end.column > span.start.column {
            span.end.column - span.start.column
        } else {
            line.len().saturating_sub(span.start.column.saturating_sub(1)).max(1)
        };
        let padding = " ".repeat(span.start.column.saturating_sub(1));
        let marks = self.paint("\x1b[31m", &"^".repeat(width));
        out.push_str(&format!("{} {} {}{}", gutter, bar, padding, marks));
        if let Some(label) = label {
            out.push(' ');
            out.push_str(label);
        }
        out.push('\n');
    }
}

/// Result type that carries every diagnostic on failure
pub type DiagnosticResult<T> = Result<T, Diagnostics>;
