use derive_more::Display;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, Write},
};

use crate::{Loc, Located, SourceManager};

/// The diagnostics sink of one run.
///
/// Collects location-less [`Issue`]s and located [`Diagnostic`]s in the order
/// they are recorded. The sink never interrupts the run; callers ask
/// [`Report::has_fatal`] once it is over.
#[derive(Debug, Clone)]
pub struct Report {
    pub issues: Vec<Issue>,
    pub diagnostics: Vec<Diagnostic>,
    threshold: Severity,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    /// Creates an empty report whose fatal threshold is [`Severity::Error`].
    pub fn new() -> Self {
        Self::with_threshold(Severity::Error)
    }

    pub fn with_threshold(threshold: Severity) -> Self {
        Self {
            issues: Vec::new(),
            diagnostics: Vec::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Records a located message with optional secondary locations.
    pub fn record(
        &mut self,
        severity: Severity,
        loc: Loc,
        message: impl Into<String>,
        secondary: impl IntoIterator<Item = Located<String>>,
    ) {
        let diagnostic = Diagnostic::new(severity, loc, message).with_trace(secondary);
        self.add_diagnostic(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len() + self.diagnostics.len()
    }

    /// Highest severity recorded so far.
    pub fn max_severity(&self) -> Option<Severity> {
        self.issues
            .iter()
            .map(|issue| issue.severity)
            .chain(self.diagnostics.iter().map(|diag| diag.severity))
            .max()
    }

    /// Whether anything at or above the threshold was recorded.
    pub fn has_fatal(&self) -> bool {
        self.max_severity()
            .is_some_and(|severity| severity >= self.threshold)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
            + self
                .diagnostics
                .iter()
                .filter(|diag| diag.severity == severity)
                .count()
    }

    /// Diagnostics carrying the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |diag| diag.code == Some(code))
    }

    /// Issues carrying the given code.
    pub fn issues_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues
            .iter()
            .filter(move |issue| issue.code == Some(code))
    }

    /// Moves everything recorded in `other` into this report.
    pub fn extend(&mut self, other: Report) {
        self.issues.extend(other.issues);
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn print(self, sources: &SourceManager) -> io::Result<()> {
        self.write_limited(sources, None, false)
    }

    pub fn eprint(self, sources: &SourceManager) -> io::Result<()> {
        self.write_limited(sources, None, true)
    }

    /// Prints to standard error, stopping after `limit` entries.
    pub fn eprint_limited(self, sources: &SourceManager, limit: Option<usize>) -> io::Result<()> {
        self.write_limited(sources, limit, true)
    }

    fn write_limited(
        self,
        sources: &SourceManager,
        limit: Option<usize>,
        stderr: bool,
    ) -> io::Result<()> {
        let total = self.len();
        let limit = limit.unwrap_or(total);

        let issues = self.issues.into_iter().take(limit);
        let remaining = limit.saturating_sub(issues.len());
        let diagnostics = self.diagnostics.into_iter().take(remaining);

        for issue in issues {
            if stderr {
                issue.eprint()?;
            } else {
                issue.print()?;
            }
        }
        for diagnostic in diagnostics {
            if stderr {
                diagnostic.eprint(sources)?;
            } else {
                diagnostic.print(sources)?;
            }
        }

        if total > limit {
            let omitted = Issue::info(format!("{} more diagnostics omitted", total - limit));
            if stderr {
                omitted.eprint()?;
            } else {
                omitted.print()?;
            }
        }

        Ok(())
    }
}

/// Severity of a diagnostic message, ordered from least to most severe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[display("info")]
    Info,
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

impl From<Severity> for ariadne::ReportKind<'_> {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Info => ariadne::ReportKind::Advice,
            Severity::Warning => ariadne::ReportKind::Warning,
            Severity::Error => ariadne::ReportKind::Error,
        }
    }
}

/// A message without a source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Issue {
    pub message: String,
    /// Stable machine-readable code, e.g. `duplicate-module`.
    pub code: Option<&'static str>,
    pub help: Option<String>,
    pub severity: Severity,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            help: None,
            severity,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn write(self, mut w: impl Write) -> io::Result<()> {
        let Issue {
            message,
            code,
            help,
            severity,
        } = self;

        let style = match severity {
            Severity::Info => Style::new().green(),
            Severity::Warning => Style::new().yellow(),
            Severity::Error => Style::new().red(),
        };

        match code {
            Some(code) => writeln!(
                w,
                "{}[{}]: {message}",
                severity.style(style),
                code.style(style)
            )?,
            None => writeln!(w, "{}: {message}", severity.style(style))?,
        }

        if let Some(help) = help {
            writeln!(w, "{} {help}", "Help:".cyan())?;
        }

        Ok(())
    }

    pub fn print(self) -> io::Result<()> {
        self.write(io::stdout())
    }

    pub fn eprint(self) -> io::Result<()> {
        self.write(io::stderr())
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

/// A message attached to a source location.
///
/// Besides the primary location a diagnostic may carry a trace of labelled
/// secondary locations (a shadowed declaration points back at the one it
/// replaced, a cycle at the declarations on the resolution stack).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub message: String,
    /// Stable machine-readable code, e.g. `shadowed-declaration`.
    pub code: Option<&'static str>,
    pub help: Option<String>,
    pub severity: Severity,
    pub loc: Loc,
    /// Secondary locations with their labels.
    pub trace: Vec<Located<String>>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, loc: Loc, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            help: None,
            severity,
            loc,
            trace: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn error(loc: Loc, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, loc, message)
    }

    pub fn warn(loc: Loc, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, loc, message)
    }

    pub fn info(loc: Loc, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, loc, message)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_trace(mut self, trace: impl IntoIterator<Item = Located<String>>) -> Self {
        self.trace = trace.into_iter().collect();
        self
    }

    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes = notes.into_iter().collect();
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn print(self, sources: &SourceManager) -> io::Result<()> {
        let report = ariadne::Report::from(self);
        report.print(sources)
    }

    pub fn eprint(self, sources: &SourceManager) -> io::Result<()> {
        let report = ariadne::Report::from(self);
        report.eprint(sources)
    }
}

impl From<Diagnostic> for ariadne::Report<'_, Loc> {
    fn from(diag: Diagnostic) -> Self {
        let Diagnostic {
            message,
            code,
            help,
            severity,
            loc,
            trace,
            notes,
        } = diag;

        let mut builder = ariadne::Report::build(severity.into(), loc)
            .with_message(message)
            .with_label(ariadne::Label::new(loc))
            .with_labels(
                trace
                    .into_iter()
                    .map(|(label, loc)| ariadne::Label::new(loc).with_message(label)),
            );

        if let Some(code) = code {
            builder = builder.with_code(code);
        }
        if let Some(help) = help {
            builder = builder.with_help(help);
        }
        for note in notes {
            builder = builder.with_note(note);
        }

        builder.finish()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl std::error::Error for Diagnostic {}
