//! Source positions and the diagnostics sink.
//!
//! Important concepts in this module include:
//!
//! - the *span*, represented by [`Span`] and located in a file by [`Loc`];
//! - source text as held by the [`SourceManager`];
//! - the [`Report`], which collects [`Diagnostic`]s and [`Issue`]s during a run.

mod diag;
mod loc;
mod source;
mod span;

pub use diag::{Diagnostic, Issue, Report, Severity};
pub use loc::{Loc, Located};
pub use source::{Source, SourceId, SourceManager};
pub use span::{Span, Spanned};
