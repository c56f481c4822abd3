//! Options for a single compilation run.

use weft_span::Severity;

/// Options controlling a [`Lifetime`](crate::Lifetime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifetimeOptions {
    /// Keep scheduling stages after a fatal diagnostic was recorded
    pub continue_on_error: bool,

    /// Maximum number of diagnostics to print
    pub error_limit: Option<usize>,

    /// Whether to treat warnings as errors
    pub warnings_as_errors: bool,

    /// Initial number of tree nodes to reserve
    pub capacity: usize,
}

impl Default for LifetimeOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            error_limit: Some(20),
            warnings_as_errors: false,
            capacity: 256,
        }
    }
}

impl LifetimeOptions {
    /// Lowest severity that makes a run fail.
    pub fn threshold(&self) -> Severity {
        if self.warnings_as_errors {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}
