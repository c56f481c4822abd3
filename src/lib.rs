//! Command line front end of the weft compiler core.
//!
//! The crates doing the actual work are re-exported so that embedders only
//! need this one dependency.

pub mod loader;

pub use weft_driver as driver;
pub use weft_span as span;
pub use weft_toy as toy;
pub use weft_tree as tree;

use weft_driver::{Mediator, StageSummary, TreeDumpTarget};
use weft_toy::ToyDriver;
use weft_tree::print::PrintOptions;

/// A mediator knowing every bundled driver, target and plugin.
pub fn mediator(print: PrintOptions) -> Mediator {
    let mut mediator = Mediator::new();
    mediator
        .register_driver(ToyDriver::new())
        .register_target(TreeDumpTarget::new(print))
        .register_plugin(StageSummary::new());
    mediator
}
