//! A tiny guest language that exercises every stage of the pipeline.
//!
//! ```text
//! module A;
//! import B;
//! type T = *B.U;
//! type Pair = struct { left: int, right: *Pair };
//! let origin: Pair;
//! proc swap(p: *Pair): Pair;
//! ```

pub mod ast;
pub mod driver;
pub mod error;
pub mod lexer;
pub mod parser;
mod resolve;
pub mod token;

pub use driver::ToyDriver;
pub use error::ToyError;
