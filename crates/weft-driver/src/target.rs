use ecow::EcoString;
use std::io;

use weft_tree::print::{PrintOptions, TreePrinter};

use crate::Lifetime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub name: EcoString,
    pub description: EcoString,
}

impl TargetInfo {
    pub fn new(name: impl Into<EcoString>, description: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Consumes the tree of a finished lifetime.
pub trait Target {
    fn info(&self) -> &TargetInfo;

    fn emit(&self, lifetime: &Lifetime<'_>, out: &mut dyn io::Write) -> io::Result<()>;
}

/// Writes every module scanned from source as indented text.
#[derive(Debug, Clone)]
pub struct TreeDumpTarget {
    info: TargetInfo,
    options: PrintOptions,
}

impl TreeDumpTarget {
    pub fn new(options: PrintOptions) -> Self {
        Self {
            info: TargetInfo::new("tree", "print the resolved tree of every module"),
            options,
        }
    }
}

impl Default for TreeDumpTarget {
    fn default() -> Self {
        Self::new(PrintOptions::default())
    }
}

impl Target for TreeDumpTarget {
    fn info(&self) -> &TargetInfo {
        &self.info
    }

    fn emit(&self, lifetime: &Lifetime<'_>, out: &mut dyn io::Write) -> io::Result<()> {
        let printer = TreePrinter::new(lifetime.tree(), self.options);

        for context in lifetime.contexts().iter() {
            if context.is_compiled() {
                continue;
            }
            if let Some(root) = context.root() {
                out.write_all(printer.render(root).as_bytes())?;
            }
        }

        Ok(())
    }
}
