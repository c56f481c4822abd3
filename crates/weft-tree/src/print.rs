//! Plain-text rendering of a tree, mostly for dumps and tests.

use std::fmt::{self, Write};

use crate::{NodeId, NodeKind, Tag, Tree, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Append the location of every declaration.
    pub locations: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            locations: false,
        }
    }
}

pub struct TreePrinter<'t> {
    tree: &'t Tree,
    options: PrintOptions,
}

impl<'t> TreePrinter<'t> {
    pub fn new(tree: &'t Tree, options: PrintOptions) -> Self {
        Self { tree, options }
    }

    pub fn render(&self, module: NodeId) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_module(module, 0, &mut out);
        out
    }

    pub fn write_module(&self, module: NodeId, level: usize, w: &mut impl Write) -> fmt::Result {
        let tree = self.tree;
        self.pad(level, w)?;
        write!(w, "module {}", tree.name(module).unwrap_or("<anonymous>"))?;
        self.write_loc(module, w)?;
        writeln!(w)?;

        let Some(scope) = tree.module_scope(module) else {
            return Ok(());
        };

        for tag in tree.scope(scope).tags().collect::<Vec<_>>() {
            if tag == Tag::Modules {
                continue;
            }
            for (name, node) in tree.bindings(scope, tag) {
                self.pad(level + 1, w)?;
                self.write_decl(name, node, w)?;
                self.write_loc(node, w)?;
                writeln!(w)?;
            }
        }

        for (_, node) in tree.bindings(scope, Tag::Modules) {
            if tree.kind(node).is_module() {
                self.write_module(node, level + 1, w)?;
            }
        }

        Ok(())
    }

    fn write_decl(&self, name: &str, node: NodeId, w: &mut impl Write) -> fmt::Result {
        match self.tree.kind(node) {
            NodeKind::Module(_) => write!(w, "module {name}"),
            NodeKind::Value { ty } => {
                write!(w, "let {name}")?;
                if let Some(ty) = ty {
                    write!(w, ": ")?;
                    self.write_type_ref(*ty, w)?;
                }
                Ok(())
            }
            NodeKind::Function { params, result } => {
                write!(w, "proc {name}(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(w, ", ")?;
                    }
                    let param_name = self.tree.name(*param).unwrap_or("_");
                    write!(w, "{param_name}")?;
                    if let NodeKind::Value { ty: Some(ty) } = self.tree.kind(*param) {
                        write!(w, ": ")?;
                        self.write_type_ref(*ty, w)?;
                    }
                }
                write!(w, ")")?;
                if let Some(result) = result {
                    write!(w, ": ")?;
                    self.write_type_ref(*result, w)?;
                }
                Ok(())
            }
            NodeKind::Type(ty) => {
                write!(w, "type {name} = ")?;
                self.write_type(ty, w)
            }
            NodeKind::Import { module } => {
                let target = self.tree.name(*module).unwrap_or("<anonymous>");
                write!(w, "import {name} -> {target}")
            }
            NodeKind::Error(message) => write!(w, "{name} = <error: {message}>"),
            NodeKind::Open(tag) => write!(w, "{name} = <open in {tag}>"),
        }
    }

    fn write_type(&self, ty: &TypeKind, w: &mut impl Write) -> fmt::Result {
        match ty {
            TypeKind::Opaque => write!(w, "<opaque>"),
            TypeKind::Unit => write!(w, "unit"),
            TypeKind::Bool => write!(w, "bool"),
            TypeKind::Integer { signed, bits } => {
                write!(w, "{}{bits}", if *signed { "i" } else { "u" })
            }
            TypeKind::Pointer(to) => {
                write!(w, "*")?;
                self.write_type_ref(*to, w)
            }
            TypeKind::Alias(to) => self.write_type_ref(*to, w),
            TypeKind::Struct(fields) => {
                write!(w, "struct {{")?;
                for (i, field) in fields.iter().enumerate() {
                    write!(w, "{}{}: ", if i > 0 { ", " } else { " " }, field.name)?;
                    self.write_type_ref(field.ty, w)?;
                }
                write!(w, " }}")
            }
        }
    }

    /// Named nodes are printed by qualified name, anonymous ones structurally.
    fn write_type_ref(&self, id: NodeId, w: &mut impl Write) -> fmt::Result {
        let tree = self.tree;
        match (tree.name(id), tree.kind(id)) {
            (_, NodeKind::Error(_)) => write!(w, "<error>"),
            (Some(name), _) => {
                let owner = tree
                    .node(id)
                    .scope()
                    .and_then(|scope| tree.scope(scope).owner())
                    .and_then(|owner| tree.name(owner));
                match owner {
                    Some(owner) => write!(w, "{owner}.{name}"),
                    None => write!(w, "{name}"),
                }
            }
            (None, NodeKind::Type(ty)) => self.write_type(ty, w),
            (None, kind) => write!(w, "<{}>", kind.describe()),
        }
    }

    fn write_loc(&self, node: NodeId, w: &mut impl Write) -> fmt::Result {
        if self.options.locations {
            write!(w, " @ {}", self.tree.loc(node))?;
        }
        Ok(())
    }

    fn pad(&self, level: usize, w: &mut impl Write) -> fmt::Result {
        write!(w, "{:width$}", "", width = level * self.options.indent)
    }
}
