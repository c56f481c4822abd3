use ecow::EcoString;
use std::fmt;

use weft_span::Loc;

/// `a.b.c` as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<EcoString>,
    pub loc: Loc,
}

impl Path {
    pub fn last(&self) -> &str {
        self.segments.last().map(EcoString::as_str).unwrap_or_default()
    }

    /// Everything but the last segment.
    pub fn prefix(&self) -> &[EcoString] {
        &self.segments[..self.segments.len().saturating_sub(1)]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named(Path),
    Pointer(Box<TypeExpr>, Loc),
    Struct(Vec<Binding>, Loc),
}

impl TypeExpr {
    pub fn loc(&self) -> Loc {
        match self {
            Self::Named(path) => path.loc,
            Self::Pointer(_, loc) | Self::Struct(_, loc) => *loc,
        }
    }
}

/// `name: type`, used for struct fields and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: EcoString,
    pub loc: Loc,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Type(TypeExpr),
    Let(TypeExpr),
    Proc {
        params: Vec<Binding>,
        result: Option<TypeExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub name: EcoString,
    /// Location of the name.
    pub loc: Loc,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToyAst {
    pub module: Option<Path>,
    pub imports: Vec<Path>,
    pub decls: Vec<Decl>,
}
