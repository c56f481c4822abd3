use ecow::EcoString;
use thiserror::Error;

use weft_span::{Diagnostic, Loc};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToyError {
    #[error("{message}")]
    Syntax { message: String, loc: Loc },
    #[error("cannot find type `{name}` in this scope")]
    UnresolvedType { name: EcoString, loc: Loc },
    #[error("failed to find module `{path}`")]
    UnresolvedImport { path: EcoString, loc: Loc },
    #[error("module `{path}` cannot import itself")]
    SelfImport { path: EcoString, loc: Loc },
    #[error("expected a type, found {found} `{name}`")]
    NotAType {
        name: EcoString,
        found: &'static str,
        loc: Loc,
    },
}

impl ToyError {
    pub const SYNTAX: &'static str = "syntax-error";
    pub const UNRESOLVED_TYPE: &'static str = "unresolved-type";
    pub const UNRESOLVED_IMPORT: &'static str = "unresolved-import";
    pub const SELF_IMPORT: &'static str = "self-import";
    pub const NOT_A_TYPE: &'static str = "not-a-type";

    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => Self::SYNTAX,
            Self::UnresolvedType { .. } => Self::UNRESOLVED_TYPE,
            Self::UnresolvedImport { .. } => Self::UNRESOLVED_IMPORT,
            Self::SelfImport { .. } => Self::SELF_IMPORT,
            Self::NotAType { .. } => Self::NOT_A_TYPE,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            Self::Syntax { loc, .. }
            | Self::UnresolvedType { loc, .. }
            | Self::UnresolvedImport { loc, .. }
            | Self::SelfImport { loc, .. }
            | Self::NotAType { loc, .. } => *loc,
        }
    }
}

impl From<ToyError> for Diagnostic {
    fn from(error: ToyError) -> Self {
        let diagnostic = Diagnostic::error(error.loc(), error.to_string()).with_code(error.code());

        match error {
            ToyError::UnresolvedImport { .. } => {
                diagnostic.with_help("check the module declaration of the imported file")
            }
            ToyError::NotAType { .. } => {
                diagnostic.with_help("only type declarations may appear in type position")
            }
            _ => diagnostic,
        }
    }
}
