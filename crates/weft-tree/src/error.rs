use ecow::EcoString;
use thiserror::Error;

use weft_span::{Diagnostic, Loc};

use crate::Tag;

/// Problems the tree diagnoses on its own while drivers bind and resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("`{name}` shadows a previous declaration in {tag}")]
    ShadowedDeclaration {
        name: EcoString,
        tag: Tag,
        previous: Loc,
        current: Loc,
    },
    #[error("cyclic dependency when resolving `{name}`")]
    CyclicResolution {
        name: EcoString,
        loc: Loc,
        /// Declarations on the resolution stack, outermost first.
        chain: Vec<(EcoString, Loc)>,
    },
}

impl TreeError {
    pub const SHADOWED_DECLARATION: &'static str = "shadowed-declaration";
    pub const CYCLIC_RESOLUTION: &'static str = "cyclic-resolution";

    pub fn code(&self) -> &'static str {
        match self {
            Self::ShadowedDeclaration { .. } => Self::SHADOWED_DECLARATION,
            Self::CyclicResolution { .. } => Self::CYCLIC_RESOLUTION,
        }
    }
}

impl From<TreeError> for Diagnostic {
    fn from(error: TreeError) -> Self {
        let message = error.to_string();
        let code = error.code();

        match error {
            TreeError::ShadowedDeclaration {
                name,
                previous,
                current,
                ..
            } => Diagnostic::warn(current, message)
                .with_code(code)
                .with_trace([(format!("previous declaration of `{name}` here"), previous)])
                .with_help("the later declaration replaces the earlier one"),
            TreeError::CyclicResolution { name, loc, chain } => {
                let cycle = chain
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .chain([name.as_str()])
                    .collect::<Vec<_>>()
                    .join(" -> ");

                Diagnostic::error(loc, message)
                    .with_code(code)
                    .with_trace(
                        chain
                            .into_iter()
                            .map(|(name, loc)| (format!("while resolving `{name}`"), loc)),
                    )
                    .with_notes([format!("cycle: {cycle}")])
                    .with_help("break the cycle with a pointer type")
            }
        }
    }
}
