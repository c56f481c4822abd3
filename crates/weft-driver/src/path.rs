use ecow::EcoString;
use std::{fmt, str::FromStr};

use crate::PathError;

/// Non-empty sequence of name segments identifying one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModulePath {
    segments: Vec<EcoString>,
}

impl ModulePath {
    /// First segment of every driver's builtin module, `lang.<driver id>`.
    pub const LANGUAGE_ROOT: &'static str = "lang";

    pub fn new<S>(segments: impl IntoIterator<Item = S>) -> Result<Self, PathError>
    where
        S: Into<EcoString>,
    {
        let segments = segments.into_iter().map(Into::into).collect::<Vec<_>>();

        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(PathError::EmptySegment(segments.join(".")));
        }

        Ok(Self { segments })
    }

    pub fn single(name: impl Into<EcoString>) -> Result<Self, PathError> {
        Self::new([name])
    }

    pub fn segments(&self) -> &[EcoString] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    /// The final segment, usually the name an import binds.
    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Whether the path lies under the builtin language modules.
    pub fn is_reserved(&self) -> bool {
        self.len() > 1 && self.first() == Self::LANGUAGE_ROOT
    }

    pub fn join(&self, segment: impl Into<EcoString>) -> Result<Self, PathError> {
        Self::new(self.segments.iter().cloned().chain([segment.into()]))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for ModulePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        Self::new(s.split('.'))
    }
}
