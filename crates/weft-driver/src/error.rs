use camino::Utf8PathBuf;
use ecow::EcoString;
use thiserror::Error;

use weft_span::{Issue, Severity};

use crate::{ModulePath, Stage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("module path is empty")]
    Empty,
    #[error("module path `{0}` contains an empty segment")]
    EmptySegment(String),
}

/// Configuration defects found while registering plugins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediatorError {
    #[error("extension `.{extension}` is claimed by both `{existing}` and `{driver}`")]
    ExtensionCollision {
        extension: EcoString,
        existing: EcoString,
        driver: EcoString,
    },
    #[error("driver `{0}` is already registered")]
    DuplicateDriver(EcoString),
    #[error("driver `{0}` claims no file extensions")]
    NoExtensions(EcoString),
    #[error("target `{0}` is already registered")]
    TargetCollision(EcoString),
    #[error("plugin `{0}` is already registered")]
    PluginCollision(EcoString),
}

/// Why a source could not be added to a lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifetimeError {
    #[error("module `{path}` from `{source_path}` is already defined by `{existing}`")]
    DuplicateModule {
        path: ModulePath,
        source_path: Utf8PathBuf,
        existing: Utf8PathBuf,
    },
    #[error("module `{path}` from `{source_path}` lies under the reserved `lang` prefix")]
    ReservedModule {
        path: ModulePath,
        source_path: Utf8PathBuf,
    },
    #[error("no driver handles `{0}`")]
    UnknownExtension(Utf8PathBuf),
    #[error("no driver with id `{0}`")]
    UnknownLanguage(EcoString),
    #[error("failed to parse `{0}`")]
    ParseFailure(Utf8PathBuf),
    #[error("driver `{driver}` failed {stage} for module `{path}`")]
    DriverStageFailure {
        driver: EcoString,
        stage: Stage,
        path: ModulePath,
        reason: Option<EcoString>,
    },
}

impl LifetimeError {
    pub const DUPLICATE_MODULE: &'static str = "duplicate-module";
    pub const RESERVED_MODULE: &'static str = "reserved-module";
    pub const UNKNOWN_EXTENSION: &'static str = "unknown-extension";
    pub const UNKNOWN_LANGUAGE: &'static str = "unknown-language";
    pub const PARSE_FAILURE: &'static str = "parse-failure";
    pub const DRIVER_STAGE_FAILURE: &'static str = "driver-stage-failure";

    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateModule { .. } => Self::DUPLICATE_MODULE,
            Self::ReservedModule { .. } => Self::RESERVED_MODULE,
            Self::UnknownExtension(_) => Self::UNKNOWN_EXTENSION,
            Self::UnknownLanguage(_) => Self::UNKNOWN_LANGUAGE,
            Self::ParseFailure(_) => Self::PARSE_FAILURE,
            Self::DriverStageFailure { .. } => Self::DRIVER_STAGE_FAILURE,
        }
    }
}

impl From<&LifetimeError> for Issue {
    fn from(error: &LifetimeError) -> Self {
        let issue = Issue::new(Severity::Error, error.to_string()).with_code(error.code());

        match error {
            LifetimeError::DuplicateModule { .. } => {
                issue.with_help("every source must declare a distinct module path")
            }
            LifetimeError::ReservedModule { .. } => {
                issue.with_help("`lang.<driver id>` names the builtins of each language")
            }
            LifetimeError::UnknownExtension(_) => {
                issue.with_help("pass a language explicitly or rename the file")
            }
            LifetimeError::DriverStageFailure {
                reason: Some(reason),
                ..
            } => issue.with_help(reason.to_string()),
            _ => issue,
        }
    }
}

/// Failure signalled by a driver callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Diagnostics explaining the failure were already recorded.
    #[error("errors were reported")]
    Reported,
    #[error("{0}")]
    Custom(EcoString),
}

impl DriverError {
    pub fn custom(message: impl Into<EcoString>) -> Self {
        Self::Custom(message.into())
    }

    pub fn reason(&self) -> Option<EcoString> {
        match self {
            Self::Reported => None,
            Self::Custom(message) => Some(message.clone()),
        }
    }
}
