//! Orchestration core: the [`Mediator`] knows every language [`Driver`], a
//! [`Lifetime`] runs one compilation through the staged pipeline.
//!
//! ```text
//! create → preparse → postparse → forward_decls → process_imports → compile_module → destroy
//! ```
//!
//! Every stage runs for all registered contexts before the next one starts,
//! so mutually importing modules see each other's forward declarations.
//! [`Plugin`]s observe a lifetime from outside: they are created first,
//! hear about every stage and are destroyed last.

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod lifetime;
pub mod mediator;
pub mod path;
pub mod plugin;
pub mod target;


pub use config::LifetimeOptions;
pub use context::{Context, ContextId, ContextState, GuestAst};
pub use driver::{CreateCx, DestroyCx, Driver, DriverInfo, ParseCx, Stage, StageCx, StageParts};
pub use error::{DriverError, LifetimeError, MediatorError, PathError};
pub use lifetime::{Contexts, Lifetime};
pub use mediator::Mediator;
pub use path::ModulePath;
pub use plugin::{Plugin, PluginCx, PluginInfo, StageSummary};
pub use target::{Target, TargetInfo, TreeDumpTarget};

pub mod prelude {
    pub use crate::{
        Context, CreateCx, DestroyCx, Driver, DriverError, DriverInfo, GuestAst, Lifetime,
        LifetimeError, LifetimeOptions, Mediator, ModulePath, ParseCx, Plugin, PluginCx,
        PluginInfo, Stage, StageCx, StageParts, Target, TargetInfo,
    };
}
