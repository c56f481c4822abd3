use ecow::EcoString;
use log::debug;
use owo_colors::OwoColorize;
use semver::Version;

use weft_span::{Report, Severity};
use weft_tree::Tree;

use crate::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub id: EcoString,
    pub name: EcoString,
    pub version: Version,
}

impl PluginInfo {
    pub fn new(id: impl Into<EcoString>, name: impl Into<EcoString>, version: Version) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version,
        }
    }
}

/// Observes a lifetime without owning any source.
///
/// Plugins are created before any driver and destroyed after every driver.
/// The stage hooks bracket each stage, including one skipped after fatal
/// errors. Hooks of different plugins run in registration order.
pub trait Plugin {
    fn info(&self) -> &PluginInfo;

    fn create(&self, cx: &mut PluginCx<'_>) {
        let _ = cx;
    }

    fn stage_started(&self, stage: Stage, cx: &mut PluginCx<'_>) {
        let _ = (stage, cx);
    }

    fn stage_finished(&self, stage: Stage, cx: &mut PluginCx<'_>) {
        let _ = (stage, cx);
    }

    fn destroy(&self, cx: &mut PluginCx<'_>) {
        let _ = cx;
    }
}

/// Handed to every [`Plugin`] hook.
pub struct PluginCx<'a> {
    pub tree: &'a Tree,
    pub report: &'a mut Report,
}

/// Logs the size of the tree and the report after each stage.
#[derive(Debug, Clone)]
pub struct StageSummary {
    info: PluginInfo,
}

impl StageSummary {
    pub fn new() -> Self {
        Self {
            info: PluginInfo::new("summary", "stage summary", Version::new(0, 1, 0)),
        }
    }
}

impl Default for StageSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for StageSummary {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn stage_finished(&self, stage: Stage, cx: &mut PluginCx<'_>) {
        debug!(
            "{} {stage}: {} nodes, {} open, {} errors, {} warnings",
            "Summary".bold().bright_white(),
            cx.tree.len(),
            cx.tree.open_count(),
            cx.report.count(Severity::Error),
            cx.report.count(Severity::Warning),
        );
    }
}
