use camino::Utf8Path;
use ecow::EcoString;
use indexmap::IndexMap;
use log::debug;
use owo_colors::OwoColorize;
use std::{fmt, rc::Rc};

use crate::{Driver, MediatorError, Plugin, Target};

/// Process-wide registry of language drivers, output targets and plugins.
///
/// Built once at start-up, before any [`Lifetime`](crate::Lifetime) borrows it.
#[derive(Default)]
pub struct Mediator {
    drivers: IndexMap<EcoString, Rc<dyn Driver>>,
    extensions: IndexMap<EcoString, Rc<dyn Driver>>,
    targets: IndexMap<EcoString, Rc<dyn Target>>,
    plugins: IndexMap<EcoString, Rc<dyn Plugin>>,
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Mediator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `driver` for every extension it claims.
    ///
    /// # Panics
    ///
    /// On any configuration defect reported by [`Mediator::try_register_driver`].
    pub fn register_driver(&mut self, driver: impl Driver + 'static) -> &mut Self {
        if let Err(error) = self.try_register_driver(driver) {
            panic!("invalid driver registration: {error}");
        }
        self
    }

    /// Registers `driver`, leaving the mediator untouched on error.
    pub fn try_register_driver(
        &mut self,
        driver: impl Driver + 'static,
    ) -> Result<(), MediatorError> {
        self.try_register_driver_rc(Rc::new(driver))
    }

    pub fn try_register_driver_rc(&mut self, driver: Rc<dyn Driver>) -> Result<(), MediatorError> {
        let info = driver.info();

        if info.extensions.is_empty() {
            return Err(MediatorError::NoExtensions(info.id.clone()));
        }
        if self.drivers.contains_key(&info.id) {
            return Err(MediatorError::DuplicateDriver(info.id.clone()));
        }
        for extension in &info.extensions {
            if let Some(existing) = self.extensions.get(extension) {
                return Err(MediatorError::ExtensionCollision {
                    extension: extension.clone(),
                    existing: existing.info().id.clone(),
                    driver: info.id.clone(),
                });
            }
        }

        debug!(
            "{} {} {} ({})",
            "Register".bold().bright_white(),
            info.name,
            info.version,
            info.extensions.join(", ")
        );

        for extension in &info.extensions {
            self.extensions.insert(extension.clone(), driver.clone());
        }
        self.drivers.insert(info.id.clone(), driver.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// If a target with the same name exists.
    pub fn register_target(&mut self, target: impl Target + 'static) -> &mut Self {
        if let Err(error) = self.try_register_target(target) {
            panic!("invalid target registration: {error}");
        }
        self
    }

    pub fn try_register_target(&mut self, target: impl Target + 'static) -> Result<(), MediatorError> {
        let name = target.info().name.clone();
        if self.targets.contains_key(&name) {
            return Err(MediatorError::TargetCollision(name));
        }

        debug!("{} target {name}", "Register".bold().bright_white());
        self.targets.insert(name, Rc::new(target));
        Ok(())
    }

    /// The driver claiming `extension` (with or without the leading dot).
    pub fn lookup_driver(&self, extension: &str) -> Option<&Rc<dyn Driver>> {
        self.extensions.get(extension.trim_start_matches('.'))
    }

    pub fn driver_for_path(&self, path: &Utf8Path) -> Option<&Rc<dyn Driver>> {
        path.extension().and_then(|ext| self.lookup_driver(ext))
    }

    /// The driver with the given stable id.
    pub fn driver(&self, id: &str) -> Option<&Rc<dyn Driver>> {
        self.drivers.get(id)
    }

    /// Drivers in registration order.
    pub fn drivers(&self) -> impl Iterator<Item = &Rc<dyn Driver>> {
        self.drivers.values()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(EcoString::as_str)
    }

    pub fn lookup_target(&self, name: &str) -> Option<&Rc<dyn Target>> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Rc<dyn Target>> {
        self.targets.values()
    }

    /// # Panics
    ///
    /// If a plugin with the same id exists.
    pub fn register_plugin(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        if let Err(error) = self.try_register_plugin(plugin) {
            panic!("invalid plugin registration: {error}");
        }
        self
    }

    pub fn try_register_plugin(&mut self, plugin: impl Plugin + 'static) -> Result<(), MediatorError> {
        let info = plugin.info();
        if self.plugins.contains_key(&info.id) {
            return Err(MediatorError::PluginCollision(info.id.clone()));
        }

        debug!(
            "{} plugin {} {}",
            "Register".bold().bright_white(),
            info.name,
            info.version
        );
        self.plugins.insert(info.id.clone(), Rc::new(plugin));
        Ok(())
    }

    /// Plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &Rc<dyn Plugin>> {
        self.plugins.values()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{
        Lifetime, TargetInfo,
        test::{Log, RecordingDriver, RecordingPlugin},
    };

    struct NullTarget(TargetInfo);

    impl Target for NullTarget {
        fn info(&self) -> &TargetInfo {
            &self.0
        }

        fn emit(&self, _lifetime: &Lifetime<'_>, _out: &mut dyn io::Write) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lookup_by_extension_and_id() {
        let log = Log::default();
        let mut mediator = Mediator::new();
        mediator.register_driver(RecordingDriver::new("rec", &["rec", ".r"], log));

        assert!(mediator.lookup_driver("rec").is_some());
        assert!(mediator.lookup_driver(".r").is_some());
        assert!(mediator.lookup_driver("c").is_none());
        assert!(mediator.driver_for_path(Utf8Path::new("dir/x.r")).is_some());
        assert!(mediator.driver_for_path(Utf8Path::new("Makefile")).is_none());
        assert_eq!(mediator.driver("rec").unwrap().info().id, "rec");
        assert_eq!(mediator.extensions().collect::<Vec<_>>(), ["rec", "r"]);
    }

    #[test]
    fn extension_collision_is_rejected() {
        let log = Log::default();
        let mut mediator = Mediator::new();
        mediator.register_driver(RecordingDriver::new("one", &["x", "y"], log.clone()));

        let result = mediator.try_register_driver(RecordingDriver::new("two", &["z", "y"], log));

        assert_eq!(
            result,
            Err(MediatorError::ExtensionCollision {
                extension: "y".into(),
                existing: "one".into(),
                driver: "two".into(),
            })
        );
        // nothing of the rejected driver was registered
        assert!(mediator.lookup_driver("z").is_none());
        assert!(mediator.driver("two").is_none());
    }

    #[test]
    #[should_panic(expected = "invalid driver registration")]
    fn extension_collision_panics() {
        let log = Log::default();
        let mut mediator = Mediator::new();
        mediator
            .register_driver(RecordingDriver::new("one", &["x"], log.clone()))
            .register_driver(RecordingDriver::new("two", &["x"], log));
    }

    #[test]
    fn duplicate_id_and_missing_extensions() {
        let log = Log::default();
        let mut mediator = Mediator::new();
        mediator.register_driver(RecordingDriver::new("one", &["x"], log.clone()));

        assert_eq!(
            mediator.try_register_driver(RecordingDriver::new("one", &["q"], log.clone())),
            Err(MediatorError::DuplicateDriver("one".into()))
        );
        assert_eq!(
            mediator.try_register_driver(RecordingDriver::new("none", &[], log)),
            Err(MediatorError::NoExtensions("none".into()))
        );
    }

    #[test]
    fn targets_by_name() {
        let mut mediator = Mediator::new();
        mediator.register_target(NullTarget(TargetInfo::new("null", "discards output")));

        assert!(mediator.lookup_target("null").is_some());
        assert!(mediator.lookup_target("llvm").is_none());
        assert_eq!(
            mediator.try_register_target(NullTarget(TargetInfo::new("null", "again"))),
            Err(MediatorError::TargetCollision("null".into()))
        );
        assert_eq!(mediator.targets().count(), 1);
    }

    #[test]
    fn plugins_keep_registration_order() {
        let log = Log::default();
        let mut mediator = Mediator::new();
        mediator
            .register_plugin(RecordingPlugin::new("second", log.clone()))
            .register_plugin(RecordingPlugin::new("first", log.clone()));

        let ids = mediator
            .plugins()
            .map(|plugin| plugin.info().id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["second", "first"]);
        assert_eq!(
            mediator.try_register_plugin(RecordingPlugin::new("first", log)),
            Err(MediatorError::PluginCollision("first".into()))
        );
    }
}
