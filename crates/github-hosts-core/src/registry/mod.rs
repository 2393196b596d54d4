//! Platform-keyed scheduler registry
//!
//! Maps each [`Platform`] to the factory that builds its scheduler backend,
//! so the backend is picked once at startup instead of branching on the OS
//! at every call site.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use github_hosts_core::config::{Platform, Settings};
//! use github_hosts_core::registry::SchedulerRegistry;
//! use github_hosts_core::scheduler::SystemCommandRunner;
//!
//! # fn try_main() -> github_hosts_core::Result<()> {
//! let settings = Settings::new(Platform::detect()?, "/root/.github-hosts");
//! let registry = SchedulerRegistry::with_defaults();
//! let scheduler = registry.create(&settings, Arc::new(SystemCommandRunner::new()))?;
//! println!("backend: {}", scheduler.backend_name());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Platform, Settings};
use crate::error::{Error, Result};
use crate::scheduler::{CronSchedulerFactory, LaunchdSchedulerFactory, TaskSchedulerFactory};
use crate::traits::{CommandRunner, Scheduler, SchedulerFactory};

/// Scheduler factories by platform
#[derive(Default)]
pub struct SchedulerRegistry {
    factories: HashMap<Platform, Box<dyn SchedulerFactory>>,
}

impl SchedulerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backend for every supported platform
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Platform::Linux, Box::new(CronSchedulerFactory));
        registry.register(Platform::MacOs, Box::new(LaunchdSchedulerFactory));
        registry.register(Platform::Windows, Box::new(TaskSchedulerFactory));
        registry
    }

    /// Register (or replace) the factory for `platform`
    pub fn register(&mut self, platform: Platform, factory: Box<dyn SchedulerFactory>) {
        self.factories.insert(platform, factory);
    }

    /// Whether a factory is registered for `platform`
    pub fn has_platform(&self, platform: Platform) -> bool {
        self.factories.contains_key(&platform)
    }

    /// Build the scheduler for `settings.platform`
    ///
    /// # Errors
    ///
    /// `UnsupportedPlatform` if no factory is registered for the platform.
    pub fn create(
        &self,
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Scheduler>> {
        let factory = self
            .factories
            .get(&settings.platform)
            .ok_or_else(|| Error::UnsupportedPlatform(settings.platform.to_string()))?;
        factory.create(settings, runner)
    }
}
