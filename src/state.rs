use std::path::Path;

use log::{debug, info, warn};
use regex::Regex;

use crate::bridge;
use crate::config::Config;
use crate::locations::Locations;
use crate::matcher::FuzzyMatcher;
use crate::model::{Applet, Category};
use crate::native::NativeLoader;
use crate::protocol::ModuleLoader;
use crate::sources::applets::AppletSource;
use crate::sources::extensions::ExtensionSource;
use crate::sources::{ProgressFn, Source};

/// Owns the discovered applets and rebuilds them on demand.
///
/// Synchronous: a refresh blocks its caller, and the progress callback runs
/// on that same thread. The catalog is `Send`, so a caller that must stay
/// responsive can refresh it on a worker and take it back when done.
pub struct Catalog<L: ModuleLoader = NativeLoader> {
    config: Config,
    locations: Locations,
    loader: L,
    exclude: Vec<Regex>,
    items: Vec<Applet>,
    progress: Option<Box<dyn FnMut(&str, usize, usize) + Send>>,
    matcher: FuzzyMatcher,
}

impl<L: ModuleLoader> Catalog<L> {
    pub fn new(config: Config, locations: Locations, loader: L) -> Self {
        let exclude = config
            .scan
            .exclude
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!("Ignoring exclude pattern '{}': {}", pattern, err);
                    None
                }
            })
            .collect();

        Self {
            config,
            locations,
            loader,
            exclude,
            items: Vec::new(),
            progress: None,
            matcher: FuzzyMatcher::new(),
        }
    }

    /// Called with `(file name, completed, total)` before each system module.
    pub fn set_progress_callback(
        &mut self,
        callback: impl FnMut(&str, usize, usize) + Send + 'static,
    ) {
        self.progress = Some(Box::new(callback));
    }

    /// Adds every applet found in the system directory. False only if the
    /// directory could not be listed.
    pub fn scan_system_applets(&mut self) -> bool {
        let source = AppletSource {
            loader: &self.loader,
            dir: &self.locations.system_dir,
            icon_size: self.config.general.icon_size,
            exclude: &self.exclude,
        };
        let progress = self
            .progress
            .as_deref_mut()
            .map(|callback| callback as &mut ProgressFn<'_>);
        match source.scan(progress) {
            Ok(applets) => {
                self.admit(applets);
                true
            }
            Err(err) => {
                warn!("System applet scan failed: {}", err);
                false
            }
        }
    }

    /// Adds every extension in the local extension directory. A missing
    /// directory counts as success.
    pub fn scan_extensions(&mut self) -> bool {
        let source = ExtensionSource {
            dir: &self.locations.extension_dir,
        };
        match source.scan(None) {
            Ok(applets) => {
                self.admit(applets);
                true
            }
            Err(err) => {
                warn!("Extension scan failed: {}", err);
                false
            }
        }
    }

    /// Runs the bridge on a single module and returns how many applets it added.
    pub fn load_module(&mut self, path: &Path) -> usize {
        let applets = bridge::extract(&self.loader, path, self.config.general.icon_size);
        let before = self.items.len();
        self.admit(applets);
        self.items.len() - before
    }

    /// Drops everything and rescans both directories. True if at least one
    /// of the two directories could be listed.
    pub fn refresh(&mut self) -> bool {
        self.items.clear();
        let system = self.scan_system_applets();
        let extensions = self.scan_extensions();
        info!("Catalog: {} applets after refresh", self.items.len());
        system || extensions
    }

    pub fn items(&self) -> &[Applet] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items_by_category(&self, category: Category) -> Vec<&Applet> {
        self.items
            .iter()
            .filter(|applet| applet.category == category)
            .collect()
    }

    /// First applet whose name equals `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<&Applet> {
        let needle = name.to_lowercase();
        self.items
            .iter()
            .find(|applet| applet.name.to_lowercase() == needle)
    }

    /// Fuzzy name search, best match first.
    pub fn search(&mut self, query: &str) -> Vec<&Applet> {
        let ranked = self.matcher.rank(query, &self.items);
        ranked.into_iter().map(|index| &self.items[index]).collect()
    }

    fn admit(&mut self, applets: Vec<Applet>) {
        for mut applet in applets {
            if applet.name.is_empty() {
                continue;
            }
            let overrides = applet
                .module_name()
                .and_then(|file_name| self.config.module_override(file_name));
            if let Some(overrides) = overrides {
                debug!("Applying override to '{}'", applet.name);
                applet.category = overrides.category;
                applet.requires_elevation = overrides.elevate;
            }
            self.items.push(applet);
        }
    }
}
