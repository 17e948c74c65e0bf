use std::path::{Path, PathBuf};

use log::{debug, info};
use regex::Regex;

use crate::bridge;
use crate::model::Applet;
use crate::protocol::ModuleLoader;
use crate::sources::{list_candidates, ProgressFn, ScanError, Source};

/// File extension of protocol modules.
pub const APPLET_EXTENSION: &str = "cpl";

/// Protocol modules in the system directory.
pub struct AppletSource<'a, L> {
    pub loader: &'a L,
    pub dir: &'a Path,
    pub icon_size: i32,
    pub exclude: &'a [Regex],
}

impl<L: ModuleLoader> Source for AppletSource<'_, L> {
    fn scan(&self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<Applet>, ScanError> {
        let candidates = list_candidates(self.dir, &[APPLET_EXTENSION])?;
        debug!("Scanning {} applet modules in {:?}", candidates.len(), self.dir);
        let applets = self.load_all(&candidates, progress);
        info!("AppletSource: found {} entries", applets.len());
        Ok(applets)
    }
}

impl<L: ModuleLoader> AppletSource<'_, L> {
    /// Runs the bridge over `candidates` in the given order.
    pub fn load_all(&self, candidates: &[PathBuf], mut progress: Option<&mut ProgressFn<'_>>) -> Vec<Applet> {
        let total = candidates.len();
        let mut applets = Vec::new();
        for (completed, path) in candidates.iter().enumerate() {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(report) = progress.as_deref_mut() {
                report(&file_name, completed, total);
            }
            if self.exclude.iter().any(|re| re.is_match(&file_name)) {
                debug!("Excluded {}", file_name);
                continue;
            }
            applets.extend(bridge::extract(self.loader, path, self.icon_size));
        }
        applets
    }
}
