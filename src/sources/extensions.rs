use std::path::Path;

use log::{debug, info};

use crate::model::Applet;
use crate::sources::{list_candidates, ProgressFn, ScanError, Source};

/// File extensions of first-party extension modules.
pub const EXTENSION_EXTENSIONS: [&str; 2] = ["dll", "exe"];

/// First-party extensions next to the executable. Launched directly, so no
/// protocol negotiation happens here.
pub struct ExtensionSource<'a> {
    pub dir: &'a Path,
}

impl Source for ExtensionSource<'_> {
    fn scan(&self, _progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<Applet>, ScanError> {
        if !self.dir.exists() {
            debug!("Extension directory {:?} does not exist, skipping", self.dir);
            return Ok(vec![]);
        }

        debug!("Scanning extensions in {:?}", self.dir);
        // TODO: read a per-extension manifest for description, category and icon.
        let applets: Vec<Applet> = list_candidates(self.dir, &EXTENSION_EXTENSIONS)?
            .into_iter()
            .map(Applet::extension)
            .filter(|applet| !applet.name.is_empty())
            .collect();

        info!("ExtensionSource: found {} entries", applets.len());
        Ok(applets)
    }
}
