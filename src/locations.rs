use std::env;
use std::path::{Path, PathBuf};

use crate::config::GeneralConfig;
use crate::native;

const FALLBACK_SYSTEM_DIR: &str = r"C:\Windows\System32";

/// Name of the extension directory next to the executable.
pub const EXTENSION_SUBDIR: &str = "system";

/// The two directories a refresh scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub system_dir: PathBuf,
    pub extension_dir: PathBuf,
}

impl Locations {
    /// Well-known directories, unless the configuration overrides them.
    pub fn resolve(general: &GeneralConfig) -> Self {
        Self {
            system_dir: general.system_dir.clone().unwrap_or_else(system_applet_dir),
            extension_dir: general.extension_dir.clone().unwrap_or_else(extension_dir),
        }
    }
}

/// The OS system directory, where protocol modules live.
pub fn system_applet_dir() -> PathBuf {
    native::system_directory().unwrap_or_else(|| PathBuf::from(FALLBACK_SYSTEM_DIR))
}

/// `<directory of the running executable>/system`. May not exist.
pub fn extension_dir() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    exe_dir.join(EXTENSION_SUBDIR)
}
