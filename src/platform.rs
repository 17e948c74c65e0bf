//! Startup gate: the catalog only runs on 64-bit builds on a supported OS.

use log::{debug, error};
use thiserror::Error;

use crate::native;

/// Oldest supported OS major version.
pub const MIN_MAJOR_VERSION: u32 = 10;

const ERROR_CAPTION: &str = "cpl-runner - System Requirements";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub ok: bool,
    pub is_64_bit: bool,
    pub is_supported_os: bool,
    /// Zero when the version probe was unavailable.
    pub build_number: u32,
    /// User-facing explanation; empty when `ok`.
    pub message: String,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
}

/// Checks the running process against the platform requirements.
pub fn validate() -> PlatformInfo {
    let version = native::os_version();
    let meets_minimum = version.is_some() || native::is_os_version_at_least(MIN_MAJOR_VERSION);
    evaluate(
        cfg!(target_pointer_width = "64"),
        cfg!(windows),
        version,
        meets_minimum,
    )
}

/// Pure form of [`validate`]. `meets_minimum` is the fallback check and only
/// decides when `version` is missing.
pub fn evaluate(
    is_64_bit: bool,
    is_windows: bool,
    version: Option<OsVersion>,
    meets_minimum: bool,
) -> PlatformInfo {
    let mut info = PlatformInfo {
        ok: true,
        is_64_bit,
        is_supported_os: is_windows,
        build_number: version.map_or(0, |v| v.build),
        message: String::new(),
    };

    if !is_64_bit {
        info.ok = false;
        info.message = "cpl-runner requires a 64-bit version of Windows.".to_string();
    }

    match version {
        Some(version) if version.major < MIN_MAJOR_VERSION => {
            info.is_supported_os = false;
            info.ok = false;
            info.message = format!(
                "cpl-runner requires Windows {} or later.\n\nDetected: Windows {}.{} (Build {})",
                MIN_MAJOR_VERSION, version.major, version.minor, version.build
            );
        }
        None if is_windows && !meets_minimum => {
            info.is_supported_os = false;
            info.ok = false;
            info.message = format!("cpl-runner requires Windows {} or later.", MIN_MAJOR_VERSION);
        }
        _ if !is_windows => {
            info.ok = false;
            info.message = format!("cpl-runner requires Windows {} or later.", MIN_MAJOR_VERSION);
        }
        _ => {}
    }

    info
}

/// Runs [`validate`] and, on failure, shows the reason to the user before
/// handing the error back so startup can stop.
pub fn ensure() -> Result<PlatformInfo, PlatformError> {
    let info = validate();
    if info.ok {
        debug!("Platform check passed (build {})", info.build_number);
        return Ok(info);
    }
    error!("Platform check failed: {}", info.message);
    native::show_error(ERROR_CAPTION, &info.message);
    Err(PlatformError {
        message: info.message,
    })
}
