use std::io;
use std::path::PathBuf;

use log::{info, warn};
use thiserror::Error;

use crate::model::Applet;
use crate::native;

/// Launcher utility for protocol modules.
pub const LAUNCHER: &str = "rundll32.exe";

/// Raw handle of the window launched applets should be parented to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWindow(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Open,
    RunAs,
}

impl Verb {
    #[cfg_attr(not(windows), allow(dead_code))]
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Open => "open",
            Verb::RunAs => "runas",
        }
    }
}

/// What to hand the shell to start an applet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub verb: Verb,
    pub program: PathBuf,
    pub parameters: Option<String>,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("applet has no source path")]
    MissingPath,
    #[error("elevated launch is not available on this platform")]
    ElevationUnsupported,
    #[error("failed to start applet: {0}")]
    Spawn(#[source] io::Error),
}

/// Extensions run directly; protocol modules go through the launcher with
/// the module path and, past the first, the sub-applet index.
pub fn plan(applet: &Applet) -> Result<LaunchPlan, LaunchError> {
    let path = applet.source_path();
    if path.as_os_str().is_empty() {
        return Err(LaunchError::MissingPath);
    }

    let verb = if applet.requires_elevation { Verb::RunAs } else { Verb::Open };

    if applet.is_extension() {
        return Ok(LaunchPlan {
            verb,
            program: path.to_path_buf(),
            parameters: None,
        });
    }

    let mut parameters = format!("shell32.dll,Control_RunDLL \"{}\"", path.display());
    if applet.sub_index() > 0 {
        parameters.push_str(&format!(",@{}", applet.sub_index()));
    }
    Ok(LaunchPlan {
        verb,
        program: PathBuf::from(LAUNCHER),
        parameters: Some(parameters),
    })
}

pub fn execute(applet: &Applet, parent: Option<ParentWindow>) -> Result<(), LaunchError> {
    let plan = plan(applet)?;
    info!("Launching '{}' via {:?}", applet.name, plan);
    native::launch(&plan, parent)
}

impl Applet {
    /// Launches the applet. Failures are logged, not surfaced.
    pub fn execute(&self, parent: Option<ParentWindow>) -> bool {
        match execute(self, parent) {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not launch '{}': {}", self.name, err);
                false
            }
        }
    }
}
