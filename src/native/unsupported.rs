use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::error;

use crate::executor::{LaunchError, LaunchPlan, ParentWindow, Verb};
use crate::icon::{IconBackend, RawIcon};
use crate::platform::OsVersion;
use crate::protocol::{AppletEntry, BridgeError, Inquiry, InquiryForm, Message, ModuleLoader, ResourceSource};

/// Icons never come out of a module here, so there is nothing to copy or free.
pub struct SystemIcons;

impl IconBackend for SystemIcons {
    fn duplicate(&self, _raw: RawIcon) -> Option<RawIcon> {
        None
    }

    fn destroy(&self, _raw: RawIcon) {}
}

/// Uninhabited: no module can be opened on this platform.
pub enum Unavailable {}

impl ResourceSource for Unavailable {
    fn string(&self, _id: i32) -> String {
        match *self {}
    }

    fn icon(&self, _id: i32, _size: i32) -> Option<RawIcon> {
        match *self {}
    }
}

impl AppletEntry for Unavailable {
    fn send(&mut self, _message: Message) -> i32 {
        match *self {}
    }

    fn inquire(&mut self, _index: i32, _form: InquiryForm) -> Inquiry {
        match *self {}
    }
}

/// Reports every module as unsupported.
#[derive(Default)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for NativeLoader {
    type Resources = Unavailable;
    type Entry = Unavailable;

    fn open_resources(&self, _path: &Path) -> Result<Unavailable, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn open_entry(&self, _path: &Path) -> Result<Unavailable, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    fn icons(&self) -> Arc<dyn IconBackend> {
        Arc::new(SystemIcons)
    }
}

pub fn system_directory() -> Option<PathBuf> {
    None
}

pub fn os_version() -> Option<OsVersion> {
    None
}

pub fn is_os_version_at_least(_major: u32) -> bool {
    false
}

pub fn show_error(caption: &str, text: &str) {
    error!("{}: {}", caption, text);
    eprintln!("{caption}\n\n{text}");
}

pub fn launch(plan: &LaunchPlan, _parent: Option<ParentWindow>) -> Result<(), LaunchError> {
    if plan.verb == Verb::RunAs {
        return Err(LaunchError::ElevationUnsupported);
    }
    Command::new(&plan.program)
        .args(plan.parameters.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(LaunchError::Spawn)?;
    Ok(())
}
