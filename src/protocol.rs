//! The control-message protocol spoken with applet modules, and the seams
//! through which a module is loaded and addressed.
//!
//! Everything that touches foreign code lives behind [`ModuleLoader`]: the
//! native implementation resolves and calls the real `CPlApplet` export,
//! tests substitute scripted modules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::icon::{IconBackend, RawIcon};

/// Name of the single export every applet module provides.
#[cfg_attr(not(windows), allow(dead_code))]
pub const ENTRY_POINT: &str = "CPlApplet";

/// Message codes understood by the entry point.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Message {
    Init = 1,
    GetCount = 2,
    Inquire = 3,
    Select = 4,
    DblClk = 5,
    Stop = 6,
    Exit = 7,
    NewInquire = 8,
    StartWithParams = 9,
}

impl Message {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Which generation of the inquiry message to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryForm {
    /// `NEWINQUIRE`: literal wide strings and an icon handle.
    Modern,
    /// `INQUIRE`: resource identifiers into the module's tables.
    Legacy,
}

/// What a module answered to an inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inquiry {
    /// The icon, if any, still belongs to the module.
    Modern {
        name: String,
        description: String,
        icon: Option<RawIcon>,
    },
    Legacy {
        icon_id: i32,
        name_id: i32,
        description_id: i32,
    },
    Unsupported,
}

/// A module loaded for execution with its entry point resolved.
pub trait AppletEntry {
    /// Sends a message that carries no buffer and returns the raw result.
    fn send(&mut self, message: Message) -> i32;

    /// Asks sub-applet `index` to describe itself.
    fn inquire(&mut self, index: i32, form: InquiryForm) -> Inquiry;
}

/// A module loaded as a data file, used only to read its resource tables.
pub trait ResourceSource {
    /// Indexed string lookup; a missing string is empty, not an error.
    fn string(&self, id: i32) -> String;

    /// Loads an icon resource at `size` pixels square. The caller owns the
    /// returned handle.
    fn icon(&self, id: i32, size: i32) -> Option<RawIcon>;
}

/// Opens the two views of a module. Each returned value keeps its module
/// loaded until it is dropped.
pub trait ModuleLoader {
    type Resources: ResourceSource;
    type Entry: AppletEntry;

    fn open_resources(&self, path: &Path) -> Result<Self::Resources, BridgeError>;
    fn open_entry(&self, path: &Path) -> Result<Self::Entry, BridgeError>;
    fn icons(&self) -> Arc<dyn IconBackend>;
}

/// Why a module contributed no applets.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to load {path} as a resource module: {reason}")]
    ResourceLoad { path: PathBuf, reason: String },
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("{0} does not export CPlApplet")]
    MissingEntry(PathBuf),
    #[error("{0} declined initialization")]
    Declined(PathBuf),
    #[error("{path} reported {count} applets")]
    NoApplets { path: PathBuf, count: i32 },
    #[error("applet modules cannot be loaded on this platform")]
    Unsupported,
}
