use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::icon::OwnedIcon;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Uncategorized,
    System,
    Network,
    Security,
    Display,
    Hardware,
    Programs,
    UserAccounts,
    DateTime,
    Accessibility,
    Sound,
    Power,
    Custom,
}

/// One launchable item: a sub-applet of a protocol module, or an extension.
///
/// Not `Clone`: the record owns its icon handle and releases it when dropped.
#[derive(Debug)]
pub struct Applet {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub requires_elevation: bool,
    source_path: PathBuf,
    sub_index: usize,
    is_extension: bool,
    icon: Option<OwnedIcon>,
}

impl Applet {
    /// A sub-applet of a protocol module, still unnamed.
    pub fn applet(source_path: PathBuf, sub_index: usize) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            category: Category::Uncategorized,
            requires_elevation: false,
            source_path,
            sub_index,
            is_extension: false,
            icon: None,
        }
    }

    /// An extension module, named after its file stem.
    pub fn extension(source_path: PathBuf) -> Self {
        let name = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut applet = Self::applet(source_path, 0);
        applet.name = name;
        applet.is_extension = true;
        applet
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn sub_index(&self) -> usize {
        self.sub_index
    }

    pub fn is_extension(&self) -> bool {
        self.is_extension
    }

    /// File name of the backing module, used for per-module overrides.
    pub fn module_name(&self) -> Option<&str> {
        self.source_path.file_name().and_then(|name| name.to_str())
    }

    pub fn icon(&self) -> Option<&OwnedIcon> {
        self.icon.as_ref()
    }

    /// Replaces the held icon. The previous handle is released unless it is
    /// the very handle being assigned again.
    pub fn set_icon(&mut self, icon: Option<OwnedIcon>) {
        let same = matches!(
            (&self.icon, &icon),
            (Some(current), Some(new)) if current.raw() == new.raw()
        );
        if same {
            if let Some(new) = icon {
                new.disown();
            }
            return;
        }
        self.icon = icon;
    }
}
