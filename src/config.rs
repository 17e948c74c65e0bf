use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use directories::ProjectDirs;
use anyhow::Result;
use std::fs;

use crate::model::Category;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    /// Per-module overrides keyed by module file name.
    #[serde(default)]
    pub modules: HashMap<String, ModuleOverride>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_icon_size")]
    pub icon_size: i32,
    #[serde(default)]
    pub system_dir: Option<PathBuf>,
    #[serde(default)]
    pub extension_dir: Option<PathBuf>,
}

fn default_icon_size() -> i32 { 32 }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            icon_size: default_icon_size(),
            system_dir: None,
            extension_dir: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScanConfig {
    /// Regular expressions matched against system module file names.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ModuleOverride {
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub elevate: bool,
}

impl Config {
    /// Looks up the override for a module, ignoring case.
    pub fn module_override(&self, file_name: &str) -> Option<&ModuleOverride> {
        self.modules
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(file_name))
            .map(|(_, module)| module)
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    Ok(config)
}

pub fn load_config() -> Result<Config> {
    let proj_dirs = ProjectDirs::from("org", "cpl-runner", "cpl-runner");
    let config_path = if let Some(dirs) = &proj_dirs {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("config.toml")
    };

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(config_path)?;
    parse_config(&content)
}
