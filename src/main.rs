mod bridge;
mod config;
mod executor;
mod icon;
mod locations;
mod matcher;
mod model;
mod native;
mod platform;
mod protocol;
mod sources;
mod state;
#[cfg(test)]
mod testing;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use serde::Serialize;

use crate::config::load_config;
use crate::locations::Locations;
use crate::model::{Applet, Category};
use crate::native::NativeLoader;
use crate::state::Catalog;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List discovered applets
    List {
        /// Only show applets in this category
        #[arg(short, long)]
        category: Option<Category>,
        /// Fuzzy filter on applet names
        #[arg(short, long)]
        query: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Launch an applet by name
    Run {
        name: String,
    },
    /// Load a single module and list what it exposes
    Inspect {
        path: PathBuf,
    },
    /// Report whether this system meets the requirements
    Check,
}

#[derive(Serialize)]
struct AppletView<'a> {
    name: &'a str,
    description: &'a str,
    path: &'a Path,
    index: usize,
    category: Category,
    extension: bool,
    elevate: bool,
}

impl<'a> From<&'a Applet> for AppletView<'a> {
    fn from(applet: &'a Applet) -> Self {
        Self {
            name: &applet.name,
            description: &applet.description,
            path: applet.source_path(),
            index: applet.sub_index(),
            category: applet.category,
            extension: applet.is_extension(),
            elevate: applet.requires_elevation,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Command::Check = args.command {
        let info = platform::validate();
        println!("64-bit:       {}", info.is_64_bit);
        println!("supported OS: {}", info.is_supported_os);
        println!("build:        {}", info.build_number);
        if !info.ok {
            bail!(info.message);
        }
        return Ok(());
    }

    platform::ensure()?;

    let config = load_config()?;
    let locations = Locations::resolve(&config.general);
    debug!("Scanning {:?} and {:?}", locations.system_dir, locations.extension_dir);

    let mut catalog = Catalog::new(config, locations, NativeLoader::new());

    if let Command::Inspect { path } = &args.command {
        let added = catalog.load_module(path);
        info!("{}: {} applet(s)", path.display(), added);
        for applet in catalog.items() {
            print_applet(applet);
        }
        return Ok(());
    }

    catalog.set_progress_callback(|file, done, total| {
        debug!("[{}/{}] {}", done + 1, total, file);
    });
    if !catalog.refresh() {
        bail!("could not list any applet directory");
    }
    if catalog.is_empty() {
        info!("No applets found");
    } else {
        info!("Discovered {} applets", catalog.len());
    }

    match args.command {
        Command::List { category, query, json } => {
            let mut applets: Vec<&Applet> = match (&query, category) {
                (Some(query), _) => catalog.search(query),
                (None, Some(category)) => catalog.items_by_category(category),
                (None, None) => catalog.items().iter().collect(),
            };
            if let Some(category) = category {
                applets.retain(|applet| applet.category == category);
            }

            if json {
                let views: Vec<AppletView> = applets.into_iter().map(AppletView::from).collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                for applet in applets {
                    print_applet(applet);
                }
            }
        }
        Command::Run { name } => {
            let Some(applet) = catalog.find_by_name(&name) else {
                bail!("no applet named '{}'", name);
            };
            if !applet.execute(None) {
                bail!("failed to launch '{}'", applet.name);
            }
        }
        Command::Inspect { .. } | Command::Check => {}
    }

    Ok(())
}

fn print_applet(applet: &Applet) {
    let location = if applet.sub_index() > 0 {
        format!("{},@{}", applet.source_path().display(), applet.sub_index())
    } else {
        applet.source_path().display().to_string()
    };
    if applet.description.is_empty() {
        println!("{} ({})", applet.name, location);
    } else {
        println!("{} - {} ({})", applet.name, applet.description, location);
    }
}
