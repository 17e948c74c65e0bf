//! Turns one applet module into the records it exposes.

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::icon::{IconBackend, OwnedIcon};
use crate::model::Applet;
use crate::protocol::{
    AppletEntry, BridgeError, Inquiry, InquiryForm, Message, ModuleLoader, ResourceSource,
};

/// Upper bound on sub-applets read from one module. `GETCOUNT` answers past
/// this are clamped.
pub const MAX_SUB_APPLETS: i32 = 1024;

/// Extracts every named sub-applet of the module at `path`.
///
/// Failures are per-module: anything that goes wrong is logged and the
/// module simply contributes nothing.
pub fn extract<L: ModuleLoader>(loader: &L, path: &Path, icon_size: i32) -> Vec<Applet> {
    match negotiate(loader, path, icon_size) {
        Ok(applets) => {
            debug!("{}: {} applet(s)", path.display(), applets.len());
            applets
        }
        Err(err) => {
            debug!("Skipping module: {}", err);
            Vec::new()
        }
    }
}

fn negotiate<L: ModuleLoader>(
    loader: &L,
    path: &Path,
    icon_size: i32,
) -> Result<Vec<Applet>, BridgeError> {
    // Declaration order matters: the session drops first (EXIT), then the
    // executable instance, then the resource instance.
    let resources = loader.open_resources(path)?;
    let mut entry = loader.open_entry(path)?;

    if entry.send(Message::Init) == 0 {
        return Err(BridgeError::Declined(path.to_path_buf()));
    }
    let session = Session { entry: &mut entry };

    let count = session.entry.send(Message::GetCount);
    if count <= 0 {
        return Err(BridgeError::NoApplets {
            path: path.to_path_buf(),
            count,
        });
    }

    let count = if count > MAX_SUB_APPLETS {
        debug!(
            "{}: module reports {} applets, reading the first {}",
            path.display(),
            count,
            MAX_SUB_APPLETS
        );
        MAX_SUB_APPLETS
    } else {
        count
    };

    let icons = loader.icons();
    let mut applets = Vec::new();
    for index in 0..count {
        let applet = describe(&mut *session.entry, &resources, &icons, path, index, icon_size);
        if applet.name.is_empty() {
            debug!("{}: sub-applet {} has no name", path.display(), index);
            continue;
        }
        applets.push(applet);
    }
    Ok(applets)
}

/// Sends `EXIT` when dropped, so every path after a successful `INIT`
/// closes the conversation exactly once.
struct Session<'a, E: AppletEntry> {
    entry: &'a mut E,
}

impl<E: AppletEntry> Drop for Session<'_, E> {
    fn drop(&mut self) {
        self.entry.send(Message::Exit);
    }
}

fn describe<E: AppletEntry, R: ResourceSource>(
    entry: &mut E,
    resources: &R,
    icons: &Arc<dyn IconBackend>,
    path: &Path,
    index: i32,
    icon_size: i32,
) -> Applet {
    let mut applet = Applet::applet(path.to_path_buf(), index as usize);

    match entry.inquire(index, InquiryForm::Modern) {
        Inquiry::Modern {
            name,
            description,
            icon,
        } if !name.is_empty() => {
            applet.name = name;
            applet.description = description;
            applet.set_icon(icon.and_then(|raw| OwnedIcon::duplicate(raw, icons)));
        }
        _ => {
            if let Inquiry::Legacy {
                icon_id,
                name_id,
                description_id,
            } = entry.inquire(index, InquiryForm::Legacy)
            {
                applet.name = resources.string(name_id);
                applet.description = resources.string(description_id);
                applet.set_icon(
                    resources
                        .icon(icon_id, icon_size)
                        .map(|raw| OwnedIcon::adopt(raw, Arc::clone(icons))),
                );
            }
        }
    }
    applet
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::icon::RawIcon;
    use crate::testing::{FakeLoader, FakeModule};

    fn names(applets: &[Applet]) -> Vec<&str> {
        applets.iter().map(|applet| applet.name.as_str()).collect()
    }

    #[test]
    fn modern_inquiry_is_authoritative() {
        let loader = FakeLoader::new().with_module(
            "sound.cpl",
            FakeModule::new(1)
                .with_modern(0, "Sound", "Speakers and microphones", None)
                .with_legacy(0, 1, 10, 11)
                .with_string(10, "Legacy Sound"),
        );
        let applets = extract(&loader, Path::new("sound.cpl"), 32);

        assert_eq!(names(&applets), vec!["Sound"]);
        assert_eq!(applets[0].description, "Speakers and microphones");
        assert_eq!(applets[0].sub_index(), 0);
        assert!(!applets[0].is_extension());
        assert!(!loader.sent("sound.cpl").contains(&Message::Inquire));
    }

    #[test]
    fn legacy_inquiry_fills_in_for_empty_modern_name() {
        let loader = FakeLoader::new().with_module(
            "intl.cpl",
            FakeModule::new(1)
                .with_modern(0, "", "ignored", None)
                .with_legacy(0, 100, 10, 11)
                .with_string(10, "Region")
                .with_string(11, "Formats and location")
                .with_icon_resource(100),
        );
        let applets = extract(&loader, Path::new("intl.cpl"), 32);

        assert_eq!(names(&applets), vec!["Region"]);
        assert_eq!(applets[0].description, "Formats and location");
        assert!(applets[0].icon().is_some());
    }

    #[test]
    fn missing_description_string_is_empty() {
        let loader = FakeLoader::new().with_module(
            "timedate.cpl",
            FakeModule::new(1)
                .with_legacy(0, 0, 10, 99)
                .with_string(10, "Date and Time"),
        );
        let applets = extract(&loader, Path::new("timedate.cpl"), 32);

        assert_eq!(names(&applets), vec!["Date and Time"]);
        assert_eq!(applets[0].description, "");
        assert!(applets[0].icon().is_none());
    }

    #[test]
    fn nameless_sub_applets_are_dropped() {
        let loader = FakeLoader::new().with_module(
            "multi.cpl",
            FakeModule::new(3)
                .with_modern(0, "First", "", None)
                .with_legacy(1, 0, 50, 51)
                .with_modern(2, "Third", "", None),
        );
        let applets = extract(&loader, Path::new("multi.cpl"), 32);

        assert_eq!(names(&applets), vec!["First", "Third"]);
        let indices: Vec<usize> = applets.iter().map(Applet::sub_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn declined_init_skips_exit() {
        let loader = FakeLoader::new().with_module("shy.cpl", FakeModule::declining());
        let applets = extract(&loader, Path::new("shy.cpl"), 32);

        assert!(applets.is_empty());
        assert_eq!(loader.sent("shy.cpl"), vec![Message::Init]);
        assert_eq!(loader.open_modules(), 0);
    }

    #[test]
    fn empty_count_still_sends_exit() {
        let loader = FakeLoader::new().with_module("empty.cpl", FakeModule::new(0));
        let applets = extract(&loader, Path::new("empty.cpl"), 32);

        assert!(applets.is_empty());
        assert_eq!(
            loader.sent("empty.cpl"),
            vec![Message::Init, Message::GetCount, Message::Exit]
        );
    }

    #[test]
    fn exit_is_sent_once_after_inquiries() {
        let loader = FakeLoader::new().with_module(
            "main.cpl",
            FakeModule::new(2)
                .with_modern(0, "Mouse", "", None)
                .with_modern(1, "Keyboard", "", None),
        );
        extract(&loader, Path::new("main.cpl"), 32);

        let sent = loader.sent("main.cpl");
        assert_eq!(sent.iter().filter(|m| **m == Message::Exit).count(), 1);
        assert_eq!(sent.last(), Some(&Message::Exit));
    }

    #[test]
    fn both_module_instances_are_released_on_every_path() {
        let loader = FakeLoader::new()
            .with_module("ok.cpl", FakeModule::new(1).with_modern(0, "Ok", "", None))
            .with_module("shy.cpl", FakeModule::declining())
            .with_module("noentry.cpl", FakeModule::new(1).without_entry())
            .with_module("nores.cpl", FakeModule::new(1).without_resources());

        for name in ["ok.cpl", "shy.cpl", "noentry.cpl", "nores.cpl", "absent.cpl"] {
            extract(&loader, &PathBuf::from(name), 32);
            assert_eq!(loader.open_modules(), 0, "{name}");
        }
        assert!(loader.sent("noentry.cpl").is_empty());
        assert!(loader.sent("nores.cpl").is_empty());
    }

    #[test]
    fn modern_icon_is_duplicated_not_taken() {
        let loader = FakeLoader::new();
        let module_icon = loader.icons.mint();
        let loader = loader.with_module(
            "desk.cpl",
            FakeModule::new(1).with_modern(0, "Display", "", Some(module_icon)),
        );

        let applets = extract(&loader, Path::new("desk.cpl"), 32);
        let owned: RawIcon = applets[0].icon().map(OwnedIcon::raw).unwrap();
        assert_ne!(owned, module_icon);

        drop(applets);
        assert_eq!(loader.icons.destroy_count(owned), 1);
        assert_eq!(loader.icons.destroy_count(module_icon), 0);
    }

    #[test]
    fn dropped_sub_applet_releases_its_icon() {
        let loader = FakeLoader::new().with_module(
            "ghost.cpl",
            FakeModule::new(1)
                .with_legacy(0, 7, 0, 0)
                .with_icon_resource(7),
        );
        let applets = extract(&loader, Path::new("ghost.cpl"), 32);

        assert!(applets.is_empty());
        assert_eq!(loader.icons.total_destroyed(), 1);
    }

    #[test]
    fn oversized_count_is_clamped() {
        let loader = FakeLoader::new().with_module(
            "huge.cpl",
            FakeModule::new(i32::MAX).with_modern(0, "Only", "", None),
        );
        let applets = extract(&loader, Path::new("huge.cpl"), 32);

        assert_eq!(names(&applets), vec!["Only"]);
        let sent = loader.sent("huge.cpl");
        let inquiries = sent.iter().filter(|m| **m == Message::NewInquire).count();
        assert_eq!(inquiries, MAX_SUB_APPLETS as usize);
        assert_eq!(sent.last(), Some(&Message::Exit));
        assert_eq!(loader.open_modules(), 0);
    }
}
