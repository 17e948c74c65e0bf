//! Scripted modules and a counting icon backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::icon::{IconBackend, RawIcon};
use crate::protocol::{
    AppletEntry, BridgeError, Inquiry, InquiryForm, Message, ModuleLoader, ResourceSource,
};

/// Hands out unique fake handles and records every destroy call.
#[derive(Default)]
pub struct CountingIcons {
    next: AtomicUsize,
    destroyed: Mutex<HashMap<RawIcon, usize>>,
}

impl CountingIcons {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicUsize::new(0x1000),
            destroyed: Mutex::new(HashMap::new()),
        })
    }

    pub fn mint(&self) -> RawIcon {
        RawIcon(self.next.fetch_add(1, Ordering::SeqCst))
    }

    pub fn destroy_count(&self, raw: RawIcon) -> usize {
        self.destroyed.lock().unwrap().get(&raw).copied().unwrap_or(0)
    }

    pub fn total_destroyed(&self) -> usize {
        self.destroyed.lock().unwrap().values().sum()
    }
}

impl IconBackend for CountingIcons {
    fn duplicate(&self, _raw: RawIcon) -> Option<RawIcon> {
        Some(self.mint())
    }

    fn destroy(&self, raw: RawIcon) {
        *self.destroyed.lock().unwrap().entry(raw).or_insert(0) += 1;
    }
}

/// Scripted answers of one module.
#[derive(Debug, Clone, Default)]
pub struct FakeModule {
    init: i32,
    count: i32,
    modern: HashMap<i32, Inquiry>,
    legacy: HashMap<i32, Inquiry>,
    strings: HashMap<i32, String>,
    icon_resources: HashSet<i32>,
    no_entry: bool,
    no_resources: bool,
}

impl FakeModule {
    pub fn new(count: i32) -> Self {
        Self {
            init: 1,
            count,
            ..Self::default()
        }
    }

    pub fn declining() -> Self {
        Self::new(1)
            .with_modern(0, "Never Seen", "", None)
            .with_init(0)
    }

    pub fn with_init(mut self, result: i32) -> Self {
        self.init = result;
        self
    }

    pub fn with_modern(
        mut self,
        index: i32,
        name: &str,
        description: &str,
        icon: Option<RawIcon>,
    ) -> Self {
        self.modern.insert(
            index,
            Inquiry::Modern {
                name: name.to_string(),
                description: description.to_string(),
                icon,
            },
        );
        self
    }

    pub fn with_legacy(mut self, index: i32, icon_id: i32, name_id: i32, description_id: i32) -> Self {
        self.legacy.insert(
            index,
            Inquiry::Legacy {
                icon_id,
                name_id,
                description_id,
            },
        );
        self
    }

    pub fn with_string(mut self, id: i32, text: &str) -> Self {
        self.strings.insert(id, text.to_string());
        self
    }

    pub fn with_icon_resource(mut self, id: i32) -> Self {
        self.icon_resources.insert(id);
        self
    }

    pub fn without_entry(mut self) -> Self {
        self.no_entry = true;
        self
    }

    pub fn without_resources(mut self) -> Self {
        self.no_resources = true;
        self
    }
}

/// Loader over a table of scripted modules keyed by file name.
pub struct FakeLoader {
    pub icons: Arc<CountingIcons>,
    modules: HashMap<String, FakeModule>,
    messages: Arc<Mutex<Vec<(String, Message)>>>,
    open: Arc<AtomicIsize>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self {
            icons: CountingIcons::new(),
            modules: HashMap::new(),
            messages: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicIsize::new(0)),
        }
    }

    pub fn with_module(mut self, file_name: &str, module: FakeModule) -> Self {
        self.modules.insert(file_name.to_string(), module);
        self
    }

    /// Messages sent to `file_name`, in order.
    pub fn sent(&self, file_name: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == file_name)
            .map(|(_, message)| *message)
            .collect()
    }

    /// Module instances currently held open.
    pub fn open_modules(&self) -> isize {
        self.open.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &Path) -> Option<(String, &FakeModule)> {
        let name = path.file_name()?.to_str()?.to_string();
        let module = self.modules.get(&name)?;
        Some((name, module))
    }
}

pub struct FakeResources {
    module: FakeModule,
    icons: Arc<CountingIcons>,
    open: Arc<AtomicIsize>,
}

impl ResourceSource for FakeResources {
    fn string(&self, id: i32) -> String {
        self.module.strings.get(&id).cloned().unwrap_or_default()
    }

    fn icon(&self, id: i32, _size: i32) -> Option<RawIcon> {
        self.module
            .icon_resources
            .contains(&id)
            .then(|| self.icons.mint())
    }
}

impl Drop for FakeResources {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeEntry {
    name: String,
    module: FakeModule,
    messages: Arc<Mutex<Vec<(String, Message)>>>,
    open: Arc<AtomicIsize>,
}

impl FakeEntry {
    fn record(&self, message: Message) {
        self.messages
            .lock()
            .unwrap()
            .push((self.name.clone(), message));
    }
}

impl AppletEntry for FakeEntry {
    fn send(&mut self, message: Message) -> i32 {
        self.record(message);
        match message {
            Message::Init => self.module.init,
            Message::GetCount => self.module.count,
            _ => 0,
        }
    }

    fn inquire(&mut self, index: i32, form: InquiryForm) -> Inquiry {
        let (message, answers) = match form {
            InquiryForm::Modern => (Message::NewInquire, &self.module.modern),
            InquiryForm::Legacy => (Message::Inquire, &self.module.legacy),
        };
        let answer = answers.get(&index).cloned().unwrap_or(Inquiry::Unsupported);
        self.record(message);
        answer
    }
}

impl Drop for FakeEntry {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ModuleLoader for FakeLoader {
    type Resources = FakeResources;
    type Entry = FakeEntry;

    fn open_resources(&self, path: &Path) -> Result<FakeResources, BridgeError> {
        let failed = || BridgeError::ResourceLoad {
            path: path.to_path_buf(),
            reason: "no such module".to_string(),
        };
        let (_, module) = self.lookup(path).ok_or_else(failed)?;
        if module.no_resources {
            return Err(failed());
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(FakeResources {
            module: module.clone(),
            icons: Arc::clone(&self.icons),
            open: Arc::clone(&self.open),
        })
    }

    fn open_entry(&self, path: &Path) -> Result<FakeEntry, BridgeError> {
        let (name, module) = self.lookup(path).ok_or_else(|| BridgeError::Load {
            path: path.to_path_buf(),
            reason: "no such module".to_string(),
        })?;
        if module.no_entry {
            return Err(BridgeError::MissingEntry(path.to_path_buf()));
        }
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(FakeEntry {
            name,
            module: module.clone(),
            messages: Arc::clone(&self.messages),
            open: Arc::clone(&self.open),
        })
    }

    fn icons(&self) -> Arc<dyn IconBackend> {
        self.icons.clone()
    }
}
