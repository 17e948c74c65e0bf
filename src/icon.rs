use std::fmt;
use std::sync::Arc;

/// Raw OS icon handle value, as handed out by a module or the icon API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawIcon(pub usize);

/// The two icon operations the catalog needs from the OS.
pub trait IconBackend: Send + Sync {
    /// Returns a private copy of `raw`. The original stays with its owner.
    fn duplicate(&self, raw: RawIcon) -> Option<RawIcon>;
    fn destroy(&self, raw: RawIcon);
}

/// An icon handle owned by exactly one value and destroyed when it drops.
pub struct OwnedIcon {
    raw: RawIcon,
    backend: Arc<dyn IconBackend>,
    owned: bool,
}

impl OwnedIcon {
    /// Takes ownership of a handle nobody else will release.
    pub fn adopt(raw: RawIcon, backend: Arc<dyn IconBackend>) -> Self {
        Self {
            raw,
            backend,
            owned: true,
        }
    }

    /// Copies a handle that belongs to someone else (usually a loaded module).
    pub fn duplicate(raw: RawIcon, backend: &Arc<dyn IconBackend>) -> Option<Self> {
        backend
            .duplicate(raw)
            .map(|copy| Self::adopt(copy, Arc::clone(backend)))
    }

    pub fn raw(&self) -> RawIcon {
        self.raw
    }

    /// Gives up ownership without destroying the handle.
    pub(crate) fn disown(mut self) {
        self.owned = false;
    }
}

impl Drop for OwnedIcon {
    fn drop(&mut self) {
        if self.owned {
            self.backend.destroy(self.raw);
        }
    }
}

impl fmt::Debug for OwnedIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedIcon").field(&self.raw).finish()
    }
}
