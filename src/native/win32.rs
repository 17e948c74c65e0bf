use std::ffi::{OsStr, c_void};
use std::io;
use std::iter;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libloading::Library;
use windows_sys::Win32::Foundation::{FreeLibrary, HMODULE, HWND};
use windows_sys::Win32::System::LibraryLoader::{
    LOAD_LIBRARY_AS_DATAFILE, LOAD_LIBRARY_AS_IMAGE_RESOURCE, LoadLibraryExW,
};
use windows_sys::Win32::System::SystemInformation::{
    GetSystemDirectoryW, OSVERSIONINFOEXW, OSVERSIONINFOW, VER_MAJORVERSION, VerSetConditionMask,
    VerifyVersionInfoW,
};
use windows_sys::Win32::UI::Shell::{SHELLEXECUTEINFOW, ShellExecuteExW};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CopyIcon, DestroyIcon, HICON, IMAGE_ICON, LR_DEFAULTCOLOR, LoadImageW, LoadStringW,
    MB_ICONERROR, MB_OK, MessageBoxW, SW_SHOWNORMAL,
};

use crate::executor::{LaunchError, LaunchPlan, ParentWindow};
use crate::icon::{IconBackend, RawIcon};
use crate::platform::OsVersion;
use crate::protocol::{
    AppletEntry, BridgeError, ENTRY_POINT, Inquiry, InquiryForm, Message, ModuleLoader,
    ResourceSource,
};

type CplAppletFn =
    unsafe extern "system" fn(hwnd: HWND, msg: u32, lparam1: isize, lparam2: isize) -> i32;

/// `CPLINFO`
#[allow(dead_code)]
#[repr(C)]
#[derive(Default)]
struct CplInfo {
    icon: i32,
    name: i32,
    info: i32,
    data: isize,
}

/// `NEWCPLINFOW`
#[allow(dead_code)]
#[repr(C)]
struct NewCplInfo {
    size: u32,
    flags: u32,
    help_context: u32,
    data: isize,
    icon: HICON,
    name: [u16; 32],
    info: [u16; 64],
    help_file: [u16; 128],
}

impl NewCplInfo {
    fn zeroed() -> Self {
        Self {
            size: mem::size_of::<Self>() as u32,
            flags: 0,
            help_context: 0,
            data: 0,
            icon: ptr::null_mut(),
            name: [0; 32],
            info: [0; 64],
            help_file: [0; 128],
        }
    }
}

fn wide(value: &OsStr) -> Vec<u16> {
    value.encode_wide().chain(iter::once(0)).collect()
}

fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// `CopyIcon` / `DestroyIcon`.
pub struct SystemIcons;

impl IconBackend for SystemIcons {
    fn duplicate(&self, raw: RawIcon) -> Option<RawIcon> {
        let copy = unsafe { CopyIcon(raw.0 as HICON) };
        (!copy.is_null()).then(|| RawIcon(copy as usize))
    }

    fn destroy(&self, raw: RawIcon) {
        unsafe {
            DestroyIcon(raw.0 as HICON);
        }
    }
}

/// A module mapped as a data file; no code from it ever runs.
pub struct ResourceModule {
    handle: HMODULE,
}

impl ResourceSource for ResourceModule {
    fn string(&self, id: i32) -> String {
        let mut buffer = [0u16; 256];
        let len = unsafe {
            LoadStringW(
                self.handle,
                id as u32,
                buffer.as_mut_ptr(),
                buffer.len() as i32,
            )
        };
        if len > 0 {
            String::from_utf16_lossy(&buffer[..len as usize])
        } else {
            String::new()
        }
    }

    fn icon(&self, id: i32, size: i32) -> Option<RawIcon> {
        // MAKEINTRESOURCEW
        let name = id as u16 as usize as *const u16;
        let handle = unsafe { LoadImageW(self.handle, name, IMAGE_ICON, size, size, LR_DEFAULTCOLOR) };
        (!handle.is_null()).then(|| RawIcon(handle as usize))
    }
}

impl Drop for ResourceModule {
    fn drop(&mut self) {
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

/// A module loaded for execution, with `CPlApplet` resolved.
pub struct EntryModule {
    entry: CplAppletFn,
    _library: Library,
}

impl EntryModule {
    fn call(&mut self, message: Message, lparam1: isize, lparam2: isize) -> i32 {
        unsafe { (self.entry)(ptr::null_mut(), message.code(), lparam1, lparam2) }
    }
}

impl AppletEntry for EntryModule {
    fn send(&mut self, message: Message) -> i32 {
        self.call(message, 0, 0)
    }

    fn inquire(&mut self, index: i32, form: InquiryForm) -> Inquiry {
        match form {
            InquiryForm::Modern => {
                let mut info = NewCplInfo::zeroed();
                self.call(
                    Message::NewInquire,
                    index as isize,
                    &mut info as *mut NewCplInfo as isize,
                );
                Inquiry::Modern {
                    name: from_wide(&info.name),
                    description: from_wide(&info.info),
                    icon: (!info.icon.is_null()).then(|| RawIcon(info.icon as usize)),
                }
            }
            InquiryForm::Legacy => {
                let mut info = CplInfo::default();
                self.call(
                    Message::Inquire,
                    index as isize,
                    &mut info as *mut CplInfo as isize,
                );
                Inquiry::Legacy {
                    icon_id: info.icon,
                    name_id: info.name,
                    description_id: info.info,
                }
            }
        }
    }
}

/// Loads applet modules through the Win32 loader.
pub struct NativeLoader {
    icons: Arc<dyn IconBackend>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self {
            icons: Arc::new(SystemIcons),
        }
    }
}

impl Default for NativeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for NativeLoader {
    type Resources = ResourceModule;
    type Entry = EntryModule;

    fn open_resources(&self, path: &Path) -> Result<ResourceModule, BridgeError> {
        let file = wide(path.as_os_str());
        let handle = unsafe {
            LoadLibraryExW(
                file.as_ptr(),
                ptr::null_mut(),
                LOAD_LIBRARY_AS_DATAFILE | LOAD_LIBRARY_AS_IMAGE_RESOURCE,
            )
        };
        if handle.is_null() {
            return Err(BridgeError::ResourceLoad {
                path: path.to_path_buf(),
                reason: io::Error::last_os_error().to_string(),
            });
        }
        Ok(ResourceModule { handle })
    }

    fn open_entry(&self, path: &Path) -> Result<EntryModule, BridgeError> {
        let library = unsafe { Library::new(path) }.map_err(|source| BridgeError::Load {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
        let entry = unsafe {
            library
                .get::<CplAppletFn>(ENTRY_POINT.as_bytes())
                .map(|symbol| *symbol)
                .map_err(|_| BridgeError::MissingEntry(path.to_path_buf()))?
        };
        Ok(EntryModule {
            entry,
            _library: library,
        })
    }

    fn icons(&self) -> Arc<dyn IconBackend> {
        Arc::clone(&self.icons)
    }
}

pub fn system_directory() -> Option<PathBuf> {
    let mut buffer = [0u16; 260];
    let len = unsafe { GetSystemDirectoryW(buffer.as_mut_ptr(), buffer.len() as u32) } as usize;
    if len == 0 || len > buffer.len() {
        return None;
    }
    Some(PathBuf::from(String::from_utf16_lossy(&buffer[..len])))
}

/// Reads the running OS version through `RtlGetVersion`.
pub fn os_version() -> Option<OsVersion> {
    type RtlGetVersionFn = unsafe extern "system" fn(*mut OSVERSIONINFOW) -> i32;

    let ntdll = unsafe { Library::new("ntdll.dll") }.ok()?;
    let rtl_get_version = unsafe { ntdll.get::<RtlGetVersionFn>(b"RtlGetVersion\0") }.ok()?;

    let mut info: OSVERSIONINFOW = unsafe { mem::zeroed() };
    info.dwOSVersionInfoSize = mem::size_of::<OSVERSIONINFOW>() as u32;
    if unsafe { rtl_get_version(&mut info) } != 0 {
        return None;
    }
    Some(OsVersion {
        major: info.dwMajorVersion,
        minor: info.dwMinorVersion,
        build: info.dwBuildNumber,
    })
}

/// Asks the loader whether the OS major version is at least `major`.
///
/// Without a compatibility manifest newer systems report themselves as 6.2
/// here, so this only backs up [`os_version`].
pub fn is_os_version_at_least(major: u32) -> bool {
    // VER_GREATER_EQUAL
    const GREATER_EQUAL: u8 = 3;

    let mut info: OSVERSIONINFOEXW = unsafe { mem::zeroed() };
    info.dwOSVersionInfoSize = mem::size_of::<OSVERSIONINFOEXW>() as u32;
    info.dwMajorVersion = major;
    let mask = unsafe { VerSetConditionMask(0, VER_MAJORVERSION, GREATER_EQUAL) };
    unsafe { VerifyVersionInfoW(&mut info, VER_MAJORVERSION, mask) != 0 }
}

/// Blocking error dialog.
pub fn show_error(caption: &str, text: &str) {
    let caption = wide(OsStr::new(caption));
    let text = wide(OsStr::new(text));
    unsafe {
        MessageBoxW(ptr::null_mut(), text.as_ptr(), caption.as_ptr(), MB_OK | MB_ICONERROR);
    }
}

pub fn launch(plan: &LaunchPlan, parent: Option<ParentWindow>) -> Result<(), LaunchError> {
    let verb = wide(OsStr::new(plan.verb.as_str()));
    let file = wide(plan.program.as_os_str());
    let parameters = plan.parameters.as_deref().map(|p| wide(OsStr::new(p)));

    let mut info: SHELLEXECUTEINFOW = unsafe { mem::zeroed() };
    info.cbSize = mem::size_of::<SHELLEXECUTEINFOW>() as u32;
    info.hwnd = parent.map_or(ptr::null_mut(), |window| window.0 as *mut c_void);
    info.lpVerb = verb.as_ptr();
    info.lpFile = file.as_ptr();
    info.lpParameters = parameters.as_ref().map_or(ptr::null(), |p| p.as_ptr());
    info.nShow = SW_SHOWNORMAL;

    if unsafe { ShellExecuteExW(&mut info) } == 0 {
        return Err(LaunchError::Spawn(io::Error::last_os_error()));
    }
    Ok(())
}
