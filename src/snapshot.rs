//! Focus snapshot: resolved state of the foreground window at one instant

use std::path::{Path, PathBuf};

use crate::host::WindowRef;

/// Metadata of the process owning the foreground window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub module_name: String,
    pub image_path: PathBuf,
}

impl ProcessInfo {
    /// Build from full image path; module name = file name component
    pub fn from_image_path(image_path: impl Into<PathBuf>) -> Self {
        let image_path = image_path.into();
        let module_name = module_name_of(&image_path);
        Self {
            module_name,
            image_path,
        }
    }
}

/// File name of a Win32 image path ("C:\\x\\notepad.exe" → "notepad.exe")
fn module_name_of(path: &Path) -> String {
    // Win32 paths use '\', which Path only splits on Windows
    let raw = path.to_string_lossy();
    raw.rsplit(['\\', '/']).next().unwrap_or_default().to_string()
}

/// Immutable snapshot of the focused window, replaced wholesale on update.
///
/// `Default` is the empty snapshot seen before the first enable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub process_id: u32,
    pub thread_id: u32,
    pub window: Option<WindowRef>,
    pub window_title: Option<String>,
    pub process: Option<ProcessInfo>,
}

impl FocusSnapshot {
    /// True before any resolution has produced an owner
    pub fn is_empty(&self) -> bool {
        self.process_id == 0 && self.thread_id == 0 && self.window.is_none()
    }

    /// Title of the focused window, if it could be read
    pub fn window_title(&self) -> Option<&str> {
        self.window_title.as_deref()
    }

    /// Module (executable file) name of the owning process, if resolved
    pub fn module_name(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.module_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snap = FocusSnapshot::default();
        assert!(snap.is_empty());
        assert!(snap.window_title().is_none());
        assert!(snap.module_name().is_none());
    }

    #[test]
    fn test_module_name_from_win32_path() {
        let info = ProcessInfo::from_image_path(r"C:\Windows\System32\notepad.exe");
        assert_eq!(info.module_name, "notepad.exe");
    }

    #[test]
    fn test_module_name_from_bare_name() {
        let info = ProcessInfo::from_image_path("editor.exe");
        assert_eq!(info.module_name, "editor.exe");
    }

    #[test]
    fn test_snapshot_accessors() {
        let snap = FocusSnapshot {
            process_id: 100,
            thread_id: 5,
            window: Some(WindowRef(0x10)),
            window_title: Some("Editor".to_string()),
            process: Some(ProcessInfo::from_image_path("editor.exe")),
        };
        assert!(!snap.is_empty());
        assert_eq!(snap.window_title(), Some("Editor"));
        assert_eq!(snap.module_name(), Some("editor.exe"));
    }
}
