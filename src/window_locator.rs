//! Resolves the window that receives synthetic input.
//!
//! The remote desktop client draws the session inside a child window of its
//! main window. The locator walks the process's window hierarchy once and
//! returns the descendant whose class name equals the required class.

use tracing::{debug, info};

use crate::error::{KeepAliveError, Result};
use crate::platform::{WindowHandle, WindowTree};
use crate::session::ProcessHandle;

/// A window seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCandidate {
    pub class_name: String,
    pub handle: WindowHandle,
}

impl WindowCandidate {
    pub fn new(class_name: impl Into<String>, handle: WindowHandle) -> Self {
        Self {
            class_name: class_name.into(),
            handle,
        }
    }
}

/// The window that receives input for the lifetime of a scheduler.
///
/// Resolved once per session and never re-validated: if the client closes the
/// window, posts to it quietly go nowhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWindow {
    handle: WindowHandle,
    class_name: String,
}

impl TargetWindow {
    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

/// Finds the descendant of the process's main window whose class name is
/// exactly `class_name`. Comparison is case-sensitive and whole-string.
pub fn locate(
    tree: &dyn WindowTree,
    process: &ProcessHandle,
    class_name: &str,
) -> Result<TargetWindow> {
    let main_window = tree.main_window(process.pid).ok_or_else(|| {
        KeepAliveError::target_not_found(
            class_name,
            format!("process '{}' ({}) has no main window", process.name, process.pid),
        )
    })?;

    let candidates = tree.descendants(main_window);
    debug!(
        main_window = %main_window,
        candidates = candidates.len(),
        "searching window hierarchy"
    );

    let matched = candidates
        .into_iter()
        .find(|candidate| candidate.class_name == class_name)
        .ok_or_else(|| {
            KeepAliveError::target_not_found(
                class_name,
                format!("no descendant of main window {main_window} matched"),
            )
        })?;

    info!(handle = %matched.handle, class = class_name, "target window resolved");
    Ok(TargetWindow {
        handle: matched.handle,
        class_name: matched.class_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockWindowTree;

    fn process() -> ProcessHandle {
        ProcessHandle::new(4242, "mstsc.exe")
    }

    fn rdp_tree() -> MockWindowTree {
        let main = WindowHandle(0x100);
        MockWindowTree::new()
            .with_main_window(4242, main)
            .with_child(main, WindowHandle(0x200), "UIMainClass")
            .with_child(WindowHandle(0x200), WindowHandle(0x300), "UIContainerClass")
            .with_child(WindowHandle(0x300), WindowHandle(0x400), "IHWindowClass")
    }

    #[test]
    fn test_locates_nested_descendant() {
        let target = locate(&rdp_tree(), &process(), "IHWindowClass").unwrap();
        assert_eq!(target.handle(), WindowHandle(0x400));
        assert_eq!(target.class_name(), "IHWindowClass");
    }

    #[test]
    fn test_match_is_exact() {
        let tree = rdp_tree();
        assert!(locate(&tree, &process(), "ihwindowclass").is_err());
        assert!(locate(&tree, &process(), "IHWindow").is_err());
        assert!(locate(&tree, &process(), "IHWindowClass2").is_err());
    }

    #[test]
    fn test_missing_main_window() {
        let tree = MockWindowTree::new();
        let err = locate(&tree, &process(), "IHWindowClass").unwrap_err();
        assert!(matches!(err, KeepAliveError::TargetNotFound { .. }));
        assert!(err.to_string().contains("no main window"));
    }

    #[test]
    fn test_main_window_itself_is_not_a_candidate() {
        let main = WindowHandle(0x100);
        let tree = MockWindowTree::new().with_main_window(4242, main);
        let err = locate(&tree, &process(), "IHWindowClass").unwrap_err();
        assert!(matches!(err, KeepAliveError::TargetNotFound { .. }));
    }
}
