//! Predicates deciding which OS windows are worth tracking.
//!
//! `is_desktop_window` is the coarse filter used during enumeration and
//! for the defensive destroy re-check. `is_visible_in_taskbar` mirrors
//! the heuristics the taskbar itself applies, which go well beyond
//! simple visibility.

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    GA_ROOTOWNER, GWL_EXSTYLE, GetAncestor, GetLastActivePopup, GetShellWindow,
    GetWindowLongPtrW, WS_EX_APPWINDOW, WS_EX_TOOLWINDOW,
};

use crate::query;

/// Bound on the owner-popup walk, against pathological owner cycles.
const MAX_LAST_ACTIVE_POPUP_ITERATIONS: usize = 50;

/// Shell-internal window classes that never belong in the taskbar.
const SKIPPED_CLASS_NAMES: [&str; 5] = [
    "Shell_TrayWnd",
    "DV2ControlHost",
    "MsgrIMEWindowClass",
    "SysShadow",
    "Button",
];

/// WMP's "now playing" taskbar toolbar uses a numbered suffix.
const SKIPPED_CLASS_PREFIX: &str = "WMP9MediaBarFlyout";

/// Core window class of packaged apps. Its taskbar presence comes from
/// a separate host window, never from this class directly.
const PACKAGED_APP_CLASS: &str = "Windows.UI.Core.CoreWindow";

/// Whether a window is a desktop-relevant window worth tracking at all.
pub fn is_desktop_window(handle: usize) -> bool {
    if !query::is_window_visible(handle) {
        return false;
    }
    !is_known_noise(handle)
}

/// Shell helper surfaces that are visible but not user-facing windows.
fn is_known_noise(handle: usize) -> bool {
    let class = query::class_name(handle);
    let path = query::process_path(handle).unwrap_or_default();
    is_noise(&class, &query::title(handle), &path)
}

/// Pure form of the noise check.
fn is_noise(class: &str, title: &str, process_path: &str) -> bool {
    class == PACKAGED_APP_CLASS
        || (process_path.to_ascii_lowercase().ends_with("explorer.exe") && title.is_empty())
}

/// Whether the taskbar would list this window.
///
/// Owned windows never qualify. Beyond that, a window must either be
/// explicitly flagged as an app window, or be independently eligible
/// for activation without being a tool window.
pub fn is_visible_in_taskbar(handle: usize) -> bool {
    if query::is_owned(handle) {
        return false;
    }

    let hwnd = query::to_hwnd(handle);

    // SAFETY: GetShellWindow and GetWindowLongPtrW are simple queries.
    let (shell_window, ex_style) = unsafe {
        (
            GetShellWindow().0 as usize,
            GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32,
        )
    };

    let is_app_window = ex_style & WS_EX_APPWINDOW.0 == WS_EX_APPWINDOW.0;
    let is_tool_window = ex_style & WS_EX_TOOLWINDOW.0 == WS_EX_TOOLWINDOW.0;

    if !is_app_window && !(eligible_for_activation(handle, shell_window) && !is_tool_window) {
        return false;
    }

    if query::class_name(handle) == PACKAGED_APP_CLASS {
        return false;
    }

    true
}

/// Whether the window would show up in an alt-tab style activation
/// list: it is the last visible popup of its ownership chain and its
/// class is not a known shell utility.
fn eligible_for_activation(handle: usize, shell_window: usize) -> bool {
    if handle == shell_window {
        return false;
    }

    // SAFETY: GetAncestor walks the parent/owner chain of a window.
    let root = unsafe { GetAncestor(query::to_hwnd(handle), GA_ROOTOWNER) };

    if last_visible_active_popup(root) != handle {
        return false;
    }

    let class = query::class_name(handle);
    if class.is_empty() {
        return false;
    }

    !is_skipped_class(&class)
}

/// Follows the last-active-popup chain until a visible window appears.
///
/// Returns 0 if the chain loops or exceeds the iteration bound.
fn last_visible_active_popup(root: HWND) -> usize {
    let mut current = root;

    for _ in 0..MAX_LAST_ACTIVE_POPUP_ITERATIONS {
        // SAFETY: GetLastActivePopup returns the most recently active
        // popup of the given owner, or the owner itself.
        let popup = unsafe { GetLastActivePopup(current) };

        if query::is_window_visible(popup.0 as usize) {
            return popup.0 as usize;
        }
        if popup == current {
            return 0;
        }
        current = popup;
    }

    0
}

/// Pure denylist check over a class name.
fn is_skipped_class(class: &str) -> bool {
    SKIPPED_CLASS_NAMES.contains(&class) || class.starts_with(SKIPPED_CLASS_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_classes_are_skipped() {
        assert!(is_skipped_class("Shell_TrayWnd"));
        assert!(is_skipped_class("SysShadow"));
        assert!(is_skipped_class("Button"));
    }

    #[test]
    fn wmp_flyout_prefix_is_skipped() {
        assert!(is_skipped_class("WMP9MediaBarFlyout2"));
        assert!(!is_skipped_class("WMP"));
    }

    #[test]
    fn ordinary_classes_are_not_skipped() {
        assert!(!is_skipped_class("Notepad"));
        assert!(!is_skipped_class("Chrome_WidgetWin_1"));
    }

    #[test]
    fn packaged_core_window_is_noise() {
        assert!(is_noise(
            "Windows.UI.Core.CoreWindow",
            "Settings",
            r"C:\app\app.exe"
        ));
    }

    #[test]
    fn untitled_shell_window_is_noise() {
        assert!(is_noise("Foo", "", r"C:\Windows\explorer.exe"));
        assert!(is_noise("Foo", "", r"C:\Windows\EXPLORER.EXE"));
    }

    #[test]
    fn titled_shell_window_is_not_noise() {
        assert!(!is_noise("CabinetWClass", "Documents", r"C:\Windows\explorer.exe"));
    }

    #[test]
    fn untitled_app_window_is_not_noise() {
        assert!(!is_noise("Foo", "", r"C:\app\app.exe"));
    }
}
