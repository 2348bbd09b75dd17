//! Window icon handle extraction.

use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    GCLP_HICON, GetClassLongPtrW, ICON_BIG, ICON_SMALL2, IDI_APPLICATION, LoadIconW, SendMessageW,
    WM_GETICON,
};

use crate::query;

/// Classes whose icon lives with the app package, not the window.
const PACKAGED_APP_CLASSES: [&str; 2] = ["Windows.UI.Core.CoreWindow", "ApplicationFrameWindow"];

/// Resolves the best available icon handle for a window.
///
/// Tries the class icon first, then asks the window itself, and falls
/// back to the stock application icon. Returns 0 for dead windows and
/// packaged-app windows, which do not carry a usable HICON.
pub fn icon_handle(handle: usize) -> usize {
    if !query::is_open(handle) || PACKAGED_APP_CLASSES.contains(&query::class_name(handle).as_str())
    {
        return 0;
    }

    let hwnd = query::to_hwnd(handle);

    // SAFETY: GetClassLongPtrW and SendMessageW with WM_GETICON are
    // read-only queries against a live window.
    unsafe {
        let class_icon = GetClassLongPtrW(hwnd, GCLP_HICON);
        if class_icon != 0 {
            return class_icon;
        }

        let big = SendMessageW(
            hwnd,
            WM_GETICON,
            Some(WPARAM(ICON_BIG as usize)),
            Some(LPARAM(0)),
        );
        if big.0 != 0 {
            return big.0 as usize;
        }

        let small = SendMessageW(
            hwnd,
            WM_GETICON,
            Some(WPARAM(ICON_SMALL2 as usize)),
            Some(LPARAM(0)),
        );
        if small.0 != 0 {
            return small.0 as usize;
        }
    }

    // SAFETY: LoadIconW with a stock icon id only fails if the id is
    // unknown, which IDI_APPLICATION never is.
    unsafe {
        LoadIconW(None, IDI_APPLICATION)
            .map(|icon| icon.0 as usize)
            .unwrap_or(0)
    }
}
