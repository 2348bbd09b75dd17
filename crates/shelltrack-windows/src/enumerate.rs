use shelltrack_core::ShellResult;

use windows::Win32::Foundation::{HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::EnumWindows;
use windows::core::BOOL;

use crate::classify;

/// Enumerates the handles of all current desktop-relevant windows.
///
/// This calls the Win32 `EnumWindows` API, which iterates over every top-level
/// window and invokes a callback for each one. We filter inside the callback
/// to keep only windows that pass the desktop-window classifier.
pub fn enumerate_handles() -> ShellResult<Vec<usize>> {
    let mut handles: Vec<usize> = Vec::new();

    // SAFETY: EnumWindows calls our callback for each top-level window.
    // We pass a pointer to our Vec as LPARAM (user data). The callback
    // casts it back to &mut Vec<usize> to collect results. This is safe
    // because EnumWindows runs synchronously — the Vec outlives the call.
    unsafe {
        EnumWindows(
            Some(enum_window_callback),
            LPARAM(&mut handles as *mut _ as isize),
        )?;
    }

    Ok(handles)
}

/// Callback invoked by `EnumWindows` for each top-level window.
///
/// Returns `TRUE` to continue enumeration, `FALSE` to stop.
unsafe extern "system" fn enum_window_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is a pointer to our Vec<usize>, cast from enumerate_handles().
    let handles = unsafe { &mut *(lparam.0 as *mut Vec<usize>) };

    let handle = hwnd.0 as usize;
    if classify::is_desktop_window(handle) {
        handles.push(handle);
    }

    BOOL(1) // TRUE — continue enumerating
}
