//! Win32 property queries over raw window handle values.
//!
//! Handles are carried as `usize` so the rest of the crate (and its
//! consumers) never touch `HWND` directly. Query failures collapse to
//! empty/default values, never errors. A handle disappearing between
//! query and use is ordinary here, and the collections re-observe on
//! the next event or poll anyway.

use shelltrack_core::Rect;
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GW_OWNER, GetForegroundWindow, GetWindow, GetWindowPlacement, GetWindowTextLengthW,
    GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindow, IsWindowVisible,
    RealGetWindowClassW, SW_MINIMIZE, SW_RESTORE, SendMessageW, SetForegroundWindow, ShowWindow,
    WINDOWPLACEMENT, WM_CLOSE,
};
use windows::core::PWSTR;

/// Reconstructs an `HWND` from a raw handle value.
pub(crate) fn to_hwnd(handle: usize) -> HWND {
    HWND(handle as *mut _)
}

/// Returns the window title, or an empty string for untitled windows.
pub fn title(handle: usize) -> String {
    let hwnd = to_hwnd(handle);

    // SAFETY: GetWindowTextLengthW and GetWindowTextW are safe to call
    // with a valid HWND. They read window text without modifying state.
    unsafe {
        let length = GetWindowTextLengthW(hwnd);
        if length == 0 {
            return String::new();
        }

        // +1 for the null terminator that Windows requires
        let mut buffer = vec![0u16; (length + 1) as usize];
        let copied = GetWindowTextW(hwnd, &mut buffer);
        String::from_utf16_lossy(&buffer[..copied as usize])
    }
}

/// Returns the window class name.
pub fn class_name(handle: usize) -> String {
    // SAFETY: RealGetWindowClassW reads the window class name.
    // 256 is the maximum class name length in Win32.
    unsafe {
        let mut buffer = [0u16; 256];
        let length = RealGetWindowClassW(to_hwnd(handle), &mut buffer);
        String::from_utf16_lossy(&buffer[..length as usize])
    }
}

/// Whether the handle still resolves to a live window.
pub fn is_open(handle: usize) -> bool {
    // SAFETY: IsWindow is a simple query that returns a BOOL.
    unsafe { IsWindow(Some(to_hwnd(handle))).as_bool() }
}

/// Whether the window is visible on screen at all.
pub fn is_window_visible(handle: usize) -> bool {
    // SAFETY: IsWindowVisible is a simple query that returns a BOOL.
    unsafe { IsWindowVisible(to_hwnd(handle)).as_bool() }
}

/// Whether the window has an owner window.
pub fn is_owned(handle: usize) -> bool {
    // SAFETY: GetWindow with GW_OWNER reads the owner relationship.
    unsafe { GetWindow(to_hwnd(handle), GW_OWNER).is_ok() }
}

/// Returns the current foreground window's handle value.
pub fn foreground_window() -> usize {
    // SAFETY: GetForegroundWindow takes no arguments and returns an HWND.
    unsafe { GetForegroundWindow().0 as usize }
}

/// Whether the window currently holds foreground status.
pub fn is_active(handle: usize) -> bool {
    foreground_window() == handle
}

/// Returns (not minimized, restored rectangle) for the window.
///
/// The rectangle comes from the window placement's normal position,
/// which stays meaningful while the window is minimized or maximized.
/// Degenerate placements yield `None`.
pub fn placement(handle: usize) -> (bool, Option<Rect>) {
    let hwnd = to_hwnd(handle);

    // SAFETY: IsIconic is a simple query; GetWindowPlacement fills the
    // structure whose length field we set beforehand, as required.
    unsafe {
        let visible = !IsIconic(hwnd).as_bool();

        let mut wp = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        if GetWindowPlacement(hwnd, &mut wp).is_err() {
            return (visible, None);
        }

        let r = wp.rcNormalPosition;
        if r.right < r.left || r.bottom < r.top {
            return (visible, None);
        }

        (
            visible,
            Some(Rect::from_edges(r.left, r.top, r.right, r.bottom)),
        )
    }
}

/// Asks the window to close itself.
pub fn close(handle: usize) {
    // SAFETY: SendMessageW with WM_CLOSE is a plain message send.
    unsafe {
        SendMessageW(
            to_hwnd(handle),
            WM_CLOSE,
            Some(WPARAM(0)),
            Some(LPARAM(0)),
        );
    }
}

/// Brings the window to the foreground.
pub fn activate(handle: usize) {
    // SAFETY: SetForegroundWindow fails harmlessly when the caller is
    // not allowed to steal focus.
    unsafe {
        let _ = SetForegroundWindow(to_hwnd(handle));
    }
}

/// Minimizes the window.
pub fn minimize(handle: usize) {
    // SAFETY: ShowWindow on a stale handle fails harmlessly.
    unsafe {
        let _ = ShowWindow(to_hwnd(handle), SW_MINIMIZE);
    }
}

/// Restores a minimized or maximized window to its normal placement.
pub fn restore(handle: usize) {
    // SAFETY: ShowWindow on a stale handle fails harmlessly.
    unsafe {
        let _ = ShowWindow(to_hwnd(handle), SW_RESTORE);
    }
}

/// Returns the pid of the window's owning process, or `None`.
pub fn process_id(handle: usize) -> Option<u32> {
    let mut pid: u32 = 0;
    // SAFETY: GetWindowThreadProcessId writes the pid through the
    // provided pointer and returns the owning thread id.
    let thread = unsafe { GetWindowThreadProcessId(to_hwnd(handle), Some(&mut pid)) };
    if thread == 0 || pid == 0 {
        return None;
    }
    Some(pid)
}

/// Resolves the full executable path of the window's owning process.
pub fn process_path(handle: usize) -> Option<String> {
    let pid = process_id(handle)?;

    // SAFETY: OpenProcess with query-limited access is the least
    // privilege that still allows reading the image name. The handle
    // is closed on every path below.
    let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;

    let mut buffer = vec![0u16; 1024];
    let mut length = buffer.len() as u32;
    // SAFETY: QueryFullProcessImageNameW writes at most `length` wide
    // characters into the buffer and updates `length` with the count.
    let result = unsafe {
        QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut length,
        )
    };

    // SAFETY: We opened the handle above; close it unconditionally.
    unsafe {
        let _ = CloseHandle(process);
    }

    result.ok()?;
    Some(String::from_utf16_lossy(&buffer[..length as usize]))
}
