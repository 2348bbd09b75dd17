//! Synthesized input against an icon's message sink.
//!
//! An icon application receives clicks as its registered callback
//! message with the mouse message in the low word. Some receivers do
//! not return from SendMessage until a context menu closes, so every
//! simulation runs on its own thread to keep the caller responsive.

use std::thread;

use shelltrack_core::InvokeAction;
use windows::Win32::Foundation::{LPARAM, POINT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, SendMessageW, WM_LBUTTONDBLCLK, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE,
    WM_RBUTTONDOWN, WM_RBUTTONUP,
};

use crate::query::to_hwnd;

/// Simulates a mouse action on an icon's sink window using its
/// recovered routing. A zero callback message means no routing is
/// known and the request is dropped.
pub(super) fn simulate(
    window_handle: usize,
    callback_message: u32,
    callback_param: i32,
    action: InvokeAction,
) {
    if callback_message == 0 {
        return;
    }

    let mut cursor = POINT::default();
    // SAFETY: writes the cursor position through the pointer.
    if unsafe { GetCursorPos(&mut cursor) }.is_err() {
        return;
    }
    let packed_pos = (cursor.y << 16) | (cursor.x & 0xFFFF);

    // (down, up, trailing message, trailing wparam)
    let sequence = match action {
        InvokeAction::LeftClick => (
            Some(WM_LBUTTONDOWN),
            Some(WM_LBUTTONUP),
            0x400,
            callback_param,
        ),
        InvokeAction::RightClick => (
            Some(WM_RBUTTONDOWN),
            Some(WM_RBUTTONUP),
            (callback_param << 16) | 0x7B,
            packed_pos,
        ),
        InvokeAction::DoubleClick => (
            Some(WM_LBUTTONDBLCLK),
            None,
            WM_MOUSEMOVE as i32,
            callback_param,
        ),
        InvokeAction::MouseMove => (None, None, WM_MOUSEMOVE as i32, callback_param),
    };

    thread::spawn(move || {
        let hwnd = to_hwnd(window_handle);
        let (down, up, trailing, trailing_wparam) = sequence;

        // SAFETY: SendMessageW to an arbitrary window; a stale handle
        // fails harmlessly inside the call.
        unsafe {
            if let Some(down) = down {
                SendMessageW(
                    hwnd,
                    callback_message,
                    Some(WPARAM(callback_param as usize)),
                    Some(LPARAM(down as isize)),
                );
            }
            if let Some(up) = up {
                SendMessageW(
                    hwnd,
                    callback_message,
                    Some(WPARAM(callback_param as usize)),
                    Some(LPARAM(up as isize)),
                );
            }
            SendMessageW(
                hwnd,
                callback_message,
                Some(WPARAM(trailing_wparam as usize)),
                Some(LPARAM(trailing as isize)),
            );
        }
    });
}
