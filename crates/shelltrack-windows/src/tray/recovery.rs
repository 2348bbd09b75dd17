//! Callback route recovery from the shell's toolbar memory.
//!
//! The shell never reports which window message an icon's sink window
//! expects for synthesized input. That routing lives only in the
//! toolbar button data inside explorer's address space, so it is
//! recovered by asking the toolbar for each button record through the
//! usual message protocol, with the record buffer allocated inside the
//! remote process and read back afterwards.

use std::collections::HashMap;
use std::ffi::c_void;

use shelltrack_core::{log_debug, log_warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, HWND, LPARAM, WPARAM};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RELEASE, PAGE_READWRITE, VirtualAllocEx, VirtualFreeEx,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_ALL_ACCESS};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowExW, FindWindowW, GetWindowThreadProcessId, SendMessageW,
};
use windows::core::w;

const WM_USER: u32 = 0x0400;
const TB_GETBUTTON: u32 = WM_USER + 23;
const TB_BUTTONCOUNT: u32 = WM_USER + 24;

/// Size of a TBBUTTON record in a 64-bit process. The 32-bit record
/// is smaller; reading the full width and decoding by layout covers
/// both.
const BUTTON_RECORD_SIZE: usize = 32;
const TRAY_DATA_SIZE: usize = 16;

/// Recovered routing for one icon sink window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackRoute {
    pub message: u32,
    pub param: i32,
}

/// Pointer width of the toolbar's owning process, selecting how its
/// button records are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ButtonLayout {
    Narrow,
    Wide,
}

impl ButtonLayout {
    fn native() -> Self {
        if size_of::<usize>() == 8 {
            Self::Wide
        } else {
            Self::Narrow
        }
    }
}

/// The (handle, uid, wparam, message) quad stored behind a button's
/// payload pointer, after layout normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TrayItemData {
    pub hwnd: i32,
    pub uid: i32,
    pub wparam: i32,
    pub msg: u32,
}

/// Walks both shell toolbars and builds the sink-handle to route map.
///
/// The map is rebuilt from scratch on every call because the shell may
/// recreate its buttons at any time. Failures per toolbar degrade to
/// an empty contribution rather than aborting the pass.
pub(super) fn recover_routes() -> HashMap<isize, CallbackRoute> {
    let mut routes = HashMap::new();
    for toolbar in [primary_toolbar(), overflow_toolbar()] {
        let Some(toolbar) = toolbar else { continue };
        routes.extend(read_toolbar(toolbar, ButtonLayout::native()));
    }
    routes
}

/// The visible tray's button strip:
/// Shell_TrayWnd > TrayNotifyWnd > SysPager > ToolbarWindow32.
fn primary_toolbar() -> Option<HWND> {
    // SAFETY: class-name window lookups with no other side effects.
    unsafe {
        let tray = FindWindowW(w!("Shell_TrayWnd"), None).ok()?;
        let notify = FindWindowExW(Some(tray), None, w!("TrayNotifyWnd"), None).ok()?;
        let pager = FindWindowExW(Some(notify), None, w!("SysPager"), None).ok()?;
        FindWindowExW(Some(pager), None, w!("ToolbarWindow32"), None).ok()
    }
}

/// The overflow flyout's button strip:
/// NotifyIconOverflowWindow > ToolbarWindow32.
fn overflow_toolbar() -> Option<HWND> {
    // SAFETY: class-name window lookups with no other side effects.
    unsafe {
        let overflow = FindWindowW(w!("NotifyIconOverflowWindow"), None).ok()?;
        FindWindowExW(Some(overflow), None, w!("ToolbarWindow32"), None).ok()
    }
}

/// Process handle closed on every exit path.
struct ProcessHandle(HANDLE);

impl ProcessHandle {
    fn open(pid: u32) -> Option<Self> {
        // SAFETY: OpenProcess has no preconditions; failure surfaces
        // as an error result.
        match unsafe { OpenProcess(PROCESS_ALL_ACCESS, false, pid) } {
            Ok(handle) => Some(Self(handle)),
            Err(e) => {
                log_warn!("opening shell process {pid} failed: {e}");
                None
            }
        }
    }

    /// Reads `buf.len()` bytes from the given remote address.
    fn read(&self, address: usize, buf: &mut [u8]) -> bool {
        let mut read = 0usize;
        // SAFETY: the local buffer outlives the call and its length
        // bounds the read.
        unsafe {
            ReadProcessMemory(
                self.0,
                address as *const c_void,
                buf.as_mut_ptr().cast(),
                buf.len(),
                Some(&mut read),
            )
        }
        .is_ok()
            && read == buf.len()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: we own the handle.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Remote allocation freed on every exit path.
struct RemoteBuffer<'a> {
    process: &'a ProcessHandle,
    address: *mut c_void,
}

impl<'a> RemoteBuffer<'a> {
    fn alloc(process: &'a ProcessHandle, size: usize) -> Option<Self> {
        // SAFETY: allocating in the remote process; a null return
        // means failure.
        let address =
            unsafe { VirtualAllocEx(process.0, None, size, MEM_COMMIT, PAGE_READWRITE) };
        if address.is_null() {
            return None;
        }
        Some(Self { process, address })
    }
}

impl Drop for RemoteBuffer<'_> {
    fn drop(&mut self) {
        // SAFETY: `address` came from VirtualAllocEx on this process.
        unsafe {
            let _ = VirtualFreeEx(self.process.0, self.address, 0, MEM_RELEASE);
        }
    }
}

/// Reads every button of one toolbar into a route map.
///
/// A payload pointer outside 32-bit range means the shell is in a
/// transiently inconsistent state; that yields an empty map for this
/// toolbar instead of an error.
fn read_toolbar(toolbar: HWND, layout: ButtonLayout) -> HashMap<isize, CallbackRoute> {
    // SAFETY: TB_BUTTONCOUNT takes no parameters.
    let count = unsafe { SendMessageW(toolbar, TB_BUTTONCOUNT, None, None) }.0;
    if count <= 0 {
        return HashMap::new();
    }

    let mut pid = 0u32;
    // SAFETY: writes the owning pid through the pointer.
    unsafe { GetWindowThreadProcessId(toolbar, Some(&mut pid)) };
    let Some(process) = (pid != 0).then(|| ProcessHandle::open(pid)).flatten() else {
        return HashMap::new();
    };

    let mut items = Vec::new();
    for index in 0..count {
        let Some(remote) = RemoteBuffer::alloc(&process, BUTTON_RECORD_SIZE) else {
            continue;
        };

        // The toolbar fills the remote buffer with one button record.
        // The return value is not trusted either way; a failed fill
        // shows up as an unreadable or zeroed record instead.
        // SAFETY: the remote buffer is at least BUTTON_RECORD_SIZE.
        unsafe {
            SendMessageW(
                toolbar,
                TB_GETBUTTON,
                Some(WPARAM(index as usize)),
                Some(LPARAM(remote.address as isize)),
            )
        };

        let mut raw = [0u8; BUTTON_RECORD_SIZE];
        if !process.read(remote.address as usize, &mut raw) {
            continue;
        }

        let payload = decode_button_payload(&raw, layout);
        let Some(address) = payload_address(payload) else {
            log_debug!("toolbar button payload out of range, skipping toolbar");
            return HashMap::new();
        };

        let mut item_raw = [0u8; TRAY_DATA_SIZE];
        if !process.read(address, &mut item_raw) {
            continue;
        }
        items.push(decode_tray_item(&item_raw, layout));
    }

    routes_from_items(items)
}

/// Extracts the payload pointer from a raw button record.
///
/// The wide layout stores it as eight bytes at offset 16; the narrow
/// layout as four bytes at offset 12.
pub(super) fn decode_button_payload(raw: &[u8; BUTTON_RECORD_SIZE], layout: ButtonLayout) -> u64 {
    match layout {
        ButtonLayout::Wide => u64::from_le_bytes([
            raw[16], raw[17], raw[18], raw[19], raw[20], raw[21], raw[22], raw[23],
        ]),
        ButtonLayout::Narrow => {
            u64::from(u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]))
        }
    }
}

/// Narrows the payload pointer to a usable address.
///
/// Values outside the signed 32-bit range are rejected; they have been
/// observed while the shell rebuilds its toolbars.
pub(super) fn payload_address(payload: u64) -> Option<usize> {
    let value = i32::try_from(payload as i64).ok()?;
    Some(value as isize as usize)
}

/// Decodes the remote tray data quad, correcting the narrow layout's
/// field order (the message lands in the wparam slot and the wparam in
/// the uid slot).
pub(super) fn decode_tray_item(raw: &[u8; TRAY_DATA_SIZE], layout: ButtonLayout) -> TrayItemData {
    let hwnd = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let uid = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    let wparam = i32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);
    let msg = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);

    match layout {
        ButtonLayout::Wide => TrayItemData {
            hwnd,
            uid,
            wparam,
            msg,
        },
        ButtonLayout::Narrow => TrayItemData {
            hwnd,
            uid,
            wparam: uid,
            msg: wparam as u32,
        },
    }
}

/// Normalizes a sink window handle into the map's key space.
///
/// Remote tray data stores handles as signed 32-bit values, so wider
/// handles are sign-extended from their low 32 bits to match.
pub(super) fn sink_key(handle: usize) -> isize {
    handle as i32 as isize
}

/// Folds decoded items into the route map. Later buttons overwrite
/// earlier ones carrying the same sink handle.
pub(super) fn routes_from_items(
    items: impl IntoIterator<Item = TrayItemData>,
) -> HashMap<isize, CallbackRoute> {
    let mut routes = HashMap::new();
    for item in items {
        routes.insert(
            sink_key(item.hwnd as usize),
            CallbackRoute {
                message: item.msg,
                param: item.wparam,
            },
        );
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button_record(narrow_payload: u32, wide_payload: u64) -> [u8; BUTTON_RECORD_SIZE] {
        let mut raw = [0u8; BUTTON_RECORD_SIZE];
        raw[12..16].copy_from_slice(&narrow_payload.to_le_bytes());
        raw[16..24].copy_from_slice(&wide_payload.to_le_bytes());
        raw
    }

    fn tray_data(hwnd: i32, uid: i32, wparam: i32, msg: u32) -> [u8; TRAY_DATA_SIZE] {
        let mut raw = [0u8; TRAY_DATA_SIZE];
        raw[0..4].copy_from_slice(&hwnd.to_le_bytes());
        raw[4..8].copy_from_slice(&uid.to_le_bytes());
        raw[8..12].copy_from_slice(&wparam.to_le_bytes());
        raw[12..16].copy_from_slice(&msg.to_le_bytes());
        raw
    }

    #[test]
    fn wide_layout_reads_payload_at_offset_sixteen() {
        // Arrange
        let raw = button_record(0xDEAD_BEEF, 0x1234_5678);

        // Act
        let payload = decode_button_payload(&raw, ButtonLayout::Wide);

        // Assert
        assert_eq!(payload, 0x1234_5678);
    }

    #[test]
    fn narrow_layout_reads_payload_at_offset_twelve() {
        // Arrange
        let raw = button_record(0xDEAD_BEEF, 0x1234_5678);

        // Act
        let payload = decode_button_payload(&raw, ButtonLayout::Narrow);

        // Assert
        assert_eq!(payload, 0xDEAD_BEEF);
    }

    #[test]
    fn payload_outside_signed_32_bit_range_is_rejected() {
        // Arrange / Act / Assert
        assert_eq!(payload_address(0x0001_0000_0000), None);
        assert_eq!(payload_address(i64::from(i32::MAX) as u64 + 1), None);
        assert!(payload_address(0x0040_0000).is_some());
    }

    #[test]
    fn wide_tray_data_keeps_field_order() {
        // Arrange
        let raw = tray_data(0x1010, 7, 42, 0x0401);

        // Act
        let item = decode_tray_item(&raw, ButtonLayout::Wide);

        // Assert
        assert_eq!(
            item,
            TrayItemData {
                hwnd: 0x1010,
                uid: 7,
                wparam: 42,
                msg: 0x0401,
            }
        );
    }

    #[test]
    fn narrow_tray_data_swaps_message_and_wparam() {
        // Arrange: in the narrow layout the message arrives in the
        // wparam slot and the wparam in the uid slot.
        let raw = tray_data(0x1010, 42, 0x0401, 0);

        // Act
        let item = decode_tray_item(&raw, ButtonLayout::Narrow);

        // Assert
        assert_eq!(item.hwnd, 0x1010);
        assert_eq!(item.msg, 0x0401);
        assert_eq!(item.wparam, 42);
    }

    #[test]
    fn sink_keys_sign_extend_from_the_low_32_bits() {
        // Arrange: a lookup handle with stray high bits must land on
        // the same key a decoded 32-bit hwnd produces.
        let item = TrayItemData {
            hwnd: -559038737, // 0xDEADBEEF as i32
            uid: 0,
            wparam: 1,
            msg: 0x0401,
        };

        // Act
        let routes = routes_from_items([item]);

        // Assert
        assert_eq!(sink_key(0xDEAD_BEEF_usize), -559038737isize);
        assert!(routes.contains_key(&sink_key(0xDEAD_BEEF_usize)));
    }

    #[test]
    fn duplicate_sink_handles_keep_the_later_button() {
        // Arrange
        let items = vec![
            TrayItemData {
                hwnd: 0x2020,
                uid: 1,
                wparam: 11,
                msg: 0x0401,
            },
            TrayItemData {
                hwnd: 0x2020,
                uid: 2,
                wparam: 22,
                msg: 0x0402,
            },
        ];

        // Act
        let routes = routes_from_items(items);

        // Assert
        assert_eq!(routes.len(), 1);
        assert_eq!(
            routes[&0x2020],
            CallbackRoute {
                message: 0x0402,
                param: 22,
            }
        );
    }

    #[test]
    fn recovery_over_fixed_items_is_deterministic() {
        // Arrange
        let items = vec![
            TrayItemData {
                hwnd: 0x1,
                uid: 0,
                wparam: 1,
                msg: 0x0401,
            },
            TrayItemData {
                hwnd: 0x2,
                uid: 0,
                wparam: 2,
                msg: 0x0402,
            },
        ];

        // Act
        let first = routes_from_items(items.clone());
        let second = routes_from_items(items);

        // Assert
        assert_eq!(first, second);
    }
}
