// COM interface definitions for the shell's tray notification service.
//
// These undocumented interfaces are the single feed the shell offers
// for notification-area icon changes. The vtable layouts are defined
// manually to avoid an external proc-macro dependency, and the
// callback object is a hand-rolled COM implementation with an atomic
// reference count.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;

use shelltrack_core::{IconAction, log_debug};
use windows::Win32::Foundation::{E_NOINTERFACE, HWND, S_OK};
use windows::Win32::UI::WindowsAndMessaging::HICON;
use windows::core::{GUID, HRESULT, IUnknown, IUnknown_Vtbl, Interface, PWSTR};

use super::store::{IconNotification, IconRecord};

#[allow(non_upper_case_globals)]
pub(super) const CLSID_TrayNotify: GUID = GUID {
    data1: 0x25DE_AD04,
    data2: 0x1EAC,
    data3: 0x4911,
    data4: [0x9E, 0x3A, 0xAD, 0x0A, 0x4A, 0xB5, 0x60, 0xFD],
};

pub(super) const IID_TRAY_NOTIFY: GUID = GUID {
    data1: 0xD133_CE13,
    data2: 0x3537,
    data3: 0x48BA,
    data4: [0x93, 0xA7, 0xAF, 0xCD, 0x5D, 0x20, 0x53, 0xB4],
};

pub(super) const IID_NOTIFICATION_CB: GUID = GUID {
    data1: 0xD782_CCBA,
    data2: 0xAFB0,
    data3: 0x43F1,
    data4: [0x94, 0xDB, 0xFD, 0xA3, 0x77, 0x9E, 0xAC, 0xBB],
};

// NOTIFYITEM as the shell passes it to the callback. The shell owns
// the strings and the structure; everything must be copied before the
// callback returns.
#[repr(C)]
pub(super) struct NotifyItem {
    pub exe_name: PWSTR,
    pub tip: PWSTR,
    pub icon: HICON,
    pub hwnd: HWND,
    pub preference: u32,
    pub id: u32,
    pub guid: GUID,
}

// ITrayNotify {D133CE13-3537-48BA-93A7-AFCD5D2053B4}
#[repr(C)]
pub(super) struct ITrayNotifyVtbl {
    pub base: IUnknown_Vtbl,
    pub register_callback: unsafe extern "system" fn(
        this: *mut c_void,
        callback: *mut c_void,
        handle: *mut u64,
    ) -> HRESULT,
    pub unregister_callback:
        unsafe extern "system" fn(this: *mut c_void, handle: *const u64) -> HRESULT,
    pub set_preference:
        unsafe extern "system" fn(this: *mut c_void, item: *const NotifyItem) -> HRESULT,
}

// INotificationCb {D782CCBA-AFB0-43F1-94DB-FDA3779EACCB}
#[repr(C)]
struct NotificationCbVtbl {
    query_interface: unsafe extern "system" fn(
        this: *mut c_void,
        riid: *const GUID,
        out: *mut *mut c_void,
    ) -> HRESULT,
    add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    release: unsafe extern "system" fn(this: *mut c_void) -> u32,
    notify: unsafe extern "system" fn(
        this: *mut c_void,
        event: u32,
        item: *const NotifyItem,
    ) -> HRESULT,
}

static NOTIFICATION_CB_VTBL: NotificationCbVtbl = NotificationCbVtbl {
    query_interface: cb_query_interface,
    add_ref: cb_add_ref,
    release: cb_release,
    notify: cb_notify,
};

/// Hand-rolled COM object implementing the shell's notification
/// callback interface. Each delivered record is copied into an owned
/// [`IconNotification`] and sent over the channel.
#[repr(C)]
pub(super) struct NotificationCb {
    vtbl: *const NotificationCbVtbl,
    refs: AtomicU32,
    tx: Sender<IconNotification>,
}

impl NotificationCb {
    /// Allocates the callback with an initial reference held by the
    /// caller. Released via the COM `Release` method.
    pub(super) fn new(tx: Sender<IconNotification>) -> *mut c_void {
        let cb = Box::new(Self {
            vtbl: &NOTIFICATION_CB_VTBL,
            refs: AtomicU32::new(1),
            tx,
        });
        Box::into_raw(cb) as *mut c_void
    }
}

unsafe extern "system" fn cb_query_interface(
    this: *mut c_void,
    riid: *const GUID,
    out: *mut *mut c_void,
) -> HRESULT {
    // SAFETY: COM contract; riid and out are valid for the call.
    unsafe {
        if out.is_null() {
            return E_NOINTERFACE;
        }
        let riid = &*riid;
        if *riid == IUnknown::IID || *riid == IID_NOTIFICATION_CB {
            cb_add_ref(this);
            *out = this;
            S_OK
        } else {
            *out = std::ptr::null_mut();
            E_NOINTERFACE
        }
    }
}

unsafe extern "system" fn cb_add_ref(this: *mut c_void) -> u32 {
    // SAFETY: `this` was created by NotificationCb::new.
    let cb = unsafe { &*(this as *const NotificationCb) };
    cb.refs.fetch_add(1, Ordering::Relaxed) + 1
}

unsafe extern "system" fn cb_release(this: *mut c_void) -> u32 {
    // SAFETY: `this` was created by NotificationCb::new; the last
    // release reclaims the box.
    let remaining = {
        let cb = unsafe { &*(this as *const NotificationCb) };
        cb.refs.fetch_sub(1, Ordering::AcqRel) - 1
    };
    if remaining == 0 {
        unsafe { drop(Box::from_raw(this as *mut NotificationCb)) };
    }
    remaining
}

unsafe extern "system" fn cb_notify(
    this: *mut c_void,
    event: u32,
    item: *const NotifyItem,
) -> HRESULT {
    // SAFETY: the shell passes a valid NOTIFYITEM for the duration of
    // the call; everything is copied out before returning.
    unsafe {
        let Some(action) = IconAction::from_event(event) else {
            log_debug!("unknown tray notification event {event}");
            return S_OK;
        };
        if item.is_null() {
            return S_OK;
        }

        let cb = &*(this as *const NotificationCb);
        let item = &*item;
        let record = IconRecord {
            exe_path: wide_to_string(item.exe_name),
            tooltip: wide_to_string(item.tip),
            icon_handle: item.icon.0 as usize,
            window_handle: item.hwnd.0 as usize,
            preference: item.preference,
            id: item.id,
            guid: item.guid.to_u128(),
        };
        let _ = cb.tx.send(IconNotification { action, record });
    }
    S_OK
}

/// Copies a shell-owned wide string, tolerating null pointers.
///
/// # Safety
/// `value` must be null or point to a null-terminated wide string.
unsafe fn wide_to_string(value: PWSTR) -> String {
    if value.is_null() {
        return String::new();
    }
    // SAFETY: guaranteed null-terminated by the caller.
    unsafe { value.to_string() }.unwrap_or_default()
}
