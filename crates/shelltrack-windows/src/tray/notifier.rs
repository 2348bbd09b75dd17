//! Registration with the shell's tray notification service.
//!
//! The service requires a single-threaded apartment and delivers its
//! callbacks on the registering thread, so registration, the message
//! pump, and unregistration all live on one dedicated thread. The
//! shell replays every existing icon as an add right after
//! registration, which doubles as initial population.

use std::ffi::c_void;
use std::sync::mpsc::{self, Sender};
use std::thread;

use shelltrack_core::{ShellResult, log_debug};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Com::{
    CLSCTX_LOCAL_SERVER, COINIT_APARTMENTTHREADED, CoCreateInstance, CoInitializeEx,
    CoUninitialize,
};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, PostThreadMessageW, TranslateMessage, WM_QUIT,
};
use windows::core::{IUnknown, IUnknown_Vtbl, Interface};

use super::com::{
    CLSID_TrayNotify, ITrayNotifyVtbl, IID_TRAY_NOTIFY, NotificationCb,
};
use super::store::IconNotification;

/// Owns the registration thread for the shell's icon feed.
pub(super) struct IconNotifier {
    thread_id: u32,
    thread: Option<thread::JoinHandle<()>>,
}

impl IconNotifier {
    /// Registers with the shell and starts delivering notifications to
    /// `tx`. Fails synchronously when the service is unavailable or
    /// refuses the callback; a tray collection without a feed is
    /// meaningless, so there is no degraded mode.
    pub(super) fn start(tx: Sender<IconNotification>) -> ShellResult<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

        let thread = thread::spawn(move || run(&tx, &ready_tx));

        let thread_id = ready_rx
            .recv()
            .map_err(|_| "tray notifier thread exited before signaling readiness")??;

        Ok(Self {
            thread_id,
            thread: Some(thread),
        })
    }

    /// Posts a quit to the registration thread and waits for it to
    /// unregister and release the service.
    pub(super) fn stop(&mut self) {
        // SAFETY: posting WM_QUIT to a thread id is always safe; it
        // fails harmlessly if the thread is gone.
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Calls Release on a raw COM pointer.
///
/// # Safety
/// `ptr` must be a valid COM object pointer.
unsafe fn release(ptr: *mut c_void) {
    let vtbl = unsafe { &*(*(ptr as *const *const IUnknown_Vtbl)) };
    unsafe { (vtbl.Release)(ptr) };
}

fn run(tx: &Sender<IconNotification>, ready_tx: &Sender<Result<u32, String>>) {
    // SAFETY: the apartment is initialized and uninitialized on this
    // thread only, bracketing all COM use between them.
    unsafe {
        if let Err(e) = CoInitializeEx(None, COINIT_APARTMENTTHREADED).ok() {
            let _ = ready_tx.send(Err(format!("CoInitializeEx failed: {e}")));
            return;
        }

        match register(tx.clone()) {
            Ok((tray_ptr, cb_ptr, registration)) => {
                let _ = ready_tx.send(Ok(GetCurrentThreadId()));
                pump_messages();
                unregister(tray_ptr, registration);
                release(tray_ptr);
                release(cb_ptr);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        }

        CoUninitialize();
    }
}

/// Creates the tray notification service and registers the callback.
///
/// Returns the raw service pointer, the callback pointer, and the
/// registration handle needed to unregister later.
///
/// # Safety
/// Must run on a COM-initialized STA thread.
unsafe fn register(
    tx: Sender<IconNotification>,
) -> Result<(*mut c_void, *mut c_void, u64), String> {
    // Get IUnknown for the TrayNotify coclass hosted by the shell.
    let unk: IUnknown =
        unsafe { CoCreateInstance(&CLSID_TrayNotify, None, CLSCTX_LOCAL_SERVER) }
            .map_err(|e| format!("creating tray notification service failed: {e}"))?;

    // QueryInterface for ITrayNotify.
    let unk_ptr = unk.as_raw();
    let unk_vtbl = unsafe { &*(*(unk_ptr as *const *const IUnknown_Vtbl)) };
    let mut tray_ptr: *mut c_void = std::ptr::null_mut();
    let hr = unsafe { (unk_vtbl.QueryInterface)(unk_ptr, &IID_TRAY_NOTIFY, &mut tray_ptr) };
    if hr.is_err() || tray_ptr.is_null() {
        return Err(format!("QI for tray notification interface failed: {hr:?}"));
    }

    let cb_ptr = NotificationCb::new(tx);
    let tray_vtbl = unsafe { &*(*(tray_ptr as *const *const ITrayNotifyVtbl)) };
    let mut registration: u64 = 0;
    let hr = unsafe { (tray_vtbl.register_callback)(tray_ptr, cb_ptr, &mut registration) };
    if hr.is_err() {
        unsafe {
            release(cb_ptr);
            release(tray_ptr);
        }
        return Err(format!("registering tray callback failed: {hr:?}"));
    }

    log_debug!("tray callback registered (handle {registration})");
    Ok((tray_ptr, cb_ptr, registration))
}

/// # Safety
/// `tray_ptr` must be the service pointer returned by `register`.
unsafe fn unregister(tray_ptr: *mut c_void, registration: u64) {
    let tray_vtbl = unsafe { &*(*(tray_ptr as *const *const ITrayNotifyVtbl)) };
    let hr = unsafe { (tray_vtbl.unregister_callback)(tray_ptr, &registration) };
    if hr.is_err() {
        log_debug!("unregistering tray callback failed: {hr:?}");
    }
}

fn pump_messages() {
    let mut msg = MSG::default();
    // SAFETY: standard message pump; GetMessageW returns 0 on WM_QUIT
    // and -1 on failure, both of which end the loop.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}
