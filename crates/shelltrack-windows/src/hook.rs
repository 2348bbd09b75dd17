//! System-wide WinEvent hook with subscriber fan-out.
//!
//! One OS-level hook covers the whole event range of interest. The raw
//! callback runs on a dedicated message pump thread and must return
//! quickly, so it only forwards the translated event into a channel.
//! A separate dispatch thread fans each event out to the registered
//! subscribers, so slow subscriber code never stalls OS delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use shelltrack_core::ShellResult;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, PostThreadMessageW, TranslateMessage,
    WINEVENT_OUTOFCONTEXT, WINEVENT_SKIPOWNPROCESS, WM_QUIT,
};

use crate::event::{self, EventKind, ShellEvent};

/// Minimum event code we listen for (EVENT_SYSTEM_FOREGROUND = 0x0003).
const EVENT_MIN: u32 = 0x0003;

/// Maximum event code we listen for (EVENT_OBJECT_PARENTCHANGE = 0x800F).
const EVENT_MAX: u32 = 0x800F;

// Thread-local sender for the WinEvent callback.
thread_local! {
    static EVENT_SENDER: std::cell::RefCell<Option<Sender<ShellEvent>>> =
        const { std::cell::RefCell::new(None) };
}

/// Token returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = (SubscriptionId, Sender<ShellEvent>);

/// Subscriber lists, global per event kind and scoped per (kind, handle).
#[derive(Default)]
struct Registry {
    global: HashMap<EventKind, Vec<Subscriber>>,
    scoped: HashMap<(EventKind, usize), Vec<Subscriber>>,
}

impl Registry {
    fn add_global(&mut self, kind: EventKind, sub: Subscriber) {
        self.global.entry(kind).or_default().push(sub);
    }

    fn add_scoped(&mut self, kind: EventKind, handle: usize, sub: Subscriber) {
        self.scoped.entry((kind, handle)).or_default().push(sub);
    }

    fn remove(&mut self, id: SubscriptionId) {
        for subs in self.global.values_mut() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
        for subs in self.scoped.values_mut() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
        self.scoped.retain(|_, subs| !subs.is_empty());
    }

    /// Forwards an event to every matching subscriber, in subscription
    /// order. Subscribers whose channel is gone are dropped.
    fn dispatch(&mut self, event: ShellEvent) {
        if let Some(subs) = self.global.get_mut(&event.kind) {
            subs.retain(|(_, tx)| tx.send(event).is_ok());
        }
        if let Some(subs) = self.scoped.get_mut(&(event.kind, event.handle)) {
            subs.retain(|(_, tx)| tx.send(event).is_ok());
        }
    }
}

struct Inner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    pump_thread_id: u32,
    pump: Mutex<Option<thread::JoinHandle<()>>>,
    dispatch: Mutex<Option<thread::JoinHandle<()>>>,
}

/// Owns the single OS-level hook and the subscriber registries.
///
/// Constructed once at process start and shared (by clone) with the
/// collections, so hook lifecycle and teardown stay explicit.
#[derive(Clone)]
pub struct HookDispatcher {
    inner: Arc<Inner>,
}

impl HookDispatcher {
    /// Registers the OS hook and starts the pump and dispatch threads.
    ///
    /// Fails if the hook cannot be registered.
    pub fn start() -> ShellResult<Self> {
        let (raw_tx, raw_rx) = mpsc::channel::<ShellEvent>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

        let pump = thread::spawn(move || {
            EVENT_SENDER.with(|cell| {
                *cell.borrow_mut() = Some(raw_tx);
            });

            let thread_id = unsafe { windows::Win32::System::Threading::GetCurrentThreadId() };

            // SAFETY: SetWinEventHook registers our callback for system-wide
            // window events. WINEVENT_OUTOFCONTEXT means the callback runs in
            // our process. WINEVENT_SKIPOWNPROCESS ignores our own windows.
            let hook = unsafe {
                SetWinEventHook(
                    EVENT_MIN,
                    EVENT_MAX,
                    None,
                    Some(win_event_proc),
                    0,
                    0,
                    WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
                )
            };

            if hook.is_invalid() {
                let _ = ready_tx.send(Err("Failed to set WinEvent hook".to_string()));
                return;
            }

            let _ = ready_tx.send(Ok(thread_id));

            run_message_pump();

            unsafe {
                let _ = UnhookWinEvent(hook);
            }
        });

        let pump_thread_id: u32 = ready_rx
            .recv()
            .map_err(|_| -> Box<dyn std::error::Error> {
                "hook pump thread exited unexpectedly".into()
            })?
            .map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;

        let inner = Arc::new(Inner {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
            pump_thread_id,
            pump: Mutex::new(Some(pump)),
            dispatch: Mutex::new(None),
        });

        let dispatch_inner = inner.clone();
        let dispatch = thread::spawn(move || {
            while let Ok(event) = raw_rx.recv() {
                if let Ok(mut registry) = dispatch_inner.registry.lock() {
                    registry.dispatch(event);
                }
            }
        });

        if let Ok(mut slot) = inner.dispatch.lock() {
            *slot = Some(dispatch);
        }

        Ok(Self { inner })
    }

    /// Subscribes to all windows' events of the given kind.
    pub fn subscribe(&self, kind: EventKind, tx: Sender<ShellEvent>) -> SubscriptionId {
        let id = self.next_id();
        if let Ok(mut registry) = self.inner.registry.lock() {
            registry.add_global(kind, (id, tx));
        }
        id
    }

    /// Subscribes to one window's events of the given kind.
    pub fn subscribe_window(
        &self,
        kind: EventKind,
        handle: usize,
        tx: Sender<ShellEvent>,
    ) -> SubscriptionId {
        let id = self.next_id();
        if let Ok(mut registry) = self.inner.registry.lock() {
            registry.add_scoped(kind, handle, (id, tx));
        }
        id
    }

    /// Removes a subscription. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut registry) = self.inner.registry.lock() {
            registry.remove(id);
        }
    }

    /// Signals the pump to stop and waits for both threads to finish.
    pub fn stop(&self) {
        unsafe {
            let _ = PostThreadMessageW(self.inner.pump_thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        if let Ok(mut slot) = self.inner.pump.lock()
            && let Some(handle) = slot.take()
        {
            let _ = handle.join();
        }
        if let Ok(mut slot) = self.inner.dispatch.lock()
            && let Some(handle) = slot.take()
        {
            let _ = handle.join();
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// The Win32 message pump. Blocks until WM_QUIT is received.
fn run_message_pump() {
    let mut msg = MSG::default();

    while unsafe { GetMessageW(&mut msg, None, 0, 0).as_bool() } {
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// The WinEvent callback.
unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    id_object: i32,
    _id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    if let Some(shell_event) = event::translate(event, hwnd, id_object) {
        EVENT_SENDER.with(|cell| {
            if let Some(sender) = cell.borrow().as_ref() {
                let _ = sender.send(shell_event);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, handle: usize) -> ShellEvent {
        ShellEvent { kind, handle }
    }

    #[test]
    fn global_subscriber_receives_matching_kind_only() {
        // Arrange
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::channel();
        registry.add_global(EventKind::Created, (SubscriptionId(1), tx));

        // Act
        registry.dispatch(event(EventKind::Created, 10));
        registry.dispatch(event(EventKind::Destroyed, 10));

        // Assert
        assert_eq!(rx.try_recv().unwrap().handle, 10);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn scoped_subscriber_receives_only_its_handle() {
        // Arrange
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::channel();
        registry.add_scoped(EventKind::TitleChanged, 42, (SubscriptionId(1), tx));

        // Act
        registry.dispatch(event(EventKind::TitleChanged, 7));
        registry.dispatch(event(EventKind::TitleChanged, 42));

        // Assert
        assert_eq!(rx.try_recv().unwrap().handle, 42);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        // Arrange
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId(3);
        registry.add_global(EventKind::Created, (id, tx));

        // Act
        registry.remove(id);
        registry.dispatch(event(EventKind::Created, 10));

        // Assert
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnected_subscribers_are_pruned() {
        // Arrange
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::channel();
        registry.add_global(EventKind::Created, (SubscriptionId(1), tx));
        drop(rx);

        // Act
        registry.dispatch(event(EventKind::Created, 10));

        // Assert
        assert!(registry.global[&EventKind::Created].is_empty());
    }

    #[test]
    fn subscription_order_is_preserved() {
        // Arrange
        let mut registry = Registry::default();
        let (tx1, rx1) = mpsc::channel();
        let (tx2, rx2) = mpsc::channel();
        registry.add_global(EventKind::Created, (SubscriptionId(1), tx1));
        registry.add_global(EventKind::Created, (SubscriptionId(2), tx2));

        // Act
        registry.dispatch(event(EventKind::Created, 1));
        registry.dispatch(event(EventKind::Created, 2));

        // Assert: both see emission order.
        assert_eq!(rx1.try_recv().unwrap().handle, 1);
        assert_eq!(rx1.try_recv().unwrap().handle, 2);
        assert_eq!(rx2.try_recv().unwrap().handle, 1);
        assert_eq!(rx2.try_recv().unwrap().handle, 2);
    }
}
