//! Live collection of tracked desktop windows.
//!
//! One owner thread serializes all mutation of the window lists. It is
//! fed by the hook dispatcher (through a bridge thread), a poll ticker,
//! per-window move/resize tickers, and the initial enumeration task.
//! Consumers read snapshots via request-reply messages and subscribe to
//! change events on their own channel.

mod store;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use shelltrack_core::config::PollConfig;
use shelltrack_core::{log_debug, log_warn};

use crate::classify;
use crate::enumerate;
use crate::event::{EventKind, ShellEvent};
use crate::hook::{HookDispatcher, SubscriptionId};
use crate::icon;
use crate::query;

use store::WindowStore;
pub use store::{Observation, TrackedWindow, WindowChange, WindowField};

/// Event kinds subscribed per tracked window rather than globally.
const SCOPED_KINDS: [EventKind; 4] = [
    EventKind::TitleChanged,
    EventKind::Reparented,
    EventKind::MoveSizeStart,
    EventKind::MoveSizeEnd,
];

enum WindowMsg {
    Seeded(Vec<TrackedWindow>),
    Event(ShellEvent),
    Poll,
    MoveTick(usize),
    Snapshot(Sender<(Vec<TrackedWindow>, Vec<TrackedWindow>)>),
    Active(Sender<Option<TrackedWindow>>),
    Subscribe(Sender<WindowChange>),
    Stop,
}

/// Handle to the window tracking collection.
pub struct WindowCollection {
    tx: Sender<WindowMsg>,
    poll_enabled: Arc<AtomicBool>,
    poll_interval_ms: Arc<AtomicU64>,
    owner: Option<thread::JoinHandle<()>>,
}

impl WindowCollection {
    /// Starts the collection: subscribes to the dispatcher, kicks off
    /// the asynchronous initial enumeration, and begins polling.
    pub fn start(dispatcher: &HookDispatcher, config: &PollConfig) -> Self {
        let (tx, rx) = mpsc::channel::<WindowMsg>();
        let (events_tx, events_rx) = mpsc::channel::<ShellEvent>();

        let global_subs = vec![
            dispatcher.subscribe(EventKind::Created, events_tx.clone()),
            dispatcher.subscribe(EventKind::Destroyed, events_tx.clone()),
            dispatcher.subscribe(EventKind::ForegroundChanged, events_tx.clone()),
        ];

        // Bridge dispatcher events into the owner channel.
        let bridge_tx = tx.clone();
        thread::spawn(move || {
            for event in events_rx {
                if bridge_tx.send(WindowMsg::Event(event)).is_err() {
                    break;
                }
            }
        });

        // Initial enumeration runs off-thread so construction never
        // blocks on the size of the desktop.
        let seed_tx = tx.clone();
        thread::spawn(move || {
            let handles = enumerate::enumerate_handles().unwrap_or_default();
            let windows = handles.into_iter().map(observe_window).collect();
            let _ = seed_tx.send(WindowMsg::Seeded(windows));
        });

        let poll_enabled = Arc::new(AtomicBool::new(config.enabled));
        let poll_interval_ms = Arc::new(AtomicU64::new(config.interval_ms));
        spawn_poll_ticker(tx.clone(), poll_enabled.clone(), poll_interval_ms.clone());

        let owner = {
            let mut owner = Owner {
                store: WindowStore::default(),
                dispatcher: dispatcher.clone(),
                events_tx,
                tx: tx.clone(),
                subscribers: Vec::new(),
                scoped: HashMap::new(),
                move_flags: HashMap::new(),
                move_interval_ms: config.moveresize_interval_ms,
                global_subs,
            };
            thread::spawn(move || owner.run(&rx))
        };

        Self {
            tx,
            poll_enabled,
            poll_interval_ms,
            owner: Some(owner),
        }
    }

    /// Returns the windows currently in the visible collection.
    pub fn snapshot(&self) -> Vec<TrackedWindow> {
        self.lists().0
    }

    /// Returns the hidden side list.
    pub fn hidden(&self) -> Vec<TrackedWindow> {
        self.lists().1
    }

    /// Looks up a tracked window by handle, in either list.
    pub fn find(&self, handle: usize) -> Option<TrackedWindow> {
        let (visible, hidden) = self.lists();
        visible
            .into_iter()
            .chain(hidden)
            .find(|w| w.handle == handle)
    }

    /// Returns the window currently holding active status, if tracked.
    pub fn active(&self) -> Option<TrackedWindow> {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(WindowMsg::Active(reply_tx)).is_err() {
            return None;
        }
        reply_rx.recv().ok().flatten()
    }

    /// Registers a change subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<WindowChange> {
        let (change_tx, change_rx) = mpsc::channel();
        let _ = self.tx.send(WindowMsg::Subscribe(change_tx));
        change_rx
    }

    /// Enables or disables the periodic reconciliation sweep.
    pub fn set_poll_enabled(&self, enabled: bool) {
        self.poll_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Changes the reconciliation sweep interval.
    pub fn set_poll_interval(&self, interval_ms: u64) {
        self.poll_interval_ms.store(interval_ms.max(50), Ordering::Relaxed);
    }

    /// Stops the owner thread and releases all hook subscriptions.
    pub fn stop(mut self) {
        let _ = self.tx.send(WindowMsg::Stop);
        if let Some(handle) = self.owner.take() {
            let _ = handle.join();
        }
    }

    fn lists(&self) -> (Vec<TrackedWindow>, Vec<TrackedWindow>) {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(WindowMsg::Snapshot(reply_tx)).is_err() {
            return (Vec::new(), Vec::new());
        }
        reply_rx.recv().unwrap_or_default()
    }
}

/// Queries the full current state of one window.
fn observe_window(handle: usize) -> TrackedWindow {
    let (_, rect) = query::placement(handle);
    TrackedWindow {
        handle,
        process_path: query::process_path(handle).unwrap_or_default(),
        title: query::title(handle),
        rect,
        is_open: query::is_open(handle),
        is_taskbar_visible: classify::is_visible_in_taskbar(handle),
        is_active: query::is_active(handle),
        icon: icon::icon_handle(handle),
        is_moving: false,
    }
}

/// Ticker for the periodic reconciliation sweep.
fn spawn_poll_ticker(
    tx: Sender<WindowMsg>,
    enabled: Arc<AtomicBool>,
    interval_ms: Arc<AtomicU64>,
) {
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_millis(interval_ms.load(Ordering::Relaxed)));
            if !enabled.load(Ordering::Relaxed) {
                continue;
            }
            if tx.send(WindowMsg::Poll).is_err() {
                break;
            }
        }
    });
}

struct Owner {
    store: WindowStore,
    dispatcher: HookDispatcher,
    events_tx: Sender<ShellEvent>,
    tx: Sender<WindowMsg>,
    subscribers: Vec<Sender<WindowChange>>,
    scoped: HashMap<usize, Vec<SubscriptionId>>,
    move_flags: HashMap<usize, Arc<AtomicBool>>,
    move_interval_ms: u64,
    global_subs: Vec<SubscriptionId>,
}

impl Owner {
    fn run(&mut self, rx: &Receiver<WindowMsg>) {
        while let Ok(msg) = rx.recv() {
            match msg {
                WindowMsg::Seeded(windows) => self.on_seeded(windows),
                WindowMsg::Event(event) => self.on_event(event),
                WindowMsg::Poll => self.on_poll(),
                WindowMsg::MoveTick(handle) => self.on_move_tick(handle),
                WindowMsg::Snapshot(reply) => {
                    let _ = reply
                        .send((self.store.visible().to_vec(), self.store.hidden().to_vec()));
                }
                WindowMsg::Active(reply) => {
                    let _ = reply.send(self.store.active().cloned());
                }
                WindowMsg::Subscribe(tx) => self.subscribers.push(tx),
                WindowMsg::Stop => break,
            }
        }

        for (_, flag) in self.move_flags.drain() {
            flag.store(false, Ordering::Relaxed);
        }
        for ids in std::mem::take(&mut self.scoped).into_values() {
            for id in ids {
                self.dispatcher.unsubscribe(id);
            }
        }
        for id in std::mem::take(&mut self.global_subs) {
            self.dispatcher.unsubscribe(id);
        }
    }

    fn on_seeded(&mut self, windows: Vec<TrackedWindow>) {
        log_debug!("seeding {} enumerated windows", windows.len());
        for window in windows {
            self.track(window);
        }
    }

    fn on_event(&mut self, event: ShellEvent) {
        let handle = event.handle;
        match event.kind {
            EventKind::Created => {
                if !self.store.contains(handle) && classify::is_desktop_window(handle) {
                    self.track(observe_window(handle));
                }
            }
            EventKind::Destroyed => {
                // Destroy events also fire for child objects carrying
                // the parent's handle, so only drop the window once the
                // handle no longer resolves to a live desktop window.
                if self.store.contains(handle) && !classify::is_desktop_window(handle) {
                    self.untrack(handle);
                }
            }
            EventKind::ForegroundChanged => {
                let changes = self.store.set_active(handle);
                self.publish_all(changes);
                // The active window resynchronizes its generic fields
                // on every foreground change, not just at poll time.
                if self.store.contains(handle) {
                    self.observe_and_publish(handle, &full_observation(handle));
                }
            }
            EventKind::TitleChanged => {
                let obs = Observation {
                    title: Some(query::title(handle)),
                    ..Default::default()
                };
                self.observe_and_publish(handle, &obs);
            }
            EventKind::Reparented => {
                let obs = Observation {
                    is_taskbar_visible: Some(classify::is_visible_in_taskbar(handle)),
                    ..Default::default()
                };
                self.observe_and_publish(handle, &obs);
            }
            EventKind::MoveSizeStart => self.on_move_start(handle),
            EventKind::MoveSizeEnd => self.on_move_end(handle),
        }
    }

    /// The reconciliation sweep re-checks every tracked window's
    /// taskbar visibility, open flag, and icon.
    fn on_poll(&mut self) {
        let handles: Vec<usize> = self
            .store
            .visible()
            .iter()
            .chain(self.store.hidden().iter())
            .map(|w| w.handle)
            .collect();

        for handle in handles {
            let obs = Observation {
                is_open: Some(query::is_open(handle)),
                is_taskbar_visible: Some(classify::is_visible_in_taskbar(handle)),
                icon: Some(icon::icon_handle(handle)),
                ..Default::default()
            };
            self.observe_and_publish(handle, &obs);
        }
    }

    fn on_move_start(&mut self, handle: usize) {
        if !self.store.contains(handle) {
            return;
        }
        if let Some(change) = self.store.set_moving(handle, true) {
            self.publish(change);
        }

        let flag = Arc::new(AtomicBool::new(true));
        self.move_flags.insert(handle, flag.clone());

        let tick_tx = self.tx.clone();
        let interval = Duration::from_millis(self.move_interval_ms);
        thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if tick_tx.send(WindowMsg::MoveTick(handle)).is_err() {
                    break;
                }
            }
        });
    }

    fn on_move_end(&mut self, handle: usize) {
        if let Some(flag) = self.move_flags.remove(&handle) {
            flag.store(false, Ordering::Relaxed);
        }

        // The cached rectangle stays stale during the operation and
        // becomes authoritative again here.
        let (_, rect) = query::placement(handle);
        let obs = Observation {
            rect: Some(rect),
            ..Default::default()
        };
        self.observe_and_publish(handle, &obs);

        if let Some(change) = self.store.set_moving(handle, false) {
            self.publish(change);
        }
    }

    /// The tight move/resize ticker only re-checks liveness; the
    /// rectangle is refreshed once at move end.
    fn on_move_tick(&mut self, handle: usize) {
        if !self.store.is_moving(handle) {
            return;
        }
        let obs = Observation {
            is_open: Some(query::is_open(handle)),
            ..Default::default()
        };
        self.observe_and_publish(handle, &obs);
    }

    fn track(&mut self, window: TrackedWindow) {
        let handle = window.handle;
        if self.store.contains(handle) {
            return;
        }

        let ids = SCOPED_KINDS
            .iter()
            .map(|&kind| {
                self.dispatcher
                    .subscribe_window(kind, handle, self.events_tx.clone())
            })
            .collect();
        self.scoped.insert(handle, ids);

        if let Some(change) = self.store.insert(window) {
            self.publish(change);
        }
    }

    fn untrack(&mut self, handle: usize) {
        if let Some(ids) = self.scoped.remove(&handle) {
            for id in ids {
                self.dispatcher.unsubscribe(id);
            }
        }
        if let Some(flag) = self.move_flags.remove(&handle) {
            flag.store(false, Ordering::Relaxed);
        }

        match self.store.remove(handle) {
            Some((window, true)) => self.publish(WindowChange::Removed(window)),
            Some((_, false)) => {}
            None => log_warn!("destroy for untracked window 0x{handle:X}"),
        }
    }

    fn observe_and_publish(&mut self, handle: usize, obs: &Observation) {
        let changes = self.store.observe(handle, obs);
        self.publish_all(changes);
    }

    fn publish_all(&mut self, changes: Vec<WindowChange>) {
        for change in changes {
            self.publish(change);
        }
    }

    fn publish(&mut self, change: WindowChange) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

/// Observation covering every mutable field at once.
fn full_observation(handle: usize) -> Observation {
    let (_, rect) = query::placement(handle);
    Observation {
        title: Some(query::title(handle)),
        rect: Some(rect),
        is_open: Some(query::is_open(handle)),
        is_taskbar_visible: Some(classify::is_visible_in_taskbar(handle)),
        icon: Some(icon::icon_handle(handle)),
    }
}
