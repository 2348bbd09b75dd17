//! Live collection of notification-area icons.
//!
//! The shell's notification service is the only feed; registering with
//! it replays every existing icon, which populates the collection.
//! One owner thread serializes all mutation, resolves known-folder
//! tokens in reported paths, and runs callback route recovery on every
//! add and modify.

mod com;
mod invoke;
mod notifier;
mod recovery;
mod store;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use shelltrack_core::{IconAction, InvokeAction, ShellResult, log_debug};

use crate::path;

use notifier::IconNotifier;
pub use recovery::CallbackRoute;
use store::IconStore;
pub use store::{IconChange, IconNotification, IconRecord, TrackedIcon};

enum IconMsg {
    Notification(IconNotification),
    Snapshot(Sender<Vec<TrackedIcon>>),
    Subscribe(Sender<IconChange>),
    Invoke(String, InvokeAction),
    Stop,
}

/// Handle to the tray icon collection.
pub struct IconCollection {
    tx: Sender<IconMsg>,
    notifier: IconNotifier,
    owner: Option<thread::JoinHandle<()>>,
}

impl IconCollection {
    /// Registers with the shell and starts tracking icons.
    ///
    /// Fails when the shell's notification service cannot be reached;
    /// the collection has no degraded mode without its feed.
    pub fn start() -> ShellResult<Self> {
        let (notif_tx, notif_rx) = mpsc::channel::<IconNotification>();
        let notifier = IconNotifier::start(notif_tx)?;

        let (tx, rx) = mpsc::channel::<IconMsg>();

        // Bridge shell notifications into the owner channel.
        let bridge_tx = tx.clone();
        thread::spawn(move || {
            for notification in notif_rx {
                if bridge_tx.send(IconMsg::Notification(notification)).is_err() {
                    break;
                }
            }
        });

        let owner = thread::spawn(move || {
            let mut owner = Owner {
                store: IconStore::default(),
                subscribers: Vec::new(),
            };
            owner.run(&rx);
        });

        Ok(Self {
            tx,
            notifier,
            owner: Some(owner),
        })
    }

    /// Returns the icons currently tracked.
    pub fn snapshot(&self) -> Vec<TrackedIcon> {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(IconMsg::Snapshot(reply_tx)).is_err() {
            return Vec::new();
        }
        reply_rx.recv().unwrap_or_default()
    }

    /// Looks up an icon by its resolved executable path.
    pub fn find(&self, path: &str) -> Option<TrackedIcon> {
        let path = path.to_string();
        self.snapshot().into_iter().find(|i| i.path == path)
    }

    /// Registers a change subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<IconChange> {
        let (change_tx, change_rx) = mpsc::channel();
        let _ = self.tx.send(IconMsg::Subscribe(change_tx));
        change_rx
    }

    /// Simulates a mouse action on the icon with the given resolved
    /// path, using its recovered callback routing.
    pub fn invoke(&self, path: &str, action: InvokeAction) {
        let _ = self.tx.send(IconMsg::Invoke(path.to_string(), action));
    }

    /// Unregisters from the shell and stops the owner thread.
    pub fn stop(mut self) {
        self.notifier.stop();
        let _ = self.tx.send(IconMsg::Stop);
        if let Some(handle) = self.owner.take() {
            let _ = handle.join();
        }
    }
}

struct Owner {
    store: IconStore,
    subscribers: Vec<Sender<IconChange>>,
}

impl Owner {
    fn run(&mut self, rx: &Receiver<IconMsg>) {
        while let Ok(msg) = rx.recv() {
            match msg {
                IconMsg::Notification(notification) => self.on_notification(notification),
                IconMsg::Snapshot(reply) => {
                    let _ = reply.send(self.store.icons().to_vec());
                }
                IconMsg::Subscribe(tx) => self.subscribers.push(tx),
                IconMsg::Invoke(path, action) => {
                    if let Some(icon) = self.store.find(&path) {
                        invoke::simulate(
                            icon.window_handle,
                            icon.callback_message,
                            icon.callback_param,
                            action,
                        );
                    }
                }
                IconMsg::Stop => break,
            }
        }
    }

    fn on_notification(&mut self, notification: IconNotification) {
        let IconNotification { action, record } = notification;
        let path = path::expand_known_folders(&record.exe_path);

        // Routing lives in the shell's toolbar memory and may change
        // on any add or modify, so the map is rebuilt fresh each time.
        let route = match action {
            IconAction::Add | IconAction::Modify => {
                let routes = recovery::recover_routes();
                routes
                    .get(&recovery::sink_key(record.window_handle))
                    .map(|r| (r.message, r.param))
            }
            _ => None,
        };

        log_debug!("tray {action:?} for {path}");
        if let Some(change) = self.store.apply(action, &path, &record, route) {
            self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        }
    }
}
