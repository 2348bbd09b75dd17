/// Window classification predicates.
pub mod classify;

/// Win32 window enumeration.
pub mod enumerate;

/// Raw WinEvent translation.
pub mod event;

/// WinEvent hook dispatcher.
pub mod hook;

/// Window icon extraction.
pub mod icon;

/// Known-folder path expansion.
pub mod path;

/// Win32 window property queries.
pub mod query;

/// Tracked desktop window collection.
pub mod tracking;

/// Tracked notification-area icon collection.
pub mod tray;

pub use event::{EventKind, ShellEvent};
pub use hook::{HookDispatcher, SubscriptionId};
pub use tracking::{TrackedWindow, WindowChange, WindowCollection};
pub use tray::{IconChange, IconCollection, TrackedIcon};
