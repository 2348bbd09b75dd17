//! Pure state machine for the tracked tray icon list.
//!
//! Icons are keyed by resolved executable path because delete
//! notifications carry no sink window handle. The store only sees
//! paths that already went through known-folder expansion.

use shelltrack_core::{IconAction, PinStatus};

/// Owned copy of one shell icon notification record.
///
/// Strings and handles are copied out of the shell-owned structure
/// before it is returned, so the record can cross threads freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconRecord {
    /// Executable path as reported, possibly containing known-folder
    /// GUID tokens.
    pub exe_path: String,
    pub tooltip: String,
    pub icon_handle: usize,
    /// Window handle of the icon's message sink. Zero on malformed
    /// adds and on deletes.
    pub window_handle: usize,
    pub preference: u32,
    pub id: u32,
    pub guid: u128,
}

/// One notification as delivered by the shell, already classified.
#[derive(Debug, Clone)]
pub struct IconNotification {
    pub action: IconAction,
    pub record: IconRecord,
}

/// Snapshot of one tracked notification-area icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedIcon {
    /// Resolved executable path. Identity key within the collection.
    pub path: String,
    pub window_handle: usize,
    pub id: u32,
    pub guid: u128,
    pub tooltip: String,
    pub icon_handle: usize,
    pub pin: PinStatus,
    /// Recovered callback message number. Zero means no known routing.
    pub callback_message: u32,
    pub callback_param: i32,
}

/// Change notifications raised against the icon collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconChange {
    Added(TrackedIcon),
    Removed(TrackedIcon),
    Updated(TrackedIcon),
}

#[derive(Default)]
pub(super) struct IconStore {
    icons: Vec<TrackedIcon>,
}

impl IconStore {
    pub(super) fn icons(&self) -> &[TrackedIcon] {
        &self.icons
    }

    pub(super) fn find(&self, path: &str) -> Option<&TrackedIcon> {
        self.icons.iter().find(|i| i.path == path)
    }

    /// Applies one notification whose path has already been resolved.
    ///
    /// `route` is the recovered (message, parameter) pair for the
    /// icon's sink handle, when a recovery pass found one. Returns the
    /// change to publish, or `None` when the notification had no
    /// observable effect.
    pub(super) fn apply(
        &mut self,
        action: IconAction,
        path: &str,
        record: &IconRecord,
        route: Option<(u32, i32)>,
    ) -> Option<IconChange> {
        match action {
            IconAction::Add => self.add(path, record, route),
            IconAction::Modify | IconAction::SetFocus | IconAction::SetVersion => {
                self.update(path, record, route)
            }
            IconAction::Delete => self.delete(path),
        }
    }

    fn add(
        &mut self,
        path: &str,
        record: &IconRecord,
        route: Option<(u32, i32)>,
    ) -> Option<IconChange> {
        // Adds without a sink handle are malformed and skipped.
        if record.window_handle == 0 {
            return None;
        }
        // A second add for a known path refreshes in place; identity
        // keys stay unique.
        if self.find(path).is_some() {
            return self.update(path, record, route);
        }

        let (callback_message, callback_param) = route.unwrap_or((0, 0));
        let icon = TrackedIcon {
            path: path.to_string(),
            window_handle: record.window_handle,
            id: record.id,
            guid: record.guid,
            tooltip: record.tooltip.clone(),
            icon_handle: record.icon_handle,
            pin: PinStatus::from_preference(record.preference),
            callback_message,
            callback_param,
        };
        self.icons.push(icon.clone());
        Some(IconChange::Added(icon))
    }

    /// Refreshes an existing icon's mutable fields. Updates for paths
    /// never seen are dropped since initial population can race with
    /// live events.
    fn update(
        &mut self,
        path: &str,
        record: &IconRecord,
        route: Option<(u32, i32)>,
    ) -> Option<IconChange> {
        let icon = self.icons.iter_mut().find(|i| i.path == path)?;
        let mut changed = false;

        if record.window_handle != 0 && record.window_handle != icon.window_handle {
            icon.window_handle = record.window_handle;
            changed = true;
        }
        if record.tooltip != icon.tooltip {
            icon.tooltip = record.tooltip.clone();
            changed = true;
        }
        // The bitmap is only re-extracted when the underlying resource
        // handle actually changed.
        if record.icon_handle != icon.icon_handle {
            icon.icon_handle = record.icon_handle;
            changed = true;
        }
        let pin = PinStatus::from_preference(record.preference);
        if pin != icon.pin {
            icon.pin = pin;
            changed = true;
        }
        if record.id != icon.id {
            icon.id = record.id;
            changed = true;
        }
        if record.guid != icon.guid {
            icon.guid = record.guid;
            changed = true;
        }
        if let Some((message, param)) = route
            && (message, param) != (icon.callback_message, icon.callback_param)
        {
            icon.callback_message = message;
            icon.callback_param = param;
            changed = true;
        }

        if changed {
            Some(IconChange::Updated(icon.clone()))
        } else {
            None
        }
    }

    /// Removes the icon matching the path. Deletes for untracked paths
    /// are expected (duplicate or late notifications) and ignored.
    fn delete(&mut self, path: &str) -> Option<IconChange> {
        let pos = self.icons.iter().position(|i| i.path == path)?;
        Some(IconChange::Removed(self.icons.remove(pos)))
    }
}
