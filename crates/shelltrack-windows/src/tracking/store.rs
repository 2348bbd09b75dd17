//! Pure state machine for the tracked window lists.
//!
//! Windows live in one of two lists: the visible list (the collection
//! consumers see) and a hidden side list for windows whose taskbar
//! visibility is currently off. Flipping visibility moves a window
//! between lists without losing its identity or last observations.

use shelltrack_core::Rect;

/// Snapshot of one tracked top-level window.
///
/// Fields reflect the most recent observation, not necessarily the
/// OS's instantaneous value. Identity is the handle alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedWindow {
    pub handle: usize,
    pub process_path: String,
    pub title: String,
    pub rect: Option<Rect>,
    pub is_open: bool,
    pub is_taskbar_visible: bool,
    pub is_active: bool,
    pub icon: usize,
    pub is_moving: bool,
}

/// A mutable window attribute, named in change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowField {
    Title,
    Rect,
    IsOpen,
    Icon,
    Active,
    Moving,
}

/// Change notifications raised against the visible collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowChange {
    Added(TrackedWindow),
    Removed(TrackedWindow),
    Updated(TrackedWindow, WindowField),
}

/// A fresh observation of some subset of a window's mutable fields.
///
/// `None` means "not observed this time", so event-driven updates can
/// touch a single field without re-querying the rest.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub title: Option<String>,
    pub rect: Option<Option<Rect>>,
    pub is_open: Option<bool>,
    pub is_taskbar_visible: Option<bool>,
    pub icon: Option<usize>,
}

#[derive(Default)]
pub(super) struct WindowStore {
    visible: Vec<TrackedWindow>,
    hidden: Vec<TrackedWindow>,
    active: Option<usize>,
}

impl WindowStore {
    pub(super) fn visible(&self) -> &[TrackedWindow] {
        &self.visible
    }

    pub(super) fn hidden(&self) -> &[TrackedWindow] {
        &self.hidden
    }

    pub(super) fn find(&self, handle: usize) -> Option<&TrackedWindow> {
        self.visible
            .iter()
            .chain(self.hidden.iter())
            .find(|w| w.handle == handle)
    }

    pub(super) fn contains(&self, handle: usize) -> bool {
        self.find(handle).is_some()
    }

    pub(super) fn active(&self) -> Option<&TrackedWindow> {
        self.find(self.active?)
    }

    /// Inserts a new window into the list matching its visibility.
    ///
    /// Duplicate handles are ignored. Returns `Added` only when the
    /// window lands in the visible collection.
    pub(super) fn insert(&mut self, window: TrackedWindow) -> Option<WindowChange> {
        if self.contains(window.handle) {
            return None;
        }
        if window.is_taskbar_visible {
            self.visible.push(window.clone());
            Some(WindowChange::Added(window))
        } else {
            self.hidden.push(window);
            None
        }
    }

    /// Removes a window from whichever list holds it.
    ///
    /// Returns the removed entity and whether it was in the visible
    /// collection (meaning consumers must see a `Removed`).
    pub(super) fn remove(&mut self, handle: usize) -> Option<(TrackedWindow, bool)> {
        if let Some(pos) = self.visible.iter().position(|w| w.handle == handle) {
            return Some((self.visible.remove(pos), true));
        }
        if let Some(pos) = self.hidden.iter().position(|w| w.handle == handle) {
            return Some((self.hidden.remove(pos), false));
        }
        None
    }

    /// Applies an observation, raising a change per field that actually
    /// differs. A taskbar-visibility flip moves the window between the
    /// visible and hidden lists and surfaces as `Added`/`Removed`.
    pub(super) fn observe(&mut self, handle: usize, obs: &Observation) -> Vec<WindowChange> {
        let mut changes = Vec::new();

        let Some(window) = self
            .visible
            .iter_mut()
            .chain(self.hidden.iter_mut())
            .find(|w| w.handle == handle)
        else {
            return changes;
        };

        if let Some(ref title) = obs.title
            && *title != window.title
        {
            window.title = title.clone();
            changes.push(WindowChange::Updated(window.clone(), WindowField::Title));
        }
        if let Some(rect) = obs.rect
            && rect != window.rect
        {
            window.rect = rect;
            changes.push(WindowChange::Updated(window.clone(), WindowField::Rect));
        }
        if let Some(is_open) = obs.is_open
            && is_open != window.is_open
        {
            window.is_open = is_open;
            changes.push(WindowChange::Updated(window.clone(), WindowField::IsOpen));
        }
        if let Some(icon) = obs.icon
            && icon != window.icon
        {
            window.icon = icon;
            changes.push(WindowChange::Updated(window.clone(), WindowField::Icon));
        }

        if let Some(taskbar) = obs.is_taskbar_visible
            && taskbar != window.is_taskbar_visible
        {
            window.is_taskbar_visible = taskbar;
            let moved = window.clone();
            if taskbar {
                self.hidden.retain(|w| w.handle != handle);
                self.visible.push(moved.clone());
                changes.push(WindowChange::Added(moved));
            } else {
                self.visible.retain(|w| w.handle != handle);
                self.hidden.push(moved.clone());
                changes.push(WindowChange::Removed(moved));
            }
        }

        changes
    }

    /// Transfers active status to the given handle.
    ///
    /// The previous holder (if tracked) and the new one each raise an
    /// `Active` field change. At most one window holds the status.
    pub(super) fn set_active(&mut self, handle: usize) -> Vec<WindowChange> {
        let mut changes = Vec::new();

        if self.active == Some(handle) {
            return changes;
        }

        if let Some(previous) = self.active
            && let Some(window) = self.find_mut(previous)
            && window.is_active
        {
            window.is_active = false;
            changes.push(WindowChange::Updated(window.clone(), WindowField::Active));
        }

        self.active = Some(handle);

        if let Some(window) = self.find_mut(handle) {
            window.is_active = true;
            changes.push(WindowChange::Updated(window.clone(), WindowField::Active));
        }

        changes
    }

    /// Flips the transient moving/resizing flag.
    pub(super) fn set_moving(&mut self, handle: usize, moving: bool) -> Option<WindowChange> {
        let window = self.find_mut(handle)?;
        if window.is_moving == moving {
            return None;
        }
        window.is_moving = moving;
        Some(WindowChange::Updated(window.clone(), WindowField::Moving))
    }

    pub(super) fn is_moving(&self, handle: usize) -> bool {
        self.find(handle).is_some_and(|w| w.is_moving)
    }

    fn find_mut(&mut self, handle: usize) -> Option<&mut TrackedWindow> {
        self.visible
            .iter_mut()
            .chain(self.hidden.iter_mut())
            .find(|w| w.handle == handle)
    }
}
