//! Platform-agnostic notification-area icon vocabulary.

/// Pin/visibility preference of a notification-area icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinStatus {
    /// Shown in the pinned area only while displaying a notification.
    WhenActive,
    /// Not pinned, only visible in the overflow flyout.
    NotPinned,
    /// Always visible on the taskbar.
    Pinned,
}

impl PinStatus {
    /// Maps the shell's numeric preference to a pin status.
    ///
    /// Unknown values map to `WhenActive`, the shell's own default.
    pub fn from_preference(value: u32) -> Self {
        match value {
            1 => Self::NotPinned,
            2 => Self::Pinned,
            _ => Self::WhenActive,
        }
    }
}

/// The action a shell icon notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconAction {
    Add,
    Modify,
    Delete,
    SetFocus,
    SetVersion,
}

impl IconAction {
    /// Maps the shell's numeric event code to an action.
    ///
    /// Returns `None` for codes outside the known range; callers drop
    /// those notifications.
    pub fn from_event(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Add),
            1 => Some(Self::Modify),
            2 => Some(Self::Delete),
            3 => Some(Self::SetFocus),
            4 => Some(Self::SetVersion),
            _ => None,
        }
    }
}

/// Input actions that can be synthesized against an icon's sink window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeAction {
    LeftClick,
    RightClick,
    DoubleClick,
    MouseMove,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_values_round_trip() {
        assert_eq!(PinStatus::from_preference(0), PinStatus::WhenActive);
        assert_eq!(PinStatus::from_preference(1), PinStatus::NotPinned);
        assert_eq!(PinStatus::from_preference(2), PinStatus::Pinned);
    }

    #[test]
    fn unknown_preference_defaults_to_when_active() {
        assert_eq!(PinStatus::from_preference(99), PinStatus::WhenActive);
    }

    #[test]
    fn known_event_codes_map_to_actions() {
        assert_eq!(IconAction::from_event(0), Some(IconAction::Add));
        assert_eq!(IconAction::from_event(2), Some(IconAction::Delete));
        assert_eq!(IconAction::from_event(4), Some(IconAction::SetVersion));
    }

    #[test]
    fn out_of_range_event_code_is_dropped() {
        assert_eq!(IconAction::from_event(5), None);
    }
}
