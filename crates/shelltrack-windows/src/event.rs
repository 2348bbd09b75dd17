use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    EVENT_OBJECT_CREATE, EVENT_OBJECT_DESTROY, EVENT_OBJECT_NAMECHANGE, EVENT_OBJECT_PARENTCHANGE,
    EVENT_SYSTEM_FOREGROUND, EVENT_SYSTEM_MOVESIZEEND, EVENT_SYSTEM_MOVESIZESTART,
};

/// Object ID indicating the event applies to the window itself,
/// not a child element like a scrollbar or menu item.
const OBJID_WINDOW: i32 = 0;

/// The kinds of shell events the dispatcher fans out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Destroyed,
    ForegroundChanged,
    TitleChanged,
    Reparented,
    MoveSizeStart,
    MoveSizeEnd,
}

/// A translated window event, carrying the raw handle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellEvent {
    pub kind: EventKind,
    pub handle: usize,
}

/// Translates a raw Win32 event into a [`ShellEvent`].
///
/// Returns `None` for events we don't care about (e.g. child object
/// events, or event types outside the tracked set).
pub fn translate(event: u32, hwnd: HWND, id_object: i32) -> Option<ShellEvent> {
    // Ignore events on child objects (scrollbars, buttons, etc.).
    // We only care about top-level window events.
    if id_object != OBJID_WINDOW {
        return None;
    }

    let handle = hwnd.0 as usize;

    let kind = match event {
        e if e == EVENT_OBJECT_CREATE => EventKind::Created,
        e if e == EVENT_OBJECT_DESTROY => EventKind::Destroyed,
        e if e == EVENT_SYSTEM_FOREGROUND => EventKind::ForegroundChanged,
        e if e == EVENT_OBJECT_NAMECHANGE => EventKind::TitleChanged,
        e if e == EVENT_OBJECT_PARENTCHANGE => EventKind::Reparented,
        e if e == EVENT_SYSTEM_MOVESIZESTART => EventKind::MoveSizeStart,
        e if e == EVENT_SYSTEM_MOVESIZEEND => EventKind::MoveSizeEnd,
        _ => return None,
    };

    Some(ShellEvent { kind, handle })
}
