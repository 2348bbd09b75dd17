use super::store::WindowStore;
use super::{Observation, TrackedWindow, WindowChange, WindowField};
use shelltrack_core::Rect;

fn window(handle: usize, taskbar_visible: bool) -> TrackedWindow {
    TrackedWindow {
        handle,
        process_path: format!("C:\\Apps\\app{handle}.exe"),
        title: format!("Window {handle}"),
        rect: Some(Rect::new(10, 20, 640, 480)),
        is_open: true,
        is_taskbar_visible: taskbar_visible,
        is_active: false,
        icon: 0x100 + handle,
        is_moving: false,
    }
}

#[test]
fn insert_visible_window_raises_added() {
    // Arrange
    let mut store = WindowStore::default();

    // Act
    let change = store.insert(window(1, true));

    // Assert
    assert!(matches!(change, Some(WindowChange::Added(w)) if w.handle == 1));
    assert_eq!(store.visible().len(), 1);
    assert!(store.hidden().is_empty());
}

#[test]
fn insert_hidden_window_is_silent() {
    // Arrange
    let mut store = WindowStore::default();

    // Act
    let change = store.insert(window(1, false));

    // Assert
    assert!(change.is_none());
    assert!(store.visible().is_empty());
    assert_eq!(store.hidden().len(), 1);
}

#[test]
fn duplicate_handle_is_ignored() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));

    // Act
    let change = store.insert(window(1, true));

    // Assert
    assert!(change.is_none());
    assert_eq!(store.visible().len(), 1);
}

#[test]
fn observation_without_differences_raises_nothing() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    let obs = Observation {
        title: Some("Window 1".to_string()),
        is_open: Some(true),
        icon: Some(0x101),
        ..Default::default()
    };

    // Act
    let changes = store.observe(1, &obs);

    // Assert
    assert!(changes.is_empty());
}

#[test]
fn title_change_raises_single_field_update() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    let obs = Observation {
        title: Some("Renamed".to_string()),
        ..Default::default()
    };

    // Act
    let changes = store.observe(1, &obs);

    // Assert
    assert_eq!(changes.len(), 1);
    assert!(matches!(
        &changes[0],
        WindowChange::Updated(w, WindowField::Title) if w.title == "Renamed"
    ));
}

#[test]
fn icon_update_requires_different_handle() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));

    // Act
    let same = store.observe(
        1,
        &Observation {
            icon: Some(0x101),
            ..Default::default()
        },
    );
    let different = store.observe(
        1,
        &Observation {
            icon: Some(0x999),
            ..Default::default()
        },
    );

    // Assert
    assert!(same.is_empty());
    assert_eq!(different.len(), 1);
    assert!(matches!(
        &different[0],
        WindowChange::Updated(w, WindowField::Icon) if w.icon == 0x999
    ));
}

#[test]
fn visibility_gain_moves_window_to_visible_and_raises_added() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, false));
    let obs = Observation {
        is_taskbar_visible: Some(true),
        ..Default::default()
    };

    // Act
    let changes = store.observe(1, &obs);

    // Assert
    assert_eq!(changes.len(), 1);
    assert!(matches!(&changes[0], WindowChange::Added(w) if w.handle == 1));
    assert_eq!(store.visible().len(), 1);
    assert!(store.hidden().is_empty());
}

#[test]
fn visibility_loss_moves_window_to_hidden_and_raises_removed() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    let obs = Observation {
        is_taskbar_visible: Some(false),
        ..Default::default()
    };

    // Act
    let changes = store.observe(1, &obs);

    // Assert
    assert_eq!(changes.len(), 1);
    assert!(matches!(&changes[0], WindowChange::Removed(w) if w.handle == 1));
    assert!(store.visible().is_empty());
    assert_eq!(store.hidden().len(), 1);
    // Identity survives the move.
    assert!(store.contains(1));
}

#[test]
fn active_status_transfers_between_windows() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    store.insert(window(2, true));
    store.set_active(1);

    // Act
    let changes = store.set_active(2);

    // Assert
    assert_eq!(changes.len(), 2);
    assert!(matches!(
        &changes[0],
        WindowChange::Updated(w, WindowField::Active) if w.handle == 1 && !w.is_active
    ));
    assert!(matches!(
        &changes[1],
        WindowChange::Updated(w, WindowField::Active) if w.handle == 2 && w.is_active
    ));
    assert_eq!(store.active().map(|w| w.handle), Some(2));
}

#[test]
fn repeated_foreground_for_same_window_is_silent() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    store.set_active(1);

    // Act
    let changes = store.set_active(1);

    // Assert
    assert!(changes.is_empty());
}

#[test]
fn foreground_to_untracked_window_clears_previous_holder() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    store.set_active(1);

    // Act
    let changes = store.set_active(99);

    // Assert
    assert_eq!(changes.len(), 1);
    assert!(matches!(
        &changes[0],
        WindowChange::Updated(w, WindowField::Active) if w.handle == 1 && !w.is_active
    ));
    assert!(store.active().is_none());
}

#[test]
fn remove_reports_whether_window_was_visible() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));
    store.insert(window(2, false));

    // Act
    let visible = store.remove(1);
    let hidden = store.remove(2);
    let missing = store.remove(3);

    // Assert
    assert!(matches!(visible, Some((w, true)) if w.handle == 1));
    assert!(matches!(hidden, Some((w, false)) if w.handle == 2));
    assert!(missing.is_none());
    assert!(store.visible().is_empty());
    assert!(store.hidden().is_empty());
}

#[test]
fn moving_flag_raises_once_per_transition() {
    // Arrange
    let mut store = WindowStore::default();
    store.insert(window(1, true));

    // Act
    let started = store.set_moving(1, true);
    let repeated = store.set_moving(1, true);
    let ended = store.set_moving(1, false);

    // Assert
    assert!(matches!(
        started,
        Some(WindowChange::Updated(ref w, WindowField::Moving)) if w.is_moving
    ));
    assert!(repeated.is_none());
    assert!(matches!(
        ended,
        Some(WindowChange::Updated(ref w, WindowField::Moving)) if !w.is_moving
    ));
    assert!(!store.is_moving(1));
}

#[test]
fn observation_for_untracked_handle_is_dropped() {
    // Arrange
    let mut store = WindowStore::default();
    let obs = Observation {
        title: Some("Ghost".to_string()),
        ..Default::default()
    };

    // Act
    let changes = store.observe(42, &obs);

    // Assert
    assert!(changes.is_empty());
    assert!(!store.contains(42));
}
