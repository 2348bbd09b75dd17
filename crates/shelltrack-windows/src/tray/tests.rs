use shelltrack_core::{IconAction, PinStatus};

use super::store::{IconChange, IconRecord, IconStore};

fn record(handle: usize, preference: u32) -> IconRecord {
    IconRecord {
        exe_path: "C:\\app\\app.exe".to_string(),
        tooltip: "App".to_string(),
        icon_handle: 0x500,
        window_handle: handle,
        preference,
        id: 1,
        guid: 0,
    }
}

#[test]
fn add_with_always_preference_tracks_pinned_icon() {
    // Arrange
    let mut store = IconStore::default();

    // Act
    let change = store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 2), None);

    // Assert
    assert!(matches!(
        change,
        Some(IconChange::Added(ref icon))
        if icon.path == "C:\\app\\app.exe" && icon.pin == PinStatus::Pinned
    ));
    assert_eq!(store.icons().len(), 1);
}

#[test]
fn add_without_sink_handle_is_skipped() {
    // Arrange
    let mut store = IconStore::default();

    // Act
    let change = store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0, 2), None);

    // Assert
    assert!(change.is_none());
    assert!(store.icons().is_empty());
}

#[test]
fn delete_for_untracked_path_is_a_no_op() {
    // Arrange
    let mut store = IconStore::default();
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);

    // Act
    let change = store.apply(IconAction::Delete, "C:\\other\\gone.exe", &record(0, 0), None);

    // Assert
    assert!(change.is_none());
    assert_eq!(store.icons().len(), 1);
}

#[test]
fn delete_then_re_add_succeeds_normally() {
    // Arrange
    let mut store = IconStore::default();
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);
    store.apply(IconAction::Delete, "C:\\app\\app.exe", &record(0, 0), None);

    // Act
    let change = store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x11, 1), None);

    // Assert
    assert!(matches!(
        change,
        Some(IconChange::Added(ref icon))
        if icon.window_handle == 0x11 && icon.pin == PinStatus::NotPinned
    ));
    assert_eq!(store.icons().len(), 1);
}

#[test]
fn modify_for_unknown_path_is_dropped() {
    // Arrange
    let mut store = IconStore::default();

    // Act
    let change = store.apply(IconAction::Modify, "C:\\app\\app.exe", &record(0x10, 0), None);

    // Assert
    assert!(change.is_none());
    assert!(store.icons().is_empty());
}

#[test]
fn repeated_identical_modify_changes_fields_at_most_once() {
    // Arrange
    let mut store = IconStore::default();
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);
    let mut changed = record(0x10, 0);
    changed.tooltip = "Renamed".to_string();

    // Act
    let first = store.apply(IconAction::Modify, "C:\\app\\app.exe", &changed, None);
    let second = store.apply(IconAction::Modify, "C:\\app\\app.exe", &changed, None);

    // Assert
    assert!(matches!(
        first,
        Some(IconChange::Updated(ref icon)) if icon.tooltip == "Renamed"
    ));
    assert!(second.is_none());
    assert_eq!(store.icons().len(), 1);
}

#[test]
fn duplicate_add_refreshes_in_place() {
    // Arrange
    let mut store = IconStore::default();
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);
    let mut again = record(0x10, 2);
    again.tooltip = "Updated".to_string();

    // Act
    let change = store.apply(IconAction::Add, "C:\\app\\app.exe", &again, None);

    // Assert: identity keys stay unique.
    assert!(matches!(change, Some(IconChange::Updated(_))));
    assert_eq!(store.icons().len(), 1);
    let icon = store.find("C:\\app\\app.exe").unwrap();
    assert_eq!(icon.tooltip, "Updated");
    assert_eq!(icon.pin, PinStatus::Pinned);
}

#[test]
fn recovered_route_is_merged_on_modify() {
    // Arrange
    let mut store = IconStore::default();
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);

    // Act
    let change = store.apply(
        IconAction::Modify,
        "C:\\app\\app.exe",
        &record(0x10, 0),
        Some((0x0401, 7)),
    );

    // Assert
    assert!(matches!(
        change,
        Some(IconChange::Updated(ref icon))
        if icon.callback_message == 0x0401 && icon.callback_param == 7
    ));
}

#[test]
fn zero_callback_message_survives_until_a_route_is_found() {
    // Arrange
    let mut store = IconStore::default();

    // Act
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);

    // Assert: zero means "no known routing", never a value to send.
    let icon = store.find("C:\\app\\app.exe").unwrap();
    assert_eq!(icon.callback_message, 0);
    assert_eq!(icon.callback_param, 0);
}

#[test]
fn set_version_for_tracked_icon_updates_fields() {
    // Arrange
    let mut store = IconStore::default();
    store.apply(IconAction::Add, "C:\\app\\app.exe", &record(0x10, 0), None);
    let mut moved = record(0x20, 0);
    moved.tooltip = "App".to_string();

    // Act
    let change = store.apply(IconAction::SetVersion, "C:\\app\\app.exe", &moved, None);

    // Assert
    assert!(matches!(
        change,
        Some(IconChange::Updated(ref icon)) if icon.window_handle == 0x20
    ));
}
