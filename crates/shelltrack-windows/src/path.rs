//! Known-folder token expansion for icon executable paths.
//!
//! The shell reports some icon paths with a virtual folder GUID in
//! place of a literal directory, e.g.
//! `{F38BF404-1D43-42F2-9305-67DE0B28FC23}\explorer.exe`. Those
//! segments are resolved to real filesystem paths so that the resolved
//! path can serve as the icon's identity key.

use std::ffi::c_void;

use windows::Win32::System::Com::CoTaskMemFree;
use windows::Win32::UI::Shell::{KF_FLAG_DEFAULT, SHGetKnownFolderPath};
use windows::core::GUID;

/// Expands any known-folder GUID segments of a path in place.
///
/// Segments that are not GUIDs, or GUIDs the OS does not recognise,
/// are kept as-is.
pub fn expand_known_folders(path: &str) -> String {
    expand_with(path, resolve_known_folder)
}

/// Expansion over an arbitrary GUID resolver.
fn expand_with(path: &str, resolve: impl Fn(&GUID) -> Option<String>) -> String {
    let segments: Vec<String> = path
        .split('\\')
        .map(|segment| match parse_guid(segment) {
            Some(guid) => resolve(&guid).unwrap_or_else(|| segment.to_string()),
            None => segment.to_string(),
        })
        .collect();

    segments.join("\\")
}

/// Asks the shell for the literal path of a known folder.
fn resolve_known_folder(guid: &GUID) -> Option<String> {
    // SAFETY: SHGetKnownFolderPath returns a CoTaskMem-allocated wide
    // string on success, which we must free after copying.
    unsafe {
        let pwstr = SHGetKnownFolderPath(guid, KF_FLAG_DEFAULT, None).ok()?;
        let result = pwstr.to_string().ok();
        CoTaskMemFree(Some(pwstr.0 as *const c_void));
        result
    }
}

/// Parses a GUID of the form `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`,
/// with or without surrounding braces.
fn parse_guid(segment: &str) -> Option<GUID> {
    let trimmed = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(segment);

    // Byte-offset slicing below requires every position to be a char
    // boundary; GUIDs are ASCII by definition.
    if !trimmed.is_ascii() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split('-').collect();
    if parts.len() != 5 {
        return None;
    }
    let expected = [8, 4, 4, 4, 12];
    if parts
        .iter()
        .zip(expected)
        .any(|(part, len)| part.len() != len)
    {
        return None;
    }

    let data1 = u32::from_str_radix(parts[0], 16).ok()?;
    let data2 = u16::from_str_radix(parts[1], 16).ok()?;
    let data3 = u16::from_str_radix(parts[2], 16).ok()?;

    let mut data4 = [0u8; 8];
    let tail = format!("{}{}", parts[3], parts[4]);
    for (i, byte) in data4.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&tail[i * 2..i * 2 + 2], 16).ok()?;
    }

    Some(GUID {
        data1,
        data2,
        data3,
        data4,
    })
}
