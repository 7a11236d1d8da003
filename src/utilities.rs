use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `contents` next to `path` and rename it into place, so readers never
/// observe a half-written file.
pub fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("unnamed"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => text.split_at(byte_offset).0,
        None => text,
    }
}
