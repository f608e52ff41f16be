//! Small filesystem helpers shared by the file-backed stores.

use std::{
    fs::{self, File},
    io,
    path::Path,
};

/// Create the directory that will hold `path`, if it has one.
pub(crate) fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Read `path`, mapping "does not exist" to `Ok(None)`.
pub(crate) fn read_if_exists(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Flush the directory entry of `path` so a create or rename survives a
/// crash.  Directories cannot be opened as files on Windows; there the
/// rename itself is the best available guarantee.
pub(crate) fn sync_parent_dir(path: &Path) -> io::Result<()> {
    if cfg!(windows) {
        return Ok(());
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()
}
