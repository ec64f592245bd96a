//! Entry classification.
//!
//! `classify` turns a path into a closed [`EntryKind`] tag following a fixed
//! check order: link-level metadata first (a missing path is
//! [`EntryKind::Nonexistent`]), then symlink, then junction (a non-symlink
//! that still resolves through `readlink`), then directory, then file — with
//! a further NT reparse-tag decode on Windows before a regular-looking file
//! is accepted as [`EntryKind::File`] — then device, then `Unknown`.

use std::fs::Metadata;
use std::path::Path;

/// The classification of a filesystem entry.
///
/// Closed by design: every traversal decision switches on this exhaustively,
/// so a new variant here is a breaking change to every consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Nothing exists at this path (removed between discovery and
    /// classification, or never existed).
    Nonexistent,
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A POSIX symlink, or an NT symlink reparse point.
    Symlink,
    /// An NT mount-point reparse point (directory junction).
    Junction,
    /// An NT `LX_SYMLINK` reparse point (a symlink created under WSL).
    WslSymlink,
    /// A block/char device, FIFO, or socket.
    Device,
    /// Classifiable as none of the above (e.g. an unrecognized reparse tag).
    Unknown,
}

/// Classify the entry at `path`.
///
/// Never follows symlinks to decide directory-ness: the check is always
/// performed against link-level (`lstat`-equivalent) metadata.
pub fn classify(path: &Path) -> EntryKind {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(_) => return EntryKind::Nonexistent,
    };

    if meta.is_symlink() {
        return EntryKind::Symlink;
    }

    // A non-symlink that still resolves through readlink is an NT junction.
    // On platforms without junctions this call simply never succeeds for a
    // non-symlink, so the branch is inert rather than platform-gated.
    if std::fs::read_link(path).is_ok() {
        tracing::debug!(path = %path.display(), "classified as junction (non-symlink readlink success)");
        return EntryKind::Junction;
    }

    if meta.is_dir() {
        return EntryKind::Directory;
    }

    if meta.is_file() {
        return classify_regular_file(path);
    }

    if is_device(&meta) {
        return EntryKind::Device;
    }

    EntryKind::Unknown
}

#[cfg(windows)]
fn classify_regular_file(path: &Path) -> EntryKind {
    if !crate::reparse::is_reparse_point(path) {
        return EntryKind::File;
    }
    match crate::reparse::get_reparse_info(path) {
        Ok(info) => {
            tracing::debug!(path = %path.display(), tag = ?info.tag, "decoded reparse tag on regular-looking file");
            match info.tag {
                crate::reparse::ReparseTag::LxSymlink => EntryKind::WslSymlink,
                crate::reparse::ReparseTag::Symlink => EntryKind::Symlink,
                crate::reparse::ReparseTag::MountPoint => EntryKind::Junction,
                _ => EntryKind::Unknown,
            }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to decode reparse point, classifying as unknown");
            EntryKind::Unknown
        }
    }
}

#[cfg(not(windows))]
fn classify_regular_file(_path: &Path) -> EntryKind {
    EntryKind::File
}

#[cfg(unix)]
fn is_device(meta: &Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    let ft = meta.file_type();
    ft.is_block_device() || ft.is_char_device() || ft.is_fifo() || ft.is_socket()
}

#[cfg(not(unix))]
fn is_device(_meta: &Metadata) -> bool {
    false
}

/// Returns the `(device_id, inode_number)` pair used to key hardlink
/// tracking, if the platform exposes one.
#[cfg(unix)]
pub fn inode_identity(meta: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
pub fn inode_identity(_meta: &Metadata) -> Option<(u64, u64)> {
    None
}

/// Returns the hardlink count reported by the filesystem, if available.
#[cfg(unix)]
pub fn link_count(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.nlink()
}

#[cfg(not(unix))]
pub fn link_count(_meta: &Metadata) -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn nonexistent_path_is_nonexistent() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert_eq!(classify(&missing), EntryKind::Nonexistent);
    }

    #[test]
    fn plain_directory_is_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(classify(dir.path()), EntryKind::Directory);
    }

    #[test]
    fn plain_file_is_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"hi").unwrap();
        assert_eq!(classify(&file), EntryKind::File);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_symlink_not_its_target_kind() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.txt");
        std::fs::write(&target, b"hi").unwrap();
        let link = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert_eq!(classify(&link), EntryKind::Symlink);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_still_symlink() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("nope"), &link).unwrap();
        assert_eq!(classify(&link), EntryKind::Symlink);
    }

    #[rstest]
    #[case("a.txt")]
    #[case("b.bin")]
    fn regular_files_with_varied_names_classify_as_file(#[case] name: &str) {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(name);
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(classify(&file), EntryKind::File);
    }
}
