//! NT reparse-point decoding.
//!
//! The platform-independent types (`ReparseTag`, `ReparseInfo`, the payload
//! structs) are always compiled, so `classify` never needs a `cfg` split of
//! its own around them. The actual `DeviceIoControl` calls are
//! `#[cfg(windows)]`-only; elsewhere they're stand-ins that report "no
//! reparse point here" without touching the filesystem.

use std::mem::size_of;
use std::path::Path;
use std::ptr;

use crate::error::{Error, Result};

/// A decoded NT reparse tag.
///
/// Only the tags this crate's classifier and consumers act on by name get
/// their own variant; every other documented tag (cloud-sync providers,
/// DFS, WOF, WCI, and the rest of the catalogue in
/// [`raw_tag`]) round-trips through [`ReparseTag::Other`] by its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReparseTag {
    /// `IO_REPARSE_TAG_MOUNT_POINT` — a directory junction.
    MountPoint,
    /// `IO_REPARSE_TAG_SYMLINK` — an NT symbolic link.
    Symlink,
    /// `IO_REPARSE_TAG_LX_SYMLINK` — a symlink created under WSL.
    LxSymlink,
    /// `IO_REPARSE_TAG_DEDUP` — a Data Deduplication chunk stub; these are
    /// treated as ordinary files by the classifier.
    Dedup,
    /// `IO_REPARSE_TAG_APPEXECLINK` — a packaged-app execution alias.
    AppExecLink,
    /// Any other documented or undocumented tag, by raw value.
    Other(u32),
}

/// Raw NT reparse tag values, named as in the Windows SDK headers.
///
/// Kept as plain constants (rather than folded one-for-one into
/// [`ReparseTag`] variants) because most of these never need distinct
/// handling in this crate; they exist so [`ReparseTag::from_raw`] has a
/// complete, named catalogue to classify against instead of opaque hex.
pub mod raw_tag {
    /// `IO_REPARSE_TAG_MOUNT_POINT`
    pub const MOUNT_POINT: u32 = 0xA000_0003;
    /// `IO_REPARSE_TAG_HSM`
    pub const HSM: u32 = 0xC000_0004;
    /// `IO_REPARSE_TAG_DRIVE_EXTENDER`
    pub const DRIVE_EXTENDER: u32 = 0x8000_0005;
    /// `IO_REPARSE_TAG_HSM2`
    pub const HSM2: u32 = 0x8000_0006;
    /// `IO_REPARSE_TAG_SIS`
    pub const SIS: u32 = 0x8000_0007;
    /// `IO_REPARSE_TAG_WIM`
    pub const WIM: u32 = 0x8000_0008;
    /// `IO_REPARSE_TAG_CSV`
    pub const CSV: u32 = 0x8000_0009;
    /// `IO_REPARSE_TAG_DFS`
    pub const DFS: u32 = 0x8000_000A;
    /// `IO_REPARSE_TAG_FILTER_MANAGER`
    pub const FILTER_MANAGER: u32 = 0x8000_000B;
    /// `IO_REPARSE_TAG_SYMLINK`
    pub const SYMLINK: u32 = 0xA000_000C;
    /// `IO_REPARSE_TAG_IIS_CACHE`
    pub const IIS_CACHE: u32 = 0xA000_0010;
    /// `IO_REPARSE_TAG_DFSR`
    pub const DFSR: u32 = 0x8000_0012;
    /// `IO_REPARSE_TAG_DEDUP`
    pub const DEDUP: u32 = 0x8000_0013;
    /// `IO_REPARSE_TAG_APPXSTRM`
    pub const APPXSTRM: u32 = 0xC000_0014;
    /// `IO_REPARSE_TAG_NFS`
    pub const NFS: u32 = 0x8000_0014;
    /// `IO_REPARSE_TAG_FILE_PLACEHOLDER`
    pub const FILE_PLACEHOLDER: u32 = 0x8000_0015;
    /// `IO_REPARSE_TAG_DFM`
    pub const DFM: u32 = 0x8000_0016;
    /// `IO_REPARSE_TAG_WOF`
    pub const WOF: u32 = 0x8000_0017;
    /// `IO_REPARSE_TAG_WCI`
    pub const WCI: u32 = 0x8000_0018;
    /// `IO_REPARSE_TAG_WCI_1`
    pub const WCI_1: u32 = 0x9000_0019;
    /// `IO_REPARSE_TAG_GLOBAL_REPARSE`
    pub const GLOBAL_REPARSE: u32 = 0xA000_0019;
    /// `IO_REPARSE_TAG_CLOUD`
    pub const CLOUD: u32 = 0x9000_001A;
    /// `IO_REPARSE_TAG_APPEXECLINK`
    pub const APPEXECLINK: u32 = 0x8000_001B;
    /// `IO_REPARSE_TAG_PROJFS`
    pub const PROJFS: u32 = 0x9000_001C;
    /// `IO_REPARSE_TAG_LX_SYMLINK`
    pub const LX_SYMLINK: u32 = 0xA000_001D;
    /// `IO_REPARSE_TAG_STORAGE_SYNC`
    pub const STORAGE_SYNC: u32 = 0x8000_001E;
    /// `IO_REPARSE_TAG_WCI_TOMBSTONE`
    pub const WCI_TOMBSTONE: u32 = 0xA000_001F;
    /// `IO_REPARSE_TAG_UNHANDLED`
    pub const UNHANDLED: u32 = 0x8000_0020;
    /// `IO_REPARSE_TAG_ONEDRIVE`
    pub const ONEDRIVE: u32 = 0x8000_0021;
    /// `IO_REPARSE_TAG_PROJFS_TOMBSTONE`
    pub const PROJFS_TOMBSTONE: u32 = 0xA000_0022;
    /// `IO_REPARSE_TAG_AF_UNIX`
    pub const AF_UNIX: u32 = 0x8000_0023;
    /// `IO_REPARSE_TAG_LX_FIFO`
    pub const LX_FIFO: u32 = 0x8000_0024;
    /// `IO_REPARSE_TAG_LX_CHR`
    pub const LX_CHR: u32 = 0x8000_0025;
    /// `IO_REPARSE_TAG_LX_BLK`
    pub const LX_BLK: u32 = 0x8000_0026;
    /// `IO_REPARSE_TAG_WCI_LINK`
    pub const WCI_LINK: u32 = 0xA000_0027;
    /// `IO_REPARSE_TAG_WCI_LINK_1`
    pub const WCI_LINK_1: u32 = 0xA000_0028;
    /// `IO_REPARSE_TAG_DATALESS_CIM`
    pub const DATALESS_CIM: u32 = 0xA000_0029;
}

impl ReparseTag {
    /// Map a raw reparse tag value to its [`ReparseTag`].
    pub fn from_raw(tag: u32) -> Self {
        match tag {
            raw_tag::MOUNT_POINT => Self::MountPoint,
            raw_tag::SYMLINK => Self::Symlink,
            raw_tag::LX_SYMLINK => Self::LxSymlink,
            raw_tag::DEDUP => Self::Dedup,
            raw_tag::APPEXECLINK => Self::AppExecLink,
            other => Self::Other(other),
        }
    }

    /// The raw tag value this variant was decoded from.
    pub fn raw(self) -> u32 {
        match self {
            Self::MountPoint => raw_tag::MOUNT_POINT,
            Self::Symlink => raw_tag::SYMLINK,
            Self::LxSymlink => raw_tag::LX_SYMLINK,
            Self::Dedup => raw_tag::DEDUP,
            Self::AppExecLink => raw_tag::APPEXECLINK,
            Self::Other(raw) => raw,
        }
    }
}

/// Decoded payload of a symlink reparse point (`IO_REPARSE_TAG_SYMLINK`).
#[derive(Debug, Clone)]
pub struct SymlinkData {
    /// The absolute path the link resolves through (`\??\`-prefixed device path stripped).
    pub substitute_name: String,
    /// The display-facing path, as the filesystem stores it.
    pub print_name: String,
    /// Whether the NT `SYMLINK_FLAG_RELATIVE` bit was set.
    pub relative: bool,
}

/// Decoded payload of a mount-point reparse point (`IO_REPARSE_TAG_MOUNT_POINT`).
#[derive(Debug, Clone)]
pub struct JunctionData {
    /// The absolute path the junction resolves through.
    pub substitute_name: String,
    /// The display-facing path, as the filesystem stores it.
    pub print_name: String,
}

/// Decoded payload of a WSL symlink reparse point (`IO_REPARSE_TAG_LX_SYMLINK`).
///
/// The substitute-name length is derived as `ReparseDataLength - 4` (see
/// [`Open Question decisions`](../../DESIGN.md) — the four bytes preceding
/// the path are an undocumented flags/offset DWORD, not part of the path),
/// so `raw_bytes` is kept alongside the decoded string for callers that want
/// to re-verify that heuristic themselves.
#[derive(Debug, Clone)]
pub struct WslSymlinkData {
    /// The link target, decoded as UTF-8 (WSL stores POSIX paths, not UTF-16).
    pub substitute_name: String,
    /// The raw path bytes this was decoded from.
    pub raw_bytes: Vec<u8>,
}

/// Decoded reparse-point payload, tag-dependent.
#[derive(Debug, Clone)]
pub enum ReparsePayload {
    /// `IO_REPARSE_TAG_SYMLINK`.
    Symlink(SymlinkData),
    /// `IO_REPARSE_TAG_MOUNT_POINT`.
    Junction(JunctionData),
    /// `IO_REPARSE_TAG_LX_SYMLINK`.
    WslSymlink(WslSymlinkData),
    /// Any other tag: the raw reparse data bytes, undecoded.
    Opaque(Vec<u8>),
}

/// A fully decoded reparse point.
#[derive(Debug, Clone)]
pub struct ReparseInfo {
    /// The reparse tag read from the point's header.
    pub tag: ReparseTag,
    /// The tag-dependent decoded payload.
    pub payload: ReparsePayload,
}

/// Maximum size of a reparse data buffer, per the Windows SDK
/// (`MAXIMUM_REPARSE_DATA_BUFFER_SIZE`).
pub const MAXIMUM_REPARSE_DATA_BUFFER_SIZE: usize = 0x4000;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct ReparseDataHeader {
    reparse_tag: u32,
    reparse_data_length: u16,
    reserved: u16,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct SymlinkReparseHeader {
    substitute_name_offset: u16,
    substitute_name_length: u16,
    print_name_offset: u16,
    print_name_length: u16,
    flags: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct MountPointReparseHeader {
    substitute_name_offset: u16,
    substitute_name_length: u16,
    print_name_offset: u16,
    print_name_length: u16,
}

fn parse_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode a `REPARSE_DATA_BUFFER`-shaped byte buffer, as returned by
/// `FSCTL_GET_REPARSE_POINT`, into a [`ReparseInfo`].
///
/// Platform-independent: this is pure buffer parsing, with no I/O, so it
/// can be exercised on any host with a hand-constructed buffer (see the
/// tests below).
pub fn parse_reparse_buffer(buf: &[u8]) -> Result<ReparseInfo> {
    if buf.len() < size_of::<ReparseDataHeader>() {
        return Err(Error::Reparse("reparse buffer shorter than its header".into()));
    }
    // SAFETY: length checked above; the header type is `repr(C, packed)`
    // and has no alignment requirement beyond `read_unaligned`.
    let header: ReparseDataHeader = unsafe { ptr::read_unaligned(buf.as_ptr().cast()) };
    let tag = ReparseTag::from_raw(header.reparse_tag);
    let data_len = header.reparse_data_length as usize;
    let path_buffer_start = size_of::<ReparseDataHeader>();

    let payload = match tag {
        ReparseTag::Symlink => {
            let hdr_end = path_buffer_start + size_of::<SymlinkReparseHeader>();
            if buf.len() < hdr_end {
                return Err(Error::Reparse("symlink reparse buffer truncated".into()));
            }
            let sub_hdr: SymlinkReparseHeader =
                unsafe { ptr::read_unaligned(buf[path_buffer_start..].as_ptr().cast()) };
            let names = &buf[hdr_end..];
            let sub_off = sub_hdr.substitute_name_offset as usize;
            let sub_len = sub_hdr.substitute_name_length as usize;
            let print_off = sub_hdr.print_name_offset as usize;
            let print_len = sub_hdr.print_name_length as usize;
            let substitute_name = parse_utf16le(
                names
                    .get(sub_off..sub_off + sub_len)
                    .ok_or_else(|| Error::Reparse("substitute name out of bounds".into()))?,
            );
            let print_name = parse_utf16le(
                names
                    .get(print_off..print_off + print_len)
                    .ok_or_else(|| Error::Reparse("print name out of bounds".into()))?,
            );
            ReparsePayload::Symlink(SymlinkData {
                substitute_name,
                print_name,
                relative: sub_hdr.flags & 1 != 0,
            })
        }
        ReparseTag::MountPoint => {
            let hdr_end = path_buffer_start + size_of::<MountPointReparseHeader>();
            if buf.len() < hdr_end {
                return Err(Error::Reparse("mount point reparse buffer truncated".into()));
            }
            let sub_hdr: MountPointReparseHeader =
                unsafe { ptr::read_unaligned(buf[path_buffer_start..].as_ptr().cast()) };
            let names = &buf[hdr_end..];
            let sub_off = sub_hdr.substitute_name_offset as usize;
            let sub_len = sub_hdr.substitute_name_length as usize;
            let print_off = sub_hdr.print_name_offset as usize;
            let print_len = sub_hdr.print_name_length as usize;
            let substitute_name = parse_utf16le(
                names
                    .get(sub_off..sub_off + sub_len)
                    .ok_or_else(|| Error::Reparse("substitute name out of bounds".into()))?,
            );
            let print_name = parse_utf16le(
                names
                    .get(print_off..print_off + print_len)
                    .ok_or_else(|| Error::Reparse("print name out of bounds".into()))?,
            );
            ReparsePayload::Junction(JunctionData {
                substitute_name,
                print_name,
            })
        }
        ReparseTag::LxSymlink => {
            // One DWORD of unknown meaning precedes the path bytes; the
            // path itself is `ReparseDataLength - 4` bytes of UTF-8.
            let path_start = path_buffer_start + 4;
            let name_len = data_len.saturating_sub(4);
            let raw_bytes = buf
                .get(path_start..path_start + name_len)
                .ok_or_else(|| Error::Reparse("LX_SYMLINK path out of bounds".into()))?
                .to_vec();
            let substitute_name = String::from_utf8_lossy(&raw_bytes).into_owned();
            ReparsePayload::WslSymlink(WslSymlinkData {
                substitute_name,
                raw_bytes,
            })
        }
        _ => {
            let end = (path_buffer_start + data_len).min(buf.len());
            ReparsePayload::Opaque(buf[path_buffer_start.min(end)..end].to_vec())
        }
    };

    Ok(ReparseInfo { tag, payload })
}

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;

    use windows_sys::Win32::Foundation::{CloseHandle, GENERIC_READ, HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::Storage::FileSystem::{
        CreateFileW, FILE_FLAG_BACKUP_SEMANTICS, FILE_FLAG_OPEN_REPARSE_POINT, FILE_SHARE_READ,
        FILE_SHARE_WRITE, OPEN_EXISTING,
    };
    use windows_sys::Win32::System::Ioctl::FSCTL_GET_REPARSE_POINT;
    use windows_sys::Win32::System::IO::DeviceIoControl;

    fn wide_path(path: &Path) -> Vec<u16> {
        OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    fn open_reparse_handle(path: &Path) -> Option<HANDLE> {
        let wide = wide_path(path);
        // SAFETY: `wide` is a valid NUL-terminated UTF-16 string for the
        // lifetime of this call; all other arguments are plain values.
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null(),
                OPEN_EXISTING,
                FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT,
                0,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            None
        } else {
            Some(handle)
        }
    }

    fn read_reparse_buffer(path: &Path) -> Option<Vec<u8>> {
        let handle = open_reparse_handle(path)?;
        let mut buf = vec![0u8; MAXIMUM_REPARSE_DATA_BUFFER_SIZE];
        let mut bytes_returned: u32 = 0;
        // SAFETY: `handle` is a valid, open handle; `buf` is sized to
        // `MAXIMUM_REPARSE_DATA_BUFFER_SIZE` as the API requires.
        let ok = unsafe {
            DeviceIoControl(
                handle,
                FSCTL_GET_REPARSE_POINT,
                ptr::null(),
                0,
                buf.as_mut_ptr().cast(),
                buf.len() as u32,
                &mut bytes_returned,
                ptr::null_mut(),
            )
        };
        unsafe {
            CloseHandle(handle);
        }
        if ok == 0 {
            return None;
        }
        buf.truncate(bytes_returned as usize);
        Some(buf)
    }

    pub fn is_reparse_point(path: &Path) -> bool {
        // Best-effort classification, not a security boundary: a failed
        // open (e.g. access denied) is reported as "not a reparse point"
        // rather than propagated as an error.
        open_reparse_handle(path)
            .map(|h| {
                unsafe { CloseHandle(h) };
                read_reparse_buffer(path).is_some()
            })
            .unwrap_or(false)
    }

    pub fn get_reparse_info(path: &Path) -> Result<ReparseInfo> {
        let buf = read_reparse_buffer(path)
            .ok_or_else(|| Error::Reparse(format!("no reparse point at {}", path.display())))?;
        parse_reparse_buffer(&buf)
    }
}

#[cfg(windows)]
pub use windows_impl::{get_reparse_info, is_reparse_point};

#[cfg(not(windows))]
/// Always `false` off Windows: there is no NT reparse-point concept to check.
pub fn is_reparse_point(_path: &Path) -> bool {
    false
}

#[cfg(not(windows))]
/// Always an error off Windows: there is nothing to decode.
pub fn get_reparse_info(path: &Path) -> Result<ReparseInfo> {
    Err(Error::Reparse(format!(
        "reparse-point decoding is unsupported on this platform ({})",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_maps_named_tags() {
        assert_eq!(ReparseTag::from_raw(raw_tag::SYMLINK), ReparseTag::Symlink);
        assert_eq!(ReparseTag::from_raw(raw_tag::MOUNT_POINT), ReparseTag::MountPoint);
        assert_eq!(ReparseTag::from_raw(raw_tag::LX_SYMLINK), ReparseTag::LxSymlink);
        assert_eq!(ReparseTag::from_raw(raw_tag::DEDUP), ReparseTag::Dedup);
    }

    #[test]
    fn from_raw_falls_back_to_other() {
        assert_eq!(ReparseTag::from_raw(raw_tag::CLOUD), ReparseTag::Other(raw_tag::CLOUD));
        assert_eq!(ReparseTag::from_raw(0xDEAD_BEEF), ReparseTag::Other(0xDEAD_BEEF));
    }

    #[test]
    fn raw_is_inverse_of_from_raw_for_named_tags() {
        for tag in [
            ReparseTag::MountPoint,
            ReparseTag::Symlink,
            ReparseTag::LxSymlink,
            ReparseTag::Dedup,
            ReparseTag::AppExecLink,
        ] {
            assert_eq!(ReparseTag::from_raw(tag.raw()), tag);
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn non_windows_reports_no_reparse_points() {
        let path = Path::new("/tmp/whatever-this-does-not-need-to-exist");
        assert!(!is_reparse_point(path));
        assert!(get_reparse_info(path).is_err());
    }

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    /// Builds a `REPARSE_DATA_BUFFER` with a `SymlinkReparseHeader` payload,
    /// substitute name first then print name, as `FSCTL_GET_REPARSE_POINT`
    /// returns it.
    fn build_symlink_buffer(substitute: &str, print: &str, relative: bool) -> Vec<u8> {
        let sub_bytes = utf16le(substitute);
        let print_bytes = utf16le(print);
        let mut names = Vec::new();
        let sub_off = names.len() as u16;
        names.extend_from_slice(&sub_bytes);
        let print_off = names.len() as u16;
        names.extend_from_slice(&print_bytes);

        let sub_header_len = 12u16; // 4 u16 fields + one u32 flags field
        let reparse_data_length = sub_header_len + names.len() as u16;

        let mut buf = Vec::new();
        buf.extend_from_slice(&raw_tag::SYMLINK.to_le_bytes());
        buf.extend_from_slice(&reparse_data_length.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
        buf.extend_from_slice(&sub_off.to_le_bytes());
        buf.extend_from_slice(&(sub_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(&print_off.to_le_bytes());
        buf.extend_from_slice(&(print_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(if relative { 1u32 } else { 0u32 }).to_le_bytes());
        buf.extend_from_slice(&names);
        buf
    }

    /// Builds a `REPARSE_DATA_BUFFER` with a `MountPointReparseHeader`
    /// payload (junctions have no relative-flag field).
    fn build_junction_buffer(substitute: &str, print: &str) -> Vec<u8> {
        let sub_bytes = utf16le(substitute);
        let print_bytes = utf16le(print);
        let mut names = Vec::new();
        let sub_off = names.len() as u16;
        names.extend_from_slice(&sub_bytes);
        let print_off = names.len() as u16;
        names.extend_from_slice(&print_bytes);

        let sub_header_len = 8u16; // 4 u16 fields
        let reparse_data_length = sub_header_len + names.len() as u16;

        let mut buf = Vec::new();
        buf.extend_from_slice(&raw_tag::MOUNT_POINT.to_le_bytes());
        buf.extend_from_slice(&reparse_data_length.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
        buf.extend_from_slice(&sub_off.to_le_bytes());
        buf.extend_from_slice(&(sub_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(&print_off.to_le_bytes());
        buf.extend_from_slice(&(print_bytes.len() as u16).to_le_bytes());
        buf.extend_from_slice(&names);
        buf
    }

    /// Builds a `REPARSE_DATA_BUFFER` for `IO_REPARSE_TAG_LX_SYMLINK`: a
    /// four-byte unknown-purpose DWORD, then the UTF-8 target path.
    fn build_lx_symlink_buffer(target: &str) -> Vec<u8> {
        let target_bytes = target.as_bytes();
        let reparse_data_length = 4 + target_bytes.len() as u16;

        let mut buf = Vec::new();
        buf.extend_from_slice(&raw_tag::LX_SYMLINK.to_le_bytes());
        buf.extend_from_slice(&reparse_data_length.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
        buf.extend_from_slice(&0u32.to_le_bytes()); // unknown flags/offset DWORD
        buf.extend_from_slice(target_bytes);
        buf
    }

    #[test]
    fn parse_reparse_buffer_decodes_symlink() {
        let buf = build_symlink_buffer(r"\??\C:\target\path", r"C:\target\path", false);
        let info = parse_reparse_buffer(&buf).unwrap();
        assert_eq!(info.tag, ReparseTag::Symlink);
        match info.payload {
            ReparsePayload::Symlink(data) => {
                assert_eq!(data.substitute_name, r"\??\C:\target\path");
                assert_eq!(data.print_name, r"C:\target\path");
                assert!(!data.relative);
            }
            other => panic!("expected Symlink payload, got {other:?}"),
        }
    }

    #[test]
    fn parse_reparse_buffer_decodes_relative_symlink() {
        let buf = build_symlink_buffer("target.txt", "target.txt", true);
        let info = parse_reparse_buffer(&buf).unwrap();
        match info.payload {
            ReparsePayload::Symlink(data) => {
                assert_eq!(data.substitute_name, "target.txt");
                assert!(data.relative);
            }
            other => panic!("expected Symlink payload, got {other:?}"),
        }
    }

    #[test]
    fn parse_reparse_buffer_decodes_junction() {
        let buf = build_junction_buffer(r"\??\C:\mounted\volume\", r"C:\mounted\volume\");
        let info = parse_reparse_buffer(&buf).unwrap();
        assert_eq!(info.tag, ReparseTag::MountPoint);
        match info.payload {
            ReparsePayload::Junction(data) => {
                assert_eq!(data.substitute_name, r"\??\C:\mounted\volume\");
                assert_eq!(data.print_name, r"C:\mounted\volume\");
            }
            other => panic!("expected Junction payload, got {other:?}"),
        }
    }

    #[test]
    fn parse_reparse_buffer_decodes_lx_symlink() {
        let buf = build_lx_symlink_buffer("/mnt/c/target/path");
        let info = parse_reparse_buffer(&buf).unwrap();
        assert_eq!(info.tag, ReparseTag::LxSymlink);
        match info.payload {
            ReparsePayload::WslSymlink(data) => {
                assert_eq!(data.substitute_name, "/mnt/c/target/path");
                assert_eq!(data.raw_bytes, b"/mnt/c/target/path");
            }
            other => panic!("expected WslSymlink payload, got {other:?}"),
        }
    }

    #[test]
    fn parse_reparse_buffer_rejects_truncated_header() {
        let err = parse_reparse_buffer(&[0u8; 2]).unwrap_err();
        assert!(matches!(err, Error::Reparse(_)));
    }

    #[test]
    fn parse_reparse_buffer_treats_unknown_tag_as_opaque() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&raw_tag::CLOUD.to_le_bytes());
        buf.extend_from_slice(&3u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&[1, 2, 3]);
        let info = parse_reparse_buffer(&buf).unwrap();
        assert_eq!(info.tag, ReparseTag::Other(raw_tag::CLOUD));
        match info.payload {
            ReparsePayload::Opaque(bytes) => assert_eq!(bytes, vec![1, 2, 3]),
            other => panic!("expected Opaque payload, got {other:?}"),
        }
    }
}
