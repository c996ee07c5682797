use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;
use std::time::SystemTime;

use chrono::TimeZone;
use copycat_format::path::IntoCatalogPathError;
use copycat_format::{CatalogEntry, CatalogPath, FileInfo};

#[cfg(unix)]
pub fn os_bytes(s: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().to_vec()
}

#[cfg(not(unix))]
pub fn os_bytes(s: &OsStr) -> Vec<u8> {
    s.to_string_lossy().into_owned().into_bytes()
}

/// The catalog path of a path relative to some input root.
pub fn catalog_path(relative: &Path) -> Result<CatalogPath, IntoCatalogPathError> {
    let mut bytes = vec![];
    for component in relative.components() {
        if !bytes.is_empty() {
            bytes.push(b'/');
        }
        bytes.extend(os_bytes(component.as_os_str()));
    }
    CatalogPath::new(bytes)
}

/// Seconds since the Unix epoch, negative before it; 0 when the platform
/// has no modification time.
pub fn mtime(meta: &std::fs::Metadata) -> i64 {
    match meta.modified() {
        Ok(time) => match time.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(since) => since.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        },
        Err(_) => 0,
    }
}

#[inline(always)]
pub fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

pub fn format_size(size: u64) -> String {
    use humansize::{file_size_opts as options, FileSize};
    size.file_size(options::BINARY)
        .unwrap_or_else(|_| size.to_string())
}

pub fn format_time(mtime: i64) -> String {
    chrono::Utc
        .timestamp_opt(mtime, 0)
        .single()
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".into())
}

pub fn format_checksum(info: Option<&FileInfo>) -> Option<String> {
    let checksum = info?.checksum.as_ref()?;
    Some(checksum.iter().map(|b| format!("{:02x}", b)).collect())
}

/// The entry a possibly-superseded entry stands for.
#[inline(always)]
pub fn unwrap_replaced(entry: &CatalogEntry) -> &CatalogEntry {
    match entry.as_replaced() {
        Some(replaced) => replaced.entry.as_ref(),
        None => entry,
    }
}

/// Where a link entry points, for display.
pub fn link_target(entry: &CatalogEntry) -> Option<String> {
    match entry {
        CatalogEntry::Symlink(link) => Some(lossy(&link.target).into_owned()),
        CatalogEntry::Hardlink(link) => Some(link.target.to_string()),
        _ => None,
    }
}
