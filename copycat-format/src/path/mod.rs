use std::fmt;

mod error;

pub use self::error::IntoCatalogPathError;

/// The separator between segments of an archive member name.
pub const PATH_SEP: u8 = b'/';

/// A path inside a catalog: a non-empty list of byte-string segments.
///
/// Archive member names are bytes in whatever encoding the archiver used, so
/// segments are never decoded or normalized. Empty and `.` segments are
/// dropped on construction and `..` is refused.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct CatalogPath(pub(crate) Vec<Vec<u8>>);

/// Split a raw member name into its segments.
pub fn sanitize(path: &[u8]) -> Result<Vec<Vec<u8>>, IntoCatalogPathError> {
    let mut out = vec![];

    for segment in path.split(|b| *b == PATH_SEP) {
        match segment {
            b"" | b"." => {}
            b".." => return Err(IntoCatalogPathError::ParentSegment),
            segment => out.push(segment.to_vec()),
        }
    }

    Ok(out)
}

impl CatalogPath {
    pub fn new<P: AsRef<[u8]>>(path: P) -> std::result::Result<CatalogPath, IntoCatalogPathError> {
        let out = sanitize(path.as_ref())?;

        if out.is_empty() {
            return Err(IntoCatalogPathError::EmptyPath);
        }

        Ok(CatalogPath(out))
    }

    pub fn filename(&self) -> &[u8] {
        // Never empty, see `new`.
        self.0.last().map(|s| s.as_slice()).unwrap_or_default()
    }

    /// Append one segment taken verbatim, as read back out of a tree.
    pub(crate) fn child(&self, segment: &[u8]) -> CatalogPath {
        let mut out = self.0.clone();
        out.push(segment.to_vec());
        CatalogPath(out)
    }

    pub(crate) fn from_segment(segment: &[u8]) -> CatalogPath {
        CatalogPath(vec![segment.to_vec()])
    }

    /// The path as raw bytes, segments joined by `/`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.join(&PATH_SEP)
    }
}

impl fmt::Display for CatalogPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(v) = iter.next() {
            f.write_str(&String::from_utf8_lossy(v))?;
        }
        for v in iter {
            f.write_str("/")?;
            f.write_str(&String::from_utf8_lossy(v))?;
        }
        Ok(())
    }
}
