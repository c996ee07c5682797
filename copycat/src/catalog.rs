//! Cataloging the inputs given on the command line.
//!
//! Each input is cataloged on its own, in parallel, and bound into the root
//! tree under its final path component: directories as containers, `.tar`
//! files as archives, anything else as a plain file.

use std::fs;
use std::path::{Path, PathBuf};

use copycat_format::{
    ArchiveCataloger, ArchiveRecord, CatalogContext, CatalogEntry, CatalogPath, CatalogTree,
    ContainerRecord, DirectoryRecord, FileRecord, SymlinkRecord,
};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::processor::{is_archive, measure, record_scan, ChecksumProcessor};
use crate::util::{catalog_path, mtime, os_bytes};

pub fn catalog_inputs(ctx: &CatalogContext, inputs: &[PathBuf]) -> Result<CatalogTree> {
    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    let entries = inputs
        .par_iter()
        .map(|input| catalog_input(ctx, input))
        .collect::<Result<Vec<_>>>()?;

    let mut root = CatalogTree::new();
    for (input, (name, entry)) in inputs.iter().zip(entries) {
        root.insert(&name, entry).map_err(|source| Error::Insert {
            path: input.clone(),
            source,
        })?;
    }
    Ok(root)
}

fn input_name(input: &Path) -> Result<CatalogPath> {
    let name = match input.file_name() {
        Some(name) => os_bytes(name),
        None => {
            let canonical = fs::canonicalize(input).map_err(|source| Error::CanonicalizePath {
                path: input.to_path_buf(),
                source,
            })?;
            match canonical.file_name() {
                Some(name) => os_bytes(name),
                None => b"root".to_vec(),
            }
        }
    };

    CatalogPath::new(name).map_err(|source| Error::InvalidPath {
        path: input.to_path_buf(),
        source,
    })
}

fn catalog_input(ctx: &CatalogContext, input: &Path) -> Result<(CatalogPath, CatalogEntry)> {
    let name = input_name(input)?;
    let meta = fs::metadata(input).map_err(|source| Error::ReadMetadata {
        path: input.to_path_buf(),
        source,
    })?;

    let entry = if meta.is_dir() {
        catalog_directory(ctx, input, &meta)?
    } else {
        catalog_file(ctx, input, &meta)?
    };

    tracing::info!(input = %input.display(), kind = %entry.kind(), "input cataloged");
    Ok((name, entry))
}

/// A regular file on disk: an archive when its name says so, a plain file
/// otherwise.
pub fn catalog_file(ctx: &CatalogContext, path: &Path, meta: &fs::Metadata) -> Result<CatalogEntry> {
    let name = os_bytes(path.as_os_str());
    let file = fs::File::open(path).map_err(|source| Error::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let read_error = |source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    };

    if !is_archive(&name) {
        let mut info = measure(ctx, &name, std::io::BufReader::new(file)).map_err(read_error)?;
        info.expected_size = Some(meta.len());
        return Ok(CatalogEntry::File(FileRecord {
            mtime: mtime(meta),
            info,
        }));
    }

    let map = unsafe { memmap2::Mmap::map(&file) }.map_err(|source| Error::MapFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut info = measure(ctx, &name, &map[..]).map_err(read_error)?;
    info.expected_size = Some(meta.len());

    let mut tree = CatalogTree::new();
    let result =
        ArchiveCataloger::new(ctx, &map).catalog(&mut tree, &mut ChecksumProcessor::new(ctx));
    record_scan(&mut info, result);

    Ok(CatalogEntry::Archive(ArchiveRecord {
        mtime: mtime(meta),
        info,
        tree,
    }))
}

fn insert(tree: &mut CatalogTree, path: &Path, at: &CatalogPath, entry: CatalogEntry) -> Result<()> {
    tree.insert(at, entry).map_err(|source| Error::Insert {
        path: path.to_path_buf(),
        source,
    })
}

/// A directory tree on disk, as a container. Symlinks are recorded, not
/// followed; sockets, fifos and devices are left out.
fn catalog_directory(ctx: &CatalogContext, root: &Path, meta: &fs::Metadata) -> Result<CatalogEntry> {
    let mut tree = CatalogTree::new();
    let mut files = vec![];

    for entry in jwalk::WalkDir::new(root).sort(true).skip_hidden(false) {
        let entry = entry.map_err(|source| Error::WalkDirectory {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let relative = match path.strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => continue,
        };
        let at = catalog_path(relative).map_err(|source| Error::InvalidPath {
            path: path.clone(),
            source,
        })?;

        let entry_meta = fs::symlink_metadata(&path).map_err(|source| Error::ReadMetadata {
            path: path.clone(),
            source,
        })?;
        let file_type = entry_meta.file_type();

        if file_type.is_dir() {
            let record = DirectoryRecord::new(mtime(&entry_meta));
            insert(&mut tree, &path, &at, CatalogEntry::Directory(record))?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&path).map_err(|source| Error::ReadLink {
                path: path.clone(),
                source,
            })?;
            let record = SymlinkRecord {
                mtime: mtime(&entry_meta),
                target: os_bytes(target.as_os_str()),
            };
            insert(&mut tree, &path, &at, CatalogEntry::Symlink(record))?;
        } else if file_type.is_file() {
            files.push((path.clone(), at, entry_meta));
        } else {
            tracing::debug!(path = %path.display(), "skipping special file");
        }
    }

    let cataloged = files
        .par_iter()
        .map(|(path, _, meta)| catalog_file(ctx, path, meta))
        .collect::<Result<Vec<_>>>()?;

    for ((path, at, _), entry) in files.iter().zip(cataloged) {
        insert(&mut tree, path, at, entry)?;
    }

    Ok(CatalogEntry::Container(ContainerRecord {
        mtime: mtime(meta),
        tree,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::tests::tar;
    use copycat_format::EntryKind;

    fn path(s: &str) -> CatalogPath {
        CatalogPath::new(s).unwrap()
    }

    #[test]
    fn directories_files_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("input");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/notes.txt"), b"a\nb\n").unwrap();
        fs::write(
            root.join("bundle.tar"),
            tar(&[("inside.txt", b"inside\n")], true),
        )
        .unwrap();
        let cut = tar(&[("first.txt", b"1")], false);
        let lone = dir.path().join("lone.tar");
        fs::write(&lone, &cut).unwrap();

        let ctx = CatalogContext::default();
        let tree = catalog_inputs(&ctx, &[root, lone]).unwrap();

        let input = tree.find(&path("input")).unwrap();
        assert_eq!(input.kind(), EntryKind::Container);

        let notes = tree.find(&path("input/sub/notes.txt")).unwrap();
        assert_eq!(notes.kind(), EntryKind::File);
        assert_eq!(notes.info().unwrap().lines, Some(2));
        assert_eq!(
            tree.find(&path("input/sub")).unwrap().kind(),
            EntryKind::Directory
        );

        let inside = tree.find(&path("input/bundle.tar/inside.txt")).unwrap();
        assert_eq!(inside.size(), Some(7));

        let lone = tree.find(&path("lone.tar")).unwrap();
        assert_eq!(lone.kind(), EntryKind::Archive);
        assert!(lone.info().unwrap().error);
        assert!(tree.find(&path("lone.tar/first.txt")).is_some());
    }

    #[test]
    fn no_inputs() {
        let ctx = CatalogContext::default();
        assert!(matches!(catalog_inputs(&ctx, &[]), Err(Error::NoInputs)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("links");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("real.txt"), b"real").unwrap();
        std::os::unix::fs::symlink("real.txt", root.join("alias")).unwrap();

        let ctx = CatalogContext::default();
        let tree = catalog_inputs(&ctx, &[root]).unwrap();
        let alias = tree.find(&path("links/alias")).unwrap();
        assert_eq!(alias.as_symlink().unwrap().target, b"real.txt".to_vec());
    }
}
