use std::path::PathBuf;

use copycat_format::path::IntoCatalogPathError;
use copycat_format::InsertError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot handle path `{}`", .path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: IntoCatalogPathError,
    },

    #[error("Cannot read metadata of `{}`", .path.display())]
    ReadMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open file `{}`", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read file `{}`", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot map file `{}` into memory", .path.display())]
    MapFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read link `{}`", .path.display())]
    ReadLink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot canonicalize path `{}`", .path.display())]
    CanonicalizePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot walk directory `{}`", .path.display())]
    WalkDirectory {
        path: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("Cannot add `{}` to the catalog", .path.display())]
    Insert {
        path: PathBuf,
        #[source]
        source: InsertError,
    },

    #[error("No inputs given")]
    NoInputs,

    #[error("Cannot write output")]
    WriteOutput {
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize catalog")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}
