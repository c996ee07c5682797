use std::io::Write;

use copycat_format::{CatalogEntry, CatalogTree};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::util::{format_checksum, format_time, link_target, unwrap_replaced};

#[derive(Debug, Serialize)]
struct JsonEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: &'static str,
    modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc32: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    error: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    short: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    superseded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
}

impl JsonEntry {
    fn new(path: String, entry: &CatalogEntry, superseded: bool) -> JsonEntry {
        let info = entry.info();
        JsonEntry {
            path,
            entry_type: entry.kind().as_str(),
            modified: format_time(entry.mtime()),
            size: entry.size(),
            expected_size: info.and_then(|info| info.expected_size),
            lines: info.and_then(|info| info.lines),
            crc32: format_checksum(info),
            file_type: info.and_then(|info| info.type_name.clone()),
            target: link_target(entry),
            offset: entry.as_member_file().map(|file| file.offset),
            error: info.map_or(false, |info| info.error),
            short: info.map_or(false, |info| info.is_short()),
            superseded,
            diagnostics: info.map(|info| info.diagnostics.clone()).unwrap_or_default(),
        }
    }
}

pub fn run(tree: &CatalogTree, pretty: bool) -> Result<()> {
    let entries = tree
        .entries()
        .map(|item| {
            JsonEntry::new(
                item.path.to_string(),
                unwrap_replaced(item.entry),
                item.superseded,
            )
        })
        .collect::<Vec<_>>();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = if pretty {
        serde_json::to_writer_pretty(&mut out, &entries)
    } else {
        serde_json::to_writer(&mut out, &entries)
    };
    result.map_err(|source| Error::Serialize { source })?;
    writeln!(out).map_err(|source| Error::WriteOutput { source })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use copycat_format::{CatalogPath, FileInfo, FileRecord};

    #[test]
    fn superseded_entries_are_marked() {
        let mut tree = CatalogTree::new();
        let path = CatalogPath::new("x").unwrap();
        for size in [1, 2] {
            let entry = CatalogEntry::File(FileRecord {
                mtime: 0,
                info: FileInfo {
                    size,
                    ..Default::default()
                },
            });
            tree.insert(&path, entry).unwrap();
        }

        let json: Vec<_> = tree
            .entries()
            .map(|item| {
                serde_json::to_value(JsonEntry::new(
                    item.path.to_string(),
                    unwrap_replaced(item.entry),
                    item.superseded,
                ))
                .unwrap()
            })
            .collect();

        assert_eq!(json.len(), 2);
        assert_eq!(json[0]["size"], 2);
        assert!(json[0].get("superseded").is_none());
        assert_eq!(json[1]["size"], 1);
        assert_eq!(json[1]["superseded"], true);
        assert_eq!(json[1]["type"], "file");
    }

    #[test]
    fn short_reads_are_marked() {
        let entry = CatalogEntry::File(FileRecord {
            mtime: 0,
            info: FileInfo {
                expected_size: Some(100),
                size: 40,
                ..Default::default()
            },
        });
        let json = serde_json::to_value(JsonEntry::new("x".into(), &entry, false)).unwrap();
        assert_eq!(json["short"], true);
        assert_eq!(json["expected_size"], 100);

        let entry = CatalogEntry::File(FileRecord {
            mtime: 0,
            info: FileInfo {
                expected_size: Some(40),
                size: 40,
                ..Default::default()
            },
        });
        let json = serde_json::to_value(JsonEntry::new("x".into(), &entry, false)).unwrap();
        assert!(json.get("short").is_none());
    }
}
