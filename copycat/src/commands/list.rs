use copycat_format::{CatalogEntry, CatalogTree, FileInfo};

use crate::error::Result;
use crate::util::{format_checksum, format_size, format_time, link_target, unwrap_replaced};

fn format_path(path: String, entry: &CatalogEntry) -> String {
    match entry {
        CatalogEntry::Directory(_) | CatalogEntry::Container(_) => format!("{}/", path),
        CatalogEntry::Symlink(_) => format!("{} -> {}", path, link_target(entry).unwrap_or_default()),
        CatalogEntry::Hardlink(_) => format!("{} => {}", path, link_target(entry).unwrap_or_default()),
        _ => path,
    }
}

fn flag(info: Option<&FileInfo>) -> &'static str {
    match info {
        Some(info) if info.error => "  [!]",
        Some(info) if info.is_short() => "  [short]",
        _ => "",
    }
}

pub fn run(tree: &CatalogTree) -> Result<()> {
    println!(
        "{:10}  {:>12}  {:20}  {:8}  {:>6}  Path",
        "Kind", "Size", "Modified", "CRC-32", "Lines"
    );
    println!("{}", "-".repeat(80));

    let mut diagnostics = vec![];
    let mut files = 0u64;
    let mut total_size = 0u64;

    for item in tree.entries() {
        let entry = unwrap_replaced(item.entry);
        let info = entry.info();
        let path = item.path.to_string();

        let kind = if item.superseded {
            format!("~{}", entry.kind())
        } else {
            entry.kind().to_string()
        };
        let size = entry.size().map(format_size).unwrap_or_else(|| "-".into());
        let checksum = format_checksum(info).unwrap_or_else(|| "-".into());
        let lines = info
            .and_then(|info| info.lines)
            .map(|lines| lines.to_string())
            .unwrap_or_else(|| "-".into());
        let flag = flag(info);

        println!(
            "{:10}  {:>12}  {:20}  {:8}  {:>6}  {}{}",
            kind,
            size,
            format_time(entry.mtime()),
            checksum,
            lines,
            format_path(path.clone(), entry),
            flag,
        );

        if let Some(info) = info {
            if !item.superseded {
                files += 1;
                total_size += info.size;
            }
            diagnostics.extend(
                info.diagnostics
                    .iter()
                    .map(|message| format!("{}: {}", path, message)),
            );
        }
    }

    println!("{}", "-".repeat(80));
    println!("{:10}  {:>12}  {} files", "Total", format_size(total_size), files);

    if !diagnostics.is_empty() {
        println!();
        println!("Diagnostics:");
        for line in diagnostics {
            println!("  {}", line);
        }
    }

    Ok(())
}
