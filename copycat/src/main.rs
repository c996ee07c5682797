mod catalog;
mod commands;
mod error;
mod processor;
mod util;

use std::path::PathBuf;

use copycat_format::CatalogContext;
use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing::Level;

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "list",
        visible_alias = "l",
        about = "Catalog inputs and print the entries as a table"
    )]
    List,

    #[structopt(
        name = "dump",
        visible_alias = "d",
        about = "Catalog inputs and print the entries as JSON"
    )]
    Dump {
        #[structopt(short, long, help = "Pretty-print the JSON output")]
        pretty: bool,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "copycat",
    about = "Catalog files, directories and tar archives, including archives inside archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands],
    usage = "copycat (list|dump) [FLAGS|OPTIONS] <inputs>..."
)]
struct CliOpts {
    #[structopt(
        short,
        long,
        parse(from_occurrences),
        help = "Log more; repeat for more detail",
        global = true
    )]
    verbose: u8,

    #[structopt(
        long,
        help = "Bytes of archive held in memory at once [default: 1048576]",
        global = true
    )]
    window: Option<usize>,

    #[structopt(long, help = "Do not compute CRC-32 checksums", global = true)]
    no_checksum: bool,

    #[structopt(long, help = "Do not count lines of text files", global = true)]
    no_lines: bool,

    #[structopt(long, help = "Do not catalog archives inside archives", global = true)]
    no_recurse: bool,

    #[structopt(
        long,
        help = "How many archives deep to catalog [default: 8]",
        global = true
    )]
    max_depth: Option<usize>,

    #[structopt(
        long,
        help = "How many hardlinks to follow when resolving a link [default: 16]",
        global = true
    )]
    max_link_hops: Option<usize>,

    #[structopt(subcommand)]
    cmd: Commands,

    #[structopt(
        name = "inputs",
        parse(from_os_str),
        help = "Files, directories and tar archives to catalog",
        global = true
    )]
    inputs: Vec<PathBuf>,
}

impl CliOpts {
    fn context(&self) -> CatalogContext {
        let mut ctx = CatalogContext::new()
            .checksums(!self.no_checksum)
            .line_counts(!self.no_lines)
            .recurse(!self.no_recurse);
        if let Some(window) = self.window {
            ctx = ctx.window_capacity(window);
        }
        if let Some(max_depth) = self.max_depth {
            ctx = ctx.max_depth(max_depth);
        }
        if let Some(max_link_hops) = self.max_link_hops {
            ctx = ctx.max_link_hops(max_link_hops);
        }
        ctx
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let opts = CliOpts::from_iter(wild::args_os());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(opts.log_level())
        .init();

    let ctx = opts.context();
    let tree = catalog::catalog_inputs(&ctx, &opts.inputs)?;

    match opts.cmd {
        Commands::List => commands::list(&tree)?,
        Commands::Dump { pretty } => commands::dump(&tree, pretty)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_reach_the_context() {
        let opts = CliOpts::from_iter(&[
            "copycat",
            "list",
            "--max-link-hops",
            "2",
            "--window",
            "4096",
            "--no-checksum",
            "input.tar",
        ]);
        let ctx = opts.context();
        assert_eq!(ctx.max_link_hops, 2);
        assert_eq!(ctx.window_capacity, 4096);
        assert!(!ctx.checksums);
        assert!(ctx.line_counts);
        assert_eq!(opts.inputs, vec![PathBuf::from("input.tar")]);
    }
}
