use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::ValueParser;
use clap::{value_parser, Arg, ArgMatches, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uwuranges::{ArangeTable, ArangeTables};

fn print_table(offset: usize, table: &ArangeTable) {
    let header = &table.header;
    println!(
        "Address Range Header: offset = 0x{:08x}, length = 0x{:08x}, format = {}, version = 0x{:04x}, cu_offset = 0x{:08x}, addr_size = 0x{:02x}, seg_size = 0x{:02x}",
        offset,
        header.unit_length,
        if header.is_64_bit() { "DWARF64" } else { "DWARF32" },
        header.version,
        header.debug_info_offset,
        header.address_size,
        header.segment_size,
    );

    for range in &table.ranges {
        if header.segment_size != 0 {
            println!(
                "[0x{:016x}, 0x{:016x}) segment 0x{:x}",
                range.address,
                range.end(),
                range.segment
            );
        } else {
            println!("[0x{:016x}, 0x{:016x})", range.address, range.end());
        }
    }
}

fn dump(path: &Path, start: usize) -> Result<()> {
    let section = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    tracing::debug!(len = section.len(), start, "read section");

    println!(".debug_aranges");

    let mut tables = ArangeTables::new(&section, start);
    loop {
        let offset = tables.offset();
        let Some(table) = tables.next() else {
            break;
        };
        let table = table.with_context(|| format!("failed to decode table at 0x{offset:x}"))?;
        print_table(offset, &table);
    }

    Ok(())
}

fn execute(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("path")
        .context("missing section path")?;
    let start = matches.get_one::<usize>("offset").copied().unwrap_or(0);
    dump(path, start)
}

fn parse_offset(offset: &str) -> Result<usize> {
    match offset.strip_prefix("0x") {
        Some(offset) => usize::from_str_radix(offset, 16),
        None => offset.parse(),
    }
    .context("unable to parse offset")
}

fn main() {
    let registry = tracing_subscriber::Registry::default().with(
        EnvFilter::builder()
            .with_default_directive(tracing::Level::WARN.into())
            .from_env_lossy(),
    );

    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true);

    registry.with(tree_layer).init();

    let matches = Command::new("aranges-dump")
        .about("Prints the address range tables of a raw .debug_aranges section, e.g. one extracted with `objcopy -O binary --only-section=.debug_aranges`.")
        .arg(
            Arg::new("path")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the raw section contents."),
        )
        .arg(
            Arg::new("offset")
                .short('o')
                .long("offset")
                .value_parser(ValueParser::new(parse_offset))
                .help("Offset of the first table to decode, decimal or 0x-prefixed hex. Defaults to 0."),
        )
        .get_matches();

    if let Err(e) = execute(&matches) {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
