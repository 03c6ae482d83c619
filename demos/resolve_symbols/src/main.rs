use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::{PossibleValuesParser, ValueParser};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use profsym::common::{BinaryIdentity, LibraryInfo, Platform};
use profsym::resolve::{
    Capabilities, ResolverConfig, SymbolCache, SymbolResolutionPipeline, DEFAULT_SYMBOL_SERVER_URL,
};
use profsym::table::CompactSymbolTable;

fn load_config(matches: &ArgMatches) -> Result<ResolverConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ResolverConfig::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ResolverConfig::default(),
    };

    if let Some(url) = matches.get_one::<String>("symbol_server") {
        config.symbol_server_url = url.clone();
    }
    if let Some(dir) = matches.get_one::<String>("objdir_symbols_dir") {
        config.objdir_symbols_dir = dir.clone();
    }
    if let Some(program) = matches.get_one::<String>("nm") {
        config.nm_program = program.clone();
    }
    if let Some(program) = matches.get_one::<String>("dump_syms") {
        config.dump_syms_program = program.clone();
    }

    for source in matches.get_many::<String>("disable").unwrap_or_default() {
        match source.as_str() {
            "objdir" => config.sources.object_directory = false,
            "symbol-server" => config.sources.symbol_server = false,
            "nm" => config.sources.nm = false,
            "dump_syms" => config.sources.dump_syms = false,
            _ => (),
        }
    }

    Ok(config)
}

fn load_libraries(matches: &ArgMatches, identity: &BinaryIdentity) -> Result<Vec<LibraryInfo>> {
    let platform = matches
        .get_one::<Platform>("platform")
        .cloned()
        .unwrap_or_default();
    let arch = matches
        .get_one::<String>("arch")
        .map(String::as_str)
        .unwrap_or_default();

    let mut libraries = match matches.get_one::<PathBuf>("libraries") {
        Some(path) => {
            let json = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            LibraryInfo::from_host_json(&json, platform.clone(), arch)
                .context("failed to parse the library list")?
        }
        None => Vec::new(),
    };

    if let Some(path) = matches.get_one::<PathBuf>("path") {
        libraries.push(LibraryInfo::new(identity.clone(), platform, arch).with_path(path));
    }

    Ok(libraries)
}

fn parse_addr(addr: &str) -> Result<u64> {
    match addr.strip_prefix("0x") {
        Some(addr) => u64::from_str_radix(addr, 16),
        None => addr.parse(),
    }
    .context("unable to parse address")
}

fn print_table(table: &CompactSymbolTable, matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string(table)?);
        return Ok(());
    }

    let addrs: Vec<u64> = matches
        .get_many::<u64>("lookup")
        .unwrap_or_default()
        .copied()
        .collect();

    if addrs.is_empty() {
        for (address, name) in table {
            println!("{address:08x} {name}");
        }
        return Ok(());
    }

    for addr in addrs {
        match table.lookup(addr) {
            Some((address, name)) => {
                println!("{addr:#x}: {name} + {:#x}", addr - u64::from(address));
            }
            None => println!("{addr:#x}: ??"),
        }
    }

    Ok(())
}

async fn execute(matches: &ArgMatches) -> Result<()> {
    let debug_name = matches
        .get_one::<String>("debug_name")
        .context("missing debug name")?;
    let breakpad_id = matches
        .get_one::<String>("breakpad_id")
        .context("missing breakpad id")?;
    let identity = BinaryIdentity::new(debug_name.as_str(), breakpad_id.as_str());
    identity
        .debug_id()
        .with_context(|| format!("invalid breakpad id {breakpad_id}"))?;

    let config = load_config(matches)?;
    let pipeline = SymbolResolutionPipeline::from_config(
        &config,
        Capabilities::default(),
        Arc::new(SymbolCache::new()),
    );
    pipeline.prime_cache(load_libraries(matches, &identity)?);

    let resolved = match pipeline.resolve_symbols_detailed(&identity).await {
        Ok(resolved) => resolved,
        Err(error) => {
            for attempt in error.attempts() {
                eprintln!("  {}: {}", attempt.kind, attempt.error);
            }
            return Err(error.into());
        }
    };

    eprintln!(
        "{} symbols from {} ({} dropped)",
        resolved.table.len(),
        resolved.source,
        resolved.dropped_addresses
    );

    print_table(&resolved.table, matches)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("resolve_symbols")
        .about("Resolves the symbol table of a native binary")
        .arg(
            Arg::new("debug_name")
                .required(true)
                .value_name("debug-name")
                .help("Debug name of the binary, such as libxul.so or xul.pdb"),
        )
        .arg(
            Arg::new("breakpad_id")
                .required(true)
                .value_name("breakpad-id")
                .help("Breakpad identifier of the binary"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("file.json")
                .value_parser(value_parser!(PathBuf))
                .help("Load the resolver configuration from a JSON file"),
        )
        .arg(
            Arg::new("symbol_server")
                .long("symbol-server")
                .value_name("url")
                .help(format!(
                    "Base URL of the symbol server [default: {DEFAULT_SYMBOL_SERVER_URL}]"
                )),
        )
        .arg(
            Arg::new("objdir_symbols_dir")
                .long("objdir-symbols-dir")
                .value_name("dir")
                .help("Directory below an object directory's dist that holds symbol files"),
        )
        .arg(
            Arg::new("nm")
                .long("nm")
                .value_name("program")
                .help("The nm executable"),
        )
        .arg(
            Arg::new("dump_syms")
                .long("dump-syms")
                .value_name("program")
                .help("The dump_syms executable"),
        )
        .arg(
            Arg::new("disable")
                .long("disable")
                .value_name("source")
                .action(ArgAction::Append)
                .value_parser(PossibleValuesParser::new([
                    "objdir",
                    "symbol-server",
                    "nm",
                    "dump_syms",
                ]))
                .help("Do not consult a symbol source"),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .value_name("binary")
                .value_parser(value_parser!(PathBuf))
                .help("Local path of the binary, enabling the objdir, nm and dump_syms sources"),
        )
        .arg(
            Arg::new("libraries")
                .long("libraries")
                .value_name("file.json")
                .value_parser(value_parser!(PathBuf))
                .help("Shared library list reported by the profiler"),
        )
        .arg(
            Arg::new("platform")
                .long("platform")
                .value_name("os")
                .default_value(std::env::consts::OS)
                .value_parser(value_parser!(Platform))
                .help("Platform the libraries were loaded on"),
        )
        .arg(
            Arg::new("arch")
                .long("arch")
                .default_value(std::env::consts::ARCH)
                .help("CPU architecture of the libraries"),
        )
        .arg(
            Arg::new("lookup")
                .short('a')
                .long("lookup")
                .value_name("addr")
                .action(ArgAction::Append)
                .value_parser(ValueParser::new(parse_addr))
                .help("Print the symbol covering an address instead of the whole table"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the table as JSON arrays of addresses, name offsets and name bytes"),
        )
        .get_matches();

    if let Err(e) = execute(&matches).await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
