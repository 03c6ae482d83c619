//! Runs the tool based sources against shell scripts standing in for `nm` and `dump_syms`.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{const_mutex, Mutex};
use similar_asserts::assert_eq;

use profsym_common::{BinaryIdentity, LibraryInfo, Platform};
use profsym_resolve::sources::{DumpSymsSource, NmSource};
use profsym_resolve::{
    Capabilities, FetchError, FetchResponse, ProcessToolRunner, ResolverConfig, SourceErrorKind,
    SourceKind, SymbolCache, SymbolData, SymbolFetcher, SymbolResolutionPipeline, SymbolSource,
};
use profsym_testutils::fixture;

/// Serializes tests, so that no script is executed while another test still holds it open for
/// writing.
static TOOLS_LOCK: Mutex<()> = const_mutex(());

const DEMO_ID: &str = "DFB85DE42DAFFD09640C8FE377D572DE0";

fn demo_identity() -> BinaryIdentity {
    BinaryIdentity::new("libdemo.so", DEMO_ID)
}

fn write_tool(dir: &Path, name: &str, script: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_str().unwrap().to_owned()
}

fn linux_library(path: &str) -> LibraryInfo {
    LibraryInfo::new(demo_identity(), Platform::Linux, "x86_64").with_path(path)
}

const NM_SCRIPT: &str = r#"
case "$1" in
  -D)
    printf '00000000000011a0 T demo_exported_api\n'
    printf '                 U abort@GLIBC_2.2.5\n'
    ;;
  *)
    printf '0000000000001000 T _init\n'
    printf '0000000000001100 T main\n'
    printf '0000000000002000 T %s\n' "$2"
    ;;
esac
"#;

#[tokio::test]
async fn test_nm_combines_both_runs() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let nm = write_tool(dir.path(), "nm", NM_SCRIPT);

    let source = NmSource::new(Arc::new(ProcessToolRunner), nm);
    let hints = linux_library("/usr/lib/libdemo.so");
    let data = source
        .attempt(&demo_identity(), Some(&hints))
        .await
        .unwrap();

    let SymbolData::Symbols(symbols) = data else {
        panic!("expected decoded symbols");
    };

    let mut entries: Vec<_> = symbols.iter().collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            (0x1000, "_init"),
            (0x1100, "main"),
            (0x11a0, "demo_exported_api"),
            (0x2000, "/usr/lib/libdemo.so"),
        ]
    );
}

#[tokio::test]
async fn test_nm_exit_code() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let nm = write_tool(
        dir.path(),
        "nm",
        "printf '0000000000001000 T _init\\n'\nexit 3",
    );

    let source = NmSource::new(Arc::new(ProcessToolRunner), nm);
    let hints = linux_library("/usr/lib/libdemo.so");
    let error = source
        .attempt(&demo_identity(), Some(&hints))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SourceErrorKind::Failed);
}

#[tokio::test]
async fn test_nm_dynamic_run_fails() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let nm = write_tool(
        dir.path(),
        "nm",
        "[ \"$1\" = -D ] && exit 1\nprintf '0000000000001000 T _init\\n'",
    );

    let source = NmSource::new(Arc::new(ProcessToolRunner), nm);
    let hints = linux_library("/usr/lib/libdemo.so");
    let error = source
        .attempt(&demo_identity(), Some(&hints))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SourceErrorKind::Failed);
}

#[tokio::test]
async fn test_nm_without_symbols() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let nm = write_tool(dir.path(), "nm", "printf '                 U abort\\n'");

    let source = NmSource::new(Arc::new(ProcessToolRunner), nm);
    let hints = linux_library("/usr/lib/libdemo.so");
    let error = source
        .attempt(&demo_identity(), Some(&hints))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SourceErrorKind::NotFound);
}

#[tokio::test]
async fn test_nm_missing_executable() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nm").to_str().unwrap().to_owned();

    let source = NmSource::new(Arc::new(ProcessToolRunner), missing);
    let hints = linux_library("/usr/lib/libdemo.so");
    let error = source
        .attempt(&demo_identity(), Some(&hints))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
}

#[tokio::test]
async fn test_dump_syms_exit_code() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let dump_syms = write_tool(dir.path(), "dump_syms", "exit 1");

    let source = DumpSymsSource::new(Arc::new(ProcessToolRunner), dump_syms);
    let hints = linux_library("/usr/lib/libdemo.so");
    let error = source
        .attempt(&demo_identity(), Some(&hints))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SourceErrorKind::Failed);
}

/// A fetcher for machines without network access.
struct Offline;

#[async_trait]
impl SymbolFetcher for Offline {
    async fn fetch(&self, _url: &str) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse::NotFound)
    }
}

fn sym_fixture() -> PathBuf {
    fixture("linux/libdemo.so.sym")
}

#[tokio::test]
async fn test_pipeline_falls_back_to_dump_syms() {
    let _guard = TOOLS_LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let nm = write_tool(dir.path(), "nm", "exit 2");
    let dump_syms = write_tool(
        dir.path(),
        "dump_syms",
        &format!(
            "[ \"$1\" = -a ] && [ \"$2\" = arm64 ] || exit 2\ncat '{}'",
            sym_fixture().display()
        ),
    );

    let config = ResolverConfig {
        nm_program: nm,
        dump_syms_program: dump_syms,
        ..ResolverConfig::default()
    };
    let pipeline = SymbolResolutionPipeline::from_config(
        &config,
        Capabilities::new(Arc::new(Offline)),
        Arc::new(SymbolCache::new()),
    );

    let binary = "/Applications/Demo.app/Contents/MacOS/libdemo.so";
    let library = LibraryInfo::new(demo_identity(), Platform::MacOs, "arm64").with_path(binary);
    pipeline.prime_cache(vec![library]);

    let resolved = pipeline
        .resolve_symbols_detailed(&demo_identity())
        .await
        .unwrap();

    assert_eq!(resolved.source, SourceKind::DumpSyms);
    assert_eq!(resolved.table.len(), 6);
    assert_eq!(
        resolved.table.lookup(0x1075),
        Some((0x1070, "demo::Engine::run() const"))
    );
}
