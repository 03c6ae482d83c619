use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The symbol server queried by default.
pub const DEFAULT_SYMBOL_SERVER_URL: &str = "https://symbols.mozilla.org/";

/// The directory below `dist` in which `mach buildsymbols` stores symbol files.
pub const DEFAULT_OBJDIR_SYMBOLS_DIR: &str = "crashreporter-symbols";

/// An error returned when a configuration file cannot be loaded.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file cannot be read.
    #[error("failed to read config file")]
    Io(#[from] io::Error),
    /// The configuration is not valid JSON or contains unknown fields.
    #[error("invalid config")]
    Json(#[from] serde_json::Error),
}

/// Switches for the individual symbol sources.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// Read symbol dumps from the object directory of a local build.
    pub object_directory: bool,
    /// Download symbol dumps from the symbol server.
    pub symbol_server: bool,
    /// Run `nm` on Linux binaries.
    pub nm: bool,
    /// Run `dump_syms` on Linux and macOS binaries.
    pub dump_syms: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            object_directory: true,
            symbol_server: true,
            nm: true,
            dump_syms: true,
        }
    }
}

/// Configuration of a [`SymbolResolutionPipeline`](crate::SymbolResolutionPipeline).
///
/// All fields have defaults, so a configuration file only needs to list deviations:
///
/// ```
/// use profsym_resolve::ResolverConfig;
///
/// let config = ResolverConfig::from_json(br#"{
///     "symbol_server_url": "https://symbols.example.org/",
///     "sources": { "dump_syms": false }
/// }"#).unwrap();
///
/// assert_eq!(config.nm_program, "nm");
/// assert!(config.sources.nm);
/// assert!(!config.sources.dump_syms);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Base URL of the symbol server.
    pub symbol_server_url: String,
    /// Directory below an object directory's `dist` that holds symbol files.
    pub objdir_symbols_dir: String,
    /// The `nm` executable.
    pub nm_program: String,
    /// The `dump_syms` executable.
    pub dump_syms_program: String,
    /// Which sources are consulted.
    pub sources: SourcesConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            symbol_server_url: DEFAULT_SYMBOL_SERVER_URL.to_owned(),
            objdir_symbols_dir: DEFAULT_OBJDIR_SYMBOLS_DIR.to_owned(),
            nm_program: "nm".to_owned(),
            dump_syms_program: "dump_syms".to_owned(),
            sources: SourcesConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Loads a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::from_json(b"{}").unwrap();
        insta::assert_debug_snapshot!(config, @r###"
        ResolverConfig {
            symbol_server_url: "https://symbols.mozilla.org/",
            objdir_symbols_dir: "crashreporter-symbols",
            nm_program: "nm",
            dump_syms_program: "dump_syms",
            sources: SourcesConfig {
                object_directory: true,
                symbol_server: true,
                nm: true,
                dump_syms: true,
            },
        }
        "###);
    }

    #[test]
    fn test_unknown_field() {
        let error = ResolverConfig::from_json(br#"{ "nm": "llvm-nm" }"#).unwrap_err();
        assert!(matches!(error, ConfigError::Json(_)));
    }

    #[test]
    fn test_from_path_missing() {
        let dir = tempfile::tempdir().unwrap();
        let error = ResolverConfig::from_path(dir.path().join("profsym.json")).unwrap_err();
        assert!(matches!(error, ConfigError::Io(_)));
    }
}
