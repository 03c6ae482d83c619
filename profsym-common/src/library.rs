use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::BinaryIdentity;

/// The operating system a library was loaded on.
///
/// Hosts report their platform with inconsistent casing and naming (`"Darwin"`, `"WINNT"`,
/// `"linux"`). Parsing is case-insensitive and never fails: unrecognized names are preserved in
/// [`Platform::Unknown`].
///
/// ```
/// use profsym_common::Platform;
///
/// assert_eq!("Darwin".parse::<Platform>().unwrap(), Platform::MacOs);
/// assert_eq!("WINNT".parse::<Platform>().unwrap(), Platform::Windows);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    MacOs,
    /// Desktop Linux.
    Linux,
    /// Android. Libraries on Android devices never expose a local path.
    Android,
    /// Any other platform, with the name reported by the host.
    Unknown(String),
    /// The host did not report a platform.
    #[default]
    Unspecified,
}

impl Platform {
    /// Returns the canonical lowercase name of this platform.
    pub fn name(&self) -> &str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Android => "android",
            Platform::Unknown(name) => name,
            Platform::Unspecified => "",
        }
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "" => Platform::Unspecified,
            "windows" | "winnt" | "win32" => Platform::Windows,
            "macos" | "mac" | "darwin" | "macosx" => Platform::MacOs,
            "linux" => Platform::Linux,
            "android" => Platform::Android,
            other => Platform::Unknown(other.to_owned()),
        })
    }
}

impl From<String> for Platform {
    fn from(name: String) -> Self {
        match name.parse() {
            Ok(platform) => platform,
            Err(never) => match never {},
        }
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.name().to_owned()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hints about a loaded library, used to locate its symbols.
///
/// Produced once per profiling session from the host's shared library list. Only the identity is
/// required for resolution; the path, platform and architecture enable additional local symbol
/// sources.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LibraryInfo {
    /// The debug identity of the library.
    pub identity: BinaryIdentity,
    /// The absolute path of the binary on the local machine, if known.
    pub absolute_path: Option<PathBuf>,
    /// The platform the library was loaded on.
    pub platform: Platform,
    /// The CPU architecture name as reported by the host, such as `x86_64`.
    pub arch: String,
}

impl LibraryInfo {
    /// Creates library information without a local path.
    pub fn new(identity: BinaryIdentity, platform: Platform, arch: impl Into<String>) -> Self {
        LibraryInfo {
            identity,
            absolute_path: None,
            platform,
            arch: arch.into(),
        }
    }

    /// Sets the path of the binary.
    ///
    /// Relative paths, such as the bare library names reported by remote targets, are discarded
    /// since no local source can make use of them.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.absolute_path = path.is_absolute().then_some(path);
        self
    }

    /// Returns the absolute path of the binary, if known.
    pub fn absolute_path(&self) -> Option<&Path> {
        self.absolute_path.as_deref()
    }

    /// Parses the shared library list reported by the host profiler.
    ///
    /// The `platform` applies to all libraries, and `default_arch` is used for entries that do not
    /// carry an architecture. Besides current entries with `debugName` and `breakpadId`, this
    /// understands two legacy shapes:
    ///
    ///  - `name` and `breakpadId`, where the debug name is the file name of `name`.
    ///  - `pdbName`, `pdbSignature` and `pdbAge` on Windows. The breakpad id is the signature GUID
    ///    without braces and dashes, in uppercase, followed by the age.
    ///
    /// The path falls back to `name` if `path` is missing.
    pub fn from_host_json(
        json: &[u8],
        platform: Platform,
        default_arch: &str,
    ) -> Result<Vec<LibraryInfo>, LibraryInfoError> {
        let entries: Vec<HostLibrary> = serde_json::from_slice(json)?;

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_library_info(index, &platform, default_arch))
            .collect()
    }
}

/// An error returned when the host's library list cannot be interpreted.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LibraryInfoError {
    /// The library list is not valid JSON or has an unexpected shape.
    #[error("invalid shared library list")]
    InvalidJson(#[from] serde_json::Error),
    /// A library entry carries neither a breakpad id nor PDB signature information.
    #[error("shared library entry {0} has no debug identity")]
    MissingIdentity(usize),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PdbAge {
    Number(u64),
    Text(String),
}

impl fmt::Display for PdbAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdbAge::Number(age) => write!(f, "{age}"),
            PdbAge::Text(age) => f.write_str(age),
        }
    }
}

/// A shared library entry as reported by the host, in any of its historical shapes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostLibrary {
    debug_name: Option<String>,
    breakpad_id: Option<String>,
    name: Option<String>,
    path: Option<String>,
    arch: Option<String>,
    pdb_name: Option<String>,
    pdb_signature: Option<String>,
    pdb_age: Option<PdbAge>,
}

impl HostLibrary {
    fn into_library_info(
        self,
        index: usize,
        platform: &Platform,
        default_arch: &str,
    ) -> Result<LibraryInfo, LibraryInfoError> {
        let identity = match (self.breakpad_id, self.pdb_signature) {
            (Some(breakpad_id), _) => {
                let debug_name = match (self.debug_name, &self.name) {
                    (Some(debug_name), _) => debug_name,
                    (None, Some(name)) => file_name(name).to_owned(),
                    (None, None) => return Err(LibraryInfoError::MissingIdentity(index)),
                };
                BinaryIdentity::new(debug_name, breakpad_id)
            }
            (None, Some(signature)) => {
                let debug_name = self
                    .pdb_name
                    .or(self.debug_name)
                    .ok_or(LibraryInfoError::MissingIdentity(index))?;
                let mut breakpad_id: String = signature
                    .chars()
                    .filter(|c| !matches!(c, '{' | '}' | '-'))
                    .collect::<String>()
                    .to_ascii_uppercase();
                if let Some(age) = self.pdb_age {
                    breakpad_id.push_str(&age.to_string());
                }
                BinaryIdentity::new(debug_name, breakpad_id)
            }
            (None, None) => return Err(LibraryInfoError::MissingIdentity(index)),
        };

        let arch = self.arch.unwrap_or_else(|| default_arch.to_owned());
        let mut info = LibraryInfo::new(identity, platform.clone(), arch);
        if let Some(path) = self.path.or(self.name) {
            info = info.with_path(path);
        }

        Ok(info)
    }
}

/// Returns the last `/`-separated component of a host path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
