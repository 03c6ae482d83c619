use std::borrow::Cow;
use std::fmt;

use debugid::{DebugId, ParseDebugIdError};
use serde::{Deserialize, Serialize};

/// The suffix of Windows program databases, replaced by `.sym` in symbol file names.
const PDB_SUFFIX: &str = ".pdb";

/// Uniquely identifies one build of one binary across machines.
///
/// The identity consists of the `debug_name`, a file name such as `libxul.so` or `xul.pdb`, and
/// the `breakpad_id`, an opaque build signature in breakpad's format. Both are kept verbatim, since
/// they are spliced into symbol server URLs and object directory paths.
///
/// # Example
///
/// ```
/// use profsym_common::BinaryIdentity;
///
/// let identity = BinaryIdentity::new("xul.pdb", "44E4EC8C2F41492B9369D6B9A059577C2");
/// assert_eq!(identity.symbol_file_name(), "xul.sym");
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryIdentity {
    /// The file name of the debug file, possibly with a platform-specific suffix.
    pub debug_name: String,
    /// The breakpad build signature.
    pub breakpad_id: String,
}

impl BinaryIdentity {
    /// Creates a new identity from its two components.
    pub fn new<N, I>(debug_name: N, breakpad_id: I) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        BinaryIdentity {
            debug_name: debug_name.into(),
            breakpad_id: breakpad_id.into(),
        }
    }

    /// Parses the breakpad id into a [`DebugId`].
    ///
    /// This fails for identifiers that do not follow breakpad's format. Such identities can
    /// still be resolved, as the id is otherwise treated as an opaque string.
    pub fn debug_id(&self) -> Result<DebugId, ParseDebugIdError> {
        DebugId::from_breakpad(&self.breakpad_id)
    }

    /// Returns the name of the breakpad symbol file for this binary.
    ///
    /// A trailing `.pdb` is replaced by `.sym`. All other names get `.sym` appended, so that
    /// `libxul.so` maps to `libxul.so.sym`.
    pub fn symbol_file_name(&self) -> String {
        let stem = self
            .debug_name
            .strip_suffix(PDB_SUFFIX)
            .unwrap_or(&self.debug_name);
        format!("{stem}.sym")
    }

    /// Returns the path components under which symbol stores keep the symbol file.
    ///
    /// This is `[debug_name, breakpad_id, symbol_file_name]`, the layout shared by symbol servers
    /// and `crashreporter-symbols` directories.
    pub fn path_components(&self) -> [Cow<'_, str>; 3] {
        [
            Cow::Borrowed(self.debug_name.as_str()),
            Cow::Borrowed(self.breakpad_id.as_str()),
            Cow::Owned(self.symbol_file_name()),
        ]
    }
}

impl fmt::Display for BinaryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.debug_name, self.breakpad_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_file_name() {
        let pdb = BinaryIdentity::new("xul.pdb", "A");
        assert_eq!(pdb.symbol_file_name(), "xul.sym");

        let elf = BinaryIdentity::new("libxul.so", "A");
        assert_eq!(elf.symbol_file_name(), "libxul.so.sym");

        let macho = BinaryIdentity::new("XUL", "A");
        assert_eq!(macho.symbol_file_name(), "XUL.sym");
    }

    #[test]
    fn test_path_components() {
        let identity = BinaryIdentity::new("firefox.pdb", "C2B0A5B4D8A14B5D8F0CDE8E7A8F96C21");
        let components = identity.path_components();
        assert_eq!(
            components,
            [
                "firefox.pdb",
                "C2B0A5B4D8A14B5D8F0CDE8E7A8F96C21",
                "firefox.sym"
            ]
        );
    }

    #[test]
    fn test_debug_id() {
        let identity = BinaryIdentity::new("libc.so.6", "DFB85DE42DAFFD09640C8FE377D572DE0");
        let debug_id = identity.debug_id().unwrap();
        assert_eq!(
            debug_id.breakpad().to_string(),
            "DFB85DE42DAFFD09640C8FE377D572DE0"
        );

        let garbage = BinaryIdentity::new("libc.so.6", "not-an-id");
        assert!(garbage.debug_id().is_err());
    }

    #[test]
    fn test_serde_field_names() {
        let identity = BinaryIdentity::new("libmozglue.dylib", "1234");
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, r#"{"debugName":"libmozglue.dylib","breakpadId":"1234"}"#);
    }
}
