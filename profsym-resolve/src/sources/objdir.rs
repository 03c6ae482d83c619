use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use profsym_common::{BinaryIdentity, LibraryInfo};
use profsym_parse::DumpFormat;

use super::{absolute_path, SourceKind, SymbolData, SymbolSource};
use crate::capabilities::FileReader;
use crate::error::{SourceError, SourceErrorKind};

/// Returns the `dist` directory of the object directory containing `binary`.
///
/// Builds place binaries either below `<objdir>/dist` or, for test harnesses, in `<objdir>/bin`.
/// The closest ancestor named `dist` is returned as is. For the closest ancestor named `bin`, its
/// sibling `dist` is not required to exist, and the parent of `bin` is returned instead.
///
/// ```
/// use std::path::Path;
/// use profsym_resolve::sources::objdir_dist;
///
/// let binary = Path::new("/src/obj-ff/dist/bin/libxul.so");
/// assert_eq!(objdir_dist(binary), Some(Path::new("/src/obj-ff/dist")));
/// ```
pub fn objdir_dist(binary: &Path) -> Option<&Path> {
    for ancestor in binary.ancestors() {
        match ancestor.file_name().and_then(OsStr::to_str) {
            Some("dist") => return Some(ancestor),
            Some("bin") => return ancestor.parent(),
            _ => (),
        }
    }

    None
}

/// Reads symbol files that `mach buildsymbols` stored in the object directory of a local build.
///
/// Symbol files are located at
/// `<dist>/crashreporter-symbols/<debug_name>/<breakpad_id>/<symbol_file_name>`.
pub struct ObjectDirectorySource {
    files: Arc<dyn FileReader>,
    symbols_dir: String,
}

impl ObjectDirectorySource {
    /// Creates a source that looks for symbols in the given subdirectory of `dist`.
    pub fn new(files: Arc<dyn FileReader>, symbols_dir: impl Into<String>) -> Self {
        ObjectDirectorySource {
            files,
            symbols_dir: symbols_dir.into(),
        }
    }

    /// Returns the path of the symbol file for a binary, if it is part of an object directory.
    pub fn symbol_file_path(&self, binary: &Path, identity: &BinaryIdentity) -> Option<PathBuf> {
        let mut path = objdir_dist(binary)?.join(&self.symbols_dir);
        for component in identity.path_components() {
            path.push(component.as_ref());
        }
        Some(path)
    }
}

#[async_trait]
impl SymbolSource for ObjectDirectorySource {
    fn kind(&self) -> SourceKind {
        SourceKind::ObjectDirectory
    }

    fn is_applicable(&self, hints: Option<&LibraryInfo>) -> bool {
        absolute_path(hints).is_some()
    }

    #[tracing::instrument(name = "objdir", level = "trace", skip_all, fields(identity = %identity))]
    async fn attempt(
        &self,
        identity: &BinaryIdentity,
        hints: Option<&LibraryInfo>,
    ) -> Result<SymbolData, SourceError> {
        let binary = absolute_path(hints).ok_or(SourceErrorKind::Unavailable)?;
        let path = self.symbol_file_path(binary, identity).ok_or_else(|| {
            let message = format!("{} is not part of an object directory", binary.display());
            SourceError::new(SourceErrorKind::NotFound, message)
        })?;

        tracing::trace!(path = %path.display(), "reading symbol file");
        let data = self.files.read(&path).await.map_err(|e| {
            let kind = match e.kind() {
                io::ErrorKind::NotFound => SourceErrorKind::NotFound,
                _ => SourceErrorKind::Failed,
            };
            SourceError::new(kind, e)
        })?;

        Ok(SymbolData::Dump(data, DumpFormat::Breakpad))
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    #[test]
    fn test_objdir_dist() {
        assert_eq!(
            objdir_dist(Path::new("/obj/dist/bin/firefox")),
            Some(Path::new("/obj/dist"))
        );
        assert_eq!(
            objdir_dist(Path::new("/obj/bin/xpcshell")),
            Some(Path::new("/obj"))
        );
        assert_eq!(
            objdir_dist(Path::new("/obj/dist/Nightly.app/Contents/MacOS/XUL")),
            Some(Path::new("/obj/dist"))
        );
        assert_eq!(objdir_dist(Path::new("/usr/lib/libc.so.6")), None);
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        assert_eq!(
            objdir_dist(Path::new("/home/dist/obj/bin/firefox")),
            Some(Path::new("/home/dist/obj"))
        );
    }

    #[test]
    fn test_symbol_file_path() {
        let source = ObjectDirectorySource::new(Arc::new(crate::LocalFileReader), "syms");
        let identity = BinaryIdentity::new("xul.pdb", "ABCD1");

        assert_eq!(
            source.symbol_file_path(Path::new("/obj/dist/bin/xul.dll"), &identity),
            Some(PathBuf::from("/obj/dist/syms/xul.pdb/ABCD1/xul.sym"))
        );
    }
}
