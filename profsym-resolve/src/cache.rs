use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use profsym_common::{BinaryIdentity, LibraryInfo};

type Libraries = HashMap<BinaryIdentity, LibraryInfo>;

/// Hints about the libraries of the current profiling session.
///
/// The cache is primed once per session with the host's list of loaded libraries. Resolution
/// only reads from it. Priming again replaces all previous entries at once: readers observe
/// either the old or the new set of libraries, never a mix of both.
#[derive(Debug, Default)]
pub struct SymbolCache {
    libraries: RwLock<Arc<Libraries>>,
}

impl SymbolCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all entries with `libraries`.
    ///
    /// If the list contains the same identity more than once, the last entry wins.
    pub fn prime<I>(&self, libraries: I)
    where
        I: IntoIterator<Item = LibraryInfo>,
    {
        let libraries: Libraries = libraries
            .into_iter()
            .map(|info| (info.identity.clone(), info))
            .collect();

        tracing::debug!(libraries = libraries.len(), "primed symbol cache");
        *self.libraries.write() = Arc::new(libraries);
    }

    /// Returns the hints for the given binary.
    pub fn get(&self, identity: &BinaryIdentity) -> Option<LibraryInfo> {
        self.libraries.read().get(identity).cloned()
    }

    /// Returns a consistent view of all current entries.
    pub fn snapshot(&self) -> Arc<HashMap<BinaryIdentity, LibraryInfo>> {
        self.libraries.read().clone()
    }

    /// Returns the number of libraries in the cache.
    pub fn len(&self) -> usize {
        self.libraries.read().len()
    }

    /// Returns `true` if the cache has not been primed or was primed with no libraries.
    pub fn is_empty(&self) -> bool {
        self.libraries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use profsym_common::Platform;

    fn library(name: &str, arch: &str) -> LibraryInfo {
        LibraryInfo::new(BinaryIdentity::new(name, "ABCD0"), Platform::Linux, arch)
    }

    #[test]
    fn test_prime_replaces() {
        let cache = SymbolCache::new();
        cache.prime(vec![library("libxul.so", "x86_64"), library("libc.so.6", "x86_64")]);
        assert_eq!(cache.len(), 2);

        cache.prime(vec![library("libnss3.so", "x86_64")]);
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&BinaryIdentity::new("libxul.so", "ABCD0"))
            .is_none());
        assert!(cache
            .get(&BinaryIdentity::new("libnss3.so", "ABCD0"))
            .is_some());
    }

    #[test]
    fn test_duplicate_identity_last_wins() {
        let cache = SymbolCache::new();
        cache.prime(vec![library("libxul.so", "x86"), library("libxul.so", "arm64")]);

        let info = cache.get(&BinaryIdentity::new("libxul.so", "ABCD0")).unwrap();
        assert_eq!(info.arch, "arm64");
    }

    #[test]
    fn test_snapshot_is_stable() {
        let cache = SymbolCache::new();
        cache.prime(vec![library("libxul.so", "x86_64")]);
        let snapshot = cache.snapshot();

        cache.prime(Vec::new());
        assert!(cache.is_empty());
        assert_eq!(snapshot.len(), 1);
    }
}
