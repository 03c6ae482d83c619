//! Test helpers for `profsym`.
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

/// Returns the full path to the specified fixture.
///
/// Fixtures are stored in the `profsym-testutils/fixtures` directory and paths should be given
/// relative to that location.
///
/// # Example
///
/// ```
/// use profsym_testutils::fixture;
///
/// let path = fixture("linux/libdemo.so.sym");
/// assert!(path.ends_with("linux/libdemo.so.sym"));
/// ```
pub fn fixture<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut full_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    full_path.push("fixtures");
    full_path.push(path.as_ref());

    assert!(
        full_path.exists(),
        "Fixture does not exist: {}",
        full_path.display()
    );

    full_path
}

/// Reads the specified fixture into memory.
///
/// Panics if the fixture does not exist or cannot be read.
pub fn read_fixture<P: AsRef<Path>>(path: P) -> Vec<u8> {
    let full_path = fixture(path);
    match std::fs::read(&full_path) {
        Ok(data) => data,
        Err(error) => panic!("Cannot read fixture {}: {}", full_path.display(), error),
    }
}
