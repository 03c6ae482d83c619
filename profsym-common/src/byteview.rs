//! A wrapper type providing direct memory access to symbol dumps.
//!
//! See the [`ByteView`] struct for more documentation.

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

/// The owner of data behind a ByteView.
#[derive(Debug)]
enum ByteViewBacking<'a> {
    Buf(Cow<'a, [u8]>),
    Mmap(Mmap),
}

impl Deref for ByteViewBacking<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        match *self {
            ByteViewBacking::Buf(ref buf) => buf,
            ByteViewBacking::Mmap(ref mmap) => mmap,
        }
    }
}

/// A cheaply clonable smart pointer for symbol dump bytes.
///
/// Symbol dumps for large binaries easily reach several gigabytes. Dumps read from disk are
/// therefore memory mapped instead of copied onto the heap, while dumps downloaded from a symbol
/// server or collected from a tool's standard output are kept in an owned buffer. Either way, a
/// `ByteView` dereferences into `&[u8]`.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use profsym_common::ByteView;
///
/// fn main() -> Result<(), std::io::Error> {
///     let mut file = tempfile::NamedTempFile::new()?;
///     file.write_all(b"PUBLIC 1000 0 main\n")?;
///
///     let view = ByteView::open(file.path())?;
///     assert_eq!(view.as_slice(), b"PUBLIC 1000 0 main\n");
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ByteView<'a> {
    backing: Arc<ByteViewBacking<'a>>,
}

impl<'a> ByteView<'a> {
    fn with_backing(backing: ByteViewBacking<'a>) -> Self {
        ByteView {
            backing: Arc::new(backing),
        }
    }

    /// Constructs a `ByteView` that owns the given bytes.
    ///
    /// ```
    /// use profsym_common::ByteView;
    ///
    /// let view = ByteView::from_vec(b"FUNC 10 4 0 f".to_vec());
    /// assert_eq!(view.len(), 13);
    /// ```
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        ByteView::with_backing(ByteViewBacking::Buf(Cow::Owned(buffer)))
    }

    /// Memory maps an open file handle.
    ///
    /// Empty files cannot be mapped on all platforms, so they produce an empty view instead.
    pub fn map_file(file: File) -> Result<Self, io::Error> {
        let backing = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => ByteViewBacking::Mmap(mmap),
            Err(err) => {
                // Raised for empty mappings. 1006 is the Windows flavor of the same condition.
                if err.kind() == io::ErrorKind::InvalidInput
                    || (cfg!(windows) && err.raw_os_error() == Some(1006))
                {
                    ByteViewBacking::Buf(Cow::Borrowed(b""))
                } else {
                    return Err(err);
                }
            }
        };

        Ok(ByteView::with_backing(backing))
    }

    /// Opens and memory maps the file at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        Self::map_file(file)
    }

    /// Returns a slice of the underlying data.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        self.backing.deref()
    }

    /// Returns `true` if the data is memory mapped from a file.
    pub fn is_mapped(&self) -> bool {
        matches!(*self.backing, ByteViewBacking::Mmap(_))
    }
}

impl From<Vec<u8>> for ByteView<'static> {
    fn from(buffer: Vec<u8>) -> Self {
        ByteView::from_vec(buffer)
    }
}

impl AsRef<[u8]> for ByteView<'_> {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Deref for ByteView<'_> {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}
