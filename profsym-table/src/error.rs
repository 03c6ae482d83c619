use thiserror::Error;

/// An error returned when a [`CompactSymbolTable`](crate::CompactSymbolTable) cannot be built.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TableError {
    /// The packed names do not fit into 32-bit offsets.
    #[error("symbol names exceed {} bytes", u32::MAX)]
    NameBufferTooLarge,
    /// The offset array does not have exactly one more entry than the address array.
    #[error("expected {expected} name offsets, found {found}")]
    OffsetCountMismatch {
        /// The number of addresses plus one.
        expected: usize,
        /// The number of offsets.
        found: usize,
    },
    /// Addresses are not strictly ascending.
    #[error("address at index {0} is not greater than its predecessor")]
    UnsortedAddresses(usize),
    /// A name's offsets are decreasing or point outside of the name buffer.
    #[error("invalid name range at index {0}")]
    InvalidNameRange(usize),
    /// The final offset does not match the length of the name buffer.
    #[error("final name offset does not match the name buffer length")]
    SentinelMismatch,
    /// A name is not valid UTF-8.
    #[error("name at index {0} is not valid UTF-8")]
    InvalidName(usize),
}
