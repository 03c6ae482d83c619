use std::str;

use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::error::TableError;

/// A sorted table of symbols, stored as three co-indexed arrays.
///
/// For `N` symbols, the table consists of:
///
///  - `addresses`: `N` addresses relative to the image base, strictly ascending.
///  - `name_offsets`: `N + 1` positions in `name_bytes`. The name of the symbol at `addresses[i]`
///    is `name_bytes[name_offsets[i]..name_offsets[i + 1]]`, and the final offset equals the
///    length of `name_bytes`.
///  - `name_bytes`: all names as UTF-8, concatenated in address order.
///
/// This layout is exchanged with profilers as-is. It serializes as a tuple of the three arrays, in
/// the order listed above.
///
/// # Example
///
/// ```
/// use profsym_table::CompactSymbolTable;
///
/// let table = CompactSymbolTable::from_parts(
///     vec![0x1000, 0x2000],
///     vec![0, 3, 6],
///     b"foobar".to_vec(),
/// )
/// .unwrap();
///
/// assert_eq!(table.get(1), Some((0x2000, "bar")));
/// assert_eq!(table.lookup(0x1abc), Some((0x1000, "foo")));
/// ```
#[derive(Clone, Default, Eq, PartialEq)]
pub struct CompactSymbolTable {
    addresses: Vec<u32>,
    name_offsets: Vec<u32>,
    name_bytes: Vec<u8>,
}

impl CompactSymbolTable {
    /// Builds a table from its three arrays and validates their layout.
    pub fn from_parts(
        addresses: Vec<u32>,
        name_offsets: Vec<u32>,
        name_bytes: Vec<u8>,
    ) -> Result<Self, TableError> {
        if name_offsets.len() != addresses.len() + 1 {
            return Err(TableError::OffsetCountMismatch {
                expected: addresses.len() + 1,
                found: name_offsets.len(),
            });
        }

        if u32::try_from(name_bytes.len()).is_err() {
            return Err(TableError::NameBufferTooLarge);
        }

        if let Some(index) = addresses.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(TableError::UnsortedAddresses(index + 1));
        }

        for (index, range) in name_offsets.windows(2).enumerate() {
            let (start, end) = (range[0] as usize, range[1] as usize);
            let name = name_bytes
                .get(start..end)
                .ok_or(TableError::InvalidNameRange(index))?;
            if str::from_utf8(name).is_err() {
                return Err(TableError::InvalidName(index));
            }
        }

        if name_offsets.last().map(|last| *last as usize) != Some(name_bytes.len()) {
            return Err(TableError::SentinelMismatch);
        }

        Ok(Self::from_parts_unchecked(addresses, name_offsets, name_bytes))
    }

    /// Assembles a table from arrays that are known to be valid.
    pub(crate) fn from_parts_unchecked(
        addresses: Vec<u32>,
        name_offsets: Vec<u32>,
        name_bytes: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(name_offsets.len(), addresses.len() + 1);
        CompactSymbolTable {
            addresses,
            name_offsets,
            name_bytes,
        }
    }

    /// Decomposes the table into its address, name offset and name byte arrays.
    pub fn into_parts(self) -> (Vec<u32>, Vec<u32>, Vec<u8>) {
        (self.addresses, self.name_offsets, self.name_bytes)
    }

    /// The sorted symbol addresses.
    pub fn addresses(&self) -> &[u32] {
        &self.addresses
    }

    /// The start offset of every name, followed by the total name length.
    pub fn name_offsets(&self) -> &[u32] {
        &self.name_offsets
    }

    /// The packed names.
    pub fn name_bytes(&self) -> &[u8] {
        &self.name_bytes
    }

    /// Returns the number of symbols.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns `true` if the table contains no symbols.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Returns the address and name of the symbol at `index`.
    pub fn get(&self, index: usize) -> Option<(u32, &str)> {
        let address = *self.addresses.get(index)?;
        let start = *self.name_offsets.get(index)? as usize;
        let end = *self.name_offsets.get(index + 1)? as usize;
        let name = str::from_utf8(self.name_bytes.get(start..end)?).ok()?;
        Some((address, name))
    }

    /// Returns the symbol covering `address`.
    ///
    /// This is the symbol with the greatest address that is less than or equal to `address`.
    /// Symbols carry no size, so every address past the last symbol resolves to it.
    pub fn lookup(&self, address: u64) -> Option<(u32, &str)> {
        let index = self
            .addresses
            .partition_point(|candidate| u64::from(*candidate) <= address);
        self.get(index.checked_sub(1)?)
    }

    /// Iterates all symbols in ascending address order.
    pub fn iter(&self) -> Symbols<'_> {
        Symbols {
            table: self,
            index: 0,
        }
    }
}

impl std::fmt::Debug for CompactSymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactSymbolTable")
            .field("symbols", &self.len())
            .field("name_bytes", &self.name_bytes.len())
            .finish()
    }
}

impl Serialize for CompactSymbolTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.addresses)?;
        tuple.serialize_element(&self.name_offsets)?;
        tuple.serialize_element(&self.name_bytes)?;
        tuple.end()
    }
}

impl<'a> IntoIterator for &'a CompactSymbolTable {
    type Item = (u32, &'a str);
    type IntoIter = Symbols<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the symbols of a [`CompactSymbolTable`].
#[derive(Clone, Debug)]
pub struct Symbols<'a> {
    table: &'a CompactSymbolTable,
    index: usize,
}

impl<'a> Iterator for Symbols<'a> {
    type Item = (u32, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let symbol = self.table.get(self.index)?;
        self.index += 1;
        Some(symbol)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Symbols<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompactSymbolTable {
        CompactSymbolTable::from_parts(
            vec![0x10, 0x20, 0x30],
            vec![0, 3, 3, 8],
            b"fooquux!".to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_get() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some((0x10, "foo")));
        assert_eq!(table.get(1), Some((0x20, "")));
        assert_eq!(table.get(2), Some((0x30, "quux!")));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_lookup() {
        let table = sample();
        assert_eq!(table.lookup(0x0f), None);
        assert_eq!(table.lookup(0x10), Some((0x10, "foo")));
        assert_eq!(table.lookup(0x2f), Some((0x20, "")));
        assert_eq!(table.lookup(u64::MAX), Some((0x30, "quux!")));
    }

    #[test]
    fn test_empty() {
        let table = CompactSymbolTable::from_parts(vec![], vec![0], vec![]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.lookup(0), None);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_from_parts_invalid() {
        assert_eq!(
            CompactSymbolTable::from_parts(vec![1], vec![0], vec![]),
            Err(TableError::OffsetCountMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            CompactSymbolTable::from_parts(vec![2, 2], vec![0, 0, 0], vec![]),
            Err(TableError::UnsortedAddresses(1))
        );
        assert_eq!(
            CompactSymbolTable::from_parts(vec![1, 2], vec![0, 2, 1], b"ab".to_vec()),
            Err(TableError::InvalidNameRange(1))
        );
        assert_eq!(
            CompactSymbolTable::from_parts(vec![1], vec![0, 1], b"ab".to_vec()),
            Err(TableError::SentinelMismatch)
        );
        assert_eq!(
            CompactSymbolTable::from_parts(vec![1, 2], vec![0, 1, 2], vec![b'a', 0xff]),
            Err(TableError::InvalidName(1))
        );
    }

    #[test]
    fn test_serialize_as_tuple() {
        let table = CompactSymbolTable::from_parts(vec![4], vec![0, 2], b"hi".to_vec()).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, "[[4],[0,2],[104,105]]");
    }
}
