//! Conversion of decoded symbol maps into [`CompactSymbolTable`]s.

use profsym_parse::SymbolMap;

use crate::error::TableError;
use crate::table::CompactSymbolTable;

/// A compacted table along with statistics about the conversion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Compaction {
    /// The compacted symbol table.
    pub table: CompactSymbolTable,
    /// The number of symbols whose address does not fit into 32 bits.
    ///
    /// These symbols are not contained in the table.
    pub dropped_addresses: usize,
}

/// Packs a symbol map into a [`CompactSymbolTable`].
///
/// Symbols are sorted by address and their names are concatenated in that order. Symbols at
/// addresses beyond the 32-bit range are dropped. The result depends only on the contents of the
/// map, not on the order in which its symbols were inserted.
///
/// # Example
///
/// ```
/// use profsym_parse::SymbolMap;
///
/// let symbols: SymbolMap = [(0x20, "second"), (0x10, "first")].into_iter().collect();
/// let table = profsym_table::compact(&symbols).unwrap();
///
/// assert_eq!(table.addresses(), &[0x10, 0x20]);
/// assert_eq!(table.name_offsets(), &[0, 5, 11]);
/// assert_eq!(table.name_bytes(), b"firstsecond");
/// ```
pub fn compact(symbols: &SymbolMap<'_>) -> Result<CompactSymbolTable, TableError> {
    compact_detailed(symbols).map(|compaction| compaction.table)
}

/// Packs a symbol map into a [`CompactSymbolTable`] and reports dropped symbols.
///
/// See [`compact`] for details.
pub fn compact_detailed(symbols: &SymbolMap<'_>) -> Result<Compaction, TableError> {
    let _span = tracing::trace_span!("compact", symbols = symbols.len()).entered();

    let mut entries: Vec<(u32, &str)> = Vec::with_capacity(symbols.len());
    let mut dropped_addresses = 0;
    for (address, name) in symbols {
        match u32::try_from(address) {
            Ok(address) => entries.push((address, name)),
            Err(_) => dropped_addresses += 1,
        }
    }

    if dropped_addresses > 0 {
        tracing::warn!(
            dropped_addresses,
            "dropped symbols with addresses beyond 32 bits"
        );
    }

    entries.sort_unstable_by_key(|(address, _)| *address);

    let mut addresses = Vec::with_capacity(entries.len());
    let mut name_offsets = Vec::with_capacity(entries.len() + 1);
    let mut name_bytes = Vec::with_capacity(symbols.approximate_name_bytes());

    for (address, name) in entries {
        addresses.push(address);
        name_offsets.push(offset(&name_bytes)?);
        name_bytes.extend_from_slice(name.as_bytes());
    }
    name_offsets.push(offset(&name_bytes)?);

    let table = CompactSymbolTable::from_parts_unchecked(addresses, name_offsets, name_bytes);
    Ok(Compaction {
        table,
        dropped_addresses,
    })
}

fn offset(name_bytes: &[u8]) -> Result<u32, TableError> {
    u32::try_from(name_bytes.len()).map_err(|_| TableError::NameBufferTooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_empty_map() {
        let table = compact(&SymbolMap::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.name_offsets(), &[0]);
        assert_eq!(table.name_bytes(), b"");
    }

    #[test]
    fn test_drops_wide_addresses() {
        let symbols: SymbolMap = [(0x1000, "low"), (0x1_0000_0000, "high"), (u64::MAX, "max")]
            .into_iter()
            .collect();
        let compaction = compact_detailed(&symbols).unwrap();

        assert_eq!(compaction.dropped_addresses, 2);
        assert_eq!(compaction.table.len(), 1);
        assert_eq!(compaction.table.get(0), Some((0x1000, "low")));
    }

    #[test]
    fn test_duplicate_names() {
        let symbols: SymbolMap = [(3, "same"), (1, "same"), (2, "")].into_iter().collect();
        let table = compact(&symbols).unwrap();

        assert_eq!(table.addresses(), &[1, 2, 3]);
        assert_eq!(table.name_offsets(), &[0, 4, 4, 8]);
        assert_eq!(table.name_bytes(), b"samesame");
    }

    #[test]
    fn test_multibyte_names() {
        let symbols: SymbolMap = [(1, "größe"), (2, "文字")].into_iter().collect();
        let table = compact(&symbols).unwrap();

        assert_eq!(table.name_offsets(), &[0, 7, 13]);
        assert_eq!(table.get(1), Some((2, "文字")));
    }
}
