use std::borrow::Cow;
use std::collections::hash_map::{self, HashMap};

/// An unordered mapping from code addresses to symbol names.
///
/// This is the common output of all decoders. Addresses in a dump are neither unique nor sorted,
/// and inserting an address that is already present replaces the previous name. Names borrow from
/// the decoded dump where possible.
///
/// Alongside the mapping, the map keeps a running total of the byte length of every inserted name,
/// including names that were later replaced. This over-approximates the size of the packed name
/// buffer and is only used to pre-size it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolMap<'data> {
    symbols: HashMap<u64, Cow<'data, str>>,
    approximate_name_bytes: usize,
}

impl<'data> SymbolMap<'data> {
    /// Creates an empty symbol map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a symbol, returning the name it replaced.
    pub fn insert<N>(&mut self, address: u64, name: N) -> Option<Cow<'data, str>>
    where
        N: Into<Cow<'data, str>>,
    {
        let name = name.into();
        self.approximate_name_bytes += name.len();
        self.symbols.insert(address, name)
    }

    /// Returns the name at exactly the given address.
    pub fn get(&self, address: u64) -> Option<&str> {
        self.symbols.get(&address).map(|name| name.as_ref())
    }

    /// Returns the number of unique addresses.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if the map contains no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the approximate total byte length of all names.
    pub fn approximate_name_bytes(&self) -> usize {
        self.approximate_name_bytes
    }

    /// Iterates all symbols in arbitrary order.
    pub fn iter(&self) -> SymbolMapIter<'data, '_> {
        SymbolMapIter {
            inner: self.symbols.iter(),
        }
    }

    /// Moves all symbols of `other` into this map.
    ///
    /// Entries of `other` replace entries of `self` at the same address, as if they had been
    /// inserted after all of `self`'s entries.
    pub fn merge(&mut self, other: SymbolMap<'data>) {
        self.approximate_name_bytes += other.approximate_name_bytes;
        self.symbols.extend(other.symbols);
    }

    /// Converts the map into one that owns all of its names.
    pub fn into_owned(self) -> SymbolMap<'static> {
        SymbolMap {
            symbols: self
                .symbols
                .into_iter()
                .map(|(address, name)| (address, Cow::Owned(name.into_owned())))
                .collect(),
            approximate_name_bytes: self.approximate_name_bytes,
        }
    }
}

impl<'data, N> FromIterator<(u64, N)> for SymbolMap<'data>
where
    N: Into<Cow<'data, str>>,
{
    fn from_iter<T: IntoIterator<Item = (u64, N)>>(iter: T) -> Self {
        let mut map = SymbolMap::new();
        map.extend(iter);
        map
    }
}

impl<'data, N> Extend<(u64, N)> for SymbolMap<'data>
where
    N: Into<Cow<'data, str>>,
{
    fn extend<T: IntoIterator<Item = (u64, N)>>(&mut self, iter: T) {
        for (address, name) in iter {
            self.insert(address, name);
        }
    }
}

impl<'data, 'map> IntoIterator for &'map SymbolMap<'data> {
    type Item = (u64, &'map str);
    type IntoIter = SymbolMapIter<'data, 'map>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`SymbolMap`].
#[derive(Clone, Debug)]
pub struct SymbolMapIter<'data, 'map> {
    inner: hash_map::Iter<'map, u64, Cow<'data, str>>,
}

impl<'data, 'map> Iterator for SymbolMapIter<'data, 'map> {
    type Item = (u64, &'map str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(address, name)| (*address, name.as_ref()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for SymbolMapIter<'_, '_> {}
