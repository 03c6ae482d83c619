//! Support for Breakpad ASCII symbol files.
//!
//! Symbol files carry many record types, but only two of them name code addresses:
//!
//! ```text
//! FUNC [m] <address> <size> <parameter_size> <name>
//! PUBLIC [m] <address> <parameter_size> <name>
//! ```
//!
//! Rather than tokenizing every line, the decoder jumps between occurrences of these record
//! markers with a substring search and ignores everything in between. Line records, `STACK`
//! records and all other metadata are never looked at, which keeps decoding fast on symbol files
//! of several gigabytes.
//!
//! See the [symbol file documentation] for the full format.
//!
//! [symbol file documentation]: https://github.com/google/breakpad/blob/master/docs/symbol_files.md

use std::borrow::Cow;
use std::str;

use memchr::memchr;
use memchr::memmem::Finder;

use crate::error::{ParseError, ParseErrorKind};
use crate::map::SymbolMap;

/// The type of a [`SymbolRecord`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SymbolRecordKind {
    /// A `FUNC` record, describing a function with line information.
    Func,
    /// A `PUBLIC` record, describing an exported symbol without size.
    Public,
}

impl SymbolRecordKind {
    fn prefix(self) -> &'static [u8] {
        match self {
            SymbolRecordKind::Func => b"FUNC ",
            SymbolRecordKind::Public => b"PUBLIC ",
        }
    }

    /// Number of numeric fields before the name, including the address.
    fn field_count(self) -> usize {
        match self {
            SymbolRecordKind::Func => 3,
            SymbolRecordKind::Public => 2,
        }
    }

    fn error_kind(self) -> ParseErrorKind {
        match self {
            SymbolRecordKind::Func => ParseErrorKind::InvalidFuncRecord,
            SymbolRecordKind::Public => ParseErrorKind::InvalidPublicRecord,
        }
    }
}

/// A `FUNC` or `PUBLIC` record of a symbol file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolRecord<'data> {
    /// The record type.
    pub kind: SymbolRecordKind,
    /// Whether this address is shared by multiple symbols, as marked by the `m` flag.
    pub multiple: bool,
    /// The address relative to the image base.
    pub address: u64,
    /// The symbol name, with trailing whitespace removed.
    ///
    /// Records without a name have an empty name.
    pub name: Cow<'data, str>,
}

impl<'data> SymbolRecord<'data> {
    /// Parses a record from a single line, starting with its `FUNC` or `PUBLIC` marker.
    ///
    /// `offset` is the position of the line within the symbol file and is only used for error
    /// reporting.
    fn parse(kind: SymbolRecordKind, line: &'data [u8], offset: usize) -> Result<Self, ParseError> {
        let rest = &line[kind.prefix().len()..];
        let (multiple, rest) = match rest.strip_prefix(b"m ") {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let mut fields = rest.splitn(kind.field_count() + 1, |b| *b == b' ');
        let address = parse_address(fields.next().unwrap_or_default(), offset)?;

        for _ in 1..kind.field_count() {
            if fields.next().is_none() {
                return Err(ParseError::new(kind.error_kind(), offset));
            }
        }

        let name = fields.next().map(decode_name).unwrap_or_default();

        Ok(SymbolRecord {
            kind,
            multiple,
            address,
            name,
        })
    }
}

fn parse_address(field: &[u8], offset: usize) -> Result<u64, ParseError> {
    let error = || ParseError::new(ParseErrorKind::InvalidAddress, offset);
    let text = str::from_utf8(field).map_err(|e| error().with_source(e))?;
    u64::from_str_radix(text, 16).map_err(|e| error().with_source(e))
}

fn decode_name(bytes: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(name) => Cow::Borrowed(name.trim_end()),
        Cow::Owned(name) => Cow::Owned(name.trim_end().to_owned()),
    }
}

/// Tracks the next occurrence of one record marker.
#[derive(Clone, Debug)]
struct MarkerScan {
    finder: Finder<'static>,
    /// Offset of the next record of this type, past its leading line break.
    next: Option<usize>,
}

impl MarkerScan {
    fn new(kind: SymbolRecordKind, data: &[u8]) -> Self {
        let needle: &'static [u8] = match kind {
            SymbolRecordKind::Func => b"\nFUNC ",
            SymbolRecordKind::Public => b"\nPUBLIC ",
        };

        let mut scan = MarkerScan {
            finder: Finder::new(needle),
            next: None,
        };

        scan.next = if data.starts_with(kind.prefix()) {
            Some(0)
        } else {
            scan.find(data, 0)
        };

        scan
    }

    fn find(&self, data: &[u8], from: usize) -> Option<usize> {
        self.finder
            .find(&data[from..])
            .map(|index| from + index + 1)
    }

    /// Moves past all records starting at or before `line_end`.
    fn advance(&mut self, data: &[u8], line_end: usize) {
        if let Some(next) = self.next {
            if next <= line_end {
                self.next = self.find(data, line_end);
            }
        }
    }
}

/// An iterator over `FUNC` and `PUBLIC` records in a symbol file.
///
/// Records are yielded in file order. After the first error, the iterator is exhausted.
#[derive(Clone, Debug)]
pub struct SymbolRecords<'data> {
    data: &'data [u8],
    funcs: MarkerScan,
    publics: MarkerScan,
    finished: bool,
}

impl<'data> SymbolRecords<'data> {
    /// Creates an iterator over the symbol records in `data`.
    pub fn new(data: &'data [u8]) -> Self {
        SymbolRecords {
            data,
            funcs: MarkerScan::new(SymbolRecordKind::Func, data),
            publics: MarkerScan::new(SymbolRecordKind::Public, data),
            finished: false,
        }
    }
}

impl<'data> Iterator for SymbolRecords<'data> {
    type Item = Result<SymbolRecord<'data>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let (kind, start) = match (self.funcs.next, self.publics.next) {
            (Some(func), Some(public)) if public < func => (SymbolRecordKind::Public, public),
            (Some(func), _) => (SymbolRecordKind::Func, func),
            (None, Some(public)) => (SymbolRecordKind::Public, public),
            (None, None) => {
                self.finished = true;
                return None;
            }
        };

        let line_end = match memchr(b'\n', &self.data[start..]) {
            Some(index) => start + index,
            None => self.data.len(),
        };

        let mut line = &self.data[start..line_end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        self.funcs.advance(self.data, line_end);
        self.publics.advance(self.data, line_end);

        let record = SymbolRecord::parse(kind, line, start);
        if record.is_err() {
            self.finished = true;
        }

        Some(record)
    }
}

impl std::iter::FusedIterator for SymbolRecords<'_> {}

/// Returns an iterator over all `FUNC` and `PUBLIC` records in a symbol file.
pub fn records(data: &[u8]) -> SymbolRecords<'_> {
    SymbolRecords::new(data)
}

/// Decodes the symbols of a Breakpad symbol file.
///
/// When several records name the same address, the one that comes last in the file wins. An
/// address that is not a hexadecimal number fails the entire decode.
pub fn decode(data: &[u8]) -> Result<SymbolMap<'_>, ParseError> {
    tracing::trace_span!("decode_breakpad", bytes = data.len()).in_scope(|| {
        let mut symbols = SymbolMap::new();
        for record in records(data) {
            let record = record?;
            symbols.insert(record.address, record.name);
        }

        Ok(symbols)
    })
}
