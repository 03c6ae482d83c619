//! Support for the demangled text output of `nm`.
//!
//! Every line of `nm --demangle` output describes one symbol:
//!
//! ```text
//! 00000000028c9888 t GrFragmentProcessor::Foo()
//!                  U abort
//! 00000000028c9874 mozilla::Bar()
//! ```
//!
//! The address is hexadecimal without a `0x` prefix. It is followed by an optional single letter
//! symbol type and the demangled name, which may itself contain spaces. Undefined symbols are
//! printed with a blank address and are skipped.

use std::borrow::Cow;

use crate::lines::{LineConsumer, LineStreamParser};
use crate::map::SymbolMap;

/// Parses a single line of `nm` output into an address and a name.
///
/// Returns `None` if the line has no space or its address is not a hexadecimal number.
///
/// ```
/// use profsym_parse::nm::parse_nm_line;
///
/// assert_eq!(
///     parse_nm_line("28c9888 t GrFragmentProcessor::Foo()"),
///     Some((0x28c9888, "GrFragmentProcessor::Foo()"))
/// );
/// assert_eq!(parse_nm_line("                 U abort"), None);
/// ```
pub fn parse_nm_line(line: &str) -> Option<(u64, &str)> {
    let first_space = line.find(' ')?;

    // A type letter is a single character surrounded by spaces.
    let name_start = if line.as_bytes().get(first_space + 2) == Some(&b' ') {
        first_space + 3
    } else {
        first_space + 1
    };

    let address = u64::from_str_radix(&line[..first_space], 16).ok()?;
    Some((address, line[name_start..].trim_end()))
}

/// Accumulates `nm` output lines into a [`SymbolMap`].
///
/// The decoder is driven line by line through a [`LineStreamParser`], which allows the output of
/// several `nm` invocations to be combined into a single map. Lines that cannot be interpreted
/// are skipped, never treated as errors.
#[derive(Clone, Debug, Default)]
pub struct NmOutputDecoder {
    symbols: SymbolMap<'static>,
    skipped_lines: usize,
}

impl NmOutputDecoder {
    /// Creates a decoder with an empty symbol map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of symbols decoded so far.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Returns the number of lines with an unparsable address.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

impl LineConsumer for NmOutputDecoder {
    type Output = SymbolMap<'static>;

    fn consume_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);

        match parse_nm_line(&line) {
            Some((address, name)) => {
                self.symbols.insert(address, Cow::Owned(name.to_owned()));
            }
            None if line.contains(' ') => self.skipped_lines += 1,
            None => (),
        }
    }

    fn finish(self) -> Self::Output {
        if self.skipped_lines > 0 {
            tracing::debug!(
                skipped_lines = self.skipped_lines,
                symbols = self.symbols.len(),
                "skipped nm lines without an address"
            );
        }

        self.symbols
    }
}

/// Decodes complete `nm` output.
pub fn decode(data: &[u8]) -> SymbolMap<'static> {
    tracing::trace_span!("decode_nm", bytes = data.len()).in_scope(|| {
        let mut parser = LineStreamParser::new(NmOutputDecoder::new());
        parser.consume(data);
        parser.finish()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_with_type() {
        assert_eq!(
            parse_nm_line("28c9888 t GrFragmentProcessor::Foo()"),
            Some((0x28c9888, "GrFragmentProcessor::Foo()"))
        );
    }

    #[test]
    fn test_line_without_type() {
        assert_eq!(
            parse_nm_line("28c9874 mozilla::Bar()"),
            Some((0x28c9874, "mozilla::Bar()"))
        );
    }

    #[test]
    fn test_name_with_spaces() {
        assert_eq!(
            parse_nm_line("10c0 T demo::hash(char const*, unsigned long)  "),
            Some((0x10c0, "demo::hash(char const*, unsigned long)"))
        );
    }

    #[test]
    fn test_invalid_lines() {
        assert_eq!(parse_nm_line(""), None);
        assert_eq!(parse_nm_line("nospace"), None);
        assert_eq!(parse_nm_line("                 U abort"), None);
        assert_eq!(parse_nm_line("xyz T foo"), None);
    }

    #[test]
    fn test_decoder_counts_skipped() {
        let mut decoder = NmOutputDecoder::new();
        decoder.consume_line(b"                 U abort");
        decoder.consume_line(b"1000 T _init");
        decoder.consume_line(b"garbage");
        decoder.consume_line(b"1000 T _init_again");

        assert_eq!(decoder.skipped_lines(), 1);
        assert_eq!(decoder.symbol_count(), 1);

        let symbols = decoder.finish();
        assert_eq!(symbols.get(0x1000), Some("_init_again"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let symbols = decode(b"2000 T caf\xe9\n");
        assert_eq!(symbols.get(0x2000), Some("caf\u{fffd}"));
    }
}
