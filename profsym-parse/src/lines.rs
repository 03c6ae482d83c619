use memchr::memchr;

/// Receives complete lines from a [`LineStreamParser`].
pub trait LineConsumer {
    /// The state returned once the stream has ended.
    type Output;

    /// Processes one line, without its line terminator.
    fn consume_line(&mut self, line: &[u8]);

    /// Finishes consumption and returns the accumulated state.
    fn finish(self) -> Self::Output;
}

/// Reassembles lines from a stream of arbitrarily split chunks.
///
/// Chunks are passed to [`consume`](Self::consume) as they arrive, for instance from a pipe
/// connected to a running process. Lines that are complete within a chunk are handed to the
/// [`LineConsumer`] directly from the chunk. Only a trailing fragment without a line terminator is
/// copied and retained until the next chunk completes it, so memory use is bounded by the longest
/// line rather than the size of the stream.
///
/// Both `\n` and `\r\n` terminate a line.
///
/// # Example
///
/// ```
/// use profsym_parse::{LineStreamParser, nm::NmOutputDecoder};
///
/// let mut parser = LineStreamParser::new(NmOutputDecoder::new());
/// parser.consume(b"0000000000001000 T _in");
/// parser.consume(b"it\n0000000000001020 t frame_dummy\n");
/// let symbols = parser.finish();
///
/// assert_eq!(symbols.get(0x1000), Some("_init"));
/// assert_eq!(symbols.get(0x1020), Some("frame_dummy"));
/// ```
#[derive(Clone, Debug)]
pub struct LineStreamParser<C> {
    consumer: C,
    leftover: Vec<u8>,
}

impl<C> LineStreamParser<C>
where
    C: LineConsumer,
{
    /// Creates a new parser feeding lines into `consumer`.
    pub fn new(consumer: C) -> Self {
        LineStreamParser {
            consumer,
            leftover: Vec::new(),
        }
    }

    /// Consumes the next chunk of the stream.
    pub fn consume(&mut self, mut chunk: &[u8]) {
        while let Some(line_break) = memchr(b'\n', chunk) {
            let line = &chunk[..line_break];
            chunk = &chunk[line_break + 1..];

            if self.leftover.is_empty() {
                self.consumer.consume_line(strip_cr(line));
            } else {
                self.leftover.extend_from_slice(line);
                self.consumer.consume_line(strip_cr(&self.leftover));
                self.leftover.clear();
            }
        }

        self.leftover.extend_from_slice(chunk);
    }

    /// Consumes the next chunk of a text stream.
    pub fn consume_str(&mut self, chunk: &str) {
        self.consume(chunk.as_bytes())
    }

    /// Returns the consumer receiving lines.
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// Returns the length of the incomplete line retained from previous chunks.
    pub fn pending_bytes(&self) -> usize {
        self.leftover.len()
    }

    /// Ends the stream and returns the consumer's output.
    ///
    /// A trailing fragment that was not terminated by a line break is processed as the final
    /// line. An empty fragment, as left behind by a stream ending in a line break, is not.
    pub fn finish(mut self) -> C::Output {
        if !self.leftover.is_empty() {
            self.consumer.consume_line(strip_cr(&self.leftover));
        }

        self.consumer.finish()
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
