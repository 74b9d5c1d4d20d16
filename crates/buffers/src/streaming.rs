//! Buffered pull reader over an [`io::Read`] source.

use std::io::{self, Read};

/// Accumulates bytes pulled from a source so that values can be decoded
/// from a contiguous slice without reading the source to its end.
///
/// Callers decode from [`buffered`](Self::buffered), [`consume`](Self::consume)
/// what a value used, and [`fill`](Self::fill) when the buffered bytes run out
/// mid-value. Each fill asks for at least as many bytes as are already
/// buffered, so a value retried after every fill is decoded in amortized
/// linear time.
///
/// # Example
///
/// ```
/// use comserde_buffers::StreamingReader;
///
/// let mut stream = StreamingReader::with_chunk_size(&b"abc"[..], 2);
/// assert_eq!(stream.fill().unwrap(), 2);
/// assert_eq!(stream.buffered(), b"ab");
/// stream.consume(1);
/// assert_eq!(stream.fill().unwrap(), 1);
/// assert_eq!(stream.buffered(), b"bc");
/// assert_eq!(stream.fill().unwrap(), 0);
/// assert!(stream.is_drained());
/// ```
#[derive(Debug)]
pub struct StreamingReader<R> {
    source: R,
    buf: Vec<u8>,
    /// Start of the unconsumed bytes in `buf`.
    x: usize,
    consumed: u64,
    chunk_size: usize,
    drained: bool,
}

impl<R: Read> StreamingReader<R> {
    pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, Self::DEFAULT_CHUNK_SIZE)
    }

    /// `chunk_size` is the smallest request made to the source.
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            buf: Vec::new(),
            x: 0,
            consumed: 0,
            chunk_size: chunk_size.max(1),
            drained: false,
        }
    }

    /// Bytes pulled from the source and not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.x..]
    }

    /// Total number of bytes consumed since creation.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns `true` once the source has reported its end.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Marks `n` buffered bytes as used.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len() - self.x);
        self.x += n;
        self.consumed += n as u64;
        if self.x == self.buf.len() {
            self.buf.clear();
            self.x = 0;
        }
    }

    /// Pulls more bytes from the source and returns how many arrived. `0`
    /// means the source is at its end.
    pub fn fill(&mut self) -> io::Result<usize> {
        if self.drained {
            return Ok(0);
        }
        if self.x > 0 {
            self.buf.drain(..self.x);
            self.x = 0;
        }
        let start = self.buf.len();
        let want = self.chunk_size.max(start);
        self.buf.resize(start + want, 0);
        let read = loop {
            match self.source.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(err);
                }
            }
        };
        self.buf.truncate(start + read);
        if read == 0 {
            self.drained = true;
        }
        Ok(read)
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Returns the source. Buffered bytes that were not consumed are lost.
    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most one byte per read, like a slow pipe.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match (self.0.split_first(), out.first_mut()) {
                (Some((&byte, rest)), Some(slot)) => {
                    *slot = byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn test_short_reads_accumulate() {
        let mut stream = StreamingReader::new(Trickle(b"xyz"));
        assert_eq!(stream.fill().unwrap(), 1);
        assert_eq!(stream.fill().unwrap(), 1);
        assert_eq!(stream.buffered(), b"xy");
        stream.consume(2);
        assert!(stream.buffered().is_empty());
        assert_eq!(stream.consumed(), 2);
        assert_eq!(stream.fill().unwrap(), 1);
        assert_eq!(stream.fill().unwrap(), 0);
        assert!(stream.is_drained());
        assert_eq!(stream.buffered(), b"z");
    }

    #[test]
    fn test_requests_grow_with_buffer() {
        let data: Vec<u8> = (0..=255).collect();
        let mut stream = StreamingReader::with_chunk_size(&data[..], 4);
        assert_eq!(stream.fill().unwrap(), 4);
        assert_eq!(stream.fill().unwrap(), 4);
        assert_eq!(stream.fill().unwrap(), 8);
        assert_eq!(stream.fill().unwrap(), 16);
        assert_eq!(stream.buffered(), &data[..32]);
    }

    #[test]
    fn test_consume_is_clamped() {
        let mut stream = StreamingReader::with_chunk_size(&b"ab"[..], 8);
        stream.fill().unwrap();
        stream.consume(10);
        assert_eq!(stream.consumed(), 2);
        assert!(stream.buffered().is_empty());
    }

    #[test]
    fn test_source_errors_keep_buffer() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "gone"))
            }
        }
        let mut stream = StreamingReader::new(Broken);
        assert!(stream.fill().is_err());
        assert!(stream.buffered().is_empty());
        assert!(!stream.is_drained());
    }
}
