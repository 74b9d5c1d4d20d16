//! Top-level encode/decode entry points and streaming.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use comserde_buffers::{DecodingError, Reader, StreamingReader, Writer};

use crate::descriptor::Descriptor;
use crate::error::{DeserializationError, EncodeError};
use crate::options::Options;
use crate::registry::{TypeRegistry, TypeResolver};
use crate::value::Value;

/// First request made to a seekable source by [`Codec::load`]. Bytes read past
/// the value are given back by seeking, so this stays small.
const LOAD_CHUNK_SIZE: usize = 64;

/// Whether `err` may go away once more input is available.
fn wants_more(err: &DeserializationError) -> bool {
    matches!(
        err,
        DeserializationError::Eof(_)
            | DeserializationError::Decoding(
                DecodingError::EndOfBuffer { .. } | DecodingError::MissingTerminator { .. }
            )
    )
}

/// Encoder/decoder bound to a type resolver and a set of options.
///
/// A codec holds no per-call state and can be shared across threads.
///
/// # Example
///
/// ```
/// use comserde::{Codec, Descriptor, Format, Value};
///
/// let codec = Codec::default();
/// let descriptor = Descriptor::list(Format::W8.into());
/// let value = Value::list([3.into(), 4.into(), (-5).into()]);
///
/// let bytes = codec.encode(&value, &descriptor).unwrap();
/// assert_eq!(bytes, [0x03, 0x06, 0x08, 0x0b]);
/// assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), value);
/// ```
#[derive(Clone)]
pub struct Codec {
    pub(crate) resolver: Arc<dyn TypeResolver>,
    pub(crate) options: Options,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::new(TypeRegistry::default()))
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Codec {
    pub fn new(resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            resolver,
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn resolver(&self) -> &dyn TypeResolver {
        self.resolver.as_ref()
    }

    /// Appends the encoding of `value` to `writer`.
    pub fn encode_into(&self, writer: &mut Writer, value: &Value, descriptor: &Descriptor) -> Result<(), EncodeError> {
        self.write(writer, value, descriptor)
    }

    pub fn encode(&self, value: &Value, descriptor: &Descriptor) -> Result<Vec<u8>, EncodeError> {
        let _span = tracing::debug_span!("encode", descriptor = descriptor.label()).entered();
        let mut writer = Writer::new();
        self.write(&mut writer, value, descriptor)?;
        tracing::debug!(bytes = writer.len(), "encoded value");
        Ok(writer.flush())
    }

    /// Encodes `value`, inferring the descriptor from the value when none is
    /// given.
    pub fn dumps(&self, value: &Value, descriptor: Option<&Descriptor>) -> Result<Vec<u8>, EncodeError> {
        match descriptor {
            Some(descriptor) => self.encode(value, descriptor),
            None => self.encode(value, &self.descriptor_for(value)?),
        }
    }

    /// Decodes one value from the start of `bytes`. Bytes after the value are
    /// ignored.
    pub fn decode(&self, bytes: &[u8], descriptor: &Descriptor) -> Result<Value, DeserializationError> {
        let _span = tracing::debug_span!("decode", descriptor = descriptor.label(), bytes = bytes.len()).entered();
        let mut reader = Reader::new(bytes);
        self.decode_from(&mut reader, descriptor)
    }

    /// Decodes one value at the reader's cursor.
    ///
    /// Running out of input before reading a single byte, from an already
    /// exhausted reader, is reported as [`DeserializationError::Eof`]: the
    /// input ended cleanly between values. Any other failure passes through
    /// unchanged.
    pub fn decode_from(&self, reader: &mut Reader<'_>, descriptor: &Descriptor) -> Result<Value, DeserializationError> {
        let start = reader.x;
        self.read(reader, descriptor).map_err(|err| match err {
            err @ DeserializationError::Decoding(
                DecodingError::EndOfBuffer { .. } | DecodingError::MissingTerminator { .. },
            ) if reader.x == start && reader.is_eof() => DeserializationError::Eof(Box::new(err)),
            err => err,
        })
    }

    /// Decodes a value nested inside another one, without the end-of-input
    /// refinement of [`decode_from`](Self::decode_from). This is the read
    /// counterpart of [`encode_into`](Self::encode_into) for
    /// [`CustomCodec`](crate::CustomCodec) implementations.
    pub fn read_value(&self, reader: &mut Reader<'_>, descriptor: &Descriptor) -> Result<Value, DeserializationError> {
        self.read(reader, descriptor)
    }

    /// Writes one encoded value to `sink`.
    pub fn dump<W: Write>(&self, sink: &mut W, value: &Value, descriptor: Option<&Descriptor>) -> Result<(), EncodeError> {
        let bytes = self.dumps(value, descriptor)?;
        sink.write_all(&bytes)?;
        Ok(())
    }

    /// Reads one value from `source`, leaving it positioned right after the
    /// value. On failure the position is restored.
    ///
    /// The source is read a little at a time and any bytes read past the
    /// value are given back by seeking. Use [`loader`](Self::loader) for
    /// sources that cannot seek.
    pub fn load<R: Read + Seek>(&self, source: &mut R, descriptor: &Descriptor) -> Result<Value, DeserializationError> {
        let start = source.stream_position()?;
        let mut loader = Loader {
            codec: self,
            source: StreamingReader::with_chunk_size(&mut *source, LOAD_CHUNK_SIZE),
        };
        let result = loader.load(descriptor);
        let consumed = loader.consumed();
        drop(loader);
        match result {
            Ok(value) => {
                source.seek(SeekFrom::Start(start + consumed))?;
                Ok(value)
            }
            Err(err) => {
                source.seek(SeekFrom::Start(start))?;
                Err(err)
            }
        }
    }

    /// Wraps a byte source for reading values back to back. The source only
    /// needs [`Read`]; bytes are pulled as values require them.
    pub fn loader<R: Read>(&self, source: R) -> Loader<'_, R> {
        Loader {
            codec: self,
            source: StreamingReader::new(source),
        }
    }

    /// Iterates over values laid back to back in `bytes` until the input is
    /// exhausted. A corrupt value is yielded as an error and ends iteration.
    pub fn stream<'a>(&'a self, bytes: &'a [u8], descriptor: &'a Descriptor) -> Stream<'a> {
        Stream {
            codec: self,
            reader: Reader::new(bytes),
            descriptor,
            done: false,
        }
    }
}

/// Iterator returned by [`Codec::stream`].
#[derive(Debug)]
pub struct Stream<'a> {
    codec: &'a Codec,
    reader: Reader<'a>,
    descriptor: &'a Descriptor,
    done: bool,
}

impl Stream<'_> {
    /// Offset of the next value in the input.
    pub fn position(&self) -> usize {
        self.reader.x
    }
}

impl Iterator for Stream<'_> {
    type Item = Result<Value, DeserializationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.is_eof() {
            return None;
        }
        let start = self.reader.x;
        match self.codec.decode_from(&mut self.reader, self.descriptor) {
            Ok(_) if self.reader.x == start => {
                self.done = true;
                Some(Err(DeserializationError::NoProgress {
                    remaining: self.reader.size(),
                }))
            }
            Ok(value) => Some(Ok(value)),
            Err(err) if err.is_eof() => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Reads values one after another from a [`Read`] source.
///
/// Created by [`Codec::loader`]. Input is buffered, so the source is left
/// positioned past the last value read; [`buffered`](Self::buffered) returns
/// what was read ahead.
#[derive(Debug)]
pub struct Loader<'a, R> {
    codec: &'a Codec,
    source: StreamingReader<R>,
}

impl<R: Read> Loader<'_, R> {
    /// Decodes the next value. A source that ends cleanly between values
    /// yields an error for which [`DeserializationError::is_eof`] holds.
    pub fn load(&mut self, descriptor: &Descriptor) -> Result<Value, DeserializationError> {
        loop {
            let (result, used) = {
                let mut reader = Reader::new(self.source.buffered());
                let result = self.codec.decode_from(&mut reader, descriptor);
                (result, reader.x)
            };
            match result {
                Ok(value) => {
                    self.source.consume(used);
                    return Ok(value);
                }
                Err(err) if wants_more(&err) && !self.source.is_drained() => {
                    self.source.fill()?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Bytes read from the source but not yet decoded.
    pub fn buffered(&self) -> &[u8] {
        self.source.buffered()
    }

    /// Total bytes taken by the values decoded so far.
    pub fn consumed(&self) -> u64 {
        self.source.consumed()
    }

    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}

/// Encodes with a default codec: empty registry, default options.
pub fn dumps(value: &Value, descriptor: Option<&Descriptor>) -> Result<Vec<u8>, EncodeError> {
    Codec::default().dumps(value, descriptor)
}

pub fn loads(bytes: &[u8], descriptor: &Descriptor) -> Result<Value, DeserializationError> {
    Codec::default().decode(bytes, descriptor)
}

pub fn dump<W: Write>(sink: &mut W, value: &Value, descriptor: Option<&Descriptor>) -> Result<(), EncodeError> {
    Codec::default().dump(sink, value, descriptor)
}

pub fn load<R: Read + Seek>(source: &mut R, descriptor: &Descriptor) -> Result<Value, DeserializationError> {
    Codec::default().load(source, descriptor)
}
