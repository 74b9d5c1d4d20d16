//! Byte-level building blocks for the comserde codec.
//!
//! [`Writer`] accumulates encoded output, [`Reader`] is the decode cursor: it
//! owns a read offset over an immutable byte slice and only ever moves it
//! forward. Every fallible read reports a [`DecodingError`] and leaves the
//! offset untouched when it fails before consuming anything.
//! [`StreamingReader`] feeds a `Reader` from an `io::Read` source a chunk at
//! a time.

mod error;
mod reader;
mod streaming;
mod writer;

pub use error::DecodingError;
pub use reader::Reader;
pub use streaming::StreamingReader;
pub use writer::Writer;
