//! Bounds-checked binary reader with cursor tracking.

use crate::DecodingError;

macro_rules! read_le {
    ($(#[$doc:meta] $name:ident -> $ty:ty;)+) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self) -> Result<$ty, DecodingError> {
                Ok(<$ty>::from_le_bytes(self.fixed()?))
            }
        )+
    };
}

/// A binary reader over a borrowed byte slice.
///
/// The cursor `x` is monotonically non-decreasing: there is no way to move it
/// backwards. A read that fails because the buffer is too short leaves the
/// cursor where it was.
///
/// # Example
///
/// ```
/// use comserde_buffers::Reader;
///
/// let data = [0x01, 0x03, 0x02];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8().unwrap(), 0x01);
/// assert_eq!(reader.u16().unwrap(), 0x0203);
/// assert!(reader.is_eof());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader positioned at the start of `uint8`.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self { uint8, x: 0 }
    }

    /// Returns the number of bytes left to read.
    pub fn size(&self) -> usize {
        self.uint8.len() - self.x
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.x >= self.uint8.len()
    }

    /// Returns the unread tail of the buffer without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.uint8[self.x..]
    }

    #[inline]
    fn check(&self, needed: usize) -> Result<(), DecodingError> {
        let remaining = self.size();
        if needed > remaining {
            Err(DecodingError::EndOfBuffer { needed, remaining })
        } else {
            Ok(())
        }
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Result<u8, DecodingError> {
        self.check(1)?;
        Ok(self.uint8[self.x])
    }

    /// Reads `size` raw bytes and advances past them.
    pub fn buf(&mut self, size: usize) -> Result<&'a [u8], DecodingError> {
        self.check(size)?;
        let start = self.x;
        self.x += size;
        Ok(&self.uint8[start..self.x])
    }

    /// Reads exactly `N` bytes into an array.
    pub fn fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodingError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.buf(N)?);
        Ok(out)
    }

    /// Returns the bytes before the next `terminator` and advances past the
    /// terminator itself.
    pub fn read_until(&mut self, terminator: u8) -> Result<&'a [u8], DecodingError> {
        let rest = self.rest();
        let length = rest
            .iter()
            .position(|&byte| byte == terminator)
            .ok_or(DecodingError::MissingTerminator { terminator })?;
        self.x += length + 1;
        Ok(&rest[..length])
    }

    /// Reads a `width`-byte little-endian unsigned integer.
    ///
    /// `width` may be anything from 0 to 16; a zero width reads nothing and
    /// yields `0`.
    pub fn uint_le(&mut self, width: usize) -> Result<u128, DecodingError> {
        debug_assert!(width <= 16, "uint_le width {width} exceeds 16 bytes");
        let bytes = self.buf(width)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte)))
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self) -> Result<u8, DecodingError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    /// Reads a signed 8-bit integer.
    #[inline]
    pub fn i8(&mut self) -> Result<i8, DecodingError> {
        Ok(self.u8()? as i8)
    }

    read_le! {
        /// Reads an unsigned 16-bit little-endian integer.
        u16 -> u16;
        /// Reads a signed 16-bit little-endian integer.
        i16 -> i16;
        /// Reads an unsigned 32-bit little-endian integer.
        u32 -> u32;
        /// Reads a signed 32-bit little-endian integer.
        i32 -> i32;
        /// Reads an unsigned 64-bit little-endian integer.
        u64 -> u64;
        /// Reads a signed 64-bit little-endian integer.
        i64 -> i64;
        /// Reads a little-endian IEEE-754 single precision float.
        f32 -> f32;
        /// Reads a little-endian IEEE-754 double precision float.
        f64 -> f64;
    }
}
