//! Binary buffer writer.

macro_rules! write_le {
    ($(#[$doc:meta] $name:ident($ty:ty);)+) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self, val: $ty) {
                self.uint8.extend_from_slice(&val.to_le_bytes());
            }
        )+
    };
}

/// A growable binary writer. All multi-byte values are little-endian.
///
/// # Example
///
/// ```
/// use comserde_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// let data = writer.flush();
/// assert_eq!(data, [0x01, 0x03, 0x02]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    /// The bytes written since the last flush.
    pub uint8: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Returns the written data and leaves the writer empty.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.uint8)
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    /// Writes a signed 8-bit integer.
    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.uint8.push(val as u8);
    }

    write_le! {
        /// Writes an unsigned 16-bit integer.
        u16(u16);
        /// Writes a signed 16-bit integer.
        i16(i16);
        /// Writes an unsigned 32-bit integer.
        u32(u32);
        /// Writes a signed 32-bit integer.
        i32(i32);
        /// Writes an unsigned 64-bit integer.
        u64(u64);
        /// Writes a signed 64-bit integer.
        i64(i64);
        /// Writes an IEEE-754 single precision float.
        f32(f32);
        /// Writes an IEEE-754 double precision float.
        f64(f64);
    }

    /// Writes the low `width` bytes of `val`, least significant first.
    pub fn uint_le(&mut self, val: u128, width: usize) {
        debug_assert!(width <= 16, "uint_le width {width} exceeds 16 bytes");
        self.uint8.extend_from_slice(&val.to_le_bytes()[..width]);
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.buf(s.as_bytes());
        s.len()
    }
}
