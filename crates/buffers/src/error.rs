use thiserror::Error;

/// Low-level failure raised by [`Reader`](crate::Reader) operations.
///
/// These never reach callers of the codec directly; the primitive layer wraps
/// them into a deserialization error with this value as its source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    #[error("unexpected end of buffer: needed {needed} byte(s), {remaining} remaining")]
    EndOfBuffer { needed: usize, remaining: usize },
    #[error("no 0x{terminator:02x} terminator before end of buffer")]
    MissingTerminator { terminator: u8 },
    #[error("variable-length integer does not fit in 128 bits")]
    VarintOverflow,
}
