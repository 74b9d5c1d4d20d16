//! Base-128 variable-length integers.
//!
//! Each byte carries seven value bits, least significant group first, and the
//! high bit is set on every byte except the last. Values up to 128 bits are
//! supported.
//!
//! The sized variants split a value in two: the low `fixed_size` bytes are
//! written verbatim (little-endian) and only the remaining high part is
//! varint-encoded. With `fixed_size = 0` they degenerate to plain varints.
//!
//! Signed values are folded sign-and-magnitude: `(|n| << 1) | sign`. Zero
//! always folds to `0`.

use comserde_buffers::{DecodingError, Reader, Writer};

/// Shifts left, failing instead of silently dropping set bits.
fn shl_exact(value: u128, shift: u32) -> Result<u128, DecodingError> {
    if value == 0 {
        Ok(0)
    } else if shift >= 128 || value.leading_zeros() < shift {
        Err(DecodingError::VarintOverflow)
    } else {
        Ok(value << shift)
    }
}

/// Number of bytes [`write_varint`] emits for `value`.
pub fn varint_len(value: u128) -> usize {
    let bits = 128 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

pub fn write_varint(writer: &mut Writer, mut value: u128) {
    while value >= 0x80 {
        writer.u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    writer.u8(value as u8);
}

pub fn encode_varint(value: u128) -> Vec<u8> {
    let mut writer = Writer::with_capacity(varint_len(value));
    write_varint(&mut writer, value);
    writer.flush()
}

/// Reads groups until one has its continuation bit clear.
///
/// Redundant zero groups are accepted. Fails with
/// [`DecodingError::EndOfBuffer`] if the buffer ends mid-sequence and with
/// [`DecodingError::VarintOverflow`] if a set bit lands beyond bit 127.
pub fn read_varint(reader: &mut Reader<'_>) -> Result<u128, DecodingError> {
    let mut result = 0u128;
    let mut shift = 0u32;
    loop {
        let byte = reader.u8()?;
        result |= shl_exact(u128::from(byte & 0x7f), shift)?;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift = shift.saturating_add(7);
    }
}

pub fn write_sized_varint(writer: &mut Writer, value: u128, fixed_size: usize) {
    writer.uint_le(value, fixed_size);
    write_varint(writer, value.checked_shr(8 * fixed_size as u32).unwrap_or(0));
}

pub fn read_sized_varint(reader: &mut Reader<'_>, fixed_size: usize) -> Result<u128, DecodingError> {
    let low = reader.uint_le(fixed_size)?;
    let high = read_varint(reader)?;
    Ok(shl_exact(high, 8 * fixed_size as u32)? | low)
}

pub fn write_signed_varint(writer: &mut Writer, value: i128, fixed_size: usize) {
    let sign = u128::from(value < 0);
    let magnitude = value.unsigned_abs();

    // The folded value needs up to 129 bits, so the sign is spliced into the
    // lowest group by hand instead of materialising `magnitude << 1`.
    if fixed_size == 0 {
        let low = (((magnitude & 0x3f) << 1) | sign) as u8;
        let rest = magnitude >> 6;
        if rest == 0 {
            writer.u8(low);
        } else {
            writer.u8(low | 0x80);
            write_varint(writer, rest);
        }
    } else {
        let bits = 8 * fixed_size as u32;
        writer.uint_le(magnitude.wrapping_shl(1) | sign, fixed_size);
        write_varint(writer, magnitude >> (bits - 1));
    }
}

pub fn read_signed_varint(reader: &mut Reader<'_>, fixed_size: usize) -> Result<i128, DecodingError> {
    let (sign, magnitude) = if fixed_size == 0 {
        let first = reader.u8()?;
        let mut magnitude = u128::from((first & 0x7f) >> 1);
        if first & 0x80 != 0 {
            magnitude |= shl_exact(read_varint(reader)?, 6)?;
        }
        (first & 1 == 1, magnitude)
    } else {
        let bits = 8 * fixed_size as u32;
        let low = reader.uint_le(fixed_size)?;
        let high = read_varint(reader)?;
        (low & 1 == 1, (low >> 1) | shl_exact(high, bits - 1)?)
    };
    unfold(sign, magnitude)
}

fn unfold(negative: bool, magnitude: u128) -> Result<i128, DecodingError> {
    const MIN_MAGNITUDE: u128 = 1 << 127;
    match (negative, magnitude) {
        (true, MIN_MAGNITUDE) => Ok(i128::MIN),
        (_, m) if m >= MIN_MAGNITUDE => Err(DecodingError::VarintOverflow),
        (true, m) => Ok(-(m as i128)),
        (false, m) => Ok(m as i128),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_bytes(value: i128, fixed_size: usize) -> Vec<u8> {
        let mut writer = Writer::new();
        write_signed_varint(&mut writer, value, fixed_size);
        writer.flush()
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode_varint(0), [0x00]);
        assert_eq!(encode_varint(127), [0x7f]);
        assert_eq!(encode_varint(128), [0x80, 0x01]);
        assert_eq!(encode_varint(300), [0xac, 0x02]);
    }

    #[test]
    fn test_wide_values() {
        for value in [0x8a533f, 0xe19db8, 0x945efb43, 0xa1e887e9, 0x09e20c6f2af3dd3207ae, u128::MAX] {
            let bytes = encode_varint(value);
            assert_eq!(bytes.len(), varint_len(value));
            let mut reader = Reader::new(&bytes);
            assert_eq!(read_varint(&mut reader).unwrap(), value);
            assert!(reader.is_eof());
        }
    }

    #[test]
    fn test_truncated() {
        let mut reader = Reader::new(&[0x80, 0x80]);
        assert!(matches!(
            read_varint(&mut reader),
            Err(DecodingError::EndOfBuffer { .. })
        ));
    }

    #[test]
    fn test_overflow() {
        let mut bytes = vec![0xff; 18];
        bytes.push(0x7f);
        let mut reader = Reader::new(&bytes);
        assert_eq!(read_varint(&mut reader), Err(DecodingError::VarintOverflow));
    }

    #[test]
    fn test_redundant_zero_groups() {
        let mut reader = Reader::new(&[0x85, 0x80, 0x00]);
        assert_eq!(read_varint(&mut reader).unwrap(), 5);
    }

    #[test]
    fn test_sized_split() {
        let mut writer = Writer::new();
        write_sized_varint(&mut writer, 0x0102_0304, 2);
        let bytes = writer.flush();
        assert_eq!(&bytes[..2], [0x04, 0x03]);
        assert_eq!(&bytes[2..], encode_varint(0x0102));

        let mut reader = Reader::new(&bytes);
        assert_eq!(read_sized_varint(&mut reader, 2).unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_signed_fold() {
        assert_eq!(signed_bytes(0, 0), [0x00]);
        assert_eq!(signed_bytes(3, 0), [0x06]);
        assert_eq!(signed_bytes(-5, 0), [0x0b]);
        assert_eq!(signed_bytes(-64, 0), [0x81, 0x01]);
        assert_eq!(signed_bytes(-5, 1), [0x0b, 0x00]);
    }

    #[test]
    fn test_signed_extremes() {
        for fixed_size in 0..=3 {
            for value in [i128::MIN, i128::MIN + 1, -1, 0, 1, i128::MAX] {
                let bytes = signed_bytes(value, fixed_size);
                let mut reader = Reader::new(&bytes);
                assert_eq!(read_signed_varint(&mut reader, fixed_size).unwrap(), value);
                assert!(reader.is_eof());
            }
        }
    }

    #[test]
    fn test_negative_zero_unfolds_to_zero() {
        let mut reader = Reader::new(&[0x01]);
        assert_eq!(read_signed_varint(&mut reader, 0).unwrap(), 0);
    }
}
