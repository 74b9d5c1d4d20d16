//! Writer/Reader agreement and cursor monotonicity.

use comserde_buffers::{DecodingError, Reader, Writer};
use proptest::prelude::*;

proptest! {
    #[test]
    fn uint_le_agrees(value in any::<u128>(), width in 0usize..=16) {
        let mut writer = Writer::new();
        writer.uint_le(value, width);
        let bytes = writer.flush();
        prop_assert_eq!(bytes.len(), width);

        let mut reader = Reader::new(&bytes);
        let mask = if width == 16 { u128::MAX } else { (1u128 << (8 * width)) - 1 };
        prop_assert_eq!(reader.uint_le(width).unwrap(), value & mask);
        prop_assert!(reader.is_eof());
    }

    #[test]
    fn short_reads_never_move_the_cursor(data in proptest::collection::vec(any::<u8>(), 0..8), extra in 1usize..8) {
        let mut reader = Reader::new(&data);
        let needed = data.len() + extra;
        prop_assert_eq!(
            reader.buf(needed),
            Err(DecodingError::EndOfBuffer { needed, remaining: data.len() })
        );
        prop_assert_eq!(reader.x, 0);
    }

    #[test]
    fn mixed_fields_read_back(a in any::<u8>(), b in any::<i32>(), c in any::<f64>(), s in "[a-zA-Z0-9 ]{0,16}") {
        let mut writer = Writer::new();
        writer.u8(a);
        writer.i32(b);
        writer.f64(c);
        let len = writer.utf8(&s);
        writer.u8(0);

        let bytes = writer.flush();
        let mut reader = Reader::new(&bytes);
        prop_assert_eq!(reader.u8().unwrap(), a);
        prop_assert_eq!(reader.i32().unwrap(), b);
        prop_assert_eq!(reader.f64().unwrap().to_bits(), c.to_bits());
        let text = reader.read_until(0).unwrap();
        prop_assert_eq!(text.len(), len);
        prop_assert!(reader.is_eof());
    }
}
