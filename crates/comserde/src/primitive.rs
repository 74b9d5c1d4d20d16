//! Leaf formats.
//!
//! Every [`Format`] maps one kind of [`Value`] to a fixed byte layout. The
//! opaque fallback lives here too: it is a `bytes` payload produced by
//! `ciborium`.

use comserde_buffers::{Reader, Writer};

use crate::descriptor::Format;
use crate::error::{DeserializationError, EncodeError};
use crate::value::{Value, ValueMap};
use crate::varint::{
    read_signed_varint, read_sized_varint, read_varint, write_signed_varint, write_sized_varint,
    write_varint,
};

const UTF16_LE_BOM: [u8; 2] = [0xff, 0xfe];

fn mismatch(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

fn out_of_range(value: i128, format: Format) -> EncodeError {
    EncodeError::IntegerOutOfRange {
        value,
        format: format.name(),
    }
}

fn int_of(value: &Value) -> Result<i128, EncodeError> {
    value.as_int().ok_or_else(|| mismatch("int", value))
}

/// Writes `value` as an unsigned integer of `format`, used for ordinals and
/// flag bitsets.
pub(crate) fn write_uint(writer: &mut Writer, value: u128, format: Format) -> Result<(), EncodeError> {
    let width = match format {
        Format::U8 => 1,
        Format::U16 => 2,
        Format::U32 => 4,
        Format::U64 => 8,
        other => {
            write_sized_varint(writer, value, other.fixed_size().unwrap_or(0));
            return Ok(());
        }
    };
    if value >> (width * 8) != 0 {
        return Err(out_of_range(i128::try_from(value).unwrap_or(i128::MAX), format));
    }
    writer.uint_le(value, width);
    Ok(())
}

pub(crate) fn read_uint(reader: &mut Reader<'_>, format: Format) -> Result<u128, DeserializationError> {
    Ok(match format {
        Format::U8 => reader.uint_le(1)?,
        Format::U16 => reader.uint_le(2)?,
        Format::U32 => reader.uint_le(4)?,
        Format::U64 => reader.uint_le(8)?,
        other => read_sized_varint(reader, other.fixed_size().unwrap_or(0))?,
    })
}

pub(crate) fn write_bytes(writer: &mut Writer, bytes: &[u8]) {
    write_varint(writer, bytes.len() as u128);
    writer.buf(bytes);
}

pub(crate) fn read_bytes<'a>(reader: &mut Reader<'a>) -> Result<&'a [u8], DeserializationError> {
    let len = read_varint(reader)?;
    let len = usize::try_from(len).map_err(|_| DeserializationError::IntegerOutOfRange)?;
    Ok(reader.buf(len)?)
}

pub(crate) fn write_str(writer: &mut Writer, s: &str) {
    write_bytes(writer, s.as_bytes());
}

pub(crate) fn read_str(reader: &mut Reader<'_>) -> Result<String, DeserializationError> {
    let bytes = read_bytes(reader)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DeserializationError::InvalidText { encoding: "utf-8" })
}

pub(crate) fn write(writer: &mut Writer, value: &Value, format: Format) -> Result<(), EncodeError> {
    match format {
        Format::Bool => {
            let b = value.as_bool().ok_or_else(|| mismatch("bool", value))?;
            writer.u8(u8::from(b));
        }
        Format::U8 | Format::U16 | Format::U32 | Format::U64 => {
            let v = int_of(value)?;
            let v = u128::try_from(v).map_err(|_| out_of_range(v, format))?;
            write_uint(writer, v, format)?;
        }
        Format::I8 => {
            let v = int_of(value)?;
            writer.i8(i8::try_from(v).map_err(|_| out_of_range(v, format))?);
        }
        Format::I16 => {
            let v = int_of(value)?;
            writer.i16(i16::try_from(v).map_err(|_| out_of_range(v, format))?);
        }
        Format::I32 => {
            let v = int_of(value)?;
            writer.i32(i32::try_from(v).map_err(|_| out_of_range(v, format))?);
        }
        Format::I64 => {
            let v = int_of(value)?;
            writer.i64(i64::try_from(v).map_err(|_| out_of_range(v, format))?);
        }
        Format::V8 | Format::V16 | Format::V32 | Format::V64 => {
            let v = int_of(value)?;
            let v = u128::try_from(v).map_err(|_| out_of_range(v, format))?;
            write_uint(writer, v, format)?;
        }
        Format::W8 | Format::W16 | Format::W32 | Format::W64 => {
            let v = int_of(value)?;
            write_signed_varint(writer, v, format.fixed_size().unwrap_or(0));
        }
        Format::F32 => {
            let f = value.as_float().ok_or_else(|| mismatch("float", value))?;
            writer.f32(f as f32);
        }
        Format::F64 => {
            let f = value.as_float().ok_or_else(|| mismatch("float", value))?;
            writer.f64(f);
        }
        Format::Complex => {
            let (re, im) = match value {
                Value::Complex { re, im } => (*re, *im),
                other => (other.as_float().ok_or_else(|| mismatch("complex", other))?, 0.0),
            };
            writer.f32(re as f32);
            writer.f32(im as f32);
        }
        Format::Bytes => {
            let bytes = value.as_bytes().ok_or_else(|| mismatch("bytes", value))?;
            write_bytes(writer, bytes);
        }
        Format::NtBytes => {
            let bytes = value.as_bytes().ok_or_else(|| mismatch("bytes", value))?;
            if bytes.contains(&0) {
                return Err(EncodeError::EmbeddedTerminator);
            }
            writer.buf(bytes);
            writer.u8(0);
        }
        Format::Utf8 => {
            let s = value.as_str().ok_or_else(|| mismatch("str", value))?;
            write_str(writer, s);
        }
        Format::Utf16 => {
            let s = value.as_str().ok_or_else(|| mismatch("str", value))?;
            let mut bytes = UTF16_LE_BOM.to_vec();
            bytes.extend(s.encode_utf16().flat_map(u16::to_le_bytes));
            write_bytes(writer, &bytes);
        }
        Format::Json => {
            let json = to_json(value)?;
            write_str(writer, &json.to_string());
        }
        Format::Void => {
            if !value.is_none() {
                return Err(mismatch("none", value));
            }
        }
    }
    Ok(())
}

pub(crate) fn read(reader: &mut Reader<'_>, format: Format) -> Result<Value, DeserializationError> {
    Ok(match format {
        Format::Bool => Value::Bool(reader.u8()? != 0),
        Format::U8 | Format::U16 | Format::U32 | Format::U64 => Value::Int(read_uint(reader, format)? as i128),
        Format::I8 => Value::Int(reader.i8()?.into()),
        Format::I16 => Value::Int(reader.i16()?.into()),
        Format::I32 => Value::Int(reader.i32()?.into()),
        Format::I64 => Value::Int(reader.i64()?.into()),
        Format::V8 | Format::V16 | Format::V32 | Format::V64 => {
            let v = read_uint(reader, format)?;
            Value::Int(i128::try_from(v).map_err(|_| DeserializationError::IntegerOutOfRange)?)
        }
        Format::W8 | Format::W16 | Format::W32 | Format::W64 => {
            Value::Int(read_signed_varint(reader, format.fixed_size().unwrap_or(0))?)
        }
        Format::F32 => Value::Float(reader.f32()?.into()),
        Format::F64 => Value::Float(reader.f64()?),
        Format::Complex => {
            let re = reader.f32()?.into();
            let im = reader.f32()?.into();
            Value::Complex { re, im }
        }
        Format::Bytes => Value::Bytes(read_bytes(reader)?.to_vec()),
        Format::NtBytes => Value::Bytes(reader.read_until(0)?.to_vec()),
        Format::Utf8 => Value::Str(read_str(reader)?),
        Format::Utf16 => Value::Str(decode_utf16(read_bytes(reader)?)?),
        Format::Json => {
            let text = read_str(reader)?;
            let json: serde_json::Value = serde_json::from_str(&text).map_err(DeserializationError::Json)?;
            from_json(json)
        }
        Format::Void => Value::None,
    })
}

fn decode_utf16(bytes: &[u8]) -> Result<String, DeserializationError> {
    let invalid = || DeserializationError::InvalidText { encoding: "utf-16" };
    if bytes.len() % 2 != 0 {
        return Err(invalid());
    }
    let (body, from_bytes): (&[u8], fn([u8; 2]) -> u16) = match bytes {
        [0xff, 0xfe, rest @ ..] => (rest, u16::from_le_bytes),
        [0xfe, 0xff, rest @ ..] => (rest, u16::from_be_bytes),
        _ => (bytes, u16::from_le_bytes),
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| invalid())
}

/// Converts `value` into a JSON document.
///
/// Integers must fit in 64 bits, floats must be finite and map keys must be
/// strings. Sequences of every kind become arrays.
pub fn to_json(value: &Value) -> Result<serde_json::Value, EncodeError> {
    use serde_json::Value as Json;

    Ok(match value {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => {
            if let Ok(i) = i64::try_from(*i) {
                Json::from(i)
            } else if let Ok(u) = u64::try_from(*i) {
                Json::from(u)
            } else {
                return Err(EncodeError::NotJson(format!("integer {i} exceeds 64 bits")));
            }
        }
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| EncodeError::NotJson(format!("non-finite float {f}")))?,
        Value::Str(s) => Json::String(s.clone()),
        Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Deque(_) => Json::Array(
            value
                .elements()
                .unwrap_or_default()
                .into_iter()
                .map(to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (k, v) in map.iter() {
                let key = k
                    .as_str()
                    .ok_or_else(|| EncodeError::NotJson(format!("{} map key", k.kind())))?;
                object.insert(key.to_owned(), to_json(v)?);
            }
            Json::Object(object)
        }
        other => return Err(EncodeError::NotJson(format!("{} value", other.kind()))),
    })
}

/// Converts a JSON document back: arrays become lists, objects become maps
/// keyed by strings.
pub fn from_json(json: serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match json {
        Json::Null => Value::None,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Int(u.into())
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::Str(s),
        Json::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        Json::Object(object) => Value::Map(
            object
                .into_iter()
                .map(|(k, v)| (Value::Str(k), from_json(v)))
                .collect::<ValueMap>(),
        ),
    }
}

pub(crate) fn write_opaque(writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
    let mut payload = Vec::new();
    ciborium::into_writer(value, &mut payload).map_err(|err| EncodeError::Opaque(err.to_string()))?;
    write_bytes(writer, &payload);
    Ok(())
}

pub(crate) fn read_opaque(reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
    let payload = read_bytes(reader)?;
    ciborium::from_reader(payload).map_err(|err| DeserializationError::Opaque(err.to_string()))
}
