//! Struct, enum, flag and open-union definitions driven through a codec.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use comserde::{
    Codec, CustomCodec, DeserializationError, Descriptor, EncodeError, EnumDef, EnumValue, FieldDef, FlagDef,
    FlagValue, Format, OpenUnion, Reader, StructDef, StructValue, TypeName, TypeRegistry, Value, Writer,
};

fn cache_def() -> Arc<StructDef> {
    StructDef::builder("demo.Cache")
        .field("key", Format::Utf8)
        .field_def(FieldDef::new("hits", Format::V8).skip().default_value(16))
        .build()
        .unwrap()
}

#[test]
fn skipped_field_is_off_the_wire() {
    let codec = Codec::default();
    let descriptor = Descriptor::from(cache_def());
    let value = Value::Struct(StructValue::new("demo.Cache").with("key", "k").with("hits", 99));

    let bytes = codec.encode(&value, &descriptor).unwrap();
    assert_eq!(bytes, [0x01, b'k']);

    let decoded = codec.decode(&bytes, &descriptor).unwrap();
    let decoded = decoded.as_struct().unwrap();
    assert_eq!(decoded.get("key"), Some(&Value::from("k")));
    assert_eq!(decoded.get("hits"), Some(&Value::Int(16)));
}

#[test]
fn computed_default_runs_per_decode() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let def = StructDef::builder("demo.Session")
        .field("user", Format::Utf8)
        .field_def(FieldDef::new("seen", Format::V8).skip().default_with(move || {
            Value::from(counter.fetch_add(1, Ordering::SeqCst))
        }))
        .build()
        .unwrap();
    let descriptor = Descriptor::from(def);
    let codec = Codec::default();

    let first = codec.decode(&[0x01, b'a'], &descriptor).unwrap();
    let second = codec.decode(&[0x01, b'b'], &descriptor).unwrap();
    assert_eq!(first.as_struct().unwrap().get("seen"), Some(&Value::Int(0)));
    assert_eq!(second.as_struct().unwrap().get("seen"), Some(&Value::Int(1)));
}

#[test]
fn missing_field_falls_back_to_default() {
    let def = StructDef::builder("demo.Config")
        .field_def(FieldDef::new("retries", Format::U8).default_value(3))
        .field("name", Format::Utf8)
        .build()
        .unwrap();
    let descriptor = Descriptor::from(def);
    let codec = Codec::default();

    let partial = Value::Struct(StructValue::new("demo.Config").with("name", "x"));
    assert_eq!(codec.encode(&partial, &descriptor).unwrap(), [0x03, 0x01, b'x']);

    let incomplete = Value::Struct(StructValue::new("demo.Config").with("retries", 1));
    assert!(matches!(
        codec.encode(&incomplete, &descriptor),
        Err(EncodeError::MissingField { field, .. }) if field == "name"
    ));

    let stranger = Value::Struct(StructValue::new("demo.Other"));
    assert!(matches!(
        codec.encode(&stranger, &descriptor),
        Err(EncodeError::WrongType { .. })
    ));
}

#[test]
fn construct_hook_replaces_assignment() {
    let def = StructDef::builder("geo.Rect")
        .field("w", Format::U8)
        .field("h", Format::U8)
        .on_construct(|name, fields| {
            let mut rect = StructValue::new(name.clone());
            let mut area = 1;
            for (field, value) in fields {
                area *= value.as_int().ok_or("non-integer side")?;
                rect.set(field, value);
            }
            rect.set("area", area);
            Ok(rect)
        })
        .build()
        .unwrap();
    let decoded = Codec::default().decode(&[0x03, 0x04], &def.into()).unwrap();
    assert_eq!(decoded.as_struct().unwrap().get("area"), Some(&Value::Int(12)));
}

#[test]
fn finalize_hook_validates() {
    let def = StructDef::builder("geo.Range")
        .field("lo", Format::U8)
        .field("hi", Format::U8)
        .on_finalize(|range| {
            let lo = range.get("lo").and_then(Value::as_int);
            let hi = range.get("hi").and_then(Value::as_int);
            if lo > hi {
                return Err(format!("{lo:?} > {hi:?}"));
            }
            range.set("valid", true);
            Ok(())
        })
        .build()
        .unwrap();
    let descriptor = Descriptor::from(def);
    let codec = Codec::default();

    let ok = codec.decode(&[0x01, 0x02], &descriptor).unwrap();
    assert_eq!(ok.as_struct().unwrap().get("valid"), Some(&Value::Bool(true)));

    let err = codec.decode(&[0x02, 0x01], &descriptor).unwrap_err();
    assert!(matches!(err, DeserializationError::Construction { .. }));
}

#[test]
fn enum_width_follows_cardinality() {
    let codec = Codec::default();

    let large = EnumDef::new("demo.Large", (0..300).map(|i| format!("V{i}"))).unwrap();
    let bytes = codec
        .encode(&EnumValue::new("demo.Large", "V299").into(), &large.clone().into())
        .unwrap();
    assert_eq!(bytes, [0x2b, 0x01]);
    assert_eq!(
        codec.decode(&bytes, &large.into()).unwrap(),
        Value::Enum(EnumValue::new("demo.Large", "V299"))
    );

    let small = EnumDef::new("demo.Small", ["A", "B", "C", "D", "E"]).unwrap();
    let bytes = codec
        .encode(&EnumValue::new("demo.Small", "E").into(), &small.clone().into())
        .unwrap();
    assert_eq!(bytes, [0x04]);

    assert!(matches!(
        codec.decode(&[0x05], &small.into()),
        Err(DeserializationError::InvalidEnumOrdinal { ordinal: 5, .. })
    ));
}

#[test]
fn flags_round_trip() {
    let def = FlagDef::new("fs.Mode", ["Read", "Write", "Exec"]).unwrap();
    let descriptor = Descriptor::from(def);
    let codec = Codec::default();

    let value = Value::Flag(FlagValue::new("fs.Mode", ["Write", "Exec"]));
    let bytes = codec.encode(&value, &descriptor).unwrap();
    assert_eq!(bytes, [0b110]);
    assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), value);

    let empty = Value::Flag(FlagValue::new("fs.Mode", Vec::<String>::new()));
    assert_eq!(codec.encode(&empty, &descriptor).unwrap(), [0x00]);

    assert!(matches!(
        codec.decode(&[0b1000], &descriptor),
        Err(DeserializationError::InvalidFlagBits { .. })
    ));
}

fn shapes() -> (Arc<OpenUnion>, Arc<StructDef>, Arc<StructDef>) {
    let union = OpenUnion::new("shapes.Shape");
    let circle = StructDef::builder("shapes.Circle")
        .field("r", Format::U8)
        .build()
        .unwrap();
    let square = StructDef::builder("shapes.Square")
        .field("side", Format::U8)
        .build()
        .unwrap();
    union.register(circle.clone()).unwrap();
    union.register(square.clone()).unwrap();
    (union, circle, square)
}

#[test]
fn open_union_requires_freeze() {
    let (union, _, _) = shapes();
    let descriptor = Descriptor::from(union.clone());
    let codec = Codec::default();
    let square = Value::Struct(StructValue::new("shapes.Square").with("side", 2));

    assert!(matches!(
        codec.encode(&square, &descriptor),
        Err(EncodeError::UnionNotFrozen(_))
    ));
    assert!(matches!(
        codec.decode(&[0x00, 0x01], &descriptor),
        Err(DeserializationError::UnionNotFrozen(_))
    ));

    union.freeze();
    let bytes = codec.encode(&square, &descriptor).unwrap();
    assert_eq!(bytes, [0x01, 0x02]);
    assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), square);
}

#[test]
fn open_union_rejects_abstract_base() {
    let (union, _, _) = shapes();
    union.freeze();
    let base = Value::Struct(StructValue::new("shapes.Shape"));
    assert!(matches!(
        Codec::default().encode(&base, &union.into()),
        Err(EncodeError::AbstractType(_))
    ));
}

#[test]
fn open_union_inside_a_union() {
    let (union, _, _) = shapes();
    union.freeze();
    let descriptor = Descriptor::Union(vec![Format::Void.into(), union.into()]);
    let circle = Value::Struct(StructValue::new("shapes.Circle").with("r", 9));
    let codec = Codec::default();

    let bytes = codec.encode(&circle, &descriptor).unwrap();
    assert_eq!(bytes, [0x01, 0x00, 0x09]);
    assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), circle);
}

fn registry_codec() -> (Codec, Arc<StructDef>) {
    let point = StructDef::builder("geo.Point")
        .field("x", Format::W8)
        .field("y", Format::W8)
        .build()
        .unwrap();
    let node = StructDef::builder("demo.Node")
        .field("value", Format::V8)
        .field("next", Descriptor::optional(Descriptor::named("demo.Node")))
        .build()
        .unwrap();
    let color = EnumDef::new("geo.Color", ["Red", "Green"]).unwrap();

    let mut registry = TypeRegistry::new();
    registry
        .register_struct(&point)
        .register_struct(&node)
        .register_enum(&color)
        .register("geo.Meters", Format::F64.into());
    (Codec::new(Arc::new(registry)), point)
}

#[test]
fn dynamic_object_carries_type_name() {
    let (codec, _) = registry_codec();
    let point = Value::Struct(StructValue::new("geo.Point").with("x", 1).with("y", -1));

    let bytes = codec.encode(&point, &Descriptor::Object).unwrap();
    let mut expected = vec![0x03];
    expected.extend_from_slice(b"geo");
    expected.push(0x05);
    expected.extend_from_slice(b"Point");
    expected.extend_from_slice(&[0x02, 0x03]);
    assert_eq!(bytes, expected);
    assert_eq!(codec.decode(&bytes, &Descriptor::Object).unwrap(), point);

    let color = Value::Enum(EnumValue::new("geo.Color", "Green"));
    let bytes = codec.encode(&color, &Descriptor::Object).unwrap();
    assert_eq!(codec.decode(&bytes, &Descriptor::Object).unwrap(), color);
}

#[test]
fn dynamic_object_resolution_failures() {
    let (codec, _) = registry_codec();

    let unknown = [0x03, b'g', b'e', b'o', 0x04, b'L', b'i', b'n', b'e'];
    assert!(matches!(
        codec.decode(&unknown, &Descriptor::Object),
        Err(DeserializationError::UnresolvedType(name)) if name.qualname == "Line"
    ));

    let primitive = [0x03, b'g', b'e', b'o', 0x06, b'M', b'e', b't', b'e', b'r', b's'];
    assert!(matches!(
        codec.decode(&primitive, &Descriptor::Object),
        Err(DeserializationError::NotDecodable(_))
    ));

    assert!(matches!(
        codec.encode(&Value::Int(1), &Descriptor::Object),
        Err(EncodeError::NotAnObject("int"))
    ));
}

#[test]
fn recursive_type_through_ref() {
    let (codec, _) = registry_codec();
    let tail = StructValue::new("demo.Node").with("value", 2).with("next", Value::None);
    let head = Value::Struct(StructValue::new("demo.Node").with("value", 1).with("next", tail));

    let descriptor = Descriptor::named("demo.Node");
    let bytes = codec.encode(&head, &descriptor).unwrap();
    assert_eq!(bytes, [0x01, 0x01, 0x02, 0x00]);
    assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), head);
}

#[test]
fn registered_types_infer_their_descriptor() {
    let (codec, _) = registry_codec();
    let point = Value::Struct(StructValue::new("geo.Point").with("x", 3).with("y", 4));
    assert_eq!(codec.dumps(&point, None).unwrap(), [0x06, 0x08]);

    let stranger = Value::Struct(StructValue::new("geo.Line"));
    assert!(matches!(
        codec.dumps(&stranger, None),
        Err(EncodeError::UnresolvedType(_))
    ));
}

/// Packs a color into three bytes followed by an optional label.
struct Rgb {
    name: TypeName,
    label: Descriptor,
}

impl Rgb {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            name: "gfx.Rgb".into(),
            label: Descriptor::optional(Format::Utf8.into()),
        })
    }
}

impl CustomCodec for Rgb {
    fn type_name(&self) -> &TypeName {
        &self.name
    }

    fn write(&self, codec: &Codec, writer: &mut Writer, value: &Value) -> Result<(), EncodeError> {
        let color = match value {
            Value::Struct(color) if color.type_name == self.name => color,
            other => {
                return Err(EncodeError::TypeMismatch {
                    expected: "gfx.Rgb",
                    found: other.kind(),
                })
            }
        };
        for channel in ["r", "g", "b"] {
            let level = color.get(channel).and_then(Value::as_int).unwrap_or(0);
            writer.u8(u8::try_from(level).map_err(|_| EncodeError::IntegerOutOfRange {
                value: level,
                format: "u8",
            })?);
        }
        let label = color.get("label").cloned().unwrap_or(Value::None);
        codec.encode_into(writer, &label, &self.label)
    }

    fn read(&self, codec: &Codec, reader: &mut Reader<'_>) -> Result<Value, DeserializationError> {
        let mut color = StructValue::new(self.name.clone());
        for channel in ["r", "g", "b"] {
            color.set(channel, reader.u8()?);
        }
        color.set("label", codec.read_value(reader, &self.label)?);
        Ok(Value::Struct(color))
    }
}

fn teal(label: Option<&str>) -> Value {
    Value::Struct(
        StructValue::new("gfx.Rgb")
            .with("r", 0)
            .with("g", 128)
            .with("b", 128)
            .with("label", label),
    )
}

#[test]
fn custom_codec_writes_its_own_layout() {
    let codec = Codec::default();
    let descriptor = Descriptor::Custom(Rgb::new());

    let bytes = codec.encode(&teal(Some("t")), &descriptor).unwrap();
    assert_eq!(bytes, [0x00, 0x80, 0x80, 0x01, 0x01, b't']);
    assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), teal(Some("t")));

    let bright = Value::Struct(StructValue::new("gfx.Rgb").with("r", 300));
    assert!(matches!(
        codec.encode(&bright, &descriptor),
        Err(EncodeError::IntegerOutOfRange { value: 300, .. })
    ));

    let err = codec.decode(&[0x00, 0x80, 0x80, 0x01], &descriptor).unwrap_err();
    assert!(!err.is_eof());
}

#[test]
fn registered_custom_codec_is_reachable_by_name() {
    let mut registry = TypeRegistry::new();
    registry.register_custom(Rgb::new());
    let codec = Codec::new(Arc::new(registry));
    let value = teal(None);

    assert_eq!(codec.dumps(&value, None).unwrap(), [0x00, 0x80, 0x80, 0x00]);

    let named = Descriptor::named("gfx.Rgb");
    let bytes = codec.encode(&value, &named).unwrap();
    assert_eq!(codec.decode(&bytes, &named).unwrap(), value);

    let bytes = codec.encode(&value, &Descriptor::Object).unwrap();
    assert_eq!(&bytes[..8], [0x03, b'g', b'f', b'x', 0x03, b'R', b'g', b'b']);
    assert_eq!(codec.decode(&bytes, &Descriptor::Object).unwrap(), value);
}

#[test]
fn custom_codec_inside_a_union() {
    let descriptor = Descriptor::Union(vec![Format::Utf8.into(), Descriptor::Custom(Rgb::new())]);
    let codec = Codec::default();
    let bytes = codec.encode(&teal(None), &descriptor).unwrap();
    assert_eq!(bytes[0], 0x01);
    assert_eq!(codec.decode(&bytes, &descriptor).unwrap(), teal(None));
}
