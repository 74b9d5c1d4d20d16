//! [`Value`]: the dynamic value model every descriptor encodes and decodes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identity of a registered struct, enum or flag type.
///
/// `namespace` is the dotted module path the type lives in, `qualname` its
/// (possibly nested) name inside that namespace. Both travel on the wire for
/// dynamic objects, so they must be stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeName {
    pub namespace: String,
    pub qualname: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            qualname: qualname.into(),
        }
    }
}

/// Splits a dotted path at its last `.`: `"shapes.Circle"` becomes namespace
/// `shapes`, qualname `Circle`. A path without dots has an empty namespace.
impl From<&str> for TypeName {
    fn from(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((namespace, qualname)) => Self::new(namespace, qualname),
            None => Self::new("", path),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.qualname)
        } else {
            write!(f, "{}.{}", self.namespace, self.qualname)
        }
    }
}

/// Any value the codec can carry.
///
/// Values are totally ordered: kinds compare by declaration order, floats by
/// [`f64::total_cmp`]. Equality follows the same order, so `NaN` equals
/// itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// The absent value, encoded by `void`.
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex { re: f64, im: f64 },
    Bytes(Vec<u8>),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(ValueSet),
    Map(ValueMap),
    Deque(Deque),
    Struct(StructValue),
    Enum(EnumValue),
    Flag(FlagValue),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Deque(_) => "deque",
            Value::Struct(_) => "struct",
            Value::Enum(_) => "enum",
            Value::Flag(_) => "flag",
        }
    }

    /// The concrete type of a struct, enum or flag value.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Value::Struct(v) => Some(&v.type_name),
            Value::Enum(v) => Some(&v.type_name),
            Value::Flag(v) => Some(&v.type_name),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::None => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Complex { .. } => 4,
            Value::Bytes(_) => 5,
            Value::Str(_) => 6,
            Value::List(_) => 7,
            Value::Tuple(_) => 8,
            Value::Set(_) => 9,
            Value::Map(_) => 10,
            Value::Deque(_) => 11,
            Value::Struct(_) => 12,
            Value::Enum(_) => 13,
            Value::Flag(_) => 14,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats as-is, integers widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Elements of any sequence-like value: list, tuple or deque items are
    /// returned in order, set members in ascending order.
    pub fn elements(&self) -> Option<Vec<&Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.iter().collect()),
            Value::Set(set) => Some(set.iter().collect()),
            Value::Deque(deque) => Some(deque.iter().collect()),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(v) => Some(v),
            _ => None,
        }
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn tuple<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    pub fn set<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Set(items.into_iter().collect())
    }

    pub fn map<I: IntoIterator<Item = (Value, Value)>>(entries: I) -> Self {
        Value::Map(entries.into_iter().collect())
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::None, Value::None) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Complex { re: a_re, im: a_im }, Value::Complex { re: b_re, im: b_im }) => {
                a_re.total_cmp(b_re).then_with(|| a_im.total_cmp(b_im))
            }
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Deque(a), Value::Deque(b)) => a.cmp(b),
            (Value::Struct(a), Value::Struct(b)) => a.cmp(b),
            (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            (Value::Flag(a), Value::Flag(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

macro_rules! from_int {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(v as i128)
                }
            }
        )+
    };
}

from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Paths travel as text. Non-UTF-8 components are replaced.
impl From<&Path> for Value {
    fn from(v: &Path) -> Self {
        Value::Str(v.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::from(v.as_path())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Value::Struct(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<FlagValue> for Value {
    fn from(v: FlagValue) -> Self {
        Value::Flag(v)
    }
}

/// Unordered collection of distinct values.
///
/// Members iterate in [`Value`]'s total order, so two sets holding the same
/// members are equal and encode to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueSet(BTreeSet<Value>);

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` unless an equal member is present. Returns whether it was
    /// added.
    pub fn insert(&mut self, value: Value) -> bool {
        self.0.insert(value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, Value> {
        self.0.iter()
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mapping with arbitrary value keys, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueMap(BTreeMap<Value, Value>);

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`, returning the previous value.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, Value, Value> {
        self.0.iter()
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Double-ended queue with an optional length bound.
///
/// Pushing onto a full bounded deque discards the oldest item, so the deque
/// always holds the most recently appended `max_len` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Deque {
    max_len: Option<usize>,
    items: VecDeque<Value>,
}

impl Deque {
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            max_len,
            items: VecDeque::new(),
        }
    }

    pub fn bounded<I: IntoIterator<Item = Value>>(max_len: Option<usize>, items: I) -> Self {
        let mut deque = Self::new(max_len);
        deque.extend(items);
        deque
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn push_back(&mut self, value: Value) {
        if self.max_len == Some(0) {
            return;
        }
        if self.max_len.is_some_and(|max| self.items.len() >= max) {
            self.items.pop_front();
        }
        self.items.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, Value> {
        self.items.iter()
    }
}

impl Extend<Value> for Deque {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

/// Instance of a registered struct type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructValue {
    pub type_name: TypeName,
    pub fields: BTreeMap<String, Value>,
}

impl StructValue {
    /// An instance with no fields assigned yet.
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// One variant of a registered enum type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    pub type_name: TypeName,
    pub variant: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<TypeName>, variant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }
}

/// A combination of the flags of a registered flag type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlagValue {
    pub type_name: TypeName,
    pub flags: BTreeSet<String>,
}

impl FlagValue {
    pub fn new<I, S>(type_name: impl Into<TypeName>, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_from_path() {
        let name = TypeName::from("shapes.solid.Cube");
        assert_eq!(name.namespace, "shapes.solid");
        assert_eq!(name.qualname, "Cube");
        assert_eq!(name.to_string(), "shapes.solid.Cube");
        assert_eq!(TypeName::from("Cube").to_string(), "Cube");
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a = Value::set([1.into(), 2.into(), 3.into()]);
        let b = Value::set([3.into(), 1.into(), 2.into(), 1.into()]);
        assert_eq!(a, b);
        assert_ne!(a, Value::set([1.into(), 2.into()]));
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = Value::map([("x".into(), 1.into()), ("y".into(), 2.into())]);
        let b = Value::map([("y".into(), 2.into()), ("x".into(), 1.into())]);
        assert_eq!(a, b);
        let c = Value::map([("y".into(), 3.into()), ("x".into(), 1.into())]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_bounded_deque_drops_oldest() {
        let deque = Deque::bounded(Some(2), [1.into(), 2.into(), 3.into()]);
        let items: Vec<_> = deque.iter().cloned().collect();
        assert_eq!(items, vec![Value::Int(2), Value::Int(3)]);

        let empty = Deque::bounded(Some(0), [1.into()]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_set_collapses_duplicates_in_order() {
        let set: ValueSet = (0..10_000).rev().chain(0..10_000).map(Value::from).collect();
        assert_eq!(set.len(), 10_000);
        assert_eq!(set.iter().next(), Some(&Value::Int(0)));
        assert!(set.contains(&Value::Int(9_999)));
    }

    #[test]
    fn test_floats_are_totally_ordered() {
        let set = Value::set([f64::NAN.into(), f64::NAN.into(), 0.0.into(), (-0.0).into()]);
        let Value::Set(set) = set else { unreachable!() };
        assert_eq!(set.len(), 3);
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert!(Value::Float(-0.0) < Value::Float(0.0));
        assert!(Value::Bool(true) < Value::Int(0));
    }

    #[test]
    fn test_path_conversion() {
        let path = PathBuf::from("logs").join("app.log");
        assert_eq!(Value::from(path.as_path()), Value::Str(path.to_string_lossy().into_owned()));
        assert_eq!(Value::from(PathBuf::from("a")), Value::from("a"));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::None);
        assert_eq!(Value::from(Some("a")), Value::Str("a".into()));
    }
}
