//! Type-shape introspection
//!
//! Codec construction compiles a type's `Deserialize` implementation into a [`Shape`]
//! by driving it with a probing deserializer that records the container name and
//! declared fields instead of reading any data. The serde container name (so
//! `#[serde(rename = "...")]` is honored) becomes the root element of documents
//! written for the type.
//!
//! The serializing side has a matching probe, [`is_absent`], that reports whether a
//! root value has nothing to write (`None` or `()`).

use std::fmt;

use serde::de::{self, DeserializeOwned, Visitor};
use serde::ser::{self, Impossible, Serialize};

/// Structural category of a codec's root type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Named-field struct
    Struct,
    /// Enum, the recorded fields are its variant names
    Enum,
    /// Newtype struct
    Newtype,
    /// Unit struct
    Unit,
    /// Map-like container, including structs using `#[serde(flatten)]`
    Map,
}

/// Root element information compiled from a type's `Deserialize` implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    root:     String,
    fields:   Vec<&'static str>,
    kind:     ShapeKind,
    nullable: bool,
}

impl Shape {
    /// Probe `T` and compile its shape
    ///
    /// `type_name` is used as the root element name when serde exposes no container
    /// name (maps), and in failure messages.
    pub fn of<T: DeserializeOwned>(type_name: &str) -> Result<Self, String> {
        let capture = match T::deserialize(ShapeProbe::default()) {
            Err(ProbeSignal::Captured(capture)) => capture,
            Err(ProbeSignal::Unsupported(what)) => {
                return Err(format!("{what} cannot be the root of an XML document"));
            },
            Err(ProbeSignal::Custom(message)) => {
                return Err(format!("type rejected shape probing: {message}"));
            },
            Ok(_) => return Err("type deserialized without reading any input".to_string()),
        };

        let root = capture
            .name
            .map_or_else(|| short_type_name(type_name).to_string(), str::to_string);
        if !is_xml_name(&root) {
            return Err(format!("'{root}' is not a valid XML element name"));
        }

        Ok(Self {
            root,
            fields: capture.fields.to_vec(),
            kind: capture.kind,
            nullable: capture.nullable,
        })
    }

    /// Root element name written for values of the type
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Declared field names (variant names for enums)
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Structural category of the type
    pub const fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Whether the root type is an `Option`
    pub const fn nullable(&self) -> bool {
        self.nullable
    }
}

/// Whether `name` is a well-formed XML element name
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Last path segment of a Rust type name with generic arguments removed
pub fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Whether `value` serializes as nothing at the document root
pub fn is_absent<T: Serialize + ?Sized>(value: &T) -> bool {
    matches!(value.serialize(AbsenceProbe), Ok(true))
}

struct Capture {
    name:     Option<&'static str>,
    fields:   &'static [&'static str],
    kind:     ShapeKind,
    nullable: bool,
}

#[derive(Debug)]
enum ProbeSignal {
    Captured(Capture),
    Unsupported(&'static str),
    Custom(String),
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capture")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ProbeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Captured(capture) => write!(f, "captured {:?} shape", capture.kind),
            Self::Unsupported(what) => write!(f, "unsupported shape: {what}"),
            Self::Custom(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ProbeSignal {}

impl de::Error for ProbeSignal {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

#[derive(Default, Clone, Copy)]
struct ShapeProbe {
    nullable: bool,
}

impl ShapeProbe {
    const fn capture(
        self,
        name: Option<&'static str>,
        fields: &'static [&'static str],
        kind: ShapeKind,
    ) -> ProbeSignal {
        ProbeSignal::Captured(Capture {
            name,
            fields,
            kind,
            nullable: self.nullable,
        })
    }
}

impl<'de> de::Deserializer<'de> for ShapeProbe {
    type Error = ProbeSignal;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeSignal::Unsupported("a primitive or self-describing value"))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(Self { nullable: true })
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.capture(Some(name), &[], ShapeKind::Unit))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.capture(Some(name), &[], ShapeKind::Newtype))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeSignal::Unsupported("a sequence"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(ProbeSignal::Unsupported("a tuple"))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(ProbeSignal::Unsupported("a tuple struct"))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.capture(None, &[], ShapeKind::Map))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.capture(Some(name), fields, ShapeKind::Struct))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.capture(Some(name), variants, ShapeKind::Enum))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit identifier ignored_any
    }
}

/// Raised by [`AbsenceProbe`] for any value that would write content
#[derive(Debug)]
struct Present;

impl fmt::Display for Present {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is present")
    }
}

impl std::error::Error for Present {}

impl ser::Error for Present {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Self
    }
}

struct AbsenceProbe;

macro_rules! present {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _value: $ty) -> Result<bool, Present> {
                Ok(false)
            }
        )*
    };
}

impl ser::Serializer for AbsenceProbe {
    type Ok = bool;
    type Error = Present;
    type SerializeSeq = Impossible<bool, Present>;
    type SerializeTuple = Impossible<bool, Present>;
    type SerializeTupleStruct = Impossible<bool, Present>;
    type SerializeTupleVariant = Impossible<bool, Present>;
    type SerializeMap = Impossible<bool, Present>;
    type SerializeStruct = Impossible<bool, Present>;
    type SerializeStructVariant = Impossible<bool, Present>;

    present! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> Result<bool, Present> {
        Ok(true)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<bool, Present> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<bool, Present> {
        Ok(true)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<bool, Present> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<bool, Present> {
        Ok(false)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<bool, Present> {
        Ok(false)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Present> {
        Err(Present)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Present> {
        Err(Present)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Present> {
        Err(Present)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Present> {
        Err(Present)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Present> {
        Err(Present)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Present> {
        Err(Present)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Present> {
        Err(Present)
    }
}
