//! Per-type codecs
//!
//! An [`XmlCodec`] is what the cache stores: the compiled [`Shape`] of one primary type
//! plus the shapes of any auxiliary types it was built with. Building one is the
//! expensive path, reading and writing through it is not.

use std::any::TypeId;
use std::fmt;
use std::io::{BufRead, Write};
use std::marker::PhantomData;

use error_stack::Report;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::settings::{Newline, WriterSettings, XML_DECLARATION};
use crate::shape::{Shape, ShapeKind};

/// Values the façade can carry: anything serde can write and read back owned
pub trait XmlValue: Serialize + DeserializeOwned + 'static {}

impl<T> XmlValue for T where T: Serialize + DeserializeOwned + 'static {}

/// An auxiliary type offered to codec construction
///
/// Auxiliary types are probed along with the primary type the first time a codec is
/// built. Their element names must not collide with the primary root or with each
/// other. They are checked at construction and recorded on the codec, but reading
/// and writing never consult them: the value's own serde implementation decides how
/// nested members are written, so they do not resolve polymorphic members.
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    type_id:   TypeId,
    type_name: &'static str,
    probe:     fn(&str) -> std::result::Result<Shape, String>,
}

impl TypeDescriptor {
    /// Describe `U`
    pub fn of<U: DeserializeOwned + 'static>() -> Self {
        Self {
            type_id:   TypeId::of::<U>(),
            type_name: std::any::type_name::<U>(),
            probe:     Shape::of::<U>,
        }
    }

    /// `TypeId` of the described type
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified name of the described type
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeDescriptor").field(&self.type_name).finish()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeDescriptor {}

/// Engine-constructed transformer between `T` and XML text
pub struct XmlCodec<T> {
    type_name: &'static str,
    shape:     Shape,
    auxiliary: Vec<(TypeDescriptor, Shape)>,
    _marker:   PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for XmlCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlCodec")
            .field("type_name", &self.type_name)
            .field("shape", &self.shape)
            .field("auxiliary", &self.auxiliary_types())
            .finish()
    }
}

impl<T> XmlCodec<T> {
    /// Fully qualified name of the primary type
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Compiled shape of the primary type
    pub const fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Root element name written for `T`
    pub fn root(&self) -> &str {
        self.shape.root()
    }

    /// Auxiliary types this codec was constructed with
    pub fn auxiliary_types(&self) -> Vec<TypeDescriptor> {
        self.auxiliary
            .iter()
            .map(|(descriptor, _)| *descriptor)
            .collect()
    }

    /// Element names contributed by the auxiliary types, in construction order
    pub fn auxiliary_roots(&self) -> impl Iterator<Item = &str> {
        self.auxiliary.iter().map(|(_, shape)| shape.root())
    }
}

impl<T: XmlValue> XmlCodec<T> {
    /// Compile a codec for `T` and the given auxiliary types
    pub fn build(auxiliary_types: &[TypeDescriptor]) -> Result<Self> {
        let type_name = std::any::type_name::<T>();
        let shape = Shape::of::<T>(type_name)
            .map_err(|reason| Report::new(Error::construction(type_name, reason)))?;

        let mut auxiliary: Vec<(TypeDescriptor, Shape)> = Vec::with_capacity(auxiliary_types.len());
        for descriptor in auxiliary_types {
            if descriptor.type_id == TypeId::of::<T>()
                || auxiliary.iter().any(|(known, _)| known == descriptor)
            {
                continue;
            }

            let aux_shape = (descriptor.probe)(descriptor.type_name).map_err(|reason| {
                Report::new(Error::construction(
                    type_name,
                    format!("auxiliary type {}: {reason}", descriptor.type_name),
                ))
            })?;

            let clashes_with_root = aux_shape.root() == shape.root();
            let clashes_with_aux = auxiliary
                .iter()
                .any(|(_, known)| known.root() == aux_shape.root());
            if clashes_with_root || clashes_with_aux {
                return Err(Report::new(Error::construction(
                    type_name,
                    format!(
                        "auxiliary type {} reuses element name '{}'",
                        descriptor.type_name,
                        aux_shape.root()
                    ),
                )));
            }

            auxiliary.push((*descriptor, aux_shape));
        }

        Ok(Self {
            type_name,
            shape,
            auxiliary,
            _marker: PhantomData,
        })
    }

    /// Render `value` as XML text
    pub fn render(&self, value: &T, settings: &WriterSettings) -> Result<String> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::with_root(&mut body, Some(self.root()))
            .map_err(|e| self.write_error(e))?;
        if let Some(indent) = settings.indent {
            serializer.indent(indent.character, indent.size);
        }
        serializer.expand_empty_elements(settings.expand_empty_elements);
        value.serialize(serializer).map_err(|e| self.write_error(e))?;

        let mut document = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
        if !settings.omit_declaration {
            document.push_str(XML_DECLARATION);
            if settings.indent.is_some() {
                document.push('\n');
            }
        }
        document.push_str(&body);

        Ok(match settings.newline {
            Newline::Lf => document,
            Newline::CrLf => terminate_markup_lines(&document, Newline::CrLf),
        })
    }

    /// Write `value` through a caller-owned writer
    ///
    /// The document is rendered completely before the first byte is written.
    pub fn write<W: Write + ?Sized>(
        &self,
        value: &T,
        writer: &mut W,
        settings: &WriterSettings,
    ) -> Result<()> {
        let document = self.render(value, settings)?;
        writer
            .write_all(document.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| {
                Report::new(Error::FileOperation(format!(
                    "Failed to write {} to stream: {e}",
                    self.type_name
                )))
            })
    }

    /// Parse `T` from XML text
    ///
    /// The document's root element must be the one this codec writes.
    pub fn read_str(&self, xml: &str) -> Result<T> {
        self.expect_root(xml)?;
        quick_xml::de::from_str(xml).map_err(|e| self.read_error(e))
    }

    /// Parse `T` from a caller-owned reader
    ///
    /// The reader is drained before parsing so the root element can be checked.
    pub fn read<R: BufRead>(&self, mut reader: R) -> Result<T> {
        let mut xml = String::new();
        reader
            .read_to_string(&mut xml)
            .map_err(|e| self.read_error(e))?;
        self.read_str(&xml)
    }

    /// Reject documents whose first element is not this codec's root
    ///
    /// Enums are written with variant elements, so their documents carry no fixed root.
    fn expect_root(&self, xml: &str) -> Result<()> {
        if self.shape.kind() == ShapeKind::Enum {
            return Ok(());
        }

        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().map_err(|e| self.read_error(e))? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {},
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {},
                Event::Start(start) | Event::Empty(start) => {
                    let found = start.local_name();
                    if found.as_ref() == self.root().as_bytes() {
                        return Ok(());
                    }
                    return Err(self.read_error(format!(
                        "found root element '{}'",
                        String::from_utf8_lossy(found.as_ref())
                    )));
                },
                Event::Eof => return Err(self.read_error("document has no root element")),
                _ => return Err(self.read_error("content found before the root element")),
            }
        }
    }

    fn write_error(&self, error: impl fmt::Display) -> Report<Error> {
        Report::new(Error::failed_to(&format!("write {}", self.type_name), error))
            .attach(format!("Root element: {}", self.root()))
    }

    fn read_error(&self, error: impl fmt::Display) -> Report<Error> {
        Report::new(Error::failed_to(&format!("read {}", self.type_name), error))
            .attach(format!("Expected root element: {}", self.root()))
    }
}

/// Rewrite the line breaks between markup to `newline`
///
/// Only whitespace runs that sit between a `>` and the next `<` are touched, so line
/// breaks inside text content keep their original form.
fn terminate_markup_lines(document: &str, newline: Newline) -> String {
    let mut output = String::with_capacity(document.len() + document.len() / 16);
    let mut rest = document;
    while let Some(end) = rest.find('>') {
        let (markup, after) = rest.split_at(end + 1);
        output.push_str(markup);

        let run = after
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or(after.len());
        let (whitespace, tail) = after.split_at(run);
        if tail.is_empty() || tail.starts_with('<') {
            output.push_str(&whitespace.replace('\n', newline.as_str()));
        } else {
            output.push_str(whitespace);
        }
        rest = tail;
    }
    output.push_str(rest);
    output
}
