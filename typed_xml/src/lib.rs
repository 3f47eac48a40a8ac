//! Strongly typed XML serialization with a per-type codec cache
//!
//! This crate wraps `quick-xml`'s serde support behind a [`Serializer`] that
//!
//! - builds one [`XmlCodec`] per type the first time the type is used, and reuses it
//!   afterwards while codec caching is enabled,
//! - reads and writes strings, files, caller-owned streams and named [`Fragment`]s,
//! - logs every failure through `tracing` and gives each entry point a fixed contract:
//!   either the failure is returned, or it is dropped and `None` comes back.
//!
//! # Usage
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use typed_xml::Serializer;
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Point {
//!     #[serde(rename = "X")]
//!     x: i32,
//!     #[serde(rename = "Y")]
//!     y: i32,
//! }
//!
//! let serializer = Serializer::new();
//!
//! let fragment = serializer.serialize_to_fragment(&Point { x: 3, y: 4 }, "Config").unwrap();
//! assert_eq!(fragment.name(), "Config");
//! assert_eq!(
//!     serializer.deserialize_fragment::<Point>(&fragment),
//!     Some(Point { x: 3, y: 4 })
//! );
//! ```
//!
//! # Codecs
//!
//! A codec is compiled from the type's `Deserialize` implementation: its serde container
//! name becomes the root element, so `#[serde(rename = "...")]` on the type controls
//! the document root. Types without a container name (primitives, sequences, tuples)
//! cannot be the root of a document and fail codec construction.
//!
//! Auxiliary types ([`TypeDescriptor`]) are checked when a codec is first built. The
//! cache is keyed by the primary type alone, so a cached codec is returned whatever
//! auxiliary types later calls pass.

mod cache;
mod codec;
mod config;
mod error;
mod fragment;
pub mod logging;
mod serializer;
mod settings;
mod shape;

pub use cache::{CodecCache, CodecKey};
pub use codec::{TypeDescriptor, XmlCodec, XmlValue};
pub use config::SerializerConfig;
pub use error::{Error, Result};
pub use fragment::Fragment;
pub use serializer::Serializer;
pub use settings::{Indentation, Newline, WriterSettings, XML_DECLARATION};
pub use shape::{Shape, ShapeKind, is_xml_name};
