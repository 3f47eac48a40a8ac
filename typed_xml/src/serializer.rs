//! The serialization façade
//!
//! [`Serializer`] is the single entry point for converting typed values to and from
//! XML carriers: strings, files, caller-owned streams and [`Fragment`]s. Each entry
//! point has one failure contract:
//!
//! | entry point                          | on failure                   |
//! |--------------------------------------|------------------------------|
//! | [`Serializer::serialize`]            | logs, returns `None`         |
//! | [`Serializer::deserialize`]          | logs, returns `None`         |
//! | [`Serializer::deserialize_fragment`] | logs, returns `None`         |
//! | every other entry point              | logs, returns the `Err`      |
//!
//! Failures are logged at error severity with the type name before they are returned
//! or dropped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use error_stack::Report;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::error;

use crate::cache::CodecCache;
use crate::codec::{TypeDescriptor, XmlCodec, XmlValue};
use crate::config::SerializerConfig;
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::settings::WriterSettings;
use crate::shape::is_absent;

static SHARED: LazyLock<Serializer> = LazyLock::new(Serializer::new);

/// Strongly typed XML serializer with a per-type codec cache
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use typed_xml::Serializer;
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Point {
///     #[serde(rename = "X")]
///     x: i32,
///     #[serde(rename = "Y")]
///     y: i32,
/// }
///
/// let serializer = Serializer::new();
/// let xml = serializer.serialize_to_string(&Point { x: 3, y: 4 }).unwrap();
/// assert!(xml.contains("<X>3</X>"));
/// assert_eq!(serializer.deserialize::<Point>(&xml), Some(Point { x: 3, y: 4 }));
/// ```
pub struct Serializer {
    cache:           CodecCache,
    writer_settings: WriterSettings,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    /// Create a serializer with the default configuration
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    /// Create a serializer from a configuration
    pub fn with_config(config: SerializerConfig) -> Self {
        Self {
            cache:           CodecCache::with_caching(config.cache_codecs),
            writer_settings: config.writer,
        }
    }

    /// Process-wide serializer, created with the default configuration on first use
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// The codec cache owned by this serializer
    pub const fn cache(&self) -> &CodecCache {
        &self.cache
    }

    /// Whether newly built codecs are cached
    pub fn cache_codecs(&self) -> bool {
        self.cache.caching_enabled()
    }

    /// Change whether newly built codecs are cached
    pub fn set_cache_codecs(&self, enabled: bool) {
        self.cache.set_caching_enabled(enabled);
    }

    /// Writer settings used when a caller passes none
    pub const fn writer_settings(&self) -> &WriterSettings {
        &self.writer_settings
    }

    /// Resolve the codec for `T`, building it on first use
    pub fn codec<T: XmlValue>(
        &self,
        auxiliary_types: &[TypeDescriptor],
    ) -> Result<Arc<XmlCodec<T>>> {
        self.cache.resolve::<T>(auxiliary_types)
    }

    // ------------------------------------------------------------------------
    // Serialize

    /// Serialize `value` to a string, returning `None` on any failure
    pub fn serialize<T: XmlValue>(&self, value: &T) -> Option<String> {
        suppressed::<T, _>(
            "serialize",
            self.render(value, &[], &self.writer_settings),
        )
    }

    /// Serialize `value` to a string with the default writer settings
    pub fn serialize_to_string<T: XmlValue>(&self, value: &T) -> Result<String> {
        logged::<T, _>(
            "serialize",
            self.render(value, &[], &self.writer_settings),
        )
    }

    /// Serialize `value` to a string using auxiliary types and writer settings
    ///
    /// `settings` of `None` uses the serializer's defaults.
    pub fn serialize_to_string_with<T: XmlValue>(
        &self,
        value: &T,
        auxiliary_types: &[TypeDescriptor],
        settings: Option<&WriterSettings>,
    ) -> Result<String> {
        let settings = settings.unwrap_or(&self.writer_settings);
        logged::<T, _>("serialize", self.render(value, auxiliary_types, settings))
    }

    /// Serialize `value` through a caller-owned writer
    ///
    /// The writer is flushed but not closed.
    pub fn serialize_to_writer<T: XmlValue, W: Write + ?Sized>(
        &self,
        writer: &mut W,
        value: &T,
    ) -> Result<()> {
        let result = ensure_present(value)
            .and_then(|()| self.codec::<T>(&[]))
            .and_then(|codec| codec.write(value, writer, &self.writer_settings));
        logged::<T, _>("serialize to stream", result)
    }

    /// Serialize `value` to the file at `path` with the default writer settings
    pub fn serialize_to_file<T: XmlValue>(&self, value: &T, path: impl AsRef<Path>) -> Result<()> {
        self.serialize_to_file_with(value, path, None)
    }

    /// Serialize `value` to the file at `path`
    ///
    /// The document is rendered in memory, written to a temporary file in the target's
    /// directory and then moved over the target. On failure the target is left as it
    /// was and the temporary file is removed.
    pub fn serialize_to_file_with<T: XmlValue>(
        &self,
        value: &T,
        path: impl AsRef<Path>,
        settings: Option<&WriterSettings>,
    ) -> Result<()> {
        let path = path.as_ref();
        let settings = settings.unwrap_or(&self.writer_settings);
        let result = self
            .render(value, &[], settings)
            .and_then(|document| write_file(path, &document))
            .map_err(|report| report.attach(format!("Path: {}", path.display())));
        logged::<T, _>("serialize to file", result)
    }

    /// Serialize `value` into a fragment element named `element_name`
    pub fn serialize_to_fragment<T: XmlValue>(
        &self,
        value: &T,
        element_name: &str,
    ) -> Result<Fragment> {
        self.serialize_to_fragment_with_types(value, &[], element_name)
    }

    /// Serialize `value` into a fragment element named `element_name` using auxiliary
    /// types
    ///
    /// The inner XML has no declaration and is always indented, using the default
    /// writer settings' indentation when it has one.
    pub fn serialize_to_fragment_with_types<T: XmlValue>(
        &self,
        value: &T,
        auxiliary_types: &[TypeDescriptor],
        element_name: &str,
    ) -> Result<Fragment> {
        let settings = self.writer_settings.for_fragment();
        let result = self
            .render(value, auxiliary_types, &settings)
            .and_then(|inner_xml| Fragment::new(element_name, inner_xml));
        logged::<T, _>("serialize to fragment", result)
    }

    // ------------------------------------------------------------------------
    // Deserialize

    /// Deserialize `T` from `xml`, returning `None` if the XML has any errors
    pub fn deserialize<T: XmlValue>(&self, xml: &str) -> Option<T> {
        suppressed::<T, _>("deserialize", self.parse(xml, &[]))
    }

    /// Deserialize `T` from `xml` using auxiliary types
    pub fn deserialize_with_types<T: XmlValue>(
        &self,
        xml: &str,
        auxiliary_types: &[TypeDescriptor],
    ) -> Result<T> {
        logged::<T, _>("deserialize", self.parse(xml, auxiliary_types))
    }

    /// Deserialize `T` from a caller-owned reader
    pub fn deserialize_from_reader<T: XmlValue, R: BufRead>(&self, reader: R) -> Result<T> {
        let result = self.codec::<T>(&[]).and_then(|codec| codec.read(reader));
        logged::<T, _>("deserialize from stream", result)
    }

    /// Deserialize `T` from the file at `path`
    pub fn deserialize_from_file<T: XmlValue>(&self, path: impl AsRef<Path>) -> Result<T> {
        let path = path.as_ref();
        let result = self
            .codec::<T>(&[])
            .and_then(|codec| {
                let file = File::open(path)
                    .map_err(|e| Report::new(Error::io_failed("open", path, e)))?;
                codec.read(BufReader::new(file))
            })
            .map_err(|report| report.attach(format!("Path: {}", path.display())));
        logged::<T, _>("deserialize from file", result)
    }

    /// Deserialize `T` from a fragment's inner XML, returning `None` on any failure
    pub fn deserialize_fragment<T: XmlValue>(&self, fragment: &Fragment) -> Option<T> {
        self.deserialize(fragment.inner_xml())
    }

    /// Deserialize `T` from a fragment's inner XML using auxiliary types
    pub fn deserialize_fragment_with_types<T: XmlValue>(
        &self,
        fragment: &Fragment,
        auxiliary_types: &[TypeDescriptor],
    ) -> Result<T> {
        self.deserialize_with_types(fragment.inner_xml(), auxiliary_types)
    }

    fn render<T: XmlValue>(
        &self,
        value: &T,
        auxiliary_types: &[TypeDescriptor],
        settings: &WriterSettings,
    ) -> Result<String> {
        ensure_present(value)?;
        self.codec::<T>(auxiliary_types)?.render(value, settings)
    }

    fn parse<T: XmlValue>(&self, xml: &str, auxiliary_types: &[TypeDescriptor]) -> Result<T> {
        self.codec::<T>(auxiliary_types)?.read_str(xml)
    }
}

fn ensure_present<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    if is_absent(value) {
        return Err(Report::new(Error::invalid(
            "value",
            "an absent value cannot be serialized",
        ))
        .attach(format!("Type: {}", std::any::type_name::<T>())));
    }
    Ok(())
}

fn write_file(path: &Path, document: &str) -> Result<()> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(directory).map_err(|e| {
        Report::new(Error::io_failed("create temporary file in", directory, e))
    })?;
    temp.write_all(document.as_bytes())
        .map_err(|e| Report::new(Error::io_failed("write", temp.path(), e)))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Report::new(Error::io_failed("sync", temp.path(), e)))?;
    temp.persist(path)
        .map_err(|e| Report::new(Error::io_failed("replace", path, e.error)))?;
    Ok(())
}

fn logged<T, R>(operation: &str, result: Result<R>) -> Result<R> {
    if let Err(report) = &result {
        error!(
            "Failed to {operation} {}: {report:?}",
            std::any::type_name::<T>()
        );
    }
    result
}

fn suppressed<T, R>(operation: &str, result: Result<R>) -> Option<R> {
    logged::<T, R>(operation, result).ok()
}
