//! Named document fragments
//!
//! A [`Fragment`] is a single element whose inner XML is one value's serialized form,
//! used to embed that value inside a larger document (for example a `<Config>` section
//! of an application file).

use std::fmt;
use std::str::FromStr;

use error_stack::Report;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::shape::is_xml_name;

/// An element name plus the raw XML between its start and end tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    name:      String,
    inner_xml: String,
}

impl Fragment {
    /// Create a fragment, rejecting names that are not valid XML element names
    pub fn new(name: impl Into<String>, inner_xml: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_xml_name(&name) {
            return Err(Report::new(Error::invalid(
                "element name",
                format!("'{name}'"),
            )));
        }
        Ok(Self {
            name,
            inner_xml: inner_xml.into(),
        })
    }

    /// Read the first element of `xml` as a fragment
    ///
    /// A leading declaration, comments, processing instructions and whitespace are
    /// skipped. Anything other than whitespace or comments after the element is rejected.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().map_err(|e| parse_error(&e))? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {},
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {},
                Event::Start(start) => {
                    let name = element_name(start.name().as_ref())?;
                    let inner_xml = reader
                        .read_text(start.name())
                        .map_err(|e| parse_error(&e))?
                        .into_owned();
                    expect_document_end(&mut reader)?;
                    return Self::new(name, inner_xml);
                },
                Event::Empty(start) => {
                    let name = element_name(start.name().as_ref())?;
                    expect_document_end(&mut reader)?;
                    return Self::new(name, String::new());
                },
                Event::Eof => {
                    return Err(Report::new(Error::invalid("fragment", "no element found")));
                },
                _ => {
                    return Err(Report::new(Error::invalid(
                        "fragment",
                        "content found before the first element",
                    )));
                },
            }
        }
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw XML between the start and end tags
    pub fn inner_xml(&self) -> &str {
        &self.inner_xml
    }

    /// Consume the fragment, returning its inner XML
    pub fn into_inner_xml(self) -> String {
        self.inner_xml
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner_xml.is_empty() {
            write!(f, "<{}/>", self.name)
        } else {
            write!(f, "<{0}>{1}</{0}>", self.name, self.inner_xml)
        }
    }
}

impl FromStr for Fragment {
    type Err = Report<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn element_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| Report::new(Error::invalid("element name", e)))
}

fn expect_document_end(reader: &mut Reader<&[u8]>) -> Result<()> {
    loop {
        match reader.read_event().map_err(|e| parse_error(&e))? {
            Event::Eof => return Ok(()),
            Event::Comment(_) | Event::PI(_) => {},
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {},
            _ => {
                return Err(Report::new(Error::invalid(
                    "fragment",
                    "content found after the element",
                )));
            },
        }
    }
}

fn parse_error(error: &quick_xml::Error) -> Report<Error> {
    Report::new(Error::invalid("fragment", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_names() {
        assert!(Fragment::new("Config", "").is_ok());
        let report = Fragment::new("1Config", "").expect_err("invalid name");
        assert!(report.current_context().is_invalid_argument());
        assert!(Fragment::new("", "<a/>").is_err());
    }

    #[test]
    fn test_display() {
        let fragment = Fragment::new("Config", "<Point><X>1</X></Point>").expect("fragment");
        assert_eq!(
            fragment.to_string(),
            "<Config><Point><X>1</X></Point></Config>"
        );
        assert_eq!(
            Fragment::new("Empty", "").expect("fragment").to_string(),
            "<Empty/>"
        );
    }

    #[test]
    fn test_parse_captures_inner_xml() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- saved -->\n<Config>\n  <Point><X>1</X></Point>\n</Config>\n";
        let fragment = Fragment::parse(xml).expect("parse");
        assert_eq!(fragment.name(), "Config");
        assert_eq!(fragment.inner_xml(), "\n  <Point><X>1</X></Point>\n");
    }

    #[test]
    fn test_parse_nested_same_name() {
        let fragment: Fragment = "<a><a>x</a></a>".parse().expect("parse");
        assert_eq!(fragment.inner_xml(), "<a>x</a>");
    }

    #[test]
    fn test_parse_empty_element() {
        let fragment = Fragment::parse("<Config/>").expect("parse");
        assert_eq!(fragment.name(), "Config");
        assert!(fragment.inner_xml().is_empty());
    }

    #[test]
    fn test_parse_rejects_trailing_and_missing_content() {
        assert!(Fragment::parse("<a>1</a><b>2</b>").is_err());
        assert!(Fragment::parse("   ").is_err());
        assert!(Fragment::parse("text<a/>").is_err());
    }

    #[test]
    fn test_display_then_parse() {
        let original = Fragment::new("Config", "<Point><X>1</X><Y>2</Y></Point>").expect("fragment");
        let parsed = Fragment::parse(&original.to_string()).expect("parse");
        assert_eq!(parsed, original);
    }
}
