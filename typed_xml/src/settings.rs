use serde::{Deserialize, Serialize};

/// XML declaration written at the start of full documents
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Default indentation width in characters
pub const DEFAULT_INDENT_SIZE: usize = 2;

/// Line terminator used between indented lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl Newline {
    /// The terminator characters
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Indentation applied to nested elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indentation {
    /// Character repeated for each level
    pub character: char,
    /// Number of characters per level
    pub size:      usize,
}

impl Default for Indentation {
    fn default() -> Self {
        Self {
            character: ' ',
            size:      DEFAULT_INDENT_SIZE,
        }
    }
}

/// Formatting options handed to the XML writer
///
/// The façade does not reinterpret these; it only supplies [`WriterSettings::default`]
/// when a caller passes none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// Skip the `<?xml ...?>` declaration
    pub omit_declaration:      bool,
    /// Indent nested elements, `None` writes everything on one line
    pub indent:                Option<Indentation>,
    /// Line terminator for indented output
    pub newline:               Newline,
    /// Write `<a></a>` instead of `<a/>` for empty elements
    pub expand_empty_elements: bool,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            omit_declaration:      false,
            indent:                Some(Indentation::default()),
            newline:               Newline::Lf,
            expand_empty_elements: false,
        }
    }
}

impl WriterSettings {
    /// Settings used for embedded fragments
    ///
    /// Fragments never carry a declaration and are always indented: the configured
    /// indentation is kept, or the default one is used when indentation is off.
    #[must_use]
    pub fn for_fragment(&self) -> Self {
        Self {
            omit_declaration: true,
            indent:           Some(self.indent.unwrap_or_default()),
            ..self.clone()
        }
    }

    /// Single-line output without a declaration
    pub const fn compact() -> Self {
        Self {
            omit_declaration:      true,
            indent:                None,
            newline:               Newline::Lf,
            expand_empty_elements: false,
        }
    }

    /// Builder: set whether the declaration is omitted
    #[must_use]
    pub const fn with_omit_declaration(mut self, omit: bool) -> Self {
        self.omit_declaration = omit;
        self
    }

    /// Builder: set the indentation
    #[must_use]
    pub const fn with_indent(mut self, indent: Option<Indentation>) -> Self {
        self.indent = indent;
        self
    }

    /// Builder: set the line terminator
    #[must_use]
    pub const fn with_newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }
}
