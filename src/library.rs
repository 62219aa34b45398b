use std::{collections::HashSet, io::ErrorKind, ops::Range, path::Path};

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{ApplyError, ParseError},
    sexpr,
};

const ROOT_LABEL: &str = "kicad_symbol_lib";
const SYMBOL_LABEL: &str = "symbol";

/// Header written to libraries that do not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryHeader {
    pub version: u32,
    pub generator: String,
}

impl Default for LibraryHeader {
    fn default() -> Self {
        Self {
            version: 20211014,
            generator: "partdb_linker".to_owned(),
        }
    }
}

/// A top-level symbol of a library file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    /// From the opening to the closing parenthesis of the symbol
    pub span: Range<usize>,
}

/// A parsed `.kicad_sym` file. The original text is kept whole, so anything
/// outside the entries that are replaced is re-emitted byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    text: String,
    entries: Vec<SymbolEntry>,
    /// Offset of the closing parenthesis of `kicad_symbol_lib`
    end: usize,
}

impl LibraryFile {
    pub fn parse(text: String) -> Result<Self, ParseError> {
        let root = sexpr::parse_spanned(&text)?;
        let label = root.label(&text).unwrap_or_default();
        if label != ROOT_LABEL {
            return Err(ParseError::UnexpectedRoot(label.to_owned()));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for child in root.children() {
            if child.label(&text) != Some(SYMBOL_LABEL) {
                continue;
            }
            let name = child
                .first_string()
                .map(|span| sexpr::unescape(&text[span]))
                .ok_or_else(|| ParseError::MissingSymbolName { at: child.span() })?;
            if !seen.insert(name.clone()) {
                return Err(ParseError::DuplicateSymbol(name));
            }
            entries.push(SymbolEntry {
                name,
                span: child.span(),
            });
        }

        let end = root.span().end - 1;
        Ok(Self { text, entries, end })
    }

    /// A library with a header and no symbols
    pub fn empty(header: &LibraryHeader) -> Self {
        let prefix = format!(
            "({} (version {}) (generator {})\n",
            ROOT_LABEL,
            header.version,
            sexpr::atom(&header.generator)
        );
        let end = prefix.len();
        Self {
            text: prefix + ")\n",
            entries: vec![],
            end,
        }
    }

    /// Reads and parses a library. A missing file is an empty library.
    pub fn load(path: &Path, header: &LibraryHeader) -> Result<Self, ApplyError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "library does not exist yet");
                return Ok(Self::empty(header));
            }
            Err(source) => {
                return Err(ApplyError::Read {
                    path: path.to_owned(),
                    source,
                })
            }
        };
        let library = Self::parse(text).map_err(|source| ApplyError::Parse {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), symbols = library.entries.len(), "parsed library");
        Ok(library)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Raw text of a symbol as written in the file
    pub fn symbol_text(&self, name: &str) -> Option<&str> {
        self.entry(name).map(|entry| &self.text[entry.span.clone()])
    }

    /// Where new symbols go: the start of the line holding the closing
    /// parenthesis, or the parenthesis itself when it shares a line.
    pub(crate) fn append_offset(&self) -> usize {
        let before = self.text[..self.end].trim_end_matches([' ', '\t']);
        if before.ends_with('\n') {
            before.len()
        } else {
            self.end
        }
    }
}
