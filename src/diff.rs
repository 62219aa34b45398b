use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{error::ParseError, library::LibraryFile, sexpr, symbol::GeneratedSymbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Classification {
    New,
    Modified,
    Unchanged,
}

impl Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::New => "NEW",
            Classification::Modified => "MODIFIED",
            Classification::Unchanged => "UNCHANGED",
        };
        f.pad(s)
    }
}

/// A generated symbol that differs from what its library holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub target: PathBuf,
    pub name: String,
    pub category: String,
    pub classification: Classification,
    pub generated: String,
    /// Library text of the symbol, for `Modified` only
    pub previous: Option<String>,
}

/// Compares a generated symbol with the entry of the same name.
///
/// Both sides are reduced to their canonical form first, so layout and the
/// quoting of bare atoms do not count as a change.
/// The generated text must be exactly one expression, even when it is new.
pub fn diff(generated: &str, existing: Option<&str>) -> Result<Classification, ParseError> {
    let canonical = sexpr::parse_spanned(generated)?
        .into_sexpr(generated)
        .to_string();
    let Some(existing) = existing else {
        return Ok(Classification::New);
    };
    if canonical == sexpr::canonical(existing)? {
        Ok(Classification::Unchanged)
    } else {
        Ok(Classification::Modified)
    }
}

/// Diffs `symbol` against `library` and builds the change, if any.
pub fn diff_symbol(
    symbol: &GeneratedSymbol,
    library: &LibraryFile,
    target: &Path,
) -> Result<Option<ChangeRecord>, ParseError> {
    let generated = symbol.text();
    let previous = library.symbol_text(&symbol.name);
    let classification = diff(&generated, previous)?;
    debug!(symbol = %symbol.name, %classification, "compared symbol");
    if classification == Classification::Unchanged {
        return Ok(None);
    }
    Ok(Some(ChangeRecord {
        target: target.to_owned(),
        name: symbol.name.clone(),
        category: symbol.category.clone(),
        classification,
        generated,
        previous: previous
            .filter(|_| classification == Classification::Modified)
            .map(str::to_owned),
    }))
}

/// Changes partitioned by target file, in the order they were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeList {
    files: BTreeMap<PathBuf, Vec<ChangeRecord>>,
}

impl ChangeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: ChangeRecord) {
        self.files
            .entry(change.target.clone())
            .or_default()
            .push(change);
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &[ChangeRecord])> {
        self.files
            .iter()
            .map(|(path, changes)| (path.as_path(), changes.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.files.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The subset of changes whose symbol name is in `names`
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> ChangeList {
        let names: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();
        self.iter()
            .filter(|change| names.contains(change.name.as_str()))
            .cloned()
            .collect()
    }
}

impl FromIterator<ChangeRecord> for ChangeList {
    fn from_iter<T: IntoIterator<Item = ChangeRecord>>(iter: T) -> Self {
        let mut list = ChangeList::new();
        for change in iter {
            list.push(change);
        }
        list
    }
}

impl IntoIterator for ChangeList {
    type Item = (PathBuf, Vec<ChangeRecord>);
    type IntoIter = std::collections::btree_map::IntoIter<PathBuf, Vec<ChangeRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}
