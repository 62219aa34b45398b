use std::{
    collections::HashSet,
    io::Write,
    ops::Range,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    diff::{ChangeList, ChangeRecord},
    error::ApplyError,
    library::{LibraryFile, LibraryHeader},
};

const ENTRY_INDENT: &str = "  ";

/// Applies `changes` to the text of `library`.
///
/// A change whose symbol exists replaces that entry where it stands, any
/// other change is appended after the last entry. Everything else is copied
/// unchanged. When two changes name the same symbol the first one is used.
pub fn merge(library: &LibraryFile, changes: &[ChangeRecord]) -> String {
    let mut replacements: Vec<(Range<usize>, &str)> = Vec::new();
    let mut appended: Vec<&str> = Vec::new();
    for change in first_per_name(changes) {
        match library.entry(&change.name) {
            Some(entry) => replacements.push((entry.span.clone(), &change.generated)),
            None => appended.push(&change.generated),
        }
    }
    replacements.sort_by_key(|(span, _)| span.start);

    let text = library.text();
    let mut out = String::with_capacity(
        text.len() + changes.iter().map(|c| c.generated.len() + 4).sum::<usize>(),
    );
    let mut pos = 0;
    for (span, generated) in replacements {
        out.push_str(&text[pos..span.start]);
        out.push_str(generated);
        pos = span.end;
    }

    let at = library.append_offset();
    out.push_str(&text[pos..at]);
    if !appended.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for generated in appended {
        out.push_str(ENTRY_INDENT);
        out.push_str(generated);
        out.push('\n');
    }
    out.push_str(&text[at..]);
    out
}

/// The changes `merge` uses: the first one for each symbol name
fn first_per_name(changes: &[ChangeRecord]) -> Vec<&ChangeRecord> {
    let mut seen = HashSet::new();
    changes
        .iter()
        .filter(|change| {
            let first = seen.insert(change.name.as_str());
            if !first {
                debug!(symbol = %change.name, "ignoring repeated change");
            }
            first
        })
        .collect()
}

/// Replaces `path` with `contents` through a temporary file in the same
/// directory, so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ApplyError> {
    let write_error = |source| ApplyError::Write {
        path: path.to_owned(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_error)?;

    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;
    Ok(())
}

/// Loads, merges and rewrites one library file. Returns the number of
/// symbols written.
pub fn apply_file(
    path: &Path,
    changes: &[ChangeRecord],
    header: &LibraryHeader,
) -> Result<usize, ApplyError> {
    let library = LibraryFile::load(path, header)?;
    let merged = merge(&library, changes);
    write_atomic(path, &merged)?;
    Ok(first_per_name(changes).len())
}

/// Outcome of applying a change list
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Files written and the number of changes each received
    pub written: Vec<(PathBuf, usize)>,
    /// Files left untouched because they could not be read, parsed or written
    pub failed: Vec<ApplyError>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies every change in `changes`, one atomic write per target file.
/// A failing file is reported and the remaining files are still processed.
pub fn apply(changes: ChangeList, header: &LibraryHeader) -> ApplyReport {
    let mut report = ApplyReport::default();
    for (path, file_changes) in changes {
        match apply_file(&path, &file_changes, header) {
            Ok(count) => {
                info!(path = %path.display(), changes = count, "updated library");
                report.written.push((path, count));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "library left untouched");
                report.failed.push(err);
            }
        }
    }
    report
}
