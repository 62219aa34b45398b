use std::{
    collections::{BTreeMap, HashSet},
    fmt::Display,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    catalog::TemplateCatalog,
    diff::{diff_symbol, ChangeList},
    error::{ApplyError, GeneratorError, ParseError},
    library::{LibraryFile, LibraryHeader},
    merge::{self, ApplyReport},
    record::ComponentRecord,
    symbol::{GeneratedSymbol, SymbolAssembler},
};

const LIBRARY_EXTENSION: &str = "kicad_sym";

/// Why a component produced no change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoTemplate,
    Generator(GeneratorError),
    /// Another component earlier in the batch generated the same symbol name
    DuplicateName,
    /// The generated text does not parse, usually a broken template fragment
    Malformed(ParseError),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoTemplate => write!(f, "no template"),
            SkipReason::Generator(err) => write!(f, "{}", err),
            SkipReason::DuplicateName => write!(f, "duplicate symbol name"),
            SkipReason::Malformed(err) => write!(f, "malformed symbol: {}", err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub name: String,
    pub category: String,
    pub reason: SkipReason,
}

/// Result of comparing a batch of records with the libraries on disk
#[derive(Debug, Default)]
pub struct SyncReport {
    pub changes: ChangeList,
    pub skipped: Vec<Skipped>,
    /// Target libraries that could not be read or parsed
    pub failed_files: Vec<ApplyError>,
    pub unchanged: usize,
}

/// Runs records through the catalog and diffs them against their libraries
#[derive(Debug)]
pub struct Synchronizer<'c> {
    catalog: &'c TemplateCatalog,
    output_dir: PathBuf,
    header: LibraryHeader,
}

impl<'c> Synchronizer<'c> {
    pub fn new(catalog: &'c TemplateCatalog, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            output_dir: output_dir.into(),
            header: LibraryHeader::default(),
        }
    }

    pub fn with_header(mut self, header: LibraryHeader) -> Self {
        self.header = header;
        self
    }

    /// Library a record's symbol belongs to, named after its category leaf.
    /// Path separators in the leaf become `_` like spaces do.
    pub fn target_path(&self, record: &ComponentRecord) -> PathBuf {
        let stem = record.category_leaf().trim().replace([' ', '/', '\\'], "_");
        self.output_dir
            .join(format!("{}.{}", stem, LIBRARY_EXTENSION))
    }

    pub fn compare(&self, records: &[ComponentRecord]) -> SyncReport {
        let mut report = SyncReport::default();
        let mut targets: BTreeMap<PathBuf, Vec<GeneratedSymbol>> = BTreeMap::new();
        let mut names: HashSet<(PathBuf, String)> = HashSet::new();

        for record in records {
            let skip = |reason| Skipped {
                name: record.name.clone(),
                category: record.category.clone(),
                reason,
            };
            let Some(template) = self.catalog.resolve(&record.category) else {
                warn!(component = %record.name, category = %record.category, "no template");
                report.skipped.push(skip(SkipReason::NoTemplate));
                continue;
            };
            let symbol = match SymbolAssembler::new(template).assemble(record) {
                Ok(symbol) => symbol,
                Err(err) => {
                    warn!(component = %record.name, error = %err, "skipping component");
                    report.skipped.push(skip(SkipReason::Generator(err)));
                    continue;
                }
            };
            let target = self.target_path(record);
            if !names.insert((target.clone(), symbol.name.clone())) {
                warn!(symbol = %symbol.name, "symbol name already generated in this batch");
                report.skipped.push(skip(SkipReason::DuplicateName));
                continue;
            }
            targets.entry(target).or_default().push(symbol);
        }

        for (target, symbols) in targets {
            self.compare_file(&target, &symbols, &mut report);
        }
        info!(
            changes = report.changes.len(),
            unchanged = report.unchanged,
            skipped = report.skipped.len(),
            failed_files = report.failed_files.len(),
            "compared components"
        );
        report
    }

    fn compare_file(&self, target: &Path, symbols: &[GeneratedSymbol], report: &mut SyncReport) {
        let library = match LibraryFile::load(target, &self.header) {
            Ok(library) => library,
            Err(err) => {
                warn!(path = %target.display(), error = %err, "skipping library");
                report.failed_files.push(err);
                return;
            }
        };
        debug!(path = %target.display(), symbols = symbols.len(), "diffing library");
        for symbol in symbols {
            match diff_symbol(symbol, &library, target) {
                Ok(Some(change)) => report.changes.push(change),
                Ok(None) => report.unchanged += 1,
                Err(err) => {
                    warn!(symbol = %symbol.name, error = %err, "generated symbol does not parse");
                    report.skipped.push(Skipped {
                        name: symbol.name.clone(),
                        category: symbol.category.clone(),
                        reason: SkipReason::Malformed(err),
                    });
                }
            }
        }
    }

    /// Writes the chosen changes, one atomic rewrite per target library
    pub fn apply(&self, changes: ChangeList) -> ApplyReport {
        merge::apply(changes, &self.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Classification;
    use rstest::*;

    macro_rules! test_data {
        ($fname:expr) => {
            std::fs::read_to_string(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/resources/test/",
                $fname
            ))
            .unwrap()
        };
    }

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::from_yaml(&test_data!("templates.yaml")).unwrap()
    }

    fn resistor(value: &str) -> ComponentRecord {
        ComponentRecord::new(format!("RC0603 {value}"), "Passives → Resistors")
            .with_parameter("Resistance", value)
    }

    fn mcu() -> ComponentRecord {
        ComponentRecord::new("ATtiny 85", "ICs → Microcontrollers")
            .with_parameter("Pin Description", "PB0,PB1,PB2,GND,PB3,PB4,PB5,VCC")
    }

    #[rstest]
    #[case("Passives → Resistors", "Resistors.kicad_sym")]
    #[case("Connectors → Pin Headers", "Pin_Headers.kicad_sym")]
    #[case("Passives → Resistors 1/4W", "Resistors_1_4W.kicad_sym")]
    #[case("Thick Film Resistors", "Thick_Film_Resistors.kicad_sym")]
    #[case("Connectors → Headers 2.54mm", "Headers_2.54mm.kicad_sym")]
    fn target_path_uses_category_leaf(#[case] category: &str, #[case] file: &str) {
        let catalog = catalog();
        let sync = Synchronizer::new(&catalog, "libs");
        let record = ComponentRecord::new("X", category);
        assert_eq!(sync.target_path(&record), Path::new("libs").join(file));
    }

    #[test]
    fn compare_classifies_against_existing_library() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Resistors.kicad_sym"),
            test_data!("Resistors.kicad_sym"),
        )
        .unwrap();
        let catalog = catalog();
        let sync = Synchronizer::new(&catalog, dir.path());

        let records = vec![
            resistor("10k"),
            resistor("4k7"),
            resistor("1M"),
            mcu(),
            ComponentRecord::new("Widget", "Misc"),
            ComponentRecord::new("Blank MCU", "Microcontrollers"),
            resistor("1M"),
        ];
        let report = sync.compare(&records);

        assert_eq!(report.unchanged, 1);
        let changes: Vec<_> = report
            .changes
            .iter()
            .map(|c| (c.name.as_str(), c.classification))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("ATtiny_85", Classification::New),
                ("RC0603_4k7", Classification::Modified),
                ("RC0603_1M", Classification::New),
            ]
        );
        let reasons: Vec<_> = report
            .skipped
            .iter()
            .map(|s| (s.name.as_str(), s.reason.clone()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("Widget", SkipReason::NoTemplate),
                (
                    "Blank MCU",
                    SkipReason::Generator(GeneratorError::MissingParameter(
                        "Pin Description".into()
                    ))
                ),
                ("RC0603 1M", SkipReason::DuplicateName),
            ]
        );
        assert!(report.failed_files.is_empty());
    }

    #[test]
    fn broken_library_only_fails_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Resistors.kicad_sym"), "(kicad_symbol_lib").unwrap();
        let catalog = catalog();
        let sync = Synchronizer::new(&catalog, dir.path());

        let report = sync.compare(&[resistor("10k"), mcu()]);
        assert_eq!(report.failed_files.len(), 1);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes.iter().next().unwrap().name, "ATtiny_85");
    }

    #[test]
    fn unbalanced_value_is_skipped_and_library_kept() {
        let catalog = TemplateCatalog::from_yaml(
            r#"
Connectors:
  applies_to_categories: [Connectors]
  field_mapping:
    Value: Rating
  property_templates:
    Value: (property "Value" {VALUE} (at 0 0 0))
  symbol_generator: Connector
"#,
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Connectors.kicad_sym");
        let before = "(kicad_symbol_lib (version 1)\n  (symbol \"J_manual\" (x 1))\n)\n";
        std::fs::write(&path, before).unwrap();
        let sync = Synchronizer::new(&catalog, dir.path());

        let record = ComponentRecord::new("Plug", "Connectors").with_parameter("Rating", "3A )");
        let report = sync.compare(&[record]);
        assert!(report.changes.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(report.skipped[0].reason, SkipReason::Malformed(_)));

        assert!(sync.apply(report.changes).is_success());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn applied_changes_compare_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Resistors.kicad_sym"),
            test_data!("Resistors.kicad_sym"),
        )
        .unwrap();
        let catalog = catalog();
        let sync = Synchronizer::new(&catalog, dir.path());
        let records = vec![resistor("4k7"), resistor("22k"), mcu()];

        let first = sync.compare(&records);
        assert_eq!(first.changes.len(), 3);
        let report = sync.apply(first.changes.select(&["RC0603_4k7", "RC0603_22k"]));
        assert!(report.is_success());

        let second = sync.compare(&records);
        assert_eq!(second.unchanged, 2);
        let names: Vec<_> = second.changes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ATtiny_85"]);

        let library = std::fs::read_to_string(dir.path().join("Resistors.kicad_sym")).unwrap();
        assert!(library.contains("Hand_Drawn_Shunt"));
    }
}
