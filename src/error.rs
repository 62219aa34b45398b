use std::{ops::Range, path::PathBuf};

use thiserror::Error;

/// S-expression and symbol library parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("SExpr {0} not found")]
    MissingChild(String),
    #[error("Value not found")]
    MissingValue(),
    #[error("Unexpected end of input at {at:?}")]
    UnexpectedEof { at: Range<usize> },
    #[error("Expected {expected}, found {found} at {at:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        at: Range<usize>,
    },
    #[error("Unknown token {found} at {at:?}")]
    UnknownToken { found: String, at: Range<usize> },
    #[error("Trailing input after closing parenthesis at {at:?}")]
    TrailingInput { at: Range<usize> },
    #[error("Expected a kicad_symbol_lib, found {0}")]
    UnexpectedRoot(String),
    #[error("Symbol without a name at {at:?}")]
    MissingSymbolName { at: Range<usize> },
    #[error("Symbol {0} is defined more than once")]
    DuplicateSymbol(String),
}

/// Template configuration errors, raised while loading the catalog
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Could not read template file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid template YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Template file is empty")]
    Empty,
    #[error("Template {template}: {key} must be a string")]
    NotAString { template: String, key: String },
    #[error("Template {0} sets both symbol_template and symbol_generator")]
    ConflictingGeometry(String),
    #[error("Template {0} sets neither symbol_template nor symbol_generator")]
    MissingGeometry(String),
    #[error("Template {template}: unknown symbol_generator {generator}")]
    UnknownGenerator { template: String, generator: String },
    #[error("Template {template}: option {option} is not used by {generator}")]
    UnexpectedOption {
        template: String,
        option: String,
        generator: String,
    },
    #[error("Template {template}: malformed symbol_template: {source}")]
    InvalidStaticBlock {
        template: String,
        source: ParseError,
    },
    #[error("Template {template}: malformed symbol_options: {source}")]
    InvalidOptions {
        template: String,
        source: ParseError,
    },
    #[error("Template {template}: malformed property template for {property}: {source}")]
    InvalidPropertyTemplate {
        template: String,
        property: String,
        source: ParseError,
    },
    #[error("Template {template}: property template for {property} has no {{VALUE}} placeholder")]
    MissingPlaceholder { template: String, property: String },
}

/// Generator parameter errors. A component failing with one of these is
/// skipped and reported, the batch continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Required parameter {0} is missing or empty")]
    MissingParameter(String),
    #[error("{total} pins do not divide evenly into {rows} rows")]
    UnevenPinCount { total: u32, rows: u32 },
    #[error("{rows} x {pins_per_row} pins exceeds the limit of {max}")]
    PinCountOutOfRange { rows: u32, pins_per_row: u32, max: u32 },
    #[error("Connectors with {0} rows are not supported")]
    UnsupportedRowCount(u32),
}

/// Errors scoped to one target library file during apply
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not parse {path}: {source}")]
    Parse { path: PathBuf, source: ParseError },
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top level errors
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_yaml::Error),
    #[error("Invalid component records: {0}")]
    Records(#[from] serde_json::Error),
}
