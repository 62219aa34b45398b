//! Generates KiCad symbols from component records and reconciles them with
//! existing `.kicad_sym` libraries.

pub mod catalog;
pub mod config;
pub mod diff;
pub mod error;
pub mod geometry;
pub mod library;
pub mod merge;
pub mod property;
pub mod record;
pub mod sexpr;
pub mod symbol;
pub mod sync;
pub mod template;

pub use catalog::TemplateCatalog;
pub use config::Settings;
pub use diff::{ChangeList, ChangeRecord, Classification};
pub use error::Error;
pub use library::{LibraryFile, LibraryHeader};
pub use merge::ApplyReport;
pub use record::ComponentRecord;
pub use symbol::{GeneratedSymbol, SymbolAssembler};
pub use sync::{SyncReport, Synchronizer};
