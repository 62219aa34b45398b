use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{error::Error, library::LibraryHeader};

/// Runtime settings, every field optional
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Template configuration file
    pub templates: PathBuf,
    /// Directory holding the generated `.kicad_sym` libraries
    pub output_dir: PathBuf,
    /// Header of newly created libraries
    pub library: LibraryHeader,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            templates: PathBuf::from("templates.yaml"),
            output_dir: PathBuf::from("kicad_libs"),
            library: LibraryHeader::default(),
        }
    }
}

impl Settings {
    /// Reads settings from a YAML file. Relative paths inside it are taken
    /// relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut settings = Self::from_yaml(&text)?;
        if let Some(base) = path.parent() {
            settings.templates = base.join(&settings.templates);
            settings.output_dir = base.join(&settings.output_dir);
        }
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}
