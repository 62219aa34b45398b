use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::{
    error::TemplateError,
    template::{RawTemplate, TemplateDefinition},
};

/// All templates from the configuration, in document order
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<TemplateDefinition>,
}

impl TemplateCatalog {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Loads and validates every template. A single malformed template
    /// rejects the whole file.
    pub fn from_yaml(text: &str) -> Result<Self, TemplateError> {
        if text.trim().is_empty() {
            return Err(TemplateError::Empty);
        }
        let mapping: Option<Mapping> = serde_yaml::from_str(text)?;
        let mapping = mapping.ok_or(TemplateError::Empty)?;
        if mapping.is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut templates = Vec::with_capacity(mapping.len());
        for (name, body) in mapping {
            let name = match name {
                Value::String(name) => name,
                other => serde_yaml::to_string(&other)?.trim().to_owned(),
            };
            let raw: RawTemplate = serde_yaml::from_value(body)?;
            templates.push(TemplateDefinition::from_raw(&name, raw)?);
        }
        debug!(count = templates.len(), "loaded templates");
        Ok(Self { templates })
    }

    /// The first template, in document order, whose category list matches.
    pub fn resolve(&self, category: &str) -> Option<&TemplateDefinition> {
        self.templates.iter().find(|t| t.applies_to(category))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateDefinition> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn loads_fixture_templates() {
        let catalog = TemplateCatalog::from_yaml(&test_data!("templates.yaml")).unwrap();
        let names: Vec<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Resistors", "Capacitors", "Microcontrollers", "Connectors"]
        );
    }

    #[test]
    fn resolves_by_suffix() {
        let catalog = TemplateCatalog::from_yaml(&test_data!("templates.yaml")).unwrap();
        let template = catalog
            .resolve("Passives → Resistors → Thick Film Resistors")
            .unwrap();
        assert_eq!(template.name, "Resistors");
        assert!(catalog.resolve("Crystals").is_none());
    }

    #[test]
    fn earliest_template_wins() {
        let catalog = TemplateCatalog::from_yaml(
            r#"
Generic:
  applies_to_categories: [Resistors]
  symbol_generator: Connector
Specific:
  applies_to_categories: [Film Resistors]
  symbol_generator: Connector
"#,
        )
        .unwrap();
        assert_eq!(
            catalog.resolve("Thick Film Resistors").map(|t| t.name.as_str()),
            Some("Generic")
        );
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(matches!(
            TemplateCatalog::from_yaml(""),
            Err(TemplateError::Empty)
        ));
        assert!(matches!(
            TemplateCatalog::from_yaml("{}"),
            Err(TemplateError::Empty)
        ));
    }
}
