use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Separator used by the inventory between category path segments
const CATEGORY_SEPARATOR: &str = " → ";

/// A component as delivered by the inventory, read-only during generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    /// Full category path, e.g. `Passives → Resistors → Thick Film Resistors`
    pub category: String,
    /// Inventory attributes, possibly nested (`footprint.name`)
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    /// Free-form parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl ComponentRecord {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            attributes: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// The name the symbol gets in the library
    pub fn symbol_name(&self) -> String {
        self.name.trim().replace(' ', "_")
    }

    /// Last segment of the category path, used to name the target library
    pub fn category_leaf(&self) -> &str {
        let category = self.category.as_str();
        category
            .rsplit_once(CATEGORY_SEPARATOR)
            .map_or(category, |(_, leaf)| leaf)
            .trim()
    }

    /// A parameter looked up by exact name, then with its first letter capitalised
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .or_else(|| self.parameters.get(&capitalize(name)))
            .map(String::as_str)
    }

    fn attribute(&self, path: &str) -> Option<String> {
        let mut segments = path.split('.');
        let mut current = self.attributes.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        leaf_text(current)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A field-mapping expression: a quoted literal or a dotted lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldExpr {
    Literal(String),
    Path(String),
}

impl FieldExpr {
    pub fn parse(expr: &str) -> Self {
        let trimmed = expr.trim();
        for quote in ['\'', '"'] {
            if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
                return FieldExpr::Literal(trimmed[1..trimmed.len() - 1].to_owned());
            }
        }
        FieldExpr::Path(trimmed.to_owned())
    }

    /// Evaluates the expression against a record.
    ///
    /// Missing attributes yield an empty string, never an error.
    pub fn resolve(&self, record: &ComponentRecord) -> String {
        match self {
            FieldExpr::Literal(value) => value.clone(),
            FieldExpr::Path(path) => resolve_path(path, record),
        }
    }
}

/// Resolves a path against the record: nested attributes for dotted paths,
/// otherwise a top-level attribute and then a parameter of that name.
pub fn resolve_path(path: &str, record: &ComponentRecord) -> String {
    if path.is_empty() {
        return String::new();
    }
    if let Some(value) = record.attribute(path) {
        return value;
    }
    if path.contains('.') {
        return String::new();
    }
    match path {
        "name" => record.name.clone(),
        "category" => record.category.clone(),
        _ => record.parameter(path).unwrap_or_default().to_owned(),
    }
}
