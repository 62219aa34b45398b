use crate::{
    error::ParseError,
    geometry::{BodyBounds, Mm, FONT_SIZE, GRID},
    record::{resolve_path, ComponentRecord, FieldExpr},
    sexpr::{self, SExpr},
    template::{TemplateDefinition, VALUE_PLACEHOLDER},
};

const REFERENCE: &str = "Reference";
const PART_NUMBER: &str = "Manufacturer Partnumber";
const DESCRIPTION: &str = "Description";

/// Gap between a generated body and the text anchored to it
const LABEL_OFFSET: f64 = 1.27;

/// A rendered property block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub text: String,
}

/// Renders the properties of one symbol from its template
#[derive(Debug, Clone, Copy)]
pub struct PropertyRenderer<'t> {
    template: &'t TemplateDefinition,
}

impl<'t> PropertyRenderer<'t> {
    pub fn new(template: &'t TemplateDefinition) -> Self {
        Self { template }
    }

    /// Mapped fields first, in mapping order, then every remaining
    /// parameter of the record as a hidden property.
    ///
    /// When `body` is given, the reference, part number and description are
    /// placed around it instead of where their templates put them.
    pub fn render(&self, record: &ComponentRecord, body: Option<BodyBounds>) -> Vec<Property> {
        let mut values: Vec<(String, String)> = self
            .template
            .field_mapping
            .iter()
            .map(|(field, expr)| {
                let mut value = expr.resolve(record);
                if value.is_empty() && matches!(expr, FieldExpr::Path(_)) {
                    value = resolve_path(field, record);
                }
                (field.clone(), value)
            })
            .collect();

        for (name, value) in &record.parameters {
            if !values.iter().any(|(field, _)| field == name) {
                values.push((name.clone(), value.clone()));
            }
        }

        values
            .into_iter()
            .map(|(name, value)| {
                let text = self.render_one(&name, &value, body);
                Property { name, value, text }
            })
            .collect()
    }

    pub fn render_one(&self, name: &str, value: &str, body: Option<BodyBounds>) -> String {
        let template = self.template.property_template(name);
        if let Some(body) = body {
            if let Some(at) = anchor(name, body) {
                let (w, h) = template
                    .and_then(|t| font_size(t).ok())
                    .unwrap_or_else(|| (FONT_SIZE.to_string(), FONT_SIZE.to_string()));
                return format!(
                    "(property \"{}\" \"{}\" (at {} {} 0) (effects (font (size {} {})) (justify left)))",
                    sexpr::escape(name),
                    sexpr::escape(value),
                    Mm(at.0),
                    Mm(at.1),
                    w,
                    h
                );
            }
        }
        match template {
            Some(template) => template.replace(VALUE_PLACEHOLDER, &sexpr::escape(value)),
            None => default_property(name, value),
        }
    }
}

/// Hidden, centred, default font size
pub fn default_property(name: &str, value: &str) -> String {
    format!(
        "(property \"{}\" \"{}\" (at 0 0 0) (effects (font (size {} {})) (hide yes)))",
        sexpr::escape(name),
        sexpr::escape(value),
        FONT_SIZE,
        FONT_SIZE
    )
}

fn anchor(name: &str, body: BodyBounds) -> Option<(f64, f64)> {
    let below = -body.top - LABEL_OFFSET;
    match name {
        REFERENCE => Some((body.left, body.top + LABEL_OFFSET)),
        PART_NUMBER => Some((body.left, below)),
        DESCRIPTION => Some((body.left, below - GRID)),
        _ => None,
    }
}

/// `(effects (font (size w h)))` of a property template
fn font_size(template: &str) -> Result<(String, String), ParseError> {
    let text = template.replace(VALUE_PLACEHOLDER, "");
    let property = SExpr::try_from(text.as_str())?;
    let size = property.child("effects")?.child("font")?.child("size")?;
    let mut dims = size.strings();
    match (dims.next(), dims.next()) {
        (Some(w), Some(h)) => Ok((w.to_owned(), h.to_owned())),
        _ => Err(ParseError::MissingValue()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateCatalog;
    use pretty_assertions::assert_eq;

    const TEMPLATES: &str = r#"
Resistors:
  applies_to_categories: [Resistors]
  field_mapping:
    Reference: "'R'"
    Value: Resistance
    Footprint: footprint.name
    Datasheet: datasheet_url
  property_templates:
    Reference: (property "Reference" "{VALUE}" (at 2.032 0 90) (effects (font (size 1.27 1.27))))
    Value: (property "Value" "{VALUE}" (at 0 0 90) (effects (font (size 1.5 1.5))))
  symbol_generator: Connector
"#;

    fn template() -> TemplateDefinition {
        let catalog = TemplateCatalog::from_yaml(TEMPLATES).unwrap();
        let template = catalog.resolve("Resistors").unwrap().clone();
        template
    }

    fn record() -> ComponentRecord {
        ComponentRecord::new("RC0603 10k", "Resistors")
            .with_attribute("footprint", serde_json::json!({ "name": "R_0603" }))
            .with_parameter("Resistance", "10k")
            .with_parameter("Tolerance", "1%")
            .with_parameter("Datasheet", "https://example.com/rc.pdf")
    }

    #[test]
    fn renders_mapped_fields_then_parameters() {
        let template = template();
        let properties = PropertyRenderer::new(&template).render(&record(), None);
        let names: Vec<_> = properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Reference", "Value", "Footprint", "Datasheet", "Resistance", "Tolerance"]
        );
        assert_eq!(
            properties[0].text,
            r#"(property "Reference" "R" (at 2.032 0 90) (effects (font (size 1.27 1.27))))"#
        );
        assert_eq!(
            properties[2].text,
            r#"(property "Footprint" "R_0603" (at 0 0 0) (effects (font (size 1.27 1.27)) (hide yes)))"#
        );
    }

    #[test]
    fn empty_mapping_falls_back_to_field_name() {
        let template = template();
        let properties = PropertyRenderer::new(&template).render(&record(), None);
        let datasheet = properties.iter().find(|p| p.name == "Datasheet").unwrap();
        assert_eq!(datasheet.value, "https://example.com/rc.pdf");
    }

    #[test]
    fn every_parameter_is_preserved() {
        let template = template();
        let record = record().with_parameter("Weird \"quoted\" key", "");
        let properties = PropertyRenderer::new(&template).render(&record, None);
        for key in record.parameters.keys() {
            assert!(properties.iter().any(|p| &p.name == key), "{key} missing");
        }
        let weird = properties.iter().find(|p| p.name.starts_with("Weird")).unwrap();
        assert!(SExpr::try_from(weird.text.as_str()).is_ok());
    }

    #[test]
    fn values_are_escaped() {
        let template = template();
        let record = record().with_parameter("Resistance", "10\"k");
        let properties = PropertyRenderer::new(&template).render(&record, None);
        assert_eq!(
            properties[1].text,
            r#"(property "Value" "10\"k" (at 0 0 90) (effects (font (size 1.5 1.5))))"#
        );
    }

    #[test]
    fn anchors_labels_to_body() {
        let template = template();
        let renderer = PropertyRenderer::new(&template);
        let body = Some(BodyBounds {
            left: -5.0,
            top: 4.0,
        });
        assert_eq!(
            renderer.render_one("Reference", "J", body),
            r#"(property "Reference" "J" (at -5.00 5.27 0) (effects (font (size 1.27 1.27)) (justify left)))"#
        );
        assert_eq!(
            renderer.render_one("Description", "Header", body),
            r#"(property "Description" "Header" (at -5.00 -7.81 0) (effects (font (size 1.27 1.27)) (justify left)))"#
        );
        // not anchored, keeps its template
        assert_eq!(
            renderer.render_one("Value", "x", body),
            r#"(property "Value" "x" (at 0 0 90) (effects (font (size 1.5 1.5))))"#
        );
    }

    #[test]
    fn anchored_label_keeps_template_font_size() {
        assert_eq!(
            font_size(r#"(property "Value" "{VALUE}" (effects (font (size 2 1.8))))"#),
            Ok(("2".to_owned(), "1.8".to_owned()))
        );
        assert!(font_size("(property \"Value\" \"{VALUE}\")").is_err());
    }
}
