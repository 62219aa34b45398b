use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::{
    error::TemplateError,
    geometry::{Connector, GeometryGenerator, IcBox, StaticTemplate},
    record::FieldExpr,
    sexpr,
};

/// Placeholder substituted in property templates
pub const VALUE_PLACEHOLDER: &str = "{VALUE}";

const IC_BOX: &str = "IC_Box";
const CONNECTOR: &str = "Connector";

/// A template body exactly as written in the configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTemplate {
    applies_to_categories: Vec<String>,
    #[serde(default)]
    field_mapping: Mapping,
    #[serde(default)]
    symbol_options: String,
    #[serde(default)]
    property_templates: Mapping,
    symbol_template: Option<String>,
    symbol_generator: Option<String>,
    power_pin_names: Option<Vec<String>>,
    pin_list_parameter: Option<String>,
}

/// A validated template
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    pub name: String,
    /// Category suffixes this template applies to, in configuration order
    pub categories: Vec<String>,
    pub field_mapping: Vec<(String, FieldExpr)>,
    /// Raw fragment placed in the symbol header, e.g. `(pin_names (offset 0))`
    pub symbol_options: String,
    /// Property templates with whitespace runs collapsed
    pub property_templates: Vec<(String, String)>,
    pub generator: GeometryGenerator,
}

impl TemplateDefinition {
    pub(crate) fn from_raw(name: &str, raw: RawTemplate) -> Result<Self, TemplateError> {
        let generator = geometry_from_raw(name, &raw)?;
        sexpr::parse_sequence(&raw.symbol_options).map_err(|source| {
            TemplateError::InvalidOptions {
                template: name.to_owned(),
                source,
            }
        })?;

        let field_mapping = string_pairs(name, "field_mapping", raw.field_mapping)?
            .into_iter()
            .map(|(field, expr)| (field, FieldExpr::parse(&expr)))
            .collect();

        let property_templates = string_pairs(name, "property_templates", raw.property_templates)?
            .into_iter()
            .map(|(property, template)| {
                if !template.contains(VALUE_PLACEHOLDER) {
                    return Err(TemplateError::MissingPlaceholder {
                        template: name.to_owned(),
                        property,
                    });
                }
                if let Err(source) = sexpr::parse_spanned(&template.replace(VALUE_PLACEHOLDER, "")) {
                    return Err(TemplateError::InvalidPropertyTemplate {
                        template: name.to_owned(),
                        property,
                        source,
                    });
                }
                Ok((property, collapse_whitespace(&template)))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            name: name.to_owned(),
            categories: raw.applies_to_categories,
            field_mapping,
            symbol_options: raw.symbol_options.trim().to_owned(),
            property_templates,
            generator,
        })
    }

    /// Suffix match against a component category, ignoring case and
    /// surrounding whitespace.
    pub fn applies_to(&self, category: &str) -> bool {
        let category = category.trim().to_lowercase();
        self.categories
            .iter()
            .map(|suffix| suffix.trim().to_lowercase())
            .any(|suffix| !suffix.is_empty() && category.ends_with(&suffix))
    }

    pub fn property_template(&self, property: &str) -> Option<&str> {
        self.property_templates
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, template)| template.as_str())
    }
}

fn geometry_from_raw(name: &str, raw: &RawTemplate) -> Result<GeometryGenerator, TemplateError> {
    let unexpected = |option: &str, generator: &str| TemplateError::UnexpectedOption {
        template: name.to_owned(),
        option: option.to_owned(),
        generator: generator.to_owned(),
    };

    match (&raw.symbol_template, &raw.symbol_generator) {
        (Some(_), Some(_)) => Err(TemplateError::ConflictingGeometry(name.to_owned())),
        (None, None) => Err(TemplateError::MissingGeometry(name.to_owned())),
        (Some(block), None) => {
            if raw.power_pin_names.is_some() {
                return Err(unexpected("power_pin_names", "symbol_template"));
            }
            if raw.pin_list_parameter.is_some() {
                return Err(unexpected("pin_list_parameter", "symbol_template"));
            }
            let block = StaticTemplate::new(block).map_err(|source| {
                TemplateError::InvalidStaticBlock {
                    template: name.to_owned(),
                    source,
                }
            })?;
            Ok(GeometryGenerator::Static(block))
        }
        (None, Some(generator)) => match generator.trim() {
            IC_BOX => {
                let mut ic = IcBox::new(raw.power_pin_names.clone().unwrap_or_default());
                if let Some(parameter) = &raw.pin_list_parameter {
                    ic = ic.with_pin_list_parameter(parameter);
                }
                Ok(GeometryGenerator::IcBox(ic))
            }
            CONNECTOR => {
                if raw.power_pin_names.is_some() {
                    return Err(unexpected("power_pin_names", CONNECTOR));
                }
                if raw.pin_list_parameter.is_some() {
                    return Err(unexpected("pin_list_parameter", CONNECTOR));
                }
                Ok(GeometryGenerator::Connector(Connector))
            }
            other => Err(TemplateError::UnknownGenerator {
                template: name.to_owned(),
                generator: other.to_owned(),
            }),
        },
    }
}

/// Converts a YAML mapping into ordered string pairs
fn string_pairs(
    template: &str,
    key: &str,
    mapping: Mapping,
) -> Result<Vec<(String, String)>, TemplateError> {
    let not_a_string = || TemplateError::NotAString {
        template: template.to_owned(),
        key: key.to_owned(),
    };
    mapping
        .into_iter()
        .map(|(k, v)| match (k, v) {
            (Value::String(k), Value::String(v)) => Ok((k, v)),
            _ => Err(not_a_string()),
        })
        .collect()
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn load(yaml: &str) -> Result<TemplateDefinition, TemplateError> {
        let raw: RawTemplate = serde_yaml::from_str(yaml)?;
        TemplateDefinition::from_raw("test", raw)
    }

    #[test]
    fn keeps_mapping_order() {
        let template = load(
            r#"
applies_to_categories: [Resistors]
field_mapping:
  Reference: "'R'"
  Value: Resistance
  Footprint: footprint.name
property_templates:
  Value: |
    (property "Value" "{VALUE}"
      (at 0 0 90))
symbol_template: (symbol "R_0_1" (rectangle (start -1 2) (end 1 -2)))
"#,
        )
        .unwrap();

        let fields: Vec<_> = template.field_mapping.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["Reference", "Value", "Footprint"]);
        assert_eq!(template.field_mapping[0].1, FieldExpr::Literal("R".into()));
        assert_eq!(
            template.property_template("Value"),
            Some(r#"(property "Value" "{VALUE}" (at 0 0 90))"#)
        );
        assert!(matches!(template.generator, GeometryGenerator::Static(_)));
    }

    #[test]
    fn ic_box_options() {
        let template = load(
            "applies_to_categories: [Microcontrollers]\nsymbol_generator: IC_Box\npower_pin_names: [VCC, GND]\n",
        )
        .unwrap();
        let GeometryGenerator::IcBox(ic) = template.generator else {
            panic!("expected IC_Box");
        };
        assert!(ic.is_power_pin("vcc"));
        assert!(!ic.is_power_pin("MOSI"));
    }

    #[rstest]
    #[case("applies_to_categories: [A]\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: IC_Box\nsymbol_template: (x)\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Opamp\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\npower_pin_names: [VCC]\n")]
    #[case("applies_to_categories: [A]\nsymbol_template: (symbol \"x\"\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\nproperty_templates:\n  Value: (property \"Value\" \"x\")\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\nfield_mapping:\n  Value: [a, b]\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\nunknown_key: 1\n")]
    #[case("symbol_generator: Connector\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\nproperty_templates:\n  Value: (property \"Value\" \"{VALUE}\" (at 0 0\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\nproperty_templates:\n  Value: (property \"Value\" \"{VALUE}\") (extra)\n")]
    #[case("applies_to_categories: [A]\nsymbol_generator: Connector\nsymbol_options: (pin_names (offset 0)\n")]
    fn rejects_malformed_templates(#[case] yaml: &str) {
        assert!(load(yaml).is_err());
    }

    #[rstest]
    #[case("Thick Film Resistors", true)]
    #[case("Passives → Resistors", true)]
    #[case("passives → resistors  ", true)]
    #[case("Resistor Arrays", false)]
    #[case("Capacitors", false)]
    fn category_suffix_match(#[case] category: &str, #[case] expected: bool) {
        let template =
            load("applies_to_categories: [Resistors]\nsymbol_generator: Connector\n").unwrap();
        assert_eq!(template.applies_to(category), expected);
    }
}
