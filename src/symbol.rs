use std::fmt::Display;

use tracing::debug;

use crate::{
    error::GeneratorError,
    geometry::Geometry,
    property::{Property, PropertyRenderer},
    record::ComponentRecord,
    sexpr,
    template::TemplateDefinition,
};

const BOM_FLAGS: &str = "(in_bom yes) (on_board yes)";

/// A complete symbol definition built from one record and one template
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSymbol {
    pub name: String,
    /// Category of the source record, kept for reporting
    pub category: String,
    pub options: String,
    pub properties: Vec<Property>,
    pub geometry: Geometry,
}

/// Symbol text as placed in a library file.
///
/// The first line starts at the opening parenthesis; following lines are
/// indented for a symbol nested one level inside `kicad_symbol_lib`.
impl Display for GeneratedSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(symbol \"{}\"", sexpr::escape(&self.name))?;
        if !self.options.is_empty() {
            write!(f, " {}", self.options)?;
        }
        if !self.options.contains("(in_bom") {
            write!(f, " {}", BOM_FLAGS)?;
        }
        writeln!(f)?;

        for property in &self.properties {
            writeln!(f, "    {}", property.text)?;
        }

        match &self.geometry {
            Geometry::Static(block) => {
                for line in block.lines().filter(|line| !line.trim().is_empty()) {
                    writeln!(f, "    {}", line.trim_end())?;
                }
            }
            Geometry::Drawn { units, .. } => {
                for unit in units {
                    writeln!(
                        f,
                        "    (symbol \"{}_{}_1\"",
                        sexpr::escape(&self.name),
                        unit.number
                    )?;
                    for graphic in &unit.graphics {
                        writeln!(f, "      {}", graphic)?;
                    }
                    for pin in &unit.pins {
                        writeln!(f, "      {}", pin)?;
                    }
                    writeln!(f, "    )")?;
                }
            }
        }
        f.write_str("  )")
    }
}

impl GeneratedSymbol {
    pub fn text(&self) -> String {
        self.to_string()
    }
}

/// Composes properties and geometry into a symbol
#[derive(Debug, Clone, Copy)]
pub struct SymbolAssembler<'t> {
    template: &'t TemplateDefinition,
}

impl<'t> SymbolAssembler<'t> {
    pub fn new(template: &'t TemplateDefinition) -> Self {
        Self { template }
    }

    pub fn assemble(&self, record: &ComponentRecord) -> Result<GeneratedSymbol, GeneratorError> {
        let geometry = self.template.generator.generate(record)?;
        let properties = PropertyRenderer::new(self.template).render(record, geometry.body());
        let symbol = GeneratedSymbol {
            name: record.symbol_name(),
            category: record.category.clone(),
            options: self.template.symbol_options.clone(),
            properties,
            geometry,
        };
        debug!(
            symbol = %symbol.name,
            template = %self.template.name,
            properties = symbol.properties.len(),
            pins = symbol.geometry.pins().count(),
            "assembled symbol"
        );
        Ok(symbol)
    }
}
