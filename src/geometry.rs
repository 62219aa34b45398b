use std::fmt::Display;

use crate::{
    error::{GeneratorError, ParseError},
    record::ComponentRecord,
    sexpr::{self, ParsedSExpr},
};

mod connector;
mod ic_box;

pub use connector::Connector;
pub use ic_box::IcBox;

/// Grid pitch in mm, pins and body edges sit on multiples of it
pub const GRID: f64 = 2.54;
pub const PIN_LENGTH: f64 = 2.54;
pub const FONT_SIZE: f64 = 1.27;

/// Formats a coordinate in mm with two decimals, never as `-0.00`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mm(pub f64);

impl Display for Mm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = if self.0 == 0.0 { 0.0 } else { self.0 };
        write!(f, "{:.2}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", Mm(self.x), Mm(self.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectricalType {
    PowerIn,
    Passive,
}

impl ElectricalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectricalType::PowerIn => "power_in",
            ElectricalType::Passive => "passive",
        }
    }
}

/// Body edge a pin is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Pin orientation in degrees, pointing into the body
    pub fn orientation(&self) -> u16 {
        match self {
            Side::Left => 0,
            Side::Right => 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    /// 1-based position in the source pin list
    pub number: u32,
    pub name: String,
    pub electrical: ElectricalType,
    pub side: Side,
    pub at: Point,
    pub unit: u32,
    pub hide_name: bool,
}

impl Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let font = format!("(font (size {} {}))", FONT_SIZE, FONT_SIZE);
        let hide = if self.hide_name { " (hide yes)" } else { "" };
        write!(
            f,
            "(pin {} line (at {} {}) (length {}) (name \"{}\" (effects {}{})) (number \"{}\" (effects {})))",
            self.electrical.as_str(),
            self.at,
            self.side.orientation(),
            PIN_LENGTH,
            sexpr::escape(&self.name),
            font,
            hide,
            self.number,
            font
        )
    }
}

/// Drawing primitives used by the generators
#[derive(Debug, Clone, PartialEq)]
pub enum Graphic {
    /// Body outline
    Rectangle { start: Point, end: Point },
    /// Contact line
    Polyline { from: Point, to: Point },
    /// Socket contour
    Arc { start: Point, mid: Point, end: Point },
}

const BODY_STROKE: &str = "(stroke (width 0.254) (type default)) (fill (type background))";
const DETAIL_STROKE: &str = "(stroke (width 0.2) (type default)) (fill (type none))";

impl Display for Graphic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Graphic::Rectangle { start, end } => {
                write!(f, "(rectangle (start {start}) (end {end}) {BODY_STROKE})")
            }
            Graphic::Polyline { from, to } => {
                write!(f, "(polyline (pts (xy {from}) (xy {to})) {DETAIL_STROKE})")
            }
            Graphic::Arc { start, mid, end } => {
                write!(
                    f,
                    "(arc (start {start}) (mid {mid}) (end {end}) {DETAIL_STROKE})"
                )
            }
        }
    }
}

/// One drawn unit of a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub number: u32,
    pub graphics: Vec<Graphic>,
    pub pins: Vec<Pin>,
}

/// Top-left corner of the first unit's body, used to anchor properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyBounds {
    pub left: f64,
    pub top: f64,
}

/// Output of a geometry generator
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A captured block, emitted as written
    Static(String),
    Drawn { units: Vec<Unit>, body: BodyBounds },
}

impl Geometry {
    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        let units: &[Unit] = match self {
            Geometry::Static(_) => &[],
            Geometry::Drawn { units, .. } => units,
        };
        units.iter().flat_map(|unit| unit.pins.iter())
    }

    pub fn body(&self) -> Option<BodyBounds> {
        match self {
            Geometry::Static(_) => None,
            Geometry::Drawn { body, .. } => Some(*body),
        }
    }
}

/// The generator a template selects
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryGenerator {
    Static(StaticTemplate),
    IcBox(IcBox),
    Connector(Connector),
}

impl GeometryGenerator {
    pub fn generate(&self, record: &ComponentRecord) -> Result<Geometry, GeneratorError> {
        match self {
            GeometryGenerator::Static(template) => Ok(template.generate(record)),
            GeometryGenerator::IcBox(ic) => ic.generate(record),
            GeometryGenerator::Connector(connector) => connector.generate(record),
        }
    }
}

/// Graphics and pins captured once from an existing symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTemplate {
    block: String,
    /// Spans of unit names such as `R_Small_0_1`, with the length of their
    /// `_<unit>_<style>` suffix
    unit_names: Vec<(sexpr::Span, usize)>,
}

impl StaticTemplate {
    pub fn new(block: &str) -> Result<Self, ParseError> {
        let items = sexpr::parse_sequence(block)?;
        let unit_names = items
            .iter()
            .filter(|item| item.label(block) == Some("symbol"))
            .filter_map(ParsedSExpr::first_string)
            .filter_map(|span| unit_suffix_len(&block[span.clone()]).map(|len| (span, len)))
            .collect();
        Ok(Self {
            block: block.to_owned(),
            unit_names,
        })
    }

    /// Emits the block unchanged apart from the unit names, which must carry
    /// the name of the symbol they belong to.
    pub fn generate(&self, record: &ComponentRecord) -> Geometry {
        let name = sexpr::escape(&record.symbol_name());
        let mut block = self.block.clone();
        for (span, suffix_len) in self.unit_names.iter().rev() {
            let suffix = &self.block[span.end - suffix_len..span.end];
            block.replace_range(span.clone(), &format!("{name}{suffix}"));
        }
        Geometry::Static(block)
    }
}

/// Length of a trailing `_<digits>_<digits>`
fn unit_suffix_len(name: &str) -> Option<usize> {
    let (rest, style) = name.rsplit_once('_')?;
    let (prefix, unit) = rest.rsplit_once('_')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if prefix.is_empty() || !digits(unit) || !digits(style) {
        return None;
    }
    Some(unit.len() + style.len() + 2)
}
