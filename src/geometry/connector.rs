use tracing::{debug, warn};

use crate::{error::GeneratorError, record::ComponentRecord};

use super::{BodyBounds, ElectricalType, Geometry, Graphic, Pin, Point, Side, Unit, GRID, PIN_LENGTH};

const ROWS: &str = "Number of Rows";
const PINS_PER_ROW: &str = "Pins per Row";
const TOTAL_PINS: [&str; 2] = ["Number of Pins", "Pin Count"];
const GENDER: &str = "Gender";
const PIN_ANNOTATION: &str = "Pin Annotation";

const SINGLE_ROW_WIDTH: f64 = 3.81;
const MULTI_ROW_WIDTH: f64 = 7.62;
const MALE_CONTACT: f64 = 2.54;
const FEMALE_CONTACT: f64 = 1.905;
const SOCKET_RADIUS: f64 = 0.635;

/// Largest connector drawn, counted over all rows
pub const MAX_PINS: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

impl From<&str> for Gender {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            _ => Gender::Unspecified,
        }
    }
}

/// Pin numbering convention of a multi-row connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinAnnotation {
    /// Row 1 gets `1..k`, row 2 gets `k+1..2k`
    Line,
    /// Odd numbers on row 1, even numbers on row 2
    Alternating,
}

impl From<&str> for PinAnnotation {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("line") {
            PinAnnotation::Line
        } else {
            PinAnnotation::Alternating
        }
    }
}

/// Resolved connector parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorLayout {
    pub rows: u32,
    pub pins_per_row: u32,
    pub gender: Gender,
    pub annotation: PinAnnotation,
}

impl ConnectorLayout {
    pub fn from_record(record: &ComponentRecord) -> Result<Self, GeneratorError> {
        let rows = count(record, ROWS).unwrap_or(1).max(1);
        if rows > 2 {
            return Err(GeneratorError::UnsupportedRowCount(rows));
        }

        let mut pins_per_row = count(record, PINS_PER_ROW).unwrap_or(0);
        if pins_per_row == 0 {
            let total = TOTAL_PINS
                .iter()
                .find_map(|name| count(record, name))
                .unwrap_or(0);
            if total > 0 {
                if total % rows != 0 {
                    return Err(GeneratorError::UnevenPinCount { total, rows });
                }
                pins_per_row = total / rows;
            }
        }

        let pins_per_row = pins_per_row.max(1);
        match rows.checked_mul(pins_per_row) {
            Some(total) if total <= MAX_PINS => {}
            _ => {
                return Err(GeneratorError::PinCountOutOfRange {
                    rows,
                    pins_per_row,
                    max: MAX_PINS,
                })
            }
        }

        Ok(Self {
            rows,
            pins_per_row,
            gender: record.parameter(GENDER).unwrap_or_default().into(),
            annotation: record.parameter(PIN_ANNOTATION).unwrap_or_default().into(),
        })
    }

    /// Pin number at `position` (0-based from the top) of `row` (0-based)
    pub fn number(&self, row: u32, position: u32) -> u32 {
        match (self.rows, self.annotation) {
            (1, _) => position + 1,
            (_, PinAnnotation::Line) => row * self.pins_per_row + position + 1,
            (rows, PinAnnotation::Alternating) => position * rows + row + 1,
        }
    }
}

/// Reads a non-negative count parameter. Absent values give `None`,
/// unparsable ones are logged and treated as absent.
fn count(record: &ComponentRecord, name: &str) -> Option<u32> {
    let value = record.parameter(name)?.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(n) => Some(n.clamp(0, u32::MAX as i64) as u32),
        Err(_) => {
            warn!(symbol = %record.symbol_name(), parameter = name, value, "ignoring unparsable count");
            None
        }
    }
}

/// Pin header or socket, one or two rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connector;

impl Connector {
    pub fn generate(&self, record: &ComponentRecord) -> Result<Geometry, GeneratorError> {
        let layout = ConnectorLayout::from_record(record)?;
        debug!(symbol = %record.symbol_name(), ?layout, "laying out connector");

        let width = if layout.rows == 1 {
            SINGLE_ROW_WIDTH
        } else {
            MULTI_ROW_WIDTH
        };
        let grids = 2u32.max(layout.pins_per_row.saturating_sub(1));
        let top = (grids as f64 * GRID + GRID) / 2.0;
        let left = -width / 2.0;
        let right = width / 2.0;
        let start_y = (layout.pins_per_row as f64 - 1.0) * GRID / 2.0;

        let mut pins = Vec::with_capacity((layout.rows * layout.pins_per_row) as usize);
        let mut contacts = Vec::new();
        for row in 0..layout.rows {
            let (side, edge, x) = if row == 0 {
                (Side::Left, left, left - PIN_LENGTH)
            } else {
                (Side::Right, right, right + PIN_LENGTH)
            };
            for position in 0..layout.pins_per_row {
                let y = start_y - position as f64 * GRID;
                let number = layout.number(row, position);
                pins.push(Pin {
                    number,
                    name: number.to_string(),
                    electrical: ElectricalType::Passive,
                    side,
                    at: Point::new(x, y),
                    unit: 1,
                    hide_name: true,
                });
                contacts.push((number, contact(layout.gender, side, edge, y)));
            }
        }
        pins.sort_by_key(|pin| pin.number);
        contacts.sort_by_key(|(number, _)| *number);

        let mut graphics = vec![Graphic::Rectangle {
            start: Point::new(left, top),
            end: Point::new(right, -top),
        }];
        graphics.extend(contacts.into_iter().flat_map(|(_, graphics)| graphics));

        Ok(Geometry::Drawn {
            units: vec![Unit {
                number: 1,
                graphics,
                pins,
            }],
            body: BodyBounds { left, top },
        })
    }
}

/// Contact drawing for one pin, from the body edge inwards
fn contact(gender: Gender, side: Side, edge: f64, y: f64) -> Vec<Graphic> {
    // points into the body
    let dir = match side {
        Side::Left => 1.0,
        Side::Right => -1.0,
    };
    match gender {
        Gender::Unspecified => vec![],
        Gender::Male => vec![Graphic::Polyline {
            from: Point::new(edge, y),
            to: Point::new(edge + dir * MALE_CONTACT, y),
        }],
        Gender::Female => vec![
            Graphic::Polyline {
                from: Point::new(edge, y),
                to: Point::new(edge + dir * FEMALE_CONTACT, y),
            },
            Graphic::Arc {
                start: Point::new(edge + dir * MALE_CONTACT, y + dir * SOCKET_RADIUS),
                mid: Point::new(edge + dir * FEMALE_CONTACT, y),
                end: Point::new(edge + dir * MALE_CONTACT, y - dir * SOCKET_RADIUS),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn connector(params: &[(&str, &str)]) -> ComponentRecord {
        params.iter().fold(
            ComponentRecord::new("Header 2x2", "Connectors"),
            |record, (key, value)| record.with_parameter(*key, *value),
        )
    }

    fn numbers_by_side(geometry: &Geometry) -> (Vec<u32>, Vec<u32>) {
        let on = |side: Side| -> Vec<u32> {
            let mut pins: Vec<_> = geometry.pins().filter(|pin| pin.side == side).collect();
            pins.sort_by(|a, b| b.at.y.total_cmp(&a.at.y));
            pins.iter().map(|pin| pin.number).collect()
        };
        (on(Side::Left), on(Side::Right))
    }

    #[rstest]
    #[case(None, vec![1, 3], vec![2, 4])]
    #[case(Some("line"), vec![1, 2], vec![3, 4])]
    #[case(Some("Line"), vec![1, 2], vec![3, 4])]
    #[case(Some("zigzag"), vec![1, 3], vec![2, 4])]
    fn two_row_numbering(
        #[case] annotation: Option<&str>,
        #[case] row_1: Vec<u32>,
        #[case] row_2: Vec<u32>,
    ) {
        let mut params = vec![("Number of Rows", "2"), ("Pins per Row", "2")];
        if let Some(annotation) = annotation {
            params.push(("Pin Annotation", annotation));
        }
        let geometry = Connector.generate(&connector(&params)).unwrap();
        assert_eq!(numbers_by_side(&geometry), (row_1, row_2));
    }

    #[rstest]
    #[case(&[("Number of Pins", "8")], 1, 8)]
    #[case(&[("Number of Rows", "2"), ("Number of Pins", "8")], 2, 4)]
    #[case(&[("Number of Rows", "2"), ("Pin Count", "10")], 2, 5)]
    #[case(&[("Pins per Row", "3"), ("Number of Pins", "99")], 1, 3)]
    #[case(&[], 1, 1)]
    #[case(&[("Number of Rows", "two"), ("Pins per Row", "4")], 1, 4)]
    #[case(&[("Number of Rows", "0"), ("Pins per Row", "-3")], 1, 1)]
    fn resolves_layout(
        #[case] params: &[(&str, &str)],
        #[case] rows: u32,
        #[case] pins_per_row: u32,
    ) {
        let layout = ConnectorLayout::from_record(&connector(params)).unwrap();
        assert_eq!((layout.rows, layout.pins_per_row), (rows, pins_per_row));
    }

    #[test]
    fn uneven_total_is_rejected() {
        let record = connector(&[("Number of Rows", "2"), ("Number of Pins", "7")]);
        assert_eq!(
            Connector.generate(&record),
            Err(GeneratorError::UnevenPinCount { total: 7, rows: 2 })
        );
    }

    #[test]
    fn more_than_two_rows_is_rejected() {
        let record = connector(&[("Number of Rows", "3"), ("Pins per Row", "4")]);
        assert_eq!(
            Connector.generate(&record),
            Err(GeneratorError::UnsupportedRowCount(3))
        );
    }

    #[rstest]
    #[case("2", "3000000000")]
    #[case("1", "4294967295")]
    #[case("2", "201")]
    #[case("1", "401")]
    fn oversized_connector_is_rejected(#[case] rows: &str, #[case] per_row: &str) {
        let record = connector(&[("Number of Rows", rows), ("Pins per Row", per_row)]);
        assert!(matches!(
            Connector.generate(&record),
            Err(GeneratorError::PinCountOutOfRange { max: MAX_PINS, .. })
        ));
    }

    #[rstest]
    #[case(&[("Number of Rows", "2"), ("Pins per Row", "200")])]
    #[case(&[("Number of Pins", "400")])]
    fn largest_connector_is_drawn(#[case] params: &[(&str, &str)]) {
        let geometry = Connector.generate(&connector(params)).unwrap();
        assert_eq!(geometry.pins().count(), MAX_PINS as usize);
    }

    #[rstest]
    #[case("1", "5", 5)]
    #[case("2", "5", 10)]
    #[case("2", "1", 2)]
    fn emits_every_pin_once(#[case] rows: &str, #[case] per_row: &str, #[case] total: u32) {
        let record = connector(&[("Number of Rows", rows), ("Pins per Row", per_row)]);
        let geometry = Connector.generate(&record).unwrap();
        let numbers: Vec<u32> = geometry.pins().map(|pin| pin.number).collect();
        assert_eq!(numbers, (1..=total).collect::<Vec<_>>());
        assert!(geometry.pins().all(|pin| pin.hide_name && pin.name == pin.number.to_string()));
    }

    #[rstest]
    #[case("1", SINGLE_ROW_WIDTH)]
    #[case("2", MULTI_ROW_WIDTH)]
    fn body_width_depends_on_rows(#[case] rows: &str, #[case] width: f64) {
        let record = connector(&[("Number of Rows", rows), ("Pins per Row", "2")]);
        let body = Connector.generate(&record).unwrap().body().unwrap();
        assert_eq!(body.left, -width / 2.0);
    }

    #[rstest]
    #[case("Male", 1)]
    #[case("female", 2)]
    #[case("", 0)]
    fn gender_changes_graphics_only(#[case] gender: &str, #[case] per_pin: usize) {
        let record = connector(&[("Pins per Row", "3"), ("Gender", gender)]);
        let geometry = Connector.generate(&record).unwrap();
        let Geometry::Drawn { units, .. } = &geometry else {
            panic!("expected drawn geometry");
        };
        assert_eq!(units[0].graphics.len(), 1 + 3 * per_pin);
        assert_eq!(
            geometry.pins().map(|pin| pin.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
