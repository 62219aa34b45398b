use tracing::debug;

use crate::{error::GeneratorError, record::ComponentRecord};

use super::{BodyBounds, ElectricalType, Geometry, Graphic, Pin, Point, Side, Unit, GRID, PIN_LENGTH};

const BODY_WIDTH: f64 = 15.24;
const DEFAULT_PIN_LIST_PARAMETER: &str = "Pin Description";

/// Rectangular IC body with pins on the left and right edges. Power pins go
/// to a second unit when the part also has logic pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcBox {
    /// Upper-cased
    power_pin_names: Vec<String>,
    pin_list_parameter: String,
}

impl IcBox {
    pub fn new(power_pin_names: Vec<String>) -> Self {
        Self {
            power_pin_names: power_pin_names
                .iter()
                .map(|name| name.trim().to_uppercase())
                .collect(),
            pin_list_parameter: DEFAULT_PIN_LIST_PARAMETER.to_owned(),
        }
    }

    pub fn with_pin_list_parameter(mut self, parameter: &str) -> Self {
        self.pin_list_parameter = parameter.trim().to_owned();
        self
    }

    pub fn is_power_pin(&self, name: &str) -> bool {
        let name = name.to_uppercase();
        self.power_pin_names.iter().any(|power| *power == name)
    }

    pub fn generate(&self, record: &ComponentRecord) -> Result<Geometry, GeneratorError> {
        let names: Vec<&str> = record
            .parameter(&self.pin_list_parameter)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Err(GeneratorError::MissingParameter(
                self.pin_list_parameter.clone(),
            ));
        }

        let numbered = names.iter().zip(1u32..);
        let (power, logic): (Vec<_>, Vec<_>) =
            numbered.clone().partition(|(name, _)| self.is_power_pin(name));

        let groups = if power.is_empty() || logic.is_empty() {
            vec![numbered.collect::<Vec<_>>()]
        } else {
            vec![logic, power]
        };
        debug!(
            symbol = %record.symbol_name(),
            pins = names.len(),
            units = groups.len(),
            "laying out IC box"
        );

        let mut units = Vec::with_capacity(groups.len());
        let mut body = None;
        for (group, number) in groups.iter().zip(1u32..) {
            let (unit, bounds) = self.unit(number, group);
            body.get_or_insert(bounds);
            units.push(unit);
        }
        let body = body.unwrap_or(BodyBounds {
            left: -BODY_WIDTH / 2.0,
            top: 0.0,
        });
        Ok(Geometry::Drawn { units, body })
    }

    fn unit(&self, number: u32, pins: &[(&&str, u32)]) -> (Unit, BodyBounds) {
        let left_count = pins.len().div_ceil(2);
        let right_count = pins.len() / 2;
        let min_grids: usize = if number == 1 { 3 } else { 2 };
        let grids = min_grids.max(left_count.max(right_count).saturating_sub(1));
        let top = (grids as f64 * GRID + GRID) / 2.0;
        let left = -BODY_WIDTH / 2.0;
        let right = BODY_WIDTH / 2.0;

        let outline = Graphic::Rectangle {
            start: Point::new(left, top),
            end: Point::new(right, -top),
        };

        let (left_pins, right_pins) = pins.split_at(left_count);
        let mut placed = Vec::with_capacity(pins.len());
        for (side, column, x) in [
            (Side::Left, left_pins, left - PIN_LENGTH),
            (Side::Right, right_pins, right + PIN_LENGTH),
        ] {
            let start_y = (column.len() as f64 - 1.0) * GRID / 2.0;
            for (i, (name, pin_number)) in column.iter().enumerate() {
                let electrical = if self.is_power_pin(name) {
                    ElectricalType::PowerIn
                } else {
                    ElectricalType::Passive
                };
                placed.push(Pin {
                    number: *pin_number,
                    name: name.to_string(),
                    electrical,
                    side,
                    at: Point::new(x, start_y - i as f64 * GRID),
                    unit: number,
                    hide_name: false,
                });
            }
        }

        let unit = Unit {
            number,
            graphics: vec![outline],
            pins: placed,
        };
        (unit, BodyBounds { left, top })
    }
}
