use crate::emissions::EmissionFactorTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Days used to amortize the monthly clothing factor to a daily rate.
pub const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Transport,
    Diet,
    Heating,
    Electricity,
    Consumption,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Transport,
        Category::Diet,
        Category::Heating,
        Category::Electricity,
        Category::Consumption,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Transport => "Transport",
            Category::Diet => "Diet",
            Category::Heating => "Heating",
            Category::Electricity => "Electricity",
            Category::Consumption => "Consumption",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference table a failed key lookup belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorTable {
    Transport,
    Diet,
    Heating,
}

impl fmt::Display for FactorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactorTable::Transport => "transport",
            FactorTable::Diet => "diet",
            FactorTable::Heating => "heating",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("invalid value for `{field}`: {value} ({reason})")]
    Validation {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("unknown {table} selection `{key}`")]
    Configuration { table: FactorTable, key: String },
}

/// Per-category daily emissions in kg CO2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub transport: f64,
    pub diet: f64,
    pub heating: f64,
    pub electricity: f64,
    pub consumption: f64,
}

impl CategoryBreakdown {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Transport => self.transport,
            Category::Diet => self.diet,
            Category::Heating => self.heating,
            Category::Electricity => self.electricity,
            Category::Consumption => self.consumption,
        }
    }

    pub fn total(&self) -> f64 {
        self.transport + self.diet + self.heating + self.electricity + self.consumption
    }

    pub fn entries(&self) -> [(Category, f64); 5] {
        Category::ALL.map(|category| (category, self.get(category)))
    }

    /// Largest contributor; ties resolve to the earlier category.
    pub fn largest(&self) -> Category {
        self.entries()
            .into_iter()
            .fold((Category::Transport, f64::MIN), |best, entry| {
                if entry.1 > best.1 { entry } else { best }
            })
            .0
    }
}

/// User selections and quantities for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintInput {
    pub transport_mode: String,
    pub distance_km: f64,
    pub diet_type: String,
    pub heating_type: String,
    pub heating_hours: f64,
    pub electricity_kwh: f64,
    /// kg CO2 per kWh.
    pub grid_intensity: f64,
    #[serde(default)]
    pub bought_new_clothes: bool,
    #[serde(default)]
    pub streaming_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub breakdown: CategoryBreakdown,
    pub total_emissions: f64,
}

impl Footprint {
    pub fn largest_category(&self) -> Category {
        self.breakdown.largest()
    }
}

pub fn calculate(
    table: &EmissionFactorTable,
    input: &FootprintInput,
) -> Result<Footprint, CalculationError> {
    non_negative("distance_km", input.distance_km)?;
    non_negative("heating_hours", input.heating_hours)?;
    non_negative("electricity_kwh", input.electricity_kwh)?;
    non_negative("streaming_hours", input.streaming_hours)?;
    if !(input.grid_intensity.is_finite() && input.grid_intensity > 0.0) {
        return Err(CalculationError::Validation {
            field: "grid_intensity",
            value: input.grid_intensity,
            reason: "must be a positive number",
        });
    }

    let transport_factor = lookup(
        FactorTable::Transport,
        &input.transport_mode,
        table.transport_factor(&input.transport_mode),
    )?;
    let diet_factor = lookup(
        FactorTable::Diet,
        &input.diet_type,
        table.diet_factor(&input.diet_type),
    )?;
    let heating_factor = lookup(
        FactorTable::Heating,
        &input.heating_type,
        table.heating_factor(&input.heating_type),
    )?;

    let clothes = if input.bought_new_clothes {
        table.consumption.new_clothes_monthly / DAYS_PER_MONTH
    } else {
        0.0
    };

    let breakdown = CategoryBreakdown {
        transport: transport_factor * input.distance_km,
        diet: diet_factor,
        heating: heating_factor * input.heating_hours,
        electricity: input.grid_intensity * input.electricity_kwh,
        consumption: clothes + table.consumption.streaming_hours_daily * input.streaming_hours,
    };

    Ok(Footprint {
        total_emissions: breakdown.total(),
        breakdown,
    })
}

fn non_negative(field: &'static str, value: f64) -> Result<(), CalculationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CalculationError::Validation {
            field,
            value,
            reason: "must be a non-negative number",
        })
    }
}

fn lookup(table: FactorTable, key: &str, factor: Option<f64>) -> Result<f64, CalculationError> {
    factor.ok_or_else(|| CalculationError::Configuration {
        table,
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{CalculationError, Category, FactorTable, FootprintInput, calculate};
    use crate::emissions::EmissionFactorTable;

    const EPSILON: f64 = 1e-9;

    fn reference_input() -> FootprintInput {
        FootprintInput {
            transport_mode: "car_petrol".to_string(),
            distance_km: 20.0,
            diet_type: "omnivore".to_string(),
            heating_type: "natural_gas".to_string(),
            heating_hours: 6.0,
            electricity_kwh: 12.0,
            grid_intensity: 0.233,
            bought_new_clothes: false,
            streaming_hours: 3.0,
        }
    }

    #[test]
    fn reference_day_matches_hand_computed_total() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let footprint = calculate(&table, &reference_input()).expect("footprint");

        assert!((footprint.breakdown.transport - 3.84).abs() < EPSILON);
        assert!((footprint.breakdown.diet - 5.0).abs() < EPSILON);
        assert!((footprint.breakdown.heating - 12.0).abs() < EPSILON);
        assert!((footprint.breakdown.electricity - 2.796).abs() < EPSILON);
        assert!((footprint.breakdown.consumption - 0.165).abs() < EPSILON);
        assert!((footprint.total_emissions - 23.801).abs() < EPSILON);
        assert_eq!(footprint.largest_category(), Category::Heating);
    }

    #[test]
    fn total_equals_sum_of_categories() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let inputs = [
            ("bus", 7.5, "vegan", "heat_pump", 2.0, 4.0, 0.056, true, 0.0),
            ("walk", 0.0, "pescatarian", "solar", 0.0, 0.0, 0.766, false, 12.0),
            ("car_diesel", 140.0, "omnivore_high_meat", "oil", 24.0, 50.0, 0.417, true, 5.5),
        ];

        for (mode, distance, diet, heating, hours, kwh, grid, clothes, streaming) in inputs {
            let input = FootprintInput {
                transport_mode: mode.to_string(),
                distance_km: distance,
                diet_type: diet.to_string(),
                heating_type: heating.to_string(),
                heating_hours: hours,
                electricity_kwh: kwh,
                grid_intensity: grid,
                bought_new_clothes: clothes,
                streaming_hours: streaming,
            };
            let footprint = calculate(&table, &input).expect("footprint");
            let sum = footprint.breakdown.entries().iter().map(|(_, value)| value).sum::<f64>();

            assert!((footprint.total_emissions - sum).abs() < EPSILON);
            assert!(footprint.breakdown.entries().iter().all(|(_, value)| *value >= 0.0));
        }
    }

    #[test]
    fn new_clothes_are_amortized_over_thirty_days() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let input = FootprintInput {
            bought_new_clothes: true,
            streaming_hours: 0.0,
            ..reference_input()
        };

        let footprint = calculate(&table, &input).expect("footprint");
        assert!((footprint.breakdown.consumption - 8.0 / 30.0).abs() < EPSILON);
    }

    #[test]
    fn unknown_diet_fails_instead_of_zero() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let input = FootprintInput {
            diet_type: "carnivore".to_string(),
            ..reference_input()
        };

        let error = calculate(&table, &input).expect_err("unknown diet");
        assert_eq!(
            error,
            CalculationError::Configuration {
                table: FactorTable::Diet,
                key: "carnivore".to_string(),
            }
        );
    }

    #[test]
    fn unknown_heating_fails_instead_of_zero() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let input = FootprintInput {
            heating_type: "fireplace".to_string(),
            ..reference_input()
        };

        assert!(matches!(
            calculate(&table, &input),
            Err(CalculationError::Configuration {
                table: FactorTable::Heating,
                ..
            })
        ));
    }

    #[test]
    fn negative_quantity_names_the_field() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let input = FootprintInput {
            heating_hours: -1.0,
            ..reference_input()
        };

        let error = calculate(&table, &input).expect_err("negative hours");
        assert!(matches!(
            error,
            CalculationError::Validation {
                field: "heating_hours",
                ..
            }
        ));
        assert!(error.to_string().contains("heating_hours"));
    }

    #[test]
    fn validation_runs_before_key_lookup() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let input = FootprintInput {
            transport_mode: "teleport".to_string(),
            distance_km: -5.0,
            ..reference_input()
        };

        assert!(matches!(
            calculate(&table, &input),
            Err(CalculationError::Validation {
                field: "distance_km",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_positive_grid_intensity() {
        let table = EmissionFactorTable::builtin().expect("builtin table");
        let input = FootprintInput {
            grid_intensity: 0.0,
            ..reference_input()
        };

        assert!(matches!(
            calculate(&table, &input),
            Err(CalculationError::Validation {
                field: "grid_intensity",
                ..
            })
        ));
    }
}
