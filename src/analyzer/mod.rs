pub mod report;

use crate::emissions::EmissionFactorTable;
use anyhow::{Result, bail};
use serde::Serialize;

const DAYS_PER_YEAR: f64 = 365.0;
const KG_PER_TONNE: f64 = 1000.0;
pub const MIN_REDUCTION_PERCENT: u8 = 10;
pub const MAX_REDUCTION_PERCENT: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkComparison {
    pub daily_kg: f64,
    pub annual_tonnes: f64,
    pub paris_target_kg: f64,
    pub vs_paris_kg: f64,
    pub vs_paris_percent: f64,
    pub world_average_kg: f64,
    pub vs_world_kg: f64,
    pub vs_world_percent: f64,
}

pub fn compare_to_benchmarks(daily_kg: f64, table: &EmissionFactorTable) -> BenchmarkComparison {
    let paris = table.paris_daily_target();
    let world = table.world_daily_average();

    BenchmarkComparison {
        daily_kg,
        annual_tonnes: daily_kg * DAYS_PER_YEAR / KG_PER_TONNE,
        paris_target_kg: paris,
        vs_paris_kg: daily_kg - paris,
        vs_paris_percent: percent_of(daily_kg - paris, paris),
        world_average_kg: world,
        vs_world_kg: daily_kg - world,
        vs_world_percent: percent_of(daily_kg - world, world),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    NeedsAttention,
}

impl TrendDirection {
    pub fn label(self) -> &'static str {
        match self {
            TrendDirection::Improving => "Improving",
            TrendDirection::NeedsAttention => "Needs attention",
        }
    }
}

pub fn trend_direction(current_total: f64, window_average: f64) -> TrendDirection {
    if current_total < window_average {
        TrendDirection::Improving
    } else {
        TrendDirection::NeedsAttention
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalPlan {
    pub current_average_kg: f64,
    pub reduction_percent: u8,
    pub target_kg: f64,
    pub paris_target_kg: f64,
    pub below_paris: bool,
    pub gap_to_paris_kg: f64,
}

impl GoalPlan {
    pub fn summary(&self) -> String {
        if self.below_paris {
            format!(
                "This target would put you below the Paris Agreement goal of {:.1} kg CO2/day.",
                self.paris_target_kg
            )
        } else {
            format!(
                "You would still be {:.1} kg above the Paris target, but making progress.",
                self.gap_to_paris_kg
            )
        }
    }
}

pub fn plan_goal(
    current_average_kg: f64,
    reduction_percent: u8,
    table: &EmissionFactorTable,
) -> Result<GoalPlan> {
    if !(MIN_REDUCTION_PERCENT..=MAX_REDUCTION_PERCENT).contains(&reduction_percent) {
        bail!(
            "reduction must be between {MIN_REDUCTION_PERCENT} and {MAX_REDUCTION_PERCENT} percent, got {reduction_percent}"
        );
    }

    let paris = table.paris_daily_target();
    let target_kg = current_average_kg * (1.0 - f64::from(reduction_percent) / 100.0);

    Ok(GoalPlan {
        current_average_kg,
        reduction_percent,
        target_kg,
        paris_target_kg: paris,
        below_paris: target_kg < paris,
        gap_to_paris_kg: (target_kg - paris).max(0.0),
    })
}

fn percent_of(delta: f64, base: f64) -> f64 {
    if base == 0.0 { 0.0 } else { delta / base * 100.0 }
}
