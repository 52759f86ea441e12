//! Electricity carbon-intensity resolution.
//!
//! The resolver walks an ordered list of strategies. Each strategy either
//! resolves the region or hands over to the next one; the last resort is the
//! factor table's `default` entry, so resolution never fails.

use crate::climate::CarbonIntensitySource;
use crate::emissions::{DEFAULT_REGION, EmissionFactorTable, normalize_key};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Conversion from the live service's g CO2/kWh to kg CO2/kWh.
const GRAMS_PER_KILOGRAM: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntensitySource {
    Live { provider: String },
    Regional { region: String },
    Default,
    /// Supplied by the caller; no resolution was attempted.
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridIntensity {
    /// kg CO2 per kWh, always positive.
    pub kg_per_kwh: f64,
    pub source: IntensitySource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(GridIntensity),
    Next,
}

pub trait GridIntensityStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, region: &str) -> Resolution;
}

/// Live lookup, attempted only for regions the service covers.
pub struct LiveGridStrategy {
    source: Arc<dyn CarbonIntensitySource>,
    covered_regions: Vec<String>,
}

impl LiveGridStrategy {
    pub fn new(source: Arc<dyn CarbonIntensitySource>, covered_regions: &[String]) -> Self {
        Self {
            source,
            covered_regions: covered_regions
                .iter()
                .map(|region| normalize_key(region))
                .collect(),
        }
    }
}

impl GridIntensityStrategy for LiveGridStrategy {
    fn name(&self) -> &'static str {
        "live"
    }

    fn resolve(&self, region: &str) -> Resolution {
        let region = normalize_key(region);
        if !self.covered_regions.contains(&region) {
            return Resolution::Next;
        }

        match self.source.current_intensity() {
            Ok(reading) => match reading.actual.filter(|grams| grams.is_finite() && *grams > 0.0) {
                Some(grams) => Resolution::Resolved(GridIntensity {
                    kg_per_kwh: grams / GRAMS_PER_KILOGRAM,
                    source: IntensitySource::Live {
                        provider: reading.source,
                    },
                }),
                None => {
                    warn!(region = %region, "live grid reading had no usable actual value");
                    Resolution::Next
                }
            },
            Err(error) => {
                warn!(region = %region, error = %error, "live grid intensity unavailable");
                Resolution::Next
            }
        }
    }
}

pub struct RegionalTableStrategy {
    table: Arc<EmissionFactorTable>,
}

impl RegionalTableStrategy {
    pub fn new(table: Arc<EmissionFactorTable>) -> Self {
        Self { table }
    }
}

impl GridIntensityStrategy for RegionalTableStrategy {
    fn name(&self) -> &'static str {
        "regional_table"
    }

    fn resolve(&self, region: &str) -> Resolution {
        let key = normalize_key(region);
        if key == DEFAULT_REGION {
            return Resolution::Next;
        }

        self.table
            .regional_intensity(&key)
            .filter(|value| *value > 0.0)
            .map(|kg_per_kwh| {
                Resolution::Resolved(GridIntensity {
                    kg_per_kwh,
                    source: IntensitySource::Regional { region: key },
                })
            })
            .unwrap_or(Resolution::Next)
    }
}

pub struct GridIntensityResolver {
    strategies: Vec<Box<dyn GridIntensityStrategy>>,
    default_kg_per_kwh: f64,
}

impl GridIntensityResolver {
    /// `default_kg_per_kwh` must be positive; the factor table guarantees it
    /// for its `default` entry.
    pub fn new(strategies: Vec<Box<dyn GridIntensityStrategy>>, default_kg_per_kwh: f64) -> Self {
        Self {
            strategies,
            default_kg_per_kwh,
        }
    }

    /// Live lookup (when a source is given), then regional table, then default.
    pub fn standard(table: Arc<EmissionFactorTable>, live: Option<LiveGridStrategy>) -> Self {
        let default_kg_per_kwh = table.default_intensity();
        let mut strategies: Vec<Box<dyn GridIntensityStrategy>> = Vec::new();

        if let Some(live) = live {
            strategies.push(Box::new(live));
        }
        strategies.push(Box::new(RegionalTableStrategy::new(table)));

        Self::new(strategies, default_kg_per_kwh)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    pub fn resolve(&self, region: &str) -> GridIntensity {
        self.strategies
            .iter()
            .find_map(|strategy| match strategy.resolve(region) {
                Resolution::Resolved(intensity) => {
                    debug!(
                        strategy = strategy.name(),
                        region = %region,
                        kg_per_kwh = intensity.kg_per_kwh,
                        "grid intensity resolved"
                    );
                    Some(intensity)
                }
                Resolution::Next => None,
            })
            .unwrap_or_else(|| GridIntensity {
                kg_per_kwh: self.default_kg_per_kwh,
                source: IntensitySource::Default,
            })
    }
}
