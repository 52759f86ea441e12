use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_FACTORS_JSON: &str = include_str!("../../assets/emission_factors.json");
pub const DEFAULT_REGION: &str = "default";
pub const PARIS_TARGET_KEY: &str = "paris_agreement_daily";
pub const WORLD_AVERAGE_KEY: &str = "world_average_daily";

const FALLBACK_PARIS_DAILY_KG: f64 = 6.0;
const FALLBACK_WORLD_DAILY_KG: f64 = 12.0;

/// Per-unit factors for the optional consumption category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionFactors {
    /// kg CO2 per month when new clothes were bought.
    pub new_clothes_monthly: f64,
    pub secondhand_clothes: f64,
    pub electronics_yearly: f64,
    /// kg CO2 per hour of streaming / screen time.
    pub streaming_hours_daily: f64,
}

/// Static emission reference data, loaded once at startup and shared read-only.
///
/// Units: transport in kg/km, diet in kg/day, heating in kg/hour, electricity
/// and grid intensity in kg/kWh, targets in kg/day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactorTable {
    pub transport: BTreeMap<String, f64>,
    pub diet: BTreeMap<String, f64>,
    pub heating: BTreeMap<String, f64>,
    pub electricity: BTreeMap<String, f64>,
    pub consumption: ConsumptionFactors,
    pub targets: BTreeMap<String, f64>,
    pub grid_intensity: BTreeMap<String, f64>,
}

impl EmissionFactorTable {
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_FACTORS_JSON).context("Built-in emission factor table is invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read emission factor file: {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to load emission factor file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let parsed: Self =
            serde_json::from_str(content).context("Failed to parse emission factor JSON")?;
        let table = parsed.normalized();
        table.validate()?;

        Ok(table)
    }

    pub fn transport_factor(&self, mode: &str) -> Option<f64> {
        self.transport.get(&normalize_key(mode)).copied()
    }

    pub fn diet_factor(&self, diet: &str) -> Option<f64> {
        self.diet.get(&normalize_key(diet)).copied()
    }

    pub fn heating_factor(&self, heating: &str) -> Option<f64> {
        self.heating.get(&normalize_key(heating)).copied()
    }

    pub fn regional_intensity(&self, region: &str) -> Option<f64> {
        self.grid_intensity.get(&normalize_key(region)).copied()
    }

    /// The mandatory `default` grid entry; presence is checked at load time.
    pub fn default_intensity(&self) -> f64 {
        self.grid_intensity
            .get(DEFAULT_REGION)
            .copied()
            .unwrap_or_default()
    }

    pub fn target(&self, name: &str) -> Option<f64> {
        self.targets.get(&normalize_key(name)).copied()
    }

    pub fn paris_daily_target(&self) -> f64 {
        self.target(PARIS_TARGET_KEY)
            .unwrap_or(FALLBACK_PARIS_DAILY_KG)
    }

    pub fn world_daily_average(&self) -> f64 {
        self.target(WORLD_AVERAGE_KEY)
            .unwrap_or(FALLBACK_WORLD_DAILY_KG)
    }

    pub fn regions(&self) -> Vec<&str> {
        self.grid_intensity.keys().map(String::as_str).collect()
    }

    fn validate(&self) -> Result<()> {
        let Some(default) = self.grid_intensity.get(DEFAULT_REGION).copied() else {
            bail!("grid_intensity must contain a `{DEFAULT_REGION}` entry");
        };
        if !(default.is_finite() && default > 0.0) {
            bail!("grid_intensity.{DEFAULT_REGION} must be a positive number, got {default}");
        }

        let consumption = [
            ("new_clothes_monthly", self.consumption.new_clothes_monthly),
            ("secondhand_clothes", self.consumption.secondhand_clothes),
            ("electronics_yearly", self.consumption.electronics_yearly),
            ("streaming_hours_daily", self.consumption.streaming_hours_daily),
        ];

        let tables = [
            ("transport", &self.transport),
            ("diet", &self.diet),
            ("heating", &self.heating),
            ("electricity", &self.electricity),
            ("targets", &self.targets),
            ("grid_intensity", &self.grid_intensity),
        ];

        tables
            .iter()
            .flat_map(|(section, entries)| {
                entries
                    .iter()
                    .map(move |(key, value)| (*section, key.as_str(), *value))
            })
            .chain(
                consumption
                    .iter()
                    .map(|(key, value)| ("consumption", *key, *value)),
            )
            .try_for_each(|(section, key, value)| {
                if value.is_finite() && value >= 0.0 {
                    Ok(())
                } else {
                    bail!("{section}.{key} must be a non-negative number, got {value}")
                }
            })
    }

    fn normalized(self) -> Self {
        let normalize = |entries: BTreeMap<String, f64>| {
            entries
                .into_iter()
                .map(|(key, value)| (normalize_key(&key), value))
                .collect::<BTreeMap<_, _>>()
        };

        Self {
            transport: normalize(self.transport),
            diet: normalize(self.diet),
            heating: normalize(self.heating),
            electricity: normalize(self.electricity),
            consumption: self.consumption,
            targets: normalize(self.targets),
            grid_intensity: normalize(self.grid_intensity),
        }
    }
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}
