use crate::context::FootprintSelection;
use crate::emissions::EmissionFactorTable;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::collections::BTreeMap;

/// Walks the user through each selection, starting from `defaults`.
pub fn prompt_selection(
    table: &EmissionFactorTable,
    defaults: FootprintSelection,
) -> Result<FootprintSelection> {
    let theme = ColorfulTheme::default();

    println!("\n[1/5] Transport");
    let transport_mode = select_key(
        &theme,
        "  Main mode of transport",
        &table.transport,
        &defaults.transport_mode,
    )?;
    let distance_km = number(&theme, "  Distance travelled today (km)", defaults.distance_km)?;

    println!("\n[2/5] Diet");
    let diet_type = select_key(&theme, "  Diet today", &table.diet, &defaults.diet_type)?;

    println!("\n[3/5] Heating");
    let heating_type = select_key(
        &theme,
        "  Heating system",
        &table.heating,
        &defaults.heating_type,
    )?;
    let heating_hours = number(&theme, "  Hours of heating", defaults.heating_hours)?;

    println!("\n[4/5] Electricity");
    let electricity_kwh = number(&theme, "  Electricity used (kWh)", defaults.electricity_kwh)?;
    let regions = table.regions();
    let default_region = defaults.region.as_deref().unwrap_or("default");
    let region_index = Select::with_theme(&theme)
        .with_prompt("  Grid region")
        .default(
            regions
                .iter()
                .position(|region| *region == default_region)
                .unwrap_or(0),
        )
        .items(&regions)
        .interact()
        .context("Failed to select grid region")?;
    let region = regions.get(region_index).map(|region| region.to_string());

    println!("\n[5/5] Consumption");
    let bought_new_clothes = Confirm::with_theme(&theme)
        .with_prompt("  Bought new clothes today?")
        .default(defaults.bought_new_clothes)
        .interact()
        .context("Failed to read clothes input")?;
    let streaming_hours = number(
        &theme,
        "  Hours of video streaming",
        defaults.streaming_hours,
    )?;

    Ok(FootprintSelection {
        transport_mode,
        distance_km,
        diet_type,
        heating_type,
        heating_hours,
        electricity_kwh,
        bought_new_clothes,
        streaming_hours,
        region,
        grid_intensity: defaults.grid_intensity,
    })
}

fn select_key(
    theme: &ColorfulTheme,
    prompt: &str,
    factors: &BTreeMap<String, f64>,
    default_key: &str,
) -> Result<String> {
    let keys = factors.keys().collect::<Vec<_>>();
    let default_index = keys
        .iter()
        .position(|key| key.as_str() == default_key)
        .unwrap_or(0);

    let index = Select::with_theme(theme)
        .with_prompt(prompt)
        .default(default_index)
        .items(&keys)
        .interact()
        .with_context(|| format!("Failed to read selection: {}", prompt.trim()))?;

    keys.get(index)
        .map(|key| key.to_string())
        .with_context(|| format!("Selection out of range: {index}"))
}

fn number(theme: &ColorfulTheme, prompt: &str, default: f64) -> Result<f64> {
    Input::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .validate_with(|value: &f64| -> std::result::Result<(), &str> {
            if value.is_finite() && *value >= 0.0 {
                Ok(())
            } else {
                Err("Enter a number of zero or more")
            }
        })
        .interact_text()
        .with_context(|| format!("Failed to read number: {}", prompt.trim()))
}
