use crate::analyzer::{GoalPlan, trend_direction};
use crate::calculator::{Category, Footprint, FootprintInput};
use crate::climate::ClimateContext;
use crate::db::StatisticsSummary;
use chrono::Local;
use std::fmt::Write;

/// Everything the full analysis prompt draws from.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub input: &'a FootprintInput,
    pub footprint: &'a Footprint,
    pub climate: &'a ClimateContext,
    pub history: Option<&'a StatisticsSummary>,
    pub location: Option<&'a str>,
    pub guidance: Option<&'a str>,
}

pub fn analysis_prompt(context: &AnalysisContext<'_>) -> String {
    let climate = context.climate;
    let breakdown = &context.footprint.breakdown;
    let input = context.input;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are a climate scientist and sustainability advisor. Analyse this person's daily carbon footprint and give concrete, quantified recommendations.\n"
    );
    let _ = writeln!(prompt, "## Context");
    let _ = writeln!(prompt, "- Date: {}", Local::now().format("%B %d, %Y"));
    let _ = writeln!(
        prompt,
        "- Atmospheric CO2: {:.1} ppm ({})",
        climate.atmospheric_co2_ppm, climate.co2_source
    );
    let _ = writeln!(
        prompt,
        "- Paris Agreement: {:.1}°C limit, about {:.1} kg CO2/day per person",
        climate.paris_agreement_target_c, climate.daily_co2_budget_kg
    );
    let _ = writeln!(prompt, "- Headline: {}", climate.climate_headline);
    if let Some(reading) = &climate.grid_intensity {
        let actual = reading
            .actual
            .map(|value| format!("{value:.0}"))
            .unwrap_or_else(|| "N/A".to_string());
        let _ = writeln!(
            prompt,
            "- Grid carbon intensity: {actual} gCO2/kWh ({}, {})",
            reading.index.as_deref().unwrap_or("unknown"),
            reading.source
        );
    }
    if let Some(location) = context.location {
        let _ = writeln!(prompt, "- Location: {location}");
    }

    if let Some(guidance) = context.guidance {
        let _ = writeln!(prompt, "\n## User guidance\n{guidance}");
    }

    let _ = writeln!(prompt, "\n## Daily footprint");
    let _ = writeln!(
        prompt,
        "- Total: {:.2} kg CO2",
        context.footprint.total_emissions
    );
    let _ = writeln!(
        prompt,
        "- Transport: {:.2} kg CO2 ({}, {} km)",
        breakdown.transport, input.transport_mode, input.distance_km
    );
    let _ = writeln!(
        prompt,
        "- Diet: {:.2} kg CO2 ({})",
        breakdown.diet, input.diet_type
    );
    let _ = writeln!(
        prompt,
        "- Heating: {:.2} kg CO2 ({}, {} hours)",
        breakdown.heating, input.heating_type, input.heating_hours
    );
    let _ = writeln!(
        prompt,
        "- Electricity: {:.2} kg CO2 ({} kWh)",
        breakdown.electricity, input.electricity_kwh
    );
    let _ = writeln!(
        prompt,
        "- Consumption: {:.2} kg CO2",
        breakdown.consumption
    );

    if let Some(history) = context.history {
        let direction = trend_direction(
            context.footprint.total_emissions,
            history.avg_daily_emissions,
        );
        let _ = writeln!(prompt, "\n## History ({} days)", history.period_days);
        let _ = writeln!(
            prompt,
            "- Average: {:.2} kg CO2/day",
            history.avg_daily_emissions
        );
        let _ = writeln!(prompt, "- Best day: {:.2} kg CO2", history.min_emissions);
        let _ = writeln!(prompt, "- Worst day: {:.2} kg CO2", history.max_emissions);
        let _ = writeln!(prompt, "- Total: {:.1} kg CO2", history.total_emissions);
        let _ = writeln!(prompt, "- Trend: {}", direction.label());
    }

    let _ = writeln!(prompt, "\n## Task");
    let _ = writeln!(
        prompt,
        "1. Impact: compare the total with the {:.1} kg/day budget, name the biggest contributor, and project the annual impact.",
        climate.daily_co2_budget_kg
    );
    let _ = writeln!(
        prompt,
        "2. Three recommendations specific to the numbers above, each with an estimated CO2 saving."
    );
    if context.guidance.is_some() {
        let _ = writeln!(
            prompt,
            "   Tailor the recommendations to the user guidance."
        );
    }
    let _ = writeln!(prompt, "3. What the person is already doing well.");
    let _ = writeln!(
        prompt,
        "4. A short long-term perspective linking daily choices to global impact."
    );
    let _ = writeln!(
        prompt,
        "\nKeep the tone encouraging, scientific, and action-oriented."
    );

    prompt
}

pub fn quick_tips_prompt(footprint: &Footprint, guidance: Option<&str>) -> String {
    let biggest: Category = footprint.largest_category();
    let mut prompt = format!(
        "Give 3 quick, actionable tips to reduce a {:.1} kg CO2/day footprint. The biggest contributor is {}. Be specific and brief.",
        footprint.total_emissions, biggest
    );

    if let Some(guidance) = guidance {
        let _ = write!(prompt, "\n\nUser context and goals: {guidance}");
    }

    prompt
}

pub fn comparison_prompt(current: &Footprint, previous_total: f64) -> String {
    let change = current.total_emissions - previous_total;
    let change_percent = if previous_total > 0.0 {
        change / previous_total * 100.0
    } else {
        0.0
    };

    let categories = current
        .breakdown
        .entries()
        .iter()
        .map(|(category, value)| format!("- {category}: {value:.2} kg CO2"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a sustainability coach reviewing a change in daily carbon footprint.\n\n## Change\n- Previous: {previous_total:.2} kg CO2/day\n- Current: {:.2} kg CO2/day\n- Change: {change:+.2} kg CO2/day ({change_percent:+.1}%)\n\n## Current breakdown\n{categories}\n\n## Task\n1. Explain which categories most likely drove the change.\n2. If it improved, acknowledge the progress; if it got worse, suggest corrections without judgment.\n3. Give 2 specific next steps.\n\nKeep it to 4-5 sentences.\n",
        current.total_emissions
    )
}

pub fn action_plan_prompt(plan: &GoalPlan) -> String {
    let reduction_needed = plan.current_average_kg - plan.paris_target_kg;
    let reduction_percent = if plan.current_average_kg > 0.0 {
        reduction_needed / plan.current_average_kg * 100.0
    } else {
        0.0
    };

    format!(
        "You are a climate action strategist helping someone set carbon reduction goals.\n\n## Situation\n- Current average: {:.2} kg CO2/day\n- Personal target: {:.2} kg CO2/day ({}% reduction)\n- Paris Agreement budget: {:.1} kg CO2/day\n- Reduction needed to reach the budget: {reduction_needed:.2} kg CO2/day ({reduction_percent:.1}%)\n\n## Task\nDesign a realistic 3-month plan. For each month give an emissions target, 1-2 concrete actions, and the expected impact. Month 1 should aim for a 10-20% reduction; month 3 should land close to the personal target.\n",
        plan.current_average_kg, plan.target_kg, plan.reduction_percent, plan.paris_target_kg
    )
}

#[cfg(test)]
mod tests {
    use super::{AnalysisContext, analysis_prompt, comparison_prompt, quick_tips_prompt};
    use crate::calculator::{CategoryBreakdown, Footprint, FootprintInput};
    use crate::climate::ClimateContext;
    use crate::db::StatisticsSummary;

    fn input() -> FootprintInput {
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

    fn footprint() -> Footprint {
        let breakdown = CategoryBreakdown {
            transport: 3.84,
            diet: 5.0,
            heating: 12.0,
            electricity: 2.796,
            consumption: 0.165,
        };
        Footprint {
            total_emissions: breakdown.total(),
            breakdown,
        }
    }

    fn climate() -> ClimateContext {
        ClimateContext {
            atmospheric_co2_ppm: 425.0,
            co2_source: "Estimated (2025)".to_string(),
            co2_note: Some("Live data unavailable".to_string()),
            grid_intensity: None,
            climate_headline: "Arctic ice continues to decline".to_string(),
            timestamp: "2026-10-18T12:00:00+00:00".to_string(),
            paris_agreement_target_c: 1.5,
            daily_co2_budget_kg: 6.0,
        }
    }

    #[test]
    fn analysis_prompt_includes_optional_sections_only_when_given() {
        let input = input();
        let footprint = footprint();
        let climate = climate();
        let bare = analysis_prompt(&AnalysisContext {
            input: &input,
            footprint: &footprint,
            climate: &climate,
            history: None,
            location: None,
            guidance: None,
        });

        assert!(bare.contains("Total: 23.80 kg CO2"));
        assert!(!bare.contains("## History"));
        assert!(!bare.contains("## User guidance"));

        let history = StatisticsSummary {
            period_days: 30,
            record_count: 4,
            avg_daily_emissions: 30.0,
            min_emissions: 20.0,
            max_emissions: 40.0,
            total_emissions: 120.0,
            avg_transport: 8.0,
            avg_diet: 5.0,
            avg_heating: 12.0,
            avg_electricity: 5.0,
        };
        let full = analysis_prompt(&AnalysisContext {
            input: &input,
            footprint: &footprint,
            climate: &climate,
            history: Some(&history),
            location: Some("Leeds, UK"),
            guidance: Some("Focus on heating"),
        });

        assert!(full.contains("## History (30 days)"));
        assert!(full.contains("Trend: Improving"));
        assert!(full.contains("Location: Leeds, UK"));
        assert!(full.contains("Focus on heating"));
    }

    #[test]
    fn quick_tips_name_biggest_contributor() {
        let prompt = quick_tips_prompt(&footprint(), None);
        assert!(prompt.contains("biggest contributor is Heating"));
    }

    #[test]
    fn comparison_reports_signed_change() {
        let prompt = comparison_prompt(&footprint(), 30.0);
        assert!(prompt.contains("Change: -6.20 kg CO2/day"));
    }
}
