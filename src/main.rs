mod advisor;
mod analyzer;
mod api;
mod calculator;
mod cli;
mod climate;
mod config;
mod context;
mod db;
mod emissions;

use crate::analyzer::report::{build_window_report, save_report_files};
use crate::analyzer::{compare_to_benchmarks, plan_goal, trend_direction};
use crate::calculator::CategoryBreakdown;
use crate::cli::interactive::prompt_selection;
use crate::cli::{Cli, Commands, ConfigCommands, SelectionArgs};
use crate::climate::grid::IntensitySource;
use crate::config::Config;
use crate::context::{AdviceKind, AdviceRequest, AppContext, Calculation, FootprintSelection};
use crate::db::{Database, GoalInput, MAX_WINDOW_DAYS, WindowStatistics};
use crate::emissions::EmissionFactorTable;
use anyhow::{Context, Result, bail};
use chrono::{Duration, Local, Utc};
use clap::Parser;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const GOAL_HORIZON_DAYS: i64 = 90;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { command } => handle_config_command(command),
        Commands::Doctor => handle_doctor(),
        Commands::Calculate {
            selection,
            interactive,
            save,
            location,
            notes,
            json,
        } => {
            let context = load_context()?;
            handle_calculate(
                &context,
                selection,
                interactive,
                save,
                location.as_deref(),
                notes.as_deref(),
                json,
            )
        }
        Commands::History { limit, json } => handle_history(&load_context()?, limit, json),
        Commands::Stats { days, json } => handle_stats(&load_context()?, days, json),
        Commands::Trend { days, json } => handle_trend(&load_context()?, days, json),
        Commands::Breakdown { days, json } => handle_breakdown(&load_context()?, days, json),
        Commands::Advise {
            kind,
            latest,
            selection,
            guidance,
            location,
            reduction,
        } => {
            let context = load_context()?;
            let request = AdviceRequest {
                kind,
                selection: (!latest).then(|| FootprintSelection::from(selection)),
                guidance,
                location,
                reduction_percent: reduction,
            };
            handle_advise(&context, &request).await
        }
        Commands::Insights { limit } => handle_insights(&load_context()?, limit),
        Commands::Goal {
            reduction,
            days,
            save,
        } => handle_goal(&load_context()?, reduction, days, save),
        Commands::Climate { json } => handle_climate(&load_context()?, json),
        Commands::Factors { json } => handle_factors(&load_context()?, json),
        Commands::Report { days } => handle_report(&load_context()?, days),
        Commands::Clear { yes } => handle_clear(&load_context()?, yes),
        Commands::Serve => run_server(load_context()?).await,
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_calculate(
    context: &AppContext,
    selection: SelectionArgs,
    interactive: bool,
    save: bool,
    location: Option<&str>,
    notes: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut selection = FootprintSelection::from(selection);
    if interactive {
        selection = prompt_selection(context.factors(), selection)?;
    }

    let calculation = context.calculate(&selection)?;
    let saved_id = if save {
        Some(context.save_footprint(&calculation, location, notes)?)
    } else {
        None
    };

    if json {
        let payload = json!({ "id": saved_id, "calculation": calculation });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    print_calculation(context.factors(), &calculation);
    if let Some(id) = saved_id {
        println!("\nSaved footprint #{id}");
    }

    Ok(())
}

fn handle_history(context: &AppContext, limit: usize, json: bool) -> Result<()> {
    let rows = context.open_database()?.recent_footprints(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No footprints saved yet. Run `CarbonWise calculate --save`.");
        return Ok(());
    }

    for row in rows {
        let record = &row.record;
        println!(
            "#{:<4} {}  {:>7.2} kg  {} {} km, {}, {} {} h{}",
            row.id,
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.total_emissions,
            record.transport_mode,
            record.distance_km,
            record.diet_type,
            record.heating_type,
            record.heating_hours,
            record
                .notes
                .as_deref()
                .map(|notes| format!("  [{notes}]"))
                .unwrap_or_default()
        );
    }

    Ok(())
}

fn handle_stats(context: &AppContext, days: Option<u32>, json: bool) -> Result<()> {
    let days = window_days(context, days)?;
    let statistics = context.open_database()?.statistics(days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statistics)?);
        return Ok(());
    }

    match statistics {
        WindowStatistics::Empty { period_days } => {
            println!("No footprints in the last {period_days} days.");
        }
        WindowStatistics::Populated(summary) => {
            let benchmarks = compare_to_benchmarks(summary.avg_daily_emissions, context.factors());
            println!("Statistics (last {} days)", summary.period_days);
            println!("- records: {}", summary.record_count);
            println!("- average: {:.2} kg CO2/day", summary.avg_daily_emissions);
            println!("- best day: {:.2} kg CO2", summary.min_emissions);
            println!("- worst day: {:.2} kg CO2", summary.max_emissions);
            println!("- total: {:.1} kg CO2", summary.total_emissions);
            println!(
                "- averages: transport {:.2}, diet {:.2}, heating {:.2}, electricity {:.2}",
                summary.avg_transport,
                summary.avg_diet,
                summary.avg_heating,
                summary.avg_electricity
            );
            println!(
                "- annual estimate: {:.1} t CO2 ({:+.0}% vs Paris target)",
                benchmarks.annual_tonnes, benchmarks.vs_paris_percent
            );
        }
    }

    Ok(())
}

fn handle_trend(context: &AppContext, days: Option<u32>, json: bool) -> Result<()> {
    let days = window_days(context, days)?;
    let points = context.open_database()?.trend(days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    let Some(latest) = points.last() else {
        println!("No footprints in the last {days} days.");
        return Ok(());
    };

    let paris = context.factors().paris_daily_target();
    for point in &points {
        println!(
            "{}  {:>7.2} kg {}",
            point.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            point.total_emissions,
            if point.total_emissions <= paris { "✓" } else { "" }
        );
    }

    let average =
        points.iter().map(|point| point.total_emissions).sum::<f64>() / points.len() as f64;
    println!(
        "\nLatest vs {days}-day average ({average:.2} kg): {}",
        trend_direction(latest.total_emissions, average).label()
    );

    Ok(())
}

fn handle_breakdown(context: &AppContext, days: Option<u32>, json: bool) -> Result<()> {
    let days = window_days(context, days)?;
    let averages = context.open_database()?.category_breakdown(days)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "period_days": days, "averages": averages }))?
        );
        return Ok(());
    }

    match averages {
        Some(averages) => {
            println!("Average by category (last {days} days)");
            print_breakdown(&averages);
        }
        None => println!("No footprints in the last {days} days."),
    }

    Ok(())
}

async fn handle_advise(context: &AppContext, request: &AdviceRequest) -> Result<()> {
    if request.kind == AdviceKind::Analysis {
        println!(
            "Asking {} for a full analysis. This can take a few minutes.",
            context.advisor().model()
        );
    }

    let outcome = context.advise(request).await?;
    println!("{}", outcome.text);

    if let (Some(id), Some(model)) = (outcome.insight_id, outcome.model.as_deref()) {
        println!("\nSaved insight #{id} ({model})");
    }

    Ok(())
}

fn handle_insights(context: &AppContext, limit: usize) -> Result<()> {
    let insights = context.open_database()?.recent_insights(limit)?;

    if insights.is_empty() {
        println!("No insights yet. Run `CarbonWise advise`.");
        return Ok(());
    }

    for insight in insights {
        println!(
            "── #{} {} ({}){}",
            insight.id,
            insight.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            insight.model_used.as_deref().unwrap_or("unknown model"),
            insight
                .footprint_id
                .map(|id| format!(" for footprint #{id}"))
                .unwrap_or_default()
        );
        println!("{}\n", insight.insight_text);
    }

    Ok(())
}

fn handle_goal(context: &AppContext, reduction: u8, days: Option<u32>, save: bool) -> Result<()> {
    let days = window_days(context, days)?;
    let database = context.open_database()?;
    let statistics = database.statistics(days)?;

    let Some(summary) = statistics.summary() else {
        bail!("No footprints in the last {days} days. Save a few before planning a goal.");
    };

    let plan = plan_goal(summary.avg_daily_emissions, reduction, context.factors())?;
    println!("Current average: {:.2} kg CO2/day", plan.current_average_kg);
    println!(
        "Target ({}% reduction): {:.2} kg CO2/day",
        plan.reduction_percent, plan.target_kg
    );
    println!("{}", plan.summary());

    if let Some(goal) = database.latest_goal()? {
        println!(
            "Previous goal: {:.2} {} from {}",
            goal.target_value, goal.goal_type, goal.start_date
        );
    }

    if save {
        let start_date = Local::now().date_naive();
        let id = database.append_goal(&GoalInput {
            goal_type: "daily_kg_co2".to_string(),
            target_value: plan.target_kg,
            start_date,
            end_date: Some(start_date + Duration::days(GOAL_HORIZON_DAYS)),
        })?;
        println!("Saved goal #{id}");
    }

    Ok(())
}

fn handle_climate(context: &AppContext, json: bool) -> Result<()> {
    let climate = context
        .climate()
        .climate_context(context.factors().paris_daily_target());

    if json {
        println!("{}", serde_json::to_string_pretty(&climate)?);
        return Ok(());
    }

    println!("Climate context");
    println!(
        "- atmospheric CO2: {:.1} ppm ({}){}",
        climate.atmospheric_co2_ppm,
        climate.co2_source,
        climate
            .co2_note
            .as_deref()
            .map(|note| format!(" - {note}"))
            .unwrap_or_default()
    );
    match &climate.grid_intensity {
        Some(reading) => println!(
            "- grid intensity: {} gCO2/kWh ({}, {})",
            reading
                .actual
                .or(reading.forecast)
                .map(|value| format!("{value:.0}"))
                .unwrap_or_else(|| "N/A".to_string()),
            reading.index.as_deref().unwrap_or("unknown"),
            reading.source
        ),
        None => println!("- grid intensity: unavailable"),
    }
    println!(
        "- Paris target: {:.1}°C, {:.1} kg CO2/day per person",
        climate.paris_agreement_target_c, climate.daily_co2_budget_kg
    );
    println!("- {}", climate.climate_headline);

    Ok(())
}

fn handle_factors(context: &AppContext, json: bool) -> Result<()> {
    let factors = context.factors();

    if json {
        println!("{}", serde_json::to_string_pretty(factors)?);
        return Ok(());
    }

    print_factor_group("Transport (kg CO2/km)", &factors.transport);
    print_factor_group("Diet (kg CO2/day)", &factors.diet);
    print_factor_group("Heating (kg CO2/hour)", &factors.heating);
    print_factor_group("Grid intensity (kg CO2/kWh)", &factors.grid_intensity);
    print_factor_group("Targets (kg CO2/day)", &factors.targets);

    Ok(())
}

fn handle_report(context: &AppContext, days: Option<u32>) -> Result<()> {
    let days = window_days(context, days)?;
    let database = context.open_database()?;

    let report = build_window_report(
        Utc::now(),
        database.statistics(days)?,
        database.category_breakdown(days)?,
        database.trend(days)?,
        context.factors(),
    );
    let saved = save_report_files(&report, &context.config().report_dir)?;

    info!(days, records = report.statistics.record_count(), "report generated");
    println!("Report generated (last {days} days)");
    println!("- Markdown: {}", saved.markdown_path.display());
    println!("- JSON: {}", saved.json_path.display());

    Ok(())
}

fn handle_clear(context: &AppContext, yes: bool) -> Result<()> {
    let confirmed = yes
        || Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete all footprints, insights and goals?")
            .default(false)
            .interact()
            .context("Failed to read confirmation input")?;

    if !confirmed {
        println!("Nothing deleted.");
        return Ok(());
    }

    context.open_database()?.clear_all()?;
    println!("All footprint data cleared.");
    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(_) => println!("[OK] SQLite reachable: {}", config.db_path.display()),
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    match EmissionFactorTable::load(&config.factors_path) {
        Ok(table) => println!(
            "[OK] emission factors valid: {} regions ({})",
            table.regions().len(),
            config.factors_path.display()
        ),
        Err(error) => {
            println!("[WARN] emission factors invalid: {error:#}");
            issues.push("factor table invalid".to_string());
        }
    }

    if config.report_dir.exists() {
        println!("[OK] report dir exists: {}", config.report_dir.display());
    } else {
        println!("[WARN] report dir missing: {}", config.report_dir.display());
        issues.push("report dir missing".to_string());
    }

    let bad_urls = [
        ("grid_intensity_url", &config.grid_intensity_url),
        ("co2_url", &config.co2_url),
        ("news_url", &config.news_url),
    ]
    .into_iter()
    .filter(|(_, value)| Url::parse(value).is_err())
    .map(|(key, _)| key)
    .collect::<Vec<_>>();

    if !config.live_data_enabled {
        println!("[OK] live climate data disabled (fallback values in use)");
    } else if bad_urls.is_empty() {
        println!("[OK] climate data URLs valid");
    } else {
        println!("[WARN] invalid climate data URLs: {}", bad_urls.join(", "));
        issues.push("invalid climate url".to_string());
    }

    if program_on_path(&config.advisory_program) {
        println!(
            "[OK] advisory program found: {} (model {})",
            config.advisory_program, config.advisory_model
        );
    } else {
        println!(
            "[WARN] advisory program not found on PATH: {}",
            config.advisory_program
        );
        issues.push("advisory program missing".to_string());
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn run_server(context: AppContext) -> Result<()> {
    let _ = context.open_database()?;
    let shared = Arc::new(context);

    info!("CarbonWise service started");

    tokio::select! {
        api_result = api::run_server(shared) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn print_calculation(factors: &EmissionFactorTable, calculation: &Calculation) {
    let footprint = &calculation.footprint;
    let benchmarks = compare_to_benchmarks(footprint.total_emissions, factors);

    println!("Daily footprint: {:.2} kg CO2", footprint.total_emissions);
    print_breakdown(&footprint.breakdown);
    println!(
        "\nGrid intensity: {:.3} kg CO2/kWh ({})",
        calculation.grid.kg_per_kwh,
        describe_source(&calculation.grid.source)
    );
    println!("Biggest contributor: {}", footprint.largest_category());
    println!(
        "Annual estimate: {:.1} t CO2 | vs Paris target: {:+.1} kg ({:+.0}%) | vs world average: {:+.1} kg",
        benchmarks.annual_tonnes,
        benchmarks.vs_paris_kg,
        benchmarks.vs_paris_percent,
        benchmarks.vs_world_kg
    );
}

fn print_breakdown(breakdown: &CategoryBreakdown) {
    let total = breakdown.total();
    for (category, value) in breakdown.entries() {
        let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
        println!("- {:<12} {:>7.2} kg ({share:>3.0}%)", category.label(), value);
    }
}

fn print_factor_group(title: &str, factors: &BTreeMap<String, f64>) {
    println!("{title}");
    for (key, value) in factors {
        println!("- {key:<20} {value}");
    }
    println!();
}

fn describe_source(source: &IntensitySource) -> String {
    match source {
        IntensitySource::Live { provider } => format!("live, {provider}"),
        IntensitySource::Regional { region } => format!("regional table, {region}"),
        IntensitySource::Default => "table default".to_string(),
        IntensitySource::Override => "user supplied".to_string(),
    }
}

fn program_on_path(program: &str) -> bool {
    let candidate = std::path::Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

fn window_days(context: &AppContext, days: Option<u32>) -> Result<u32> {
    let days = days.unwrap_or(context.config().stats_window_days);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        bail!("days must be between 1 and {MAX_WINDOW_DAYS}");
    }
    Ok(days)
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_context() -> Result<AppContext> {
    let config = load_or_default_config()?;
    config.ensure_bootstrap_files()?;
    AppContext::from_config(config)
}
