use crate::advisor::prompts::{self, AnalysisContext};
use crate::advisor::{AdvisoryGenerator, CommandAdvisor};
use crate::analyzer::plan_goal;
use crate::calculator::{self, CalculationError, Footprint, FootprintInput};
use crate::climate::grid::{GridIntensity, GridIntensityResolver, IntensitySource, LiveGridStrategy};
use crate::climate::{CarbonIntensitySource, ClimateDataClient};
use crate::config::Config;
use crate::db::{Database, FootprintRecord, FootprintRow, now_micros};
use crate::emissions::{EmissionFactorTable, normalize_key};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_REDUCTION_PERCENT: u8 = 20;

/// Day selections as entered by the user, before grid resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintSelection {
    pub transport_mode: String,
    pub distance_km: f64,
    pub diet_type: String,
    pub heating_type: String,
    pub heating_hours: f64,
    pub electricity_kwh: f64,
    #[serde(default)]
    pub bought_new_clothes: bool,
    #[serde(default)]
    pub streaming_hours: f64,
    #[serde(default)]
    pub region: Option<String>,
    /// kg CO2 per kWh. Skips grid resolution when set.
    #[serde(default)]
    pub grid_intensity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculation {
    pub region: String,
    pub grid: GridIntensity,
    pub input: FootprintInput,
    pub footprint: Footprint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    /// Full analysis with climate context and history.
    Analysis,
    /// Three quick tips aimed at the biggest contributor.
    Tips,
    /// Fresh selections against the latest saved footprint, or the latest
    /// saved footprint against the one before it.
    Compare,
    /// Three-month plan towards a reduction goal.
    Plan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdviceRequest {
    pub kind: AdviceKind,
    /// Falls back to the latest saved footprint when absent.
    #[serde(default)]
    pub selection: Option<FootprintSelection>,
    #[serde(default)]
    pub guidance: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reduction_percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdviceOutcome {
    pub kind: AdviceKind,
    pub text: String,
    /// `false` when there was not enough data to ask the generator.
    pub generated: bool,
    pub model: Option<String>,
    pub insight_id: Option<i64>,
}

enum AdvicePrompt {
    Ready {
        prompt: String,
        footprint_id: Option<i64>,
    },
    Insufficient(String),
}

/// Services shared by every command and request, built once at startup.
pub struct AppContext {
    config: Config,
    factors: Arc<EmissionFactorTable>,
    climate: Arc<ClimateDataClient>,
    resolver: GridIntensityResolver,
    advisor: Arc<dyn AdvisoryGenerator>,
}

impl AppContext {
    pub fn from_config(config: Config) -> Result<Self> {
        let factors = Arc::new(load_factor_table(&config)?);
        let climate = Arc::new(ClimateDataClient::from_config(&config));

        let live = climate.live_enabled().then(|| {
            let source: Arc<dyn CarbonIntensitySource> = climate.clone();
            LiveGridStrategy::new(source, &config.live_grid_regions)
        });
        let resolver = GridIntensityResolver::standard(Arc::clone(&factors), live);
        let advisor: Arc<dyn AdvisoryGenerator> = Arc::new(CommandAdvisor::from_config(&config));

        Ok(Self::new(config, factors, climate, resolver, advisor))
    }

    pub fn new(
        config: Config,
        factors: Arc<EmissionFactorTable>,
        climate: Arc<ClimateDataClient>,
        resolver: GridIntensityResolver,
        advisor: Arc<dyn AdvisoryGenerator>,
    ) -> Self {
        Self {
            config,
            factors,
            climate,
            resolver,
            advisor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    pub fn climate(&self) -> &ClimateDataClient {
        &self.climate
    }

    pub fn resolver(&self) -> &GridIntensityResolver {
        &self.resolver
    }

    pub fn advisor(&self) -> &dyn AdvisoryGenerator {
        self.advisor.as_ref()
    }

    pub fn open_database(&self) -> Result<Database> {
        Database::open(&self.config.db_path)
    }

    pub fn calculate(&self, selection: &FootprintSelection) -> Result<Calculation, CalculationError> {
        let region = normalize_key(selection.region.as_deref().unwrap_or(&self.config.region));

        let grid = match selection.grid_intensity {
            Some(kg_per_kwh) => GridIntensity {
                kg_per_kwh,
                source: IntensitySource::Override,
            },
            None => self.resolver.resolve(&region),
        };

        let input = FootprintInput {
            transport_mode: selection.transport_mode.clone(),
            distance_km: selection.distance_km,
            diet_type: selection.diet_type.clone(),
            heating_type: selection.heating_type.clone(),
            heating_hours: selection.heating_hours,
            electricity_kwh: selection.electricity_kwh,
            grid_intensity: grid.kg_per_kwh,
            bought_new_clothes: selection.bought_new_clothes,
            streaming_hours: selection.streaming_hours,
        };
        let footprint = calculator::calculate(&self.factors, &input)?;

        Ok(Calculation {
            region,
            grid,
            input,
            footprint,
        })
    }

    /// Appends the calculation to the footprint store. The CO2 reading is kept
    /// only when it was actually measured.
    pub fn save_footprint(
        &self,
        calculation: &Calculation,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<i64> {
        let co2 = self.climate.atmospheric_co2();
        let location = location.or(self.config.location.as_deref());

        let record = FootprintRecord {
            timestamp: now_micros(),
            total_emissions: calculation.footprint.total_emissions,
            breakdown: calculation.footprint.breakdown,
            transport_mode: calculation.input.transport_mode.clone(),
            distance_km: calculation.input.distance_km,
            diet_type: calculation.input.diet_type.clone(),
            heating_type: calculation.input.heating_type.clone(),
            heating_hours: calculation.input.heating_hours,
            electricity_kwh: calculation.input.electricity_kwh,
            grid_carbon_intensity: calculation.grid.kg_per_kwh,
            atmospheric_co2_ppm: co2.note.is_none().then_some(co2.ppm),
            notes: Some(record_notes(&calculation.region, location, notes)),
        };

        let id = self.open_database()?.append_footprint(&record)?;
        info!(
            id,
            total_kg = record.total_emissions,
            region = %calculation.region,
            "footprint saved"
        );
        Ok(id)
    }

    /// Builds the prompt, asks the generator once, and records the text as an
    /// insight. Nothing is recorded when generation fails.
    pub async fn advise(&self, request: &AdviceRequest) -> Result<AdviceOutcome> {
        let database = self.open_database()?;

        let (prompt, footprint_id) = match self.advice_prompt(&database, request)? {
            AdvicePrompt::Ready {
                prompt,
                footprint_id,
            } => (prompt, footprint_id),
            AdvicePrompt::Insufficient(message) => {
                return Ok(AdviceOutcome {
                    kind: request.kind,
                    text: message,
                    generated: false,
                    model: None,
                    insight_id: None,
                });
            }
        };

        let text = self.advisor.generate(&prompt).await.map_err(|error| {
            warn!(error = %error, kind = ?request.kind, "advisory generation failed");
            error
        })?;

        let model = self.advisor.model().to_string();
        let insight_id = database
            .append_insight(footprint_id, &text, &model)
            .context("Failed to store advisory insight")?;

        Ok(AdviceOutcome {
            kind: request.kind,
            text,
            generated: true,
            model: Some(model),
            insight_id: Some(insight_id),
        })
    }

    fn advice_prompt(&self, database: &Database, request: &AdviceRequest) -> Result<AdvicePrompt> {
        let guidance = request.guidance.as_deref().filter(|text| !text.trim().is_empty());

        match request.kind {
            AdviceKind::Analysis => {
                let Some((input, footprint, footprint_id)) = self.subject(database, request)? else {
                    return Ok(no_footprint());
                };
                let climate = self.climate.climate_context(self.factors.paris_daily_target());
                let statistics = database.statistics(self.config.stats_window_days)?;
                let location = request
                    .location
                    .as_deref()
                    .or(self.config.location.as_deref());

                let prompt = prompts::analysis_prompt(&AnalysisContext {
                    input: &input,
                    footprint: &footprint,
                    climate: &climate,
                    history: statistics.summary(),
                    location,
                    guidance,
                });
                Ok(AdvicePrompt::Ready {
                    prompt,
                    footprint_id,
                })
            }
            AdviceKind::Tips => {
                let Some((_, footprint, footprint_id)) = self.subject(database, request)? else {
                    return Ok(no_footprint());
                };
                Ok(AdvicePrompt::Ready {
                    prompt: prompts::quick_tips_prompt(&footprint, guidance),
                    footprint_id,
                })
            }
            AdviceKind::Compare => {
                let rows = database.recent_footprints(2)?;

                if let Some(selection) = &request.selection {
                    let Some(latest) = rows.first() else {
                        return Ok(AdvicePrompt::Insufficient(
                            "Save a footprint first to compare against it.".to_string(),
                        ));
                    };
                    let calculation = self.calculate(selection)?;
                    return Ok(AdvicePrompt::Ready {
                        prompt: prompts::comparison_prompt(
                            &calculation.footprint,
                            latest.record.total_emissions,
                        ),
                        footprint_id: Some(latest.id),
                    });
                }

                let [current, previous] = rows.as_slice() else {
                    return Ok(AdvicePrompt::Insufficient(
                        "Save at least two footprints to compare them.".to_string(),
                    ));
                };
                Ok(AdvicePrompt::Ready {
                    prompt: prompts::comparison_prompt(
                        &footprint_of(current),
                        previous.record.total_emissions,
                    ),
                    footprint_id: Some(current.id),
                })
            }
            AdviceKind::Plan => {
                let statistics = database.statistics(self.config.stats_window_days)?;
                let Some(summary) = statistics.summary() else {
                    return Ok(AdvicePrompt::Insufficient(format!(
                        "No footprints in the last {} days to plan from.",
                        self.config.stats_window_days
                    )));
                };
                let reduction = request
                    .reduction_percent
                    .unwrap_or(DEFAULT_REDUCTION_PERCENT);
                let plan = plan_goal(summary.avg_daily_emissions, reduction, &self.factors)?;
                let footprint_id = database.recent_footprints(1)?.first().map(|row| row.id);

                Ok(AdvicePrompt::Ready {
                    prompt: prompts::action_plan_prompt(&plan),
                    footprint_id,
                })
            }
        }
    }

    /// The footprint an analysis is about: fresh selections, or the latest
    /// saved record. Insights from fresh selections link to the latest record.
    fn subject(
        &self,
        database: &Database,
        request: &AdviceRequest,
    ) -> Result<Option<(FootprintInput, Footprint, Option<i64>)>> {
        let latest = database.recent_footprints(1)?.into_iter().next();

        if let Some(selection) = &request.selection {
            let calculation = self.calculate(selection)?;
            return Ok(Some((
                calculation.input,
                calculation.footprint,
                latest.map(|row| row.id),
            )));
        }

        Ok(latest.map(|row| (input_of(&row), footprint_of(&row), Some(row.id))))
    }
}

fn no_footprint() -> AdvicePrompt {
    AdvicePrompt::Insufficient(
        "No footprint to analyse. Calculate one with selections or save one first.".to_string(),
    )
}

fn footprint_of(row: &FootprintRow) -> Footprint {
    Footprint {
        breakdown: row.record.breakdown,
        total_emissions: row.record.total_emissions,
    }
}

// Clothes and streaming are not stored; only their emissions are.
fn input_of(row: &FootprintRow) -> FootprintInput {
    FootprintInput {
        transport_mode: row.record.transport_mode.clone(),
        distance_km: row.record.distance_km,
        diet_type: row.record.diet_type.clone(),
        heating_type: row.record.heating_type.clone(),
        heating_hours: row.record.heating_hours,
        electricity_kwh: row.record.electricity_kwh,
        grid_intensity: row.record.grid_carbon_intensity,
        bought_new_clothes: false,
        streaming_hours: 0.0,
    }
}

fn record_notes(region: &str, location: Option<&str>, notes: Option<&str>) -> String {
    [
        Some(format!("Region: {region}")),
        location.map(|location| format!("Location: {location}")),
        notes
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("; ")
}

fn load_factor_table(config: &Config) -> Result<EmissionFactorTable> {
    if config.factors_path.exists() {
        return EmissionFactorTable::load(&config.factors_path);
    }

    warn!(
        path = %config.factors_path.display(),
        "emission factor file missing. using built-in table"
    );
    EmissionFactorTable::builtin()
}

#[cfg(test)]
mod tests {
    use super::{AdviceKind, AdviceRequest, AppContext, FootprintSelection};
    use crate::advisor::{AdvisoryError, AdvisoryGenerator};
    use crate::climate::ClimateDataClient;
    use crate::climate::grid::{GridIntensityResolver, IntensitySource};
    use crate::config::Config;
    use crate::emissions::EmissionFactorTable;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct ScriptedAdvisor {
        reply: Option<String>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AdvisoryGenerator for ScriptedAdvisor {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().expect("prompts").push(prompt.to_string());
            self.reply.clone().ok_or(AdvisoryError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "model offline".to_string(),
            })
        }
    }

    fn context(reply: Option<&str>) -> (TempDir, AppContext, Arc<ScriptedAdvisor>) {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            db_path: dir.path().join("carbon.db"),
            factors_path: dir.path().join("missing.json"),
            live_data_enabled: false,
            ..Config::default()
        };
        let factors = Arc::new(EmissionFactorTable::builtin().expect("builtin table"));
        let climate = Arc::new(ClimateDataClient::from_config(&config));
        let resolver = GridIntensityResolver::standard(Arc::clone(&factors), None);
        let advisor = Arc::new(ScriptedAdvisor {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        });

        let context = AppContext::new(config, factors, climate, resolver, advisor.clone());
        (dir, context, advisor)
    }

    fn selection() -> FootprintSelection {
        FootprintSelection {
            transport_mode: "car_petrol".to_string(),
            distance_km: 20.0,
            diet_type: "omnivore".to_string(),
            heating_type: "natural_gas".to_string(),
            heating_hours: 6.0,
            electricity_kwh: 12.0,
            bought_new_clothes: false,
            streaming_hours: 3.0,
            region: None,
            grid_intensity: None,
        }
    }

    fn request(kind: AdviceKind) -> AdviceRequest {
        AdviceRequest {
            kind,
            selection: None,
            guidance: None,
            location: None,
            reduction_percent: None,
        }
    }

    #[test]
    fn calculation_resolves_region_from_table() {
        let (_dir, context, _) = context(None);
        let calculation = context
            .calculate(&FootprintSelection {
                region: Some("Norway".to_string()),
                ..selection()
            })
            .expect("calculation");

        assert_eq!(calculation.region, "norway");
        assert_eq!(calculation.grid.kg_per_kwh, 0.013);
        assert_eq!(
            calculation.grid.source,
            IntensitySource::Regional {
                region: "norway".to_string()
            }
        );
    }

    #[test]
    fn override_skips_resolution_and_is_validated() {
        let (_dir, context, _) = context(None);
        let calculation = context
            .calculate(&FootprintSelection {
                grid_intensity: Some(0.5),
                ..selection()
            })
            .expect("calculation");
        assert_eq!(calculation.grid.source, IntensitySource::Override);
        assert!((calculation.footprint.breakdown.electricity - 6.0).abs() < 1e-9);

        assert!(
            context
                .calculate(&FootprintSelection {
                    grid_intensity: Some(0.0),
                    ..selection()
                })
                .is_err()
        );
    }

    #[test]
    fn saved_footprint_carries_region_and_notes() {
        let (_dir, context, _) = context(None);
        let calculation = context.calculate(&selection()).expect("calculation");

        let id = context
            .save_footprint(&calculation, Some("Leeds"), Some("  commute day "))
            .expect("saved");

        let row = context
            .open_database()
            .expect("db")
            .footprint(id)
            .expect("query")
            .expect("row");
        assert_eq!(
            row.record.notes.as_deref(),
            Some("Region: default; Location: Leeds; commute day")
        );
        assert_eq!(row.record.atmospheric_co2_ppm, None);
        assert!((row.record.total_emissions - 23.801).abs() < 1e-9);
    }

    #[tokio::test]
    async fn successful_advice_is_stored_against_latest_footprint() {
        let (_dir, context, advisor) = context(Some("Swap two car trips for the train."));
        let calculation = context.calculate(&selection()).expect("calculation");
        let id = context
            .save_footprint(&calculation, None, None)
            .expect("saved");

        let outcome = context
            .advise(&request(AdviceKind::Tips))
            .await
            .expect("advice");

        assert!(outcome.generated);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
        let insights = context
            .open_database()
            .expect("db")
            .recent_insights(10)
            .expect("insights");
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].footprint_id, Some(id));
        assert_eq!(insights[0].model_used.as_deref(), Some("scripted"));
        assert_eq!(Some(insights[0].id), outcome.insight_id);
    }

    #[tokio::test]
    async fn failed_advice_stores_nothing() {
        let (_dir, context, advisor) = context(None);
        let advice = AdviceRequest {
            selection: Some(selection()),
            ..request(AdviceKind::Tips)
        };

        let error = context.advise(&advice).await.expect_err("generation fails");

        assert!(error.downcast_ref::<AdvisoryError>().is_some());
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
        let insights = context
            .open_database()
            .expect("db")
            .recent_insights(10)
            .expect("insights");
        assert!(insights.is_empty());
    }

    #[tokio::test]
    async fn comparison_needs_two_records() {
        let (_dir, context, advisor) = context(Some("unused"));
        let calculation = context.calculate(&selection()).expect("calculation");
        context
            .save_footprint(&calculation, None, None)
            .expect("saved");

        let outcome = context
            .advise(&request(AdviceKind::Compare))
            .await
            .expect("outcome");

        assert!(!outcome.generated);
        assert!(outcome.insight_id.is_none());
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn comparison_of_fresh_selections_uses_latest_saved_total() {
        let (_dir, context, advisor) = context(Some("Good progress on transport."));
        let saved = context.calculate(&selection()).expect("calculation");
        let latest_id = context
            .save_footprint(&saved, None, None)
            .expect("saved");
        let fresh = FootprintSelection {
            distance_km: 0.0,
            ..selection()
        };
        let fresh_total = context
            .calculate(&fresh)
            .expect("fresh")
            .footprint
            .total_emissions;

        let outcome = context
            .advise(&AdviceRequest {
                selection: Some(fresh),
                ..request(AdviceKind::Compare)
            })
            .await
            .expect("advice");

        assert!(outcome.generated);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
        let prompts = advisor.prompts.lock().expect("prompts");
        assert!(prompts[0].contains("- Previous: 23.80 kg CO2/day"));
        assert!(prompts[0].contains(&format!("- Current: {fresh_total:.2} kg CO2/day")));
        let insights = context
            .open_database()
            .expect("db")
            .recent_insights(1)
            .expect("insights");
        assert_eq!(insights[0].footprint_id, Some(latest_id));
    }

    #[tokio::test]
    async fn comparison_of_fresh_selections_needs_a_saved_footprint() {
        let (_dir, context, advisor) = context(Some("unused"));

        let outcome = context
            .advise(&AdviceRequest {
                selection: Some(selection()),
                ..request(AdviceKind::Compare)
            })
            .await
            .expect("outcome");

        assert!(!outcome.generated);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn plan_without_history_skips_generator() {
        let (_dir, context, advisor) = context(Some("unused"));

        let outcome = context
            .advise(&request(AdviceKind::Plan))
            .await
            .expect("outcome");

        assert!(!outcome.generated);
        assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
    }
}
