pub mod queries;

use crate::calculator::CategoryBreakdown;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest statistics window accepted from user input.
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// One computed footprint as written to the store. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintRecord {
    pub timestamp: DateTime<Utc>,
    pub total_emissions: f64,
    pub breakdown: CategoryBreakdown,
    pub transport_mode: String,
    pub distance_km: f64,
    pub diet_type: String,
    pub heating_type: String,
    pub heating_hours: f64,
    pub electricity_kwh: f64,
    pub grid_carbon_intensity: f64,
    pub atmospheric_co2_ppm: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintRow {
    pub id: i64,
    #[serde(flatten)]
    pub record: FootprintRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub total_emissions: f64,
    pub breakdown: CategoryBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub period_days: u32,
    pub record_count: u64,
    pub avg_daily_emissions: f64,
    pub min_emissions: f64,
    pub max_emissions: f64,
    pub total_emissions: f64,
    pub avg_transport: f64,
    pub avg_diet: f64,
    pub avg_heating: f64,
    pub avg_electricity: f64,
}

/// Window aggregates. An empty window is its own variant so callers never
/// read averages of nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WindowStatistics {
    Empty { period_days: u32 },
    Populated(StatisticsSummary),
}

impl WindowStatistics {
    pub fn record_count(&self) -> u64 {
        match self {
            WindowStatistics::Empty { .. } => 0,
            WindowStatistics::Populated(summary) => summary.record_count,
        }
    }

    pub fn summary(&self) -> Option<&StatisticsSummary> {
        match self {
            WindowStatistics::Empty { .. } => None,
            WindowStatistics::Populated(summary) => Some(summary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub footprint_id: Option<i64>,
    pub insight_text: String,
    pub model_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalInput {
    pub goal_type: String,
    pub target_value: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalRow {
    pub id: i64,
    pub goal_type: String,
    pub target_value: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub achieved: bool,
    pub created_at: DateTime<Utc>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        // llm_insights.footprint_id is a weak reference.
        conn.pragma_update(None, "foreign_keys", false)
            .context("Failed to configure foreign key enforcement")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn append_footprint(&self, record: &FootprintRecord) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO footprint_records (
                   timestamp, total_emissions, transport_emissions, diet_emissions,
                   heating_emissions, electricity_emissions, consumption_emissions,
                   transport_mode, distance_km, diet_type, heating_type,
                   heating_hours, electricity_kwh, grid_carbon_intensity,
                   atmospheric_co2_ppm, notes
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    format_timestamp(&record.timestamp),
                    record.total_emissions,
                    record.breakdown.transport,
                    record.breakdown.diet,
                    record.breakdown.heating,
                    record.breakdown.electricity,
                    record.breakdown.consumption,
                    record.transport_mode,
                    record.distance_km,
                    record.diet_type,
                    record.heating_type,
                    record.heating_hours,
                    record.electricity_kwh,
                    record.grid_carbon_intensity,
                    record.atmospheric_co2_ppm,
                    record.notes,
                ],
            )
            .context("Failed to insert footprint record")?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Most recently appended first.
    pub fn recent_footprints(&self, limit: usize) -> Result<Vec<FootprintRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {} FROM footprint_records ORDER BY id DESC LIMIT ?1",
            queries::FOOTPRINT_COLUMNS
        ))?;

        let rows = statement
            .query_map(params![limit as i64], footprint_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query recent footprints")?;

        Ok(rows)
    }

    pub fn footprint(&self, id: i64) -> Result<Option<FootprintRow>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM footprint_records WHERE id = ?1",
                    queries::FOOTPRINT_COLUMNS
                ),
                params![id],
                footprint_from_row,
            )
            .optional()
            .context("Failed to query footprint record")
    }

    pub fn latest_footprint_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.recent_footprints(1)?.pop().map(|row| row.record.timestamp))
    }

    pub fn statistics(&self, window_days: u32) -> Result<WindowStatistics> {
        self.statistics_as_of(window_days, Utc::now())
    }

    pub fn statistics_as_of(&self, window_days: u32, now: DateTime<Utc>) -> Result<WindowStatistics> {
        let cutoff = window_cutoff(window_days, now);

        let (count, avg, min, max, sum, transport, diet, heating, electricity) = self
            .conn
            .query_row(
                "SELECT
                   COUNT(*),
                   AVG(total_emissions),
                   MIN(total_emissions),
                   MAX(total_emissions),
                   SUM(total_emissions),
                   AVG(transport_emissions),
                   AVG(diet_emissions),
                   AVG(heating_emissions),
                   AVG(electricity_emissions)
                 FROM footprint_records
                 WHERE timestamp >= ?1",
                params![cutoff],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                        row.get::<_, Option<f64>>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                    ))
                },
            )
            .context("Failed to query footprint statistics")?;

        if count <= 0 {
            return Ok(WindowStatistics::Empty {
                period_days: window_days,
            });
        }

        Ok(WindowStatistics::Populated(StatisticsSummary {
            period_days: window_days,
            record_count: count as u64,
            avg_daily_emissions: avg.unwrap_or_default(),
            min_emissions: min.unwrap_or_default(),
            max_emissions: max.unwrap_or_default(),
            total_emissions: sum.unwrap_or_default(),
            avg_transport: transport.unwrap_or_default(),
            avg_diet: diet.unwrap_or_default(),
            avg_heating: heating.unwrap_or_default(),
            avg_electricity: electricity.unwrap_or_default(),
        }))
    }

    pub fn trend(&self, window_days: u32) -> Result<Vec<TrendPoint>> {
        self.trend_as_of(window_days, Utc::now())
    }

    /// Ascending by timestamp, ties in append order.
    pub fn trend_as_of(&self, window_days: u32, now: DateTime<Utc>) -> Result<Vec<TrendPoint>> {
        let cutoff = window_cutoff(window_days, now);
        let mut statement = self.conn.prepare(
            "SELECT timestamp, total_emissions, transport_emissions, diet_emissions,
                    heating_emissions, electricity_emissions, consumption_emissions
             FROM footprint_records
             WHERE timestamp >= ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let points = statement
            .query_map(params![cutoff], |row| {
                Ok(TrendPoint {
                    timestamp: timestamp_column(row, 0)?,
                    total_emissions: row.get(1)?,
                    breakdown: CategoryBreakdown {
                        transport: row.get(2)?,
                        diet: row.get(3)?,
                        heating: row.get(4)?,
                        electricity: row.get(5)?,
                        consumption: row.get(6)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query footprint trend")?;

        Ok(points)
    }

    pub fn category_breakdown(&self, window_days: u32) -> Result<Option<CategoryBreakdown>> {
        self.category_breakdown_as_of(window_days, Utc::now())
    }

    /// Per-category averages over the window, `None` when the window is empty.
    pub fn category_breakdown_as_of(
        &self,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<CategoryBreakdown>> {
        let cutoff = window_cutoff(window_days, now);

        let (count, breakdown) = self
            .conn
            .query_row(
                "SELECT
                   COUNT(*),
                   AVG(transport_emissions),
                   AVG(diet_emissions),
                   AVG(heating_emissions),
                   AVG(electricity_emissions),
                   AVG(consumption_emissions)
                 FROM footprint_records
                 WHERE timestamp >= ?1",
                params![cutoff],
                |row| {
                    let average = |index: usize| -> rusqlite::Result<f64> {
                        Ok(row.get::<_, Option<f64>>(index)?.unwrap_or_default())
                    };

                    Ok((
                        row.get::<_, i64>(0)?,
                        CategoryBreakdown {
                            transport: average(1)?,
                            diet: average(2)?,
                            heating: average(3)?,
                            electricity: average(4)?,
                            consumption: average(5)?,
                        },
                    ))
                },
            )
            .context("Failed to query category breakdown")?;

        Ok((count > 0).then_some(breakdown))
    }

    /// `footprint_id` is a weak reference and is not checked for existence.
    pub fn append_insight(
        &self,
        footprint_id: Option<i64>,
        insight_text: &str,
        model_used: &str,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO llm_insights (timestamp, footprint_id, insight_text, model_used)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    format_timestamp(&now_micros()),
                    footprint_id,
                    insight_text,
                    model_used
                ],
            )
            .context("Failed to insert insight")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn recent_insights(&self, limit: usize) -> Result<Vec<InsightRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, timestamp, footprint_id, insight_text, model_used
             FROM llm_insights
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = statement
            .query_map(params![limit as i64], |row| {
                Ok(InsightRow {
                    id: row.get(0)?,
                    timestamp: timestamp_column(row, 1)?,
                    footprint_id: row.get(2)?,
                    insight_text: row.get(3)?,
                    model_used: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query insights")?;

        Ok(rows)
    }

    pub fn append_goal(&self, goal: &GoalInput) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO user_goals (goal_type, target_value, start_date, end_date, achieved, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    goal.goal_type,
                    goal.target_value,
                    goal.start_date,
                    goal.end_date,
                    format_timestamp(&now_micros()),
                ],
            )
            .context("Failed to insert goal")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn latest_goal(&self) -> Result<Option<GoalRow>> {
        self.conn
            .query_row(
                "SELECT id, goal_type, target_value, start_date, end_date, achieved, created_at
                 FROM user_goals
                 ORDER BY id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok(GoalRow {
                        id: row.get(0)?,
                        goal_type: row.get(1)?,
                        target_value: row.get(2)?,
                        start_date: row.get(3)?,
                        end_date: row.get(4)?,
                        achieved: row.get(5)?,
                        created_at: timestamp_column(row, 6)?,
                    })
                },
            )
            .optional()
            .context("Failed to query latest goal")
    }

    /// Wipes footprints, insights and goals in one transaction.
    pub fn clear_all(&mut self) -> Result<()> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        ["llm_insights", "footprint_records", "user_goals"]
            .iter()
            .try_for_each(|table| {
                transaction
                    .execute(&format!("DELETE FROM {table}"), [])
                    .with_context(|| format!("Failed to clear {table}"))
                    .map(|_| ())
            })?;

        transaction
            .commit()
            .context("Failed to commit clear of all data")?;
        Ok(())
    }
}

/// Current time at the precision the store keeps.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 in UTC, so text comparison matches time order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn window_cutoff(window_days: u32, now: DateTime<Utc>) -> String {
    let cutoff = now
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    format_timestamp(&cutoff)
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;

    DateTime::parse_from_rfc3339(&raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn footprint_from_row(row: &Row<'_>) -> rusqlite::Result<FootprintRow> {
    Ok(FootprintRow {
        id: row.get(0)?,
        record: FootprintRecord {
            timestamp: timestamp_column(row, 1)?,
            total_emissions: row.get(2)?,
            breakdown: CategoryBreakdown {
                transport: row.get(3)?,
                diet: row.get(4)?,
                heating: row.get(5)?,
                electricity: row.get(6)?,
                consumption: row.get(7)?,
            },
            transport_mode: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            distance_km: row.get::<_, Option<f64>>(9)?.unwrap_or_default(),
            diet_type: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
            heating_type: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
            heating_hours: row.get::<_, Option<f64>>(12)?.unwrap_or_default(),
            electricity_kwh: row.get::<_, Option<f64>>(13)?.unwrap_or_default(),
            grid_carbon_intensity: row.get::<_, Option<f64>>(14)?.unwrap_or_default(),
            atmospheric_co2_ppm: row.get(15)?,
            notes: row.get(16)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::{Database, FootprintRecord, GoalInput, WindowStatistics};
    use crate::calculator::CategoryBreakdown;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("temp dir");
        let database = Database::open(&dir.path().join("db").join("test.db")).expect("open db");
        (dir, database)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
            .single()
            .expect("fixed time")
    }

    fn record(timestamp: DateTime<Utc>, breakdown: CategoryBreakdown) -> FootprintRecord {
        FootprintRecord {
            timestamp,
            total_emissions: breakdown.total(),
            breakdown,
            transport_mode: "car_petrol".to_string(),
            distance_km: 20.0,
            diet_type: "omnivore".to_string(),
            heating_type: "natural_gas".to_string(),
            heating_hours: 6.0,
            electricity_kwh: 12.0,
            grid_carbon_intensity: 0.233,
            atmospheric_co2_ppm: Some(425.0),
            notes: Some("Region: default".to_string()),
        }
    }

    fn flat(total: f64) -> CategoryBreakdown {
        CategoryBreakdown {
            transport: total / 2.0,
            diet: total / 4.0,
            heating: total / 8.0,
            electricity: total / 8.0,
            consumption: 0.0,
        }
    }

    #[test]
    fn appended_record_round_trips_through_recent() {
        let (_dir, database) = open_temp();
        let original = record(
            now() + Duration::microseconds(123_456),
            CategoryBreakdown {
                transport: 3.84,
                diet: 5.0,
                heating: 12.0,
                electricity: 2.796,
                consumption: 0.165,
            },
        );

        let id = database.append_footprint(&original).expect("append");
        let rows = database.recent_footprints(1).expect("recent");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].record, original);
    }

    #[test]
    fn ids_increase_and_recent_is_newest_first() {
        let (_dir, database) = open_temp();
        let first = database.append_footprint(&record(now(), flat(10.0))).expect("first");
        let second = database
            .append_footprint(&record(now() - Duration::days(3), flat(20.0)))
            .expect("second");

        assert!(second > first);
        let rows = database.recent_footprints(10).expect("recent");
        assert_eq!(rows.iter().map(|row| row.id).collect::<Vec<_>>(), vec![second, first]);
    }

    #[test]
    fn empty_window_reports_empty_marker() {
        let (_dir, database) = open_temp();

        let statistics = database.statistics_as_of(30, now()).expect("statistics");
        assert_eq!(statistics, WindowStatistics::Empty { period_days: 30 });
        assert_eq!(statistics.record_count(), 0);
        assert!(statistics.summary().is_none());
        assert_eq!(database.category_breakdown_as_of(30, now()).expect("breakdown"), None);
    }

    #[test]
    fn statistics_over_two_records() {
        let (_dir, database) = open_temp();
        database
            .append_footprint(&record(now() - Duration::days(2), flat(10.0)))
            .expect("append");
        database
            .append_footprint(&record(now() - Duration::days(1), flat(20.0)))
            .expect("append");

        let statistics = database.statistics_as_of(30, now()).expect("statistics");
        let summary = statistics.summary().expect("populated");

        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.avg_daily_emissions, 15.0);
        assert_eq!(summary.min_emissions, 10.0);
        assert_eq!(summary.max_emissions, 20.0);
        assert_eq!(summary.total_emissions, 30.0);
        assert_eq!(summary.avg_transport, 7.5);
        assert_eq!(summary.period_days, 30);
    }

    #[test]
    fn records_outside_window_are_excluded() {
        let (_dir, database) = open_temp();
        database
            .append_footprint(&record(now() - Duration::days(45), flat(99.0)))
            .expect("old");
        database
            .append_footprint(&record(now() - Duration::hours(6), flat(8.0)))
            .expect("recent");

        let summary = database
            .statistics_as_of(30, now())
            .expect("statistics")
            .summary()
            .cloned()
            .expect("populated");
        assert_eq!(summary.record_count, 1);
        assert_eq!(summary.max_emissions, 8.0);

        let breakdown = database
            .category_breakdown_as_of(30, now())
            .expect("breakdown")
            .expect("non-empty window");
        assert_eq!(breakdown, flat(8.0));

        assert_eq!(database.trend_as_of(30, now()).expect("trend").len(), 1);
        assert_eq!(database.trend_as_of(60, now()).expect("trend").len(), 2);
    }

    #[test]
    fn oversized_window_reaches_back_to_the_earliest_record() {
        let (_dir, database) = open_temp();
        database
            .append_footprint(&record(now() - Duration::days(4000), flat(40.0)))
            .expect("old");
        database
            .append_footprint(&record(now() - Duration::hours(1), flat(8.0)))
            .expect("recent");

        let summary = database
            .statistics_as_of(u32::MAX, now())
            .expect("statistics")
            .summary()
            .cloned()
            .expect("populated");
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.period_days, u32::MAX);

        assert_eq!(database.trend_as_of(u32::MAX, now()).expect("trend").len(), 2);
        assert!(
            database
                .category_breakdown_as_of(u32::MAX, now())
                .expect("breakdown")
                .is_some()
        );
    }

    #[test]
    fn trend_is_ascending_by_timestamp() {
        let (_dir, database) = open_temp();
        for (days_ago, total) in [(1, 12.0), (5, 30.0), (3, 18.0)] {
            database
                .append_footprint(&record(now() - Duration::days(days_ago), flat(total)))
                .expect("append");
        }

        let trend = database.trend_as_of(30, now()).expect("trend");
        let totals = trend.iter().map(|point| point.total_emissions).collect::<Vec<_>>();

        assert_eq!(totals, vec![30.0, 18.0, 12.0]);
        assert!(trend.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
        assert_eq!(trend[0].breakdown, flat(30.0));
    }

    #[test]
    fn insights_accept_dangling_footprint_ids() {
        let (_dir, database) = open_temp();

        let first = database
            .append_insight(Some(999), "Cycle twice a week.", "llama3:8b")
            .expect("insight");
        let second = database
            .append_insight(None, "Lower the thermostat.", "llama3:8b")
            .expect("insight");

        let insights = database.recent_insights(5).expect("insights");
        assert_eq!(insights.iter().map(|row| row.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(insights[1].footprint_id, Some(999));
        assert_eq!(insights[0].model_used.as_deref(), Some("llama3:8b"));
    }

    #[test]
    fn goals_are_stored_and_read_back() {
        let (_dir, database) = open_temp();
        let start = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");

        let id = database
            .append_goal(&GoalInput {
                goal_type: "daily_emissions".to_string(),
                target_value: 9.5,
                start_date: start,
                end_date: start.checked_add_signed(Duration::days(90)),
            })
            .expect("goal");

        let goal = database.latest_goal().expect("query").expect("goal row");
        assert_eq!(goal.id, id);
        assert_eq!(goal.target_value, 9.5);
        assert_eq!(goal.start_date, start);
        assert!(!goal.achieved);
    }

    #[test]
    fn clear_all_wipes_every_table() {
        let (_dir, mut database) = open_temp();
        let id = database.append_footprint(&record(now(), flat(10.0))).expect("append");
        database
            .append_insight(Some(id), "Take the train.", "llama3:8b")
            .expect("insight");
        database
            .append_goal(&GoalInput {
                goal_type: "daily_emissions".to_string(),
                target_value: 5.0,
                start_date: NaiveDate::from_ymd_opt(2026, 10, 18).expect("date"),
                end_date: None,
            })
            .expect("goal");

        database.clear_all().expect("clear");

        assert!(database.recent_footprints(10).expect("recent").is_empty());
        assert!(database.recent_insights(10).expect("insights").is_empty());
        assert!(database.latest_goal().expect("goal").is_none());
        assert_eq!(
            database.statistics_as_of(30, now()).expect("statistics"),
            WindowStatistics::Empty { period_days: 30 }
        );
    }
}
