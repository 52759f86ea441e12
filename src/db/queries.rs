pub const CREATE_FOOTPRINT_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS footprint_records (
  id                    INTEGER PRIMARY KEY AUTOINCREMENT,
  timestamp             TEXT NOT NULL,
  total_emissions       REAL NOT NULL,
  transport_emissions   REAL NOT NULL DEFAULT 0,
  diet_emissions        REAL NOT NULL DEFAULT 0,
  heating_emissions     REAL NOT NULL DEFAULT 0,
  electricity_emissions REAL NOT NULL DEFAULT 0,
  consumption_emissions REAL NOT NULL DEFAULT 0,
  transport_mode        TEXT,
  distance_km           REAL,
  diet_type             TEXT,
  heating_type          TEXT,
  heating_hours         REAL,
  electricity_kwh       REAL,
  grid_carbon_intensity REAL,
  atmospheric_co2_ppm   REAL,
  notes                 TEXT
);
"#;

pub const CREATE_LLM_INSIGHTS: &str = r#"
CREATE TABLE IF NOT EXISTS llm_insights (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  timestamp    TEXT NOT NULL,
  footprint_id INTEGER,
  insight_text TEXT NOT NULL,
  model_used   TEXT,
  FOREIGN KEY (footprint_id) REFERENCES footprint_records (id)
);
"#;

pub const CREATE_USER_GOALS: &str = r#"
CREATE TABLE IF NOT EXISTS user_goals (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  goal_type    TEXT NOT NULL,
  target_value REAL NOT NULL,
  start_date   TEXT NOT NULL,
  end_date     TEXT,
  achieved     INTEGER NOT NULL DEFAULT 0,
  created_at   TEXT NOT NULL
);
"#;

pub const INDEX_FOOTPRINT_TIMESTAMP: &str =
    "CREATE INDEX IF NOT EXISTS idx_footprint_records_timestamp ON footprint_records(timestamp);";

pub const INDEX_INSIGHTS_FOOTPRINT: &str =
    "CREATE INDEX IF NOT EXISTS idx_llm_insights_footprint_id ON llm_insights(footprint_id);";

pub const FOOTPRINT_COLUMNS: &str = "id, timestamp, total_emissions, transport_emissions, diet_emissions, heating_emissions, electricity_emissions, consumption_emissions, transport_mode, distance_km, diet_type, heating_type, heating_hours, electricity_kwh, grid_carbon_intensity, atmospheric_co2_ppm, notes";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_FOOTPRINT_RECORDS,
        CREATE_LLM_INSIGHTS,
        CREATE_USER_GOALS,
        INDEX_FOOTPRINT_TIMESTAMP,
        INDEX_INSIGHTS_FOOTPRINT,
    ]
}
