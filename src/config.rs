use crate::db::MAX_WINDOW_DAYS;
use crate::emissions::DEFAULT_FACTORS_JSON;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR: &str = ".CarbonWise";
const CONFIG_FILE: &str = "config.json";
const FACTORS_FILE: &str = "emission_factors.json";
pub const MIN_ADVISORY_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub factors_path: PathBuf,
    pub report_dir: PathBuf,
    pub api_port: u16,
    pub region: String,
    pub location: Option<String>,
    pub stats_window_days: u32,
    pub live_data_enabled: bool,
    pub live_grid_regions: Vec<String>,
    pub http_timeout_seconds: u64,
    pub grid_intensity_url: String,
    pub co2_url: String,
    pub news_url: String,
    pub advisory_program: String,
    pub advisory_args: Vec<String>,
    pub advisory_model: String,
    pub advisory_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("carbon_footprint.db"),
            factors_path: root.join(FACTORS_FILE),
            report_dir: default_report_dir(),
            api_port: 7891,
            region: "default".to_string(),
            location: None,
            stats_window_days: 30,
            live_data_enabled: true,
            live_grid_regions: vec!["uk".to_string(), "gb".to_string(), "default".to_string()],
            http_timeout_seconds: 5,
            grid_intensity_url: "https://api.carbonintensity.org.uk/intensity".to_string(),
            co2_url: "https://gml.noaa.gov/webdata/ccgg/trends/co2/co2_weekly_mlo.txt"
                .to_string(),
            news_url: "https://climate.nasa.gov/news/rss.xml".to_string(),
            advisory_program: "ollama".to_string(),
            advisory_args: vec!["run".to_string()],
            advisory_model: "llama3:8b".to_string(),
            advisory_timeout_seconds: 180,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        fs::create_dir_all(&self.report_dir).with_context(|| {
            format!(
                "Failed to create report directory: {}",
                self.report_dir.display()
            )
        })?;

        if !self.factors_path.exists() {
            if let Some(parent) = self.factors_path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create factors directory: {}", parent.display())
                })?;
            }
            fs::write(&self.factors_path, DEFAULT_FACTORS_JSON).with_context(|| {
                format!(
                    "Failed to create default emission factor file: {}",
                    self.factors_path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn advisory_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.advisory_timeout_seconds
                .max(MIN_ADVISORY_TIMEOUT_SECONDS),
        )
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let normalized = normalize_config_key(key);

        match normalized {
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "factors_path" => {
                self.factors_path = expand_home(value);
            }
            "report_dir" => {
                self.report_dir = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "region" => {
                let region = value.trim().to_lowercase();
                if region.is_empty() {
                    bail!("region must not be empty");
                }
                self.region = region;
            }
            "location" => {
                self.location = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "stats_window_days" => {
                let days = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("stats_window_days must be a number"))?;
                if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                    bail!("stats_window_days must be between 1 and {MAX_WINDOW_DAYS}");
                }
                self.stats_window_days = days;
            }
            "live_data_enabled" => {
                self.live_data_enabled = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("live_data_enabled must be true/false"))?;
            }
            "live_grid_regions" => {
                self.live_grid_regions = split_list(value)
                    .into_iter()
                    .map(|region| region.to_lowercase())
                    .collect();
            }
            "http_timeout_seconds" => {
                self.http_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("http_timeout_seconds must be a number"))?
                    .max(1);
            }
            "grid_intensity_url" => {
                self.grid_intensity_url = parse_http_url(value)?;
            }
            "co2_url" => {
                self.co2_url = parse_http_url(value)?;
            }
            "news_url" => {
                self.news_url = parse_http_url(value)?;
            }
            "advisory_program" => {
                let program = value.trim();
                if program.is_empty() {
                    bail!("advisory_program must not be empty");
                }
                self.advisory_program = program.to_string();
            }
            "advisory_args" => {
                self.advisory_args = value.split_whitespace().map(ToOwned::to_owned).collect();
            }
            "advisory_model" => {
                let model = value.trim();
                if model.is_empty() {
                    bail!("advisory_model must not be empty");
                }
                self.advisory_model = model.to_string();
            }
            "advisory_timeout_seconds" => {
                self.advisory_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("advisory_timeout_seconds must be a number"))?
                    .max(MIN_ADVISORY_TIMEOUT_SECONDS);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, factors_path|factors.path, report_dir|report.dir, api_port|api.port, region|grid.region, location|user.location, stats_window_days|stats.window_days, live_data_enabled|climate.live, live_grid_regions|climate.live_regions, http_timeout_seconds|climate.timeout_seconds, grid_intensity_url|climate.grid_url, co2_url|climate.co2_url, news_url|climate.news_url, advisory_program|advisor.program, advisory_args|advisor.args, advisory_model|advisor.model, advisory_timeout_seconds|advisor.timeout_seconds"
                );
            }
        }

        if normalized == "report_dir" {
            fs::create_dir_all(&self.report_dir).with_context(|| {
                format!(
                    "Failed to create report directory: {}",
                    self.report_dir.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "factors_path" => Some(self.factors_path.display().to_string()),
            "report_dir" => Some(self.report_dir.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "region" => Some(self.region.clone()),
            "location" => Some(
                self.location
                    .clone()
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "stats_window_days" => Some(self.stats_window_days.to_string()),
            "live_data_enabled" => Some(self.live_data_enabled.to_string()),
            "live_grid_regions" => Some(self.live_grid_regions.join(",")),
            "http_timeout_seconds" => Some(self.http_timeout_seconds.to_string()),
            "grid_intensity_url" => Some(self.grid_intensity_url.clone()),
            "co2_url" => Some(self.co2_url.clone()),
            "news_url" => Some(self.news_url.clone()),
            "advisory_program" => Some(self.advisory_program.clone()),
            "advisory_args" => Some(self.advisory_args.join(" ")),
            "advisory_model" => Some(self.advisory_model.clone()),
            "advisory_timeout_seconds" => Some(self.advisory_timeout_seconds.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "factors_path" | "factors.path" => "factors_path",
        "report_dir" | "report.dir" => "report_dir",
        "api_port" | "api.port" => "api_port",
        "region" | "grid.region" => "region",
        "location" | "user.location" => "location",
        "stats_window_days" | "stats.window_days" => "stats_window_days",
        "live_data_enabled" | "climate.live" => "live_data_enabled",
        "live_grid_regions" | "climate.live_regions" => "live_grid_regions",
        "http_timeout_seconds" | "climate.timeout_seconds" => "http_timeout_seconds",
        "grid_intensity_url" | "climate.grid_url" => "grid_intensity_url",
        "co2_url" | "climate.co2_url" => "co2_url",
        "news_url" | "climate.news_url" => "news_url",
        "advisory_program" | "advisor.program" => "advisory_program",
        "advisory_args" | "advisor.args" => "advisory_args",
        "advisory_model" | "advisor.model" => "advisory_model",
        "advisory_timeout_seconds" | "advisor.timeout_seconds" => "advisory_timeout_seconds",
        _ => key,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_http_url(value: &str) -> Result<String> {
    let url = Url::parse(value.trim()).with_context(|| format!("Invalid URL: {value}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        scheme => bail!("Unsupported URL scheme `{scheme}`: {value}"),
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

pub fn default_report_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("CarbonWise")
        .join("reports")
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn dotted_aliases_update_the_same_field() {
        let mut config = Config::default();
        config.set_value("advisor.model", "mistral:7b").expect("set model");
        config.set_value("grid.region", " France ").expect("set region");

        assert_eq!(config.get_value("advisory_model").as_deref(), Some("mistral:7b"));
        assert_eq!(config.get_value("region").as_deref(), Some("france"));
    }

    #[test]
    fn advisory_timeout_has_a_floor() {
        let mut config = Config::default();
        config
            .set_value("advisor.timeout_seconds", "1")
            .expect("set timeout");

        assert_eq!(config.advisory_timeout_seconds, 5);
        assert_eq!(config.advisory_timeout().as_secs(), 5);
    }

    #[test]
    fn rejects_non_http_urls() {
        let mut config = Config::default();

        assert!(config.set_value("climate.grid_url", "ftp://example.org").is_err());
        assert!(config.set_value("climate.co2_url", "not a url").is_err());
        config
            .set_value("climate.news_url", "https://example.org/feed.xml")
            .expect("https url");
        assert_eq!(config.news_url, "https://example.org/feed.xml");
    }

    #[test]
    fn stats_window_is_bounded() {
        let mut config = Config::default();

        assert!(config.set_value("stats.window_days", "0").is_err());
        assert!(config.set_value("stats.window_days", "4000000000").is_err());
        assert!(config.set_value("stats.window_days", "3651").is_err());
        config
            .set_value("stats.window_days", "3650")
            .expect("upper bound");
        assert_eq!(config.stats_window_days, 3650);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut config = Config::default();
        assert!(config.set_value("polling_seconds", "300").is_err());
        assert!(config.get_value("polling_seconds").is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"region":"norway"}"#).expect("partial config");

        assert_eq!(config.region, "norway");
        assert_eq!(config.advisory_model, "llama3:8b");
        assert_eq!(config.stats_window_days, 30);
    }
}
