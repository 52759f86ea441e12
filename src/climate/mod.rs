pub mod grid;

use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!("CarbonWise/", env!("CARGO_PKG_VERSION"));
pub const ESTIMATED_CO2_PPM: f64 = 425.0;
pub const PARIS_WARMING_LIMIT_C: f64 = 1.5;
const FALLBACK_HEADLINE: &str =
    "Climate action remains critical for limiting global warming to 1.5°C";

/// One half-hour reading from the grid carbon-intensity service, in g CO2/kWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonIntensityReading {
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
    pub index: Option<String>,
    pub from: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericCo2 {
    pub ppm: f64,
    pub measured_on: Option<NaiveDate>,
    pub source: String,
    pub note: Option<String>,
}

impl AtmosphericCo2 {
    pub fn estimated() -> Self {
        Self {
            ppm: ESTIMATED_CO2_PPM,
            measured_on: None,
            source: "Estimated (2025)".to_string(),
            note: Some("Live data unavailable".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClimateContext {
    pub atmospheric_co2_ppm: f64,
    pub co2_source: String,
    pub co2_note: Option<String>,
    pub grid_intensity: Option<CarbonIntensityReading>,
    pub climate_headline: String,
    pub timestamp: String,
    pub paris_agreement_target_c: f64,
    pub daily_co2_budget_kg: f64,
}

#[derive(Debug, Deserialize)]
struct IntensityEnvelope {
    data: Vec<IntensityEntry>,
}

#[derive(Debug, Deserialize)]
struct IntensityEntry {
    from: Option<String>,
    intensity: IntensityValues,
}

#[derive(Debug, Deserialize)]
struct IntensityValues {
    actual: Option<f64>,
    forecast: Option<f64>,
    index: Option<String>,
}

/// Source of live grid carbon-intensity readings.
pub trait CarbonIntensitySource: Send + Sync {
    fn current_intensity(&self) -> Result<CarbonIntensityReading>;
}

/// Client for the public climate endpoints. Every lookup degrades to a local
/// fallback instead of failing the caller.
#[derive(Debug, Clone)]
pub struct ClimateDataClient {
    live_enabled: bool,
    timeout: Duration,
    grid_intensity_url: String,
    co2_url: String,
    news_url: String,
}

impl ClimateDataClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            live_enabled: config.live_data_enabled,
            timeout: Duration::from_secs(config.http_timeout_seconds.max(1)),
            grid_intensity_url: config.grid_intensity_url.clone(),
            co2_url: config.co2_url.clone(),
            news_url: config.news_url.clone(),
        }
    }

    pub fn live_enabled(&self) -> bool {
        self.live_enabled
    }

    pub fn carbon_intensity(&self) -> Result<CarbonIntensityReading> {
        if !self.live_enabled {
            bail!("live climate data is disabled");
        }

        let body = fetch_text(&self.grid_intensity_url, self.timeout)?;
        parse_carbon_intensity(&body)
    }

    pub fn atmospheric_co2(&self) -> AtmosphericCo2 {
        if !self.live_enabled {
            return AtmosphericCo2::estimated();
        }

        fetch_text(&self.co2_url, self.timeout)
            .and_then(|body| {
                parse_noaa_weekly(&body).context("CO2 feed did not contain a usable measurement")
            })
            .unwrap_or_else(|error| {
                warn!(error = %error, "atmospheric CO2 lookup failed. using estimate");
                AtmosphericCo2::estimated()
            })
    }

    pub fn climate_headline(&self) -> String {
        if !self.live_enabled {
            return FALLBACK_HEADLINE.to_string();
        }

        fetch_text(&self.news_url, self.timeout)
            .and_then(|body| extract_headline(&body).context("news feed had no headline"))
            .unwrap_or_else(|error| {
                warn!(error = %error, "climate headline lookup failed");
                FALLBACK_HEADLINE.to_string()
            })
    }

    pub fn climate_context(&self, daily_budget_kg: f64) -> ClimateContext {
        let co2 = self.atmospheric_co2();
        let grid_intensity = self
            .carbon_intensity()
            .map_err(|error| warn!(error = %error, "grid intensity reading unavailable"))
            .ok();

        ClimateContext {
            atmospheric_co2_ppm: co2.ppm,
            co2_source: co2.source,
            co2_note: co2.note,
            grid_intensity,
            climate_headline: self.climate_headline(),
            timestamp: Local::now().to_rfc3339(),
            paris_agreement_target_c: PARIS_WARMING_LIMIT_C,
            daily_co2_budget_kg: daily_budget_kg,
        }
    }
}

impl CarbonIntensitySource for ClimateDataClient {
    fn current_intensity(&self) -> Result<CarbonIntensityReading> {
        self.carbon_intensity()
    }
}

/// The blocking client owns a runtime of its own, so it has to be built, used
/// and dropped off the async worker threads.
fn fetch_text(url: &str, timeout: Duration) -> Result<String> {
    let url = url.to_string();

    std::thread::spawn(move || fetch_text_blocking(&url, timeout))
        .join()
        .map_err(|_| anyhow!("climate lookup worker thread panicked"))?
}

fn fetch_text_blocking(url: &str, timeout: Duration) -> Result<String> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create climate HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request failed: {url}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("{url} returned {status}");
    }

    response
        .text()
        .with_context(|| format!("Failed to read response body: {url}"))
}

pub fn parse_carbon_intensity(body: &str) -> Result<CarbonIntensityReading> {
    let envelope: IntensityEnvelope =
        serde_json::from_str(body).context("Failed to parse carbon intensity payload")?;

    let entry = envelope
        .data
        .into_iter()
        .next()
        .context("carbon intensity payload has no entries")?;

    Ok(CarbonIntensityReading {
        actual: entry.intensity.actual,
        forecast: entry.intensity.forecast,
        index: entry.intensity.index,
        from: entry.from,
        source: "carbonintensity.org.uk".to_string(),
    })
}

/// Reads the most recent row of the NOAA Mauna Loa weekly series: whitespace
/// separated `year month day decimal_date ppm ...`, `#` lines are comments.
pub fn parse_noaa_weekly(body: &str) -> Option<AtmosphericCo2> {
    let latest = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .next_back()?;

    let fields = latest.split_whitespace().collect::<Vec<_>>();
    if fields.len() < 5 {
        return None;
    }

    // NOAA marks missing weeks with negative sentinels such as -999.99.
    let ppm = fields[4].parse::<f64>().ok().filter(|ppm| *ppm > 0.0)?;
    let measured_on = match (
        fields[0].parse::<i32>(),
        fields[1].parse::<u32>(),
        fields[2].parse::<u32>(),
    ) {
        (Ok(year), Ok(month), Ok(day)) => NaiveDate::from_ymd_opt(year, month, day),
        _ => None,
    };

    Some(AtmosphericCo2 {
        ppm,
        measured_on,
        source: "NOAA Mauna Loa Observatory".to_string(),
        note: None,
    })
}

/// The first `<title>` of an RSS document names the feed itself.
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<title>(.*?)</title>")
        .unwrap_or_else(|error| panic!("title regex failed to compile: {error}"))
});

pub fn extract_headline(body: &str) -> Option<String> {
    let titles = TITLE_RE
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .map(|title| title.as_str().trim().to_string())
        .collect::<Vec<_>>();

    (titles.len() > 2).then(|| format!("Latest: {}", titles[1]))
}

#[cfg(test)]
mod tests {
    use super::{AtmosphericCo2, extract_headline, parse_carbon_intensity, parse_noaa_weekly};
    use chrono::NaiveDate;

    #[test]
    fn parses_carbon_intensity_envelope() {
        let body = r#"{"data":[{"from":"2026-10-18T10:00Z","to":"2026-10-18T10:30Z","intensity":{"forecast":190,"actual":182,"index":"moderate"}}]}"#;

        let reading = parse_carbon_intensity(body).expect("reading");
        assert_eq!(reading.actual, Some(182.0));
        assert_eq!(reading.forecast, Some(190.0));
        assert_eq!(reading.index.as_deref(), Some("moderate"));
    }

    #[test]
    fn empty_intensity_envelope_is_an_error() {
        assert!(parse_carbon_intensity(r#"{"data":[]}"#).is_err());
        assert!(parse_carbon_intensity("<html>maintenance</html>").is_err());
    }

    #[test]
    fn missing_actual_value_is_kept_as_none() {
        let body = r#"{"data":[{"from":"2026-10-18T10:00Z","intensity":{"forecast":190,"actual":null,"index":"moderate"}}]}"#;

        let reading = parse_carbon_intensity(body).expect("reading");
        assert_eq!(reading.actual, None);
    }

    #[test]
    fn noaa_parser_uses_last_data_row() {
        let body = "# header line\n# another\n2026  9 28  2026.7411   422.10  20 421.0 400.2 100.1\n2026 10  5  2026.7603   422.61  21 421.5 400.6 100.4\n";

        let reading = parse_noaa_weekly(body).expect("reading");
        assert_eq!(reading.ppm, 422.61);
        assert_eq!(reading.measured_on, NaiveDate::from_ymd_opt(2026, 10, 5));
        assert_eq!(reading.note, None);
    }

    #[test]
    fn noaa_parser_rejects_short_or_missing_rows() {
        assert!(parse_noaa_weekly("# only comments\n").is_none());
        assert!(parse_noaa_weekly("2026 10 5\n").is_none());
        assert!(parse_noaa_weekly("2026 10 5 2026.76 n/a\n").is_none());
        assert!(parse_noaa_weekly("2026 10 5 2026.76 -999.99\n").is_none());
    }

    #[test]
    fn estimate_carries_unavailable_note() {
        let estimate = AtmosphericCo2::estimated();
        assert_eq!(estimate.ppm, 425.0);
        assert_eq!(estimate.note.as_deref(), Some("Live data unavailable"));
    }

    #[test]
    fn headline_skips_feed_title() {
        let feed = "<rss><channel><title>NASA Climate</title><item><title>Sea ice hits record low</title></item><item><title>Older story</title></item></channel></rss>";

        assert_eq!(
            extract_headline(feed).as_deref(),
            Some("Latest: Sea ice hits record low")
        );
        assert_eq!(extract_headline("<title>Only feed</title>"), None);
    }

    #[test]
    fn headline_pattern_is_reused_across_feeds() {
        let first = "<title>Feed</title><title>Glacier retreat speeds up</title><title>Old</title>";
        let second = "<title>Feed</title><title>\n  Wind beats coal in October\n</title><title>Old</title>";

        assert_eq!(
            extract_headline(first).as_deref(),
            Some("Latest: Glacier retreat speeds up")
        );
        assert_eq!(
            extract_headline(second).as_deref(),
            Some("Latest: Wind beats coal in October")
        );
    }
}
