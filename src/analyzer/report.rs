use crate::analyzer::{BenchmarkComparison, compare_to_benchmarks};
use crate::calculator::{Category, CategoryBreakdown};
use crate::db::{StatisticsSummary, TrendPoint, WindowStatistics};
use crate::emissions::EmissionFactorTable;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct FootprintReport {
    pub generated_at: String,
    pub period_days: u32,
    pub statistics: WindowStatistics,
    pub category_averages: Option<CategoryBreakdown>,
    pub benchmarks: Option<BenchmarkComparison>,
    pub trend: Vec<TrendPoint>,
    pub highlights: Vec<String>,
}

#[derive(Debug)]
pub struct SavedReport {
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

pub fn build_window_report(
    generated_at: DateTime<Utc>,
    statistics: WindowStatistics,
    category_averages: Option<CategoryBreakdown>,
    trend: Vec<TrendPoint>,
    table: &EmissionFactorTable,
) -> FootprintReport {
    let period_days = match &statistics {
        WindowStatistics::Empty { period_days } => *period_days,
        WindowStatistics::Populated(summary) => summary.period_days,
    };

    let benchmarks = statistics
        .summary()
        .map(|summary| compare_to_benchmarks(summary.avg_daily_emissions, table));

    let highlights = statistics
        .summary()
        .map(|summary| {
            detect_highlights(summary, category_averages.as_ref(), &trend, table.paris_daily_target())
        })
        .unwrap_or_default();

    FootprintReport {
        generated_at: generated_at.to_rfc3339(),
        period_days,
        statistics,
        category_averages,
        benchmarks,
        trend,
        highlights,
    }
}

pub fn render_markdown(report: &FootprintReport) -> String {
    let Some(summary) = report.statistics.summary() else {
        return format!(
            "# Carbon Footprint Report - last {} days\n\nNo footprints recorded in this window.\n",
            report.period_days
        );
    };

    let category_rows = report
        .category_averages
        .map(|averages| {
            let total = averages.total();
            averages
                .entries()
                .iter()
                .map(|(category, value)| {
                    format!(
                        "| {} | {:.2} | {:.0}% |",
                        category,
                        value,
                        share_percent(*value, total)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let benchmark_rows = report
        .benchmarks
        .as_ref()
        .map(|benchmarks| {
            format!(
                "- Annual estimate: {:.1} t CO2\n- vs Paris target ({:.1} kg/day): {:+.1} kg ({:+.0}%)\n- vs world average ({:.1} kg/day): {:+.1} kg ({:+.0}%)",
                benchmarks.annual_tonnes,
                benchmarks.paris_target_kg,
                benchmarks.vs_paris_kg,
                benchmarks.vs_paris_percent,
                benchmarks.world_average_kg,
                benchmarks.vs_world_kg,
                benchmarks.vs_world_percent
            )
        })
        .unwrap_or_default();

    let trend_rows = if report.trend.is_empty() {
        "- No data".to_string()
    } else {
        report
            .trend
            .iter()
            .map(|point| {
                format!(
                    "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |",
                    point.timestamp.format("%Y-%m-%d %H:%M"),
                    point.total_emissions,
                    point.breakdown.transport,
                    point.breakdown.diet,
                    point.breakdown.heating,
                    point.breakdown.electricity,
                    point.breakdown.consumption
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let highlight_rows = if report.highlights.is_empty() {
        "- Nothing notable in this window".to_string()
    } else {
        report
            .highlights
            .iter()
            .map(|entry| format!("- {entry}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "# Carbon Footprint Report - last {} days\n\n## Summary\n- Records: {}\n- Average: {:.2} kg CO2/day\n- Best day: {:.2} kg CO2\n- Worst day: {:.2} kg CO2\n- Total: {:.1} kg CO2\n\n## Benchmarks\n{}\n\n## Average by Category\n| Category | kg CO2/day | Share |\n|----------|------------|-------|\n{}\n\n## Trend\n| Time (UTC) | Total | Transport | Diet | Heating | Electricity | Consumption |\n|------|-------|-----------|------|---------|-------------|-------------|\n{}\n\n## Highlights\n{}\n",
        report.period_days,
        summary.record_count,
        summary.avg_daily_emissions,
        summary.min_emissions,
        summary.max_emissions,
        summary.total_emissions,
        benchmark_rows,
        category_rows,
        trend_rows,
        highlight_rows
    )
}

pub fn save_report_files(report: &FootprintReport, report_dir: &Path) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let stem = format!(
        "footprint-{}-{}d",
        Utc::now().format("%Y-%m-%d"),
        report.period_days
    );
    let markdown_path = report_dir.join(format!("{stem}.md"));
    let json_path = report_dir.join(format!("{stem}.json"));

    fs::write(&markdown_path, render_markdown(report)).with_context(|| {
        format!(
            "Failed to write Markdown report: {}",
            markdown_path.display()
        )
    })?;

    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        markdown_path,
        json_path,
    })
}

fn detect_highlights(
    summary: &StatisticsSummary,
    averages: Option<&CategoryBreakdown>,
    trend: &[TrendPoint],
    paris_target: f64,
) -> Vec<String> {
    let dominant = averages.map(|averages| {
        let category = averages.largest();
        format!(
            "{} is the largest contributor at {:.0}% of the average day",
            category,
            share_percent(averages.get(category), averages.total())
        )
    });

    let paris_days = trend
        .iter()
        .filter(|point| point.total_emissions <= paris_target)
        .count();
    let paris_alert = (paris_days > 0).then(|| {
        format!("{paris_days} of {} records were within the Paris daily budget", trend.len())
    });

    let spread_alert = (summary.max_emissions > summary.min_emissions * 2.0
        && summary.record_count > 1)
        .then(|| {
            format!(
                "Worst day ({:.1} kg) was more than double the best day ({:.1} kg)",
                summary.max_emissions, summary.min_emissions
            )
        });

    let latest_vs_average = trend.last().map(|latest| {
        if latest.total_emissions < summary.avg_daily_emissions {
            "Latest record is below the window average".to_string()
        } else {
            "Latest record is at or above the window average".to_string()
        }
    });

    let transport_alert = averages
        .filter(|averages| averages.get(Category::Transport) > paris_target)
        .map(|_| "Transport alone exceeds the Paris daily budget".to_string());

    [
        dominant,
        paris_alert,
        spread_alert,
        latest_vs_average,
        transport_alert,
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
}

fn share_percent(value: f64, total: f64) -> f64 {
    if total <= 0.0 { 0.0 } else { value / total * 100.0 }
}
