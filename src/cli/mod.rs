pub mod interactive;

use crate::context::{AdviceKind, DEFAULT_REDUCTION_PERCENT, FootprintSelection};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "CarbonWise",
    about = "Personal carbon footprint calculator and climate advisor"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    #[arg(long, default_value = "car_petrol")]
    pub transport: String,
    #[arg(long, default_value_t = 20.0)]
    pub distance_km: f64,
    #[arg(long, default_value = "omnivore")]
    pub diet: String,
    #[arg(long, default_value = "natural_gas")]
    pub heating: String,
    #[arg(long, default_value_t = 6.0)]
    pub heating_hours: f64,
    #[arg(long, default_value_t = 12.0)]
    pub electricity_kwh: f64,
    #[arg(long, default_value_t = false)]
    pub new_clothes: bool,
    #[arg(long, default_value_t = 3.0)]
    pub streaming_hours: f64,
    /// Grid region, e.g. uk or france. Defaults to the configured region.
    #[arg(long)]
    pub region: Option<String>,
    /// kg CO2 per kWh, bypassing grid resolution.
    #[arg(long)]
    pub grid_intensity: Option<f64>,
}

impl From<SelectionArgs> for FootprintSelection {
    fn from(args: SelectionArgs) -> Self {
        Self {
            transport_mode: args.transport,
            distance_km: args.distance_km,
            diet_type: args.diet,
            heating_type: args.heating,
            heating_hours: args.heating_hours,
            electricity_kwh: args.electricity_kwh,
            bought_new_clothes: args.new_clothes,
            streaming_hours: args.streaming_hours,
            region: args.region,
            grid_intensity: args.grid_intensity,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Calculate a daily footprint and optionally save it.
    Calculate {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Prompt for each selection instead of using flags.
        #[arg(long, default_value_t = false)]
        interactive: bool,
        #[arg(long, default_value_t = false)]
        save: bool,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Most recently saved footprints.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Stats {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Trend {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Breakdown {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Ask the advisory model for guidance.
    ///
    /// Without --latest, advice is about the day described by the selection
    /// flags, which fall back to their defaults (car_petrol, 20 km, omnivore,
    /// natural_gas) when omitted. `compare` weighs those selections against
    /// the latest saved footprint; with --latest it weighs the latest saved
    /// footprint against the one before it.
    Advise {
        #[arg(value_enum, default_value_t = AdviceKind::Tips)]
        kind: AdviceKind,
        /// Use saved footprints instead of the selection flags.
        #[arg(long, default_value_t = false)]
        latest: bool,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long)]
        guidance: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Reduction goal in percent, used by `plan`.
        #[arg(long)]
        reduction: Option<u8>,
    },
    Insights {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Plan a reduction goal from the window average.
    Goal {
        #[arg(long, default_value_t = DEFAULT_REDUCTION_PERCENT)]
        reduction: u8,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    Climate {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Factors {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write Markdown and JSON reports for a window.
    Report {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Delete all footprints, insights and goals.
    Clear {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor,
    /// Serve the JSON API on localhost.
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use crate::context::{AdviceKind, FootprintSelection};
    use clap::Parser;

    #[test]
    fn calculate_defaults_match_typical_day() {
        let cli = Cli::try_parse_from(["CarbonWise", "calculate"]).expect("parse");
        let Commands::Calculate { selection, save, .. } = cli.command else {
            panic!("expected calculate");
        };

        let selection = FootprintSelection::from(selection);
        assert_eq!(selection.transport_mode, "car_petrol");
        assert_eq!(selection.distance_km, 20.0);
        assert_eq!(selection.streaming_hours, 3.0);
        assert!(selection.region.is_none());
        assert!(!save);
    }

    #[test]
    fn advise_parses_kind_and_overrides() {
        let cli = Cli::try_parse_from([
            "CarbonWise",
            "advise",
            "plan",
            "--reduction",
            "40",
            "--region",
            "france",
        ])
        .expect("parse");

        let Commands::Advise {
            kind,
            reduction,
            selection,
            ..
        } = cli.command
        else {
            panic!("expected advise");
        };
        assert_eq!(kind, AdviceKind::Plan);
        assert_eq!(reduction, Some(40));
        assert_eq!(selection.region.as_deref(), Some("france"));
    }
}
