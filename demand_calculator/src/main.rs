use anyhow::Result;
use clap::{Parser, ValueEnum};
use demand_calculator::{load_dataset, DemandCalculator, DemandConfig, DemandStats, GroupKey};
use log::info;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "demand_calculator")]
#[command(about = "Aggregate GB national demand from settlement-period CSV extracts")]
struct Args {
    /// Directory holding the raw demand CSV files
    #[arg(short, long, default_value = "data_raw")]
    data_dir: PathBuf,

    /// File name prefixes to load (repeatable)
    #[arg(short, long, num_args = 1..)]
    prefix: Vec<String>,

    /// How to group demand before taking min/mean/max
    #[arg(short, long, value_enum, default_value = "season")]
    grouping: Grouping,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    output: OutputFormat,

    /// Include links commissioned after 2011 in the interconnector sum
    #[arg(long)]
    all_interconnectors: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Grouping {
    Season,
    SeasonYear,
    Hour,
    Diurnal,
    Month,
}

impl Grouping {
    fn keys(&self) -> &'static [GroupKey] {
        match self {
            Grouping::Season => &[GroupKey::Season],
            Grouping::SeasonYear => &[GroupKey::Season, GroupKey::Year],
            Grouping::Hour => &[GroupKey::Hour],
            Grouping::Diurnal => &[GroupKey::Season, GroupKey::Hour],
            Grouping::Month => &[GroupKey::Month],
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn group_label(stats: &DemandStats) -> String {
    let mut parts = Vec::new();
    if let Some(season) = stats.season {
        parts.push(season.to_string());
    }
    if let Some(year) = stats.year {
        parts.push(year.to_string());
    }
    if let Some(month) = stats.month {
        parts.push(format!("month {:02}", month));
    }
    if let Some(hour) = stats.hour {
        parts.push(format!("{:02}:{:02}", hour.trunc() as u32, (hour.fract() * 60.0).round() as u32));
    }
    parts.join(" ")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = DemandConfig::new(&args.data_dir);
    if !args.prefix.is_empty() {
        config.file_prefixes = args.prefix.clone();
    }
    if args.all_interconnectors {
        config = config.with_all_interconnectors();
    }

    info!("Loading demand data from {}", config.raw_data_dir.display());
    let df = load_dataset(&config)?;

    let calculator = DemandCalculator::new(&config.demand_column);
    let stats = calculator.stats_by(&df, args.grouping.keys())?;
    info!("Computed {} groups", stats.len());

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&stats)?;
            println!("{}", json);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            for row in &stats {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        OutputFormat::Summary => {
            let summary = calculator.summarize(&df)?;

            println!("GB National Demand Summary");
            println!("==========================");
            println!("Rows: {}", summary.rows);
            if let (Some(first), Some(last)) = (summary.first_timestamp, summary.last_timestamp) {
                println!("Period: {} to {}", first, last);
            }
            if let Some(mean) = summary.mean_demand {
                println!("Mean demand: {:.0} MW", mean);
            }
            if let Some(peak) = summary.peak_demand {
                println!("Peak demand: {:.0} MW", peak);
            }
            if let Some(flow) = summary.mean_interconnector_flow {
                println!("Mean interconnector flow: {:.0} MW into GB", flow);
            }
            println!();
            println!("{:<24} {:>10} {:>10} {:>10} {:>8}", "Group", "Min", "Mean", "Max", "Count");
            for row in &stats {
                println!(
                    "{:<24} {:>10.0} {:>10.0} {:>10.0} {:>8}",
                    group_label(row),
                    row.min,
                    row.mean,
                    row.max,
                    row.count
                );
            }
        }
    }

    Ok(())
}
