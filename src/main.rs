use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};
use demand_calculator::models::{NATIONAL_DEMAND, TIMESTAMP};
use demand_calculator::DemandConfig;
use polars::prelude::{ChunkAgg, DataFrame};
use std::path::PathBuf;

mod annual_processor;
mod chart_text;
mod demand_visualization;

use annual_processor::AnnualProcessor;
use demand_visualization::DemandVisualizer;

const CHART_FLAGS: [&str; 6] = ["--trend", "--diurnal", "--seasonal", "--hourly", "--interconnectors", "--all"];

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

fn build_config(args: &[String]) -> DemandConfig {
    let data_dir = if let Some(dir) = flag_value(args, "--data-dir") {
        PathBuf::from(dir)
    } else if has_flag(args, "--test") {
        PathBuf::from("test_data")
    } else {
        DemandConfig::default().raw_data_dir
    };

    let mut config = DemandConfig::new(data_dir);
    if let Some(dir) = flag_value(args, "--output-dir") {
        config = config.with_output_dir(dir);
    }
    if has_flag(args, "--all-interconnectors") {
        config.with_all_interconnectors()
    } else {
        config
    }
}

fn print_dataset_overview(df: &DataFrame) -> Result<()> {
    let demand = df.column(NATIONAL_DEMAND)?;
    println!("📈 Loaded {} half-hourly records", df.height());
    println!("  Columns: {:?}", df.get_column_names());
    if let Some((start, end)) = timestamp_span(df)? {
        println!("  Range: {} → {}", start, end);
    }
    println!("  Missing {} values: {}", NATIONAL_DEMAND, demand.null_count());
    Ok(())
}

/// First and last timestamp in the dataset.
fn timestamp_span(df: &DataFrame) -> Result<Option<(NaiveDateTime, NaiveDateTime)>> {
    let timestamps = df.column(TIMESTAMP)?.datetime()?;
    let millis = timestamps.physical();
    let to_naive = |ms: i64| DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc());
    Ok(millis
        .min()
        .and_then(to_naive)
        .zip(millis.max().and_then(to_naive)))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()?;

    let args: Vec<String> = std::env::args().collect();

    println!("🚀 GB National Demand - Rust Processor");
    println!("Using {} CPU cores", num_cpus::get());
    println!("Rayon thread pool configured with {} threads", rayon::current_num_threads());
    println!("{}", "=".repeat(60));

    let config = build_config(&args);
    println!("📁 Reading demand files from {}", config.raw_data_dir.display());

    let df = demand_calculator::load_dataset(&config)?;
    print_dataset_overview(&df)?;

    if has_flag(&args, "--export") {
        AnnualProcessor::new(PathBuf::from("annual_data")).export_by_year(&df)?;
        if !CHART_FLAGS.iter().any(|flag| has_flag(&args, flag)) {
            return Ok(());
        }
    }

    let visualizer = DemandVisualizer::new(config, df)?;

    let selected: Vec<&str> = CHART_FLAGS[..5]
        .iter()
        .copied()
        .filter(|flag| has_flag(&args, flag))
        .collect();

    if selected.is_empty() || has_flag(&args, "--all") {
        visualizer.generate_all_visualizations()?;
    } else {
        for flag in selected {
            match flag {
                "--trend" => visualizer.generate_demand_trend_chart()?,
                "--diurnal" => visualizer.generate_diurnal_chart()?,
                "--seasonal" => visualizer.generate_seasonal_yearly_chart()?,
                "--hourly" => visualizer.generate_hourly_profile_chart()?,
                _ => visualizer.generate_interconnector_chart()?,
            };
        }
    }

    println!("\n✅ Done");
    Ok(())
}
