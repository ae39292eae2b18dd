use chrono::{Duration, NaiveDate};
use demand_calculator::models::{NATIONAL_DEMAND, SETTLEMENT_DATE, SETTLEMENT_PERIOD};
use demand_calculator::{DemandCalculator, DemandTransformer};
use polars::prelude::*;

fn main() -> anyhow::Result<()> {
    // One synthetic year: higher in winter, evening peak every day
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut dates = Vec::new();
    let mut periods = Vec::new();
    let mut demand = Vec::new();

    for day in 0..365 {
        let date = start + Duration::days(day);
        let winter_uplift = 6000.0 * ((day as f64 / 365.0) * std::f64::consts::TAU).cos();
        for period in 1..=48i64 {
            let evening_peak = if (34..=38).contains(&period) { 4000.0 } else { 0.0 };
            dates.push(date.format("%d-%b-%Y").to_string());
            periods.push(period);
            demand.push(28000.0 + winter_uplift + evening_peak);
        }
    }

    let raw = df! {
        SETTLEMENT_DATE => dates,
        SETTLEMENT_PERIOD => periods,
        NATIONAL_DEMAND => demand,
    }?;

    let df = DemandTransformer::new(&[]).transform(raw)?;
    let calculator = DemandCalculator::new(NATIONAL_DEMAND);

    println!("Seasonal demand (MW)");
    for stats in calculator.seasonal_stats(&df)? {
        if let Some(season) = stats.season {
            println!(
                "  {:<7} min {:>6.0}  mean {:>6.0}  max {:>6.0}",
                season, stats.min, stats.mean, stats.max
            );
        }
    }

    println!("\nWinter evening profile");
    for stats in calculator.diurnal_stats(&df)? {
        if stats.season == Some(demand_calculator::Season::Winter) {
            if let Some(hour) = stats.hour.filter(|h| (16.0..=20.0).contains(h)) {
                println!("  {:>5.1}h  mean {:>6.0} MW", hour, stats.mean);
            }
        }
    }

    Ok(())
}
