use crate::models::{
    Season, HOUR, INTERCONNECTOR_FLOW, MONTH, SEASON, SETTLEMENT_DATE, SETTLEMENT_PERIOD,
    TIMESTAMP, YEAR,
};
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use log::{info, warn};
use polars::prelude::*;

/// Clock-change days run to 50 settlement periods.
pub const MAX_SETTLEMENT_PERIOD: i64 = 50;

const DAY_FIRST_FORMATS: [&str; 5] = ["%d-%b-%Y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y"];

/// Parse a settlement date, reading ambiguous forms day first.
pub fn parse_settlement_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    // ISO dates are unambiguous, and may carry a time we don't need
    if let Some(date) = raw
        .get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
    {
        return Some(date);
    }

    let first_token = raw.split_whitespace().next().unwrap_or(raw);
    [raw, first_token].iter().find_map(|candidate| {
        DAY_FIRST_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(candidate, format).ok())
    })
}

/// Start of a settlement period: midnight plus (period - 1) half hours.
pub fn settlement_period_start(date: NaiveDate, period: i64) -> Result<NaiveDateTime> {
    if !(1..=MAX_SETTLEMENT_PERIOD).contains(&period) {
        bail!("Settlement period {} outside 1..={}", period, MAX_SETTLEMENT_PERIOD);
    }
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid settlement date {}", date))?;
    Ok(midnight + Duration::minutes(30 * (period - 1)))
}

/// Fractional hour of day, e.g. 13:30 -> 13.5
pub fn fractional_hour(timestamp: &NaiveDateTime) -> f64 {
    timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0
}

pub struct DemandTransformer {
    interconnectors: Vec<String>,
}

impl DemandTransformer {
    pub fn new(interconnectors: &[String]) -> Self {
        Self {
            interconnectors: interconnectors.to_vec(),
        }
    }

    /// Full pass over the merged raw frame.
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let df = self.reconstruct_timestamps(df)?;
        report_duplicate_timestamps(&df)?;
        let df = self.add_calendar_features(df)?;
        self.add_interconnector_flow(df)
    }

    /// Replace settlement date + period with a single timestamp column,
    /// sorted ascending.
    pub fn reconstruct_timestamps(&self, mut df: DataFrame) -> Result<DataFrame> {
        let dates = df.column(SETTLEMENT_DATE)?.cast(&DataType::String)?;
        let dates = dates.str()?;
        let periods = df.column(SETTLEMENT_PERIOD)?.cast(&DataType::Int64)?;
        let periods = periods.i64()?;

        let mut timestamps: Vec<i64> = Vec::with_capacity(df.height());
        for (row, (date, period)) in dates.into_iter().zip(periods.into_iter()).enumerate() {
            let (Some(raw_date), Some(period)) = (date, period) else {
                bail!("Row {} is missing its settlement date or period", row);
            };
            let date = parse_settlement_date(raw_date)
                .ok_or_else(|| anyhow!("Row {}: unrecognised settlement date '{}'", row, raw_date))?;
            let start = settlement_period_start(date, period)
                .map_err(|e| anyhow!("Row {}: {}", row, e))?;
            timestamps.push(start.and_utc().timestamp_millis());
        }

        let timestamp_series = Series::new(TIMESTAMP.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        df.with_column(timestamp_series)?;

        let df = df
            .drop(SETTLEMENT_PERIOD)?
            .drop(SETTLEMENT_DATE)?
            .sort([TIMESTAMP], SortMultipleOptions::default())?;

        Ok(df)
    }

    /// Add month, calendar year, season label and fractional hour columns.
    pub fn add_calendar_features(&self, mut df: DataFrame) -> Result<DataFrame> {
        let timestamps = timestamp_values(&df)?;

        let mut months = Vec::with_capacity(timestamps.len());
        let mut years = Vec::with_capacity(timestamps.len());
        let mut seasons = Vec::with_capacity(timestamps.len());
        let mut hours = Vec::with_capacity(timestamps.len());

        for timestamp in &timestamps {
            let month = timestamp.month();
            let season = Season::from_month(month)
                .ok_or_else(|| anyhow!("No season for month {}", month))?;
            months.push(month as i32);
            years.push(timestamp.year());
            seasons.push(season.as_str());
            hours.push(fractional_hour(timestamp));
        }

        df.with_column(Series::new(MONTH.into(), months))?;
        df.with_column(Series::new(YEAR.into(), years))?;
        df.with_column(Series::new(SEASON.into(), seasons))?;
        df.with_column(Series::new(HOUR.into(), hours))?;

        Ok(df)
    }

    /// Sum the configured interconnector columns, counting nulls as zero.
    pub fn add_interconnector_flow(&self, df: DataFrame) -> Result<DataFrame> {
        let (present, missing): (Vec<&String>, Vec<&String>) = self
            .interconnectors
            .iter()
            .partition(|name| df.column(name.as_str()).is_ok());

        if !missing.is_empty() {
            warn!("Interconnector columns not in data: {:?}", missing);
        }
        if present.is_empty() {
            warn!("No interconnector columns found, skipping {}", INTERCONNECTOR_FLOW);
            return Ok(df);
        }

        let flow = present.iter().fold(lit(0.0), |acc, name| {
            acc + col(name.as_str()).cast(DataType::Float64).fill_null(lit(0.0))
        });

        let df = df
            .lazy()
            .with_column(flow.alias(INTERCONNECTOR_FLOW))
            .collect()?;
        Ok(df)
    }
}

/// Timestamp column as chrono values.
pub fn timestamp_values(df: &DataFrame) -> Result<Vec<NaiveDateTime>> {
    let millis = df.column(TIMESTAMP)?.cast(&DataType::Int64)?;
    millis
        .i64()?
        .into_iter()
        .map(|value| {
            value
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| anyhow!("Null or invalid {} value", TIMESTAMP))
        })
        .collect()
}

/// Count rows whose timestamp repeats an earlier row, logging a warning
/// when there are any. Duplicates are kept.
pub fn report_duplicate_timestamps(df: &DataFrame) -> Result<usize> {
    let unique = df.column(TIMESTAMP)?.n_unique()?;
    let duplicates = df.height() - unique;
    if duplicates > 0 {
        warn!("{} rows share a timestamp with an earlier row", duplicates);
    } else {
        info!("No duplicate timestamps");
    }
    Ok(duplicates)
}
