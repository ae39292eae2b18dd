use crate::models::{
    DatasetSummary, DemandStats, GroupKey, Season, TimePoint, INTERCONNECTOR_FLOW,
};
use crate::transform::timestamp_values;
use anyhow::{anyhow, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Calendar buckets for resampled means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    MonthStart,
    YearStart,
}

impl Resample {
    /// Where a bucket's mean is plotted: mid-month or mid-year.
    fn label_offset(&self) -> Duration {
        match self {
            Resample::MonthStart => Duration::days(15),
            Resample::YearStart => Duration::days(183),
        }
    }

    fn bucket(&self, timestamp: &NaiveDateTime) -> (i32, u32) {
        match self {
            Resample::MonthStart => (timestamp.year(), timestamp.month()),
            Resample::YearStart => (timestamp.year(), 1),
        }
    }
}

pub struct DemandCalculator {
    demand_column: String,
}

impl DemandCalculator {
    pub fn new(demand_column: &str) -> Self {
        Self {
            demand_column: demand_column.to_string(),
        }
    }

    /// Min, mean and max of demand per group, as a frame with
    /// `Min`, `Mean`, `Max` and `Count` columns after the keys.
    pub fn group_stats(&self, df: &DataFrame, keys: &[GroupKey]) -> Result<DataFrame> {
        let key_exprs: Vec<Expr> = keys.iter().map(|key| col(key.column())).collect();
        let demand = col(self.demand_column.as_str());

        let grouped = df
            .clone()
            .lazy()
            .group_by(key_exprs)
            .agg([
                demand.clone().min().alias("Min"),
                demand.clone().mean().alias("Mean"),
                demand.clone().max().alias("Max"),
                demand.count().alias("Count"),
            ])
            .collect()?;

        Ok(grouped)
    }

    /// Grouped statistics as typed rows, sorted by season order then year,
    /// month and hour. Groups with no demand values are dropped.
    pub fn stats_by(&self, df: &DataFrame, keys: &[GroupKey]) -> Result<Vec<DemandStats>> {
        let grouped = self.group_stats(df, keys)?;

        let seasons = optional_column(&grouped, keys, GroupKey::Season, &DataType::String)?;
        let years = optional_column(&grouped, keys, GroupKey::Year, &DataType::Int32)?;
        let months = optional_column(&grouped, keys, GroupKey::Month, &DataType::Int32)?;
        let hours = optional_column(&grouped, keys, GroupKey::Hour, &DataType::Float64)?;

        let mins = grouped.column("Min")?.cast(&DataType::Float64)?;
        let means = grouped.column("Mean")?.cast(&DataType::Float64)?;
        let maxs = grouped.column("Max")?.cast(&DataType::Float64)?;
        let counts = grouped.column("Count")?.cast(&DataType::UInt64)?;
        let (mins, means, maxs, counts) = (mins.f64()?, means.f64()?, maxs.f64()?, counts.u64()?);

        let mut stats = Vec::with_capacity(grouped.height());
        for idx in 0..grouped.height() {
            let (Some(min), Some(mean), Some(max), Some(count)) =
                (mins.get(idx), means.get(idx), maxs.get(idx), counts.get(idx))
            else {
                continue;
            };

            let season = match &seasons {
                Some(s) => s.str()?.get(idx).map(str::parse::<Season>).transpose()?,
                None => None,
            };
            let year = match &years {
                Some(s) => s.i32()?.get(idx),
                None => None,
            };
            let month = match &months {
                Some(s) => s.i32()?.get(idx).map(|m| m as u32),
                None => None,
            };
            let hour = match &hours {
                Some(s) => s.f64()?.get(idx),
                None => None,
            };

            stats.push(DemandStats {
                season,
                year,
                month,
                hour,
                min,
                mean,
                max,
                count,
            });
        }

        stats.sort_by(|a, b| {
            a.season
                .cmp(&b.season)
                .then(a.year.cmp(&b.year))
                .then(a.month.cmp(&b.month))
                .then(a.hour.partial_cmp(&b.hour).unwrap_or(Ordering::Equal))
        });

        Ok(stats)
    }

    pub fn seasonal_stats(&self, df: &DataFrame) -> Result<Vec<DemandStats>> {
        self.stats_by(df, &[GroupKey::Season])
    }

    pub fn seasonal_yearly_stats(&self, df: &DataFrame) -> Result<Vec<DemandStats>> {
        self.stats_by(df, &[GroupKey::Season, GroupKey::Year])
    }

    pub fn hourly_stats(&self, df: &DataFrame) -> Result<Vec<DemandStats>> {
        self.stats_by(df, &[GroupKey::Hour])
    }

    /// Season by hour-of-day profile.
    pub fn diurnal_stats(&self, df: &DataFrame) -> Result<Vec<DemandStats>> {
        self.stats_by(df, &[GroupKey::Season, GroupKey::Hour])
    }

    pub fn monthly_stats(&self, df: &DataFrame) -> Result<Vec<DemandStats>> {
        self.stats_by(df, &[GroupKey::Month])
    }

    pub fn demand_series(&self, df: &DataFrame) -> Result<Vec<TimePoint>> {
        time_series(df, &self.demand_column)
    }

    /// Demand for every row, nulls as NaN, for rolling windows.
    pub fn demand_rows(&self, df: &DataFrame) -> Result<Vec<TimePoint>> {
        time_series_rows(df, &self.demand_column)
    }

    pub fn interconnector_series(&self, df: &DataFrame) -> Result<Vec<TimePoint>> {
        time_series(df, INTERCONNECTOR_FLOW)
    }

    pub fn summarize(&self, df: &DataFrame) -> Result<DatasetSummary> {
        let demand = self.demand_series(df)?;
        let flow = if df.column(INTERCONNECTOR_FLOW).is_ok() {
            self.interconnector_series(df)?
        } else {
            Vec::new()
        };
        let timestamps = timestamp_values(df)?;

        Ok(DatasetSummary {
            rows: df.height(),
            first_timestamp: timestamps.iter().min().copied(),
            last_timestamp: timestamps.iter().max().copied(),
            mean_demand: mean(&demand),
            peak_demand: demand.iter().map(|p| p.value).reduce(f64::max),
            mean_interconnector_flow: mean(&flow),
        })
    }
}

fn optional_column(
    df: &DataFrame,
    keys: &[GroupKey],
    key: GroupKey,
    dtype: &DataType,
) -> Result<Option<Series>> {
    if !keys.contains(&key) {
        return Ok(None);
    }
    Ok(Some(df.column(key.column())?.cast(dtype)?))
}

/// Every row of `column` paired with its timestamp, in time order. Nulls
/// come through as NaN so windowed statistics keep the row positions.
pub fn time_series_rows(df: &DataFrame, column: &str) -> Result<Vec<TimePoint>> {
    let timestamps = timestamp_values(df)?;
    let values = df
        .column(column)
        .map_err(|_| anyhow!("Column {} not in dataset", column))?
        .cast(&DataType::Float64)?;

    let mut points: Vec<TimePoint> = timestamps
        .into_iter()
        .zip(values.f64()?.into_iter())
        .map(|(timestamp, value)| TimePoint::new(timestamp, value.unwrap_or(f64::NAN)))
        .collect();
    points.sort_by_key(|point| point.timestamp);

    Ok(points)
}

/// Non-null values of `column` paired with their timestamps, in time order.
pub fn time_series(df: &DataFrame, column: &str) -> Result<Vec<TimePoint>> {
    let mut points = time_series_rows(df, column)?;
    points.retain(|point| point.value.is_finite());
    Ok(points)
}

/// Centred rolling mean over `window` rows, closed on both ends.
///
/// Row `i` averages rows `i + offset - window ..= i + offset` where
/// `offset = (window - 1) / 2`, clipped to the series. NaN rows are skipped
/// and a row gets a value only when its window holds at least `window`
/// finite samples, so edge rows with a full count still produce output.
pub fn rolling_mean(points: &[TimePoint], window: usize) -> Vec<TimePoint> {
    if window == 0 {
        return Vec::new();
    }
    let len = points.len();
    let offset = (window - 1) / 2;

    let mut sums = Vec::with_capacity(len + 1);
    let mut counts = Vec::with_capacity(len + 1);
    sums.push(0.0);
    counts.push(0usize);
    for point in points {
        let (sum, count) = (sums[sums.len() - 1], counts[counts.len() - 1]);
        if point.value.is_finite() {
            sums.push(sum + point.value);
            counts.push(count + 1);
        } else {
            sums.push(sum);
            counts.push(count);
        }
    }

    (0..len)
        .filter_map(|idx| {
            let end = (idx + 1 + offset).min(len);
            let start = (idx + 1 + offset).saturating_sub(window + 1).min(len);
            let count = counts[end] - counts[start];
            if count < window {
                return None;
            }
            Some(TimePoint::new(points[idx].timestamp, (sums[end] - sums[start]) / count as f64))
        })
        .collect()
}

/// Mean per calendar month or year, labelled mid-bucket.
pub fn resample_mean(points: &[TimePoint], resample: Resample) -> Vec<TimePoint> {
    let mut buckets: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
    for point in points {
        let entry = buckets.entry(resample.bucket(&point.timestamp)).or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .filter_map(|((year, month), (sum, count))| {
            let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
            Some(TimePoint::new(start + resample.label_offset(), sum / count as f64))
        })
        .collect()
}

pub fn mean(points: &[TimePoint]) -> Option<f64> {
    if points.is_empty() {
        None
    } else {
        Some(points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HOUR, MONTH, NATIONAL_DEMAND, SEASON, TIMESTAMP, YEAR};

    fn ts(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").unwrap()
    }

    fn feature_frame() -> DataFrame {
        let timestamps = [
            ts("2019-01-10", "00:00"),
            ts("2019-01-10", "00:30"),
            ts("2019-07-10", "00:00"),
            ts("2019-07-10", "00:30"),
            ts("2020-01-10", "00:00"),
            ts("2020-01-10", "00:30"),
        ];
        let millis: Vec<i64> = timestamps
            .iter()
            .map(|t| t.and_utc().timestamp_millis())
            .collect();

        let mut df = df! {
            NATIONAL_DEMAND => [Some(30000.0), Some(32000.0), Some(20000.0), None, Some(34000.0), Some(36000.0)],
            INTERCONNECTOR_FLOW => [1000.0, 2000.0, -500.0, -1500.0, 3000.0, 4000.0],
            MONTH => [1i32, 1, 7, 7, 1, 1],
            YEAR => [2019i32, 2019, 2019, 2019, 2020, 2020],
            SEASON => ["Winter", "Winter", "Summer", "Summer", "Winter", "Winter"],
            HOUR => [0.0, 0.5, 0.0, 0.5, 0.0, 0.5],
        }
        .unwrap();
        let series = Series::new(TIMESTAMP.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        df.with_column(series).unwrap();
        df
    }

    fn points(values: &[f64]) -> Vec<TimePoint> {
        let start = ts("2020-01-01", "00:00");
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimePoint::new(start + Duration::minutes(30 * i as i64), *v))
            .collect()
    }

    #[test]
    fn test_seasonal_stats() {
        let calculator = DemandCalculator::new(NATIONAL_DEMAND);
        let stats = calculator.seasonal_stats(&feature_frame()).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].season, Some(Season::Summer));
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[0].mean, 20000.0);

        assert_eq!(stats[1].season, Some(Season::Winter));
        assert_eq!(stats[1].min, 30000.0);
        assert_eq!(stats[1].max, 36000.0);
        assert_eq!(stats[1].mean, 33000.0);
        assert_eq!(stats[1].count, 4);
        assert_eq!(stats[1].year, None);
    }

    #[test]
    fn test_seasonal_yearly_stats() {
        let calculator = DemandCalculator::new(NATIONAL_DEMAND);
        let stats = calculator.seasonal_yearly_stats(&feature_frame()).unwrap();

        let keys: Vec<_> = stats.iter().map(|s| (s.season.unwrap(), s.year.unwrap())).collect();
        assert_eq!(
            keys,
            vec![(Season::Summer, 2019), (Season::Winter, 2019), (Season::Winter, 2020)]
        );
        assert_eq!(stats[1].mean, 31000.0);
        assert_eq!(stats[2].mean, 35000.0);
    }

    #[test]
    fn test_hourly_and_diurnal_stats() {
        let calculator = DemandCalculator::new(NATIONAL_DEMAND);
        let df = feature_frame();

        let hourly = calculator.hourly_stats(&df).unwrap();
        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].hour, Some(0.0));
        assert_eq!(hourly[0].min, 20000.0);
        assert_eq!(hourly[0].max, 34000.0);
        assert_eq!(hourly[1].hour, Some(0.5));
        assert_eq!(hourly[1].count, 2);

        let diurnal = calculator.diurnal_stats(&df).unwrap();
        // Summer at 00:30 has only a null reading
        assert_eq!(diurnal.len(), 3);
        assert_eq!(diurnal[0].season, Some(Season::Summer));
        assert_eq!(diurnal[0].hour, Some(0.0));
        assert_eq!(diurnal[2].season, Some(Season::Winter));
        assert_eq!(diurnal[2].hour, Some(0.5));
        assert_eq!(diurnal[2].mean, 34000.0);
    }

    #[test]
    fn test_time_series_skips_nulls() {
        let calculator = DemandCalculator::new(NATIONAL_DEMAND);
        let df = feature_frame();

        let demand = calculator.demand_series(&df).unwrap();
        assert_eq!(demand.len(), 5);
        assert_eq!(demand[0], TimePoint::new(ts("2019-01-10", "00:00"), 30000.0));

        let flow = calculator.interconnector_series(&df).unwrap();
        assert_eq!(flow.len(), 6);
        assert!(time_series(&df, "NO_SUCH_COLUMN").is_err());
    }

    #[test]
    fn test_summarize() {
        let calculator = DemandCalculator::new(NATIONAL_DEMAND);
        let summary = calculator.summarize(&feature_frame()).unwrap();

        assert_eq!(summary.rows, 6);
        assert_eq!(summary.first_timestamp, Some(ts("2019-01-10", "00:00")));
        assert_eq!(summary.last_timestamp, Some(ts("2020-01-10", "00:30")));
        assert_eq!(summary.mean_demand, Some(30400.0));
        assert_eq!(summary.peak_demand, Some(36000.0));
        let flow = summary.mean_interconnector_flow.unwrap();
        assert!((flow - 8000.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_mean_centred_window() {
        let series = points(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);

        // Even window of 4 covers rows i-3..=i+1; edge rows holding four
        // samples still get a value
        let rolled = rolling_mean(&series, 4);
        let expected = [
            (2, 1.5),
            (3, 2.0),
            (4, 3.0),
            (5, 4.0),
            (6, 5.0),
            (7, 6.0),
            (8, 7.0),
            (9, 7.5),
        ];
        assert_eq!(rolled.len(), expected.len());
        for (point, (idx, value)) in rolled.iter().zip(expected) {
            assert_eq!(point.timestamp, series[idx].timestamp);
            assert_eq!(point.value, value);
        }

        // Odd window of 3 covers rows i-2..=i+1
        let rolled = rolling_mean(&points(&[1.0, 2.0, 3.0, 4.0]), 3);
        let values: Vec<f64> = rolled.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 2.5, 3.0]);

        assert_eq!(rolling_mean(&series, 10).len(), 2);
        assert!(rolling_mean(&series, 11).is_empty());
        assert!(rolling_mean(&series, 0).is_empty());
    }

    #[test]
    fn test_rolling_mean_skips_missing_rows() {
        let series = points(&[0.0, 1.0, f64::NAN, 3.0, 4.0, 5.0]);

        let rolled = rolling_mean(&series, 2);
        let values: Vec<f64> = rolled.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.5, 0.5, 2.0, 3.5, 4.0]);
        // The missing row itself still gets a value from its neighbours
        assert_eq!(rolled[1].timestamp, series[2].timestamp);
    }

    #[test]
    fn test_demand_rows_keep_nulls() {
        let calculator = DemandCalculator::new(NATIONAL_DEMAND);
        let rows = calculator.demand_rows(&feature_frame()).unwrap();

        assert_eq!(rows.len(), 6);
        assert!(rows[3].value.is_nan());
        assert_eq!(rows[4], TimePoint::new(ts("2020-01-10", "00:00"), 34000.0));
    }

    #[test]
    fn test_resample_mean() {
        let series = vec![
            TimePoint::new(ts("2019-01-05", "00:00"), 10.0),
            TimePoint::new(ts("2019-01-20", "12:00"), 20.0),
            TimePoint::new(ts("2019-03-01", "00:00"), 40.0),
            TimePoint::new(ts("2020-06-01", "00:00"), 100.0),
        ];

        let monthly = resample_mean(&series, Resample::MonthStart);
        assert_eq!(
            monthly,
            vec![
                TimePoint::new(ts("2019-01-16", "00:00"), 15.0),
                TimePoint::new(ts("2019-03-16", "00:00"), 40.0),
                TimePoint::new(ts("2020-06-16", "00:00"), 100.0),
            ]
        );

        let yearly = resample_mean(&series, Resample::YearStart);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].timestamp, ts("2019-07-03", "00:00"));
        assert!((yearly[0].value - 70.0 / 3.0).abs() < 1e-9);
        // 2020 is a leap year
        assert_eq!(yearly[1].timestamp, ts("2020-07-02", "00:00"));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&points(&[1.0, 2.0, 6.0])), Some(3.0));
    }
}
