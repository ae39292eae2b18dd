use crate::chart_text::{
    format_thousands, interconnector_description, wrap_text, NATIONAL_DEMAND_DESCRIPTION,
    TITLE_WRAP_WIDTH,
};
use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDateTime};
use demand_calculator::calculator::{mean, resample_mean, rolling_mean};
use demand_calculator::models::{INTERCONNECTOR_FLOW, ROLLING_1_YEAR, ROLLING_28_DAYS};
use demand_calculator::{DemandCalculator, DemandConfig, DemandStats, Resample, Season, TimePoint};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

const NAVY: RGBColor = RGBColor(0x00, 0x37, 0x63);
const VERMILION: RGBColor = RGBColor(0xff, 0x39, 0x02);
const LEAF: RGBColor = RGBColor(0x4c, 0xaf, 0x50);
const BARK: RGBColor = RGBColor(0x8d, 0x6e, 0x63);

const TITLE_LINE_HEIGHT: u32 = 20;

// Resampled points further apart than this mark a missing bucket
const MONTHLY_MAX_GAP_DAYS: i64 = 45;
const ANNUAL_MAX_GAP_DAYS: i64 = 400;

/// One line on a time-axis chart.
struct TrendLayer {
    label: String,
    points: Vec<TimePoint>,
    color: RGBAColor,
    width: u32,
    dashed: bool,
    max_gap: Option<Duration>,
}

pub struct DemandVisualizer {
    config: DemandConfig,
    calculator: DemandCalculator,
    df: DataFrame,
}

impl DemandVisualizer {
    pub fn new(config: DemandConfig, df: DataFrame) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        let calculator = DemandCalculator::new(&config.demand_column);

        Ok(Self {
            config,
            calculator,
            df,
        })
    }

    pub fn generate_all_visualizations(&self) -> Result<()> {
        println!("📊 Generating GB National Demand Charts");
        println!("{}", "=".repeat(80));

        self.generate_demand_trend_chart()?;
        self.generate_diurnal_chart()?;
        self.generate_seasonal_yearly_chart()?;
        self.generate_hourly_profile_chart()?;

        if self.df.column(INTERCONNECTOR_FLOW).is_ok() {
            self.generate_interconnector_chart()?;
        } else {
            println!("  ⚠️  No interconnector columns in data, skipping flow chart");
        }

        Ok(())
    }

    fn output_path(&self, file_name: &str) -> PathBuf {
        self.config.output_dir.join(file_name)
    }

    pub fn generate_demand_trend_chart(&self) -> Result<PathBuf> {
        println!("\n📈 Generating National Demand Trend Chart...");

        let demand = self.calculator.demand_series(&self.df)?;
        let rows = self.calculator.demand_rows(&self.df)?;
        let monthly_rolling = rolling_mean(&rows, ROLLING_28_DAYS);
        let yearly_rolling = rolling_mean(&rows, ROLLING_1_YEAR);

        let layers = vec![
            TrendLayer {
                label: "Settlement period (30min) average".to_string(),
                points: demand,
                color: BLACK.mix(0.2),
                width: 1,
                dashed: false,
                max_gap: None,
            },
            TrendLayer {
                label: "28-day rolling average".to_string(),
                points: monthly_rolling,
                color: NAVY.to_rgba(),
                width: 2,
                dashed: true,
                max_gap: None,
            },
            TrendLayer {
                label: "1-year rolling average".to_string(),
                points: yearly_rolling,
                color: VERMILION.to_rgba(),
                width: 2,
                dashed: false,
                max_gap: None,
            },
        ];

        let output_path = self.output_path("demand_trend.png");
        let title = wrap_text(NATIONAL_DEMAND_DESCRIPTION, TITLE_WRAP_WIDTH);
        draw_trend_chart(&output_path, &title, "National Energy Demand (MW)", &layers)?;

        println!("  ✅ Saved {}", output_path.display());
        Ok(output_path)
    }

    pub fn generate_interconnector_chart(&self) -> Result<PathBuf> {
        println!("\n🔌 Generating Interconnector Flow Chart...");

        let flow = self.calculator.interconnector_series(&self.df)?;
        let mean_flow = mean(&flow).ok_or_else(|| anyhow!("No interconnector flow values"))?;
        let monthly = resample_mean(&flow, Resample::MonthStart);
        let annual = resample_mean(&flow, Resample::YearStart);

        let links: Vec<String> = self
            .config
            .interconnectors
            .iter()
            .filter(|link| self.df.column(link.as_str()).is_ok())
            .cloned()
            .collect();
        let title = wrap_text(&interconnector_description(&links, mean_flow), TITLE_WRAP_WIDTH);

        let layers = vec![
            TrendLayer {
                label: "Settlement period (30min) average".to_string(),
                points: flow,
                color: BLACK.mix(0.2),
                width: 1,
                dashed: false,
                max_gap: None,
            },
            TrendLayer {
                label: "Monthly average".to_string(),
                points: monthly,
                color: NAVY.to_rgba(),
                width: 2,
                dashed: true,
                max_gap: Some(Duration::days(MONTHLY_MAX_GAP_DAYS)),
            },
            TrendLayer {
                label: "Annual average".to_string(),
                points: annual,
                color: VERMILION.to_rgba(),
                width: 2,
                dashed: false,
                max_gap: Some(Duration::days(ANNUAL_MAX_GAP_DAYS)),
            },
        ];

        let output_path = self.output_path("interconnector_flow.png");
        draw_trend_chart(&output_path, &title, "Interconnector Flow (MW)", &layers)?;

        println!("  Mean flow: {}MW into GB", format_thousands(mean_flow));
        println!("  ✅ Saved {}", output_path.display());
        Ok(output_path)
    }

    pub fn generate_diurnal_chart(&self) -> Result<PathBuf> {
        println!("\n🌗 Generating Diurnal Profiles by Season...");

        let stats = self.calculator.diurnal_stats(&self.df)?;
        let output_path = self.output_path("diurnal_by_season.png");
        draw_diurnal_chart(&output_path, &stats)?;

        println!("  ✅ Saved {}", output_path.display());
        Ok(output_path)
    }

    pub fn generate_hourly_profile_chart(&self) -> Result<PathBuf> {
        println!("\n🕐 Generating Hourly Demand Profile...");

        let stats = self.calculator.hourly_stats(&self.df)?;
        let output_path = self.output_path("hourly_profile.png");
        draw_hourly_chart(&output_path, &stats)?;

        println!("  ✅ Saved {}", output_path.display());
        Ok(output_path)
    }

    pub fn generate_seasonal_yearly_chart(&self) -> Result<PathBuf> {
        println!("\n📅 Generating Seasonal Demand by Year...");

        let stats = self.calculator.seasonal_yearly_stats(&self.df)?;
        let output_path = self.output_path("seasonal_by_year.png");
        draw_seasonal_yearly_chart(&output_path, &stats)?;

        println!("  ✅ Saved {}", output_path.display());
        Ok(output_path)
    }
}

fn season_color(season: Season) -> RGBColor {
    match season {
        Season::Spring => LEAF,
        Season::Summer => VERMILION,
        Season::Autumn => BARK,
        Season::Winter => NAVY,
    }
}

/// Rows for one season (or the all-data profile when `season` is None),
/// as (hour, stats) in hour order.
fn season_profile(stats: &[DemandStats], season: Option<Season>) -> Vec<(f64, &DemandStats)> {
    let mut rows: Vec<(f64, &DemandStats)> = stats
        .iter()
        .filter(|s| season.is_none() || s.season == season)
        .filter_map(|s| s.hour.map(|hour| (hour, s)))
        .collect();
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    rows
}

/// Outline of the min-max band: along the maxima, back along the minima.
fn band_polygon(rows: &[(f64, &DemandStats)]) -> Vec<(f64, f64)> {
    rows.iter()
        .map(|(hour, s)| (*hour, s.max))
        .chain(rows.iter().rev().map(|(hour, s)| (*hour, s.min)))
        .collect()
}

/// Axis range covering all finite values with 5% headroom each side.
fn padded_range(values: impl Iterator<Item = f64>) -> Result<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(v), max.max(v)));
    if min > max {
        return Err(anyhow!("No values to chart"));
    }
    let padding = if (max - min).abs() > 1e-6 { (max - min) * 0.05 } else { 1.0 };
    Ok((min - padding, max + padding))
}

fn time_range(layers: &[TrendLayer]) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let mut timestamps = layers.iter().flat_map(|l| l.points.iter().map(|p| p.timestamp));
    let first = timestamps.next().ok_or_else(|| anyhow!("No points to chart"))?;
    let (start, end) = timestamps.fold((first, first), |(min, max), t| (min.min(t), max.max(t)));
    if start == end {
        return Err(anyhow!("Need more than one timestamp to chart"));
    }
    Ok((start, end))
}

/// Runs of consecutive points no further apart than `max_gap`, so a line
/// breaks where data is missing. `None` keeps the series whole.
fn split_at_gaps(points: &[TimePoint], max_gap: Option<Duration>) -> Vec<&[TimePoint]> {
    if points.is_empty() {
        return Vec::new();
    }
    let Some(max_gap) = max_gap else {
        return vec![points];
    };

    let mut segments = Vec::new();
    let mut start = 0;
    for idx in 1..points.len() {
        if points[idx].timestamp - points[idx - 1].timestamp > max_gap {
            segments.push(&points[start..idx]);
            start = idx;
        }
    }
    segments.push(&points[start..]);
    segments
}

fn draw_title(area: &DrawingArea<BitMapBackend, Shift>, lines: &[String]) -> Result<()> {
    let style = TextStyle::from(("sans-serif", 16).into_font());
    for (idx, line) in lines.iter().enumerate() {
        let y = 8 + (idx as u32 * TITLE_LINE_HEIGHT) as i32;
        area.draw_text(line, &style, (20, y))?;
    }
    Ok(())
}

fn draw_profile(
    chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    rows: &[(f64, &DemandStats)],
    label: &str,
) -> Result<()> {
    chart.draw_series(std::iter::once(Polygon::new(
        band_polygon(rows),
        BLACK.mix(0.2).filled(),
    )))?;

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|(hour, s)| (*hour, s.mean)),
            NAVY.stroke_width(2),
        ))?
        .label(label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], NAVY.stroke_width(2)));

    Ok(())
}

fn draw_diurnal_chart(path: &Path, stats: &[DemandStats]) -> Result<()> {
    let (y_min, y_max) = padded_range(stats.iter().flat_map(|s| [s.min, s.max]))?;

    let root = BitMapBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        "Diurnal national energy demand (GW) by season",
        ("sans-serif", 20).into_font(),
    )?;

    let panels = root.split_evenly((Season::ALL.len(), 1));
    let hour_formatter = |hour: &f64| format!("{:.0}", hour);
    let gw_formatter = |mw: &f64| format_thousands(mw / 1000.0);

    for (idx, (panel, season)) in panels.iter().zip(Season::ALL).enumerate() {
        let rows = season_profile(stats, Some(season));
        if rows.is_empty() {
            println!("  ⚠️  No {} data", season);
            continue;
        }
        let is_last = idx == panels.len() - 1;

        let mut chart = ChartBuilder::on(panel)
            .margin(8)
            .x_label_area_size(if is_last { 40 } else { 20 })
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..24f64, y_min..y_max)?;

        let mut mesh = chart.configure_mesh();
        mesh.x_labels(25)
            .y_labels(5)
            .light_line_style(BLACK.mix(0.05))
            .x_label_formatter(&hour_formatter)
            .y_label_formatter(&gw_formatter);
        if is_last {
            mesh.x_desc("Hour of the day");
        }
        mesh.draw()?;

        draw_profile(&mut chart, &rows, season.as_str())?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_hourly_chart(path: &Path, stats: &[DemandStats]) -> Result<()> {
    let rows = season_profile(stats, None);
    let (y_min, y_max) = padded_range(stats.iter().flat_map(|s| [s.min, s.max]))?;

    let root = BitMapBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let hour_formatter = |hour: &f64| format!("{:.0}", hour);
    let gw_formatter = |mw: &f64| format_thousands(mw / 1000.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("National energy demand (GW) by hour of day", ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..24f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(25)
        .light_line_style(BLACK.mix(0.05))
        .x_desc("Hour of the day")
        .y_desc("GW")
        .x_label_formatter(&hour_formatter)
        .y_label_formatter(&gw_formatter)
        .draw()?;

    draw_profile(&mut chart, &rows, "All seasons")?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_seasonal_yearly_chart(path: &Path, stats: &[DemandStats]) -> Result<()> {
    let years: Vec<i32> = stats.iter().filter_map(|s| s.year).collect();
    let first_year = *years.iter().min().ok_or_else(|| anyhow!("No yearly demand data"))?;
    let last_year = *years.iter().max().ok_or_else(|| anyhow!("No yearly demand data"))?;
    let (y_min, y_max) = padded_range(stats.iter().map(|s| s.mean))?;

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Mean national energy demand by season and year", ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d((first_year - 1)..(last_year + 1), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels((last_year - first_year + 3) as usize)
        .light_line_style(BLACK.mix(0.05))
        .x_desc("Year")
        .y_desc("Mean National Demand (MW)")
        .y_label_formatter(&|v: &f64| format_thousands(*v))
        .draw()?;

    for season in Season::ALL {
        let color = season_color(season);
        let line: Vec<(i32, f64)> = stats
            .iter()
            .filter(|s| s.season == Some(season))
            .filter_map(|s| s.year.map(|year| (year, s.mean)))
            .collect();
        if line.is_empty() {
            continue;
        }

        chart
            .draw_series(LineSeries::new(line.iter().copied(), color.stroke_width(2)))?
            .label(season.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(line.iter().map(|&(year, value)| Circle::new((year, value), 3, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_trend_chart(path: &Path, title: &[String], y_desc: &str, layers: &[TrendLayer]) -> Result<()> {
    let (start, end) = time_range(layers)?;
    let (y_min, y_max) = padded_range(layers.iter().flat_map(|l| l.points.iter().map(|p| p.value)))?;

    let root = BitMapBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let title_height = TITLE_LINE_HEIGHT * title.len() as u32 + 16;
    let (title_area, plot_area) = root.split_vertically(title_height);
    draw_title(&title_area, title)?;

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(RangedDateTime::from(start..end), y_min..y_max)?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .y_desc(y_desc)
        .x_label_formatter(&|dt: &NaiveDateTime| dt.format("%Y").to_string())
        .y_label_formatter(&|v: &f64| format_thousands(*v))
        .draw()?;

    for layer in layers {
        let color = layer.color;
        let style = color.stroke_width(layer.width);

        for (idx, segment) in split_at_gaps(&layer.points, layer.max_gap).into_iter().enumerate() {
            let data = segment.iter().map(|p| (p.timestamp, p.value));
            let series = if layer.dashed {
                chart.draw_series(DashedLineSeries::new(data, 10, 6, style))?
            } else {
                chart.draw_series(LineSeries::new(data, style))?
            };
            if idx == 0 {
                series
                    .label(layer.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
