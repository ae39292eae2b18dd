use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// Raw columns every demand file carries
pub const SETTLEMENT_DATE: &str = "SETTLEMENT_DATE";
pub const SETTLEMENT_PERIOD: &str = "SETTLEMENT_PERIOD";
pub const NATIONAL_DEMAND: &str = "ND";

// Derived columns
pub const TIMESTAMP: &str = "timestamp";
pub const MONTH: &str = "month";
pub const YEAR: &str = "year";
pub const SEASON: &str = "season";
pub const HOUR: &str = "hour";
pub const INTERCONNECTOR_FLOW: &str = "interconnector_flow";

pub const SETTLEMENT_PERIODS_PER_DAY: usize = 48;
pub const ROLLING_28_DAYS: usize = SETTLEMENT_PERIODS_PER_DAY * 28;
pub const ROLLING_1_YEAR: usize = SETTLEMENT_PERIODS_PER_DAY * 365;

/// Links reported since the start of the published history.
pub const CLASSIC_INTERCONNECTORS: [&str; 4] =
    ["FRENCH_FLOW", "BRITNED_FLOW", "MOYLE_FLOW", "EAST_WEST_FLOW"];

/// Links added to the extracts as they were commissioned.
pub const NEWER_INTERCONNECTORS: [&str; 6] = [
    "NEMO_FLOW",
    "IFA2_FLOW",
    "NSL_FLOW",
    "ELECLINK_FLOW",
    "VIKING_FLOW",
    "GREENLINK_FLOW",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandConfig {
    pub raw_data_dir: PathBuf,
    pub file_prefixes: Vec<String>,
    pub demand_column: String,
    pub interconnectors: Vec<String>,
    pub output_dir: PathBuf,
}

impl DemandConfig {
    pub fn new(raw_data_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_data_dir: raw_data_dir.into(),
            file_prefixes: vec!["DemandData_".to_string(), "Demand_Data".to_string()],
            demand_column: NATIONAL_DEMAND.to_string(),
            interconnectors: CLASSIC_INTERCONNECTORS.iter().map(|c| c.to_string()).collect(),
            output_dir: PathBuf::from("charts"),
        }
    }

    pub fn with_all_interconnectors(mut self) -> Self {
        self.interconnectors = CLASSIC_INTERCONNECTORS
            .iter()
            .chain(NEWER_INTERCONNECTORS.iter())
            .map(|c| c.to_string())
            .collect();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self::new("data_raw")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Plotting order, top panel first.
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Autumn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|season| season.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown season '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Season,
    Year,
    Month,
    Hour,
}

impl GroupKey {
    pub fn column(&self) -> &'static str {
        match self {
            GroupKey::Season => SEASON,
            GroupKey::Year => YEAR,
            GroupKey::Month => MONTH,
            GroupKey::Hour => HOUR,
        }
    }
}

/// Min/mean/max of demand for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandStats {
    pub season: Option<Season>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub hour: Option<f64>,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub mean_demand: Option<f64>,
    pub peak_demand: Option<f64>,
    pub mean_interconnector_flow: Option<f64>,
}
