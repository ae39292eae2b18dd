use crate::models::{DemandConfig, SETTLEMENT_DATE, SETTLEMENT_PERIOD};
use anyhow::{bail, Context, Result};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use polars::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

pub struct DataLoader {
    raw_data_dir: PathBuf,
    file_prefixes: Vec<String>,
    demand_column: String,
}

impl DataLoader {
    pub fn new(raw_data_dir: impl Into<PathBuf>, file_prefixes: &[String], demand_column: &str) -> Self {
        Self {
            raw_data_dir: raw_data_dir.into(),
            file_prefixes: file_prefixes.to_vec(),
            demand_column: demand_column.to_string(),
        }
    }

    pub fn from_config(config: &DemandConfig) -> Self {
        Self::new(&config.raw_data_dir, &config.file_prefixes, &config.demand_column)
    }

    /// True when the file name starts with one of the demand extract prefixes.
    pub fn matches_prefix(&self, file_name: &str) -> bool {
        self.file_prefixes
            .iter()
            .any(|prefix| file_name.starts_with(prefix.as_str()))
    }

    /// List demand files in the raw data directory, sorted by name.
    pub fn find_demand_files(&self) -> Result<Vec<PathBuf>> {
        if !self.raw_data_dir.is_dir() {
            bail!("Raw data directory {} not found", self.raw_data_dir.display());
        }

        let pattern = self.raw_data_dir.join("*");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Non UTF-8 path: {}", self.raw_data_dir.display()))?;

        let mut files: Vec<PathBuf> = glob(pattern)?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| self.matches_prefix(name))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        Ok(files)
    }

    /// Read one demand CSV with every column as text, then normalise the
    /// column types.
    pub fn load_file(&self, path: &Path) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to open {}", path.display()))?
            .finish()
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        normalize_columns(df, &self.demand_column, path)
    }

    /// Load every matching file and stack the rows into one frame.
    pub fn load_all(&self) -> Result<DataFrame> {
        let files = self.find_demand_files()?;
        if files.is_empty() {
            bail!(
                "No files starting with {:?} found in {}",
                self.file_prefixes,
                self.raw_data_dir.display()
            );
        }

        info!("Loading {} demand files from {}", files.len(), self.raw_data_dir.display());

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );

        let frames: Vec<DataFrame> = files
            .par_iter()
            .map(|path| {
                let df = self.load_file(path)?;
                debug!("{}: {} rows", path.display(), df.height());
                pb.inc(1);
                Ok(df)
            })
            .collect::<Result<Vec<_>>>()?;

        pb.finish_with_message("files loaded");

        for (path, df) in files.iter().zip(&frames) {
            info!(
                "Loaded {} ({} rows)",
                path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
                df.height()
            );
        }

        // Later extracts carry extra interconnector columns
        let combined = concat_lf_diagonal(
            frames.into_iter().map(|df| df.lazy()).collect::<Vec<_>>(),
            UnionArgs::default(),
        )?
        .collect()?;

        info!("Combined dataset: {} rows, {} columns", combined.height(), combined.width());
        Ok(combined)
    }
}

/// Keep the settlement date as text, the period as an integer and every
/// other column as a float so frames from different years stack cleanly.
fn normalize_columns(df: DataFrame, demand_column: &str, path: &Path) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    for required in [SETTLEMENT_DATE, SETTLEMENT_PERIOD, demand_column] {
        if !names.iter().any(|name| name == required) {
            bail!("{} is missing required column {}", path.display(), required);
        }
    }

    let exprs: Vec<Expr> = names
        .iter()
        .map(|name| match name.as_str() {
            SETTLEMENT_DATE => col(SETTLEMENT_DATE).cast(DataType::String),
            SETTLEMENT_PERIOD => col(SETTLEMENT_PERIOD).cast(DataType::Int64),
            other => col(other).cast(DataType::Float64),
        })
        .collect();

    let df = df
        .lazy()
        .select(exprs)
        .collect()
        .with_context(|| format!("Failed to normalise columns of {}", path.display()))?;
    Ok(df)
}
