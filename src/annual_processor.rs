use anyhow::{anyhow, Result};
use demand_calculator::models::YEAR;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

pub struct AnnualProcessor {
    output_dir: PathBuf,
}

impl AnnualProcessor {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Write the transformed dataset as one CSV, Parquet and Arrow IPC file
    /// per calendar year. Returns the years written.
    pub fn export_by_year(&self, df: &DataFrame) -> Result<Vec<i32>> {
        println!("\n💾 Exporting merged demand data by year");
        fs::create_dir_all(&self.output_dir)?;

        let years: BTreeSet<i32> = df.column(YEAR)?.i32()?.into_iter().flatten().collect();
        if years.is_empty() {
            return Err(anyhow!("No {} values in dataset", YEAR));
        }
        println!("  📅 Years found: {:?}", years);

        let pb = ProgressBar::new(years.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
        );

        for &year in &years {
            let mut year_df = df
                .clone()
                .lazy()
                .filter(col(YEAR).eq(lit(year)))
                .collect()?;
            self.save_year(year, &mut year_df)?;
            pb.inc(1);
        }
        pb.finish_with_message("export complete");

        println!("  ✅ Wrote {} years to {}", years.len(), self.output_dir.display());
        Ok(years.into_iter().collect())
    }

    fn save_year(&self, year: i32, df: &mut DataFrame) -> Result<()> {
        let base_name = format!("GB_Demand_{}", year);

        let csv_path = self.output_dir.join(format!("{}.csv", base_name));
        CsvWriter::new(fs::File::create(&csv_path)?).finish(df)?;

        let parquet_path = self.output_dir.join(format!("{}.parquet", base_name));
        ParquetWriter::new(fs::File::create(&parquet_path)?).finish(df)?;

        let arrow_path = self.output_dir.join(format!("{}.arrow", base_name));
        IpcWriter::new(fs::File::create(&arrow_path)?).finish(df)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demand_calculator::models::NATIONAL_DEMAND;

    #[test]
    fn test_export_by_year_writes_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let df = df! {
            NATIONAL_DEMAND => [30000.0, 31000.0, 29000.0],
            YEAR => [2019i32, 2019, 2020],
        }
        .unwrap();

        let out_dir = dir.path().join("annual");
        let processor = AnnualProcessor::new(out_dir.clone());
        let years = processor.export_by_year(&df).unwrap();
        assert_eq!(years, vec![2019, 2020]);

        for year in [2019, 2020] {
            for ext in ["csv", "parquet", "arrow"] {
                let path = out_dir.join(format!("GB_Demand_{}.{}", year, ext));
                assert!(path.exists(), "{} missing", path.display());
            }
        }

        let exported = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(out_dir.join("GB_Demand_2019.csv")))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(exported.height(), 2);
    }

    #[test]
    fn test_export_requires_years() {
        let dir = tempfile::tempdir().unwrap();
        let df = df! {
            YEAR => [None::<i32>],
        }
        .unwrap();

        assert!(AnnualProcessor::new(dir.path().to_path_buf()).export_by_year(&df).is_err());
    }
}
