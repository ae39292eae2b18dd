pub mod calculator;
pub mod models;
pub mod data_loader;
pub mod transform;

pub use calculator::{DemandCalculator, Resample};
pub use models::{DemandConfig, DemandStats, GroupKey, Season, TimePoint};
pub use data_loader::DataLoader;
pub use transform::DemandTransformer;

use polars::prelude::DataFrame;

/// Load every demand file named by `config` and run the full transform.
pub fn load_dataset(config: &DemandConfig) -> anyhow::Result<DataFrame> {
    let raw = DataLoader::from_config(config).load_all()?;
    DemandTransformer::new(&config.interconnectors).transform(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{INTERCONNECTOR_FLOW, SEASON};
    use std::fs;

    #[test]
    fn test_load_dataset_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("DemandData_2012.csv"),
            "SETTLEMENT_DATE,SETTLEMENT_PERIOD,ND,FRENCH_FLOW,BRITNED_FLOW,MOYLE_FLOW,EAST_WEST_FLOW\n\
             01-JUN-2012,2,26000,1500,900,-100,-200\n\
             01-JUN-2012,1,27000,1400,800,-100,-200\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("DemandData_2011.csv"),
            "SETTLEMENT_DATE,SETTLEMENT_PERIOD,ND,FRENCH_FLOW,BRITNED_FLOW,MOYLE_FLOW,EAST_WEST_FLOW\n\
             15-DEC-2011,47,40000,2000,1000,0,0\n",
        )
        .unwrap();

        let df = load_dataset(&DemandConfig::new(dir.path())).unwrap();
        assert_eq!(df.height(), 3);

        let calculator = DemandCalculator::new(&DemandConfig::default().demand_column);
        let demand = calculator.demand_series(&df).unwrap();
        let values: Vec<f64> = demand.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![40000.0, 27000.0, 26000.0]);
        assert_eq!(demand[0].timestamp.to_string(), "2011-12-15 23:00:00");

        let seasons: Vec<&str> = df.column(SEASON).unwrap().str().unwrap().into_no_null_iter().collect();
        assert_eq!(seasons, vec!["Winter", "Summer", "Summer"]);

        let flow = calculator.interconnector_series(&df).unwrap();
        assert_eq!(flow[1].value, 1900.0);
        assert!(df.column(INTERCONNECTOR_FLOW).is_ok());
    }
}
