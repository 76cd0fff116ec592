//! YAML run configuration: damage functions and provider settings

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::category::{CategoryCode, CategoryTable};
use crate::hazard_provider::Interpolation;
use crate::paired_data::PairedData;
use crate::receptors::Occupancy;

/// Damage function as written in the config file
#[derive(Clone, Debug, Deserialize)]
pub struct OccupancyConfig {
    pub name: String,
    pub depths: Vec<f64>,
    pub damages: Vec<f64>, // percent
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    pub occupancies: Vec<OccupancyConfig>,
    #[serde(default)]
    pub category_codes: HashMap<CategoryCode, String>,
    #[serde(default)]
    pub interpolation: Interpolation,
    pub workers: Option<usize>,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading run config {}", path_ref.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing run config {}", path_ref.display()))
    }

    /// Parse and validate every damage function up front
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: RunConfig = serde_yaml::from_str(contents)?;
        config.occupancies()?;
        Ok(config)
    }

    pub fn occupancies(&self) -> anyhow::Result<Vec<Occupancy>> {
        self.occupancies
            .iter()
            .map(|o| {
                let curve = PairedData::new(o.depths.clone(), o.damages.clone())
                    .with_context(|| format!("damage function for occupancy {}", o.name))?;
                Ok(Occupancy::new(o.name.clone(), curve))
            })
            .collect()
    }

    pub fn category_table(&self) -> CategoryTable {
        CategoryTable::new(
            self.category_codes
                .iter()
                .map(|(code, name)| (*code, name.clone())),
        )
    }
}
