//! Batch consequence computation over an asset inventory
//!
//! Every asset yields exactly one row. Assets whose hazard, category or
//! occupancy cannot be resolved get a zero-valued row carrying the error
//! text; only schema violations abort a run.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};
use thiserror::Error;

use crate::category::{CategoryCode, CategoryLookup, CategoryTable};
use crate::error::{HazardLookupError, NoCategoryFoundError, SchemaMismatchError};
use crate::hazard_provider::{Epoch, HazardProvider, HazardQuery, HazardType, ReturnPeriod};
use crate::models::AssetRecord;
use crate::receptors::{CONTENT_DAMAGE, ConsequenceReceptor, Occupancy, STRUCTURE_DAMAGE, Structure};
use crate::results::{ConsequenceResult, ConsequenceTable, ResultValue};

pub const IDENTITY: &str = "identity";
pub const OCCUPANCY: &str = "occupancy";
pub const DAMAGE_CATEGORY: &str = "damage category";
pub const DEPTH: &str = "depth";
pub const ERROR: &str = "error";

/// Header schema of every batch table
pub const COLUMNS: [&str; 7] = [
    IDENTITY,
    OCCUPANCY,
    DAMAGE_CATEGORY,
    DEPTH,
    STRUCTURE_DAMAGE,
    CONTENT_DAMAGE,
    ERROR,
];

/// Why a single asset could not be computed
#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Lookup(#[from] HazardLookupError),
    #[error(transparent)]
    Category(#[from] NoCategoryFoundError),
    #[error("asset has neither an occupancy nor a location")]
    MissingOccupancy,
    #[error("category code {0} has no occupancy")]
    UnknownCode(CategoryCode),
    #[error("unknown occupancy: {0}")]
    UnknownOccupancy(String),
}

/// Category lookup plus the table translating its codes
pub struct CategorySource {
    pub lookup: Box<dyn CategoryLookup + Send + Sync>,
    pub table: CategoryTable,
}

/// One scenario's worth of consequence computation
pub struct ConsequenceRun<P> {
    provider: P,
    occupancies: HashMap<String, Arc<Occupancy>>,
    categories: Option<CategorySource>,
    pub return_period: ReturnPeriod,
    pub epoch: Epoch,
    pub hazard_type: HazardType,
}

impl<P: HazardProvider> ConsequenceRun<P> {
    pub fn new(
        provider: P,
        occupancies: impl IntoIterator<Item = Occupancy>,
        return_period: ReturnPeriod,
        epoch: Epoch,
        hazard_type: HazardType,
    ) -> Self {
        Self {
            provider,
            occupancies: occupancies
                .into_iter()
                .map(|o| (o.name.clone(), Arc::new(o)))
                .collect(),
            categories: None,
            return_period,
            epoch,
            hazard_type,
        }
    }

    pub fn with_categories(mut self, categories: CategorySource) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn occupancy_for(&self, asset: &AssetRecord) -> Result<Arc<Occupancy>, AssetError> {
        let name = match (&asset.occupancy, asset.location, &self.categories) {
            (Some(name), _, _) => name.clone(),
            (None, Some(location), Some(source)) => {
                let code = source.lookup.lookup(location)?;
                source
                    .table
                    .name(code)
                    .ok_or(AssetError::UnknownCode(code))?
                    .to_string()
            }
            _ => return Err(AssetError::MissingOccupancy),
        };
        self.occupancies
            .get(&name)
            .cloned()
            .ok_or(AssetError::UnknownOccupancy(name))
    }

    fn compute_asset(
        &self,
        asset: &AssetRecord,
    ) -> Result<(Arc<Occupancy>, f64, ConsequenceResult), AssetError> {
        let occupancy = self.occupancy_for(asset)?;
        let query = HazardQuery::new(
            asset.identity.clone(),
            self.return_period,
            self.epoch,
            self.hazard_type,
        );
        let event = self.provider.resolve(&query)?;
        let structure = Structure {
            identity: asset.identity.clone(),
            occupancy: Arc::clone(&occupancy),
            damage_category: asset.damage_category.clone(),
            structure_value: asset.structure_value,
            content_value: asset.content_value,
            foundation_height: asset.foundation_height,
        };
        let result = structure.compute(&event);
        debug!("{}: {} -> {:?}", asset.identity, event, result.results());
        Ok((occupancy, event.depth_value().unwrap_or(0.0), result))
    }

    /// Compute one inventory row, never failing
    pub fn assess(&self, asset: &AssetRecord) -> ConsequenceResult {
        let (occupancy, depth, damages, error) = match self.compute_asset(asset) {
            Ok((occupancy, depth, result)) => (occupancy.name.clone(), depth, result, String::new()),
            Err(e) => {
                warn!("skipping {}: {}", asset.identity, e);
                let zero =
                    ConsequenceResult::from_pairs([(STRUCTURE_DAMAGE, 0.0), (CONTENT_DAMAGE, 0.0)]);
                (asset.occupancy.clone().unwrap_or_default(), 0.0, zero, e.to_string())
            }
        };

        ConsequenceResult::from_pairs([
            (IDENTITY, ResultValue::from(asset.identity.as_str())),
            (OCCUPANCY, ResultValue::from(occupancy)),
            (DAMAGE_CATEGORY, ResultValue::from(asset.damage_category.as_str())),
            (DEPTH, ResultValue::from(depth)),
        ])
        .concat(damages)
        .concat(ConsequenceResult::from_pairs([(ERROR, error)]))
    }

    /// Compute every asset in order
    pub fn run(&self, assets: &[AssetRecord]) -> Result<ConsequenceTable, SchemaMismatchError> {
        let mut table = ConsequenceTable::with_headers(COLUMNS);
        for asset in assets {
            table.add(self.assess(asset))?;
        }
        info!(
            "computed {} assets for {} {} {}",
            table.len(),
            self.epoch,
            self.hazard_type,
            self.return_period
        );
        Ok(table)
    }
}

impl<P: HazardProvider + Sync> ConsequenceRun<P> {
    /// Split the inventory across scoped workers, each with its own table
    pub fn run_parallel(
        &self,
        assets: &[AssetRecord],
        workers: usize,
    ) -> Result<ConsequenceTable, SchemaMismatchError> {
        let workers = workers.max(1);
        if workers == 1 || assets.len() < 2 {
            return self.run(assets);
        }
        let chunk_size = assets.len().div_ceil(workers);

        let tables: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = assets
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || self.run(chunk)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut merged = ConsequenceTable::with_headers(COLUMNS);
        for table in tables {
            merged.merge(table?)?;
        }
        Ok(merged)
    }
}

/// Totals over a computed table
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub assets: usize,
    pub computed: usize,
    pub skipped: usize,
    pub total_structure_damage: f64,
    pub total_content_damage: f64,
}

pub fn summarize(table: &ConsequenceTable) -> RunSummary {
    let skipped = match table.column(ERROR) {
        Some(i) => table
            .rows()
            .iter()
            .filter(|row| row[i].as_str().is_some_and(|e| !e.is_empty()))
            .count(),
        None => 0,
    };
    RunSummary {
        assets: table.len(),
        computed: table.len() - skipped,
        skipped,
        total_structure_damage: table.column_total(STRUCTURE_DAMAGE),
        total_content_damage: table.column_total(CONTENT_DAMAGE),
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Consequence Summary ===")?;
        writeln!(f, "Assets:   {}", self.assets)?;
        writeln!(f, "Computed: {}", self.computed)?;
        writeln!(f, "Skipped:  {}", self.skipped)?;
        writeln!(f)?;
        writeln!(f, "Structure damage: {:.2}", self.total_structure_damage)?;
        writeln!(f, "Content damage:   {:.2}", self.total_content_damage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::PointCategoryLookup;
    use crate::hazard_provider::{FrequencyTableProvider, HazardRecord, MemoryHazardStore};
    use crate::models::Coordinate;
    use crate::paired_data::PairedData;
    use approx::assert_abs_diff_eq;

    fn occupancy() -> Occupancy {
        Occupancy::new(
            "RES1",
            PairedData::new(vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 20.0, 30.0, 40.0]).unwrap(),
        )
    }

    fn asset(identity: &str, occupancy: Option<&str>) -> AssetRecord {
        AssetRecord {
            identity: identity.to_string(),
            occupancy: occupancy.map(str::to_string),
            location: None,
            damage_category: "residential".to_string(),
            structure_value: 100.0,
            content_value: 10.0,
            foundation_height: 0.0,
        }
    }

    fn run() -> ConsequenceRun<FrequencyTableProvider<MemoryHazardStore>> {
        let store = MemoryHazardStore::new((0..10).map(|i| {
            HazardRecord::new(format!("s-{}", i)).with(
                Epoch::Current,
                HazardType::Fluvial,
                ReturnPeriod::Hundred,
                i as f64 * 0.5,
            )
        }));
        ConsequenceRun::new(
            FrequencyTableProvider::new(store),
            [occupancy()],
            ReturnPeriod::Hundred,
            Epoch::Current,
            HazardType::Fluvial,
        )
    }

    fn number(table: &ConsequenceTable, row: usize, header: &str) -> f64 {
        table.rows()[row][table.column(header).unwrap()].as_f64().unwrap()
    }

    fn text(table: &ConsequenceTable, row: usize, header: &str) -> String {
        table.rows()[row][table.column(header).unwrap()].to_string()
    }

    #[test]
    fn every_asset_gets_a_row() {
        let assets = vec![
            asset("s-6", Some("RES1")),
            asset("missing", Some("RES1")),
            asset("s-2", Some("COM9")),
            asset("s-4", None),
        ];
        let table = run().run(&assets).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.headers(), &COLUMNS);

        assert_abs_diff_eq!(number(&table, 0, DEPTH), 3.0);
        assert_abs_diff_eq!(number(&table, 0, STRUCTURE_DAMAGE), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(number(&table, 0, CONTENT_DAMAGE), 3.0, epsilon = 1e-9);
        assert_eq!(text(&table, 0, ERROR), "");

        assert_eq!(text(&table, 1, ERROR), "no hazard found for missing");
        assert_eq!(number(&table, 1, STRUCTURE_DAMAGE), 0.0);
        assert_eq!(text(&table, 2, ERROR), "unknown occupancy: COM9");
        assert_eq!(
            text(&table, 3, ERROR),
            "asset has neither an occupancy nor a location"
        );

        let summary = summarize(&table);
        assert_eq!(summary.computed, 1);
        assert_eq!(summary.skipped, 3);
        assert_abs_diff_eq!(summary.total_structure_damage, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_frequency_is_reported_per_row() {
        let mut run = run();
        run.return_period = ReturnPeriod::FiveHundred;
        let table = run.run(&[asset("s-1", Some("RES1"))]).unwrap();
        assert_eq!(text(&table, 0, ERROR), "no 500-year frequency found for s-1");
    }

    #[test]
    fn location_resolves_occupancy_through_category_table() {
        let lookup = PointCategoryLookup::new("landcover", 1.0)
            .with_point(Coordinate::new(10.0, 10.0), 42)
            .with_point(Coordinate::new(20.0, 20.0), 7);
        let run = run().with_categories(CategorySource {
            lookup: Box::new(lookup),
            table: CategoryTable::new([(42, "RES1".to_string())]),
        });

        let mut located = asset("s-6", None);
        located.location = Some(Coordinate::new(10.2, 9.9));
        let mut unmapped = asset("s-6", None);
        unmapped.location = Some(Coordinate::new(20.0, 20.0));
        let mut outside = asset("s-6", None);
        outside.location = Some(Coordinate::new(99.0, 0.0));

        let table = run.run(&[located, unmapped, outside]).unwrap();
        assert_eq!(text(&table, 0, OCCUPANCY), "RES1");
        assert_abs_diff_eq!(number(&table, 0, STRUCTURE_DAMAGE), 30.0, epsilon = 1e-9);
        assert_eq!(text(&table, 1, ERROR), "category code 7 has no occupancy");
        assert_eq!(
            text(&table, 2, ERROR),
            "no category found at (99, 0) in landcover"
        );
    }

    #[test]
    fn malformed_store_rows_are_isolated() {
        use crate::db::{self, SqliteHazardStore};
        use rusqlite::Connection;

        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        db::upsert_hazard_record(
            &conn,
            &HazardRecord::new("s-ok").with(
                Epoch::Current,
                HazardType::Fluvial,
                ReturnPeriod::Hundred,
                2.5,
            ),
        )
        .unwrap();
        conn.execute(
            "INSERT INTO hazard_records VALUES ('s-bad', 'someday', 'fluvial', 100, 1.0)",
            [],
        )
        .unwrap();

        let run = ConsequenceRun::new(
            FrequencyTableProvider::new(SqliteHazardStore::from_connection(conn)),
            [occupancy()],
            ReturnPeriod::Hundred,
            Epoch::Current,
            HazardType::Fluvial,
        );
        let assets = [asset("s-bad", Some("RES1")), asset("s-ok", Some("RES1"))];
        let table = run.run_parallel(&assets, 2).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            text(&table, 0, ERROR),
            "hazard error: malformed hazard record for s-bad"
        );
        assert_eq!(number(&table, 0, STRUCTURE_DAMAGE), 0.0);
        assert_eq!(text(&table, 1, ERROR), "");
        assert_abs_diff_eq!(number(&table, 1, STRUCTURE_DAMAGE), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_inventory_keeps_the_schema() {
        let run = run();
        for table in [run.run(&[]).unwrap(), run.run_parallel(&[], 4).unwrap()] {
            assert!(table.is_empty());
            assert_eq!(table.headers(), &COLUMNS);

            let json = crate::sink::to_json(&table);
            assert_eq!(json["headers"].as_array().map(Vec::len), Some(7));
            assert_eq!(json["rows"].as_array().map(Vec::len), Some(0));
        }
    }

    #[test]
    fn parallel_run_matches_sequential_order() {
        let assets: Vec<_> = (0..10).map(|i| asset(&format!("s-{}", i), Some("RES1"))).collect();
        let run = run();
        let sequential = run.run(&assets).unwrap();
        for workers in [1, 3, 4, 16] {
            assert_eq!(run.run_parallel(&assets, workers).unwrap(), sequential);
        }
    }
}
