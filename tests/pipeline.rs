use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use rusqlite::Connection;
use tempfile::tempdir;

use flood_consequences::compute::{ConsequenceRun, ERROR, summarize};
use flood_consequences::config::RunConfig;
use flood_consequences::db::{self, SqliteHazardStore};
use flood_consequences::receptors::STRUCTURE_DAMAGE;
use flood_consequences::{Epoch, FrequencyTableProvider, HazardType, ReturnPeriod, ingest, sink};

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn csv_to_sqlite_to_json() {
    let dir = tempdir().unwrap();
    let tables = dir.path().join("tables");
    fs::create_dir(&tables).unwrap();
    write(
        &tables,
        "fluvial.csv",
        "identity,fluvial_current_100,fluvial_current_500\n\
         b-1,3.0,4.0\n\
         b-2,4.0,5.0\n\
         b-3,,2.0\n",
    );
    write(
        dir.path(),
        "run.yaml",
        "occupancies:\n  - name: RES1\n    depths: [1, 2, 3, 4]\n    damages: [10, 20, 30, 40]\n",
    );
    write(
        dir.path(),
        "inventory.csv",
        "identity,occupancy,damage_category,structure_value,content_value,foundation_height\n\
         b-1,RES1,residential,100,10,0\n\
         b-2,RES1,residential,100,10,1.1\n\
         b-3,RES1,residential,100,10,0\n\
         b-4,RES1,residential,100,10,0\n",
    );

    let db_path = dir.path().join("hazards.db");
    {
        let conn = Connection::open(&db_path).unwrap();
        db::init_schema(&conn).unwrap();
        let stats = ingest::ingest_to_database(&conn, &tables).unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.errors, 0);
    }

    let config = RunConfig::load(dir.path().join("run.yaml")).unwrap();
    let provider = FrequencyTableProvider::new(SqliteHazardStore::open(&db_path).unwrap())
        .with_interpolation(config.interpolation);
    let run = ConsequenceRun::new(
        provider,
        config.occupancies().unwrap(),
        ReturnPeriod::Hundred,
        Epoch::Current,
        HazardType::Fluvial,
    );
    let assets = ingest::read_inventory_csv(&dir.path().join("inventory.csv")).unwrap();
    let table = run.run_parallel(&assets, 2).unwrap();

    assert_eq!(table.len(), 4);
    let damage = table.column(STRUCTURE_DAMAGE).unwrap();
    let error = table.column(ERROR).unwrap();
    assert_abs_diff_eq!(table.rows()[0][damage].as_f64().unwrap(), 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(table.rows()[1][damage].as_f64().unwrap(), 29.0, epsilon = 1e-9);
    assert_eq!(
        table.rows()[2][error].as_str(),
        Some("no 100-year frequency found for b-3")
    );
    assert_eq!(table.rows()[3][error].as_str(), Some("no hazard found for b-4"));

    let summary = summarize(&table);
    assert_eq!(summary.computed, 2);
    assert_eq!(summary.skipped, 2);

    let out = dir.path().join("results.json");
    sink::write_json(&table, &out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 4);
    assert_eq!(json["rows"][3][0], "b-4");
}
