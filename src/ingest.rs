//! CSV ingestion of hazard tables and asset inventories
//!
//! Hazard tables have an identity column followed by one column per
//! scenario, named `<hazard_type>_<epoch>_<return_period>`, for example
//! `fluvial_current_100`. Fields are comma separated and unquoted.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};
use regex::Regex;
use rusqlite::Connection;
use walkdir::WalkDir;

use crate::category::{CategoryCode, PointCategoryLookup};
use crate::db;
use crate::hazard_provider::{Epoch, HazardRecord, HazardType, MemoryHazardStore, ReturnPeriod};
use crate::models::{AssetRecord, Coordinate};

/// Find all CSV files below a directory
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Scenario selectors encoded in a column name
pub fn parse_scenario_column(
    re: &Regex,
    header: &str,
) -> Option<(HazardType, Epoch, ReturnPeriod)> {
    let cap = re.captures(header.trim())?;
    let hazard_type = cap[1].parse().ok()?;
    let epoch = cap[2].parse().ok()?;
    let return_period = cap[3].parse().ok()?;
    Some((hazard_type, epoch, return_period))
}

pub fn scenario_column_regex() -> Result<Regex> {
    Ok(Regex::new(r"(?i)^(fluvial|pluvial)_(current|future)_(\d+)$")?)
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Parse a numeric cell, rejecting NaN and infinities
fn parse_finite(cell: &str) -> Result<f64> {
    let value: f64 = cell.parse()?;
    if !value.is_finite() {
        bail!("not a finite number");
    }
    Ok(value)
}

/// Non-blank lines with their 1-based line numbers
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Parse one hazard table into records
pub fn read_hazard_csv(path: &Path) -> Result<Vec<HazardRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let re = scenario_column_regex()?;

    let mut lines = data_lines(&content);
    let (_, header) = lines
        .next()
        .ok_or_else(|| anyhow!("{} has no header row", path.display()))?;

    // Column index -> scenario; unrecognised columns are ignored
    let mut scenarios = Vec::new();
    for (index, name) in split_fields(header).into_iter().enumerate().skip(1) {
        match parse_scenario_column(&re, name) {
            Some(scenario) => scenarios.push((index, scenario)),
            None => warn!("{}: ignoring column '{}'", path.display(), name),
        }
    }
    if scenarios.is_empty() {
        bail!("{} has no scenario columns", path.display());
    }

    let mut records = Vec::new();
    for (line_no, line) in lines {
        let fields = split_fields(line);
        let identity = fields[0];
        if identity.is_empty() {
            bail!("{}:{}: missing identity", path.display(), line_no);
        }

        let mut record = HazardRecord::new(identity);
        for &(index, (hazard_type, epoch, return_period)) in &scenarios {
            let Some(cell) = fields.get(index).filter(|c| !c.is_empty()) else {
                continue;
            };
            let depth = parse_finite(cell).with_context(|| {
                format!("{}:{}: invalid depth '{}'", path.display(), line_no, cell)
            })?;
            record.insert(epoch, hazard_type, return_period, depth);
        }
        records.push(record);
    }

    Ok(records)
}

/// Ingest every hazard table below `dir` into the database
pub fn ingest_to_database(conn: &Connection, dir: &Path) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    info!("Scanning {} for hazard tables...", dir.display());
    let files = find_csv_files(dir)?;
    info!("Found {} CSV files", files.len());

    for path in &files {
        let stored = read_hazard_csv(path).and_then(|records| {
            store_records(conn, &records)?;
            Ok(records)
        });
        match stored {
            Ok(records) => {
                stats.files += 1;
                stats.records += records.len();
                stats.magnitudes += records.iter().map(HazardRecord::len).sum::<usize>();
                info!("  Parsed: {} ({} identities)", path.display(), records.len());
            }
            Err(e) => {
                warn!("  Error ingesting {}: {:#}", path.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

/// Write one file's records atomically; nothing is kept if any upsert fails
fn store_records(conn: &Connection, records: &[HazardRecord]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for record in records {
        db::upsert_hazard_record(&tx, record)
            .with_context(|| format!("Failed to store {}", record.identity))?;
    }
    tx.commit()?;
    Ok(())
}

/// Ingest every hazard table below `dir` into a fresh memory store
///
/// An identity appearing in several files keeps every scenario; later
/// files win for duplicate scenarios.
pub fn ingest_to_memory(dir: &Path) -> Result<(MemoryHazardStore, IngestStats)> {
    let mut stats = IngestStats::default();
    let mut merged: HashMap<String, HazardRecord> = HashMap::new();

    for path in &find_csv_files(dir)? {
        match read_hazard_csv(path) {
            Ok(records) => {
                stats.files += 1;
                stats.records += records.len();
                for record in records {
                    stats.magnitudes += record.len();
                    let target = merged
                        .entry(record.identity.clone())
                        .or_insert_with(|| HazardRecord::new(record.identity.clone()));
                    for (epoch, hazard_type, return_period, depth) in record.entries() {
                        target.insert(epoch, hazard_type, return_period, depth);
                    }
                }
            }
            Err(e) => {
                warn!("  Error parsing {}: {:#}", path.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok((MemoryHazardStore::new(merged.into_values()), stats))
}

/// Parse an asset inventory
///
/// Required columns: identity, damage_category, structure_value,
/// content_value, foundation_height. Optional: occupancy, x, y.
pub fn read_inventory_csv(path: &Path) -> Result<Vec<AssetRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut lines = data_lines(&content);
    let (_, header) = lines
        .next()
        .ok_or_else(|| anyhow!("{} has no header row", path.display()))?;
    let columns: HashMap<String, usize> = split_fields(header)
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.to_ascii_lowercase(), i))
        .collect();

    let required = |name: &str| {
        columns
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("{} is missing column '{}'", path.display(), name))
    };
    let identity_col = required("identity")?;
    let category_col = required("damage_category")?;
    let structure_col = required("structure_value")?;
    let content_col = required("content_value")?;
    let foundation_col = required("foundation_height")?;
    let occupancy_col = columns.get("occupancy").copied();
    let xy_cols = columns.get("x").copied().zip(columns.get("y").copied());

    let mut assets = Vec::new();
    for (line_no, line) in lines {
        let fields = split_fields(line);
        let text = |col: usize| fields.get(col).copied().unwrap_or("");
        let number = |col: usize| -> Result<f64> {
            let cell = text(col);
            parse_finite(cell)
                .with_context(|| format!("{}:{}: invalid number '{}'", path.display(), line_no, cell))
        };

        let location = match xy_cols {
            Some((x, y)) if !text(x).is_empty() && !text(y).is_empty() => {
                Some(Coordinate::new(number(x)?, number(y)?))
            }
            _ => None,
        };

        assets.push(AssetRecord {
            identity: text(identity_col).to_string(),
            occupancy: occupancy_col
                .map(text)
                .filter(|o| !o.is_empty())
                .map(str::to_string),
            location,
            damage_category: text(category_col).to_string(),
            structure_value: number(structure_col)?,
            content_value: number(content_col)?,
            foundation_height: number(foundation_col)?,
        });
    }

    Ok(assets)
}

/// Parse category points (columns x, y, code) into a point lookup
pub fn read_category_points_csv(path: &Path, tolerance: f64) -> Result<PointCategoryLookup> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut lines = data_lines(&content);
    let (_, header) = lines
        .next()
        .ok_or_else(|| anyhow!("{} has no header row", path.display()))?;
    let columns: Vec<String> = split_fields(header)
        .into_iter()
        .map(str::to_ascii_lowercase)
        .collect();
    let position = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("{} is missing column '{}'", path.display(), name))
    };
    let (x_col, y_col, code_col) = (position("x")?, position("y")?, position("code")?);

    let mut lookup = PointCategoryLookup::new(path.display().to_string(), tolerance);
    for (line_no, line) in lines {
        let fields = split_fields(line);
        let cell = |col: usize| fields.get(col).copied().unwrap_or("");
        let invalid = || format!("{}:{}: invalid category point", path.display(), line_no);
        let x = parse_finite(cell(x_col)).with_context(invalid)?;
        let y = parse_finite(cell(y_col)).with_context(invalid)?;
        let code: CategoryCode = cell(code_col).parse().with_context(invalid)?;
        lookup = lookup.with_point(Coordinate::new(x, y), code);
    }

    Ok(lookup)
}

#[derive(Debug, Default)]
pub struct IngestStats {
    pub files: usize,
    pub records: usize,
    pub magnitudes: usize,
    pub errors: usize,
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ingested {} files ({} identities, {} magnitudes). Errors: {}",
            self.files, self.records, self.magnitudes, self.errors
        )
    }
}
