//! Category lookup: coordinate -> land-cover/occupancy code
//!
//! Real deployments read codes from a raster; this crate only needs the
//! lookup contract and an explicitly owned code table.

use std::collections::HashMap;

use crate::error::NoCategoryFoundError;
use crate::models::Coordinate;

pub type CategoryCode = u32;

/// Opaque category code source, such as a land-cover raster
pub trait CategoryLookup {
    fn lookup(&self, coordinate: Coordinate) -> Result<CategoryCode, NoCategoryFoundError>;
}

/// Mapping from category code to occupancy name, owned by whoever built it
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    names: HashMap<CategoryCode, String>,
}

impl CategoryTable {
    pub fn new(entries: impl IntoIterator<Item = (CategoryCode, String)>) -> Self {
        Self {
            names: entries.into_iter().collect(),
        }
    }

    pub fn name(&self, code: CategoryCode) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// In-memory point lookup with a snapping tolerance
#[derive(Debug, Clone)]
pub struct PointCategoryLookup {
    source_name: String,
    tolerance: f64,
    points: Vec<(Coordinate, CategoryCode)>,
}

impl PointCategoryLookup {
    pub fn new(source_name: impl Into<String>, tolerance: f64) -> Self {
        Self {
            source_name: source_name.into(),
            tolerance,
            points: Vec::new(),
        }
    }

    pub fn with_point(mut self, coordinate: Coordinate, code: CategoryCode) -> Self {
        self.points.push((coordinate, code));
        self
    }
}

impl CategoryLookup for PointCategoryLookup {
    fn lookup(&self, coordinate: Coordinate) -> Result<CategoryCode, NoCategoryFoundError> {
        let distance = |c: &Coordinate| (c.x - coordinate.x).hypot(c.y - coordinate.y);
        self.points
            .iter()
            .filter(|(c, _)| distance(c) <= self.tolerance)
            .min_by(|a, b| distance(&a.0).total_cmp(&distance(&b.0)))
            .map(|(_, code)| *code)
            .ok_or_else(|| NoCategoryFoundError {
                coordinate,
                source_name: self.source_name.clone(),
            })
    }
}
