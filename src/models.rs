//! Data models for asset inventories and locations

use std::fmt;

/// A point in the inventory's coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One row of an asset inventory
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub identity: String,          // Also the hazard lookup key
    pub occupancy: Option<String>, // Resolved from location when absent
    pub location: Option<Coordinate>,
    pub damage_category: String,
    pub structure_value: f64,
    pub content_value: f64,
    pub foundation_height: f64,
}
