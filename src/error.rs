//! Error taxonomy for the consequence engine
//!
//! Lookup errors (`NoHazardFound`, `NoFrequencyFound`, `NoCategoryFound`)
//! are recoverable per asset. Curve and schema errors indicate broken
//! configuration and abort a run.

use thiserror::Error;

use crate::hazard_provider::ReturnPeriod;
use crate::models::Coordinate;

/// A damage function that cannot be sampled
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidCurveError {
    #[error("curve has no points")]
    Empty,
    #[error("curve has {xs} x values but {ys} y values")]
    LengthMismatch { xs: usize, ys: usize },
    #[error("curve x values must be finite and strictly ascending (index {index})")]
    NotAscending { index: usize },
}

/// Failure to resolve a hazard query into an event
#[derive(Debug, Error)]
pub enum HazardLookupError {
    #[error("no hazard found for {identity}")]
    NoHazardFound { identity: String },

    #[error("no {return_period} frequency found for {identity}")]
    NoFrequencyFound {
        identity: String,
        return_period: ReturnPeriod,
    },

    #[error("hazard error: {reason}")]
    Hazard {
        reason: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl HazardLookupError {
    pub fn hazard(
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        HazardLookupError::Hazard {
            reason: reason.into(),
            source: source.into(),
        }
    }

    /// True when the store answered but had nothing for the query
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            HazardLookupError::NoHazardFound { .. } | HazardLookupError::NoFrequencyFound { .. }
        )
    }
}

/// A row whose headers differ from the table's fixed schema
#[derive(Debug, Clone, PartialEq, Error)]
#[error("schema mismatch: expected {expected:?}, found {found:?}")]
pub struct SchemaMismatchError {
    pub expected: Vec<String>,
    pub found: Vec<String>,
}

/// A result row whose headers and values differ in length
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row has {headers} headers but {results} values")]
pub struct RowLengthError {
    pub headers: usize,
    pub results: usize,
}

/// No category code could be read at a coordinate
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no category found at {coordinate} in {source_name}")]
pub struct NoCategoryFoundError {
    pub coordinate: Coordinate,
    pub source_name: String,
}
