//! Flood consequence engine
//!
//! Resolves hazard scenarios into events, samples occupancy damage
//! functions and aggregates per-asset structure and content damage.

pub mod category;
pub mod compute;
pub mod config;
pub mod db;
pub mod error;
pub mod hazard_provider;
pub mod hazards;
pub mod ingest;
pub mod models;
pub mod paired_data;
pub mod receptors;
pub mod results;
pub mod sink;

pub use error::{
    HazardLookupError, InvalidCurveError, NoCategoryFoundError, RowLengthError, SchemaMismatchError,
};
pub use hazard_provider::{
    Epoch, FrequencyTableProvider, HazardProvider, HazardQuery, HazardRecord, HazardStore,
    HazardType, Interpolation, MemoryHazardStore, ReturnPeriod,
};
pub use hazards::HazardEvent;
pub use paired_data::PairedData;
pub use receptors::{ConsequenceReceptor, Occupancy, Structure};
pub use results::{ConsequenceResult, ConsequenceTable, ResultValue};
