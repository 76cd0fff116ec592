//! Hazard records, stores and the frequency-table provider
//!
//! A provider resolves an identity plus scenario selectors (return period,
//! epoch, hazard type) into a `HazardEvent`. The default policy is strict
//! exact-match lookup; log-linear interpolation across return periods is
//! available as an opt-in.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Deserialize;

use crate::error::HazardLookupError;
use crate::hazards::HazardEvent;

/// Statistical recurrence interval of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReturnPeriod {
    Five,
    Twenty,
    Hundred,
    TwoHundredFifty,
    FiveHundred,
}

impl ReturnPeriod {
    pub const ALL: [ReturnPeriod; 5] = [
        ReturnPeriod::Five,
        ReturnPeriod::Twenty,
        ReturnPeriod::Hundred,
        ReturnPeriod::TwoHundredFifty,
        ReturnPeriod::FiveHundred,
    ];

    pub fn years(self) -> u32 {
        match self {
            ReturnPeriod::Five => 5,
            ReturnPeriod::Twenty => 20,
            ReturnPeriod::Hundred => 100,
            ReturnPeriod::TwoHundredFifty => 250,
            ReturnPeriod::FiveHundred => 500,
        }
    }
}

impl TryFrom<u32> for ReturnPeriod {
    type Error = String;

    fn try_from(years: u32) -> Result<Self, Self::Error> {
        ReturnPeriod::ALL
            .into_iter()
            .find(|rp| rp.years() == years)
            .ok_or_else(|| format!("unsupported return period: {} years", years))
    }
}

impl FromStr for ReturnPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let years: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid return period: {}", s))?;
        ReturnPeriod::try_from(years)
    }
}

impl fmt::Display for ReturnPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-year", self.years())
    }
}

/// Modeled time horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Epoch {
    Current,
    Future,
}

impl Epoch {
    pub fn as_str(self) -> &'static str {
        match self {
            Epoch::Current => "current",
            Epoch::Future => "future",
        }
    }
}

impl FromStr for Epoch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Epoch::Current),
            "future" => Ok(Epoch::Future),
            other => Err(format!("unknown epoch: {}", other)),
        }
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// River (fluvial) or rainfall (pluvial) flooding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HazardType {
    Fluvial,
    Pluvial,
}

impl HazardType {
    pub fn as_str(self) -> &'static str {
        match self {
            HazardType::Fluvial => "fluvial",
            HazardType::Pluvial => "pluvial",
        }
    }
}

impl FromStr for HazardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fluvial" => Ok(HazardType::Fluvial),
            "pluvial" => Ok(HazardType::Pluvial),
            other => Err(format!("unknown hazard type: {}", other)),
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup key for a provider
#[derive(Debug, Clone, PartialEq)]
pub struct HazardQuery {
    pub identity: String,
    pub return_period: ReturnPeriod,
    pub epoch: Epoch,
    pub hazard_type: HazardType,
}

impl HazardQuery {
    pub fn new(
        identity: impl Into<String>,
        return_period: ReturnPeriod,
        epoch: Epoch,
        hazard_type: HazardType,
    ) -> Self {
        Self {
            identity: identity.into(),
            return_period,
            epoch,
            hazard_type,
        }
    }
}

/// Tabulated hazard magnitudes for one identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardRecord {
    pub identity: String,
    values: HashMap<(Epoch, HazardType), BTreeMap<ReturnPeriod, f64>>,
}

impl HazardRecord {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            values: HashMap::new(),
        }
    }

    /// Set a magnitude while building the record
    pub fn insert(
        &mut self,
        epoch: Epoch,
        hazard_type: HazardType,
        return_period: ReturnPeriod,
        magnitude: f64,
    ) {
        self.values
            .entry((epoch, hazard_type))
            .or_default()
            .insert(return_period, magnitude);
    }

    pub fn with(
        mut self,
        epoch: Epoch,
        hazard_type: HazardType,
        return_period: ReturnPeriod,
        magnitude: f64,
    ) -> Self {
        self.insert(epoch, hazard_type, return_period, magnitude);
        self
    }

    pub fn magnitude(
        &self,
        epoch: Epoch,
        hazard_type: HazardType,
        return_period: ReturnPeriod,
    ) -> Option<f64> {
        self.values
            .get(&(epoch, hazard_type))
            .and_then(|table| table.get(&return_period))
            .copied()
    }

    /// Magnitudes for one scenario, ordered by return period
    pub fn frequency_table(
        &self,
        epoch: Epoch,
        hazard_type: HazardType,
    ) -> Option<&BTreeMap<ReturnPeriod, f64>> {
        self.values.get(&(epoch, hazard_type))
    }

    /// Flattened `(epoch, type, return period, magnitude)` entries, sorted
    pub fn entries(&self) -> Vec<(Epoch, HazardType, ReturnPeriod, f64)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .flat_map(|((epoch, hazard_type), table)| {
                table
                    .iter()
                    .map(move |(rp, magnitude)| (*epoch, *hazard_type, *rp, *magnitude))
            })
            .collect();
        entries.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
        entries
    }

    pub fn len(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backing store yielding hazard records by identity
pub trait HazardStore {
    fn load(&self, identity: &str) -> Result<Option<HazardRecord>, HazardLookupError>;
}

/// In-memory store, replaced wholesale rather than edited
#[derive(Debug, Clone, Default)]
pub struct MemoryHazardStore {
    records: HashMap<String, HazardRecord>,
}

impl MemoryHazardStore {
    pub fn new(records: impl IntoIterator<Item = HazardRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.identity.clone(), record))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HazardStore for MemoryHazardStore {
    fn load(&self, identity: &str) -> Result<Option<HazardRecord>, HazardLookupError> {
        Ok(self.records.get(identity).cloned())
    }
}

/// Resolves a query into a hazard event
pub trait HazardProvider {
    fn resolve(&self, query: &HazardQuery) -> Result<HazardEvent, HazardLookupError>;
}

/// How missing return periods are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Only tabulated return periods resolve
    #[default]
    Strict,
    /// Interpolate linearly in ln(years) between bracketing periods
    LogLinear,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Interpolation::Strict),
            "log_linear" | "log-linear" => Ok(Interpolation::LogLinear),
            other => Err(format!("unknown interpolation policy: {}", other)),
        }
    }
}

/// Depth provider over per-identity frequency tables
#[derive(Debug, Clone)]
pub struct FrequencyTableProvider<S> {
    store: S,
    interpolation: Interpolation,
}

impl<S: HazardStore> FrequencyTableProvider<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            interpolation: Interpolation::Strict,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: HazardStore> HazardProvider for FrequencyTableProvider<S> {
    fn resolve(&self, query: &HazardQuery) -> Result<HazardEvent, HazardLookupError> {
        let record = self
            .store
            .load(&query.identity)?
            .ok_or_else(|| HazardLookupError::NoHazardFound {
                identity: query.identity.clone(),
            })?;

        if let Some(depth) = record.magnitude(query.epoch, query.hazard_type, query.return_period) {
            return Ok(HazardEvent::depth(depth));
        }

        let missing = || HazardLookupError::NoFrequencyFound {
            identity: query.identity.clone(),
            return_period: query.return_period,
        };

        match self.interpolation {
            Interpolation::Strict => Err(missing()),
            Interpolation::LogLinear => {
                let table = record
                    .frequency_table(query.epoch, query.hazard_type)
                    .ok_or_else(missing)?;
                let depth = log_linear(table, query.return_period).ok_or_else(missing)?;
                debug!(
                    "interpolated {} {} {} depth for {}: {:.3}",
                    query.epoch, query.hazard_type, query.return_period, query.identity, depth
                );
                Ok(HazardEvent::depth(depth))
            }
        }
    }
}

/// Interpolate between the nearest tabulated periods on either side
fn log_linear(table: &BTreeMap<ReturnPeriod, f64>, target: ReturnPeriod) -> Option<f64> {
    let (lower_rp, lower) = table.range(..target).next_back()?;
    let (upper_rp, upper) = table.range(target..).next()?;

    let ln = |rp: &ReturnPeriod| (rp.years() as f64).ln();
    let fraction = (ln(&target) - ln(lower_rp)) / (ln(upper_rp) - ln(lower_rp));
    Some(lower + (upper - lower) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn store() -> MemoryHazardStore {
        MemoryHazardStore::new([
            HazardRecord::new("cell-1")
                .with(Epoch::Current, HazardType::Fluvial, ReturnPeriod::Twenty, 0.5)
                .with(Epoch::Current, HazardType::Fluvial, ReturnPeriod::Hundred, 1.5)
                .with(Epoch::Current, HazardType::Fluvial, ReturnPeriod::FiveHundred, 2.5)
                .with(Epoch::Future, HazardType::Pluvial, ReturnPeriod::Hundred, 0.8),
        ])
    }

    fn query(rp: ReturnPeriod, epoch: Epoch, hazard_type: HazardType) -> HazardQuery {
        HazardQuery::new("cell-1", rp, epoch, hazard_type)
    }

    #[test]
    fn exact_match_resolves_depth() {
        let provider = FrequencyTableProvider::new(store());
        let event = provider
            .resolve(&query(ReturnPeriod::Hundred, Epoch::Current, HazardType::Fluvial))
            .unwrap();
        assert_eq!(event, HazardEvent::depth(1.5));

        let event = provider
            .resolve(&query(ReturnPeriod::Hundred, Epoch::Future, HazardType::Pluvial))
            .unwrap();
        assert_eq!(event, HazardEvent::depth(0.8));
    }

    #[test]
    fn unknown_identity_is_no_hazard_found() {
        let provider = FrequencyTableProvider::new(store());
        let err = provider
            .resolve(&HazardQuery::new(
                "cell-9",
                ReturnPeriod::Hundred,
                Epoch::Current,
                HazardType::Fluvial,
            ))
            .unwrap_err();
        assert!(matches!(err, HazardLookupError::NoHazardFound { ref identity } if identity == "cell-9"));
    }

    #[test]
    fn strict_lookup_reports_missing_frequency() {
        let provider = FrequencyTableProvider::new(store());
        let err = provider
            .resolve(&query(ReturnPeriod::TwoHundredFifty, Epoch::Current, HazardType::Fluvial))
            .unwrap_err();
        assert!(matches!(
            err,
            HazardLookupError::NoFrequencyFound {
                return_period: ReturnPeriod::TwoHundredFifty,
                ..
            }
        ));

        // A scenario with no table at all is also a missing frequency
        let err = provider
            .resolve(&query(ReturnPeriod::Hundred, Epoch::Future, HazardType::Fluvial))
            .unwrap_err();
        assert!(matches!(err, HazardLookupError::NoFrequencyFound { .. }));
    }

    #[test]
    fn log_linear_interpolates_between_bracketing_periods() {
        let provider =
            FrequencyTableProvider::new(store()).with_interpolation(Interpolation::LogLinear);
        let event = provider
            .resolve(&query(ReturnPeriod::TwoHundredFifty, Epoch::Current, HazardType::Fluvial))
            .unwrap();
        let expected = 1.5 + (2.5 - 1.5) * (250f64.ln() - 100f64.ln()) / (500f64.ln() - 100f64.ln());
        assert_abs_diff_eq!(event.depth_value().unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn log_linear_does_not_extrapolate() {
        let provider =
            FrequencyTableProvider::new(store()).with_interpolation(Interpolation::LogLinear);
        let err = provider
            .resolve(&query(ReturnPeriod::Five, Epoch::Current, HazardType::Fluvial))
            .unwrap_err();
        assert!(matches!(err, HazardLookupError::NoFrequencyFound { .. }));

        let err = provider
            .resolve(&HazardQuery::new(
                "missing",
                ReturnPeriod::Hundred,
                Epoch::Current,
                HazardType::Fluvial,
            ))
            .unwrap_err();
        assert!(matches!(err, HazardLookupError::NoHazardFound { .. }));
    }

    #[test]
    fn selectors_parse_from_text() {
        assert_eq!("100".parse::<ReturnPeriod>(), Ok(ReturnPeriod::Hundred));
        assert!("42".parse::<ReturnPeriod>().is_err());
        assert_eq!("Future".parse::<Epoch>(), Ok(Epoch::Future));
        assert_eq!("pluvial".parse::<HazardType>(), Ok(HazardType::Pluvial));
        assert_eq!("log-linear".parse::<Interpolation>(), Ok(Interpolation::LogLinear));
    }

    #[test]
    fn record_entries_are_sorted() {
        let record = store().load("cell-1").unwrap().unwrap();
        assert_eq!(record.len(), 4);
        let entries = record.entries();
        assert_eq!(
            entries[0],
            (Epoch::Current, HazardType::Fluvial, ReturnPeriod::Twenty, 0.5)
        );
        assert_eq!(
            entries[3],
            (Epoch::Future, HazardType::Pluvial, ReturnPeriod::Hundred, 0.8)
        );
    }
}
