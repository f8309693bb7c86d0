//! Data access for the evaluation engine
//!
//! The engine never talks to a clinical store directly. It asks a
//! [`DataSource`] (or an [`AsyncDataSource`]) for the points of one signal
//! inside one window, and for the patients a population filter selects.
//! Implementations must return points sorted ascending by timestamp and
//! ending at the reference time.

use crate::operators::{self, DataPoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use psdl_ast::{PopulationFilter, Signal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a data source
///
/// The engine turns these into "no value" for the affected trend unless
/// strict data handling is enabled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Blocking data access
pub trait DataSource: Send + Sync {
    /// Points of `signal` for `patient_id` in the window ending at `reference_time`
    ///
    /// `window_seconds` is `None` when the whole history up to the reference
    /// time is wanted.
    fn fetch_points(
        &self,
        patient_id: &str,
        signal: &Signal,
        window_seconds: Option<i64>,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, DataSourceError>;

    /// Patients selected by a population filter
    fn list_patient_ids(&self, population: &PopulationFilter) -> Result<Vec<String>, DataSourceError>;
}

/// Non-blocking data access, same contract as [`DataSource`]
#[async_trait]
pub trait AsyncDataSource: Send + Sync {
    async fn fetch_points(
        &self,
        patient_id: &str,
        signal: &Signal,
        window_seconds: Option<i64>,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, DataSourceError>;

    async fn list_patient_ids(&self, population: &PopulationFilter) -> Result<Vec<String>, DataSourceError>;
}

/// Time series held in memory, keyed by patient and then by signal
///
/// Series are looked up by signal name first and by the signal's source
/// identifier second. Population filters are not interpreted: every known
/// patient is listed.
///
/// The JSON form is
/// `{"patients": {"<id>": {"<signal>": [{"timestamp": "...", "value": 1.0}]}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryDataSource {
    #[serde(default)]
    patients: IndexMap<String, IndexMap<String, Vec<DataPoint>>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture from its JSON form
    pub fn from_json_str(json: &str) -> Result<Self, DataSourceError> {
        let mut source: Self =
            serde_json::from_str(json).map_err(|e| DataSourceError::InvalidData(e.to_string()))?;
        for series in source.patients.values_mut().flat_map(|signals| signals.values_mut()) {
            series.sort_by_key(|p| p.timestamp);
        }
        Ok(source)
    }

    /// Register a patient with no data
    pub fn add_patient(&mut self, patient_id: impl Into<String>) {
        self.patients.entry(patient_id.into()).or_default();
    }

    /// Extend a series, keeping it sorted
    pub fn add_points(
        &mut self,
        patient_id: impl Into<String>,
        signal: impl Into<String>,
        points: impl IntoIterator<Item = DataPoint>,
    ) {
        let series = self
            .patients
            .entry(patient_id.into())
            .or_default()
            .entry(signal.into())
            .or_default();
        series.extend(points);
        series.sort_by_key(|p| p.timestamp);
    }

    pub fn add_point(&mut self, patient_id: impl Into<String>, signal: impl Into<String>, point: DataPoint) {
        self.add_points(patient_id, signal, [point]);
    }

    /// Builder form of [`add_points`](Self::add_points)
    pub fn with_series(
        mut self,
        patient_id: impl Into<String>,
        signal: impl Into<String>,
        points: impl IntoIterator<Item = DataPoint>,
    ) -> Self {
        self.add_points(patient_id, signal, points);
        self
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    fn series(&self, patient_id: &str, signal: &Signal) -> Result<&[DataPoint], DataSourceError> {
        let signals = self
            .patients
            .get(patient_id)
            .ok_or_else(|| DataSourceError::PatientNotFound(patient_id.to_string()))?;
        Ok(signals
            .get(&signal.name)
            .or_else(|| signals.get(&signal.source))
            .map(Vec::as_slice)
            .unwrap_or_default())
    }
}

impl DataSource for InMemoryDataSource {
    fn fetch_points(
        &self,
        patient_id: &str,
        signal: &Signal,
        window_seconds: Option<i64>,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, DataSourceError> {
        let series = self.series(patient_id, signal)?;
        let points = match window_seconds {
            Some(w) => operators::filter_by_window(series, w, reference_time),
            None => series
                .iter()
                .filter(|p| p.timestamp <= reference_time)
                .copied()
                .collect(),
        };
        log::trace!(
            "Fetched {} point(s) of '{}' for patient '{}'",
            points.len(),
            signal.name,
            patient_id
        );
        Ok(points)
    }

    fn list_patient_ids(&self, population: &PopulationFilter) -> Result<Vec<String>, DataSourceError> {
        if !population.include.is_empty() || !population.exclude.is_empty() {
            log::debug!("In-memory source lists every patient; population criteria are not applied");
        }
        let mut ids: Vec<String> = self.patients.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl AsyncDataSource for InMemoryDataSource {
    async fn fetch_points(
        &self,
        patient_id: &str,
        signal: &Signal,
        window_seconds: Option<i64>,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<DataPoint>, DataSourceError> {
        DataSource::fetch_points(self, patient_id, signal, window_seconds, reference_time)
    }

    async fn list_patient_ids(&self, population: &PopulationFilter) -> Result<Vec<String>, DataSourceError> {
        DataSource::list_patient_ids(self, population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_points_are_kept_sorted() {
        let mut source = InMemoryDataSource::new();
        source.add_point("p1", "Cr", DataPoint::new(t0(), 2.0));
        source.add_point("p1", "Cr", DataPoint::new(t0() - TimeDelta::hours(1), 1.0));

        let signal = Signal::new("Cr", "creatinine");
        let points = DataSource::fetch_points(&source, "p1", &signal, None, t0()).unwrap();
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_fetch_clamps_to_window_and_reference_time() {
        let source = InMemoryDataSource::new().with_series(
            "p1",
            "Cr",
            [
                DataPoint::new(t0() - TimeDelta::hours(3), 1.0),
                DataPoint::new(t0() - TimeDelta::hours(1), 2.0),
                DataPoint::new(t0() + TimeDelta::hours(1), 3.0),
            ],
        );
        let signal = Signal::new("Cr", "creatinine");

        let windowed = DataSource::fetch_points(&source, "p1", &signal, Some(7200), t0()).unwrap();
        assert_eq!(windowed.len(), 1);
        let history = DataSource::fetch_points(&source, "p1", &signal, None, t0()).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_lookup_falls_back_to_source_identifier() {
        let source = InMemoryDataSource::new().with_series("p1", "creatinine", [DataPoint::new(t0(), 1.4)]);
        let signal = Signal::new("Cr", "creatinine");
        let points = DataSource::fetch_points(&source, "p1", &signal, Some(60), t0()).unwrap();
        assert_eq!(points, vec![DataPoint::new(t0(), 1.4)]);
    }

    #[test]
    fn test_unknown_patient_and_signal() {
        let source = InMemoryDataSource::new().with_series("p1", "Cr", [DataPoint::new(t0(), 1.4)]);
        let signal = Signal::new("Lact", "lactate");

        assert_eq!(
            DataSource::fetch_points(&source, "nobody", &signal, Some(60), t0()),
            Err(DataSourceError::PatientNotFound("nobody".into()))
        );
        assert_eq!(
            DataSource::fetch_points(&source, "p1", &signal, Some(60), t0()),
            Ok(vec![])
        );
    }

    #[test]
    fn test_json_fixture() {
        let json = r#"{
            "patients": {
                "b": {"Cr": [
                    {"timestamp": "2024-03-01T08:00:00Z", "value": 1.8},
                    {"timestamp": "2024-03-01T02:00:00Z", "value": 1.0}
                ]},
                "a": {}
            }
        }"#;
        let source = InMemoryDataSource::from_json_str(json).unwrap();
        assert_eq!(source.patient_count(), 2);
        assert_eq!(
            DataSource::list_patient_ids(&source, &PopulationFilter::default()).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        let points = DataSource::fetch_points(&source, "b", &Signal::new("Cr", "cr"), None, t0()).unwrap();
        assert_eq!(points[0].value, 1.0);

        assert!(matches!(
            InMemoryDataSource::from_json_str("{\"patients\": 3}"),
            Err(DataSourceError::InvalidData(_))
        ));
    }
}
