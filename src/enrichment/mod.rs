//! Optional facility enrichment around a coordinate.
//!
//! Nothing here can fail into the caller: timeouts and source errors collapse
//! into [`FacilityReport::fallback`]. The engine never waits on this module;
//! callers fold a finished report into their parameters and re-run it.

pub mod cache;
pub mod catalog;

use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::{
    config::EnrichmentConfig,
    geo::Coordinate,
    pollution::{IndustryType, SimulationParams, TreatmentLevel},
};

pub use cache::{CacheKey, FacilityCache};
pub use catalog::{Facility, FacilityCatalog, FacilityKind};

/// Facility count above which the area is treated as a chemical cluster.
pub const INDUSTRIAL_CLUSTER_COUNT: u32 = 5;
const DENSITY_PER_FACILITY: f64 = 0.05;
const CLUSTER_BASE_DENSITY: f64 = 0.5;
const CLUSTER_MAX_DENSITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacilityQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportSource {
    OpenStreetMap,
    #[serde(rename = "fallback")]
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityReport {
    pub count: u32,
    pub has_wastewater_plant: bool,
    pub source: ReportSource,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl FacilityReport {
    pub fn fallback() -> Self {
        Self {
            count: 0,
            has_wastewater_plant: false,
            source: ReportSource::Fallback,
            timestamp: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ReportSource::Fallback
    }

    /// Folds the report into `params`. Only ever raises industry or forces
    /// full treatment.
    pub fn apply(&self, params: &SimulationParams) -> SimulationParams {
        let mut enriched = *params;
        if self.count > INDUSTRIAL_CLUSTER_COUNT {
            enriched.industry_type = IndustryType::Chemical;
            enriched.industrial_density = (CLUSTER_BASE_DENSITY
                + self.count as f64 * DENSITY_PER_FACILITY)
                .min(CLUSTER_MAX_DENSITY);
        }
        if self.has_wastewater_plant {
            enriched.sewage_treatment = TreatmentLevel::Full;
        }
        enriched
    }
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("facility source unavailable: {0}")]
    Unavailable(String),
    #[error("facility source failed: {0}")]
    Source(String),
}

/// Something that can count facilities around a point.
pub trait FacilitySource: Send + Sync + 'static {
    fn query(
        &self,
        query: FacilityQuery,
    ) -> impl Future<Output = Result<FacilityReport, EnrichmentError>> + Send;
}

/// No source configured: every query degrades to the fallback.
impl<S: FacilitySource> FacilitySource for Option<S> {
    fn query(
        &self,
        query: FacilityQuery,
    ) -> impl Future<Output = Result<FacilityReport, EnrichmentError>> + Send {
        async move {
            match self {
                Some(source) => source.query(query).await,
                None => Err(EnrichmentError::Unavailable(
                    "no facility catalog configured".into(),
                )),
            }
        }
    }
}

/// Cache + timeout wrapper around a [`FacilitySource`].
pub struct EnrichmentService<S> {
    source: S,
    cache: Mutex<FacilityCache>,
    timeout: Duration,
    radius_m: f64,
}

impl<S: FacilitySource> EnrichmentService<S> {
    pub fn new(source: S, config: &EnrichmentConfig) -> Self {
        Self {
            source,
            cache: Mutex::new(FacilityCache::new(
                config.cache_ttl(),
                config.max_cache_entries,
            )),
            timeout: config.timeout(),
            radius_m: config.radius_m,
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().expect("facility cache lock poisoned").len()
    }

    pub async fn lookup(&self, coordinate: Coordinate) -> FacilityReport {
        let key = CacheKey::from(coordinate);
        let cached = self
            .cache
            .lock()
            .expect("facility cache lock poisoned")
            .get(key, Utc::now());
        if let Some(report) = cached {
            debug!(%key, "facility cache hit");
            return report;
        }

        let query = FacilityQuery {
            lat: coordinate.lat,
            lon: coordinate.lon,
            radius_m: self.radius_m,
        };
        match tokio::time::timeout(self.timeout, self.source.query(query)).await {
            Ok(Ok(mut report)) => {
                let now = Utc::now();
                if report.timestamp.is_none() {
                    report.timestamp = Some(now.timestamp_millis());
                }
                self.cache
                    .lock()
                    .expect("facility cache lock poisoned")
                    .insert(key, report.clone(), now);
                debug!(%key, count = report.count, "facility lookup stored");
                report
            }
            Ok(Err(err)) => {
                warn!(%coordinate, error = %err, "facility lookup failed, using fallback");
                FacilityReport::fallback()
            }
            Err(_) => {
                warn!(
                    %coordinate,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "facility lookup timed out, using fallback"
                );
                FacilityReport::fallback()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentUpdate {
    pub coordinate: Coordinate,
    pub report: FacilityReport,
}

/// Feeds coordinates to a running [`EnrichmentWorker`]. Dropping the handle
/// stops the worker.
#[derive(Debug)]
pub struct EnrichmentHandle {
    requests: watch::Sender<Option<Coordinate>>,
}

impl EnrichmentHandle {
    /// Supersedes any pending or in-flight request.
    pub fn request(&self, coordinate: Coordinate) {
        self.requests.send_replace(Some(coordinate));
    }

    /// Drops whatever is pending without starting a new lookup.
    pub fn cancel(&self) {
        self.requests.send_replace(None);
    }
}

/// Single background task that debounces requests and runs at most one
/// lookup at a time. A newer request restarts the debounce window and
/// abandons an in-flight lookup.
pub struct EnrichmentWorker;

impl EnrichmentWorker {
    pub fn spawn<S: FacilitySource>(
        service: Arc<EnrichmentService<S>>,
        debounce: Duration,
    ) -> (EnrichmentHandle, mpsc::Receiver<EnrichmentUpdate>) {
        let (request_tx, request_rx) = watch::channel(None);
        let (update_tx, update_rx) = mpsc::channel(16);
        tokio::spawn(run_worker(service, debounce, request_rx, update_tx));
        (
            EnrichmentHandle {
                requests: request_tx,
            },
            update_rx,
        )
    }
}

async fn run_worker<S: FacilitySource>(
    service: Arc<EnrichmentService<S>>,
    debounce: Duration,
    mut requests: watch::Receiver<Option<Coordinate>>,
    updates: mpsc::Sender<EnrichmentUpdate>,
) {
    let mut pending = false;
    loop {
        if !pending && requests.changed().await.is_err() {
            break;
        }
        pending = false;

        loop {
            tokio::select! {
                changed = requests.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        let latest = *requests.borrow_and_update();
        let Some(coordinate) = latest else {
            continue;
        };

        tokio::select! {
            report = service.lookup(coordinate) => {
                if updates.send(EnrichmentUpdate { coordinate, report }).await.is_err() {
                    break;
                }
            }
            changed = requests.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!(%coordinate, "facility lookup superseded");
                pending = true;
            }
        }
    }
    debug!("enrichment worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(count: u32, plant: bool) -> FacilityReport {
        FacilityReport {
            count,
            has_wastewater_plant: plant,
            source: ReportSource::OpenStreetMap,
            timestamp: None,
        }
    }

    #[test]
    fn small_counts_leave_industry_alone() {
        let params = SimulationParams::default();
        assert_eq!(report(5, false).apply(&params), params);
    }

    #[test]
    fn clusters_raise_density_up_to_cap() {
        let params = SimulationParams {
            industrial_density: 0.2,
            industry_type: IndustryType::Textile,
            ..SimulationParams::default()
        };
        let six = report(6, false).apply(&params);
        assert_eq!(six.industry_type, IndustryType::Chemical);
        assert!((six.industrial_density - 0.8).abs() < 1e-12);
        let forty = report(40, false).apply(&params);
        assert_eq!(forty.industrial_density, 0.9);
    }

    #[test]
    fn wastewater_plant_forces_full_treatment() {
        let enriched = report(0, true).apply(&SimulationParams::default());
        assert_eq!(enriched.sewage_treatment, TreatmentLevel::Full);
    }

    #[test]
    fn fallback_payload_shape() {
        let json = serde_json::to_value(FacilityReport::fallback()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "count": 0, "hasWastewaterPlant": false, "source": "fallback" })
        );
    }
}
