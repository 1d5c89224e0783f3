use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use wpi_sim::{
    assessment::Assessment,
    config::EnrichmentConfig,
    enrichment::{
        EnrichmentError, EnrichmentService, EnrichmentWorker, FacilityCatalog, FacilityQuery,
        FacilityReport, FacilitySource, ReportSource,
    },
    Coordinate, IndustryType, SimulationParams, TreatmentLevel,
};

/// Counts calls and answers after `delay`, optionally with an error.
#[derive(Clone)]
struct ScriptedSource {
    calls: Arc<AtomicUsize>,
    delay: Duration,
    fail: bool,
}

impl ScriptedSource {
    fn new(delay: Duration, fail: bool) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay,
            fail,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FacilitySource for ScriptedSource {
    async fn query(&self, _query: FacilityQuery) -> Result<FacilityReport, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(EnrichmentError::Source("HTTP 502".into()));
        }
        Ok(FacilityReport {
            count: 7,
            has_wastewater_plant: true,
            source: ReportSource::OpenStreetMap,
            timestamp: None,
        })
    }
}

fn mumbai() -> Coordinate {
    Coordinate::new(19.07, 72.87).unwrap()
}

#[tokio::test(start_paused = true)]
async fn repeated_lookups_hit_the_cache() {
    let source = ScriptedSource::new(Duration::from_millis(200), false);
    let service = EnrichmentService::new(source.clone(), &EnrichmentConfig::default());

    let first = service.lookup(mumbai()).await;
    assert_eq!(first.count, 7);
    assert!(first.timestamp.is_some());

    // Snaps to the same two-decimal key.
    let nearby = Coordinate::new(19.071, 72.868).unwrap();
    let second = service.lookup(nearby).await;
    assert_eq!(second, first);
    assert_eq!(source.calls(), 1);
    assert_eq!(service.cached_entries(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_sources_time_out_to_the_fallback() {
    let source = ScriptedSource::new(Duration::from_secs(10), false);
    let service = EnrichmentService::new(source.clone(), &EnrichmentConfig::default());

    let report = service.lookup(mumbai()).await;
    assert_eq!(report, FacilityReport::fallback());
    assert_eq!(service.cached_entries(), 0);

    service.lookup(mumbai()).await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_sources_fall_back() {
    let source = ScriptedSource::new(Duration::ZERO, true);
    let service = EnrichmentService::new(source, &EnrichmentConfig::default());
    assert!(service.lookup(mumbai()).await.is_fallback());
    assert_eq!(service.cached_entries(), 0);

    let unconfigured =
        EnrichmentService::new(None::<FacilityCatalog>, &EnrichmentConfig::default());
    assert!(unconfigured.lookup(mumbai()).await.is_fallback());
}

#[tokio::test(start_paused = true)]
async fn rapid_requests_are_debounced() {
    let source = ScriptedSource::new(Duration::from_millis(50), false);
    let config = EnrichmentConfig::default();
    let service = Arc::new(EnrichmentService::new(source.clone(), &config));
    let (handle, mut updates) = EnrichmentWorker::spawn(service, config.debounce());

    let last = Coordinate::new(40.71, -74.0).unwrap();
    handle.request(mumbai());
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.request(Coordinate::new(6.52, 3.37).unwrap());
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.request(last);

    let update = updates.recv().await.expect("worker alive");
    assert_eq!(update.coordinate, last);
    assert_eq!(source.calls(), 1);

    let idle = tokio::time::timeout(Duration::from_secs(5), updates.recv()).await;
    assert!(idle.is_err(), "no further updates expected");
}

#[tokio::test(start_paused = true)]
async fn newer_requests_supersede_in_flight_lookups() {
    let source = ScriptedSource::new(Duration::from_secs(2), false);
    let config = EnrichmentConfig::default();
    let service = Arc::new(EnrichmentService::new(source.clone(), &config));
    let (handle, mut updates) = EnrichmentWorker::spawn(service, Duration::from_millis(100));

    handle.request(mumbai());
    // Past the debounce window, so the first lookup is running.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(source.calls(), 1);

    let newer = Coordinate::new(45.0, -100.0).unwrap();
    handle.request(newer);
    let update = updates.recv().await.expect("worker alive");
    assert_eq!(update.coordinate, newer);
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_requests_produce_nothing() {
    let source = ScriptedSource::new(Duration::ZERO, false);
    let config = EnrichmentConfig::default();
    let service = Arc::new(EnrichmentService::new(source.clone(), &config));
    let (handle, mut updates) = EnrichmentWorker::spawn(service, config.debounce());

    handle.request(mumbai());
    handle.cancel();
    let idle = tokio::time::timeout(Duration::from_secs(5), updates.recv()).await;
    assert!(idle.is_err());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn fixture_catalog_enriches_mumbai() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/facilities.yaml");
    let catalog = FacilityCatalog::load(path).unwrap();
    let service = EnrichmentService::new(catalog, &EnrichmentConfig::default());

    let report = service.lookup(mumbai()).await;
    assert_eq!(report.source, ReportSource::OpenStreetMap);
    assert_eq!(report.count, 7);
    assert!(report.has_wastewater_plant);

    let params = SimulationParams {
        industry_type: IndustryType::Textile,
        industrial_density: 0.1,
        ..SimulationParams::default()
    };
    let assessment = Assessment::evaluate_enriched(mumbai(), &params, &report).unwrap();
    assert_eq!(assessment.params.industry_type, IndustryType::Chemical);
    assert!((assessment.params.industrial_density - 0.85).abs() < 1e-12);
    assert_eq!(assessment.params.sewage_treatment, TreatmentLevel::Full);

    let plains = service.lookup(Coordinate::new(45.0, -100.0).unwrap()).await;
    assert_eq!(plains.count, 1);
    assert!(!plains.has_wastewater_plant);
}
