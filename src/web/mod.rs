use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    assessment::Assessment,
    config::Config,
    enrichment::{
        EnrichmentHandle, EnrichmentService, EnrichmentUpdate, EnrichmentWorker, FacilityCatalog,
    },
    error::SimError,
    geo::{classify, Coordinate, GeoData},
    pollution::{SimulationParams, WpiResult},
    projection::ScatterPoint,
};

/// The coordinate the live session is looking at.
#[derive(Debug, Clone, Copy)]
struct Selection {
    coordinate: Coordinate,
    params: SimulationParams,
    real_data: bool,
}

#[derive(Default)]
struct Session {
    selection: Option<Selection>,
    latest: Option<Assessment>,
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub wpi: WpiResult,
    pub assessment: Option<Assessment>,
    pub enrichment_pending: bool,
}

struct AppState {
    broadcaster: broadcast::Sender<String>,
    session: Mutex<Session>,
    enrichment: EnrichmentHandle,
    defaults: SimulationParams,
}

impl AppState {
    fn envelope(&self, session: &Session) -> StateEnvelope {
        let pending = match (&session.selection, &session.latest) {
            (Some(selection), Some(latest)) => {
                selection.real_data && latest.geo.is_habitable() && latest.facilities.is_none()
            }
            _ => false,
        };
        StateEnvelope {
            wpi: session
                .latest
                .as_ref()
                .map(|a| a.wpi)
                .unwrap_or_else(WpiResult::unselected),
            assessment: session.latest.clone(),
            enrichment_pending: pending,
        }
    }

    fn publish(&self, envelope: &StateEnvelope) {
        match serde_json::to_string(envelope) {
            Ok(payload) => {
                // No subscribers is not an error.
                let _ = self.broadcaster.send(payload);
            }
            Err(err) => warn!(error = %err, "failed to encode state frame"),
        }
    }

    fn apply_enrichment(&self, update: EnrichmentUpdate) {
        let envelope = {
            let mut session = self.session.lock().expect("session lock poisoned");
            let Some(selection) = session.selection else {
                return;
            };
            if selection.coordinate != update.coordinate || !selection.real_data {
                debug!(coordinate = %update.coordinate, "dropping stale facility report");
                return;
            }
            match Assessment::evaluate_enriched(
                selection.coordinate,
                &selection.params,
                &update.report,
            ) {
                Ok(assessment) => session.latest = Some(assessment),
                Err(err) => {
                    warn!(error = %err, "enriched assessment rejected");
                    return;
                }
            }
            self.envelope(&session)
        };
        info!(
            coordinate = %update.coordinate,
            facilities = update.report.count,
            source = ?update.report.source,
            "applied facility report"
        );
        self.publish(&envelope);
    }
}

pub struct WebServerConfig {
    pub config: Config,
}

pub async fn run(server: WebServerConfig) -> Result<()> {
    let WebServerConfig { config } = server;

    let catalog = match &config.enrichment.catalog_path {
        Some(path) => Some(FacilityCatalog::load(path)?),
        None => {
            warn!("no facility catalog configured; enrichment will always fall back");
            None
        }
    };
    let service = Arc::new(EnrichmentService::new(catalog, &config.enrichment));
    let (enrichment, mut updates) =
        EnrichmentWorker::spawn(service, config.enrichment.debounce());

    let (tx, _) = broadcast::channel::<String>(64);
    let state = Arc::new(AppState {
        broadcaster: tx,
        session: Mutex::new(Session::default()),
        enrichment,
        defaults: config.defaults,
    });

    let state_for_updates = state.clone();
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            state_for_updates.apply_enrichment(update);
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "WPI API listening (Ctrl+C to stop)");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/classify", get(classify_point))
        .route("/api/assess", post(assess))
        .route("/api/select", post(select))
        .route("/api/state", get(latest_state))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down WPI API");
}

#[derive(Debug)]
struct ApiError(SimError);

impl From<SimError> for ApiError {
    fn from(value: SimError) -> Self {
        ApiError(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

#[derive(Deserialize)]
struct ClassifyQuery {
    lat: f64,
    lon: f64,
}

async fn classify_point(
    Query(query): Query<ClassifyQuery>,
) -> Result<Json<GeoData>, ApiError> {
    Ok(Json(classify(query.lat, query.lon)?))
}

#[derive(Deserialize)]
struct AssessRequest {
    lat: f64,
    lon: f64,
    #[serde(default)]
    params: Option<SimulationParams>,
    /// Makes the regional scatter reproducible.
    #[serde(default)]
    scatter_seed: Option<u64>,
}

#[derive(Serialize)]
struct AssessResponse {
    assessment: Assessment,
    regional: Vec<ScatterPoint>,
}

async fn assess(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssessRequest>,
) -> Result<Json<AssessResponse>, ApiError> {
    let coordinate = Coordinate::new(request.lat, request.lon)?;
    let params = request.params.unwrap_or(state.defaults);
    let assessment = Assessment::evaluate(coordinate, &params)?;
    let regional = match request.scatter_seed {
        Some(seed) => assessment.regional_scatter(&mut ChaCha8Rng::seed_from_u64(seed)),
        None => assessment.regional_scatter(&mut rand::thread_rng()),
    };
    Ok(Json(AssessResponse {
        assessment,
        regional,
    }))
}

#[derive(Deserialize)]
struct SelectRequest {
    lat: f64,
    lon: f64,
    #[serde(default)]
    params: Option<SimulationParams>,
    #[serde(default)]
    real_data: bool,
}

async fn select(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<StateEnvelope>, ApiError> {
    let coordinate = Coordinate::new(request.lat, request.lon)?;
    let params = request.params.unwrap_or(state.defaults);
    let assessment = Assessment::evaluate(coordinate, &params)?;
    let wants_enrichment = request.real_data && assessment.geo.is_habitable();

    let envelope = {
        let mut session = state.session.lock().expect("session lock poisoned");
        session.selection = Some(Selection {
            coordinate,
            params,
            real_data: request.real_data,
        });
        session.latest = Some(assessment);
        state.envelope(&session)
    };

    if wants_enrichment {
        state.enrichment.request(coordinate);
    } else {
        state.enrichment.cancel();
    }
    state.publish(&envelope);
    Ok(Json(envelope))
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let session = state.session.lock().expect("session lock poisoned");
    Json(state.envelope(&session))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EnrichmentConfig,
        enrichment::{FacilityReport, ReportSource},
        pollution::{TreatmentLevel, WpiStatus},
    };

    fn test_state() -> Arc<AppState> {
        let service = Arc::new(EnrichmentService::new(
            None::<FacilityCatalog>,
            &EnrichmentConfig::default(),
        ));
        let (enrichment, _updates) = EnrichmentWorker::spawn(service, Duration::from_secs(1));
        let (tx, _) = broadcast::channel(8);
        Arc::new(AppState {
            broadcaster: tx,
            session: Mutex::new(Session::default()),
            enrichment,
            defaults: SimulationParams::default(),
        })
    }

    fn plant_report() -> FacilityReport {
        FacilityReport {
            count: 9,
            has_wastewater_plant: true,
            source: ReportSource::OpenStreetMap,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn state_starts_unselected() {
        let state = test_state();
        let Json(envelope) = latest_state(State(state)).await;
        assert_eq!(envelope.wpi.status, WpiStatus::SafeStart);
        assert!(envelope.assessment.is_none());
    }

    #[tokio::test]
    async fn select_rejects_invalid_coordinates() {
        let state = test_state();
        let request = SelectRequest {
            lat: 95.0,
            lon: 0.0,
            params: None,
            real_data: false,
        };
        let result = select(State(state), Json(request)).await;
        assert!(matches!(result, Err(ApiError(SimError::InvalidCoordinate { .. }))));
    }

    #[tokio::test]
    async fn matching_report_updates_the_session() {
        let state = test_state();
        let mut events = state.broadcaster.subscribe();
        let request = SelectRequest {
            lat: 45.0,
            lon: -100.0,
            params: None,
            real_data: true,
        };
        let Json(envelope) = select(State(state.clone()), Json(request)).await.unwrap();
        assert!(envelope.enrichment_pending);
        assert!(events.try_recv().is_ok());

        state.apply_enrichment(EnrichmentUpdate {
            coordinate: Coordinate::new(45.0, -100.0).unwrap(),
            report: plant_report(),
        });
        let Json(envelope) = latest_state(State(state.clone())).await;
        let assessment = envelope.assessment.expect("assessment");
        assert_eq!(assessment.params.sewage_treatment, TreatmentLevel::Full);
        assert!(!envelope.enrichment_pending);
        assert!(events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn stale_report_is_ignored() {
        let state = test_state();
        let request = SelectRequest {
            lat: 45.0,
            lon: -100.0,
            params: None,
            real_data: true,
        };
        select(State(state.clone()), Json(request)).await.unwrap();
        state.apply_enrichment(EnrichmentUpdate {
            coordinate: Coordinate::new(40.0, -100.0).unwrap(),
            report: plant_report(),
        });
        let Json(envelope) = latest_state(State(state)).await;
        let assessment = envelope.assessment.expect("assessment");
        assert!(assessment.facilities.is_none());
        assert_eq!(assessment.params.sewage_treatment, TreatmentLevel::None);
    }

    #[tokio::test]
    async fn seeded_assess_is_reproducible() {
        let state = test_state();
        let request = || AssessRequest {
            lat: 19.07,
            lon: 72.87,
            params: None,
            scatter_seed: Some(3),
        };
        let Json(a) = assess(State(state.clone()), Json(request())).await.unwrap();
        let Json(b) = assess(State(state), Json(request())).await.unwrap();
        assert_eq!(a.regional, b.regional);
        assert_eq!(a.assessment, b.assessment);
    }
}
