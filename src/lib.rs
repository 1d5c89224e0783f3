pub mod assessment;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod geo;
pub mod logging;
pub mod mitigation;
pub mod noise;
pub mod pollution;
pub mod projection;
pub mod scenario;
pub mod web;

pub use assessment::{evaluate_batch, Assessment, Site};
pub use config::Config;
pub use error::SimError;
pub use geo::{classify, Classification, Coordinate, GeoData, Habitability};
pub use mitigation::mitigation_plan;
pub use pollution::{
    compute_wpi, IndustryType, SimulationParams, TreatmentLevel, WpiResult, WpiStatus,
};
pub use projection::{project_timeline, source_breakdown, ProjectionPoint, SourceBreakdown};
