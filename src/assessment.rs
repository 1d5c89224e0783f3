use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    enrichment::FacilityReport,
    error::SimError,
    geo::{classify_coordinate, Coordinate, GeoData},
    mitigation::mitigation_plan,
    pollution::{compute_wpi, SimulationParams, WpiResult},
    projection::{
        project_timeline, regional_scatter, source_breakdown, ProjectionPoint, ScatterPoint,
        SourceBreakdown,
    },
};

/// Every derived output for one coordinate under one set of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub coordinate: Coordinate,
    pub geo: GeoData,
    pub params: SimulationParams,
    pub wpi: WpiResult,
    pub timeline: Vec<ProjectionPoint>,
    pub breakdown: Option<SourceBreakdown>,
    pub mitigation: Vec<String>,
    /// Facility data folded into `params`, if any arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<FacilityReport>,
}

impl Assessment {
    pub fn evaluate(coordinate: Coordinate, params: &SimulationParams) -> Result<Self, SimError> {
        params.validate()?;
        let geo = classify_coordinate(coordinate);
        Ok(Self::from_parts(coordinate, geo, *params, None))
    }

    /// Re-runs the engine with the facility report applied on top of `params`.
    /// Uninhabited points ignore the report entirely.
    pub fn evaluate_enriched(
        coordinate: Coordinate,
        params: &SimulationParams,
        report: &FacilityReport,
    ) -> Result<Self, SimError> {
        params.validate()?;
        let geo = classify_coordinate(coordinate);
        if !geo.is_habitable() {
            return Ok(Self::from_parts(coordinate, geo, *params, None));
        }
        let enriched = report.apply(params);
        Ok(Self::from_parts(coordinate, geo, enriched, Some(report.clone())))
    }

    fn from_parts(
        coordinate: Coordinate,
        geo: GeoData,
        params: SimulationParams,
        facilities: Option<FacilityReport>,
    ) -> Self {
        let wpi = compute_wpi(&geo, &params);
        let timeline = project_timeline(&geo, &params);
        let breakdown = source_breakdown(&geo, &params, wpi.value);
        let mitigation = mitigation_plan(&geo, &params, wpi.value);
        Self {
            coordinate,
            geo,
            params,
            wpi,
            timeline,
            breakdown,
            mitigation,
            facilities,
        }
    }

    pub fn regional_scatter<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ScatterPoint> {
        regional_scatter(&self.geo, self.wpi.value, rng)
    }
}

/// A labelled coordinate in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub params: Option<SimulationParams>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: SiteOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteOutcome {
    Assessment(Box<Assessment>),
    Error(String),
}

impl SiteReport {
    pub fn assessment(&self) -> Option<&Assessment> {
        match &self.outcome {
            SiteOutcome::Assessment(assessment) => Some(assessment),
            SiteOutcome::Error(_) => None,
        }
    }
}

/// Evaluates every site independently and in parallel. Input order is kept.
pub fn evaluate_batch(sites: &[Site], defaults: &SimulationParams) -> Vec<SiteReport> {
    sites
        .par_iter()
        .map(|site| {
            let params = site.params.as_ref().unwrap_or(defaults);
            let outcome = Coordinate::new(site.lat, site.lon)
                .and_then(|coordinate| Assessment::evaluate(coordinate, params));
            SiteReport {
                name: site.name.clone(),
                outcome: match outcome {
                    Ok(assessment) => SiteOutcome::Assessment(Box::new(assessment)),
                    Err(err) => SiteOutcome::Error(err.to_string()),
                },
            }
        })
        .collect()
}
