//! Derived series built from the same formula family as the live index.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    geo::GeoData,
    pollution::{
        gate, population_ratio, raw_index, BaseLoad, SimulationParams, BASELINE_WPI,
        POPULATION_BOOST,
    },
};

pub const PROJECTION_YEARS: u32 = 20;
pub const SCATTER_POINTS: usize = 30;
/// Area of a 10 km radius disc, used to turn a head count into a density.
pub const REFERENCE_AREA_KM2: f64 = 314.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub year: u32,
    pub wpi: f64,
}

/// Index for every year from 0 through 20, floored at the baseline.
pub fn project_timeline(geo: &GeoData, params: &SimulationParams) -> Vec<ProjectionPoint> {
    let gated = gate(geo, params).is_some();
    (0..=PROJECTION_YEARS)
        .map(|year| {
            let wpi = if gated {
                BASELINE_WPI
            } else {
                raw_index(geo.population, params, year).clamp(BASELINE_WPI, 1.0)
            };
            ProjectionPoint { year, wpi }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub sewage: f64,
    pub industry: f64,
    pub pop_boost: f64,
}

impl SourceBreakdown {
    pub const LABELS: [&'static str; 3] = ["Sewage", "Industry", "Pop. Multiplier"];

    pub fn values(&self) -> [f64; 3] {
        [self.sewage, self.industry, self.pop_boost]
    }

    pub fn total(&self) -> f64 {
        self.sewage + self.industry + self.pop_boost
    }

    /// Label of the largest contribution.
    pub fn dominant(&self) -> &'static str {
        let values = self.values();
        let mut best = 0;
        for (index, value) in values.iter().enumerate() {
            if *value > values[best] {
                best = index;
            }
        }
        Self::LABELS[best]
    }
}

/// Splits the pre-time base score into its three contributors.
/// `None` when the point is at or below the baseline.
pub fn source_breakdown(
    geo: &GeoData,
    params: &SimulationParams,
    wpi: f64,
) -> Option<SourceBreakdown> {
    if wpi <= BASELINE_WPI {
        return None;
    }
    let load = BaseLoad::new(params);
    let pop_boost = load.total() * POPULATION_BOOST * population_ratio(geo.population);
    Some(SourceBreakdown {
        sewage: load.sewage,
        industry: load.industry,
        pop_boost,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    /// People per km².
    pub density: f64,
    pub wpi: f64,
}

pub fn population_density(geo: &GeoData) -> f64 {
    geo.population as f64 / REFERENCE_AREA_KM2
}

/// Illustrative neighbours around the selected point. Purely decorative:
/// nothing downstream depends on these values.
pub fn regional_scatter<R: Rng + ?Sized>(
    geo: &GeoData,
    wpi: f64,
    rng: &mut R,
) -> Vec<ScatterPoint> {
    let current = population_density(geo);
    (0..SCATTER_POINTS)
        .map(|_| {
            let density = (current * rng.gen_range(0.5..1.5)).max(0.0);
            let spread = rng.gen_range(0.8..1.2);
            let wpi = (wpi * (density / current.max(1.0)) * spread).min(1.0);
            ScatterPoint { density, wpi }
        })
        .collect()
}

pub fn regional_scatter_unseeded(geo: &GeoData, wpi: f64) -> Vec<ScatterPoint> {
    regional_scatter(geo, wpi, &mut rand::thread_rng())
}
