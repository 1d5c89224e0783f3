//! Offline facility extract. Stands in for a live OpenStreetMap query by
//! counting catalogued sites within the query radius.

use std::{fs, future::Future, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{EnrichmentError, FacilityQuery, FacilityReport, FacilitySource, ReportSource};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityKind {
    Industrial,
    WastewaterPlant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub kind: FacilityKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityCatalog {
    pub facilities: Vec<Facility>,
}

impl FacilityCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read facility catalog {}", path.display()))?;
        Self::from_yaml_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let catalog: FacilityCatalog = serde_yaml::from_str(data)?;
        Ok(catalog)
    }

    /// Facilities within `query.radius_m` of the query point.
    pub fn within<'a>(
        &'a self,
        query: &'a FacilityQuery,
    ) -> impl Iterator<Item = &'a Facility> + 'a {
        self.facilities.iter().filter(move |facility| {
            haversine_m(query.lat, query.lon, facility.lat, facility.lon) <= query.radius_m
        })
    }

    pub fn survey(&self, query: &FacilityQuery) -> FacilityReport {
        let mut count = 0;
        let mut has_wastewater_plant = false;
        for facility in self.within(query) {
            count += 1;
            has_wastewater_plant |= facility.kind == FacilityKind::WastewaterPlant;
        }
        FacilityReport {
            count,
            has_wastewater_plant,
            source: ReportSource::OpenStreetMap,
            timestamp: None,
        }
    }
}

impl FacilitySource for FacilityCatalog {
    fn query(
        &self,
        query: FacilityQuery,
    ) -> impl Future<Output = Result<FacilityReport, EnrichmentError>> + Send {
        std::future::ready(Ok(self.survey(&query)))
    }
}

/// Great-circle distance in metres.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}
