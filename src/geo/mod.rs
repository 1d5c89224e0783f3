//! Coordinate classifier: a deterministic toy model of who lives where.
//!
//! Rules are evaluated in strict order and the first one that matches wins:
//!
//! 1. hub override (cities beat every exclusion zone, so coastal hubs such as
//!    Mumbai are never reported as open sea)
//! 2. exclusion zones, in catalog order
//! 3. anything outside every land box is ocean
//! 4. remaining land gets a suburban or rural population

pub mod catalog;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::SimError, noise::noise};

pub use catalog::{
    BoundingBox, ExclusionZone, LandBox, PopulationHub, EXCLUSION_ZONES, LAND_BOXES,
    POPULATION_HUBS,
};

/// Accumulated hub impact above which a point is treated as a city.
pub const CITY_IMPACT_THRESHOLD: f64 = 10_000.0;
/// Lower bound for suburban influence on plain land.
pub const SUBURBAN_IMPACT_FLOOR: f64 = 100.0;
/// Widening applied to hub radii when looking for suburban influence.
pub const SUBURBAN_RADIUS_SCALE: f64 = 1.5;
/// Every habitable rural point has at least this many inhabitants.
pub const RURAL_BASE_POPULATION: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Validates without clamping.
    pub fn new(lat: f64, lon: f64) -> Result<Self, SimError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if valid {
            Ok(Self { lat, lon })
        } else {
            Err(SimError::InvalidCoordinate { lat, lon })
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Ocean,
    Uninhabited,
    Rural,
    Town,
    Urban,
    Metro,
    Megacity,
}

impl Classification {
    /// Tier for a hub hit. Anything that qualified as a city is at least Urban.
    fn for_city(population: u64) -> Self {
        if population > 5_000_000 {
            Classification::Megacity
        } else if population > 1_000_000 {
            Classification::Metro
        } else {
            Classification::Urban
        }
    }

    /// Tier for suburban and rural land.
    fn for_settlement(population: u64) -> Self {
        if population > 5_000_000 {
            Classification::Megacity
        } else if population > 1_000_000 {
            Classification::Metro
        } else if population > 100_000 {
            Classification::Urban
        } else if population > 5_000 {
            Classification::Town
        } else {
            Classification::Rural
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Ocean => "Ocean",
            Classification::Uninhabited => "Uninhabited",
            Classification::Rural => "Rural",
            Classification::Town => "Town",
            Classification::Urban => "Urban",
            Classification::Metro => "Metro",
            Classification::Megacity => "Megacity",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Habitability {
    Habitable,
    Uninhabited,
}

/// Classifier output. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoData {
    pub population: u64,
    pub classification: Classification,
    pub biome: String,
    pub is_water: bool,
    pub habitability: Habitability,
    pub explanation: Vec<String>,
}

impl GeoData {
    pub fn is_habitable(&self) -> bool {
        self.habitability == Habitability::Habitable
    }

    fn uninhabited(zone: &ExclusionZone) -> Self {
        Self {
            population: 0,
            classification: Classification::Uninhabited,
            biome: zone.label.to_string(),
            is_water: true,
            habitability: Habitability::Uninhabited,
            explanation: vec![
                format!("Biome: {}", zone.label),
                "Environment is Uninhabited or Open Water.".to_string(),
                "Natural State: Preserved.".to_string(),
            ],
        }
    }

    fn ocean() -> Self {
        Self {
            population: 0,
            classification: Classification::Ocean,
            biome: "Deep Ocean".to_string(),
            is_water: true,
            habitability: Habitability::Uninhabited,
            explanation: vec![
                "Location is in a major water body.".to_string(),
                "Zero permanent population.".to_string(),
            ],
        }
    }
}

/// The reference data a classification runs against.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    pub hubs: &'a [PopulationHub],
    pub exclusion_zones: &'a [ExclusionZone],
    pub land_boxes: &'a [LandBox],
}

impl Catalog<'static> {
    pub fn builtin() -> Self {
        Self {
            hubs: &POPULATION_HUBS,
            exclusion_zones: &EXCLUSION_ZONES,
            land_boxes: &LAND_BOXES,
        }
    }
}

impl<'a> Catalog<'a> {
    /// Sums the impact of every hub whose scaled radius covers the point.
    pub fn hub_impact(&self, lat: f64, lon: f64, radius_scale: f64) -> f64 {
        self.hubs
            .iter()
            .filter_map(|hub| {
                let distance = hub.distance(lat, lon);
                (distance < hub.spread_radius * radius_scale).then(|| hub.impact_at(distance))
            })
            .sum()
    }

    pub fn exclusion_zone(&self, lat: f64, lon: f64) -> Option<&'a ExclusionZone> {
        self.exclusion_zones
            .iter()
            .find(|zone| zone.bounds.contains(lat, lon))
    }

    pub fn is_land(&self, lat: f64, lon: f64) -> bool {
        self.land_boxes.iter().any(|land| land.contains(lat, lon))
    }

    /// Classifies an already validated coordinate.
    pub fn classify(&self, coordinate: Coordinate) -> GeoData {
        let Coordinate { lat, lon } = coordinate;

        let city_impact = self.hub_impact(lat, lon, 1.0);
        if city_impact > CITY_IMPACT_THRESHOLD {
            let population = city_impact.floor() as u64;
            return GeoData {
                population,
                classification: Classification::for_city(population),
                biome: "Urban Center".to_string(),
                is_water: false,
                habitability: Habitability::Habitable,
                explanation: vec![
                    "Major Urban Hub detected.".to_string(),
                    format!("Population: {}", format_population(population)),
                ],
            };
        }

        if let Some(zone) = self.exclusion_zone(lat, lon) {
            return GeoData::uninhabited(zone);
        }

        if !self.is_land(lat, lon) {
            return GeoData::ocean();
        }

        let suburban_impact = self.hub_impact(lat, lon, SUBURBAN_RADIUS_SCALE);
        let (population, biome) =
            if suburban_impact > SUBURBAN_IMPACT_FLOOR && suburban_impact <= CITY_IMPACT_THRESHOLD {
                ((suburban_impact + 500.0).floor() as u64, "Suburban")
            } else {
                (rural_population(lat, lon), "Rural Settlement")
            };

        GeoData {
            population,
            classification: Classification::for_settlement(population),
            biome: biome.to_string(),
            is_water: false,
            habitability: Habitability::Habitable,
            explanation: vec![
                format!("Biome: {biome}"),
                format!("Estimated Population: {}", format_population(population)),
            ],
        }
    }
}

fn rural_population(lat: f64, lon: f64) -> u64 {
    let local = noise(lat, lon);
    let regional = noise(lat * 0.5, lon * 0.5);
    (RURAL_BASE_POPULATION as f64 + local * 5_000.0 + regional * 15_000.0).floor() as u64
}

/// Validates `(lat, lon)` and classifies it against the built-in catalog.
pub fn classify(lat: f64, lon: f64) -> Result<GeoData, SimError> {
    Coordinate::new(lat, lon).map(classify_coordinate)
}

pub fn classify_coordinate(coordinate: Coordinate) -> GeoData {
    Catalog::builtin().classify(coordinate)
}

/// `12345678` -> `"12,345,678"`.
pub fn format_population(population: u64) -> String {
    let digits = population.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
