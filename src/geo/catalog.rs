//! Fixed reference data for the classifier. Coordinates are in degrees.

use serde::Serialize;

/// A city "gravity well": its population spreads out around the centre and
/// falls off with squared distance.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PopulationHub {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    /// Millions of inhabitants at the centre.
    pub base_population_m: f64,
    /// Degrees beyond which the hub contributes nothing to a city hit.
    pub spread_radius: f64,
}

impl PopulationHub {
    const fn new(
        name: &'static str,
        lat: f64,
        lon: f64,
        base_population_m: f64,
        spread_radius: f64,
    ) -> Self {
        Self {
            name,
            lat,
            lon,
            base_population_m,
            spread_radius,
        }
    }

    /// Euclidean distance in degree space.
    pub fn distance(&self, lat: f64, lon: f64) -> f64 {
        let d_lat = lat - self.lat;
        let d_lon = lon - self.lon;
        (d_lat * d_lat + d_lon * d_lon).sqrt()
    }

    /// Population this hub projects onto a point `distance` degrees away.
    /// Gaussian with sigma = spread / 2, independent of any radius cut-off.
    pub fn impact_at(&self, distance: f64) -> f64 {
        let sigma = self.spread_radius / 2.0;
        let falloff = (-(distance * distance) / (2.0 * sigma * sigma)).exp();
        self.base_population_m * 1_000_000.0 * falloff
    }
}

/// Latitude/longitude bounding box, inclusive on every edge.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lon >= self.lon_min && lon <= self.lon_max
    }
}

/// Region forced to uninhabited unless a hub claims the point first.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExclusionZone {
    pub label: &'static str,
    pub bounds: BoundingBox,
}

impl ExclusionZone {
    const fn new(label: &'static str, lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            label,
            bounds: BoundingBox::new(lat_min, lat_max, lon_min, lon_max),
        }
    }
}

/// Rough continental box; anything outside every box is open ocean.
pub type LandBox = BoundingBox;

pub const POPULATION_HUBS: [PopulationHub; 22] = [
    // Asia
    PopulationHub::new("Delhi", 28.61, 77.20, 32.0, 5.0),
    PopulationHub::new("Mumbai", 19.07, 72.87, 20.0, 4.0),
    PopulationHub::new("Tokyo", 35.67, 139.65, 37.0, 4.0),
    PopulationHub::new("Shanghai", 31.23, 121.47, 27.0, 4.0),
    PopulationHub::new("Bangkok", 13.75, 100.50, 10.0, 3.0),
    PopulationHub::new("Hong Kong", 22.31, 114.16, 7.0, 2.0),
    PopulationHub::new("Singapore", 1.35, 103.81, 5.0, 2.0),
    // Europe
    PopulationHub::new("London", 51.50, -0.12, 9.0, 3.0),
    PopulationHub::new("Paris", 48.85, 2.35, 11.0, 3.0),
    PopulationHub::new("Berlin", 52.52, 13.40, 4.0, 3.0),
    PopulationHub::new("Rome", 41.90, 12.49, 3.0, 3.0),
    PopulationHub::new("Moscow", 55.75, 37.61, 12.0, 4.0),
    // Americas
    PopulationHub::new("New York", 40.71, -74.00, 19.0, 4.0),
    PopulationHub::new("Los Angeles", 34.05, -118.24, 13.0, 4.0),
    PopulationHub::new("Chicago", 41.87, -87.62, 9.0, 3.0),
    PopulationHub::new("Sao Paulo", -23.55, -46.63, 22.0, 4.0),
    PopulationHub::new("Mexico City", 19.43, -99.13, 21.0, 3.0),
    // Africa / Middle East
    PopulationHub::new("Cairo", 30.04, 31.23, 21.0, 3.0),
    PopulationHub::new("Lagos", 6.52, 3.37, 15.0, 3.5),
    PopulationHub::new("Dubai", 25.20, 55.27, 3.0, 2.0),
    PopulationHub::new("Cape Town", -33.92, 18.42, 4.0, 2.0),
    // Oceania
    PopulationHub::new("Sydney", -33.86, 151.20, 5.0, 2.0),
];

/// Checked in order; the first containing zone names the point.
pub const EXCLUSION_ZONES: [ExclusionZone; 18] = [
    ExclusionZone::new("Himalayas / Tibetan Plateau", 27.0, 36.0, 75.0, 100.0),
    ExclusionZone::new("Sahara Desert", 18.0, 30.0, -10.0, 35.0),
    ExclusionZone::new("Australian Outback (Deep)", -25.0, -20.0, 120.0, 140.0),
    ExclusionZone::new("Arctic / Ice Cap", 72.0, 90.0, -180.0, 180.0),
    ExclusionZone::new("Antarctica", -90.0, -60.0, -180.0, 180.0),
    ExclusionZone::new("Amazon Deep Rainforest", -5.0, 2.0, -70.0, -60.0),
    ExclusionZone::new("Northern Canada / Tundra", 60.0, 75.0, -160.0, -100.0),
    ExclusionZone::new("Siberian Tundra", 55.0, 75.0, 60.0, 130.0),
    // Open water carved out of the broad land boxes below.
    ExclusionZone::new("Arabian Sea", 10.0, 25.0, 60.0, 73.0),
    ExclusionZone::new("Bay of Bengal", 8.0, 22.0, 86.0, 95.0),
    ExclusionZone::new("Indian Ocean (Deep)", -40.0, 5.0, 50.0, 85.0),
    ExclusionZone::new("South China Sea", -5.0, 25.0, 110.0, 130.0),
    ExclusionZone::new("Philippine Sea / Pacific", 5.0, 30.0, 130.0, 160.0),
    ExclusionZone::new("North Pacific", 25.0, 50.0, 135.0, 180.0),
    ExclusionZone::new("North Pacific (East)", 20.0, 40.0, -160.0, -125.0),
    ExclusionZone::new("North Atlantic (Mid)", 10.0, 40.0, -70.0, -40.0),
    ExclusionZone::new("South Atlantic (Mid)", -40.0, 10.0, -30.0, 10.0),
    ExclusionZone::new("Southern Ocean", -60.0, -40.0, -180.0, 180.0),
];

pub const LAND_BOXES: [LandBox; 11] = [
    // India subcontinent
    BoundingBox::new(8.0, 37.0, 68.0, 97.0),
    // China / East Asia
    BoundingBox::new(18.0, 53.0, 98.0, 135.0),
    // South-East Asia mainland
    BoundingBox::new(5.0, 25.0, 95.0, 110.0),
    // Indonesia
    BoundingBox::new(-10.0, 5.0, 95.0, 120.0),
    // Philippines
    BoundingBox::new(5.0, 20.0, 120.0, 127.0),
    // Japan / Korea
    BoundingBox::new(33.0, 45.0, 125.0, 145.0),
    // Europe
    BoundingBox::new(36.0, 70.0, -10.0, 40.0),
    // Africa
    BoundingBox::new(-35.0, 37.0, -18.0, 52.0),
    // North America
    BoundingBox::new(15.0, 70.0, -140.0, -50.0),
    // South America
    BoundingBox::new(-56.0, 13.0, -82.0, -34.0),
    // Australia
    BoundingBox::new(-40.0, -10.0, 112.0, 154.0),
];

pub fn hub_named(name: &str) -> Option<&'static PopulationHub> {
    POPULATION_HUBS.iter().find(|hub| hub.name == name)
}
