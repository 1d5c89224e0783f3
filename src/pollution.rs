//! Water Pollution Index engine.
//!
//! The index passes through a stack of gates before any arithmetic happens:
//! uninhabited points are pristine no matter what the sliders say, and a point
//! with neither sewage nor industry has nothing to pollute it. Only then do
//! population, time and treatment shape the score.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::SimError,
    geo::{GeoData, Habitability},
};

/// Score reported for every gated (pristine) outcome.
pub const BASELINE_WPI: f64 = 0.01;
/// Population at which the population multiplier saturates.
pub const MAX_REGIONAL_POPULATION: f64 = 20_000_000.0;
pub const SEWAGE_WEIGHT: f64 = 0.45;
pub const INDUSTRY_WEIGHT: f64 = 0.35;
pub const POPULATION_BOOST: f64 = 0.4;
pub const ANNUAL_ACCUMULATION: f64 = 0.05;
/// Fraction of the load left after each year of full treatment.
pub const TREATED_ANNUAL_RETENTION: f64 = 0.9;
pub const MAX_YEARS_ACTIVE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TreatmentLevel {
    #[default]
    None,
    Partial,
    Full,
}

impl TreatmentLevel {
    /// Share of dropped sewage that still reaches the water.
    pub fn factor(self) -> f64 {
        match self {
            TreatmentLevel::None => 1.0,
            TreatmentLevel::Partial => 0.5,
            TreatmentLevel::Full => 0.1,
        }
    }
}

impl FromStr for TreatmentLevel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(TreatmentLevel::None),
            "partial" => Ok(TreatmentLevel::Partial),
            "full" => Ok(TreatmentLevel::Full),
            other => Err(SimError::parameter(
                "sewage_treatment",
                format!("unknown treatment level '{other}' (expected None, Partial or Full)"),
            )),
        }
    }
}

impl fmt::Display for TreatmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TreatmentLevel::None => "None",
            TreatmentLevel::Partial => "Partial",
            TreatmentLevel::Full => "Full",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndustryType {
    #[default]
    Chemical,
    Textile,
    Heavy,
}

impl IndustryType {
    pub fn toxicity(self) -> f64 {
        match self {
            IndustryType::Chemical => 1.0,
            IndustryType::Textile => 0.6,
            IndustryType::Heavy => 0.3,
        }
    }
}

impl FromStr for IndustryType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chemical" => Ok(IndustryType::Chemical),
            "textile" => Ok(IndustryType::Textile),
            "heavy" => Ok(IndustryType::Heavy),
            other => Err(SimError::parameter(
                "industry_type",
                format!("unknown industry type '{other}' (expected Chemical, Textile or Heavy)"),
            )),
        }
    }
}

impl fmt::Display for IndustryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IndustryType::Chemical => "Chemical",
            IndustryType::Textile => "Textile",
            IndustryType::Heavy => "Heavy",
        };
        f.write_str(label)
    }
}

fn default_sewage_dropping() -> f64 {
    0.5
}

fn default_industrial_density() -> f64 {
    0.5
}

fn default_radius_km() -> f64 {
    200.0
}

/// Caller-owned simulation inputs. The engine only ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationParams {
    #[serde(default = "default_sewage_dropping")]
    pub sewage_dropping: f64,
    #[serde(default = "default_industrial_density")]
    pub industrial_density: f64,
    #[serde(default)]
    pub years_active: u32,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default)]
    pub sewage_treatment: TreatmentLevel,
    #[serde(default)]
    pub industry_type: IndustryType,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            sewage_dropping: default_sewage_dropping(),
            industrial_density: default_industrial_density(),
            years_active: 0,
            radius_km: default_radius_km(),
            sewage_treatment: TreatmentLevel::default(),
            industry_type: IndustryType::default(),
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), SimError> {
        check_unit("sewage_dropping", self.sewage_dropping)?;
        check_unit("industrial_density", self.industrial_density)?;
        if self.years_active > MAX_YEARS_ACTIVE {
            return Err(SimError::parameter(
                "years_active",
                format!("{} exceeds the {MAX_YEARS_ACTIVE} year horizon", self.years_active),
            ));
        }
        if !(10.0..=1000.0).contains(&self.radius_km) {
            return Err(SimError::parameter(
                "radius_km",
                format!("{} is outside [10, 1000]", self.radius_km),
            ));
        }
        Ok(())
    }

    pub fn has_sources(&self) -> bool {
        self.sewage_dropping > 0.0 || self.industrial_density > 0.0
    }

    pub fn with_years_active(self, years_active: u32) -> Self {
        Self {
            years_active,
            ..self
        }
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), SimError> {
    // NaN fails the range check too.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::parameter(name, format!("{value} is outside [0, 1]")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WpiStatus {
    SafeStart,
    SafeNatural,
    SafeNoSources,
    SafeDrinking,
    SafeGeneral,
    Stressed,
    UnsafeDangerous,
}

impl WpiStatus {
    /// Status for a computed (ungated) score.
    pub fn for_value(value: f64) -> Self {
        if value < 0.10 {
            WpiStatus::SafeDrinking
        } else if value < 0.30 {
            WpiStatus::SafeGeneral
        } else if value < 0.60 {
            WpiStatus::Stressed
        } else {
            WpiStatus::UnsafeDangerous
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WpiStatus::SafeStart => "Safe (Start)",
            WpiStatus::SafeNatural => "Safe (Natural / Uninhabited)",
            WpiStatus::SafeNoSources => "Safe (No Pollution Sources)",
            WpiStatus::SafeDrinking => "Safe (Drinking)",
            WpiStatus::SafeGeneral => "Safe (General Use)",
            WpiStatus::Stressed => "Stressed",
            WpiStatus::UnsafeDangerous => "Unsafe (Dangerous)",
        }
    }
}

impl fmt::Display for WpiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WpiResult {
    pub value: f64,
    pub status: WpiStatus,
}

impl WpiResult {
    /// Nothing selected yet.
    pub fn unselected() -> Self {
        Self {
            value: BASELINE_WPI,
            status: WpiStatus::SafeStart,
        }
    }

    fn gated(status: WpiStatus) -> Self {
        Self {
            value: BASELINE_WPI,
            status,
        }
    }
}

/// The weighted contributions before any multiplier is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BaseLoad {
    pub sewage: f64,
    pub industry: f64,
}

impl BaseLoad {
    pub fn new(params: &SimulationParams) -> Self {
        let sewage_impact = params.sewage_dropping * params.sewage_treatment.factor();
        let industry_impact = params.industrial_density * params.industry_type.toxicity();
        Self {
            sewage: SEWAGE_WEIGHT * sewage_impact,
            industry: INDUSTRY_WEIGHT * industry_impact,
        }
    }

    pub fn total(&self) -> f64 {
        self.sewage + self.industry
    }
}

pub(crate) fn population_ratio(population: u64) -> f64 {
    (population as f64 / MAX_REGIONAL_POPULATION).min(1.0)
}

/// Applies the gates shared by the live score and the projection.
pub(crate) fn gate(geo: &GeoData, params: &SimulationParams) -> Option<WpiStatus> {
    if geo.habitability == Habitability::Uninhabited {
        Some(WpiStatus::SafeNatural)
    } else if !params.has_sources() {
        Some(WpiStatus::SafeNoSources)
    } else {
        None
    }
}

/// Unclamped index for a source-bearing, habitable point after `years` years.
pub(crate) fn raw_index(population: u64, params: &SimulationParams, years: u32) -> f64 {
    let base = BaseLoad::new(params).total();
    let pop_multiplier = 1.0 + POPULATION_BOOST * population_ratio(population);
    let time_factor = 1.0 + ANNUAL_ACCUMULATION * years as f64;
    let decay = match params.sewage_treatment {
        TreatmentLevel::Full => TREATED_ANNUAL_RETENTION.powi(years as i32),
        TreatmentLevel::None | TreatmentLevel::Partial => 1.0,
    };
    base * pop_multiplier * time_factor * decay
}

/// Scores `geo` under `params`.
pub fn compute_wpi(geo: &GeoData, params: &SimulationParams) -> WpiResult {
    if let Some(status) = gate(geo, params) {
        return WpiResult::gated(status);
    }
    let value = raw_index(geo.population, params, params.years_active).clamp(0.0, 1.0);
    WpiResult {
        value,
        status: WpiStatus::for_value(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{classify, Classification};

    fn city(population: u64) -> GeoData {
        GeoData {
            population,
            classification: Classification::Metro,
            biome: "Urban Center".into(),
            is_water: false,
            habitability: Habitability::Habitable,
            explanation: Vec::new(),
        }
    }

    fn params(sewage: f64, industry: f64) -> SimulationParams {
        SimulationParams {
            sewage_dropping: sewage,
            industrial_density: industry,
            ..SimulationParams::default()
        }
    }

    #[test]
    fn uninhabited_is_always_natural() {
        let ocean = classify(0.0, -150.0).unwrap();
        let mut worst = params(1.0, 1.0);
        worst.years_active = 50;
        let result = compute_wpi(&ocean, &worst);
        assert_eq!(result.value, BASELINE_WPI);
        assert_eq!(result.status, WpiStatus::SafeNatural);
    }

    #[test]
    fn no_sources_is_baseline() {
        for years in [0, 10, 50] {
            let p = params(0.0, 0.0).with_years_active(years);
            let result = compute_wpi(&city(20_000_000), &p);
            assert_eq!(result.value, BASELINE_WPI);
            assert_eq!(result.status, WpiStatus::SafeNoSources);
        }
    }

    #[test]
    fn mumbai_example_is_dangerous() {
        let geo = classify(19.07, 72.87).unwrap();
        let p = params(0.8, 0.6);
        let result = compute_wpi(&geo, &p);
        let expected = (0.45 * 0.8 + 0.35 * 0.6) * 1.4;
        assert!((result.value - expected).abs() < 1e-9, "{}", result.value);
        assert_eq!(result.status, WpiStatus::UnsafeDangerous);
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(WpiStatus::for_value(0.0999), WpiStatus::SafeDrinking);
        assert_eq!(WpiStatus::for_value(0.10), WpiStatus::SafeGeneral);
        assert_eq!(WpiStatus::for_value(0.30), WpiStatus::Stressed);
        assert_eq!(WpiStatus::for_value(0.60), WpiStatus::UnsafeDangerous);
    }

    #[test]
    fn value_is_clamped() {
        let mut p = params(1.0, 1.0);
        p.years_active = 50;
        let result = compute_wpi(&city(20_000_000), &p);
        assert_eq!(result.value, 1.0);
    }

    #[test]
    fn full_treatment_decays_over_time() {
        let mut p = params(0.9, 0.2);
        p.sewage_treatment = TreatmentLevel::Full;
        let early = compute_wpi(&city(1_000_000), &p.with_years_active(2)).value;
        let late = compute_wpi(&city(1_000_000), &p.with_years_active(30)).value;
        assert!(late < early);
    }

    #[test]
    fn unknown_enum_names_fail() {
        assert_eq!("partial".parse::<TreatmentLevel>(), Ok(TreatmentLevel::Partial));
        assert_eq!(" Heavy ".parse::<IndustryType>(), Ok(IndustryType::Heavy));
        assert!(matches!(
            "Light".parse::<IndustryType>(),
            Err(SimError::InvalidParameter { name: "industry_type", .. })
        ));
        assert!("Tertiary".parse::<TreatmentLevel>().is_err());
        let yaml = "industry_type: Light\n";
        assert!(serde_yaml::from_str::<SimulationParams>(yaml).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(SimulationParams::default().validate().is_ok());
        assert!(params(1.2, 0.0).validate().is_err());
        assert!(params(0.0, -0.1).validate().is_err());
        assert!(params(f64::NAN, 0.0).validate().is_err());
        assert!(SimulationParams::default().with_years_active(51).validate().is_err());
        let mut p = SimulationParams::default();
        p.radius_km = 5.0;
        assert!(p.validate().is_err());
    }
}
