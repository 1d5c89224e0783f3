//! Rule-based advisories. Severity first, then the dominant cause, then
//! anything that depends on the size of the settlement.

use crate::{
    geo::GeoData,
    pollution::{IndustryType, SimulationParams, TreatmentLevel},
};

const SAFE_THRESHOLD: f64 = 0.05;
const HIGH_RISK_THRESHOLD: f64 = 0.6;
const CRITICAL_THRESHOLD: f64 = 0.8;
const URBAN_SCALE_POPULATION: u64 = 1_000_000;

pub const SAFE_ADVISORY: &str = "SAFE: Zone is safe. No intervention required; continue routine monitoring.";

const CRITICAL_ADVISORIES: [&str; 2] = [
    "CRITICAL: Limit water usage immediately.",
    "CRITICAL: Deploy mobile filtration units.",
];
const HIGH_RISK_ADVISORY: &str = "HIGH RISK: Issue boil-water advisories.";
const SEWAGE_ADVISORIES: [&str; 3] = [
    "INFRASTRUCTURE: Retrofit 3-stage STP (Sewage Treatment Plants).",
    "NATURE-BASED: Construct wetlands to absorb organic load.",
    "POLICY: Mandate greywater recycling for residential blocks.",
];
const INDUSTRY_ADVISORIES: [&str; 3] = [
    "INDUSTRY: Enforce Zero Liquid Discharge (ZLD) protocols.",
    "TOXICITY: Install heavy metal precipitation units.",
    "LEGAL: Penalty for untreated effluent discharge.",
];
const URBAN_ADVISORY: &str =
    "URBAN: Implement rainwater harvesting to dilute groundwater salinity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominantCause {
    Sewage,
    Industry,
}

impl DominantCause {
    /// Weighs each cause by how hard it is to mitigate. Ties go to industry.
    pub fn of(params: &SimulationParams) -> Self {
        let sewage = params.sewage_dropping
            * match params.sewage_treatment {
                TreatmentLevel::None => 1.0,
                TreatmentLevel::Partial | TreatmentLevel::Full => 0.5,
            };
        let industry = params.industrial_density
            * match params.industry_type {
                IndustryType::Chemical => 1.0,
                IndustryType::Textile | IndustryType::Heavy => 0.6,
            };
        if sewage > industry {
            DominantCause::Sewage
        } else {
            DominantCause::Industry
        }
    }
}

pub fn mitigation_plan(geo: &GeoData, params: &SimulationParams, wpi: f64) -> Vec<String> {
    if wpi <= SAFE_THRESHOLD {
        return vec![SAFE_ADVISORY.to_string()];
    }

    let mut plan: Vec<&str> = Vec::new();
    if wpi > CRITICAL_THRESHOLD {
        plan.extend(CRITICAL_ADVISORIES);
    } else if wpi > HIGH_RISK_THRESHOLD {
        plan.push(HIGH_RISK_ADVISORY);
    }

    match DominantCause::of(params) {
        DominantCause::Sewage => plan.extend(SEWAGE_ADVISORIES),
        DominantCause::Industry => plan.extend(INDUSTRY_ADVISORIES),
    }

    if geo.population > URBAN_SCALE_POPULATION {
        plan.push(URBAN_ADVISORY);
    }

    plan.into_iter().map(str::to_string).collect()
}
