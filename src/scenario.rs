use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    assessment::{evaluate_batch, Site, SiteReport},
    pollution::SimulationParams,
};

/// A named batch of sites sharing base parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub params: SimulationParams,
    pub sites: Vec<Site>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Coordinates are left to the batch run, which reports them per site.
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            bail!("scenario '{}' must define at least one site", self.name);
        }
        self.params
            .validate()
            .with_context(|| format!("scenario '{}' base params", self.name))?;
        Ok(())
    }

    pub fn run(&self) -> ScenarioReport {
        info!(scenario = %self.name, sites = self.sites.len(), "evaluating scenario");
        let sites = evaluate_batch(&self.sites, &self.params);
        let failed = sites.iter().filter(|s| s.assessment().is_none()).count();
        info!(scenario = %self.name, failed, "scenario complete");
        ScenarioReport {
            scenario: self.name.clone(),
            generated_at: Utc::now(),
            sites,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub generated_at: DateTime<Utc>,
    pub sites: Vec<SiteReport>,
}

impl ScenarioReport {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
