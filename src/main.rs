use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use wpi_sim::{
    assessment::Assessment,
    config::Config,
    enrichment::{FacilityReport, ReportSource},
    geo::{format_population, Coordinate},
    logging,
    pollution::{IndustryType, SimulationParams, TreatmentLevel},
    scenario::ScenarioLoader,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Water Pollution Index simulator")]
struct Cli {
    /// Path to a YAML config file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a single coordinate
    Assess(AssessArgs),
    /// Evaluate every site in a scenario file
    Run {
        /// Path to the scenario YAML file
        #[arg(long, default_value = "scenarios/coastal_hubs.yaml")]
        scenario: PathBuf,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Args)]
struct AssessArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Sewage dropping, 0..1
    #[arg(long)]
    sewage: Option<f64>,

    /// Industrial density, 0..1
    #[arg(long)]
    industry: Option<f64>,

    #[arg(long)]
    years: Option<u32>,

    #[arg(long)]
    radius_km: Option<f64>,

    /// None, Partial or Full
    #[arg(long)]
    treatment: Option<TreatmentLevel>,

    /// Chemical, Textile or Heavy
    #[arg(long)]
    industry_type: Option<IndustryType>,

    /// Known facility count near the point
    #[arg(long)]
    facilities: Option<u32>,

    /// A wastewater plant serves the point
    #[arg(long)]
    wastewater_plant: bool,

    /// Seed for the regional comparison set
    #[arg(long)]
    scatter_seed: Option<u64>,

    /// Print the full assessment as JSON
    #[arg(long)]
    json: bool,
}

impl AssessArgs {
    fn params(&self, defaults: &SimulationParams) -> SimulationParams {
        SimulationParams {
            sewage_dropping: self.sewage.unwrap_or(defaults.sewage_dropping),
            industrial_density: self.industry.unwrap_or(defaults.industrial_density),
            years_active: self.years.unwrap_or(defaults.years_active),
            radius_km: self.radius_km.unwrap_or(defaults.radius_km),
            sewage_treatment: self.treatment.unwrap_or(defaults.sewage_treatment),
            industry_type: self.industry_type.unwrap_or(defaults.industry_type),
        }
    }

    fn facility_report(&self) -> Option<FacilityReport> {
        if self.facilities.is_none() && !self.wastewater_plant {
            return None;
        }
        Some(FacilityReport {
            count: self.facilities.unwrap_or(0),
            has_wastewater_plant: self.wastewater_plant,
            source: ReportSource::OpenStreetMap,
            timestamp: None,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    logging::init(&config.logging)?;

    match cli.command {
        Command::Assess(args) => assess(&args, &config),
        Command::Run { scenario, output } => run_scenario(&scenario, output),
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig { config }))
        }
    }
}

fn assess(args: &AssessArgs, config: &Config) -> Result<()> {
    let coordinate = Coordinate::new(args.lat, args.lon)?;
    let params = args.params(&config.defaults);
    let assessment = match args.facility_report() {
        Some(report) => Assessment::evaluate_enriched(coordinate, &params, &report)?,
        None => Assessment::evaluate(coordinate, &params)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    let geo = &assessment.geo;
    println!("Location {}: {} ({})", coordinate, geo.classification, geo.biome);
    println!("Population: {}", format_population(geo.population));
    for line in &geo.explanation {
        println!("  - {line}");
    }
    println!("WPI: {:.2} [{}]", assessment.wpi.value, assessment.wpi.status);
    if let Some(breakdown) = &assessment.breakdown {
        println!(
            "Sources: sewage {:.3}, industry {:.3}, population boost {:.3}",
            breakdown.sewage, breakdown.industry, breakdown.pop_boost
        );
    }
    let projection: Vec<String> = assessment
        .timeline
        .iter()
        .step_by(5)
        .map(|point| format!("y{}={:.2}", point.year, point.wpi))
        .collect();
    println!("Projection: {}", projection.join(" "));
    if let Some(seed) = args.scatter_seed {
        let regional = assessment.regional_scatter(&mut ChaCha8Rng::seed_from_u64(seed));
        let mean = regional.iter().map(|p| p.wpi).sum::<f64>() / regional.len().max(1) as f64;
        println!("Regional comparison: {} sites, mean WPI {:.2}", regional.len(), mean);
    }
    println!("Mitigation plan:");
    for item in &assessment.mitigation {
        println!("  * {item}");
    }
    Ok(())
}

fn run_scenario(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(path)?;
    let report = scenario.run();
    match output {
        Some(output) => {
            report.write_json(&output)?;
            info!(path = %output.display(), "scenario report written");
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
