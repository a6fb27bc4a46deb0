//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::{EdgeMode, Luminosity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grid shape and initial soil state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of grid rows
    pub rows: i32,
    /// Number of grid columns
    pub cols: i32,
    /// Border behaviour for neighbour lookups
    pub edge_mode: EdgeMode,
    /// Chance that a patch starts contaminated (0.0 to 1.0)
    pub initial_pollution_chance: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rows: 30,
            cols: 30,
            edge_mode: EdgeMode::Bounded,
            initial_pollution_chance: 0.3,
        }
    }
}

/// Whether heating reads the albedo a daisy was born with or the current parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlbedoMode {
    #[default]
    Snapshot,
    Live,
}

/// Daisy population parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaisyConfig {
    /// Share of patches seeded with black daisies (0 to 100)
    pub black_percentage: u32,
    /// Share of patches seeded with white daisies (0 to 100)
    pub white_percentage: u32,
    /// Albedo of black daisies
    pub black_albedo: f64,
    /// Albedo of white daisies
    pub white_albedo: f64,
    /// Age at which a daisy dies
    pub max_age: u32,
    pub albedo_mode: AlbedoMode,
}

impl Default for DaisyConfig {
    fn default() -> Self {
        Self {
            black_percentage: 20,
            white_percentage: 20,
            black_albedo: 0.25,
            white_albedo: 0.75,
            max_age: 25,
            albedo_mode: AlbedoMode::Snapshot,
        }
    }
}

/// Radiation and heat transport parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub luminosity: Luminosity,
    /// Albedo of bare ground
    pub surface_albedo: f64,
    /// Fraction of temperature a patch keeps and shares during diffusion
    pub diffuse_factor: f64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            luminosity: Luminosity::Low,
            surface_albedo: 0.4,
            diffuse_factor: 0.5,
        }
    }
}

/// Soil pollution dynamics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollutionConfig {
    /// Pollution events can only happen on steps divisible by this
    pub event_period: u64,
    /// Per-patch chance of a pollution event on an event step
    pub event_chance: f64,
    /// Lower bound of a contamination draw
    pub min_level: f64,
    /// Upper bound of a contamination draw
    pub max_level: f64,
    /// Per-step cleaning of an occupied patch
    pub occupied_cleaning: f64,
    /// Per-step cleaning of a bare patch
    pub bare_cleaning: f64,
    /// Pollution left behind by a dying daisy
    pub death_pollution: f64,
    /// Scale the seeding threshold by (1 - pollution)
    pub suppresses_seeding: bool,
}

impl Default for PollutionConfig {
    fn default() -> Self {
        Self {
            event_period: 30,
            event_chance: 0.3,
            min_level: 0.4,
            max_level: 1.0,
            occupied_cleaning: 0.005,
            bare_cleaning: 0.0008,
            death_pollution: 0.1,
            suppresses_seeding: true,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Worker threads for the parallel phases (0 = one per core)
    pub workers: usize,
    /// Run one heating pass during setup and report step 0
    pub warm_start: bool,
    pub world: WorldConfig,
    pub daisies: DaisyConfig,
    pub climate: ClimateConfig,
    pub pollution: PollutionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            workers: 0,
            warm_start: true,
            world: WorldConfig::default(),
            daisies: DaisyConfig::default(),
            climate: ClimateConfig::default(),
            pollution: PollutionConfig::default(),
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configurations the engine cannot run
    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        if world.rows <= 0 || world.cols <= 0 {
            return Err(Error::Validation(format!(
                "grid must have at least one row and column, got {}x{}",
                world.rows, world.cols
            )));
        }
        if world.rows.checked_mul(world.cols).is_none() {
            return Err(Error::Validation(format!(
                "grid {}x{} is too large",
                world.rows, world.cols
            )));
        }
        check_unit("initial_pollution_chance", world.initial_pollution_chance)?;

        let daisies = &self.daisies;
        if daisies.black_percentage > 100 || daisies.white_percentage > 100 {
            return Err(Error::Validation(format!(
                "daisy percentages must be within [0, 100], got black={} white={}",
                daisies.black_percentage, daisies.white_percentage
            )));
        }
        if daisies.black_percentage + daisies.white_percentage > 100 {
            return Err(Error::Validation(format!(
                "daisy percentages sum to {}, more than the grid can hold",
                daisies.black_percentage + daisies.white_percentage
            )));
        }
        check_unit("black_albedo", daisies.black_albedo)?;
        check_unit("white_albedo", daisies.white_albedo)?;
        if daisies.max_age == 0 {
            return Err(Error::Validation("max_age must be positive".to_string()));
        }

        check_unit("surface_albedo", self.climate.surface_albedo)?;
        check_unit("diffuse_factor", self.climate.diffuse_factor)?;

        let pollution = &self.pollution;
        if pollution.event_period == 0 {
            return Err(Error::Validation(
                "pollution event_period must be positive".to_string(),
            ));
        }
        check_unit("event_chance", pollution.event_chance)?;
        check_unit("min_level", pollution.min_level)?;
        check_unit("max_level", pollution.max_level)?;
        if pollution.min_level > pollution.max_level {
            return Err(Error::Validation(format!(
                "pollution range is empty: [{}, {}]",
                pollution.min_level, pollution.max_level
            )));
        }
        check_unit("occupied_cleaning", pollution.occupied_cleaning)?;
        check_unit("bare_cleaning", pollution.bare_cleaning)?;
        check_unit("death_pollution", pollution.death_pollution)?;

        Ok(())
    }

    pub fn patch_count(&self) -> usize {
        (self.world.rows * self.world.cols) as usize
    }
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// CSV output path
    pub csv_path: String,
    /// Delay between ticks (milliseconds)
    pub tick_interval_ms: u64,
    /// Stop after this many ticks; run until interrupted when unset
    pub max_steps: Option<u64>,
    /// Print the grid every N ticks (0 = never)
    pub render_every: u64,
    /// Log a step summary every N ticks
    pub log_every: u64,
    pub simulation: SimulationConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            csv_path: "simulation_output.csv".to_string(),
            tick_interval_ms: 100,
            max_steps: None,
            render_every: 0,
            log_every: 1,
            simulation: SimulationConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.simulation.validate()?;
        Ok(config)
    }
}
