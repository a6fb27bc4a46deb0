//! Simulation engine for one Daisyworld run.

use crate::daisy::Daisy;
use crate::grid::{Grid, PatchView};
use crate::ledger::PopulationLedger;
use crate::lifecycle::{life_cycle_phase, LifeCycleParams, LifeCycleStats};
use crate::thermal::{diffusion_phase, heating_phase, AlbedoParams};
use daisy_core::{DaisyColor, Error, Luminosity, Position, Result, RunId, SimulationConfig};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, event, info, trace, Level};

/// How often population gauges are emitted
const METRICS_INTERVAL: u64 = 100;

/// Everything an observer learns about one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub run_id: RunId,
    pub step: u64,
    pub global_temperature: f64,
    pub black_count: usize,
    pub white_count: usize,
    pub luminosity: f64,
    pub black_albedo: f64,
    pub white_albedo: f64,
    pub surface_albedo: f64,
}

pub struct Simulation {
    run_id: RunId,
    config: SimulationConfig,
    grid: Grid,
    ledger: PopulationLedger,
    pool: rayon::ThreadPool,
    luminosity: Luminosity,
    albedos: AlbedoParams,
    global_temperature: f64,
    step: u64,
    last_stats: LifeCycleStats,
}

impl Simulation {
    /// Build the grid, seed the initial population and optionally warm it up
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = Grid::from_config(&config, &mut rng);
        let mut sim = Self::assemble(config, grid)?;

        let black = sim.seed_count(sim.config.daisies.black_percentage);
        let white = sim.seed_count(sim.config.daisies.white_percentage);
        sim.seed_randomly(DaisyColor::Black, black, &mut rng);
        sim.seed_randomly(DaisyColor::White, white, &mut rng);

        if sim.config.warm_start {
            sim.heating_phase();
        }
        sim.global_temperature = sim.grid.mean_temperature();

        info!(
            run_id = %sim.run_id,
            rows = sim.grid.rows,
            cols = sim.grid.cols,
            black = sim.ledger.black(),
            white = sim.ledger.white(),
            luminosity = sim.luminosity.value(),
            workers = sim.pool.current_num_threads(),
            global_temperature = sim.global_temperature,
            "Simulation initialized"
        );

        Ok(sim)
    }

    /// Run from a prepared grid; the ledger is counted from its occupants
    pub fn from_grid(config: SimulationConfig, grid: Grid) -> Result<Self> {
        config.validate()?;
        if grid.rows != config.world.rows || grid.cols != config.world.cols {
            return Err(Error::Validation(format!(
                "grid is {}x{} but config expects {}x{}",
                grid.rows, grid.cols, config.world.rows, config.world.cols
            )));
        }
        let mut sim = Self::assemble(config, grid)?;
        sim.global_temperature = sim.grid.mean_temperature();
        Ok(sim)
    }

    fn assemble(config: SimulationConfig, grid: Grid) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("daisy-worker-{}", i))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        let ledger = PopulationLedger::new(
            grid.count(DaisyColor::Black),
            grid.count(DaisyColor::White),
        );
        let albedos = AlbedoParams {
            black: config.daisies.black_albedo,
            white: config.daisies.white_albedo,
            surface: config.climate.surface_albedo,
            mode: config.daisies.albedo_mode,
        };

        Ok(Self {
            run_id: RunId::new(),
            luminosity: config.climate.luminosity,
            config,
            grid,
            ledger,
            pool,
            albedos,
            global_temperature: 0.0,
            step: 0,
            last_stats: LifeCycleStats::default(),
        })
    }

    fn seed_count(&self, percentage: u32) -> usize {
        self.grid.len() * percentage as usize / 100
    }

    /// Place `count` daisies of one colour on random empty patches with random ages
    fn seed_randomly(&mut self, color: DaisyColor, count: usize, rng: &mut ChaCha8Rng) {
        let albedo = self.albedos.for_color(color);
        let max_age = self.config.daisies.max_age;
        let mut placed = 0;

        while placed < count {
            let pos = Position::new(
                rng.gen_range(0..self.grid.rows),
                rng.gen_range(0..self.grid.cols),
            );
            let age = rng.gen_range(0..max_age);
            if self.grid.place(Daisy::new(color, albedo, pos, age)) {
                self.ledger.record_birth(color);
                placed += 1;
            }
        }

        debug!(color = %color, count, "Seeded initial daisies");
    }

    /// Execute one step: heating, diffusion, life cycle, then global temperature
    pub fn step(&mut self) -> StepReport {
        self.heating_phase();
        self.diffusion_phase();
        self.life_cycle_phase();

        self.global_temperature = self.grid.mean_temperature();
        self.step += 1;

        trace!(
            step = self.step,
            global_temperature = self.global_temperature,
            black = self.ledger.black(),
            white = self.ledger.white(),
            births = self.last_stats.births,
            deaths = self.last_stats.deaths,
            contested = self.last_stats.contested,
            "Step complete"
        );

        if self.step % METRICS_INTERVAL == 0 {
            self.emit_population_metrics();
        }

        self.report()
    }

    pub fn heating_phase(&mut self) {
        let Self {
            pool,
            grid,
            albedos,
            luminosity,
            ..
        } = self;
        pool.install(|| heating_phase(grid, albedos, luminosity.value()));
    }

    pub fn diffusion_phase(&mut self) {
        let factor = self.config.climate.diffuse_factor;
        let Self { pool, grid, .. } = self;
        pool.install(|| diffusion_phase(grid, factor));
    }

    pub fn life_cycle_phase(&mut self) -> LifeCycleStats {
        let Self {
            pool,
            grid,
            ledger,
            config,
            albedos,
            step,
            ..
        } = self;
        let params = LifeCycleParams {
            pollution: &config.pollution,
            albedos: *albedos,
            max_age: config.daisies.max_age,
            seed: config.seed,
            step: *step,
        };
        let stats = pool.install(|| life_cycle_phase(grid, ledger, &params));

        if stats.pollution_events > 0 {
            debug!(
                step = *step,
                patches = stats.pollution_events,
                "Pollution event"
            );
        }
        self.last_stats = stats;
        stats
    }

    fn emit_population_metrics(&self) {
        let mean_pollution = self
            .grid
            .patches()
            .iter()
            .map(|patch| patch.soil_pollution())
            .sum::<f64>()
            / self.grid.len() as f64;

        info!(
            event = "population_metrics",
            step = self.step,
            black = self.ledger.black(),
            white = self.ledger.white(),
            global_temperature = self.global_temperature,
            mean_pollution = mean_pollution,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_black",
            gauge_value = self.ledger.black(),
            step = self.step,
            "Black population gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "population_white",
            gauge_value = self.ledger.white(),
            step = self.step,
            "White population gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "global_temperature",
            gauge_value = self.global_temperature,
            step = self.step,
            "Global temperature gauge"
        );
    }

    /// Current state as a report
    pub fn report(&self) -> StepReport {
        StepReport {
            run_id: self.run_id,
            step: self.step,
            global_temperature: self.global_temperature,
            black_count: self.ledger.black(),
            white_count: self.ledger.white(),
            luminosity: self.luminosity.value(),
            black_albedo: self.albedos.black,
            white_albedo: self.albedos.white,
            surface_albedo: self.albedos.surface,
        }
    }

    pub fn set_luminosity(&mut self, luminosity: Luminosity) {
        info!(from = ?self.luminosity, to = ?luminosity, "Luminosity changed");
        self.luminosity = luminosity;
    }

    /// Change the colour albedos; existing daisies keep theirs unless the mode is live
    pub fn set_albedos(&mut self, black: f64, white: f64) -> Result<()> {
        for (name, value) in [("black_albedo", black), ("white_albedo", white)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        self.albedos.black = black;
        self.albedos.white = white;
        info!(black, white, "Albedo parameters changed");
        Ok(())
    }

    pub fn patch_view(&self, pos: Position) -> Option<PatchView> {
        self.grid.get(pos).map(|patch| patch.view())
    }

    /// Row-major views of every patch
    pub fn views(&self) -> Vec<PatchView> {
        self.grid.patches().iter().map(|patch| patch.view()).collect()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn ledger(&self) -> &PopulationLedger {
        &self.ledger
    }

    pub fn step_index(&self) -> u64 {
        self.step
    }

    pub fn luminosity(&self) -> Luminosity {
        self.luminosity
    }

    pub fn albedos(&self) -> AlbedoParams {
        self.albedos
    }

    pub fn global_temperature(&self) -> f64 {
        self.global_temperature
    }

    pub fn last_stats(&self) -> LifeCycleStats {
        self.last_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daisy_core::EdgeMode;

    fn small_config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig {
            seed,
            workers: 2,
            ..Default::default()
        };
        config.world.rows = 10;
        config.world.cols = 12;
        config
    }

    fn assert_ledger_matches(sim: &Simulation) {
        assert_eq!(sim.ledger().black(), sim.grid().count(DaisyColor::Black));
        assert_eq!(sim.ledger().white(), sim.grid().count(DaisyColor::White));
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::new(small_config(42)).unwrap();
        // 20% of 120 patches each.
        assert_eq!(sim.ledger().black(), 24);
        assert_eq!(sim.ledger().white(), 24);
        assert_ledger_matches(&sim);
        assert_eq!(sim.step_index(), 0);
        assert!(sim.global_temperature() != 0.0);
    }

    #[test]
    fn test_initial_ages_below_max() {
        let sim = Simulation::new(small_config(3)).unwrap();
        assert!(sim
            .grid()
            .patches()
            .iter()
            .filter_map(|p| p.occupant)
            .all(|d| d.age < 25));
    }

    #[test]
    fn test_cold_start_keeps_zero_temperature() {
        let mut config = small_config(1);
        config.warm_start = false;
        let sim = Simulation::new(config).unwrap();
        assert_eq!(sim.global_temperature(), 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(1);
        config.daisies.black_percentage = 80;
        config.daisies.white_percentage = 30;
        assert!(matches!(Simulation::new(config), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unusable_pollution_settings_rejected_before_stepping() {
        let mut config = small_config(0);
        config.world.rows = 2;
        config.world.cols = 2;
        config.pollution.event_period = 0;
        let grid = Grid::new(2, 2, EdgeMode::Bounded);
        assert!(matches!(
            Simulation::from_grid(config.clone(), grid.clone()),
            Err(Error::Validation(_))
        ));

        config.pollution.event_period = 30;
        config.pollution.min_level = 0.9;
        config.pollution.max_level = 0.2;
        assert!(matches!(
            Simulation::from_grid(config, grid),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_from_grid_counts_occupants() {
        let mut config = small_config(0);
        config.world.rows = 2;
        config.world.cols = 2;
        let mut grid = Grid::new(2, 2, EdgeMode::Bounded);
        grid.place(Daisy::new(DaisyColor::White, 0.75, Position::new(0, 1), 3));

        let sim = Simulation::from_grid(config.clone(), grid).unwrap();
        assert_eq!(sim.ledger().white(), 1);
        assert_eq!(sim.ledger().black(), 0);

        let wrong = Grid::new(3, 2, EdgeMode::Bounded);
        assert!(Simulation::from_grid(config, wrong).is_err());
    }

    #[test]
    fn test_step_advances_and_reports() {
        let mut sim = Simulation::new(small_config(7)).unwrap();
        let report = sim.step();
        assert_eq!(report.step, 1);
        assert_eq!(report.black_count, sim.ledger().black());
        assert_eq!(report.luminosity, 0.6);
        assert_eq!(report.surface_albedo, 0.4);
        assert!((report.global_temperature - sim.grid().mean_temperature()).abs() < 1e-12);
        assert_ledger_matches(&sim);
    }

    #[test]
    fn test_albedo_change_only_affects_new_daisies() {
        let mut sim = Simulation::new(small_config(11)).unwrap();
        sim.set_albedos(0.05, 0.95).unwrap();
        assert_eq!(sim.report().black_albedo, 0.05);

        let existing: Vec<_> = sim.grid().patches().iter().filter_map(|p| p.occupant).collect();
        assert!(existing.iter().all(|d| d.albedo == 0.25 || d.albedo == 0.75));

        assert!(sim.set_albedos(1.5, 0.5).is_err());
        assert_eq!(sim.albedos().black, 0.05);
    }

    #[test]
    fn test_set_luminosity() {
        let mut sim = Simulation::new(small_config(5)).unwrap();
        sim.set_luminosity(Luminosity::High);
        assert_eq!(sim.step().luminosity, 1.4);
    }

    #[test]
    fn test_display_views() {
        let sim = Simulation::new(small_config(13)).unwrap();
        let views = sim.views();
        assert_eq!(views.len(), 120);
        let occupied = views.iter().filter(|v| v.occupant.is_some()).count();
        assert_eq!(occupied, 48);
        assert!(sim.patch_view(Position::new(9, 11)).is_some());
        assert!(sim.patch_view(Position::new(10, 0)).is_none());
    }

    #[test]
    fn test_runs_many_steps_with_consistent_ledger() {
        let mut sim = Simulation::new(small_config(21)).unwrap();
        for _ in 0..60 {
            sim.step();
            assert_ledger_matches(&sim);
        }
        assert_eq!(sim.step_index(), 60);
    }
}
