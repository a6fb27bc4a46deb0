//! Headless Daisyworld runner.
//!
//! Usage: `daisy-runner [config.json]` (or `DAISY_CONFIG=config.json`).
//! Runs until Ctrl+C, or for `max_steps` ticks when configured.

mod telemetry;

use anyhow::{Context, Result};
use daisy_core::RunnerConfig;
use daisy_world::{
    CsvLogger, Scheduler, SimulationHandle, StepObserver, StepReport, TracingObserver,
};
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Prints the grid as text every few steps
struct GridPrinter {
    handle: SimulationHandle,
    every: u64,
}

impl StepObserver for GridPrinter {
    fn on_step(&mut self, report: &StepReport) -> daisy_core::Result<()> {
        if report.step % self.every == 0 {
            let map = self.handle.read().grid().render_ascii();
            println!("step {}\n{}", report.step, map);
        }
        Ok(())
    }
}

fn load_config() -> Result<RunnerConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DAISY_CONFIG").ok());

    match path {
        Some(path) => RunnerConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path)),
        None => Ok(RunnerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("DAISY_LOG_FORMAT").map_or(false, |v| v == "json");
    telemetry::init_telemetry(json_logs)?;

    let config = load_config()?;
    info!(
        rows = config.simulation.world.rows,
        cols = config.simulation.world.cols,
        luminosity = ?config.simulation.climate.luminosity,
        csv = %config.csv_path,
        "Starting Daisyworld runner"
    );

    let mut scheduler =
        Scheduler::new().with_tick_interval(Duration::from_millis(config.tick_interval_ms));

    match CsvLogger::create(&config.csv_path) {
        Ok(logger) => scheduler.add_observer(Box::new(logger)),
        Err(e) => warn!("CSV output disabled, cannot open {}: {}", config.csv_path, e),
    }
    scheduler.add_observer(Box::new(TracingObserver::new(config.log_every)));

    let handle = scheduler.initialize(config.simulation.clone())?;
    if config.render_every > 0 {
        scheduler.add_observer(Box::new(GridPrinter {
            handle: handle.clone(),
            every: config.render_every,
        }));
    }

    scheduler.start()?;
    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        stop.stop();
    });

    let max_steps = config.max_steps;
    let ticks = tokio::task::spawn_blocking(move || -> daisy_core::Result<u64> {
        match max_steps {
            Some(steps) => scheduler.run_for(steps),
            None => scheduler.run(),
        }
    })
    .await?;

    let ticks = match ticks {
        Ok(ticks) => ticks,
        Err(e) => {
            error!("Simulation failed: {}", e);
            return Err(e.into());
        }
    };

    let sim = handle.read();
    let ledger = sim.ledger();
    info!(
        ticks,
        final_step = sim.step_index(),
        global_temperature = sim.global_temperature(),
        black = ledger.black(),
        white = ledger.white(),
        population = ledger.total(),
        "Simulation stopped"
    );
    if config.render_every > 0 {
        println!("{}", sim.grid().render_ascii());
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
