//! Run control: the Ready/Running/Stopped state machine around a simulation.

use crate::observer::StepObserver;
use crate::simulation::{Simulation, StepReport};
use daisy_core::{Error, Result, SimulationConfig};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Uninitialized,
    Ready,
    Running,
    Stopped,
}

/// Shared, lockable access to a running simulation (display queries, controls)
#[derive(Clone)]
pub struct SimulationHandle(Arc<RwLock<Simulation>>);

impl SimulationHandle {
    pub fn new(simulation: Simulation) -> Self {
        Self(Arc::new(RwLock::new(simulation)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Simulation> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Simulation> {
        self.0.write()
    }
}

/// Cooperative stop signal, checked between ticks
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    state: SchedulerState,
    simulation: Option<SimulationHandle>,
    observers: Vec<Box<dyn StepObserver>>,
    stop: StopHandle,
    tick_interval: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Uninitialized,
            simulation: None,
            observers: Vec::new(),
            stop: StopHandle::default(),
            tick_interval: Duration::ZERO,
        }
    }

    /// Pause between ticks while running
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn StepObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn handle(&self) -> Option<SimulationHandle> {
        self.simulation.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Build a fresh run from `config`; allowed whenever not running
    pub fn initialize(&mut self, config: SimulationConfig) -> Result<SimulationHandle> {
        if self.state == SchedulerState::Running {
            return Err(Error::InvalidState(
                "cannot initialize while running".to_string(),
            ));
        }

        let simulation = Simulation::new(config)?;
        let report = simulation.report();
        let handle = SimulationHandle::new(simulation);
        self.simulation = Some(handle.clone());
        self.stop.clear();
        self.state = SchedulerState::Ready;

        for observer in &mut self.observers {
            if let Err(e) = observer.on_setup(&report) {
                warn!(step = report.step, "Observer failed during setup: {}", e);
            }
        }

        Ok(handle)
    }

    /// Ready or Stopped -> Running.
    ///
    /// A stop requested while Ready is kept, so the next run ends before its
    /// first tick. Resuming from Stopped clears the earlier request.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SchedulerState::Ready | SchedulerState::Stopped => {
                if self.state == SchedulerState::Stopped {
                    self.stop.clear();
                }
                self.state = SchedulerState::Running;
                info!("Simulation started");
                Ok(())
            }
            other => Err(Error::InvalidState(format!(
                "cannot start from {:?}",
                other
            ))),
        }
    }

    /// Request a stop and, if running, move to Stopped
    pub fn stop(&mut self) {
        self.stop.stop();
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Stopped;
            info!("Simulation stopped");
        }
    }

    /// Run one full step and deliver its report; only valid while running
    pub fn tick(&mut self) -> Result<StepReport> {
        if self.state != SchedulerState::Running {
            return Err(Error::InvalidState(format!(
                "cannot tick from {:?}",
                self.state
            )));
        }
        let handle = self
            .simulation
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no simulation".to_string()))?;

        let report = handle.write().step();

        for observer in &mut self.observers {
            if let Err(e) = observer.on_step(&report) {
                warn!(step = report.step, "Observer failed: {}", e);
            }
        }

        Ok(report)
    }

    /// Tick until a stop is requested; returns the number of ticks executed
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<u64> {
        self.run_loop(None)
    }

    /// Tick at most `steps` times, stopping early if requested
    #[instrument(skip(self))]
    pub fn run_for(&mut self, steps: u64) -> Result<u64> {
        self.run_loop(Some(steps))
    }

    fn run_loop(&mut self, limit: Option<u64>) -> Result<u64> {
        if self.state != SchedulerState::Running {
            return Err(Error::InvalidState(format!(
                "cannot run from {:?}",
                self.state
            )));
        }

        let mut executed = 0;
        while !self.stop.is_stop_requested() && limit.map_or(true, |n| executed < n) {
            self.tick()?;
            executed += 1;
            if !self.tick_interval.is_zero() {
                std::thread::sleep(self.tick_interval);
            }
        }

        self.state = SchedulerState::Stopped;
        info!(ticks = executed, "Simulation loop finished");
        Ok(executed)
    }
}
