//! Daisyworld simulation engine.
//!
//! This module implements the patch grid, the thermal model, the daisy life cycle
//! and the scheduler that runs them as barrier-separated parallel phases.

pub mod grid;
pub mod daisy;
pub mod thermal;
pub mod ledger;
pub mod lifecycle;
pub mod simulation;
pub mod scheduler;
pub mod observer;

pub use grid::{Grid, Patch, PatchView};
pub use daisy::Daisy;
pub use ledger::PopulationLedger;
pub use simulation::{Simulation, StepReport};
pub use scheduler::{Scheduler, SchedulerState, SimulationHandle, StopHandle};
pub use observer::{CsvLogger, StepObserver, TracingObserver};
