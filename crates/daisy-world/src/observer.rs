//! Step observers: the CSV record stream and structured log output.

use crate::simulation::StepReport;
use daisy_core::{Result, RunId};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CSV_HEADER: &str =
    "Step,GlobalTemperature,NumBlacks,NumWhites,Luminosity,AlbedoBlack,AlbedoWhite,AlbedoSurface";

/// Receives a report after setup and after every step
pub trait StepObserver: Send {
    /// Called once when a run is initialised, with the step-0 state
    fn on_setup(&mut self, report: &StepReport) -> Result<()> {
        self.on_step(report)
    }

    fn on_step(&mut self, report: &StepReport) -> Result<()>;
}

type Reopen<W> = Box<dyn FnMut() -> Result<W> + Send>;

/// CSV record stream, one row per report.
///
/// Each run setup starts a new stream with its own header. Loggers made with
/// [`CsvLogger::create`] truncate the file so it only holds the current run.
pub struct CsvLogger<W: Write + Send> {
    writer: W,
    reopen: Option<Reopen<W>>,
    current_run: Option<RunId>,
    header_written: bool,
}

impl CsvLogger<BufWriter<File>> {
    /// Create (or truncate) a CSV file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let open = move || -> Result<BufWriter<File>> {
            let file = File::create(&path)?;
            Ok(BufWriter::new(file))
        };
        let writer = open()?;
        Ok(Self {
            reopen: Some(Box::new(open)),
            ..Self::new(writer)
        })
    }
}

impl<W: Write + Send> CsvLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            reopen: None,
            current_run: None,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Begin the stream for a newly set up run
    fn restart(&mut self, run_id: RunId) -> Result<()> {
        if self.current_run.is_some() {
            if let Some(reopen) = self.reopen.as_mut() {
                self.writer.flush()?;
                self.writer = reopen()?;
            }
        }
        self.current_run = Some(run_id);
        self.header_written = false;
        Ok(())
    }

    fn write_row(&mut self, report: &StepReport) -> Result<()> {
        if self.current_run != Some(report.run_id) {
            self.restart(report.run_id)?;
        }
        if !self.header_written {
            writeln!(self.writer, "{}", CSV_HEADER)?;
            self.header_written = true;
        }
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{}",
            report.step,
            report.global_temperature,
            report.black_count,
            report.white_count,
            report.luminosity,
            report.black_albedo,
            report.white_albedo,
            report.surface_albedo
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> StepObserver for CsvLogger<W> {
    fn on_setup(&mut self, report: &StepReport) -> Result<()> {
        self.restart(report.run_id)?;
        self.write_row(report)
    }

    fn on_step(&mut self, report: &StepReport) -> Result<()> {
        self.write_row(report)
    }
}

/// Logs reports through `tracing`
pub struct TracingObserver {
    every: u64,
}

impl TracingObserver {
    /// Log every `every` steps (0 or 1 logs all of them)
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(1)
    }
}

impl StepObserver for TracingObserver {
    fn on_setup(&mut self, report: &StepReport) -> Result<()> {
        info!(
            run_id = %report.run_id,
            global_temperature = report.global_temperature,
            black = report.black_count,
            white = report.white_count,
            luminosity = report.luminosity,
            "Initial global temperature: {:.2}",
            report.global_temperature
        );
        Ok(())
    }

    fn on_step(&mut self, report: &StepReport) -> Result<()> {
        if report.step % self.every == 0 {
            info!(
                step = report.step,
                black = report.black_count,
                white = report.white_count,
                "Global temperature after step: {:.2}",
                report.global_temperature
            );
        }
        Ok(())
    }
}
