//! Aging, seeding, death and soil pollution drift.
//!
//! The phase runs as three parallel passes separated by barriers:
//! - decide: read-only over the grid, one [`PatchOutcome`] per patch
//! - claim: every seeding patch bids for its target with an atomic `fetch_min`,
//!   so the lowest source index wins and losers simply do not seed
//! - apply: each worker writes only its own patch and places a winning seed
//!
//! Seed targets are chosen against occupancy at the start of the phase, so a
//! patch emptied by a death this step is not reseeded until the next one.

use crate::daisy::{Daisy, Survival};
use crate::grid::{index_to_pos, Grid};
use crate::ledger::PopulationLedger;
use crate::thermal::AlbedoParams;
use daisy_core::{DaisyColor, PollutionConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const NO_CLAIM: usize = usize::MAX;

/// Parameters the phase needs for one step
#[derive(Debug, Clone, Copy)]
pub struct LifeCycleParams<'a> {
    pub pollution: &'a PollutionConfig,
    pub albedos: AlbedoParams,
    pub max_age: u32,
    pub seed: u64,
    pub step: u64,
}

/// What happens to a patch's occupant this step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fate {
    Bare,
    Lives(Daisy),
    Dies(DaisyColor),
}

/// Per-patch decision computed from the pre-phase grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchOutcome {
    pub soil_pollution: f64,
    pub fate: Fate,
    pub seed_target: Option<usize>,
}

impl PatchOutcome {
    fn seed_color(&self) -> Option<DaisyColor> {
        match self.fate {
            Fate::Lives(daisy) => Some(daisy.color),
            _ => None,
        }
    }
}

/// Counts gathered while running the phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifeCycleStats {
    pub births: usize,
    pub deaths: usize,
    /// Seed attempts that lost their target to another daisy
    pub contested: usize,
    pub pollution_events: usize,
}

/// Independent random stream for one patch in one step
pub fn patch_rng(seed: u64, step: u64, index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ step.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    rng.set_stream(index as u64);
    rng
}

/// Whether the pollution event fired, and the patch's pollution afterwards
fn pollution_event<R: Rng>(
    current: f64,
    config: &PollutionConfig,
    step: u64,
    rng: &mut R,
) -> (bool, f64) {
    if step % config.event_period != 0 || rng.gen::<f64>() >= config.event_chance {
        return (false, current);
    }
    let level = rng.gen_range(config.min_level..=config.max_level);
    (true, if level > current { level } else { current })
}

/// Decide one patch's outcome without touching the grid.
///
/// `params.pollution` must already be validated: a zero event period or an
/// empty pollution range panics.
pub(crate) fn decide(
    grid: &Grid,
    index: usize,
    params: &LifeCycleParams<'_>,
) -> (PatchOutcome, bool) {
    let config = params.pollution;
    let patch = &grid.patches()[index];
    let mut rng = patch_rng(params.seed, params.step, index);

    let (event, polluted) = pollution_event(patch.soil_pollution(), config, params.step, &mut rng);
    let mut soil_pollution = polluted.clamp(0.0, 1.0);

    let outcome = match patch.occupant {
        None => {
            soil_pollution = (soil_pollution - config.bare_cleaning).clamp(0.0, 1.0);
            PatchOutcome {
                soil_pollution,
                fate: Fate::Bare,
                seed_target: None,
            }
        }
        Some(mut daisy) => {
            // Position always follows the owning patch.
            daisy.position = index_to_pos(grid.cols, index);
            soil_pollution = (soil_pollution - config.occupied_cleaning).clamp(0.0, 1.0);
            match daisy.check_survivability_with(
                params.max_age,
                patch.temperature,
                soil_pollution,
                config.suppresses_seeding,
                &mut rng,
            ) {
                Survival::Lives { wants_seed } => {
                    let seed_target = if wants_seed {
                        grid.neighbors(daisy.position)
                            .filter_map(|pos| grid.index_of(pos))
                            .find(|&target| !grid.patches()[target].has_daisy())
                    } else {
                        None
                    };
                    PatchOutcome {
                        soil_pollution,
                        fate: Fate::Lives(daisy),
                        seed_target,
                    }
                }
                Survival::Dies => PatchOutcome {
                    soil_pollution: (soil_pollution + config.death_pollution).clamp(0.0, 1.0),
                    fate: Fate::Dies(daisy.color),
                    seed_target: None,
                },
            }
        }
    };

    (outcome, event)
}

/// Run the life-cycle phase over the whole grid; expects a validated pollution config
pub(crate) fn life_cycle_phase(
    grid: &mut Grid,
    ledger: &PopulationLedger,
    params: &LifeCycleParams<'_>,
) -> LifeCycleStats {
    let (outcomes, events): (Vec<PatchOutcome>, Vec<bool>) = {
        let grid = &*grid;
        (0..grid.len())
            .into_par_iter()
            .map(|index| decide(grid, index, params))
            .unzip()
    };

    let claims: Vec<AtomicUsize> = (0..outcomes.len())
        .map(|_| AtomicUsize::new(NO_CLAIM))
        .collect();
    outcomes.par_iter().enumerate().for_each(|(source, outcome)| {
        if let Some(target) = outcome.seed_target {
            claims[target].fetch_min(source, Ordering::AcqRel);
        }
    });

    let cols = grid.cols;
    let albedos = params.albedos;
    grid.patches_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(index, patch)| {
            let outcome = &outcomes[index];
            patch.set_soil_pollution(outcome.soil_pollution);
            match outcome.fate {
                Fate::Bare => {}
                Fate::Lives(daisy) => patch.occupant = Some(daisy),
                Fate::Dies(color) => {
                    patch.occupant = None;
                    ledger.record_death(color);
                }
            }

            let winner = claims[index].load(Ordering::Acquire);
            if winner == NO_CLAIM {
                return;
            }
            if let Some(color) = outcomes[winner].seed_color() {
                let position = index_to_pos(cols, index);
                patch.occupant = Some(Daisy::new(color, albedos.for_color(color), position, 0));
                ledger.record_birth(color);
            }
        });

    let attempts = outcomes.iter().filter(|o| o.seed_target.is_some()).count();
    let births = claims
        .iter()
        .filter(|claim| claim.load(Ordering::Acquire) != NO_CLAIM)
        .count();
    LifeCycleStats {
        births,
        deaths: outcomes
            .iter()
            .filter(|o| matches!(o.fate, Fate::Dies(_)))
            .count(),
        contested: attempts - births,
        pollution_events: events.iter().filter(|&&fired| fired).count(),
    }
}
