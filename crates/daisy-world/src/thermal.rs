//! Radiative heating and heat diffusion.

use crate::grid::{index_to_pos, Grid, Patch};
use daisy_core::{AlbedoMode, DaisyColor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Heating applied when a patch absorbs no light at all
pub const FLOOR_HEATING: f64 = 80.0;

/// Current albedo parameters used by heating and new daisies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlbedoParams {
    pub black: f64,
    pub white: f64,
    pub surface: f64,
    pub mode: AlbedoMode,
}

impl AlbedoParams {
    pub fn for_color(&self, color: DaisyColor) -> f64 {
        match color {
            DaisyColor::Black => self.black,
            DaisyColor::White => self.white,
        }
    }

    /// Albedo of a patch: its daisy's (snapshot or live) or bare ground
    pub fn of_patch(&self, patch: &Patch) -> f64 {
        match (&patch.occupant, self.mode) {
            (Some(daisy), AlbedoMode::Snapshot) => daisy.albedo,
            (Some(daisy), AlbedoMode::Live) => self.for_color(daisy.color),
            (None, _) => self.surface,
        }
    }
}

/// Instantaneous heating from absorbed luminosity
pub fn local_heating(absorbed: f64) -> f64 {
    if absorbed > 0.0 {
        72.0 * absorbed.ln() + 80.0
    } else {
        FLOOR_HEATING
    }
}

/// Move a patch's temperature halfway toward its local heating
pub fn heat_patch(patch: &mut Patch, albedo: f64, luminosity: f64) {
    let absorbed = (1.0 - albedo) * luminosity;
    patch.temperature = (patch.temperature + local_heating(absorbed)) / 2.0;
}

/// Heat every patch. Each patch reads only its own state.
pub fn heating_phase(grid: &mut Grid, albedos: &AlbedoParams, luminosity: f64) {
    grid.patches_mut().par_iter_mut().for_each(|patch| {
        let albedo = albedos.of_patch(patch);
        heat_patch(patch, albedo, luminosity);
    });
}

/// Diffuse heat to orthogonal neighbours.
///
/// Every patch keeps `T * factor` and sends `T * factor / 4` to each neighbour
/// that exists. Contributions are gathered from a snapshot taken before the
/// phase into a separate buffer, which replaces the temperatures once complete.
pub fn diffusion_phase(grid: &mut Grid, diffuse_factor: f64) {
    let before = grid.temperatures();
    let cols = grid.cols;

    let after: Vec<f64> = {
        let grid = &*grid;
        (0..before.len())
            .into_par_iter()
            .map(|index| {
                let pos = index_to_pos(cols, index);
                let mut temperature = before[index] * diffuse_factor;
                // Adjacency is symmetric: gathering equals scattering.
                for neighbor in grid.neighbors(pos) {
                    if let Some(source) = grid.index_of(neighbor) {
                        temperature += before[source] * diffuse_factor / 4.0;
                    }
                }
                temperature
            })
            .collect()
    };

    grid.patches_mut()
        .par_iter_mut()
        .zip(after.par_iter())
        .for_each(|(patch, &temperature)| patch.temperature = temperature);
}

/// Heat that diffusion sends past the border of a bounded grid
pub fn boundary_loss(grid: &Grid, diffuse_factor: f64) -> f64 {
    grid.iter()
        .map(|(pos, patch)| {
            let missing = 4 - grid.neighbors(pos).count();
            patch.temperature * diffuse_factor / 4.0 * missing as f64
        })
        .sum()
}
