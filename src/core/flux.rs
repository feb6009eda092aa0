//! Mass flux computation for an axisymmetric inflow profile.
//!
//! The measured velocity profile is interpolated onto the radii of the slice
//! points, converted into a mass flux density and then rescaled so that the
//! total flux "seen" by the discrete grid matches the requested value.

use std::f64::consts::PI;

use serde::Serialize;

use crate::core::profile::VelocityProfile;
use crate::domain::model::OutOfRangePolicy;
use crate::utils::error::{BcError, Result};

/// Relative slack, in units of the profile span, before a radius counts as out of range.
const RANGE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxParameters {
    /// Fluid density, kg/m³.
    pub density: f64,
    /// Dynamic viscosity, Pa·s. Carried into the report only.
    pub viscosity: f64,
    /// Requested total mass flux, e.g. kg/s.
    pub total_flux: f64,
    pub out_of_range: OutOfRangePolicy,
}

impl Default for FluxParameters {
    fn default() -> Self {
        Self {
            density: 0.9333,
            viscosity: 21.90e-6,
            total_flux: 0.0,
            out_of_range: OutOfRangePolicy::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluxReport {
    pub uncorrected_total_flux: f64,
    pub requested_total_flux: f64,
    pub scale_factor: f64,
    pub point_count: usize,
    pub radius_min: f64,
    pub radius_max: f64,
    pub density: f64,
    pub viscosity: f64,
    pub clamped_points: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxField {
    /// Interpolated velocity per point, unscaled.
    pub velocities: Vec<f64>,
    /// Scaled mass flux per point, in input order.
    pub mass_flux: Vec<f64>,
    pub report: FluxReport,
}

/// `2π ∫ r·f(r) dr` by the trapezoidal rule, taken over the points in ascending
/// radius order. Points sharing a radius add zero-width panels.
pub fn radial_integral(radii: &[f64], flux_density: &[f64]) -> f64 {
    debug_assert_eq!(radii.len(), flux_density.len());

    let mut order: Vec<usize> = (0..radii.len()).collect();
    order.sort_by(|&a, &b| radii[a].total_cmp(&radii[b]));

    let integral: f64 = order
        .windows(2)
        .map(|w| {
            let (r0, r1) = (radii[w[0]], radii[w[1]]);
            let (y0, y1) = (r0 * flux_density[w[0]], r1 * flux_density[w[1]]);
            0.5 * (r1 - r0) * (y0 + y1)
        })
        .sum();

    2.0 * PI * integral
}

/// Interpolates `profile` at `radii` and scales the resulting mass flux so its
/// radial integral equals `params.total_flux`.
pub fn compute_mass_flux(
    radii: &[f64],
    profile: &VelocityProfile,
    params: &FluxParameters,
) -> Result<FluxField> {
    if radii.is_empty() {
        return Err(BcError::EmptySlice);
    }
    if let Some(r) = radii.iter().find(|r| !r.is_finite()) {
        return Err(BcError::ProcessingError {
            message: format!("non-finite slice radius {}", r),
        });
    }

    let interpolant = profile.interpolant()?;
    let (min, max) = (interpolant.min_x(), interpolant.max_x());
    let slack = RANGE_TOLERANCE * (max - min);

    let mut clamped_points = 0;
    let mut velocities = Vec::with_capacity(radii.len());
    for &r in radii {
        let velocity = match interpolant.evaluate(r) {
            Some(v) => v,
            None if r >= min - slack && r <= max + slack => interpolant.evaluate_clamped(r),
            None => match params.out_of_range {
                OutOfRangePolicy::Error => {
                    return Err(BcError::ProfileRangeError { radius: r, min, max });
                }
                OutOfRangePolicy::Clamp => {
                    clamped_points += 1;
                    interpolant.evaluate_clamped(r)
                }
            },
        };
        velocities.push(velocity);
    }

    if clamped_points > 0 {
        tracing::warn!(
            "⚠️ {} of {} points lie outside the profile range [{}, {}], velocities clamped",
            clamped_points,
            radii.len(),
            min,
            max
        );
    }

    let mut mass_flux: Vec<f64> = velocities.iter().map(|v| v * params.density).collect();
    let uncorrected = radial_integral(radii, &mass_flux);

    let scale_factor = if params.total_flux == 0.0 {
        0.0
    } else if uncorrected == 0.0 || !uncorrected.is_finite() {
        return Err(BcError::DegenerateFlux { uncorrected });
    } else {
        params.total_flux / uncorrected
    };
    if !scale_factor.is_finite() {
        return Err(BcError::DegenerateFlux { uncorrected });
    }

    tracing::info!("total flux from given profile: {} [e.g. kg/s]", uncorrected);
    tracing::info!("requested total flux: {} kg/s", params.total_flux);
    tracing::info!("scale factor: {}", scale_factor);

    for value in &mut mass_flux {
        *value *= scale_factor;
    }

    let (radius_min, radius_max) = radii
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| (lo.min(r), hi.max(r)));

    Ok(FluxField {
        velocities,
        mass_flux,
        report: FluxReport {
            uncorrected_total_flux: uncorrected,
            requested_total_flux: params.total_flux,
            scale_factor,
            point_count: radii.len(),
            radius_min,
            radius_max,
            density: params.density,
            viscosity: params.viscosity,
            clamped_points,
        },
    })
}
