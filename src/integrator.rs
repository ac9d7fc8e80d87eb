//! Adaptive Dormand–Prince 5(4) integrator for small, smooth, nonstiff ODE systems.
//!
//! Steps are chosen by local error control and clipped so that the integrator lands exactly on
//! every requested output time; no interpolation is involved in producing samples.
//!
//! # Example
//!
//! ```
//! use seir_sweep::integrator::{integrate, Tolerances};
//!
//! // Exponential decay: dy/dt = -0.5 * y
//! let times = [0.0, 1.0, 2.0];
//! let solution = integrate(|y: &[f64; 1], _t| [-0.5 * y[0]], [1.0], &times, &Tolerances::default())
//!     .unwrap();
//! assert!((solution.samples[2][0] - (-1.0_f64).exp()).abs() < 1e-6);
//! ```

use log::trace;

use crate::error::SeirError;

// Butcher tableau nodes.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth order weights; also the last row of the tableau (first same as last).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the fifth and embedded fourth order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339_200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// Error control settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub relative: f64,
    pub absolute: f64,
    /// Maximum number of attempted steps between two consecutive output times.
    pub max_steps: usize,
    /// Smallest step size the integrator will attempt before giving up.
    pub min_step: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            relative: 1e-8,
            absolute: 1e-12,
            max_steps: 500,
            min_step: 1e-12,
        }
    }
}

/// Counters describing the work done by one call to [`integrate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
}

/// States sampled at the requested times, plus work counters.
#[derive(Debug, Clone)]
pub struct Solution<const N: usize> {
    /// `samples[k]` is the state at `times[k]`.
    pub samples: Vec<[f64; N]>,
    pub stats: IntegrationStats,
}

/// `y + h * sum(coef * k)`
fn stage<const N: usize>(y: &[f64; N], h: f64, terms: &[(f64, &[f64; N])]) -> [f64; N] {
    let mut out = *y;
    for (coef, k) in terms {
        let scale = h * coef;
        for (o, ki) in out.iter_mut().zip(k.iter()) {
            *o = scale.mul_add(*ki, *o);
        }
    }
    out
}

/// Root-mean-square of `v / (atol + rtol * max(|a|, |b|))`.
fn scaled_rms<const N: usize>(
    v: &[f64; N],
    a: &[f64; N],
    b: &[f64; N],
    tolerances: &Tolerances,
) -> f64 {
    if N == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = N as f64;
    let sum: f64 = (0..N)
        .map(|i| {
            let scale = tolerances.absolute + tolerances.relative * a[i].abs().max(b[i].abs());
            (v[i] / scale).powi(2)
        })
        .sum();
    (sum / n).sqrt()
}

fn initial_step<const N: usize>(
    y0: &[f64; N],
    f0: &[f64; N],
    span: f64,
    tolerances: &Tolerances,
) -> f64 {
    let d0 = scaled_rms(y0, y0, y0, tolerances);
    let d1 = scaled_rms(f0, y0, y0, tolerances);
    let h = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    h.min(span)
}

fn validate_times(times: &[f64]) -> Result<(), SeirError> {
    if times.is_empty() {
        return Err(SeirError::InvalidConfig(
            "at least one output time is required".to_string(),
        ));
    }
    if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
        return Err(SeirError::InvalidConfig(format!(
            "output time {bad} is not finite"
        )));
    }
    if let Some(pair) = times.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(SeirError::InvalidConfig(format!(
            "output times must be strictly increasing, found {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Integrates `dy/dt = rhs(y, t)` from `y0` at `times[0]`, returning the state at every entry of
/// `times`. The first sample is `y0` itself.
///
/// # Errors
///
/// - `SeirError::InvalidConfig` if `times` is empty, not finite, or not strictly increasing.
/// - `SeirError::IntegrationFailure` if the step size underflows `min_step`, more than
///   `max_steps` attempts are needed between two output times, or the state becomes non-finite.
pub fn integrate<const N: usize, F>(
    rhs: F,
    y0: [f64; N],
    times: &[f64],
    tolerances: &Tolerances,
) -> Result<Solution<N>, SeirError>
where
    F: Fn(&[f64; N], f64) -> [f64; N],
{
    validate_times(times)?;

    let mut stats = IntegrationStats::default();
    let mut samples = Vec::with_capacity(times.len());
    samples.push(y0);

    let mut t = times[0];
    let mut y = y0;
    let mut k1 = rhs(&y, t);
    stats.rhs_evaluations += 1;

    let span = times[times.len() - 1] - t;
    let mut h = initial_step(&y, &k1, span, tolerances);

    for &target in &times[1..] {
        let mut attempts = 0;
        while t < target {
            if attempts >= tolerances.max_steps {
                return Err(SeirError::IntegrationFailure {
                    time: t,
                    message: format!(
                        "exceeded {} steps before reaching t={target}",
                        tolerances.max_steps
                    ),
                });
            }
            attempts += 1;

            let free_step = h;
            let lands_on_target = t + h >= target;
            if lands_on_target {
                h = target - t;
            }

            let k2 = rhs(&stage(&y, h, &[(A21, &k1)]), t + C2 * h);
            let k3 = rhs(&stage(&y, h, &[(A31, &k1), (A32, &k2)]), t + C3 * h);
            let k4 = rhs(
                &stage(&y, h, &[(A41, &k1), (A42, &k2), (A43, &k3)]),
                t + C4 * h,
            );
            let k5 = rhs(
                &stage(&y, h, &[(A51, &k1), (A52, &k2), (A53, &k3), (A54, &k4)]),
                t + C5 * h,
            );
            let k6 = rhs(
                &stage(
                    &y,
                    h,
                    &[(A61, &k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)],
                ),
                t + h,
            );
            let y_new = stage(
                &y,
                h,
                &[(B1, &k1), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)],
            );
            let k7 = rhs(&y_new, t + h);
            stats.rhs_evaluations += 6;

            let local_error = stage(
                &[0.0; N],
                h,
                &[
                    (E1, &k1),
                    (E3, &k3),
                    (E4, &k4),
                    (E5, &k5),
                    (E6, &k6),
                    (E7, &k7),
                ],
            );
            let error = scaled_rms(&local_error, &y, &y_new, tolerances);

            if error.is_finite() && error <= 1.0 && y_new.iter().all(|v| v.is_finite()) {
                t = if lands_on_target { target } else { t + h };
                y = y_new;
                k1 = k7;
                stats.accepted_steps += 1;

                let factor = if error == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * error.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                h *= factor;
                // A step shortened to hit an output time says nothing about the step the
                // dynamics allow.
                if lands_on_target {
                    h = h.max(free_step);
                }
            } else {
                stats.rejected_steps += 1;
                let factor = if error.is_finite() {
                    (SAFETY * error.powf(-0.2)).clamp(MIN_FACTOR, 1.0)
                } else {
                    MIN_FACTOR
                };
                h *= factor;
                trace!("rejected step at t={t}, error={error}, retrying with h={h}");
            }

            if h < tolerances.min_step {
                return Err(SeirError::IntegrationFailure {
                    time: t,
                    message: format!(
                        "step size {h} fell below the minimum {}",
                        tolerances.min_step
                    ),
                });
            }
        }
        samples.push(y);
    }

    Ok(Solution { samples, stats })
}
