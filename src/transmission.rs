//! Reproduction-number schedules.
//!
//! The derivative function only ever asks a schedule for its value at a time `t`; whether the
//! schedule is a constant, a closure, or a piecewise intervention is invisible to it.

pub trait ReproductionNumber: Send + Sync {
    /// Returns the reproduction number in effect at time `t`.
    ///
    /// The integrator evaluates schedules between grid points, so implementations must accept any
    /// `t` in the simulated horizon.
    fn evaluate(&self, t: f64) -> f64;

    /// Returns the effective transmission coefficient `beta(t) = R0(t) * gamma`.
    fn beta(&self, t: f64, recovery_rate: f64) -> f64 {
        self.evaluate(t) * recovery_rate
    }
}

/// A reproduction number that does not change over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantR0(pub f64);

impl ReproductionNumber for ConstantR0 {
    fn evaluate(&self, _t: f64) -> f64 {
        self.0
    }
}

/// A reproduction number given by an arbitrary function of time.
pub struct TimeVaryingR0<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    schedule: F,
}

impl<F> TimeVaryingR0<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[must_use]
    pub fn new(schedule: F) -> Self {
        Self { schedule }
    }
}

impl<F> ReproductionNumber for TimeVaryingR0<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, t: f64) -> f64 {
        (self.schedule)(t)
    }
}

/// Piecewise-constant schedule: `before` until `change_time`, `after` from then on. Models a
/// single intervention (or relaxation) at a known date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepR0 {
    pub before: f64,
    pub after: f64,
    pub change_time: f64,
}

impl StepR0 {
    #[must_use]
    pub fn new(before: f64, after: f64, change_time: f64) -> Self {
        Self {
            before,
            after,
            change_time,
        }
    }
}

impl ReproductionNumber for StepR0 {
    fn evaluate(&self, t: f64) -> f64 {
        if t < self.change_time {
            self.before
        } else {
            self.after
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn constant_ignores_time() {
        let r0 = ConstantR0(1.6);
        assert_eq!(r0.evaluate(0.0), 1.6);
        assert_eq!(r0.evaluate(123.4), 1.6);
    }

    #[test]
    fn beta_scales_by_recovery_rate() {
        let r0 = ConstantR0(1.8);
        assert_eq!(r0.beta(7.0, 0.5), 0.9);
    }

    #[test]
    fn time_varying_follows_closure() {
        let r0 = TimeVaryingR0::new(|t| 1.0 + t / 100.0);
        assert_eq!(r0.evaluate(0.0), 1.0);
        assert_eq!(r0.evaluate(50.0), 1.5);
        assert_eq!(r0.beta(50.0, 2.0), 3.0);
    }

    #[test]
    fn step_switches_at_change_time() {
        let r0 = StepR0::new(3.0, 1.2, 60.0);
        assert_eq!(r0.evaluate(59.999), 3.0);
        assert_eq!(r0.evaluate(60.0), 1.2);
        assert_eq!(r0.evaluate(500.0), 1.2);
    }

    #[test]
    fn schedules_are_usable_as_trait_objects() {
        let schedules: Vec<Box<dyn ReproductionNumber>> = vec![
            Box::new(ConstantR0(2.0)),
            Box::new(TimeVaryingR0::new(|_| 2.0)),
            Box::new(StepR0::new(2.0, 2.0, 10.0)),
        ];
        for schedule in &schedules {
            assert_eq!(schedule.evaluate(42.0), 2.0);
        }
    }
}
