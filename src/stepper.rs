//! Interrupt-driven time stepping.
//!
//! A tick is advanced in pieces. Before each piece an [`InterruptSource`] is asked for the earliest
//! event inside the time that is left; the subject is advanced up to that event, the event's
//! routine runs with the remaining time, and the loop goes again. The number of pieces is bounded
//! so a source that keeps firing at the same instant cannot stall the tick.

use std::fmt;

use tracing::{trace, warn};

use crate::body::Body;
use crate::error::{check_time_delta, Result};
use crate::DEFAULT_MAX_SUBSTEPS;

/// Something that moves forward in time without outside help
pub trait Advance {
    fn advance(&mut self, dt: f32) -> Result<()>;
}

impl Advance for Body {
    fn advance(&mut self, dt: f32) -> Result<()> {
        self.integrate(dt)
    }
}

/// Routine run when an interrupt fires; receives the subject and the time left in the tick
pub type InterruptRoutine<S> = Box<dyn FnOnce(&mut S, f32) -> Result<()>>;

/// An event `time` seconds from now that changes how the rest of the tick plays out
pub struct Interrupt<S: ?Sized> {
    time: f32,
    routine: InterruptRoutine<S>,
}

impl<S: ?Sized> Interrupt<S> {
    /// Fails with [`crate::Error::NegativeTimeDelta`] when `time` is negative or NaN
    pub fn new<F>(time: f32, routine: F) -> Result<Self>
    where
        F: FnOnce(&mut S, f32) -> Result<()> + 'static,
    {
        Ok(Interrupt {
            time: check_time_delta(time)?,
            routine: Box::new(routine),
        })
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Runs the routine with the time remaining after the interrupt
    pub fn fire(self, subject: &mut S, remaining: f32) -> Result<()> {
        (self.routine)(subject, remaining)
    }
}

impl<S: ?Sized> fmt::Debug for Interrupt<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt").field("time", &self.time).finish_non_exhaustive()
    }
}

/// Produces the earliest interrupt for `subject` within `within` seconds, if any
pub trait InterruptSource<S: ?Sized> {
    fn earliest(&mut self, subject: &S, within: f32) -> Result<Option<Interrupt<S>>>;
}

impl<S: ?Sized, F> InterruptSource<S> for F
where
    F: FnMut(&S, f32) -> Result<Option<Interrupt<S>>>,
{
    fn earliest(&mut self, subject: &S, within: f32) -> Result<Option<Interrupt<S>>> {
        self(subject, within)
    }
}

/// What happened during one [`InterruptStepper::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    /// Interrupts whose routines ran
    pub interrupts: usize,
    /// The sub-step bound was hit and the rest of the tick was advanced without checking for interrupts
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptStepper {
    max_substeps: usize,
}

impl Default for InterruptStepper {
    fn default() -> Self {
        InterruptStepper::new(DEFAULT_MAX_SUBSTEPS)
    }
}

impl InterruptStepper {
    pub fn new(max_substeps: usize) -> Self {
        InterruptStepper { max_substeps }
    }

    pub fn max_substeps(&self) -> usize {
        self.max_substeps
    }

    /// Advances `subject` by `dt`, letting `source` interrupt the step
    ///
    /// An interrupt at or past the remaining time is not fired. After `max_substeps` fired
    /// interrupts the remainder is advanced unconditionally and the report is marked truncated.
    pub fn step<S, G>(&self, subject: &mut S, source: &mut G, dt: f32) -> Result<StepReport>
    where
        S: Advance + ?Sized,
        G: InterruptSource<S> + ?Sized,
    {
        let mut remaining = check_time_delta(dt)?;
        let mut report = StepReport::default();

        for _ in 0..self.max_substeps {
            let interrupt = match source.earliest(subject, remaining)? {
                Some(interrupt) if interrupt.time < remaining => interrupt,
                _ => {
                    subject.advance(remaining)?;
                    return Ok(report);
                }
            };

            subject.advance(interrupt.time)?;
            remaining -= interrupt.time;
            report.interrupts += 1;
            trace!(at = interrupt.time, remaining, "interrupt fired");

            interrupt.fire(subject, remaining)?;
        }

        warn!(max_substeps = self.max_substeps, remaining, "interrupt sub-step bound reached, advancing the rest unchecked");
        report.truncated = true;
        subject.advance(remaining)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Particle {
        position: f32,
        velocity: f32,
        elapsed: f32,
    }

    impl Advance for Particle {
        fn advance(&mut self, dt: f32) -> Result<()> {
            let dt = check_time_delta(dt)?;
            self.position += self.velocity*dt;
            self.elapsed += dt;
            Ok(())
        }
    }

    fn never(_: &Particle, _: f32) -> Result<Option<Interrupt<Particle>>> {
        Ok(None)
    }

    #[test]
    fn silent_source_matches_one_full_step() {
        let mut stepped = Particle { position: 1.0, velocity: -2.5, elapsed: 0.0 };
        let mut direct = stepped;

        let report = InterruptStepper::default().step(&mut stepped, &mut never, 0.4).unwrap();
        direct.advance(0.4).unwrap();

        assert_eq!(report, StepReport::default());
        assert_abs_diff_eq!(stepped.position, direct.position, epsilon = 1e-6);
        assert_abs_diff_eq!(stepped.elapsed, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn wall_reflection_uses_remaining_time() {
        const WALL: f32 = 0.25;
        let mut particle = Particle { position: 0.0, velocity: 1.0, elapsed: 0.0 };

        let mut wall = |p: &Particle, _: f32| {
            if p.velocity > 0.0 && p.position < WALL {
                Interrupt::new((WALL - p.position)/p.velocity, |p: &mut Particle, remaining| {
                    assert_abs_diff_eq!(remaining, 0.75, epsilon = 1e-6);
                    p.velocity = -p.velocity;
                    Ok(())
                })
                .map(Some)
            } else {
                Ok(None)
            }
        };

        let report = InterruptStepper::new(4).step(&mut particle, &mut wall, 1.0).unwrap();

        assert_eq!(report.interrupts, 1);
        assert!(!report.truncated);
        assert_abs_diff_eq!(particle.position, -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(particle.elapsed, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn interrupt_at_the_end_of_the_tick_does_not_fire() {
        let mut particle = Particle { position: 0.0, velocity: 1.0, elapsed: 0.0 };
        let mut late = |_: &Particle, within: f32| {
            Interrupt::new(within, |p: &mut Particle, _| {
                p.velocity = 0.0;
                Ok(())
            })
            .map(Some)
        };

        let report = InterruptStepper::default().step(&mut particle, &mut late, 0.5).unwrap();

        assert_eq!(report.interrupts, 0);
        assert_abs_diff_eq!(particle.position, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn endless_interrupts_are_cut_off_at_the_bound() {
        let mut particle = Particle { position: 0.0, velocity: 2.0, elapsed: 0.0 };
        let mut stuck = |_: &Particle, _: f32| Interrupt::new(0.0, |_: &mut Particle, _| Ok(())).map(Some);

        let report = InterruptStepper::new(3).step(&mut particle, &mut stuck, 0.5).unwrap();

        assert_eq!(report, StepReport { interrupts: 3, truncated: true });
        assert_abs_diff_eq!(particle.position, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(particle.elapsed, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn body_advances_through_integration() {
        let mut body = Body::new(1.0, 1.0).unwrap()
            .with_velocity(crate::math::Vec2::new(3.0, 0.0))
            .with_angular_velocity(1.0);

        fn quiet(_: &Body, _: f32) -> Result<Option<Interrupt<Body>>> {
            Ok(None)
        }
        InterruptStepper::default().step(&mut body, &mut quiet, 0.5).unwrap();

        assert_abs_diff_eq!(body.position().x, 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(body.angle(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn negative_times_are_rejected() {
        let mut particle = Particle::default();
        assert_eq!(
            InterruptStepper::default().step(&mut particle, &mut never, -0.1),
            Err(Error::NegativeTimeDelta(-0.1)),
        );
        assert!(matches!(
            Interrupt::<Particle>::new(-1.0, |_, _| Ok(())),
            Err(Error::NegativeTimeDelta(_)),
        ));
    }

    #[test]
    fn routine_errors_propagate() {
        let mut particle = Particle { position: 0.0, velocity: 1.0, elapsed: 0.0 };
        let mut failing = |_: &Particle, _: f32| {
            Interrupt::new(0.1, |_: &mut Particle, _| Err(Error::InvalidConfig("boom"))).map(Some)
        };

        assert_eq!(
            InterruptStepper::default().step(&mut particle, &mut failing, 1.0),
            Err(Error::InvalidConfig("boom")),
        );
    }
}
