//! The velocity-constraint extension point, plus the stock constrainers built on it.
//!
//! A constraint is solved in two phases. [`VelocityConstrainer::plan`] runs once per tick and
//! precomputes everything that depends on the step size (effective masses, impulse bounds, bias
//! velocities). The returned [`ActiveConstraint`] is then refined any number of times by the solver;
//! each refinement only re-reads current velocities and pushes bodies through impulses.

use crate::body::{BodyHandle, BodySet};
use crate::error::{check_time_delta, Result};
use crate::impulse::ScalarImpulseAccumulator;
use crate::math::{Interval, Mat2, Vec2};

/// Something that can be turned into a solvable velocity constraint for one step
pub trait VelocityConstrainer {
    /// Precomputes the step-dependent part of the constraint
    ///
    /// Fails with [`crate::Error::UnknownBody`] when a referenced body is gone, and with
    /// [`crate::Error::NegativeTimeDelta`] for a negative step.
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>>;
}

/// A planned constraint, ready to be refined repeatedly within one step
pub trait ActiveConstraint {
    /// One Gauss-Seidel pass: re-read velocities, apply the correcting impulse
    fn refine(&mut self, bodies: &mut BodySet);
}

/// One end of a constraint: a point on a body (world-aligned offset from its centre), or the static world
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Body { handle: BodyHandle, offset: Vec2 },
    World,
}

impl Anchor {
    pub fn body(handle: BodyHandle, offset: Vec2) -> Self {
        Anchor::Body { handle, offset }
    }

    /// Errors when the anchor refers to a body missing from `bodies`
    pub fn check(&self, bodies: &BodySet) -> Result<()> {
        match *self {
            Anchor::Body { handle, .. } => bodies.try_get(handle).map(|_| ()),
            Anchor::World => Ok(()),
        }
    }

    pub fn velocity(&self, bodies: &BodySet) -> Vec2 {
        match *self {
            Anchor::Body { handle, offset } => bodies.get(handle).map_or(Vec2::ZERO, |body| body.velocity_at(offset)),
            Anchor::World => Vec2::ZERO,
        }
    }

    /// Effective inverse-mass matrix at the anchor point; the world is immovable
    pub fn inverse_mass(&self, bodies: &BodySet) -> Mat2 {
        match *self {
            Anchor::Body { handle, offset } => bodies.get(handle).map_or(Mat2::ZERO, |body| body.inverse_mass_at(offset)),
            Anchor::World => Mat2::ZERO,
        }
    }

    pub fn apply_impulse(&self, bodies: &mut BodySet, impulse: Vec2) {
        if let Anchor::Body { handle, offset } = *self {
            if let Some(body) = bodies.get_mut(handle) {
                body.apply_impulse_at(offset, impulse);
            }
        }
    }
}

/// `1 / (dᵀ·K·d)` for a unit direction `d`, or zero when the projection vanishes
pub(crate) fn effective_mass(inverse_mass: Mat2, direction: Vec2) -> f32 {
    let k = inverse_mass.quadratic_form(direction);
    if k > 0.0 && k.is_finite() { 1.0/k } else { 0.0 }
}

//----------------------------------------------------------------------------------
// Spring
//----------------------------------------------------------------------------------
/// Damped spring between a body point and either another body point or a fixed world point
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub body_a: BodyHandle,
    /// Attachment point in body A's local frame
    pub local_a: Vec2,
    /// Second body; `None` attaches to the fixed world point `local_b`
    pub body_b: Option<BodyHandle>,
    pub local_b: Vec2,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

/// A spring's impulse is fixed at plan time and applied on the first pass only
struct SpringSolve {
    a: Anchor,
    b: Anchor,
    impulse: Vec2,
    applied: bool,
}

impl VelocityConstrainer for Spring {
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>> {
        let step = check_time_delta(step)?;

        let body_a = bodies.try_get(self.body_a)?;
        let offset_a = body_a.world_offset(self.local_a);
        let point_a = body_a.world_point(self.local_a);
        let a = Anchor::body(self.body_a, offset_a);

        let (b, point_b) = match self.body_b {
            Some(handle) => {
                let body_b = bodies.try_get(handle)?;
                let offset_b = body_b.world_offset(self.local_b);
                (Anchor::body(handle, offset_b), body_b.world_point(self.local_b))
            }
            None => (Anchor::World, self.local_b),
        };

        let delta = point_b - point_a;
        let impulse = match delta.try_normalize() {
            Some(direction) => {
                let stretch = delta.length() - self.rest_length;
                let closing = (b.velocity(bodies) - a.velocity(bodies)).dot(direction);
                let force = self.stiffness*stretch + self.damping*closing;
                direction*(force*step)
            }
            // Coincident ends have no line of action
            None => Vec2::ZERO,
        };

        Ok(Box::new(SpringSolve { a, b, impulse, applied: false }))
    }
}

impl ActiveConstraint for SpringSolve {
    fn refine(&mut self, bodies: &mut BodySet) {
        if self.applied {
            return;
        }
        self.applied = true;

        self.a.apply_impulse(bodies, self.impulse);
        self.b.apply_impulse(bodies, -self.impulse);
    }
}

//----------------------------------------------------------------------------------
// Angular motor
//----------------------------------------------------------------------------------
/// Drives a body's spin toward `target_speed`, never exceeding `max_torque`
#[derive(Debug, Clone, PartialEq)]
pub struct AngularMotor {
    pub body: BodyHandle,
    pub target_speed: f32,
    pub max_torque: f32,
}

struct MotorSolve {
    body: BodyHandle,
    target_speed: f32,
    inertia: f32,
    range: Interval,
    accumulator: ScalarImpulseAccumulator,
}

impl VelocityConstrainer for AngularMotor {
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>> {
        let step = check_time_delta(step)?;
        let body = bodies.try_get(self.body)?;

        Ok(Box::new(MotorSolve {
            body: self.body,
            target_speed: self.target_speed,
            inertia: body.inertia(),
            range: Interval::symmetric(self.max_torque.abs()*step),
            accumulator: ScalarImpulseAccumulator::new(),
        }))
    }
}

impl ActiveConstraint for MotorSolve {
    fn refine(&mut self, bodies: &mut BodySet) {
        let Some(body) = bodies.get_mut(self.body) else { return };
        let error = self.target_speed - body.angular_velocity();
        let applied = self.accumulator.update(error, self.inertia, self.range);
        body.apply_angular_impulse(applied);
    }
}

//----------------------------------------------------------------------------------
// Pin
//----------------------------------------------------------------------------------
/// Holds a body-local point at a fixed world anchor
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub body: BodyHandle,
    pub local_point: Vec2,
    pub anchor: Vec2,
    /// Fraction of the positional error removed per step (0 disables drift correction)
    pub correction: f32,
    /// Upper bound on the holding force
    pub max_force: f32,
}

struct PinSolve {
    point: Anchor,
    bias: Vec2,
    effective_mass: Mat2,
    max_impulse: f32,
    total: Vec2,
}

impl VelocityConstrainer for Pin {
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>> {
        let step = check_time_delta(step)?;
        let body = bodies.try_get(self.body)?;

        let offset = body.world_offset(self.local_point);
        let error = self.anchor - body.world_point(self.local_point);
        let bias = if step > 0.0 { error*(self.correction/step) } else { Vec2::ZERO };

        Ok(Box::new(PinSolve {
            point: Anchor::body(self.body, offset),
            bias,
            effective_mass: body.inverse_mass_at(offset).inverse().unwrap_or(Mat2::ZERO),
            max_impulse: self.max_force.abs()*step,
            total: Vec2::ZERO,
        }))
    }
}

impl ActiveConstraint for PinSolve {
    fn refine(&mut self, bodies: &mut BodySet) {
        let velocity = self.point.velocity(bodies);
        let requested = self.total + self.effective_mass*(self.bias - velocity);

        // Same clamp-and-diff as the scalar accumulator, on the impulse magnitude
        let clamped = if requested.length() > self.max_impulse {
            requested.normalize_or_zero()*self.max_impulse
        } else {
            requested
        };
        let applied = clamped - self.total;
        self.total = clamped;

        self.point.apply_impulse(bodies, applied);
    }
}

//----------------------------------------------------------------------------------
// Seeker
//----------------------------------------------------------------------------------
/// Steers a body toward a world point at a cruising speed, arriving without overshoot
#[derive(Debug, Clone, PartialEq)]
pub struct Seeker {
    pub body: BodyHandle,
    pub target: Vec2,
    pub speed: f32,
    pub max_force: f32,
}

struct SeekerSolve {
    body: BodyHandle,
    desired_velocity: Vec2,
    mass: f32,
    range: Interval,
    x: ScalarImpulseAccumulator,
    y: ScalarImpulseAccumulator,
}

impl VelocityConstrainer for Seeker {
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>> {
        let step = check_time_delta(step)?;
        let body = bodies.try_get(self.body)?;

        let to_target = self.target - body.position();
        let distance = to_target.length();
        let desired_velocity = if step > 0.0 && distance < self.speed*step {
            to_target/step
        } else {
            to_target.normalize_or_zero()*self.speed
        };

        Ok(Box::new(SeekerSolve {
            body: self.body,
            desired_velocity,
            mass: body.mass(),
            range: Interval::symmetric(self.max_force.abs()*step),
            x: ScalarImpulseAccumulator::new(),
            y: ScalarImpulseAccumulator::new(),
        }))
    }
}

impl ActiveConstraint for SeekerSolve {
    fn refine(&mut self, bodies: &mut BodySet) {
        let Some(body) = bodies.get_mut(self.body) else { return };
        let error = self.desired_velocity - body.velocity();
        let impulse = Vec2::new(
            self.x.update(error.x, self.mass, self.range),
            self.y.update(error.y, self.mass, self.range),
        );
        body.apply_impulse(impulse);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;

    fn refine_n(active: &mut dyn ActiveConstraint, bodies: &mut BodySet, n: usize) {
        for _ in 0..n {
            active.refine(bodies);
        }
    }

    #[test]
    fn planning_against_missing_body_fails() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(Body::new(1.0, 1.0).unwrap());
        bodies.remove(handle);

        let motor = AngularMotor { body: handle, target_speed: 1.0, max_torque: 1.0 };
        assert!(matches!(motor.plan(&bodies, 0.1), Err(Error::UnknownBody(h)) if h == handle));
    }

    #[test]
    fn planning_rejects_negative_step() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(Body::new(1.0, 1.0).unwrap());
        let motor = AngularMotor { body: handle, target_speed: 1.0, max_torque: 1.0 };
        assert!(matches!(motor.plan(&bodies, -0.1), Err(Error::NegativeTimeDelta(_))));
    }

    #[test]
    fn motor_reaches_target_when_torque_allows() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(Body::new(1.0, 2.0).unwrap());
        let motor = AngularMotor { body: handle, target_speed: 3.0, max_torque: 1000.0 };

        let mut active = motor.plan(&bodies, 0.1).unwrap();
        refine_n(active.as_mut(), &mut bodies, 4);

        assert_abs_diff_eq!(bodies.get(handle).unwrap().angular_velocity(), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn motor_is_limited_by_torque_times_step() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(Body::new(1.0, 2.0).unwrap());
        let motor = AngularMotor { body: handle, target_speed: 100.0, max_torque: 4.0 };

        let mut active = motor.plan(&bodies, 0.5).unwrap();
        refine_n(active.as_mut(), &mut bodies, 10);

        // Impulse bound 4 * 0.5 = 2 over inertia 2
        assert_abs_diff_eq!(bodies.get(handle).unwrap().angular_velocity(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn spring_applies_its_impulse_once_and_conserves_momentum() {
        let mut bodies = BodySet::new();
        let a = bodies.insert(Body::new(1.0, 1.0).unwrap());
        let b = bodies.insert(Body::new(2.0, 1.0).unwrap().with_position(Vec2::new(3.0, 0.0)));
        let spring = Spring {
            body_a: a,
            local_a: Vec2::ZERO,
            body_b: Some(b),
            local_b: Vec2::ZERO,
            rest_length: 1.0,
            stiffness: 10.0,
            damping: 0.0,
        };

        let mut active = spring.plan(&bodies, 0.1).unwrap();
        refine_n(active.as_mut(), &mut bodies, 5);

        // Stretch 2, force 20, impulse 2 pulling the ends together
        assert_abs_diff_eq!(bodies.get(a).unwrap().velocity().x, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(bodies.get(b).unwrap().velocity().x, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(bodies.total_momentum().x, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn spring_with_coincident_ends_does_nothing() {
        let mut bodies = BodySet::new();
        let a = bodies.insert(Body::new(1.0, 1.0).unwrap());
        let spring = Spring {
            body_a: a,
            local_a: Vec2::ZERO,
            body_b: None,
            local_b: Vec2::ZERO,
            rest_length: 1.0,
            stiffness: 10.0,
            damping: 1.0,
        };

        let mut active = spring.plan(&bodies, 0.1).unwrap();
        active.refine(&mut bodies);
        assert_eq!(bodies.get(a).unwrap().velocity(), Vec2::ZERO);
    }

    #[test]
    fn pin_stops_the_pinned_point() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(
            Body::new(1.0, 0.5).unwrap()
                .with_velocity(Vec2::new(1.0, -2.0))
                .with_angular_velocity(0.7),
        );
        let pin = Pin {
            body: handle,
            local_point: Vec2::new(1.0, 0.0),
            anchor: Vec2::new(1.0, 0.0),
            correction: 0.0,
            max_force: f32::INFINITY,
        };

        let mut active = pin.plan(&bodies, 1.0/60.0).unwrap();
        refine_n(active.as_mut(), &mut bodies, 3);

        let body = bodies.get(handle).unwrap();
        let v = body.velocity_at(Vec2::new(1.0, 0.0));
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(v.y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn seeker_heads_for_target_at_cruise_speed() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(Body::new(2.0, 1.0).unwrap());
        let seeker = Seeker { body: handle, target: Vec2::new(10.0, 0.0), speed: 3.0, max_force: 1000.0 };

        let mut active = seeker.plan(&bodies, 0.1).unwrap();
        refine_n(active.as_mut(), &mut bodies, 2);

        let v = bodies.get(handle).unwrap().velocity();
        assert_abs_diff_eq!(v.x, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(v.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn seeker_arrives_without_overshoot() {
        let mut bodies = BodySet::new();
        let handle = bodies.insert(Body::new(1.0, 1.0).unwrap());
        let seeker = Seeker { body: handle, target: Vec2::new(0.1, 0.0), speed: 5.0, max_force: 1000.0 };

        let mut active = seeker.plan(&bodies, 0.1).unwrap();
        active.refine(&mut bodies);

        // Covers the remaining 0.1 in exactly one step
        assert_abs_diff_eq!(bodies.get(handle).unwrap().velocity().x, 1.0, epsilon = 1e-5);
    }
}
