//! Sequential-impulse solve of a single contact.

use crate::body::BodySet;
use crate::constraint::{effective_mass, ActiveConstraint, Anchor, VelocityConstrainer};
use crate::error::{check_time_delta, Result};
use crate::impulse::ScalarImpulseAccumulator;
use crate::math::{Interval, Vec2};
use crate::{DEFAULT_PENETRATION_ALLOWANCE, DEFAULT_PENETRATION_CORRECTION};

use super::CollisionData;

/// Turns one contact into a non-penetration (normal) and a friction (tangent) impulse solve
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionConstraint {
    pub contact: CollisionData,
    /// Penetration tolerated before positional bias kicks in
    pub allowance: f32,
    /// Fraction of excess penetration removed per step
    pub correction: f32,
}

impl CollisionConstraint {
    pub fn new(contact: CollisionData) -> Self {
        CollisionConstraint {
            contact,
            allowance: DEFAULT_PENETRATION_ALLOWANCE,
            correction: DEFAULT_PENETRATION_CORRECTION,
        }
    }

    pub fn with_penetration_slop(mut self, allowance: f32, correction: f32) -> Self {
        self.allowance = allowance;
        self.correction = correction;
        self
    }
}

/// Planned contact; see [`CollisionConstraint`]
#[derive(Debug, Clone)]
pub struct ActiveCollision {
    a: Anchor,
    b: Anchor,
    normal: Vec2,
    tangent: Vec2,
    friction: f32,
    target_normal_velocity: f32,
    normal_mass: f32,
    tangent_mass: f32,
    normal_impulse: ScalarImpulseAccumulator,
    tangent_impulse: ScalarImpulseAccumulator,
}

impl ActiveCollision {
    /// Velocity of B's contact point relative to A's
    fn relative_velocity(&self, bodies: &BodySet) -> Vec2 {
        self.b.velocity(bodies) - self.a.velocity(bodies)
    }

    /// Pushes B along `impulse` and A the opposite way
    fn apply(&self, bodies: &mut BodySet, impulse: Vec2) {
        self.a.apply_impulse(bodies, -impulse);
        self.b.apply_impulse(bodies, impulse);
    }

    /// Accumulated normal impulse (never negative)
    pub fn normal_impulse(&self) -> f32 {
        self.normal_impulse.total()
    }

    /// Accumulated friction impulse
    pub fn tangent_impulse(&self) -> f32 {
        self.tangent_impulse.total()
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn target_normal_velocity(&self) -> f32 {
        self.target_normal_velocity
    }
}

impl CollisionConstraint {
    /// [`VelocityConstrainer::plan`] without the boxing, for callers that want to inspect the solve
    pub fn plan_contact(&self, bodies: &BodySet, step: f32) -> Result<ActiveCollision> {
        let step = check_time_delta(step)?;
        let contact = &self.contact;

        let a = contact.anchor_a();
        let b = contact.anchor_b();
        a.check(bodies)?;
        b.check(bodies)?;

        let normal = contact.normal;
        let tangent = normal.perp();

        let position_bias = if contact.penetration > self.allowance && step > 0.0 {
            (contact.penetration - self.allowance)*self.correction/step
        } else {
            0.0
        };

        let closing = (b.velocity(bodies) - a.velocity(bodies)).dot(normal);
        let bounce = if closing < 0.0 { -contact.restitution*closing } else { 0.0 };

        let inverse_mass = a.inverse_mass(bodies) + b.inverse_mass(bodies);

        Ok(ActiveCollision {
            a,
            b,
            normal,
            tangent,
            friction: contact.friction,
            target_normal_velocity: position_bias.max(bounce),
            normal_mass: effective_mass(inverse_mass, normal),
            tangent_mass: effective_mass(inverse_mass, tangent),
            normal_impulse: ScalarImpulseAccumulator::new(),
            tangent_impulse: ScalarImpulseAccumulator::new(),
        })
    }
}

impl VelocityConstrainer for CollisionConstraint {
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>> {
        Ok(Box::new(self.plan_contact(bodies, step)?))
    }
}

impl ActiveConstraint for ActiveCollision {
    fn refine(&mut self, bodies: &mut BodySet) {
        // Normal first so the friction bound sees this pass's normal impulse
        let normal_velocity = self.relative_velocity(bodies).dot(self.normal);
        let applied = self.normal_impulse.update(
            self.target_normal_velocity - normal_velocity,
            self.normal_mass,
            Interval::NON_NEGATIVE,
        );
        self.apply(bodies, self.normal*applied);

        let bound = Interval::symmetric(self.friction*self.normal_impulse.total());
        let tangent_velocity = self.relative_velocity(bodies).dot(self.tangent);
        let applied = self.tangent_impulse.update(-tangent_velocity, self.tangent_mass, bound);
        self.apply(bodies, self.tangent*applied);
    }
}
