//! The orchestrator: owns the bodies, geometry and constrainers and runs the per-tick pipeline.
//!
//! A tick applies gravity, detects contacts, solves every velocity constraint together and then
//! moves the bodies. Bodies with a continuous collider are moved through the interrupt stepper so
//! fast movers stop at static geometry instead of passing through it.

use arrayvec::ArrayVec;
use tracing::{debug, debug_span, trace, warn};

use crate::body::{Body, BodyHandle, BodySet};
use crate::collision::{
    circle_segment_contact, circle_vs_circle, circle_vs_shape, Circle, CollisionConstraint, CollisionData,
    LineSegment, Material, StaticShape,
};
use crate::config::SimulationConfig;
use crate::constraint::{ActiveConstraint, VelocityConstrainer};
use crate::error::{check_time_delta, Result};
use crate::math::Vec2;
use crate::solver::{ConstrainerId, IterativeSolver};
use crate::stepper::{Advance, Interrupt, InterruptSource, InterruptStepper, StepReport};
use crate::toi::{RootFinder, SweptCircle};
use crate::DEFAULT_MAX_CONTACTS;

//----------------------------------------------------------------------------------
// Types and Structures Definition
//----------------------------------------------------------------------------------
/// Called once per contact per tick with the contact and the time left in the tick
pub trait CollisionListener {
    fn on_collision(&mut self, contact: &CollisionData, remaining: f32);
}

impl<F> CollisionListener for F
where
    F: FnMut(&CollisionData, f32),
{
    fn on_collision(&mut self, contact: &CollisionData, remaining: f32) {
        self(contact, remaining)
    }
}

/// Circle shape attached to a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub body: BodyHandle,
    pub circle: Circle,
    pub material: Material,
    /// Sweep against static geometry while integrating
    pub continuous: bool,
}

impl Collider {
    pub fn new(body: BodyHandle, radius: f32) -> Self {
        Collider {
            body,
            circle: Circle { radius },
            material: Material::default(),
            continuous: false,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }
}

pub struct World<const MAX_CONTACTS: usize = DEFAULT_MAX_CONTACTS> {
    config: SimulationConfig,
    bodies: BodySet,
    colliders: Vec<Collider>,
    shapes: Vec<StaticShape>,
    solver: IterativeSolver,
    listeners: Vec<Box<dyn CollisionListener>>,
    contacts: ArrayVec<CollisionData, MAX_CONTACTS>,
    finder: RootFinder,
    stepper: InterruptStepper,
    accumulator: f32,
    time: f32,
    steps: u64,
}

//----------------------------------------------------------------------------------
// Module Functions Definition
//----------------------------------------------------------------------------------
impl World {
    /// World with the default contact capacity
    pub fn new(config: SimulationConfig) -> Result<Self> {
        World::with_contact_capacity(config)
    }
}

impl<const MAX_CONTACTS: usize> World<MAX_CONTACTS> {
    /// World holding at most `MAX_CONTACTS` discrete contacts per tick; extras are dropped
    pub fn with_contact_capacity(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        debug!(?config, max_contacts = MAX_CONTACTS, "world initialized");

        Ok(World {
            config,
            bodies: BodySet::new(),
            colliders: Vec::new(),
            shapes: Vec::new(),
            solver: IterativeSolver::new(config.solver_iterations),
            listeners: Vec::new(),
            contacts: ArrayVec::new(),
            finder: RootFinder::new(config.root_finder),
            stepper: InterruptStepper::new(config.max_substeps),
            accumulator: 0.0,
            time: 0.0,
            steps: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    /// Simulated seconds so far
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Ticks run so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut BodySet {
        &mut self.bodies
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        self.bodies.insert(body)
    }

    /// Removes the body and its colliders; constrainers that reference it are skipped from then on
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let body = self.bodies.remove(handle)?;
        self.colliders.retain(|collider| collider.body != handle);
        Some(body)
    }

    /// Fails with [`crate::Error::UnknownBody`] when the collider's body is not in this world
    pub fn add_collider(&mut self, collider: Collider) -> Result<()> {
        self.bodies.try_get(collider.body)?;
        self.colliders.push(collider);
        Ok(())
    }

    /// Circle collider with the configured default material
    pub fn add_circle(&mut self, body: BodyHandle, radius: f32, continuous: bool) -> Result<()> {
        let mut collider = Collider::new(body, radius).with_material(self.config.material);
        collider.continuous = continuous;
        self.add_collider(collider)
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Returns the index of the new shape
    pub fn add_shape(&mut self, shape: StaticShape) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    pub fn shapes(&self) -> &[StaticShape] {
        &self.shapes
    }

    /// Shape access for [`StaticShape::translate`]
    pub fn shape_mut(&mut self, index: usize) -> Option<&mut StaticShape> {
        self.shapes.get_mut(index)
    }

    pub fn add_constrainer(&mut self, constrainer: Box<dyn VelocityConstrainer>) -> ConstrainerId {
        self.solver.add(constrainer)
    }

    pub fn remove_constrainer(&mut self, id: ConstrainerId) -> Option<Box<dyn VelocityConstrainer>> {
        self.solver.remove(id)
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: CollisionListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Discrete contacts found by the last tick
    pub fn contacts(&self) -> &[CollisionData] {
        &self.contacts
    }

    /// Runs as many fixed-size ticks as fit into the accumulated time, returning how many ran
    pub fn advance(&mut self, elapsed: f32) -> Result<usize> {
        self.accumulator += check_time_delta(elapsed)?;

        let step = self.config.time_step;
        let mut ticks = 0;
        while self.accumulator >= step {
            self.tick(step)?;
            self.accumulator -= step;
            ticks += 1;
        }

        Ok(ticks)
    }

    /// One physics step of `dt` seconds (dynamics, collision solving and integration)
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        let dt = check_time_delta(dt)?;
        let _span = debug_span!("tick", step = self.steps, dt).entered();

        self.steps += 1;

        let gravity = self.config.gravity;
        for (_, body) in self.bodies.iter_mut() {
            let impulse = gravity*dt*body.mass();
            body.apply_impulse(impulse);
        }

        self.detect_contacts();
        for contact in &self.contacts {
            for listener in &mut self.listeners {
                listener.on_collision(contact, dt);
            }
        }

        let mut composite = self.solver.plan_lenient(&self.bodies, dt)?;
        for contact in &self.contacts {
            let constraint = CollisionConstraint::new(*contact)
                .with_penetration_slop(self.config.penetration_allowance, self.config.penetration_correction);
            match constraint.plan_contact(&self.bodies, dt) {
                Ok(active) => composite.push(Box::new(active)),
                Err(err) => warn!(%err, "skipping contact"),
            }
        }
        composite.refine(&mut self.bodies);

        self.integrate(dt)?;
        self.time += dt;
        Ok(())
    }

    /// Refills the contact buffer: every collider against every static shape, then collider pairs
    fn detect_contacts(&mut self) {
        self.contacts.clear();
        let mut dropped = 0usize;

        for (i, collider) in self.colliders.iter().enumerate() {
            let Some(body) = self.bodies.get(collider.body) else {
                continue;
            };

            for shape in &self.shapes {
                for contact in circle_vs_shape(collider.body, body, collider.circle, collider.material, shape) {
                    if self.contacts.try_push(contact).is_err() {
                        dropped += 1;
                    }
                }
            }

            for other in &self.colliders[i + 1..] {
                if other.body == collider.body {
                    continue;
                }
                let Some(other_body) = self.bodies.get(other.body) else {
                    continue;
                };

                let contact = circle_vs_circle(
                    (collider.body, body, collider.circle, collider.material),
                    (other.body, other_body, other.circle, other.material),
                );
                if let Some(contact) = contact {
                    if self.contacts.try_push(contact).is_err() {
                        dropped += 1;
                    }
                }
            }
        }

        if dropped > 0 {
            warn!(dropped, capacity = MAX_CONTACTS, "contact buffer full, extra contacts dropped");
        }
        trace!(contacts = self.contacts.len(), "contacts detected");
    }

    /// Moves every body by `dt`; continuous bodies are swept against static geometry
    fn integrate(&mut self, dt: f32) -> Result<()> {
        let mut continuous: Vec<Collider> = Vec::new();
        for collider in self.colliders.iter().filter(|collider| collider.continuous) {
            if !continuous.iter().any(|other| other.body == collider.body) {
                continuous.push(*collider);
            }
        }

        for (handle, body) in self.bodies.iter_mut() {
            if !continuous.iter().any(|collider| collider.body == handle) {
                body.integrate(dt)?;
            }
        }

        if continuous.is_empty() {
            return Ok(());
        }

        let (segments, materials): (Vec<LineSegment>, Vec<Material>) = self.shapes
            .iter()
            .flat_map(|shape| shape.segments().iter().map(move |segment| (*segment, shape.material)))
            .unzip();

        for collider in continuous {
            let mut subject = SweptBody {
                collider,
                bodies: &mut self.bodies,
                listeners: &mut self.listeners,
                allowance: self.config.penetration_allowance,
                correction: self.config.penetration_correction,
                iterations: self.config.solver_iterations,
            };
            let mut source = ImpactSource {
                finder: &self.finder,
                segments: &segments,
                materials: &materials,
            };

            let report: StepReport = self.stepper.step(&mut subject, &mut source, dt)?;
            if report.interrupts > 0 {
                trace!(body = collider.body.index(), interrupts = report.interrupts, truncated = report.truncated, "swept body");
            }
        }

        Ok(())
    }
}

//----------------------------------------------------------------------------------
// Module Internal Functions Definition
//----------------------------------------------------------------------------------
/// A continuous body being carried through the interrupt stepper
struct SweptBody<'w> {
    collider: Collider,
    bodies: &'w mut BodySet,
    listeners: &'w mut Vec<Box<dyn CollisionListener>>,
    allowance: f32,
    correction: f32,
    iterations: usize,
}

impl Advance for SweptBody<'_> {
    fn advance(&mut self, dt: f32) -> Result<()> {
        self.bodies.try_get_mut(self.collider.body)?.integrate(dt)
    }
}

impl SweptBody<'_> {
    /// Solves the contact with `segment` over the rest of the tick and reports it
    fn resolve_impact(&mut self, segment: &LineSegment, material: Material, remaining: f32) -> Result<()> {
        let handle = self.collider.body;
        let body = self.bodies.try_get(handle)?;
        let Some(contact) = circle_segment_contact(handle, body, self.collider.circle, segment, material) else {
            return Ok(());
        };

        let mut active = CollisionConstraint::new(contact)
            .with_penetration_slop(self.allowance, self.correction)
            .plan_contact(&*self.bodies, remaining)?;
        for _ in 0..self.iterations.max(1) {
            active.refine(&mut *self.bodies);
        }

        for listener in self.listeners.iter_mut() {
            listener.on_collision(&contact, remaining);
        }
        Ok(())
    }
}

/// Earliest time-of-impact of a swept body against the world's static segments
struct ImpactSource<'s> {
    finder: &'s RootFinder,
    segments: &'s [LineSegment],
    materials: &'s [Material],
}

impl<'w> InterruptSource<SweptBody<'w>> for ImpactSource<'_> {
    fn earliest(&mut self, subject: &SweptBody<'w>, within: f32) -> Result<Option<Interrupt<SweptBody<'w>>>> {
        let body = subject.bodies.try_get(subject.collider.body)?;
        let swept = SweptCircle {
            start: body.position(),
            velocity: body.velocity(),
            circle: subject.collider.circle,
        };

        let Some(impact) = swept.earliest_impact(self.finder, self.segments, within)? else {
            return Ok(None);
        };

        let segment = self.segments[impact.segment];
        let material = subject.collider.material.mix(self.materials[impact.segment]);
        Interrupt::new(impact.time, move |subject: &mut SweptBody<'w>, remaining| {
            subject.resolve_impact(&segment, material, remaining)
        })
        .map(Some)
    }
}
