//! Rigid bodies and the arena that owns them.
//!
//! Constraints never own bodies. They hold [`BodyHandle`]s and go through the [`BodySet`] for every
//! read and every impulse, so all aliasing within a tick is explicit.

use std::f32::consts::PI;

use tracing::debug;

use crate::error::{check_time_delta, Error, Result};
use crate::math::{Mat2, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Centre of mass, world space
    position: Vec2,
    /// Linear velocity applied to position
    velocity: Vec2,
    /// Rotation in radians
    angle: f32,
    /// Angular velocity applied to angle
    angular_velocity: f32,
    mass: f32,
    inverse_mass: f32,
    /// Moment of inertia about the centre of mass
    inertia: f32,
    inverse_inertia: f32,
}

impl Body {
    /// Creates a body at rest at the origin
    pub fn new(mass: f32, inertia: f32) -> Result<Self> {
        let mut body = Body {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            mass: 1.0,
            inverse_mass: 1.0,
            inertia: 1.0,
            inverse_inertia: 1.0,
        };
        body.set_mass(mass)?;
        body.set_inertia(inertia)?;
        Ok(body)
    }

    /// Creates a solid disc body from its radius and area density
    pub fn circle(radius: f32, density: f32) -> Result<Self> {
        let mass = PI*radius*radius*density;
        let inertia = 0.5*mass*radius*radius;
        Body::new(mass, inertia)
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn position(&self) -> Vec2 { self.position }
    pub fn velocity(&self) -> Vec2 { self.velocity }
    pub fn angle(&self) -> f32 { self.angle }
    pub fn angular_velocity(&self) -> f32 { self.angular_velocity }
    pub fn mass(&self) -> f32 { self.mass }
    pub fn inverse_mass(&self) -> f32 { self.inverse_mass }
    pub fn inertia(&self) -> f32 { self.inertia }
    pub fn inverse_inertia(&self) -> f32 { self.inverse_inertia }

    /// Linear momentum, `m·v`
    pub fn momentum(&self) -> Vec2 {
        self.velocity*self.mass
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: f32) {
        self.angular_velocity = angular_velocity;
    }

    pub fn set_mass(&mut self, mass: f32) -> Result<()> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(Error::NonPositiveMass(mass));
        }
        self.mass = mass;
        self.inverse_mass = 1.0/mass;
        Ok(())
    }

    pub fn set_inertia(&mut self, inertia: f32) -> Result<()> {
        if !(inertia > 0.0 && inertia.is_finite()) {
            return Err(Error::NonPositiveInertia(inertia));
        }
        self.inertia = inertia;
        self.inverse_inertia = 1.0/inertia;
        Ok(())
    }

    /// Applies an impulse through the centre of mass
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse*self.inverse_mass;
    }

    /// Applies a pure angular impulse
    #[inline]
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        self.angular_velocity += impulse*self.inverse_inertia;
    }

    /// Applies an impulse at `offset` from the centre of mass (world-aligned offset)
    #[inline]
    pub fn apply_impulse_at(&mut self, offset: Vec2, impulse: Vec2) {
        self.apply_impulse(impulse);
        self.apply_angular_impulse(offset.cross(impulse));
    }

    /// Velocity of the material point at `offset` from the centre of mass
    #[inline]
    pub fn velocity_at(&self, offset: Vec2) -> Vec2 {
        self.velocity + Vec2::scalar_cross(self.angular_velocity, offset)
    }

    /// Effective inverse-mass matrix at `offset`
    ///
    /// Maps an impulse applied at `offset` to the resulting change in that point's velocity:
    /// `Δv = K·P` with `K = I/m + [[ry², -rx·ry], [-rx·ry, rx²]]/I`.
    pub fn inverse_mass_at(&self, offset: Vec2) -> Mat2 {
        let Vec2 { x: rx, y: ry } = offset;
        let angular = Mat2::new(
            ry*ry, -rx*ry,
            -rx*ry, rx*rx,
        );
        Mat2::diagonal(self.inverse_mass) + angular*self.inverse_inertia
    }

    /// Explicit first-order integration of position and angle over `dt`
    pub fn integrate(&mut self, dt: f32) -> Result<()> {
        let dt = check_time_delta(dt)?;
        self.position += self.velocity*dt;
        self.angle += self.angular_velocity*dt;
        Ok(())
    }

    /// Transforms a point from body space into world space
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + self.world_offset(local)
    }

    /// Rotates a body-space offset into a world-aligned offset from the centre of mass
    pub fn world_offset(&self, local: Vec2) -> Vec2 {
        Mat2::rotation(self.angle)*local
    }
}

//----------------------------------------------------------------------------------
// Arena
//----------------------------------------------------------------------------------
/// Stable reference to a body inside a [`BodySet`]
///
/// Handles carry a generation so a handle to a removed body never aliases a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

#[derive(Debug, Clone, Default)]
pub struct BodySet {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adds a body, reusing a freed slot when one exists
    pub fn insert(&mut self, body: Body) -> BodyHandle {
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            BodyHandle { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, body: Some(body) });
            BodyHandle { index, generation: 0 }
        };
        self.len += 1;

        debug!(index = handle.index, generation = handle.generation, "created body");
        handle
    }

    /// Removes a body, returning it if the handle was live
    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }

        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;

        debug!(index = handle.index, generation = handle.generation, "destroyed body");
        Some(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Like [`BodySet::get`], but an unknown handle is an error
    pub fn try_get(&self, handle: BodyHandle) -> Result<&Body> {
        self.get(handle).ok_or(Error::UnknownBody(handle))
    }

    /// Like [`BodySet::get_mut`], but an unknown handle is an error
    pub fn try_get_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.get_mut(handle).ok_or(Error::UnknownBody(handle))
    }

    /// Iterates live bodies in slot order
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| (BodyHandle { index: index as u32, generation: slot.generation }, body))
        })
    }

    /// Iterates live bodies mutably in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.body.as_mut().map(|body| (BodyHandle { index: index as u32, generation }, body))
        })
    }

    /// Sum of linear momentum over every body
    pub fn total_momentum(&self) -> Vec2 {
        self.iter().fold(Vec2::ZERO, |sum, (_, body)| sum + body.momentum())
    }
}
