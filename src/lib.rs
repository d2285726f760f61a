/*!********************************************************************************************
*
*   impulse2d - 2D rigid-body kernel
*
*   DESCRIPTION:
*
*   A small 2D physics kernel built around a sequential impulse solver. A physics step contains
*   the following phases: apply gravity, get collision information, plan and solve every velocity
*   constraint together, then integrate positions. Fast bodies can be swept against static
*   geometry: a time-of-impact search interrupts their integration at the moment of contact so
*   the collision is solved before the rest of the step is taken.
*
*   MODULES:
*
*   math        Vec2, Mat2 and Interval
*   body        Bodies and the generational BodySet arena
*   impulse     Clamped accumulated impulse for 1D solves
*   constraint  The plan/refine constraint contract plus springs, motors, pins and seekers
*   collision   Contacts, static geometry, detectors and the contact constraint
*   solver      Gauss-Seidel composite over many constraints
*   toi         Bracket-then-bisect time-of-impact search
*   stepper     Interrupt-driven stepping with a bounded number of sub-steps
*   world       The orchestrator that runs the tick pipeline
*
*   FEATURES:
*
*   serde       Serialize/Deserialize for Vec2, Interval, Material and the config structs
*   raylib      Conversions between Vec2 and raylib's Vector2 for rendering
*
*   Logging goes through `tracing`; no subscriber is installed by the library.
*
*   LICENSE: zlib/libpng
*
*   Copyright (c) 2026 impulse2d contributors
*
*   This software is provided "as-is", without any express or implied warranty. In no event
*   will the authors be held liable for any damages arising from the use of this software.
*
*   Permission is granted to anyone to use this software for any purpose, including commercial
*   applications, and to alter it and redistribute it freely, subject to the following restrictions:
*
*     1. The origin of this software must not be misrepresented; you must not claim that you
*     wrote the original software. If you use this software in a product, an acknowledgment
*     in the product documentation would be appreciated but is not required.
*
*     2. Altered source versions must be plainly marked as such, and must not be misrepresented
*     as being the original software.
*
*     3. This notice may not be removed or altered from any source distribution.
*
**********************************************************************************************/

pub mod body;
pub mod collision;
pub mod config;
pub mod constraint;
pub mod error;
pub mod impulse;
pub mod math;
pub mod solver;
pub mod stepper;
pub mod toi;
pub mod world;

pub use body::{Body, BodyHandle, BodySet};
pub use collision::{CollisionConstraint, CollisionData, Material, StaticShape};
pub use config::{SimulationConfig, SimulationConfigBuilder};
pub use error::{Error, Result};
pub use math::{Interval, Mat2, Vec2};
pub use world::{Collider, CollisionListener, World};

//----------------------------------------------------------------------------------
// Defines and Macros
//----------------------------------------------------------------------------------
pub const DEFAULT_MAX_CONTACTS: usize = 256;
pub const DEFAULT_MAX_SUBSTEPS: usize = 8;

pub const DEFAULT_FIXED_TIME:             f32   = 1.0/60.0;
pub const DEFAULT_COLLISION_ITERATIONS:   usize = 20;
pub const DEFAULT_PENETRATION_ALLOWANCE:  f32   = 0.05;
pub const DEFAULT_PENETRATION_CORRECTION: f32   = 0.4;

pub const DEFAULT_RESTITUTION: f32 = 0.0;
pub const DEFAULT_FRICTION:    f32 = 0.4;

pub const DEFAULT_TOI_SAMPLES:    usize = 10;
pub const DEFAULT_TOI_ITERATIONS: usize = 24;
pub const DEFAULT_TOI_TOLERANCE:  f32   = 1e-4;

/// Screen-style gravity: y grows downward
pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, 9.81);

pub mod prelude {
    pub use crate::body::{Body, BodyHandle, BodySet};
    pub use crate::collision::{
        circle_segment_contact, circle_vs_circle, circle_vs_segment, circle_vs_shape, ActiveCollision, Circle,
        CollisionConstraint, CollisionData, LineSegment, Material, StaticShape,
    };
    pub use crate::config::SimulationConfig;
    pub use crate::constraint::{ActiveConstraint, Anchor, AngularMotor, Pin, Seeker, Spring, VelocityConstrainer};
    pub use crate::error::{Error, Result};
    pub use crate::impulse::ScalarImpulseAccumulator;
    pub use crate::math::{Interval, Mat2, Vec2};
    pub use crate::solver::{ConstrainerId, IterativeConstraint, IterativeSolver};
    pub use crate::stepper::{Advance, Interrupt, InterruptSource, InterruptStepper, StepReport};
    pub use crate::toi::{Bracket, Impact, Root, RootFinder, RootFinderConfig, Separated, SweptCircle};
    pub use crate::world::{Collider, CollisionListener, World};
}
