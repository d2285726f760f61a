//! Time-of-impact search: coarse bracketing followed by bisection.
//!
//! The separation function is sampled at evenly spaced times and the first adjacent pair whose
//! samples fall on different sides of zero brackets the root. Two crossings inside one sampling
//! interval cancel out and are not seen, so a swept circle that only grazes the end of a segment
//! between two samples is missed; raise the sample count for fast movers.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::debug;

use crate::collision::{Circle, LineSegment};
use crate::error::{check_time_delta, Result};
use crate::math::{Interval, Vec2};
use crate::{DEFAULT_TOI_ITERATIONS, DEFAULT_TOI_SAMPLES, DEFAULT_TOI_TOLERANCE};

/// Anything carrying a signed separation; `<= 0` counts as touching
pub trait Separated {
    fn separation(&self) -> f32;
}

impl Separated for f32 {
    fn separation(&self) -> f32 {
        *self
    }
}

#[inline]
fn touching(separation: f32) -> bool {
    separation <= 0.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootFinderConfig {
    /// Evenly spaced sub-intervals scanned while bracketing (at least 1)
    pub samples: usize,
    /// Upper bound on bisection steps
    pub max_iterations: usize,
    /// Bisection stops once `|separation|` falls below this
    pub tolerance: f32,
}

impl Default for RootFinderConfig {
    fn default() -> Self {
        RootFinderConfig {
            samples: DEFAULT_TOI_SAMPLES,
            max_iterations: DEFAULT_TOI_ITERATIONS,
            tolerance: DEFAULT_TOI_TOLERANCE,
        }
    }
}

/// Time at which the separation crosses zero, with the sample evaluated there
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root<S> {
    pub time: f32,
    pub state: S,
}

/// Adjacent sample times straddling a zero crossing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket<S> {
    pub start: Root<S>,
    pub end: Root<S>,
}

impl<S> Bracket<S> {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start.time, self.end.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootFinder {
    config: RootFinderConfig,
}

impl RootFinder {
    pub fn new(config: RootFinderConfig) -> Self {
        RootFinder { config }
    }

    pub fn config(&self) -> &RootFinderConfig {
        &self.config
    }

    /// Scans `[0, upper]` for the first sub-interval whose ends lie on opposite sides of zero
    pub fn bracket<S, F>(&self, upper: f32, separation: &mut F) -> Result<Option<Bracket<S>>>
    where
        S: Separated,
        F: FnMut(f32) -> S,
    {
        let upper = check_time_delta(upper)?;
        let window = Interval::new(0.0, upper);
        let samples = self.config.samples.max(1);

        let mut previous = Root { time: 0.0, state: separation(0.0) };
        for i in 1..=samples {
            let time = window.lerp(i as f32/samples as f32);
            let current = Root { time, state: separation(time) };

            if touching(previous.state.separation()) != touching(current.state.separation()) {
                return Ok(Some(Bracket { start: previous, end: current }));
            }
            previous = current;
        }

        Ok(None)
    }

    /// Earliest zero crossing of `separation` over `[0, upper]`
    ///
    /// `Ok(None)` is the ordinary "no impact in this window" answer. The returned time is the last
    /// bisection midpoint, within `tolerance` of zero separation unless the iteration bound was hit.
    pub fn find<S, F>(&self, upper: f32, mut separation: F) -> Result<Option<Root<S>>>
    where
        S: Separated,
        F: FnMut(f32) -> S,
    {
        let Some(bracket) = self.bracket(upper, &mut separation)? else {
            return Ok(None);
        };

        let mut low = bracket.start.time;
        let mut high = bracket.end.time;
        let low_touching = touching(bracket.start.state.separation());

        let mut midpoint = 0.5*(low + high);
        let mut state = separation(midpoint);
        for _ in 1..self.config.max_iterations.max(1) {
            let current = state.separation();
            if current.abs() < self.config.tolerance {
                break;
            }

            if touching(current) == low_touching {
                low = midpoint;
            } else {
                high = midpoint;
            }

            midpoint = 0.5*(low + high);
            state = separation(midpoint);
        }

        Ok(Some(Root { time: midpoint, state }))
    }

    /// Whether bisection brought `root` within tolerance before the iteration bound ran out
    pub fn converged<S: Separated>(&self, root: &Root<S>) -> bool {
        root.state.separation().abs() < self.config.tolerance
    }
}

//----------------------------------------------------------------------------------
// Swept circle vs static segments
//----------------------------------------------------------------------------------
/// A circle translating at constant velocity over the search window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptCircle {
    pub start: Vec2,
    pub velocity: Vec2,
    pub circle: Circle,
}

/// Separation of a swept circle from one segment at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactSample {
    pub center: Vec2,
    pub separation: f32,
}

impl Separated for ImpactSample {
    fn separation(&self) -> f32 {
        self.separation
    }
}

/// Earliest segment hit by a swept circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub time: f32,
    pub segment: usize,
    pub center: Vec2,
    pub separation: f32,
}

impl SweptCircle {
    pub fn center_at(&self, time: f32) -> Vec2 {
        self.start + self.velocity*time
    }

    /// Time at which the centre passes through the segment itself, if it ever does
    ///
    /// Crossing the segment's line beyond either end does not count.
    pub fn crossing_time(&self, segment: &LineSegment) -> Option<f32> {
        let normal = segment.normal();
        let height = (self.start - segment.start).dot(normal);
        let closing = self.velocity.dot(normal);
        if height == 0.0 || closing == 0.0 || height.signum() == closing.signum() {
            return None;
        }

        let time = -height/closing;
        segment.projects_inside(self.center_at(time)).then_some(time)
    }

    /// Clearance between the circle and `segment` at `time`, less the radius
    ///
    /// Once the centre has passed through the segment the distance counts as negative, so a
    /// circle that went all the way through between two samples still reads as touching. The
    /// sign only flips where the distance is zero, which keeps the function continuous.
    pub fn separation_from(&self, segment: &LineSegment, time: f32) -> ImpactSample {
        self.separation_past(segment, self.crossing_time(segment), time)
    }

    fn separation_past(&self, segment: &LineSegment, crossing: Option<f32>, time: f32) -> ImpactSample {
        let center = self.center_at(time);
        let distance = center.distance(segment.closest_point(center));
        let clearance = match crossing {
            Some(through) if time > through => -distance,
            _ => distance,
        };

        ImpactSample { center, separation: clearance - self.circle.radius }
    }

    /// Earliest impact against any of `segments` within `[0, window]`
    ///
    /// Segments already touched at the start of the window are ignored; discrete contacts own those.
    /// A root the bisection could not bring within tolerance is dropped.
    pub fn earliest_impact(&self, finder: &RootFinder, segments: &[LineSegment], window: f32) -> Result<Option<Impact>> {
        let window = check_time_delta(window)?;
        let mut earliest: Option<Impact> = None;

        for (index, segment) in segments.iter().enumerate() {
            let crossing = self.crossing_time(segment);
            if touching(self.separation_past(segment, crossing, 0.0).separation) {
                continue;
            }

            let horizon = earliest.map_or(window, |impact| impact.time);
            let Some(root) = finder.find(horizon, |time| self.separation_past(segment, crossing, time))? else {
                continue;
            };
            if !finder.converged(&root) {
                debug!(segment = index, time = root.time, separation = root.state.separation, "unconverged impact dropped");
                continue;
            }

            if earliest.is_none_or(|impact| root.time < impact.time) {
                earliest = Some(Impact {
                    time: root.time,
                    segment: index,
                    center: root.state.center,
                    separation: root.state.separation,
                });
            }
        }

        Ok(earliest)
    }
}
