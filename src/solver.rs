//! Gauss-Seidel composite over many velocity constraints.

use tracing::{debug, warn};

use crate::body::BodySet;
use crate::constraint::{ActiveConstraint, VelocityConstrainer};
use crate::error::Result;

/// Identifier handed out when a constrainer joins an [`IterativeSolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstrainerId(u64);

/// Runs a fixed number of sweeps over its constrainers, in insertion order
///
/// Order is part of the result: impulse updates do not commute, so reordering constrainers
/// changes the numbers. Constrainers may be added or removed between steps; a planned step works
/// on the set as it was at planning time.
#[derive(Default)]
pub struct IterativeSolver {
    constrainers: Vec<(ConstrainerId, Box<dyn VelocityConstrainer>)>,
    iterations: usize,
    next_id: u64,
}

impl IterativeSolver {
    pub fn new(iterations: usize) -> Self {
        IterativeSolver {
            constrainers: Vec::new(),
            iterations,
            next_id: 0,
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    pub fn len(&self) -> usize {
        self.constrainers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constrainers.is_empty()
    }

    /// Appends a constrainer; it is solved after every constrainer already present
    pub fn add(&mut self, constrainer: Box<dyn VelocityConstrainer>) -> ConstrainerId {
        let id = ConstrainerId(self.next_id);
        self.next_id += 1;
        self.constrainers.push((id, constrainer));

        debug!(id = id.0, "added constrainer");
        id
    }

    pub fn remove(&mut self, id: ConstrainerId) -> Option<Box<dyn VelocityConstrainer>> {
        let index = self.constrainers.iter().position(|(other, _)| *other == id)?;

        debug!(id = id.0, "removed constrainer");
        Some(self.constrainers.remove(index).1)
    }

    /// Plans every constrainer, skipping (and logging) those whose bodies are gone
    pub fn plan_lenient(&self, bodies: &BodySet, step: f32) -> Result<IterativeConstraint> {
        crate::error::check_time_delta(step)?;

        let mut active = Vec::with_capacity(self.constrainers.len());
        for (id, constrainer) in &self.constrainers {
            match constrainer.plan(bodies, step) {
                Ok(planned) => active.push(planned),
                Err(err) => warn!(id = id.0, %err, "skipping constrainer"),
            }
        }

        Ok(IterativeConstraint::new(active, self.iterations))
    }
}

impl VelocityConstrainer for IterativeSolver {
    fn plan(&self, bodies: &BodySet, step: f32) -> Result<Box<dyn ActiveConstraint>> {
        let active = self.constrainers
            .iter()
            .map(|(_, constrainer)| constrainer.plan(bodies, step))
            .collect::<Result<Vec<_>>>()?;

        Ok(Box::new(IterativeConstraint::new(active, self.iterations)))
    }
}

/// A frozen list of planned constraints swept `iterations` times per refine
pub struct IterativeConstraint {
    active: Vec<Box<dyn ActiveConstraint>>,
    iterations: usize,
}

impl IterativeConstraint {
    pub fn new(active: Vec<Box<dyn ActiveConstraint>>, iterations: usize) -> Self {
        IterativeConstraint { active, iterations }
    }

    /// Appends a planned constraint to the end of the sweep order
    pub fn push(&mut self, constraint: Box<dyn ActiveConstraint>) {
        self.active.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl ActiveConstraint for IterativeConstraint {
    fn refine(&mut self, bodies: &mut BodySet) {
        for _ in 0..self.iterations {
            for constraint in &mut self.active {
                constraint.refine(bodies);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyHandle};
    use crate::constraint::AngularMotor;
    use crate::math::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the order in which it is refined
    struct Probe {
        tag: u32,
        log: Rc<RefCell<Vec<u32>>>,
    }

    impl VelocityConstrainer for Probe {
        fn plan(&self, _: &BodySet, _: f32) -> Result<Box<dyn ActiveConstraint>> {
            Ok(Box::new(Probe { tag: self.tag, log: self.log.clone() }))
        }
    }

    impl ActiveConstraint for Probe {
        fn refine(&mut self, _: &mut BodySet) {
            self.log.borrow_mut().push(self.tag);
        }
    }

    fn spinning_body(bodies: &mut BodySet) -> BodyHandle {
        bodies.insert(Body::new(1.0, 1.0).unwrap().with_velocity(Vec2::new(1.0, 2.0)).with_angular_velocity(0.5))
    }

    #[test]
    fn empty_solver_is_a_no_op() {
        let mut bodies = BodySet::new();
        let handle = spinning_body(&mut bodies);
        let before = bodies.get(handle).unwrap().clone();

        let solver = IterativeSolver::new(10);
        let mut active = solver.plan(&bodies, 0.1).unwrap();
        active.refine(&mut bodies);

        assert_eq!(bodies.get(handle).unwrap(), &before);
    }

    #[test]
    fn sweeps_in_insertion_order_for_each_iteration() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut solver = IterativeSolver::new(3);
        solver.add(Box::new(Probe { tag: 1, log: log.clone() }));
        let middle = solver.add(Box::new(Probe { tag: 2, log: log.clone() }));
        solver.add(Box::new(Probe { tag: 3, log: log.clone() }));

        let bodies = BodySet::new();
        let mut scratch = bodies.clone();
        solver.plan(&bodies, 0.1).unwrap().refine(&mut scratch);
        assert_eq!(*log.borrow(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);

        log.borrow_mut().clear();
        assert!(solver.remove(middle).is_some());
        assert!(solver.remove(middle).is_none());
        solver.set_iterations(1);
        solver.plan(&bodies, 0.1).unwrap().refine(&mut scratch);
        assert_eq!(*log.borrow(), vec![1, 3]);
    }

    #[test]
    fn strict_planning_fails_on_stale_body_but_lenient_skips_it() {
        let mut bodies = BodySet::new();
        let live = spinning_body(&mut bodies);
        let dead = spinning_body(&mut bodies);
        bodies.remove(dead);

        let mut solver = IterativeSolver::new(2);
        solver.add(Box::new(AngularMotor { body: dead, target_speed: 1.0, max_torque: 1.0 }));
        solver.add(Box::new(AngularMotor { body: live, target_speed: 4.0, max_torque: 100.0 }));

        assert!(solver.plan(&bodies, 0.1).is_err());

        let mut active = solver.plan_lenient(&bodies, 0.1).unwrap();
        assert_eq!(active.len(), 1);
        active.refine(&mut bodies);
        assert!((bodies.get(live).unwrap().angular_velocity() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn conflicting_targets_settle_on_last_writer_with_one_sweep() {
        let mut bodies = BodySet::new();
        let handle = spinning_body(&mut bodies);

        let mut solver = IterativeSolver::new(1);
        solver.add(Box::new(AngularMotor { body: handle, target_speed: 1.0, max_torque: 1e6 }));
        solver.add(Box::new(AngularMotor { body: handle, target_speed: -1.0, max_torque: 1e6 }));

        solver.plan(&bodies, 0.1).unwrap().refine(&mut bodies);
        assert!((bodies.get(handle).unwrap().angular_velocity() + 1.0).abs() < 1e-5);
    }
}
