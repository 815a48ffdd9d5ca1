//! # Backend traits module
//!
//! This module contains the narrow interfaces through which the coordinator consumes the
//! numerical solvers. Each backend is constructed by a [`SolverFactory`], run, and queried
//! for its result; everything else about it is opaque to the coordinator.
//!
//! ## Targets
//!
//! The interior-point backend always solves exactly one [`IpTarget`]:
//!  - the problem itself (`ip` strategy),
//!  - the quadratic trust-region subproblem (`tr` strategy),
//!  - the convex surrogate maintained by the MMA backend (`mma` strategy).
//!
//! Subproblem and surrogate are shared handles: the outer backend updates them between inner
//! solves while the interior-point backend reads them during a solve.

use crate::options::{OptionError, Options};
use crate::problem::Problem;
use crate::types::{EvaluationError, Multipliers, OptimizedPoint, QuasiNewtonType};
use ndarray::Array1;
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Shared handle to the trust-region subproblem
pub type SharedSubproblem = Rc<RefCell<dyn TrustRegionSubproblem>>;

/// Shared handle to the convex surrogate of an MMA backend
pub type SharedSurrogate = Rc<RefCell<dyn Problem>>;

/// Compact limited-memory Hessian approximation
pub trait CompactQuasiNewton {
    /// Type of the approximation
    fn kind(&self) -> QuasiNewtonType;

    /// Maximum number of correction pairs kept
    fn subspace_size(&self) -> usize;

    /// Add the correction pair `(s, y)`; returns false if the pair was skipped
    fn update(&mut self, s: &Array1<f64>, y: &Array1<f64>) -> bool;

    /// Product of the approximation with `v`
    fn multiply(&self, v: &Array1<f64>) -> Array1<f64>;

    /// Discard all correction pairs
    fn reset(&mut self);
}

/// Local model solved by the interior-point backend at every trust-region iteration
pub trait TrustRegionSubproblem: Problem {
    /// Returns the subproblem as a plain problem
    fn as_problem(&self) -> &dyn Problem;

    /// Returns the problem the model approximates
    fn problem(&self) -> &Rc<dyn Problem>;

    /// Move the model center to `x`, re-evaluating the problem there
    fn set_center(&mut self, x: &Array1<f64>) -> Result<(), EvaluationError>;

    /// Current model center, if one was set
    fn center(&self) -> Option<&Array1<f64>>;

    fn radius(&self) -> f64;

    fn set_radius(&mut self, radius: f64);

    /// Forward a correction pair to the curvature approximation
    fn update_quasi_newton(&mut self, s: &Array1<f64>, y: &Array1<f64>) -> bool;

    /// Curvature approximation of the model, if it uses one
    fn quasi_newton(&self) -> Option<&dyn CompactQuasiNewton>;
}

#[derive(Clone)]
/// The object an interior-point backend solves
pub enum IpTarget {
    Problem(Rc<dyn Problem>),
    Subproblem(SharedSubproblem),
    MmaSurrogate(SharedSurrogate),
}

impl IpTarget {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Problem(_) => "problem",
            Self::Subproblem(_) => "trust-region subproblem",
            Self::MmaSurrogate(_) => "MMA surrogate",
        }
    }

    /// Lend the target as a plain problem for the duration of `f`
    ///
    /// Shared targets stay borrowed while `f` runs, so `f` must not try to update them.
    pub fn with_problem<R>(&self, f: impl FnOnce(&dyn Problem) -> R) -> R {
        match self {
            Self::Problem(problem) => f(problem.as_ref()),
            Self::Subproblem(subproblem) => f(subproblem.borrow().as_problem()),
            Self::MmaSurrogate(surrogate) => f(&*surrogate.borrow()),
        }
    }
}

impl fmt::Debug for IpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IpTarget({})", self.name())
    }
}

/// Interior-point backend
pub trait InteriorPointBackend {
    /// Solve the target, optionally writing checkpoints to `checkpoint`
    fn optimize(&mut self, checkpoint: Option<&Path>) -> anyhow::Result<()>;

    /// Primal point and multipliers of the last solve
    fn optimized_point(&self) -> Option<OptimizedPoint>;

    /// Multipliers of the last solve
    fn multipliers(&self) -> Option<Multipliers> {
        self.optimized_point().map(|point| point.multipliers)
    }
}

/// Trust-region backend driving an interior-point backend on the subproblem
pub trait TrustRegionBackend {
    fn optimize(&mut self, inner: &mut dyn InteriorPointBackend) -> anyhow::Result<()>;

    /// Primal iterate of the last run
    fn optimized_point(&self) -> Option<Array1<f64>>;
}

/// MMA backend driving an interior-point backend on its convex surrogate
pub trait MmaBackend {
    /// The surrogate the inner interior-point backend must target
    fn surrogate(&self) -> SharedSurrogate;

    fn optimize(&mut self, inner: &mut dyn InteriorPointBackend) -> anyhow::Result<()>;

    /// Primal iterate of the last run
    fn optimized_point(&self) -> Option<Array1<f64>>;
}

/// Constructs the backends and quasi-Newton approximations used by the coordinator
///
/// Backends may read their own options from the store they are given; those options are
/// registered through `register_options`.
pub trait SolverFactory {
    /// Register the options read by the backends
    fn register_options(&self, _options: &mut Options) -> Result<(), OptionError> {
        Ok(())
    }

    fn interior_point(&self, target: IpTarget, options: &Options) -> Box<dyn InteriorPointBackend>;

    fn trust_region(
        &self,
        subproblem: SharedSubproblem,
        options: &Options,
    ) -> Box<dyn TrustRegionBackend>;

    fn mma(&self, problem: Rc<dyn Problem>, options: &Options) -> Box<dyn MmaBackend>;

    fn quasi_newton(
        &self,
        kind: QuasiNewtonType,
        problem: &Rc<dyn Problem>,
        subspace_size: usize,
    ) -> Box<dyn CompactQuasiNewton>;
}

#[cfg(test)]
mod tests_traits {
    use super::*;
    use ndarray::{array, Array2};

    struct Interval {
        upper: f64,
    }

    impl Problem for Interval {
        fn variable_bounds(&self) -> Array2<f64> {
            array![[0.0, self.upper]]
        }
    }

    #[test]
    /// Test lending each kind of target as a plain problem
    fn test_with_problem() {
        let problem: Rc<dyn Problem> = Rc::new(Interval { upper: 2.0 });
        let surrogate: SharedSurrogate = Rc::new(RefCell::new(Interval { upper: 4.0 }));

        let direct = IpTarget::Problem(problem);
        let mma = IpTarget::MmaSurrogate(Rc::clone(&surrogate));

        assert_eq!(direct.with_problem(|p| p.initial_point()), array![1.0]);
        assert_eq!(mma.with_problem(|p| p.initial_point()), array![2.0]);

        // The borrow ends with the closure, so the surrogate can be updated again
        surrogate.borrow_mut();
    }

    #[test]
    /// Test that targets are named after what the interior-point backend solves
    fn test_target_names() {
        let problem: Rc<dyn Problem> = Rc::new(Interval { upper: 1.0 });
        let surrogate: SharedSurrogate = Rc::new(RefCell::new(Interval { upper: 1.0 }));

        let target = IpTarget::Problem(problem);
        assert_eq!(format!("{:?}", target), "IpTarget(problem)");
        let target = IpTarget::MmaSurrogate(surrogate);
        assert_eq!(format!("{:?}", target), format!("IpTarget({})", target.name()));
    }
}
