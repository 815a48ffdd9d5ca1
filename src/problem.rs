//! # Optimization problem trait module
//!
//! This module contains the `Problem` trait, which defines the methods that an optimization problem must implement:
//! the objective function, its gradient, the inequality constraints `c(x) >= 0`, their Jacobian and the variable bounds.
//!
//! The same trait is implemented by the trust-region subproblem and by MMA surrogates, so an interior-point
//! backend can solve any of its targets through one interface. [`ProblemCost`] bridges a `Problem` to `argmin`.
//!
//! ## Example
//! ```rust
//! use optdriver::problem::Problem;
//! use optdriver::types::EvaluationError;
//! use ndarray::{array, Array1, Array2};
//!
//! #[derive(Debug, Clone)]
//! pub struct Rosenbrock;
//!
//! impl Problem for Rosenbrock {
//!     fn objective(&self, x: &Array1<f64>) -> Result<f64, EvaluationError> {
//!         Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2))
//!     }
//!
//!     fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>, EvaluationError> {
//!         Ok(array![
//!             -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0].powi(2)),
//!             200.0 * (x[1] - x[0].powi(2))
//!         ])
//!     }
//!
//!     fn variable_bounds(&self) -> Array2<f64> {
//!         array![[-2.0, 2.0], [-1.0, 3.0]]
//!     }
//! }
//!
//! assert_eq!(Rosenbrock.num_variables(), 2);
//! assert_eq!(Rosenbrock.initial_point(), array![0.0, 1.0]);
//! ```
use crate::types::EvaluationError;
use argmin::core::{CostFunction, Error, Gradient};
use ndarray::{Array1, Array2, Axis};

/// Trait for optimization problems
///
/// Only `variable_bounds` is required. Backends call the evaluation methods they need
/// and report the corresponding `EvaluationError` when one is missing.
pub trait Problem {
    /// Variable bounds for the optimization problem
    ///
    /// Returns an `Array2<f64>` with one `[lower, upper]` row per variable.
    fn variable_bounds(&self) -> Array2<f64>;

    /// Number of design variables, taken from the rows of `variable_bounds`
    fn num_variables(&self) -> usize {
        self.variable_bounds().nrows()
    }

    /// Number of inequality constraints `c(x) >= 0`
    fn num_constraints(&self) -> usize {
        0
    }

    /// Starting point for a backend run
    ///
    /// Defaults to the midpoint of the variable bounds. Problems with infinite bounds
    /// must override it.
    fn initial_point(&self) -> Array1<f64> {
        self.variable_bounds()
            .map_axis(Axis(1), |bounds| 0.5 * (bounds[0] + bounds[1]))
    }

    /// Objective function to minimize, given at point x (`Array1<f64>`)
    fn objective(&self, _x: &Array1<f64>) -> Result<f64, EvaluationError> {
        Err(EvaluationError::ObjectiveFunctionNotImplemented)
    }

    /// Gradient of the objective function at point x (`Array1<f64>`)
    fn gradient(&self, _x: &Array1<f64>) -> Result<Array1<f64>, EvaluationError> {
        Err(EvaluationError::GradientNotImplemented)
    }

    /// Values of the inequality constraints `c(x) >= 0`
    ///
    /// The default implementation is only valid for unconstrained problems.
    fn constraints(&self, _x: &Array1<f64>) -> Result<Array1<f64>, EvaluationError> {
        if self.num_constraints() == 0 {
            Ok(Array1::zeros(0))
        } else {
            Err(EvaluationError::ConstraintsNotImplemented)
        }
    }

    /// Jacobian of the constraints, one row per constraint
    ///
    /// The default implementation is only valid for unconstrained problems.
    fn constraint_jacobian(&self, _x: &Array1<f64>) -> Result<Array2<f64>, EvaluationError> {
        if self.num_constraints() == 0 {
            Ok(Array2::zeros((0, self.num_variables())))
        } else {
            Err(EvaluationError::ConstraintJacobianNotImplemented)
        }
    }
}

/// Adapter exposing a [`Problem`] as an `argmin` cost function with gradient
///
/// The adapter borrows the problem, so it also works for trait objects such as
/// `dyn Problem` or `dyn TrustRegionSubproblem`.
pub struct ProblemCost<'a, P: Problem + ?Sized> {
    problem: &'a P,
}

impl<'a, P: Problem + ?Sized> ProblemCost<'a, P> {
    pub fn new(problem: &'a P) -> Self {
        Self { problem }
    }
}

impl<P: Problem + ?Sized> CostFunction for ProblemCost<'_, P> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        self.problem
            .objective(param)
            .map_err(|e| Error::msg(e.to_string()))
    }
}

impl<P: Problem + ?Sized> Gradient for ProblemCost<'_, P> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, param: &Self::Param) -> std::result::Result<Self::Gradient, Error> {
        self.problem
            .gradient(param)
            .map_err(|e| Error::msg(e.to_string()))
    }
}
