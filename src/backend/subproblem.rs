//! # Trust-region subproblem module
//!
//! This module contains the quadratic model solved by the interior-point backend at every
//! trust-region iteration, and the builders used by the coordinator to construct it.
//!
//! Around the center `x_k` the model reads, with `d = x - x_k`:
//!
//! - objective `f(x_k) + g(x_k)ᵀd + ½ dᵀBd`, where `B` is the quasi-Newton approximation
//! - constraints `c(x_k) + A(x_k)d >= 0`
//! - bounds given by the problem bounds intersected with `x_k ± radius`

use crate::backend::traits::{
    CompactQuasiNewton, SharedSubproblem, SolverFactory, TrustRegionSubproblem,
};
use crate::optimizer::OptimizerError;
use crate::options::{keys, Options};
use crate::problem::Problem;
use crate::types::{EvaluationError, QuasiNewtonType};
use ndarray::{Array1, Array2};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Problem data evaluated at the model center
struct ModelCenter {
    x: Array1<f64>,
    objective: f64,
    gradient: Array1<f64>,
    constraints: Array1<f64>,
    jacobian: Array2<f64>,
}

/// Quadratic trust-region model of a problem
pub struct QuadraticSubproblem {
    problem: Rc<dyn Problem>,
    qn: Box<dyn CompactQuasiNewton>,
    center: Option<ModelCenter>,
    radius: f64,
}

impl QuadraticSubproblem {
    /// Radius used until a trust-region backend sets one
    pub const DEFAULT_RADIUS: f64 = 0.1;

    pub fn new(problem: Rc<dyn Problem>, qn: Box<dyn CompactQuasiNewton>) -> Self {
        Self {
            problem,
            qn,
            center: None,
            radius: Self::DEFAULT_RADIUS,
        }
    }

    fn model_center(&self) -> Result<&ModelCenter, EvaluationError> {
        self.center.as_ref().ok_or_else(|| {
            EvaluationError::InvalidInput("the trust-region model has no center".to_string())
        })
    }

    /// Step from the center to `x`
    fn step(&self, x: &Array1<f64>) -> Result<Array1<f64>, EvaluationError> {
        let center = self.model_center()?;
        if x.len() != center.x.len() {
            return Err(EvaluationError::InvalidInput(format!(
                "expected {} variables, got {}",
                center.x.len(),
                x.len()
            )));
        }
        Ok(x - &center.x)
    }
}

impl Problem for QuadraticSubproblem {
    fn variable_bounds(&self) -> Array2<f64> {
        let mut bounds = self.problem.variable_bounds();
        if let Some(center) = &self.center {
            for (mut row, xi) in bounds.rows_mut().into_iter().zip(center.x.iter()) {
                row[0] = row[0].max(xi - self.radius);
                row[1] = row[1].min(xi + self.radius);
            }
        }
        bounds
    }

    fn num_variables(&self) -> usize {
        self.problem.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.problem.num_constraints()
    }

    fn initial_point(&self) -> Array1<f64> {
        match &self.center {
            Some(center) => center.x.clone(),
            None => self.problem.initial_point(),
        }
    }

    fn objective(&self, x: &Array1<f64>) -> Result<f64, EvaluationError> {
        let d = self.step(x)?;
        let center = self.model_center()?;
        Ok(center.objective + center.gradient.dot(&d) + 0.5 * d.dot(&self.qn.multiply(&d)))
    }

    fn gradient(&self, x: &Array1<f64>) -> Result<Array1<f64>, EvaluationError> {
        let d = self.step(x)?;
        let center = self.model_center()?;
        Ok(&center.gradient + &self.qn.multiply(&d))
    }

    fn constraints(&self, x: &Array1<f64>) -> Result<Array1<f64>, EvaluationError> {
        let d = self.step(x)?;
        let center = self.model_center()?;
        Ok(&center.constraints + &center.jacobian.dot(&d))
    }

    fn constraint_jacobian(&self, x: &Array1<f64>) -> Result<Array2<f64>, EvaluationError> {
        self.step(x)?;
        Ok(self.model_center()?.jacobian.clone())
    }
}

impl TrustRegionSubproblem for QuadraticSubproblem {
    fn as_problem(&self) -> &dyn Problem {
        self
    }

    fn problem(&self) -> &Rc<dyn Problem> {
        &self.problem
    }

    fn set_center(&mut self, x: &Array1<f64>) -> Result<(), EvaluationError> {
        let n = self.problem.num_variables();
        if x.len() != n {
            return Err(EvaluationError::InvalidInput(format!(
                "expected {} variables, got {}",
                n,
                x.len()
            )));
        }

        let center = ModelCenter {
            x: x.clone(),
            objective: self.problem.objective(x)?,
            gradient: self.problem.gradient(x)?,
            constraints: self.problem.constraints(x)?,
            jacobian: self.problem.constraint_jacobian(x)?,
        };
        self.center = Some(center);
        Ok(())
    }

    fn center(&self) -> Option<&Array1<f64>> {
        self.center.as_ref().map(|center| &center.x)
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    fn update_quasi_newton(&mut self, s: &Array1<f64>, y: &Array1<f64>) -> bool {
        self.qn.update(s, y)
    }

    fn quasi_newton(&self) -> Option<&dyn CompactQuasiNewton> {
        Some(self.qn.as_ref())
    }
}

/// Build the quadratic subproblem of `problem` with a fresh quasi-Newton approximation
pub fn build_subproblem<F: SolverFactory + ?Sized>(
    factory: &F,
    problem: &Rc<dyn Problem>,
    kind: QuasiNewtonType,
    subspace_size: usize,
) -> SharedSubproblem {
    debug!(qn_type = %kind, subspace_size, "building trust-region subproblem");
    let qn = factory.quasi_newton(kind, problem, subspace_size);
    Rc::new(RefCell::new(QuadraticSubproblem::new(Rc::clone(problem), qn)))
}

/// Build the quadratic subproblem configured by the `qn_type` and `qn_subspace_size` options
pub fn build_subproblem_from_options<F: SolverFactory + ?Sized>(
    factory: &F,
    problem: &Rc<dyn Problem>,
    options: &Options,
) -> Result<SharedSubproblem, OptimizerError> {
    let kind: QuasiNewtonType = options.get_enum(keys::QN_TYPE)?.parse()?;
    let size = options.get_int(keys::QN_SUBSPACE_SIZE)?;
    let subspace_size =
        usize::try_from(size).map_err(|_| OptimizerError::InvalidSubspaceSize(size))?;
    Ok(build_subproblem(factory, problem, kind, subspace_size))
}
