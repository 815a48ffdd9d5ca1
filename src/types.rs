//! # Types module
//!
//! This module contains the types shared by the coordinator and the backends,
//! including the optimization strategies, the quasi-Newton approximation types,
//! the lifecycle states of the backend set, the optimized point and the
//! evaluation errors raised by problems.

use crate::optimizer::OptimizerError;
use ndarray::Array1;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Optimization strategy selected through the `algorithm` option
///
/// This enum defines the outer strategies the coordinator knows how to build and run.
pub enum Algorithm {
    /// Interior-point method applied directly to the problem
    InteriorPoint,

    /// Trust-region method, with the interior-point backend solving the
    /// quadratic subproblem at every outer iteration
    TrustRegion,

    /// Method of Moving Asymptotes, with the interior-point backend solving
    /// each convex surrogate
    Mma,
}

impl Algorithm {
    /// All strategies, in the order of their option values
    pub const ALL: [Algorithm; 3] = [Self::InteriorPoint, Self::TrustRegion, Self::Mma];

    /// Returns the option value that selects this strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InteriorPoint => "ip",
            Self::TrustRegion => "tr",
            Self::Mma => "mma",
        }
    }
}

impl FromStr for Algorithm {
    type Err = OptimizerError;

    /// Parses the value of the `algorithm` option
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ip" => Ok(Self::InteriorPoint),
            "tr" => Ok(Self::TrustRegion),
            "mma" => Ok(Self::Mma),
            _ => Err(OptimizerError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Quasi-Newton approximation used by the trust-region subproblem
pub enum QuasiNewtonType {
    /// Limited-memory BFGS
    Bfgs,

    /// Limited-memory symmetric rank-one
    Sr1,
}

impl QuasiNewtonType {
    /// Returns the option value that selects this approximation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bfgs => "bfgs",
            Self::Sr1 => "sr1",
        }
    }
}

impl FromStr for QuasiNewtonType {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bfgs" => Ok(Self::Bfgs),
            "sr1" => Ok(Self::Sr1),
            _ => Err(OptimizerError::UnknownQuasiNewtonType(s.to_string())),
        }
    }
}

impl fmt::Display for QuasiNewtonType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle state of the backend set owned by the coordinator
///
/// The state is derived from which backends are live, so at most one
/// outer backend (trust-region or MMA) can ever be reported.
pub enum BackendState {
    /// No backend has been built yet
    Uninitialized,

    /// Only the interior-point backend is live, targeting the problem
    PureInteriorPoint,

    /// Trust-region backend and interior-point backend targeting the subproblem
    TrustRegionActive,

    /// MMA backend and interior-point backend targeting the MMA surrogate
    MmaActive,
}

impl BackendState {
    /// Returns the strategy that produced this state, if any
    pub fn algorithm(&self) -> Option<Algorithm> {
        match self {
            Self::Uninitialized => None,
            Self::PureInteriorPoint => Some(Algorithm::InteriorPoint),
            Self::TrustRegionActive => Some(Algorithm::TrustRegion),
            Self::MmaActive => Some(Algorithm::Mma),
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::PureInteriorPoint => "pure interior-point",
            Self::TrustRegionActive => "trust-region active",
            Self::MmaActive => "MMA active",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Lagrange multipliers of the most recent interior-point solve
///
/// Problems have no sparse constraint block, so there are no sparse-constraint multipliers.
pub struct Multipliers {
    /// Multipliers of the general constraints
    pub z: Array1<f64>,
    /// Multipliers of the lower variable bounds
    pub zl: Array1<f64>,
    /// Multipliers of the upper variable bounds
    pub zu: Array1<f64>,
}

impl Multipliers {
    /// Zero multipliers for a problem with `nvars` variables and `ncon` constraints
    pub fn zeros(nvars: usize, ncon: usize) -> Self {
        Self {
            z: Array1::zeros(ncon),
            zl: Array1::zeros(nvars),
            zu: Array1::zeros(nvars),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// Primal point and multipliers of the most recently completed run
pub struct OptimizedPoint {
    /// The primal point
    pub x: Array1<f64>,
    /// The dual state of the last interior-point solve
    pub multipliers: Multipliers,
}

impl OptimizedPoint {
    /// Returns a clone of the primal point
    ///
    /// Similar to the `x` attribute of a `SciPy.optimize` result
    pub fn x(&self) -> Array1<f64> {
        self.x.clone()
    }
}

#[derive(Debug, Error)]
/// Error type for objective, gradient and constraint evaluation
pub enum EvaluationError {
    /// Error when the input is invalid
    #[error("Invalid input: {0}.")]
    InvalidInput(String),

    /// Error when the objective function is not implemented
    #[error("Objective function not implemented and needed by the backend.")]
    ObjectiveFunctionNotImplemented,

    /// Error when the gradient is not implemented
    #[error("Gradient not implemented and needed by the backend.")]
    GradientNotImplemented,

    /// Error when the constraints are not implemented
    #[error("Constraints not implemented and needed by the backend.")]
    ConstraintsNotImplemented,

    /// Error when the constraint Jacobian is not implemented
    #[error("Constraint Jacobian not implemented and needed by the backend.")]
    ConstraintJacobianNotImplemented,

    /// Error when the objective function can't be evaluated
    #[error("Objective function evaluation failed.")]
    ObjectiveFunctionEvaluationFailed,

    /// Error when the gradient can't be evaluated
    #[error("Gradient evaluation failed.")]
    GradientEvaluationFailed,

    /// Error when the constraints can't be evaluated
    #[error("Constraint evaluation failed.")]
    ConstraintEvaluationFailed,
}
