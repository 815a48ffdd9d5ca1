//! # Optimizer module
//!
//! This module contains the coordinator that owns one problem and one option store and, on
//! every call to [`Optimizer::optimize`], makes sure the backends required by the `algorithm`
//! option exist, discards the ones that no longer apply, and hands control to the outer one.
//!
//! ## Backend lifecycle
//!
//! | Requested | Kept                                         | Discarded                    |
//! |-----------|----------------------------------------------|------------------------------|
//! | `ip`      | interior-point backend targeting the problem | trust-region, MMA            |
//! | `tr`      | subproblem, trust-region backend, interior-point backend targeting the subproblem | MMA |
//! | `mma`     | MMA backend, interior-point backend targeting its surrogate | trust-region  |
//!
//! An interior-point backend whose target does not match the requested strategy is rebuilt.
//! The trust-region subproblem outlives strategy switches, so its quasi-Newton history is kept
//! when switching away from `tr` and back.
//!
//! Configuration errors are detected before any backend is touched, so a failed call leaves
//! the coordinator exactly as it was.

use crate::backend::subproblem::build_subproblem_from_options;
use crate::backend::traits::{
    InteriorPointBackend, IpTarget, MmaBackend, SharedSubproblem, SolverFactory,
    TrustRegionBackend,
};
use crate::options::{keys, OptionError, Options};
use crate::problem::Problem;
use crate::types::{Algorithm, BackendState, OptimizedPoint};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
/// Optimizer errors
pub enum OptimizerError {
    /// The `algorithm` option names no known strategy
    #[error("Optimizer Error: Unrecognized algorithm option '{0}'.")]
    UnknownAlgorithm(String),

    /// The `qn_type` option names no known quasi-Newton approximation
    #[error("Optimizer Error: Unrecognized quasi-Newton type '{0}'.")]
    UnknownQuasiNewtonType(String),

    /// The `qn_subspace_size` option is negative
    #[error("Optimizer Error: Invalid quasi-Newton subspace size {0}.")]
    InvalidSubspaceSize(i64),

    /// An option the coordinator reads is missing or has the wrong type
    #[error(transparent)]
    Option(#[from] OptionError),

    /// A backend failed while running
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl OptimizerError {
    /// Returns true if the error was raised before any backend was touched
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }

    /// Log the error at error level and return it unchanged
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// What a resolved configuration asks the coordinator to run
enum Request {
    InteriorPoint { checkpoint: Option<PathBuf> },
    TrustRegion { subproblem: SharedSubproblem },
    Mma,
}

impl Request {
    fn algorithm(&self) -> Algorithm {
        match self {
            Self::InteriorPoint { .. } => Algorithm::InteriorPoint,
            Self::TrustRegion { .. } => Algorithm::TrustRegion,
            Self::Mma => Algorithm::Mma,
        }
    }

    fn checkpoint(&self) -> Option<&Path> {
        match self {
            Self::InteriorPoint { checkpoint } => checkpoint.as_deref(),
            _ => None,
        }
    }
}

/// Live backends
///
/// Each variant holds exactly the backends of one strategy, so a trust-region backend and an
/// MMA backend can never be live together. Fields are dropped in declaration order, outer
/// backend first.
#[derive(Default)]
enum Backends {
    #[default]
    Uninitialized,
    InteriorPoint {
        ip: Box<dyn InteriorPointBackend>,
    },
    TrustRegion {
        tr: Box<dyn TrustRegionBackend>,
        ip: Box<dyn InteriorPointBackend>,
        /// Subproblem both backends were built on
        subproblem: SharedSubproblem,
    },
    Mma {
        mma: Box<dyn MmaBackend>,
        ip: Box<dyn InteriorPointBackend>,
    },
}

impl Backends {
    fn state(&self) -> BackendState {
        match self {
            Self::Uninitialized => BackendState::Uninitialized,
            Self::InteriorPoint { .. } => BackendState::PureInteriorPoint,
            Self::TrustRegion { .. } => BackendState::TrustRegionActive,
            Self::Mma { .. } => BackendState::MmaActive,
        }
    }

    /// Discard the backends, outer backend first
    fn release(self) {
        match self {
            Self::Uninitialized => {}
            Self::InteriorPoint { ip } => {
                debug!("discarding interior-point backend");
                drop(ip);
            }
            Self::TrustRegion { tr, ip, .. } => {
                debug!("discarding trust-region backend");
                drop(tr);
                debug!("discarding interior-point backend");
                drop(ip);
            }
            Self::Mma { mma, ip } => {
                debug!("discarding MMA backend");
                drop(mma);
                debug!("discarding interior-point backend");
                drop(ip);
            }
        }
    }
}

/// Optimization coordinator
///
/// The coordinator owns the option store and the live backends. Backends are built lazily
/// through the [`SolverFactory`] the first time a strategy needs them and reused for as long
/// as the strategy stays selected.
///
/// ## Example
/// ```rust,ignore
/// let options = Optimizer::default_options(&factory)?;
/// let mut optimizer = Optimizer::new(problem, options, factory);
///
/// optimizer.optimize()?;
/// optimizer.options_mut().set_str("algorithm", Some("mma"))?;
/// optimizer.optimize()?;
///
/// let point = optimizer.optimized_point();
/// ```
pub struct Optimizer<F: SolverFactory> {
    problem: Rc<dyn Problem>,
    options: Options,
    factory: F,
    backends: Backends,
    subproblem: Option<SharedSubproblem>,
}

impl<F: SolverFactory> Optimizer<F> {
    pub fn new(problem: Rc<dyn Problem>, options: Options, factory: F) -> Self {
        Self {
            problem,
            options,
            factory,
            backends: Backends::Uninitialized,
            subproblem: None,
        }
    }

    /// Register the options read by the coordinator, followed by the options of the backends
    pub fn add_default_options(options: &mut Options, factory: &F) -> Result<(), OptionError> {
        let algorithms = Algorithm::ALL.map(|algorithm| algorithm.as_str());
        options
            .add_enum_option(
                keys::ALGORITHM,
                Algorithm::TrustRegion.as_str(),
                &algorithms,
                "The type of optimization algorithm",
            )?
            .add_string_option(
                keys::IP_CHECKPOINT_FILE,
                None,
                "Checkpoint file for the interior point method",
            )?
            .add_enum_option(
                keys::QN_TYPE,
                "bfgs",
                &["bfgs", "sr1"],
                "The type of quasi-Newton approximation used by the trust-region subproblem",
            )?
            .add_int_option(
                keys::QN_SUBSPACE_SIZE,
                10,
                0,
                1000,
                "The number of correction pairs kept by the quasi-Newton approximation",
            )?;
        factory.register_options(options)
    }

    /// Option store with every default registered
    pub fn default_options(factory: &F) -> Result<Options, OptionError> {
        let mut options = Options::new();
        Self::add_default_options(&mut options, factory)?;
        Ok(options)
    }

    /// Run the strategy selected by the `algorithm` option
    ///
    /// Backends left over from a different strategy are discarded and the missing ones are
    /// built before control passes to the outer backend. Backend failures are returned as
    /// [`OptimizerError::Backend`] and leave the backends in place.
    pub fn optimize(&mut self) -> Result<(), OptimizerError> {
        let request = self.resolve().map_err(OptimizerError::log)?;
        info!(
            algorithm = %request.algorithm(),
            state = %self.state(),
            "Starting optimization"
        );

        self.transition(&request);

        let result = match &mut self.backends {
            Backends::Uninitialized => Ok(()),
            Backends::InteriorPoint { ip } => ip.optimize(request.checkpoint()),
            Backends::TrustRegion { tr, ip, .. } => tr.optimize(&mut **ip),
            Backends::Mma { mma, ip } => mma.optimize(&mut **ip),
        };
        result?;

        info!(state = %self.state(), "Optimization finished");
        Ok(())
    }

    /// Read and validate everything the requested strategy needs
    ///
    /// The only thing built here is a missing trust-region subproblem.
    fn resolve(&mut self) -> Result<Request, OptimizerError> {
        let algorithm: Algorithm = self.options.get_enum(keys::ALGORITHM)?.parse()?;

        let request = match algorithm {
            Algorithm::InteriorPoint => {
                let checkpoint = match self.options.get_str(keys::IP_CHECKPOINT_FILE) {
                    Ok(path) => path.map(PathBuf::from),
                    Err(OptionError::UnknownOption(_)) => None,
                    Err(e) => return Err(e.into()),
                };
                Request::InteriorPoint { checkpoint }
            }
            Algorithm::TrustRegion => Request::TrustRegion {
                subproblem: self.ensure_subproblem()?,
            },
            Algorithm::Mma => Request::Mma,
        };
        Ok(request)
    }

    fn ensure_subproblem(&mut self) -> Result<SharedSubproblem, OptimizerError> {
        if let Some(subproblem) = &self.subproblem {
            return Ok(Rc::clone(subproblem));
        }
        let subproblem =
            build_subproblem_from_options(&self.factory, &self.problem, &self.options)?;
        self.subproblem = Some(Rc::clone(&subproblem));
        Ok(subproblem)
    }

    /// Bring the live backends in line with `request`
    fn transition(&mut self, request: &Request) {
        let previous = std::mem::take(&mut self.backends);

        self.backends = match (request, previous) {
            (Request::InteriorPoint { .. }, Backends::InteriorPoint { ip }) => {
                Backends::InteriorPoint { ip }
            }
            (Request::InteriorPoint { .. }, previous) => {
                previous.release();
                let ip = self.build_interior_point(IpTarget::Problem(Rc::clone(&self.problem)));
                Backends::InteriorPoint { ip }
            }
            (
                Request::TrustRegion { subproblem },
                Backends::TrustRegion {
                    tr,
                    ip,
                    subproblem: bound,
                },
            ) if Rc::ptr_eq(&bound, subproblem) => Backends::TrustRegion {
                tr,
                ip,
                subproblem: bound,
            },
            (Request::TrustRegion { subproblem }, previous) => {
                if previous.state() == BackendState::TrustRegionActive {
                    debug!("trust-region subproblem was replaced");
                }
                previous.release();
                let ip = self.build_interior_point(IpTarget::Subproblem(Rc::clone(subproblem)));
                debug!("building trust-region backend");
                let tr = self
                    .factory
                    .trust_region(Rc::clone(subproblem), &self.options);
                Backends::TrustRegion {
                    tr,
                    ip,
                    subproblem: Rc::clone(subproblem),
                }
            }
            (Request::Mma, Backends::Mma { mma, ip }) => Backends::Mma { mma, ip },
            (Request::Mma, previous) => {
                previous.release();
                debug!("building MMA backend");
                let mma = self.factory.mma(Rc::clone(&self.problem), &self.options);
                let ip = self.build_interior_point(IpTarget::MmaSurrogate(mma.surrogate()));
                Backends::Mma { mma, ip }
            }
        };
    }

    fn build_interior_point(&self, target: IpTarget) -> Box<dyn InteriorPointBackend> {
        debug!(target = target.name(), "building interior-point backend");
        self.factory.interior_point(target, &self.options)
    }

    /// Primal point of the outer backend with the multipliers of the interior-point backend
    ///
    /// In pure interior-point mode both come from the interior-point backend. Returns `None`
    /// before the first run.
    pub fn optimized_point(&self) -> Option<OptimizedPoint> {
        match &self.backends {
            Backends::Uninitialized => None,
            Backends::InteriorPoint { ip } => ip.optimized_point(),
            Backends::TrustRegion { tr, ip, .. } => Some(OptimizedPoint {
                x: tr.optimized_point()?,
                multipliers: ip.multipliers()?,
            }),
            Backends::Mma { mma, ip } => Some(OptimizedPoint {
                x: mma.optimized_point()?,
                multipliers: ip.multipliers()?,
            }),
        }
    }

    /// Replace or clear the trust-region subproblem
    ///
    /// The previous subproblem is released once nothing else holds it. Live trust-region
    /// backends built on the previous subproblem are rebuilt by the next `tr` run. With `None`,
    /// that run builds a fresh subproblem from the quasi-Newton options.
    pub fn set_trust_region_subproblem(&mut self, subproblem: Option<SharedSubproblem>) {
        match &subproblem {
            Some(subproblem) => {
                if !Rc::ptr_eq(subproblem.borrow().problem(), &self.problem) {
                    warn!("Trust-region subproblem wraps a different problem than the optimizer");
                }
                debug!("replacing trust-region subproblem");
            }
            None => debug!("clearing trust-region subproblem"),
        }
        self.subproblem = subproblem;
    }

    pub fn state(&self) -> BackendState {
        self.backends.state()
    }

    pub fn problem(&self) -> &Rc<dyn Problem> {
        &self.problem
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable access to the option store
    ///
    /// Changes take effect on the next call to `optimize`.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn subproblem(&self) -> Option<&SharedSubproblem> {
        self.subproblem.as_ref()
    }

    /// The live interior-point backend
    pub fn interior_point(&self) -> Option<&dyn InteriorPointBackend> {
        match &self.backends {
            Backends::Uninitialized => None,
            Backends::InteriorPoint { ip }
            | Backends::TrustRegion { ip, .. }
            | Backends::Mma { ip, .. } => Some(&**ip),
        }
    }

    /// The live trust-region backend
    pub fn trust_region(&self) -> Option<&dyn TrustRegionBackend> {
        match &self.backends {
            Backends::TrustRegion { tr, .. } => Some(&**tr),
            _ => None,
        }
    }

    /// The live MMA backend
    pub fn mma(&self) -> Option<&dyn MmaBackend> {
        match &self.backends {
            Backends::Mma { mma, .. } => Some(&**mma),
            _ => None,
        }
    }
}
