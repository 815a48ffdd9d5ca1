//! # Backend module.
//!
//! This module contains the interfaces of the solver backends driven by the coordinator
//! (interior-point, trust-region and MMA), the quasi-Newton approximation consumed by the
//! trust-region subproblem, and the factory that constructs all of them.
//! It also contains the builder of the quadratic trust-region subproblem.

pub mod subproblem;
pub mod traits;

pub use subproblem::{build_subproblem, build_subproblem_from_options, QuadraticSubproblem};
pub use traits::{
    CompactQuasiNewton, InteriorPointBackend, IpTarget, MmaBackend, SharedSubproblem,
    SharedSurrogate, SolverFactory, TrustRegionBackend, TrustRegionSubproblem,
};
