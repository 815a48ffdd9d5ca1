use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use optdriver::backend::{
    CompactQuasiNewton, InteriorPointBackend, IpTarget, MmaBackend, SharedSubproblem,
    SharedSurrogate, SolverFactory, TrustRegionBackend,
};
use optdriver::optimizer::{Optimizer, OptimizerError};
use optdriver::options::{keys, Options};
use optdriver::problem::Problem;
use optdriver::types::{Multipliers, OptimizedPoint, QuasiNewtonType};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Box with 100 variables, no objective evaluations needed by the backends below
#[derive(Debug, Clone)]
pub struct UnitBox;

impl Problem for UnitBox {
    fn variable_bounds(&self) -> Array2<f64> {
        Array2::from_shape_fn((100, 2), |(_, j)| j as f64)
    }
}

/// Backends that return their starting point, so only the coordinator is measured
struct Idle {
    target: IpTarget,
    x: Option<Array1<f64>>,
}

impl InteriorPointBackend for Idle {
    fn optimize(&mut self, _checkpoint: Option<&Path>) -> anyhow::Result<()> {
        self.x = Some(self.target.with_problem(|p| p.initial_point()));
        Ok(())
    }

    fn optimized_point(&self) -> Option<OptimizedPoint> {
        let x = self.x.clone()?;
        Some(OptimizedPoint {
            multipliers: Multipliers::zeros(x.len(), 0),
            x,
        })
    }
}

struct IdleTrustRegion {
    x: Option<Array1<f64>>,
}

impl TrustRegionBackend for IdleTrustRegion {
    fn optimize(&mut self, inner: &mut dyn InteriorPointBackend) -> anyhow::Result<()> {
        inner.optimize(None)?;
        self.x = inner.optimized_point().map(|point| point.x);
        Ok(())
    }

    fn optimized_point(&self) -> Option<Array1<f64>> {
        self.x.clone()
    }
}

struct IdleMma {
    surrogate: SharedSurrogate,
    x: Option<Array1<f64>>,
}

impl MmaBackend for IdleMma {
    fn surrogate(&self) -> SharedSurrogate {
        Rc::clone(&self.surrogate)
    }

    fn optimize(&mut self, inner: &mut dyn InteriorPointBackend) -> anyhow::Result<()> {
        inner.optimize(None)?;
        self.x = inner.optimized_point().map(|point| point.x);
        Ok(())
    }

    fn optimized_point(&self) -> Option<Array1<f64>> {
        self.x.clone()
    }
}

struct Identity {
    kind: QuasiNewtonType,
    subspace_size: usize,
}

impl CompactQuasiNewton for Identity {
    fn kind(&self) -> QuasiNewtonType {
        self.kind
    }

    fn subspace_size(&self) -> usize {
        self.subspace_size
    }

    fn update(&mut self, _s: &Array1<f64>, _y: &Array1<f64>) -> bool {
        false
    }

    fn multiply(&self, v: &Array1<f64>) -> Array1<f64> {
        v.clone()
    }

    fn reset(&mut self) {}
}

struct IdleFactory;

impl SolverFactory for IdleFactory {
    fn interior_point(&self, target: IpTarget, _: &Options) -> Box<dyn InteriorPointBackend> {
        Box::new(Idle { target, x: None })
    }

    fn trust_region(&self, _: SharedSubproblem, _: &Options) -> Box<dyn TrustRegionBackend> {
        Box::new(IdleTrustRegion { x: None })
    }

    fn mma(&self, problem: Rc<dyn Problem>, _: &Options) -> Box<dyn MmaBackend> {
        let bounds = problem.variable_bounds();
        Box::new(IdleMma {
            surrogate: Rc::new(RefCell::new(Surrogate { bounds })),
            x: None,
        })
    }

    fn quasi_newton(
        &self,
        kind: QuasiNewtonType,
        _: &Rc<dyn Problem>,
        subspace_size: usize,
    ) -> Box<dyn CompactQuasiNewton> {
        Box::new(Identity {
            kind,
            subspace_size,
        })
    }
}

struct Surrogate {
    bounds: Array2<f64>,
}

impl Problem for Surrogate {
    fn variable_bounds(&self) -> Array2<f64> {
        self.bounds.clone()
    }
}

fn cycle_strategies(optimizer: &mut Optimizer<IdleFactory>) -> Result<(), OptimizerError> {
    for algorithm in ["ip", "mma", "tr"] {
        optimizer
            .options_mut()
            .set_str(keys::ALGORITHM, Some(algorithm))?;
        optimizer.optimize()?;
    }
    Ok(())
}

fn repeat_strategy(optimizer: &mut Optimizer<IdleFactory>) -> Result<(), OptimizerError> {
    optimizer.optimize()
}

fn run_strategy_switching(c: &mut Criterion) {
    let options = Optimizer::default_options(&IdleFactory).unwrap();
    let mut optimizer = Optimizer::new(Rc::new(UnitBox), options, IdleFactory);
    c.bench_function("cycle_strategies", |b| {
        b.iter(|| cycle_strategies(&mut optimizer))
    });

    let options = Optimizer::default_options(&IdleFactory).unwrap();
    let mut optimizer = Optimizer::new(Rc::new(UnitBox), options, IdleFactory);
    c.bench_function("repeat_trust_region", |b| {
        b.iter(|| repeat_strategy(&mut optimizer))
    });
}

criterion_group!(benches, run_strategy_switching);
criterion_main!(benches);
