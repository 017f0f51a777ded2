use std::collections::HashMap;

use ndarray::{Array1, Axis, concatenate, s};
use petgraph::{
    algo::toposort,
    graph::{DiGraph, NodeIndex},
};
use serde::Deserialize;
use tracing::debug;

use crate::{Flowsheet, StreamId, SystemError, UnitId};

/// Update rule applied to recycle streams between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Direct substitution.
    #[default]
    FixedPoint,
    /// Wegstein acceleration with `q` bounded to `[-5, 0]`.
    Wegstein,
}

/// Tolerances for recycle convergence.
///
/// A pass is converged when the largest change in any recycle molar flow is
/// below `molar_tol` (kmol/hr), or below `relative_tol` times the total
/// recycle flow.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub molar_tol: f64,
    pub relative_tol: f64,
    pub max_iters: usize,
    pub method: Method,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            molar_tol: 0.02,
            relative_tol: 1e-3,
            max_iters: 1500,
            method: Method::FixedPoint,
        }
    }
}

/// Summary of a converged simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    pub iters: usize,
    pub molar_error: f64,
    pub relative_error: f64,
}

/// An ordered path of units with recycle (tear) streams.
#[derive(Debug, Clone)]
pub struct System {
    path: Vec<UnitId>,
    recycles: Vec<StreamId>,
    pub config: ConvergenceConfig,
}

const Q_MIN: f64 = -5.0;
const Q_MAX: f64 = 0.0;

impl System {
    /// Creates a system from an explicit unit order.
    #[must_use]
    pub fn new(path: Vec<UnitId>, recycles: Vec<StreamId>) -> Self {
        Self {
            path,
            recycles,
            config: ConvergenceConfig::default(),
        }
    }

    /// Derives the unit order from stream connections, treating `recycles`
    /// as torn.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::UntornCycle`] if a cycle remains.
    pub fn from_flowsheet(
        flowsheet: &Flowsheet,
        recycles: Vec<StreamId>,
    ) -> Result<Self, SystemError> {
        let mut graph = DiGraph::<UnitId, StreamId>::new();
        let nodes: HashMap<UnitId, NodeIndex> = flowsheet
            .units()
            .map(|(id, _)| (id, graph.add_node(id)))
            .collect();

        for (id, unit) in flowsheet.units() {
            for &stream in unit.outs() {
                if recycles.contains(&stream) {
                    continue;
                }
                if let Some(sink) = flowsheet.sink(stream) {
                    graph.add_edge(nodes[&id], nodes[&sink], stream);
                }
            }
        }

        let order = toposort(&graph, None).map_err(|_| SystemError::UntornCycle)?;
        let path = order.into_iter().map(|node| graph[node]).collect();
        Ok(Self::new(path, recycles))
    }

    #[must_use]
    pub fn with_config(mut self, config: ConvergenceConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn path(&self) -> &[UnitId] {
        &self.path
    }

    #[must_use]
    pub fn recycles(&self) -> &[StreamId] {
        &self.recycles
    }

    /// Returns the part of the path from `from` through `to`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::NotOnPath`] if either unit is missing or `to`
    /// comes before `from`.
    pub fn path_until(
        &self,
        flowsheet: &Flowsheet,
        from: UnitId,
        to: UnitId,
    ) -> Result<Vec<UnitId>, SystemError> {
        let position = |unit: UnitId| {
            self.path
                .iter()
                .position(|&u| u == unit)
                .ok_or_else(|| SystemError::NotOnPath(flowsheet.unit_dyn(unit).id().to_owned()))
        };
        let start = position(from)?;
        let end = position(to)?;
        if end < start {
            return Err(SystemError::NotOnPath(
                flowsheet.unit_dyn(to).id().to_owned(),
            ));
        }
        Ok(self.path[start..=end].to_vec())
    }

    /// Runs the path until every recycle stream converges.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::NotConverged`] after `max_iters` passes, or the
    /// first unit error.
    pub fn simulate(&self, flowsheet: &mut Flowsheet) -> Result<Convergence, SystemError> {
        if self.recycles.is_empty() {
            flowsheet.run_path(&self.path)?;
            return Ok(Convergence {
                iters: 1,
                molar_error: 0.0,
                relative_error: 0.0,
            });
        }

        let mut x = self.gather(flowsheet);
        let mut previous: Option<(Array1<f64>, Array1<f64>)> = None;
        let mut molar_error = f64::INFINITY;
        let mut relative_error = f64::INFINITY;

        for iter in 1..=self.config.max_iters {
            flowsheet.run_path(&self.path)?;
            let g = self.gather(flowsheet);

            molar_error = (&g - &x).fold(0.0_f64, |max, d| max.max(d.abs()));
            let total = g.sum();
            relative_error = if total > 0.0 {
                molar_error / total
            } else if molar_error > 0.0 {
                f64::INFINITY
            } else {
                0.0
            };

            if molar_error < self.config.molar_tol || relative_error < self.config.relative_tol {
                debug!(iters = iter, molar_error, relative_error, "recycle converged");
                return Ok(Convergence {
                    iters: iter,
                    molar_error,
                    relative_error,
                });
            }

            let next = match (self.config.method, &previous) {
                (Method::Wegstein, Some((x_prev, g_prev))) => wegstein(&x, &g, x_prev, g_prev),
                _ => g.clone(),
            };
            self.scatter(flowsheet, &next)?;
            previous = Some((x, g));
            x = next;
        }

        Err(SystemError::NotConverged {
            iters: self.config.max_iters,
            molar_error,
            relative_error,
        })
    }

    fn gather(&self, flowsheet: &Flowsheet) -> Array1<f64> {
        let views: Vec<_> = self
            .recycles
            .iter()
            .map(|&s| flowsheet.stream(s).mol().view())
            .collect();
        concatenate(Axis(0), &views).unwrap_or_else(|_| Array1::zeros(0))
    }

    fn scatter(&self, flowsheet: &mut Flowsheet, values: &Array1<f64>) -> Result<(), SystemError> {
        let n = flowsheet.chemicals().len();
        for (k, &stream) in self.recycles.iter().enumerate() {
            let mol = values.slice(s![k * n..(k + 1) * n]).mapv(|v| v.max(0.0));
            flowsheet.stream_mut(stream).set_mol(mol)?;
        }
        Ok(())
    }
}

fn wegstein(
    x: &Array1<f64>,
    g: &Array1<f64>,
    x_prev: &Array1<f64>,
    g_prev: &Array1<f64>,
) -> Array1<f64> {
    let mut next = g.clone();
    for i in 0..x.len() {
        let dx = x[i] - x_prev[i];
        if dx.abs() < 1e-14 {
            continue;
        }
        let s = (g[i] - g_prev[i]) / dx;
        if (s - 1.0).abs() < 1e-14 {
            continue;
        }
        let q = (s / (s - 1.0)).clamp(Q_MIN, Q_MAX);
        next[i] = q * x[i] + (1.0 - q) * g[i];
    }
    next
}
