//! Core traits and types for Retort.
//!
//! This crate defines the shared abstractions that solvers, flowsheets, and
//! process specifications build on:
//!
//! - [`Model`]: a callable mapping a typed input to a typed output, possibly
//!   by re-running part of a stateful simulation.
//! - [`Snapshot`]: an input/output pair captured from a model call.
//! - [`Observer`]: receives solver events and may return a control action.
//! - [`EquationProblem`]: adapts solver variables to model inputs and turns
//!   model outputs into residuals.

mod model;
mod observer;
mod problems;

pub use model::{Model, Snapshot};
pub use observer::Observer;
pub use problems::EquationProblem;
