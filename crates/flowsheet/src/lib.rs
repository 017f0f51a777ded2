//! Steady-state flowsheets for Retort.
//!
//! A [`Flowsheet`] is an explicit context that owns the [`Chemicals`]
//! registry, every [`Stream`], and every [`Unit`]. Units read their inlet
//! streams and overwrite their outlet streams when run. A [`System`] orders
//! units and converges recycle streams around them.
//!
//! Specifications attach to units through [`SpecificationHook`]. A hook is
//! applied before its unit runs and may re-run any path through the
//! flowsheet while it searches for the attribute values that satisfy it.

mod chemicals;
mod error;
mod flowsheet;
mod reaction;
mod stream;
mod system;
mod unit;

pub mod units;

pub use chemicals::{Chemical, Chemicals, Phase};
pub use error::{FlowsheetError, ReactionError, SystemError};
pub use flowsheet::{Flowsheet, UnitId};
pub use reaction::{ParallelReaction, Reaction};
pub use stream::{Stream, StreamId, Streams};
pub use system::{Convergence, ConvergenceConfig, Method, System};
pub use unit::{HookError, SpecificationHook, Unit};
