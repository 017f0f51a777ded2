//! Unit operations.

mod evaporator;
mod fermentor;
mod heat_exchanger;
mod mixer;
mod splitter;

pub use evaporator::{MultiEffectEvaporator, StageEnd, StageSet};
pub use fermentor::Fermentor;
pub use heat_exchanger::HeatExchanger;
pub use mixer::Mixer;
pub use splitter::Splitter;
