// src/state/mod.rs
//
// Plain data shared between the control side and the engine.
//
// Key principles:
// - Nothing here allocates after construction
// - Parameters are typed (`ParamId`) and clamped on write
// - Track metadata is a fixed table, not re-derived per block

mod command;
mod config;
mod param_info;
mod params;
mod pattern;
mod preset;
mod track_table;

pub use command::*;
pub use config::*;
pub use param_info::*;
pub use params::*;
pub use pattern::*;
pub use preset::*;
pub use track_table::*;
