#![deny(unsafe_op_in_unsafe_fn)]

pub mod akde;
pub mod cascade;
pub mod efficiency;
pub mod error;
pub mod histograms;
pub mod statistics;
pub mod summary;
pub mod table;

pub use efficiency::{EfficiencyMode, Orientation};
pub use error::{Error, Result};
pub use table::{EfficiencyTable, Measurement, PerformanceTable};
