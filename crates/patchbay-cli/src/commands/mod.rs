//! CLI command implementations.

pub mod common;
pub mod convert;
pub mod demo;
pub mod inspect;
pub mod presets;
pub mod simulate;
pub mod units;
