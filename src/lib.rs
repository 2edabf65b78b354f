//! hostsnap - host telemetry snapshot library.
//!
//! Provides:
//! - `collector`: `/proc` readers and the poll cycle that ties them together
//! - `model`: snapshot and per-process row types handed to presentation layers
//! - `rates`: pure counter-to-percentage calculations
//! - `fmt`: human-readable time and size helpers

pub mod collector;
pub mod fmt;
pub mod model;
pub mod rates;
