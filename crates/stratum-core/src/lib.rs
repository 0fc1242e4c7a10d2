#![forbid(unsafe_code)]

//! Core value types for the stratum layered grid coordinate engine.
//!
//! This crate holds the primitives every layer builds on:
//!
//! - [`Range`] — half-open position intervals for compact region tracking.
//! - [`SizeConfig`] — sparse per-index size overrides over a uniform
//!   default, with cached aggregate (cumulative) sizes.
//! - [`Properties`] / [`Persistable`] — the flat string key/value
//!   persistence model shared by all stateful parts.
//!
//! Nothing here knows about layers; the layer contract lives in
//! `stratum-layers`.

pub mod persist;
pub mod range;
pub mod size_config;

pub use persist::{Persistable, Properties};
pub use range::Range;
pub use size_config::SizeConfig;
