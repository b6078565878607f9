//! # Xsec Splines
//!
//! Cross-section spline cache. Expensive cross-section calculations are
//! tabulated once per (algorithm, process) pair on a threshold-aware knot
//! grid, interpolated with natural cubic splines, and kept in a
//! [`registry::SplineRegistry`] that can be saved to and loaded from XML
//! spline libraries.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`knots`] | Knot placement below/above threshold, linear or log spacing |
//! | [`builder`] | Sampling a response algorithm into a spline |
//! | [`registry`] | Keyed spline store with at-most-once construction |
//! | [`xml`] | Streaming XML library reader and writer |
//! | [`spline`] | Natural cubic spline interpolant |
//! | [`config`] | Registry defaults and per-build overrides |

pub mod builder;
pub mod config;
pub mod error;
pub mod knots;
pub mod registry;
pub mod spline;
pub mod xml;

pub use config::{BuildOverrides, SplineDefaults};
pub use error::SplineError;
pub use knots::{plan_knots, KnotSpacing};
pub use registry::{build_key, Provenance, SplineRegistry};
pub use spline::CubicSpline;
pub use xml::XmlStatus;
