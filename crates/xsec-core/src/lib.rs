//! # Xsec Core
//!
//! Contracts between the cross-section spline cache and the physics it
//! tabulates. The cache never integrates anything itself: it samples a
//! [`algorithm::ResponseAlgorithm`] for a [`process::ProcessDescription`]
//! at a series of [`kinematics::ProbeState`]s.
//!
//! ## Modules
//!
//! - [`kinematics`] — Probe four-momentum construction.
//! - [`process`] — Process description trait and a concrete [`process::Interaction`].
//! - [`algorithm`] — Algorithm identity and the response trait.
//! - [`analytic`] — Closed-form threshold model for validation.

pub mod algorithm;
pub mod analytic;
pub mod kinematics;
pub mod process;

pub use algorithm::{AlgorithmId, ResponseAlgorithm};
pub use kinematics::ProbeState;
pub use process::{Interaction, ProcessDescription};
