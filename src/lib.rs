// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Two-time Greens functions on the Keldysh contour
//!
//! # Overview
//! Equilibrium and non-equilibrium many-body calculations work with two-time
//! Greens functions whose time arguments live on an integration contour in
//! the complex time plane: forward and backward along the real axis, then
//! down the imaginary axis to −iβ. This crate provides the contour itself,
//! its discretization into a time grid whose global indices address the
//! two-time matrices, the time-ordering step function, and path integration
//! along the contour.
//!
//! On top of the grid sit generators for the standard equilibrium inputs of
//! such calculations: the Greens function of an isolated level, and the
//! hybridization function of a band described by a density of states. Band
//! densities of states typically carry van Hove singularities, so the crate
//! also ships an integrator that handles integrable singularities exactly,
//! by subtracting each known asymptotic form and adding back its exact
//! integral, together with factory functions for the common lattices.

#![warn(missing_docs)]
#![allow(dead_code)]

/// Contour branches, assembly and time ordering
pub mod contour;

/// Densities of states and the singularity-subtracting integrator
pub mod dos;

/// Error handling
mod error;

/// Greens functions and their generators
pub mod greens_functions;

/// Discretized contour-time grids and path quadrature
pub mod grid;

pub use error::{BuildError, ConfigurationError};
