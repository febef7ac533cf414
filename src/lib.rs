// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Real-time solvent-accessible surface atom extraction for molecular
//! trajectories.
//!
//! Every atom of a frame is classified as *surface* (reachable by a solvent
//! probe sphere) or *internal* (fully enclosed by its probe-inflated
//! neighbors). Two interchangeable implementations share one interface: a
//! thread-parallel CPU classifier over a uniform neighbor grid and a wgpu
//! compute kernel that compacts its output through atomic counters. Surface
//! layers can be peeled repeatedly to expose deeper shells.
//!
//! # Key entry points
//!
//! - [`engine::SurfaceEngine`] - owns the classifiers and runs complete
//!   computations and the self-test
//! - [`surface::SurfaceClassifier`] - the shared classifier interface
//! - [`molecule::Trajectory`] - immutable radii, tags and per-frame positions
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! A run validates its [`surface::AtomSet`], buckets the active atoms into a
//! [`spatial::NeighborGrid`], then tests a fixed Fibonacci direction set on
//! each atom's inflated sphere against its grid neighbors. The GPU path
//! uploads the trajectory once per trajectory id and reuses the CPU-built
//! grid layout; its internal/surface index buffers stay on the device for
//! rendering.

pub mod engine;
pub mod error;
pub mod gpu;
pub mod molecule;
pub mod options;
pub mod spatial;
pub mod surface;
pub mod validation;
