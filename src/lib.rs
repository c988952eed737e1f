//! Generalship planner library.
//!
//! A turn planner for territorial-conquest wargames. Exposes the board
//! representation, the host boundary, strength and threat evaluation, and
//! the move, purchase and placement planners for use by integration tests
//! and the binary entry point.

pub mod board;
pub mod config;
pub mod engine;
pub mod eval;
pub mod host;
pub mod plan;
pub mod scenario;
