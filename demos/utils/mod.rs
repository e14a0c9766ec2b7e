//! Utility functions for the demos
//!
//! Interface setup and logging shared by the TAP demos.

pub mod network;

pub use network::*;
