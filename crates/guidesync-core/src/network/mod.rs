//! Connectivity tracking.

pub mod connectivity;

pub use connectivity::{ConnectivityMonitor, RuntimeContext};
