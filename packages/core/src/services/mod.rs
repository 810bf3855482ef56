//! Services
//!
//! - `Controller` - Batched mutation entry point for views and import code
//!
//! Views never touch the graph directly; they call the controller and watch
//! records through `RecordObserver`.

pub mod controller;

pub use controller::Controller;
