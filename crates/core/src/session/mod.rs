//! Capture session management
//!
//! Operator-facing session state (labels, project folder, scenario,
//! location), the shared capture log, and the single-shot capture path.

pub mod log;
pub mod ports;
pub mod service;

pub use service::SessionService;
