//! WebSocket session handling.
//!
//! Submodules split the concern four ways: `transport` adapts the raw axum
//! socket to the frame seams, `registry` enforces one live session per
//! identity, `pipeline` runs the voice turns, and `session` ties the
//! lifecycle together.

pub mod pipeline;
pub mod registry;
pub mod session;
pub mod transport;

pub use registry::{SessionHandle, SessionRegistry};
pub use session::connect;
