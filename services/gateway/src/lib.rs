//! Voicebot Gateway Service Library
//!
//! Exposes the building blocks of the gateway so the binary entrypoint and
//! the tests can share them.

pub mod config;
pub mod router;
pub mod sample;
pub mod state;
pub mod ws;
