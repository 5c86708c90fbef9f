//! Camera-module controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole pipeline runs on the host.

#![deny(unused_must_use)]

pub mod actions;
pub mod app;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod executor;
pub mod fsm;
pub mod pipeline;
pub mod queue;

pub mod adapters;
pub mod drivers;
pub mod pins;
pub mod sensors;
