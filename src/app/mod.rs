//! Application core: pure controller logic, zero I/O.
//!
//! This module owns the lifecycle rules: FSM orchestration, the battery
//! overrides that outrank every state, and the gesture filters. All
//! interaction with the outside world happens through the queues and the
//! [`ports`] traits, keeping this layer fully testable on the host.

pub mod events;
pub mod ports;
pub mod service;
