//! Input side: everything that turns raw edges and ADC samples into
//! [`Event`](crate::events::Event)s.
//!
//! The GPIO ISRs only timestamp edges into an [`edge_ring::EdgeRing`];
//! classification happens in the superloop.

pub mod battery;
pub mod device_status;
pub mod edge_ring;
pub mod led_classifier;
