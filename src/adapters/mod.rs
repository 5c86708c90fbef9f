//! Adapters: concrete implementations behind the port traits.
//!
//! | Adapter    | Implements | Connects to               |
//! |------------|------------|---------------------------|
//! | `log_sink` | EventSink  | Serial log output         |
//! | `time`     | (clock)    | ESP32 high-resolution timer |

pub mod log_sink;
pub mod time;
