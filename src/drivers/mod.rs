//! Output line drivers, the button decoder and hardware initialisation.

pub mod button;
pub mod hw_init;
pub mod outputs;
