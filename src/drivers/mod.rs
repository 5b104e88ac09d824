//! Low-level peripheral drivers that don't fit behind an embedded-hal
//! trait.

pub mod adc;
pub mod hw_timer;
