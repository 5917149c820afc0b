//! Low-level drivers: task spawning, stepper sequencing, delays.

pub mod delay;
pub mod stepper;
pub mod task_pin;
