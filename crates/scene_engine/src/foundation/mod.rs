//! Foundation layer: math types, timing, and logging utilities

pub mod logging;
pub mod math;
pub mod time;
