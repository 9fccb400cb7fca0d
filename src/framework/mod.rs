//! Separable processing framework: runs a per-line callback along one or
//! more image dimensions, with buffering, boundary extension and
//! multi-threading handled here.

pub mod buffer;
pub mod options;
pub mod separable;
pub mod threads;

pub use self::buffer::{SeparableBuffer, SeparableLineFilter, SeparableLineFilterParams};
pub use self::options::{SeparableOption, SeparableOptions};
pub use self::separable::{one_dimensional_line_filter, separable};
pub use self::threads::{
    hardware_threads, number_of_threads, set_number_of_threads, set_threading_threshold,
    threading_threshold, ThreadingConfig, DEFAULT_THREADING_THRESHOLD,
};
