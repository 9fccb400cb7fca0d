//! JSON configuration for the demo binary.

pub mod separable_demo;
