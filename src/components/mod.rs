//! UI building blocks.

pub mod topology;
